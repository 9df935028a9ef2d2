//! Verifying serialized messages.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::key_provider::KeyList;
use crate::options::{DetachedPayload, Encoder, Serialization, ValidateKey, WithKey};
use crate::parse::{parse_with, ParseOption};
use crate::signing_input::signing_input;
use crate::{
	registry,
	Base64Encoder,
	Context,
	Error,
	ErrorKind,
	Key,
	KeyProvider,
	Message,
	Result,
	Signature,
	SignatureAlgorithm,
	StaticKeyProvider,
};

/// A shared place to receive a value from [`verify`].
///
/// Pass it with [`with_key_used`](crate::with_key_used) or [`with_message`](crate::with_message)
/// and read it after verification succeeded.
pub struct Slot<T>(Arc<Mutex<Option<T>>>);

impl<T> Slot<T> {
	pub fn new() -> Self {
		Self(Arc::new(Mutex::new(None)))
	}

	/// Take the value out of the slot.
	pub fn take(&self) -> Option<T> {
		self.0.lock().take()
	}

	pub(crate) fn set(&self, value: T) {
		*self.0.lock() = Some(value);
	}
}

impl<T: Clone> Slot<T> {
	/// Get a copy of the value in the slot.
	pub fn get(&self) -> Option<T> {
		self.0.lock().clone()
	}
}

impl<T> Clone for Slot<T> {
	fn clone(&self) -> Self {
		Self(self.0.clone())
	}
}

impl<T> Default for Slot<T> {
	fn default() -> Self {
		Self::new()
	}
}

impl<T> std::fmt::Debug for Slot<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		f.debug_struct("Slot").field("filled", &self.0.lock().is_some()).finish()
	}
}

/// Options for [`verify`].
#[derive(Clone)]
pub enum VerifyOption {
	/// Verify with a single key.
	Key(WithKey),

	/// Verify with the keys from a provider.
	KeyProvider(Arc<dyn KeyProvider>),

	/// Receive the key that verified the message.
	KeyUsed(Slot<Key>),

	/// Receive the parsed message.
	Message(Slot<Message>),

	/// The payload of a message that was signed with a detached payload.
	DetachedPayload(Vec<u8>),

	/// Validate candidate keys before using them.
	ValidateKey(bool),

	/// The base64 encoder used to build the signing input.
	Base64Encoder(Arc<dyn Base64Encoder>),

	/// Context passed to the key providers.
	Context(Context),

	/// Only accept the given serialization.
	Serialization(Serialization),
}

impl std::fmt::Debug for VerifyOption {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Self::Key(x)             => f.debug_tuple("Key").field(x).finish(),
			Self::KeyProvider(_)     => f.debug_tuple("KeyProvider").finish(),
			Self::KeyUsed(x)         => f.debug_tuple("KeyUsed").field(x).finish(),
			Self::Message(x)         => f.debug_tuple("Message").field(x).finish(),
			Self::DetachedPayload(x) => f.debug_tuple("DetachedPayload").field(x).finish(),
			Self::ValidateKey(x)     => f.debug_tuple("ValidateKey").field(x).finish(),
			Self::Base64Encoder(x)   => f.debug_tuple("Base64Encoder").field(x).finish(),
			Self::Context(x)         => f.debug_tuple("Context").field(x).finish(),
			Self::Serialization(x)   => f.debug_tuple("Serialization").field(x).finish(),
		}
	}
}

impl From<WithKey> for VerifyOption {
	fn from(other: WithKey) -> Self {
		Self::Key(other)
	}
}

impl From<Serialization> for VerifyOption {
	fn from(other: Serialization) -> Self {
		Self::Serialization(other)
	}
}

impl From<DetachedPayload> for VerifyOption {
	fn from(other: DetachedPayload) -> Self {
		Self::DetachedPayload(other.0)
	}
}

impl From<ValidateKey> for VerifyOption {
	fn from(other: ValidateKey) -> Self {
		Self::ValidateKey(other.0)
	}
}

impl From<Encoder> for VerifyOption {
	fn from(other: Encoder) -> Self {
		Self::Base64Encoder(other.0)
	}
}

/// Verify a message and return its payload.
///
/// The serialization is detected automatically.
/// Every signature of the message is tried with every candidate key of every key provider, in order.
/// The first combination that verifies wins.
///
/// Messages with the `none` algorithm are never accepted.
///
/// Errors that prevent verification from being attempted have kind [`ErrorKind::Verify`].
/// If no key verified any signature, the error has kind [`ErrorKind::Verification`]
/// and [`Error::joined`] holds the failure of each attempt.
pub fn verify(data: &[u8], options: impl IntoIterator<Item = VerifyOption>) -> Result<Vec<u8>> {
	let mut providers: Vec<Arc<dyn KeyProvider>> = Vec::new();
	let mut key_used = None;
	let mut message_slot = None;
	let mut detached = None;
	let mut validate_key = false;
	let mut encoder = None;
	let mut context = Context::background();
	let mut parse_options = Vec::new();

	for option in options {
		match option {
			VerifyOption::Key(with_key) => providers.push(Arc::new(StaticKeyProvider::new(with_key.alg, with_key.key))),
			VerifyOption::KeyProvider(provider) => providers.push(provider),
			VerifyOption::KeyUsed(slot) => key_used = Some(slot),
			VerifyOption::Message(slot) => message_slot = Some(slot),
			VerifyOption::DetachedPayload(payload) => detached = Some(payload),
			VerifyOption::ValidateKey(value) => validate_key = value,
			VerifyOption::Base64Encoder(value) => encoder = Some(value),
			VerifyOption::Context(value) => context = value,
			VerifyOption::Serialization(value) => parse_options.push(ParseOption::Serialization(value)),
		}
	}

	if providers.is_empty() {
		return Err(Error::verify("no key providers given, use with_key or with_key_provider"));
	}

	tracing::debug!(providers = providers.len(), detached = detached.is_some(), "verifying message");
	let mut message = parse_with(data, parse_options).map_err(|e| e.wrap(ErrorKind::Verify, "failed to parse message"))?;

	if let Some(payload) = detached {
		if !message.payload().is_empty() {
			return Err(Error::verify("message contains a payload, but a detached payload was given"));
		}
		message.set_payload(payload);
	}

	let mut attempts = Vec::new();
	for (index, signature) in message.signatures().iter().enumerate() {
		let encoder = encoder.as_deref().unwrap_or(signature.encoder());
		let protected = signature.protected_bytes().map_err(|e| e.wrap(ErrorKind::Verify, "failed to get protected header"))?;
		let input = signing_input(&protected, message.payload(), encoder, signature.b64());

		let message_alg = match signature.algorithm() {
			Some(alg) if alg.is_none() => {
				attempts.push(Error::unsupported_algorithm("the none algorithm is never accepted").wrap(ErrorKind::Verification, format!("signature #{}", index)));
				continue;
			},
			Some(alg) => alg,
			None => {
				attempts.push(Error::missing_header_param(crate::header::ALGORITHM).wrap(ErrorKind::Verification, format!("signature #{}", index)));
				continue;
			},
		};

		for provider in &providers {
			context.check().map_err(|e| e.wrap(ErrorKind::Verify, "verification was cancelled"))?;

			let mut candidates = KeyList::new();
			provider.fetch_keys(&context, &mut candidates, signature, &message)
				.map_err(|e| e.wrap(ErrorKind::Verify, "failed to fetch keys"))?;

			for (alg, key) in candidates.into_keys() {
				match try_candidate(&alg, &key, &message_alg, signature, &input, validate_key) {
					Ok(()) => {
						tracing::debug!(%alg, signature = index, "verified message");
						if let Some(slot) = &key_used {
							slot.set(key);
						}
						if let Some(slot) = &message_slot {
							slot.set(message.clone());
						}
						return Ok(message.payload().to_vec());
					},
					Err(e) => {
						tracing::trace!(%alg, signature = index, error = %e, "verification attempt failed");
						attempts.push(e.wrap(ErrorKind::Verification, format!("signature #{} with algorithm {}", index, alg)));
					},
				}
			}
		}
	}

	Err(Error::verification("could not verify message with any of the given keys", attempts))
}

fn try_candidate(alg: &SignatureAlgorithm, key: &Key, message_alg: &SignatureAlgorithm, signature: &Signature, input: &[u8], validate_key: bool) -> Result<()> {
	if alg.is_none() {
		return Err(Error::unsupported_algorithm("the none algorithm is never accepted"));
	}
	if alg != message_alg {
		return Err(Error::unsupported_algorithm(format!("key algorithm {} does not match message algorithm {}", alg, message_alg)));
	}
	if validate_key {
		key.validate()?;
	}
	let verifier = registry::verifier_for(alg)?;
	verifier.verify(key, input, signature.signature())
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::key::test::{ed25519_private_key, other_rsa_private_key, rsa_private_key};
	use crate::{
		json_object,
		parse,
		sign,
		with_base64_encoder,
		with_compact,
		with_context,
		with_detached_payload,
		with_insecure_no_signature,
		with_json,
		with_key,
		with_key_provider,
		with_key_used,
		with_message,
		with_validate_key,
		Headers,
		KeyProviderFn,
		KeySink,
		PaddedUrlEncoding,
		SignOption,
	};
	use assert2::assert;
	use rand::RngCore;

	fn hmac_key() -> Key {
		Key::octet(b"secretkey".to_vec())
	}

	#[test]
	fn test_tamper_detection() {
		let signed = sign(b"foo", [with_key(SignatureAlgorithm::HS256, hmac_key())]).unwrap();
		assert!(let Ok(_) = verify(&signed, [with_key(SignatureAlgorithm::HS256, hmac_key())]));

		let text = String::from_utf8(signed).unwrap();
		let parts: Vec<&str> = text.split('.').collect();

		// Payload "fop" instead of "foo".
		let tampered = format!("{}.Zm9w.{}", parts[0], parts[2]);
		let error = verify(tampered.as_bytes(), [with_key(SignatureAlgorithm::HS256, hmac_key())]).unwrap_err();
		assert!(error.kind() == ErrorKind::Verification);
		assert!(error.is(ErrorKind::InvalidSignature));

		// {"alg":"HS256","x":1}
		let tampered = format!("eyJhbGciOiJIUzI1NiIsIngiOjF9.{}.{}", parts[1], parts[2]);
		assert!(verify(tampered.as_bytes(), [with_key(SignatureAlgorithm::HS256, hmac_key())]).unwrap_err().kind() == ErrorKind::Verification);

		let mut signature = crate::encoding::decode(parts[2].as_bytes()).unwrap();
		signature[0] ^= 1;
		let tampered = format!("{}.{}.{}", parts[0], parts[1], crate::encoding::encode(&signature));
		assert!(verify(tampered.as_bytes(), [with_key(SignatureAlgorithm::HS256, hmac_key())]).unwrap_err().kind() == ErrorKind::Verification);
	}

	#[test]
	fn test_refuse_none() {
		let signed = sign(b"foo", [with_insecure_no_signature(None)]).unwrap();

		let message = parse(&signed).unwrap();
		assert!(message.signatures()[0].algorithm() == Some(SignatureAlgorithm::NONE));
		assert!(message.payload() == b"foo");

		let error = verify(&signed, [with_key(SignatureAlgorithm::NONE, Key::octet(Vec::new()))]).unwrap_err();
		assert!(error.kind() == ErrorKind::Verification);
		assert!(error.is(ErrorKind::UnsupportedAlgorithm));

		let error = verify(&signed, [with_key(SignatureAlgorithm::HS256, hmac_key())]).unwrap_err();
		assert!(error.kind() == ErrorKind::Verification);
	}

	#[test]
	fn test_no_providers() {
		let signed = sign(b"foo", [with_key(SignatureAlgorithm::HS256, hmac_key())]).unwrap();
		assert!(verify(&signed, []).unwrap_err().kind() == ErrorKind::Verify);
	}

	#[test]
	fn test_parse_error() {
		let error = verify(b"not a message", [with_key(SignatureAlgorithm::HS256, hmac_key())]).unwrap_err();
		assert!(error.kind() == ErrorKind::Verify);
		assert!(error.is(ErrorKind::Parse));
		assert!(error.is(ErrorKind::InvalidMessage));
	}

	#[test]
	fn test_serialization_restriction() {
		let signed = sign(b"foo", [with_key(SignatureAlgorithm::HS256, hmac_key())]).unwrap();
		assert!(let Ok(_) = verify(&signed, [with_key(SignatureAlgorithm::HS256, hmac_key()), with_compact()]));
		assert!(verify(&signed, [with_key(SignatureAlgorithm::HS256, hmac_key()), with_json()]).unwrap_err().kind() == ErrorKind::Verify);
	}

	#[test]
	fn test_detached_payload() {
		let signed = sign(b"", [with_key(SignatureAlgorithm::HS256, hmac_key()), with_detached_payload("payload")]).unwrap();
		let payload = verify(&signed, [with_key(SignatureAlgorithm::HS256, hmac_key()), with_detached_payload("payload")]).unwrap();
		assert!(payload == b"payload");

		assert!(verify(&signed, [with_key(SignatureAlgorithm::HS256, hmac_key()), with_detached_payload("other")]).unwrap_err().kind() == ErrorKind::Verification);
		assert!(verify(&signed, [with_key(SignatureAlgorithm::HS256, hmac_key())]).unwrap_err().kind() == ErrorKind::Verification);

		// A message with a payload can not be combined with a detached payload.
		let attached = sign(b"payload", [with_key(SignatureAlgorithm::HS256, hmac_key())]).unwrap();
		assert!(verify(&attached, [with_key(SignatureAlgorithm::HS256, hmac_key()), with_detached_payload("payload")]).unwrap_err().kind() == ErrorKind::Verify);
	}

	#[test]
	fn test_detached_unencoded_payload() {
		// RFC 7797 section 4.2
		let key = Key::octet(crate::encoding::decode(b"AyM1SysPpbyDfgZld3umj1qzKObwVMkoqQ-EstJQLr_T-1qS0gZH75aKtMN3Yj0iPS4hcgUuTwjAzZr1Z9CAow").unwrap());
		let signed = b"eyJhbGciOiJIUzI1NiIsImI2NCI6ZmFsc2UsImNyaXQiOlsiYjY0Il19..A5dxf2s96_n5FLueVuW1Z_vh161FwXZC4YLPff6dmDY";
		let payload = verify(signed, [with_key(SignatureAlgorithm::HS256, key), with_detached_payload("$.02")]).unwrap();
		assert!(payload == b"$.02");
	}

	#[test]
	fn test_multiple_signatures_key_used() {
		let rsa = Key::from(rsa_private_key());
		let ed25519 = Key::from(ed25519_private_key(1));
		let signed = sign(b"foo", [
			with_key(SignatureAlgorithm::RS256, rsa),
			with_key(SignatureAlgorithm::EDDSA, ed25519.clone()),
			with_json(),
		]).unwrap();

		let key_used = Slot::new();
		let message = Slot::new();
		let public = ed25519.public_key().unwrap();
		let payload = verify(&signed, [
			with_key(SignatureAlgorithm::EDDSA, public.clone()),
			with_key_used(&key_used),
			with_message(&message),
		]).unwrap();
		assert!(payload == b"foo");
		assert!(key_used.get() == Some(public));

		let message = message.take().unwrap();
		assert!(message.signatures().len() == 2);
		assert!(message.payload() == b"foo");
	}

	#[test]
	fn test_attempt_errors_are_joined() {
		let signed = sign(b"foo", [with_key(SignatureAlgorithm::HS256, hmac_key())]).unwrap();
		let error = verify(&signed, [
			with_key(SignatureAlgorithm::HS256, Key::octet(b"wrong".to_vec())),
			with_key(SignatureAlgorithm::HS384, hmac_key()),
		]).unwrap_err();
		assert!(error.kind() == ErrorKind::Verification);
		assert!(error.joined().len() == 2);
		assert!(error.joined()[0].is(ErrorKind::InvalidSignature));
		assert!(error.joined()[1].is(ErrorKind::UnsupportedAlgorithm));
	}

	#[test]
	fn test_rs256_large_payload() {
		let mut payload = vec![0u8; 1 << 20];
		rand::rngs::OsRng.fill_bytes(&mut payload);

		let key = Key::from(rsa_private_key());
		let signed = sign(&payload, [with_key(SignatureAlgorithm::RS256, key.clone())]).unwrap();
		let public = key.public_key().unwrap();
		assert!(verify(&signed, [with_key(SignatureAlgorithm::RS256, public.clone())]).unwrap() == payload);

		let message = parse(&signed).unwrap();
		let mut tampered = message.payload().to_vec();
		tampered[0] ^= 0xff;
		let header = crate::encoding::encode(&message.signatures()[0].protected_bytes().unwrap());
		let signature = crate::encoding::encode(message.signatures()[0].signature());
		let tampered = format!("{}.{}.{}", header, crate::encoding::encode(&tampered), signature);
		let error = verify(tampered.as_bytes(), [with_key(SignatureAlgorithm::RS256, public)]).unwrap_err();
		assert!(error.kind() == ErrorKind::Verification);
		assert!(error.is(ErrorKind::InvalidSignature));

		let other = Key::from(other_rsa_private_key()).public_key().unwrap();
		assert!(verify(&signed, [with_key(SignatureAlgorithm::RS256, other)]).unwrap_err().kind() == ErrorKind::Verification);
	}

	#[test]
	fn test_algorithm_binding() {
		let key = Key::from(rsa_private_key());
		let signed = sign(b"foo", [with_key(SignatureAlgorithm::RS256, key.clone())]).unwrap();
		let error = verify(&signed, [with_key(SignatureAlgorithm::PS256, key.public_key().unwrap())]).unwrap_err();
		assert!(error.kind() == ErrorKind::Verification);
		assert!(error.is(ErrorKind::UnsupportedAlgorithm));
	}

	#[test]
	fn test_provider_error_is_fatal() {
		let signed = sign(b"foo", [with_key(SignatureAlgorithm::HS256, hmac_key())]).unwrap();
		let failing = KeyProviderFn::new(|_: &Context, _: &mut dyn KeySink, _: &Signature, _: &Message| Err(Error::verify("key server unavailable")));
		let error = verify(&signed, [with_key_provider(failing), with_key(SignatureAlgorithm::HS256, hmac_key())]).unwrap_err();
		assert!(error.kind() == ErrorKind::Verify);
	}

	#[test]
	fn test_key_provider_sees_signature() {
		let signed = sign(b"foo", [with_key(SignatureAlgorithm::HS256, crate::Jwk::new(hmac_key()).with_key_id("k1"))]).unwrap();
		let provider = KeyProviderFn::new(|_: &Context, sink: &mut dyn KeySink, signature: &Signature, _: &Message| {
			if signature.key_id() == Some("k1") {
				sink.key(SignatureAlgorithm::HS256, hmac_key());
			}
			Ok(())
		});
		assert!(verify(&signed, [with_key_provider(provider)]).unwrap() == b"foo");
	}

	#[test]
	fn test_cancelled_context() {
		let signed = sign(b"foo", [with_key(SignatureAlgorithm::HS256, hmac_key())]).unwrap();
		let (context, handle) = Context::with_cancel();
		handle.cancel();
		let error = verify(&signed, [with_key(SignatureAlgorithm::HS256, hmac_key()), with_context(context)]).unwrap_err();
		assert!(error.kind() == ErrorKind::Verify);
		assert!(error.is(ErrorKind::Cancelled));
	}

	#[test]
	fn test_validate_key() {
		let signed = sign(b"foo", [with_key(SignatureAlgorithm::HS256, hmac_key())]).unwrap();
		let error = verify(&signed, [with_key(SignatureAlgorithm::HS256, Key::octet(Vec::new())), with_validate_key(true)]).unwrap_err();
		assert!(error.kind() == ErrorKind::Verification);
		assert!(error.is(ErrorKind::InvalidKey));
	}

	#[test]
	fn test_padded_encoder() {
		let signed = sign(b"fo", [with_key(SignatureAlgorithm::HS256, hmac_key()), with_base64_encoder(PaddedUrlEncoding)]).unwrap();
		assert!(signed.contains(&b'='));
		let payload = verify(&signed, [with_key(SignatureAlgorithm::HS256, hmac_key()), with_base64_encoder(PaddedUrlEncoding)]).unwrap();
		assert!(payload == b"fo");
		assert!(verify(&signed, [with_key(SignatureAlgorithm::HS256, hmac_key())]).unwrap_err().kind() == ErrorKind::Verification);
	}

	#[test]
	fn test_parsed_header_bytes_are_used() {
		// Protected header with whitespace that would not survive re-serialization.
		let protected = br#"{ "alg" : "HS256" }"#;
		let input = crate::signing_input::signing_input(protected, b"foo", &crate::RawUrlEncoding, true);
		let signature = crate::Signer::sign(&crate::hmac::HmacAlgorithm::HS256, &hmac_key(), &input).unwrap();
		let signed = format!("{}.Zm9v.{}", crate::encoding::encode(protected), crate::encoding::encode(&signature));
		assert!(verify(signed.as_bytes(), [with_key(SignatureAlgorithm::HS256, hmac_key())]).unwrap() == b"foo");
	}

	#[test]
	fn test_json_flattened_input() {
		let unprotected = Headers::from_object(json_object!{"kid": "a"}).unwrap();
		let options = WithKey::new(SignatureAlgorithm::HS256, hmac_key()).unprotected(unprotected);
		let signed = sign(b"foo", [SignOption::from(options), crate::with_json_flattened()]).unwrap();
		assert!(verify(&signed, [with_key(SignatureAlgorithm::HS256, hmac_key())]).unwrap() == b"foo");
	}
}
