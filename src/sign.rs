//! Signing payloads into serialized messages.

use std::sync::Arc;

use crate::encoding::default_encoder;
use crate::options::{DetachedPayload, Encoder, Serialization, ValidateKey, WithKey};
use crate::signing_input::signing_input;
use crate::{registry, Base64Encoder, CompactOptions, Error, ErrorKind, Headers, Key, Message, Result, Signature, SignatureAlgorithm};

/// Options for [`sign`].
#[derive(Clone, Debug)]
pub enum SignOption {
	/// Add a signature with a key.
	Key(WithKey),

	/// Add an unsecured signature with the `none` algorithm.
	InsecureNoSignature(Option<Headers>),

	/// The serialization of the output.
	Serialization(Serialization),

	/// Sign a payload that is left out of the output.
	DetachedPayload(Vec<u8>),

	/// Validate keys before signing.
	ValidateKey(bool),

	/// The base64 encoder for the signing input and output.
	Base64Encoder(Arc<dyn Base64Encoder>),
}

impl From<WithKey> for SignOption {
	fn from(other: WithKey) -> Self {
		Self::Key(other)
	}
}

impl From<Serialization> for SignOption {
	fn from(other: Serialization) -> Self {
		Self::Serialization(other)
	}
}

impl From<DetachedPayload> for SignOption {
	fn from(other: DetachedPayload) -> Self {
		Self::DetachedPayload(other.0)
	}
}

impl From<ValidateKey> for SignOption {
	fn from(other: ValidateKey) -> Self {
		Self::ValidateKey(other.0)
	}
}

impl From<Encoder> for SignOption {
	fn from(other: Encoder) -> Self {
		Self::Base64Encoder(other.0)
	}
}

/// Everything needed to produce one signature.
struct SignerSpec {
	alg         : SignatureAlgorithm,
	key         : Key,
	protected   : Option<Headers>,
	unprotected : Option<Headers>,
}

/// Sign a payload and serialize the resulting message.
///
/// Every [`with_key`](crate::with_key) option adds a signature.
/// The output uses the JWS Compact Serialization unless a JSON serialization is selected.
/// Multiple signatures can only be serialized as general JSON.
///
/// With [`with_detached_payload`](crate::with_detached_payload), the `payload` argument must be empty.
pub fn sign(payload: &[u8], options: impl IntoIterator<Item = SignOption>) -> Result<Vec<u8>> {
	sign_inner(payload, options).map_err(|e| e.wrap(ErrorKind::Sign, "failed to sign payload"))
}

fn sign_inner(payload: &[u8], options: impl IntoIterator<Item = SignOption>) -> Result<Vec<u8>> {
	let mut signers = Vec::new();
	let mut unsecured = None;
	let mut serialization = Serialization::Compact;
	let mut detached = None;
	let mut validate_key = false;
	let mut encoder = None;

	for option in options {
		match option {
			SignOption::Key(with_key) => {
				if with_key.alg.is_none() {
					return Err(Error::unsupported_algorithm("the none algorithm can not be used with a key, use with_insecure_no_signature instead"));
				}
				signers.push(SignerSpec {
					alg: with_key.alg,
					key: with_key.key,
					protected: with_key.protected,
					unprotected: with_key.unprotected,
				});
			},
			// Only the last unsecured signature is used.
			SignOption::InsecureNoSignature(protected) => unsecured = Some(protected),
			SignOption::Serialization(value) => serialization = value,
			SignOption::DetachedPayload(value) => detached = Some(value),
			SignOption::ValidateKey(value) => validate_key = value,
			SignOption::Base64Encoder(value) => encoder = Some(value),
		}
	}

	if let Some(protected) = unsecured {
		signers.push(SignerSpec {
			alg: SignatureAlgorithm::NONE,
			key: Key::octet(Vec::new()),
			protected,
			unprotected: None,
		});
	}

	if signers.is_empty() {
		return Err(Error::sign("no signers given, use with_key or with_insecure_no_signature"));
	}

	if signers.len() > 1 && matches!(serialization, Serialization::Compact | Serialization::JsonFlattened) {
		return Err(Error::serialization_conflict(format!(
			"{} signers given, but {:?} serialization holds exactly one signature",
			signers.len(),
			serialization,
		)));
	}

	let is_detached = detached.is_some();
	tracing::debug!(signers = signers.len(), ?serialization, detached = is_detached, "signing payload");
	let payload = match detached {
		Some(_) if !payload.is_empty() => return Err(Error::sign("payload must be empty when signing a detached payload")),
		Some(detached) => detached,
		None => payload.to_vec(),
	};

	let encoder = encoder.unwrap_or_else(default_encoder);
	let mut message = Message::new(Vec::new());
	let mut b64 = None;

	for spec in signers {
		let signature = sign_one(spec, &payload, &encoder, is_detached, validate_key)?;
		match b64 {
			None => b64 = Some(signature.b64()),
			Some(b64) if b64 != signature.b64() => {
				return Err(Error::invalid_header_param("all signatures must use the same b64 header parameter"));
			},
			Some(_) => (),
		}
		message.append_signature(signature);
	}

	message.set_b64(b64.unwrap_or(true));
	message.set_payload(payload);

	match serialization {
		Serialization::Compact => message.compact(&CompactOptions {
			detached: is_detached,
			encoder: Some(encoder),
		}),
		Serialization::Json          => message.to_json(),
		Serialization::JsonPretty    => message.to_json_pretty(),
		Serialization::JsonFlattened => message.to_json_flattened(),
	}
}

fn sign_one(spec: SignerSpec, payload: &[u8], encoder: &Arc<dyn Base64Encoder>, detached: bool, validate_key: bool) -> Result<Signature> {
	let SignerSpec { alg, key, protected, unprotected } = spec;

	if let (Some(protected), Some(unprotected)) = (&protected, &unprotected) {
		if let Some(key) = protected.keys().find(|key| unprotected.contains(key)) {
			return Err(Error::invalid_header_param(format!("header parameter {:?} is present in both the protected and unprotected header", key)));
		}
	}

	let mut protected = protected.unwrap_or_default();
	protected.set(crate::header::ALGORITHM, &alg)?;

	if let Some(key_id) = key.key_id().filter(|key_id| !key_id.is_empty()) {
		let in_unprotected = unprotected.as_ref().map_or(false, |header| header.contains(crate::header::KEY_ID));
		if !protected.contains(crate::header::KEY_ID) && !in_unprotected {
			protected.set(crate::header::KEY_ID, key_id)?;
		}
	}

	let b64 = protected.b64();
	if !b64 && !detached && payload.contains(&b'.') {
		return Err(Error::invalid_message("unencoded payload can not contain '.' unless it is detached"));
	}

	if validate_key {
		key.validate()?;
	}

	let protected_bytes = protected.to_json_bytes()?;
	let input = signing_input(&protected_bytes, payload, &**encoder, b64);
	let signer = registry::signer_for(&alg)?;
	let signature = signer.sign(&key, &input)
		.map_err(|e| e.wrap(ErrorKind::Sign, format!("failed to sign with algorithm {}", alg)))?;
	tracing::trace!(%alg, len = signature.len(), "created signature");

	Ok(Signature::new(protected, unprotected, signature)
		.with_encoder(encoder.clone())
		.with_detached(detached))
}
