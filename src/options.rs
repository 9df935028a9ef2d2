//! Option constructors for [`sign`](crate::sign()), [`verify`](crate::verify()) and [`parse`](crate::parse_with()).
//!
//! Options that apply to more than one operation are generic over the option type,
//! so the same function can be used for each operation:
//!
//! ```no_run
//! use jws::{Key, SignatureAlgorithm};
//!
//! let key = Key::octet(b"secretkey".to_vec());
//! let signed = jws::sign(b"hello", [jws::with_key(SignatureAlgorithm::HS256, key.clone()), jws::with_json()])?;
//! let payload = jws::verify(&signed, [jws::with_key(SignatureAlgorithm::HS256, key), jws::with_json()])?;
//! # Ok::<(), jws::Error>(())
//! ```

use std::sync::Arc;

use crate::{Base64Encoder, Context, Headers, Key, KeyProvider, Message, SignOption, SignatureAlgorithm, Slot, VerifyOption};

/// The serialization of a message.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Serialization {
	/// The JWS Compact Serialization.
	Compact,

	/// The general JWS JSON Serialization.
	Json,

	/// The general JWS JSON Serialization with indentation.
	JsonPretty,

	/// The flattened JWS JSON Serialization.
	JsonFlattened,
}

impl Serialization {
	pub fn is_json(self) -> bool {
		!matches!(self, Self::Compact)
	}
}

/// A key to sign or verify with.
///
/// When signing, header parameters to add to the protected and unprotected header can be given.
/// When verifying, the header parameters are ignored.
#[derive(Clone, Debug)]
pub struct WithKey {
	pub(crate) alg         : SignatureAlgorithm,
	pub(crate) key         : Key,
	pub(crate) protected   : Option<Headers>,
	pub(crate) unprotected : Option<Headers>,
}

impl WithKey {
	pub fn new(alg: SignatureAlgorithm, key: impl Into<Key>) -> Self {
		Self {
			alg,
			key: key.into(),
			protected: None,
			unprotected: None,
		}
	}

	/// Add parameters to the protected header of the signature.
	pub fn protected(mut self, headers: Headers) -> Self {
		self.protected = Some(headers);
		self
	}

	/// Add parameters to the unprotected header of the signature.
	pub fn unprotected(mut self, headers: Headers) -> Self {
		self.unprotected = Some(headers);
		self
	}
}

/// A payload given separately from the message.
#[derive(Clone, Debug)]
pub struct DetachedPayload(pub Vec<u8>);

/// Whether to validate keys before use.
#[derive(Copy, Clone, Debug)]
pub struct ValidateKey(pub bool);

/// The base64 encoder to use.
#[derive(Clone, Debug)]
pub struct Encoder(pub Arc<dyn Base64Encoder>);

/// Sign or verify with a key.
pub fn with_key<O: From<WithKey>>(alg: SignatureAlgorithm, key: impl Into<Key>) -> O {
	WithKey::new(alg, key).into()
}

/// Use the general JWS JSON Serialization.
pub fn with_json<O: From<Serialization>>() -> O {
	Serialization::Json.into()
}

/// Use the general JWS JSON Serialization, with indentation.
pub fn with_json_pretty<O: From<Serialization>>() -> O {
	Serialization::JsonPretty.into()
}

/// Use the flattened JWS JSON Serialization.
pub fn with_json_flattened<O: From<Serialization>>() -> O {
	Serialization::JsonFlattened.into()
}

/// Use the JWS Compact Serialization.
pub fn with_compact<O: From<Serialization>>() -> O {
	Serialization::Compact.into()
}

/// Sign or verify a payload that is not part of the message.
pub fn with_detached_payload<O: From<DetachedPayload>>(payload: impl Into<Vec<u8>>) -> O {
	DetachedPayload(payload.into()).into()
}

/// Validate keys before signing or verifying with them.
pub fn with_validate_key<O: From<ValidateKey>>(validate: bool) -> O {
	ValidateKey(validate).into()
}

/// Use a different base64 encoder.
pub fn with_base64_encoder<O: From<Encoder>>(encoder: impl Base64Encoder + 'static) -> O {
	Encoder(Arc::new(encoder)).into()
}

/// Add an unsecured signature with the `none` algorithm.
///
/// Messages signed this way can never be verified with [`verify`](crate::verify()).
pub fn with_insecure_no_signature(protected: Option<Headers>) -> SignOption {
	SignOption::InsecureNoSignature(protected)
}

/// Verify with keys from a provider.
pub fn with_key_provider(provider: impl KeyProvider + 'static) -> VerifyOption {
	VerifyOption::KeyProvider(Arc::new(provider))
}

/// Store the key that verified the message in a slot.
pub fn with_key_used(slot: &Slot<Key>) -> VerifyOption {
	VerifyOption::KeyUsed(slot.clone())
}

/// Store the parsed message in a slot.
pub fn with_message(slot: &Slot<Message>) -> VerifyOption {
	VerifyOption::Message(slot.clone())
}

/// Pass a context to the key providers.
pub fn with_context(context: Context) -> VerifyOption {
	VerifyOption::Context(context)
}
