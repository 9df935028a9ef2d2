//! This library provides JSON Web Signature encoding, decoding, signing and verification.
//!
//! Messages can be produced and consumed in the JWS Compact Serialization and in the
//! general and flattened JWS JSON Serialization ([RFC 7515](https://tools.ietf.org/html/rfc7515)),
//! including the unencoded payload option of [RFC 7797](https://tools.ietf.org/html/rfc7797) and detached payloads.
//!
//! Most users only need [`sign()`] and [`verify()`]:
//!
//! ```no_run
//! use jws::{Key, SignatureAlgorithm};
//!
//! let key = Key::octet(b"secretkey".to_vec());
//! let signed = jws::sign(b"hello", [jws::with_key(SignatureAlgorithm::HS256, key.clone())])?;
//! let payload = jws::verify(&signed, [jws::with_key(SignatureAlgorithm::HS256, key)])?;
//! assert_eq!(payload, b"hello");
//! # Ok::<(), jws::Error>(())
//! ```
//!
//! Signing and verifying for each algorithm is done through the [`Signer`] and [`Verifier`] traits.
//! Implementations are looked up in the [`registry`] by algorithm identifier.
//! Built-in implementations based on [RustCrypto](https://github.com/RustCrypto) exist for the
//! HMAC, RSA, ECDSA and EdDSA algorithms of [RFC 7518](https://tools.ietf.org/html/rfc7518) and [RFC 8037](https://tools.ietf.org/html/rfc8037),
//! and they can be overridden at runtime.
//!
//! Messages using the `none` algorithm can be created with [`with_insecure_no_signature`],
//! but they are never accepted by [`verify()`]. Use [`parse()`] to inspect them.

pub mod algorithm;
pub mod backend;
pub mod compact;
pub mod context;
pub mod ecdsa;
pub mod eddsa;
pub mod encoding;
pub mod error;
pub mod header;
pub mod hmac;
pub mod key;
pub mod key_provider;
pub mod message;
pub mod none;
pub mod options;
pub mod parse;
pub mod registry;
pub mod rsa;
pub mod sign;
pub mod signing_input;
pub mod verify;

pub use serde_json::Value as JsonValue;
pub type JsonObject = serde_json::Map<String, JsonValue>;

pub use crate::algorithm::{HashAlgorithm, SignatureAlgorithm};
pub use crate::context::{CancelHandle, Context};
pub use crate::encoding::{Base64Encoder, PaddedUrlEncoding, RawUrlEncoding};
pub use crate::error::{Error, ErrorKind, Result};
pub use crate::header::Headers;
pub use crate::key::{CryptoSigner, EcCurve, EcPrivateKey, EcPublicKey, Jwk, Key, KeyType, SignerOptions};
pub use crate::key_provider::{KeyProvider, KeyProviderFn, KeySetProvider, KeySink, StaticKeyProvider};
pub use crate::message::{CompactOptions, Message, Signature};
pub use crate::options::{
	with_base64_encoder,
	with_compact,
	with_context,
	with_detached_payload,
	with_insecure_no_signature,
	with_json,
	with_json_flattened,
	with_json_pretty,
	with_key,
	with_key_provider,
	with_key_used,
	with_message,
	with_validate_key,
	Serialization,
	WithKey,
};
pub use crate::parse::{parse, parse_reader, parse_str, parse_with, ParseOption};
pub use crate::sign::{sign, SignOption};
pub use crate::verify::{verify, Slot, VerifyOption};

#[doc(hidden)]
pub use serde_json as __serde_json;

/// Create a [`JsonObject`] using the syntax of [`serde_json::json`].
#[macro_export]
macro_rules! json_object {
	($($tt:tt)*) => {
		match $crate::__serde_json::json!({ $($tt)* }) {
			$crate::JsonValue::Object(object) => object,
			_ => unreachable!(),
		}
	};
}

/// A signer for one signature algorithm.
///
/// The algorithm is not part of the signer:
/// the same signer is registered for every algorithm identifier it should handle.
pub trait Signer: Send + Sync {
	/// Sign the JWS signing input with a key.
	///
	/// The returned signature must be plain bytes, not hex or base64 encoded.
	/// If the key can not be used, return an [`ErrorKind::KeyTypeMismatch`] error.
	fn sign(&self, key: &Key, signing_input: &[u8]) -> Result<Vec<u8>>;
}

/// A verifier for one signature algorithm.
pub trait Verifier: Send + Sync {
	/// Verify a signature over the JWS signing input.
	///
	/// If the signature is invalid, the function should return an [`ErrorKind::InvalidSignature`] error.
	/// It may also report any of the other error kinds.
	fn verify(&self, key: &Key, signing_input: &[u8], signature: &[u8]) -> Result<()>;
}
