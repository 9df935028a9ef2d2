//! Signature algorithm identifiers.
//!
//! An algorithm identifier is an opaque string token such as `HS256` or `EdDSA`.
//! The built-in identifiers are available as associated constants of [`SignatureAlgorithm`].
//! Registering a provider with the [`registry`](crate::registry) adds its identifier to the set of known algorithms.

use std::borrow::{Borrow, Cow};
use std::fmt;

use indexmap::IndexSet;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::JsonValue;

/// A JWS signature algorithm identifier.
#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct SignatureAlgorithm(Cow<'static, str>);

/// Hash function used by an algorithm family.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum HashAlgorithm {
	Sha256,
	Sha384,
	Sha512,
}

impl HashAlgorithm {
	/// The size of the digest in bytes.
	pub fn output_size(self) -> usize {
		match self {
			Self::Sha256 => 32,
			Self::Sha384 => 48,
			Self::Sha512 => 64,
		}
	}

	/// Compute the digest of some data.
	pub fn digest(self, data: &[u8]) -> Vec<u8> {
		use sha2::Digest;
		match self {
			Self::Sha256 => sha2::Sha256::digest(data).to_vec(),
			Self::Sha384 => sha2::Sha384::digest(data).to_vec(),
			Self::Sha512 => sha2::Sha512::digest(data).to_vec(),
		}
	}
}

impl SignatureAlgorithm {
	pub const HS256  : Self = Self(Cow::Borrowed("HS256"));
	pub const HS384  : Self = Self(Cow::Borrowed("HS384"));
	pub const HS512  : Self = Self(Cow::Borrowed("HS512"));
	pub const RS256  : Self = Self(Cow::Borrowed("RS256"));
	pub const RS384  : Self = Self(Cow::Borrowed("RS384"));
	pub const RS512  : Self = Self(Cow::Borrowed("RS512"));
	pub const PS256  : Self = Self(Cow::Borrowed("PS256"));
	pub const PS384  : Self = Self(Cow::Borrowed("PS384"));
	pub const PS512  : Self = Self(Cow::Borrowed("PS512"));
	pub const ES256  : Self = Self(Cow::Borrowed("ES256"));
	pub const ES384  : Self = Self(Cow::Borrowed("ES384"));
	pub const ES512  : Self = Self(Cow::Borrowed("ES512"));
	pub const ES256K : Self = Self(Cow::Borrowed("ES256K"));
	pub const EDDSA  : Self = Self(Cow::Borrowed("EdDSA"));
	pub const NONE   : Self = Self(Cow::Borrowed("none"));

	/// Create an algorithm identifier from a name.
	///
	/// This does not register the algorithm.
	pub fn new(name: impl Into<String>) -> Self {
		Self(Cow::Owned(name.into()))
	}

	/// The identifier as a string.
	pub fn as_str(&self) -> &str {
		&self.0
	}

	/// Check if this is the `none` algorithm.
	pub fn is_none(&self) -> bool {
		self.as_str() == "none"
	}

	/// Check if this identifier is in the set of known algorithms.
	pub fn is_known(&self) -> bool {
		KNOWN.read().contains(self)
	}

	/// The hash function implied by the identifier, if it names one.
	pub fn hash(&self) -> Option<HashAlgorithm> {
		match self.as_str() {
			"HS256" | "RS256" | "PS256" | "ES256" | "ES256K" => Some(HashAlgorithm::Sha256),
			"HS384" | "RS384" | "PS384" | "ES384"            => Some(HashAlgorithm::Sha384),
			"HS512" | "RS512" | "PS512" | "ES512"            => Some(HashAlgorithm::Sha512),
			_                                                => None,
		}
	}
}

/// The algorithms that are known without any registration.
pub const BUILTIN_ALGORITHMS: [SignatureAlgorithm; 15] = [
	SignatureAlgorithm::HS256,
	SignatureAlgorithm::HS384,
	SignatureAlgorithm::HS512,
	SignatureAlgorithm::RS256,
	SignatureAlgorithm::RS384,
	SignatureAlgorithm::RS512,
	SignatureAlgorithm::PS256,
	SignatureAlgorithm::PS384,
	SignatureAlgorithm::PS512,
	SignatureAlgorithm::ES256,
	SignatureAlgorithm::ES384,
	SignatureAlgorithm::ES512,
	SignatureAlgorithm::ES256K,
	SignatureAlgorithm::EDDSA,
	SignatureAlgorithm::NONE,
];

static KNOWN: Lazy<RwLock<IndexSet<SignatureAlgorithm>>> = Lazy::new(|| RwLock::new(builtin_set()));

fn builtin_set() -> IndexSet<SignatureAlgorithm> {
	BUILTIN_ALGORITHMS.into_iter().collect()
}

/// Look up a known algorithm by name.
pub fn lookup_signature_algorithm(name: &str) -> Option<SignatureAlgorithm> {
	KNOWN.read().get(name).cloned()
}

/// All known algorithms, in registration order.
pub fn known_algorithms() -> Vec<SignatureAlgorithm> {
	KNOWN.read().iter().cloned().collect()
}

/// Add an algorithm to the set of known algorithms.
pub(crate) fn register_known(alg: &SignatureAlgorithm) {
	KNOWN.write().insert(alg.clone());
}

/// Restore the set of known algorithms to the built-in algorithms.
pub(crate) fn reset_known() {
	*KNOWN.write() = builtin_set();
}

impl fmt::Display for SignatureAlgorithm {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

// Hashes the same as the name, so the known set can be searched by name.
impl Borrow<str> for SignatureAlgorithm {
	fn borrow(&self) -> &str {
		self.as_str()
	}
}

impl AsRef<str> for SignatureAlgorithm {
	fn as_ref(&self) -> &str {
		self.as_str()
	}
}

impl From<&'static str> for SignatureAlgorithm {
	fn from(name: &'static str) -> Self {
		Self(Cow::Borrowed(name))
	}
}

impl From<String> for SignatureAlgorithm {
	fn from(name: String) -> Self {
		Self(Cow::Owned(name))
	}
}

impl From<SignatureAlgorithm> for JsonValue {
	fn from(alg: SignatureAlgorithm) -> Self {
		JsonValue::String(alg.0.into_owned())
	}
}

impl From<&SignatureAlgorithm> for JsonValue {
	fn from(alg: &SignatureAlgorithm) -> Self {
		JsonValue::String(alg.as_str().to_string())
	}
}

impl PartialEq<str> for SignatureAlgorithm {
	fn eq(&self, other: &str) -> bool {
		self.as_str() == other
	}
}

impl PartialEq<&str> for SignatureAlgorithm {
	fn eq(&self, other: &&str) -> bool {
		self.as_str() == *other
	}
}

impl Serialize for SignatureAlgorithm {
	fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
		serializer.serialize_str(self.as_str())
	}
}

impl<'de> Deserialize<'de> for SignatureAlgorithm {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
		let name = String::deserialize(deserializer)?;
		Ok(Self::new(name))
	}
}
