//! HMAC [`Verifier`] and [`Signer`] implementations using [RustCrypto](https://github.com/RustCrypto).
//!
//! The HS256, HS384 and HS512 algorithms take a [`Key::Octet`] key of any non-zero length.

use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};

use crate::{Error, HashAlgorithm, Key, Result, Signer, Verifier};

type HmacSha256 = Hmac<sha2::Sha256>;
type HmacSha384 = Hmac<sha2::Sha384>;
type HmacSha512 = Hmac<sha2::Sha512>;

/// Signer and verifier for the HMAC-SHA-2 algorithms.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct HmacAlgorithm {
	hash: HashAlgorithm,
}

impl HmacAlgorithm {
	pub const HS256: Self = Self::new(HashAlgorithm::Sha256);
	pub const HS384: Self = Self::new(HashAlgorithm::Sha384);
	pub const HS512: Self = Self::new(HashAlgorithm::Sha512);

	/// Create an HMAC algorithm using the given hash function.
	pub const fn new(hash: HashAlgorithm) -> Self {
		Self { hash }
	}

	pub fn hash(&self) -> HashAlgorithm {
		self.hash
	}
}

impl Signer for HmacAlgorithm {
	fn sign(&self, key: &Key, signing_input: &[u8]) -> Result<Vec<u8>> {
		let key = octet_key(key)?;
		match self.hash {
			HashAlgorithm::Sha256 => compute_mac::<HmacSha256>(key, signing_input),
			HashAlgorithm::Sha384 => compute_mac::<HmacSha384>(key, signing_input),
			HashAlgorithm::Sha512 => compute_mac::<HmacSha512>(key, signing_input),
		}
	}
}

impl Verifier for HmacAlgorithm {
	fn verify(&self, key: &Key, signing_input: &[u8], signature: &[u8]) -> Result<()> {
		let key = octet_key(key)?;
		match self.hash {
			HashAlgorithm::Sha256 => verify_mac::<HmacSha256>(key, signing_input, signature),
			HashAlgorithm::Sha384 => verify_mac::<HmacSha384>(key, signing_input, signature),
			HashAlgorithm::Sha512 => verify_mac::<HmacSha512>(key, signing_input, signature),
		}
	}
}

/// Get the raw bytes of a symmetric key.
fn octet_key(key: &Key) -> Result<&[u8]> {
	match key.material() {
		Key::Octet(key) if key.is_empty() => Err(Error::invalid_key("HMAC key must not be empty")),
		Key::Octet(key) => Ok(key),
		other => Err(Error::key_type_mismatch(format!("HMAC requires a symmetric key, got {:?}", other.key_type()))),
	}
}

/// Create a MAC for a key.
fn new_mac<M: Mac + KeyInit>(key: &[u8]) -> Result<M> {
	<M as Mac>::new_from_slice(key).map_err(|_| Error::invalid_key("invalid HMAC key length"))
}

/// Compute the Message Authentication Code of the signing input.
fn compute_mac<M: Mac + KeyInit>(key: &[u8], signing_input: &[u8]) -> Result<Vec<u8>> {
	let mut mac = new_mac::<M>(key)?;
	mac.update(signing_input);
	Ok(mac.finalize().into_bytes().to_vec())
}

/// Verify the Message Authentication Code of the signing input in constant time.
fn verify_mac<M: Mac + KeyInit>(key: &[u8], signing_input: &[u8], signature: &[u8]) -> Result<()> {
	let mut mac = new_mac::<M>(key)?;
	mac.update(signing_input);
	mac.verify_slice(signature).map_err(|_| Error::invalid_signature("HMAC mismatch"))
}
