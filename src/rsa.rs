//! RSA [`Verifier`] and [`Signer`] implementations using [RustCrypto](https://github.com/RustCrypto).
//!
//! Supports RSASSA-PKCS1-v1_5 (`RS256`, `RS384`, `RS512`)
//! and RSASSA-PSS with the salt length equal to the digest length (`PS256`, `PS384`, `PS512`).
//!
//! Signing accepts a [`Key::RsaPrivate`] key or a [`Key::Signer`] with an RSA public key.
//! Verifying accepts any key with an RSA public key.

use ::rsa::{Pkcs1v15Sign, Pss, RsaPrivateKey, RsaPublicKey};

use crate::{Error, HashAlgorithm, Key, Result, Signer, SignerOptions, Verifier};

/// The RSA padding schemes.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum RsaPadding {
	Pkcs1v15,
	Pss,
}

/// Signer and verifier for the RSA algorithms.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RsaAlgorithm {
	padding: RsaPadding,
	hash: HashAlgorithm,
}

impl RsaAlgorithm {
	pub const RS256: Self = Self::new(RsaPadding::Pkcs1v15, HashAlgorithm::Sha256);
	pub const RS384: Self = Self::new(RsaPadding::Pkcs1v15, HashAlgorithm::Sha384);
	pub const RS512: Self = Self::new(RsaPadding::Pkcs1v15, HashAlgorithm::Sha512);
	pub const PS256: Self = Self::new(RsaPadding::Pss, HashAlgorithm::Sha256);
	pub const PS384: Self = Self::new(RsaPadding::Pss, HashAlgorithm::Sha384);
	pub const PS512: Self = Self::new(RsaPadding::Pss, HashAlgorithm::Sha512);

	pub const fn new(padding: RsaPadding, hash: HashAlgorithm) -> Self {
		Self { padding, hash }
	}

	pub fn padding(&self) -> RsaPadding {
		self.padding
	}

	pub fn hash(&self) -> HashAlgorithm {
		self.hash
	}

	fn signer_options(&self) -> SignerOptions {
		match self.padding {
			RsaPadding::Pkcs1v15 => SignerOptions::Pkcs1v15(self.hash),
			RsaPadding::Pss      => SignerOptions::Pss(self.hash),
		}
	}

	fn sign_with_private_key(&self, key: &RsaPrivateKey, digest: &[u8]) -> Result<Vec<u8>> {
		let result = match self.padding {
			RsaPadding::Pkcs1v15 => key.sign(pkcs1v15_scheme(self.hash), digest),
			RsaPadding::Pss      => key.sign_with_rng(&mut rand::rngs::OsRng, pss_scheme(self.hash), digest),
		};
		result.map_err(|e| Error::sign(format!("RSA signing failed: {}", e)))
	}
}

impl Signer for RsaAlgorithm {
	fn sign(&self, key: &Key, signing_input: &[u8]) -> Result<Vec<u8>> {
		let digest = self.hash.digest(signing_input);
		match key.material() {
			Key::RsaPrivate(key) => self.sign_with_private_key(key, &digest),
			Key::Signer(signer) => {
				match signer.public_key().material() {
					Key::RsaPublic(_) => signer.sign(&digest, self.signer_options()),
					other => Err(Error::key_type_mismatch(format!("RSA signer has a {:?} public key", other.key_type()))),
				}
			},
			other => Err(Error::key_type_mismatch(format!("RSA signing requires an RSA private key, got {:?}", other.key_type()))),
		}
	}
}

impl Verifier for RsaAlgorithm {
	fn verify(&self, key: &Key, signing_input: &[u8], signature: &[u8]) -> Result<()> {
		let public_key = rsa_public_key(key)?;
		let digest = self.hash.digest(signing_input);
		let result = match self.padding {
			RsaPadding::Pkcs1v15 => public_key.verify(pkcs1v15_scheme(self.hash), &digest, signature),
			RsaPadding::Pss      => public_key.verify(pss_scheme(self.hash), &digest, signature),
		};
		result.map_err(|_| Error::invalid_signature("RSA signature mismatch"))
	}
}

/// Get the RSA public key from any key holding one.
fn rsa_public_key(key: &Key) -> Result<RsaPublicKey> {
	match key.public_key() {
		Some(Key::RsaPublic(key)) => Ok(key),
		_ => Err(Error::key_type_mismatch(format!("RSA verification requires an RSA key, got {:?}", key.key_type()))),
	}
}

fn pkcs1v15_scheme(hash: HashAlgorithm) -> Pkcs1v15Sign {
	match hash {
		HashAlgorithm::Sha256 => Pkcs1v15Sign::new::<sha2::Sha256>(),
		HashAlgorithm::Sha384 => Pkcs1v15Sign::new::<sha2::Sha384>(),
		HashAlgorithm::Sha512 => Pkcs1v15Sign::new::<sha2::Sha512>(),
	}
}

fn pss_scheme(hash: HashAlgorithm) -> Pss {
	match hash {
		HashAlgorithm::Sha256 => Pss::new::<sha2::Sha256>(),
		HashAlgorithm::Sha384 => Pss::new::<sha2::Sha384>(),
		HashAlgorithm::Sha512 => Pss::new::<sha2::Sha512>(),
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::key::test::{other_rsa_private_key, rsa_private_key};
	use crate::{CryptoSigner, ErrorKind};
	use assert2::assert;

	/// A signer that only hands out its public key.
	struct OpaqueRsaSigner(RsaPrivateKey);

	impl CryptoSigner for OpaqueRsaSigner {
		fn public_key(&self) -> Key {
			Key::RsaPublic(self.0.to_public_key())
		}

		fn sign(&self, data: &[u8], options: SignerOptions) -> Result<Vec<u8>> {
			let algorithm = match options {
				SignerOptions::Pkcs1v15(hash) => RsaAlgorithm::new(RsaPadding::Pkcs1v15, hash),
				SignerOptions::Pss(hash)      => RsaAlgorithm::new(RsaPadding::Pss, hash),
				_ => return Err(Error::key_type_mismatch("not an RSA operation")),
			};
			algorithm.sign_with_private_key(&self.0, data)
		}
	}

	#[test]
	fn test_sign_verify_all() {
		let key = Key::from(rsa_private_key());
		let public = Key::from(rsa_private_key().to_public_key());
		let other = Key::from(other_rsa_private_key().to_public_key());

		for algorithm in [RsaAlgorithm::RS256, RsaAlgorithm::RS384, RsaAlgorithm::RS512, RsaAlgorithm::PS256, RsaAlgorithm::PS384, RsaAlgorithm::PS512] {
			let signature = algorithm.sign(&key, b"header.payload").unwrap();
			assert!(signature.len() == 256);
			assert!(let Ok(()) = algorithm.verify(&public, b"header.payload", &signature));
			assert!(let Ok(()) = algorithm.verify(&key, b"header.payload", &signature));
			assert!(algorithm.verify(&public, b"header.payloaf", &signature).unwrap_err().kind() == ErrorKind::InvalidSignature);
			assert!(algorithm.verify(&other, b"header.payload", &signature).unwrap_err().kind() == ErrorKind::InvalidSignature);
		}
	}

	#[test]
	fn test_pkcs1v15_is_deterministic() {
		let key = Key::from(rsa_private_key());
		assert!(RsaAlgorithm::RS256.sign(&key, b"foo").unwrap() == RsaAlgorithm::RS256.sign(&key, b"foo").unwrap());
	}

	#[test]
	fn test_padding_mismatch() {
		let key = Key::from(rsa_private_key());
		let signature = RsaAlgorithm::PS256.sign(&key, b"foo").unwrap();
		assert!(RsaAlgorithm::RS256.verify(&key, b"foo", &signature).unwrap_err().kind() == ErrorKind::InvalidSignature);
	}

	#[test]
	fn test_opaque_signer() {
		let signer = Key::signer(OpaqueRsaSigner(rsa_private_key()));
		let public = Key::from(rsa_private_key().to_public_key());
		for algorithm in [RsaAlgorithm::RS512, RsaAlgorithm::PS384] {
			let signature = algorithm.sign(&signer, b"foo").unwrap();
			assert!(let Ok(()) = algorithm.verify(&public, b"foo", &signature));
			assert!(let Ok(()) = algorithm.verify(&signer, b"foo", &signature));
		}
	}

	#[test]
	fn test_wrong_key_type() {
		let key = Key::octet(b"secret".to_vec());
		assert!(RsaAlgorithm::RS256.sign(&key, b"foo").unwrap_err().kind() == ErrorKind::KeyTypeMismatch);
		assert!(RsaAlgorithm::PS256.verify(&key, b"foo", b"bar").unwrap_err().kind() == ErrorKind::KeyTypeMismatch);

		let public = Key::from(rsa_private_key().to_public_key());
		assert!(RsaAlgorithm::RS256.sign(&public, b"foo").unwrap_err().kind() == ErrorKind::KeyTypeMismatch);
	}
}
