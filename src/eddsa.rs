//! EdDSA [`Verifier`] and [`Signer`] implementations for Ed25519 ([RFC 8037](https://tools.ietf.org/html/rfc8037)).

use ed25519_dalek::{Signer as _, Verifier as _};

use crate::{Error, Key, Result, Signer, SignerOptions, Verifier};

/// Signer and verifier for the `EdDSA` algorithm.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct EdDsaAlgorithm;

impl Signer for EdDsaAlgorithm {
	fn sign(&self, key: &Key, signing_input: &[u8]) -> Result<Vec<u8>> {
		match key.material() {
			Key::Ed25519Private(key) => Ok(key.sign(signing_input).to_bytes().to_vec()),
			Key::Signer(signer) => {
				match signer.public_key().material() {
					Key::Ed25519Public(_) => signer.sign(signing_input, SignerOptions::Ed25519),
					other => Err(Error::key_type_mismatch(format!("EdDSA signer has a {:?} public key", other.key_type()))),
				}
			},
			other => Err(Error::key_type_mismatch(format!("EdDSA signing requires an Ed25519 private key, got {:?}", other.key_type()))),
		}
	}
}

impl Verifier for EdDsaAlgorithm {
	fn verify(&self, key: &Key, signing_input: &[u8], signature: &[u8]) -> Result<()> {
		let public_key = match key.public_key() {
			Some(Key::Ed25519Public(key)) => key,
			_ => return Err(Error::key_type_mismatch(format!("EdDSA verification requires an Ed25519 key, got {:?}", key.key_type()))),
		};
		let signature = ed25519_dalek::Signature::from_slice(signature).map_err(|_| Error::invalid_signature("invalid Ed25519 signature length"))?;
		public_key.verify(signing_input, &signature).map_err(|_| Error::invalid_signature("Ed25519 signature mismatch"))
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::key::test::{ed25519_private_key, rsa_private_key};
	use crate::ErrorKind;
	use assert2::assert;

	#[test]
	fn test_sign_verify() {
		let key = Key::from(ed25519_private_key(1));
		let public = Key::from(ed25519_private_key(1).verifying_key());

		let signature = EdDsaAlgorithm.sign(&key, b"header.payload").unwrap();
		assert!(signature.len() == 64);
		assert!(let Ok(()) = EdDsaAlgorithm.verify(&public, b"header.payload", &signature));
		assert!(let Ok(()) = EdDsaAlgorithm.verify(&key, b"header.payload", &signature));
		assert!(EdDsaAlgorithm.verify(&public, b"header.payloaf", &signature).unwrap_err().kind() == ErrorKind::InvalidSignature);
		assert!(EdDsaAlgorithm.verify(&public, b"header.payload", &signature[..63]).unwrap_err().kind() == ErrorKind::InvalidSignature);

		let other = Key::from(ed25519_private_key(2).verifying_key());
		assert!(EdDsaAlgorithm.verify(&other, b"header.payload", &signature).unwrap_err().kind() == ErrorKind::InvalidSignature);
	}

	#[test]
	fn test_rejects_other_keys() {
		let rsa = Key::from(rsa_private_key());
		assert!(EdDsaAlgorithm.sign(&rsa, b"foo").unwrap_err().kind() == ErrorKind::KeyTypeMismatch);
		assert!(EdDsaAlgorithm.verify(&rsa, b"foo", &[0; 64]).unwrap_err().kind() == ErrorKind::KeyTypeMismatch);

		let ec = Key::from(p256::ecdsa::SigningKey::from_slice(&[1; 32]).unwrap());
		assert!(EdDsaAlgorithm.sign(&ec, b"foo").unwrap_err().kind() == ErrorKind::KeyTypeMismatch);
	}
}
