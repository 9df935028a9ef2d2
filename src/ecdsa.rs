//! ECDSA [`Verifier`] and [`Signer`] implementations using [RustCrypto](https://github.com/RustCrypto).
//!
//! Supports `ES256` (P-256), `ES384` (P-384), `ES512` (P-521) and `ES256K` (secp256k1).
//! Signatures use the fixed-width `R || S` form of [RFC 7518 section 3.4](https://tools.ietf.org/html/rfc7518#section-3.4),
//! where both integers are left padded to the byte size of the curve.

use signature::{Signer as _, Verifier as _};

use crate::key::{EcCurve, EcPrivateKey, EcPublicKey};
use crate::{Error, Key, Result, Signer, SignerOptions, Verifier};

/// Signer and verifier for the ECDSA algorithms.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct EcdsaAlgorithm {
	curve: EcCurve,
}

impl EcdsaAlgorithm {
	pub const ES256: Self = Self::new(EcCurve::P256);
	pub const ES384: Self = Self::new(EcCurve::P384);
	pub const ES512: Self = Self::new(EcCurve::P521);
	pub const ES256K: Self = Self::new(EcCurve::Secp256k1);

	pub const fn new(curve: EcCurve) -> Self {
		Self { curve }
	}

	pub fn curve(&self) -> EcCurve {
		self.curve
	}

	fn check_curve(&self, curve: EcCurve) -> Result<()> {
		if curve != self.curve {
			return Err(Error::key_type_mismatch(format!(
				"{} requires a key on curve {}, got {}",
				self.curve.algorithm(),
				self.curve.name(),
				curve.name(),
			)));
		}
		Ok(())
	}
}

macro_rules! sign_with {
	($key:expr, $signature:ty, $input:expr) => {{
		let signature: $signature = $key.try_sign($input).map_err(|e| Error::sign(format!("ECDSA signing failed: {}", e)))?;
		signature.to_bytes().to_vec()
	}};
}

macro_rules! verify_with {
	($key:expr, $signature:ty, $input:expr, $bytes:expr) => {{
		let signature = <$signature>::from_slice($bytes).map_err(|_| Error::invalid_signature("invalid ECDSA signature encoding"))?;
		$key.verify($input, &signature).map_err(|_| Error::invalid_signature("ECDSA signature mismatch"))
	}};
}

macro_rules! der_to_fixed {
	($signature:ty, $der:expr) => {
		<$signature>::from_der($der)
			.map(|signature| signature.to_bytes().to_vec())
			.map_err(|_| Error::sign("signer returned an invalid ASN.1 DER ECDSA signature"))
	};
}

impl Signer for EcdsaAlgorithm {
	fn sign(&self, key: &Key, signing_input: &[u8]) -> Result<Vec<u8>> {
		match key.material() {
			Key::EcPrivate(key) => {
				self.check_curve(key.curve())?;
				Ok(match key {
					EcPrivateKey::P256(key)      => sign_with!(key, p256::ecdsa::Signature, signing_input),
					EcPrivateKey::P384(key)      => sign_with!(key, p384::ecdsa::Signature, signing_input),
					EcPrivateKey::P521(key)      => sign_with!(key, p521::ecdsa::Signature, signing_input),
					EcPrivateKey::Secp256k1(key) => sign_with!(key, k256::ecdsa::Signature, signing_input),
				})
			},
			Key::Signer(signer) => {
				match signer.public_key().material() {
					Key::EcPublic(public) => self.check_curve(public.curve())?,
					other => return Err(Error::key_type_mismatch(format!("ECDSA signer has a {:?} public key", other.key_type()))),
				}
				let hash = self.curve.algorithm().hash().ok_or_else(|| Error::unsupported_algorithm("no hash for curve"))?;
				let signature = signer.sign(&hash.digest(signing_input), SignerOptions::Ecdsa(hash))?;
				self.to_fixed_width(&signature)
			},
			other => Err(Error::key_type_mismatch(format!("ECDSA signing requires an EC private key, got {:?}", other.key_type()))),
		}
	}
}

impl EcdsaAlgorithm {
	/// Convert a signature from a [`CryptoSigner`](crate::CryptoSigner) to the fixed-width form.
	///
	/// Signatures that already have the fixed width are returned unchanged.
	fn to_fixed_width(&self, signature: &[u8]) -> Result<Vec<u8>> {
		if signature.len() == 2 * self.curve.byte_size() {
			return Ok(signature.to_vec());
		}
		match self.curve {
			EcCurve::P256      => der_to_fixed!(p256::ecdsa::Signature, signature),
			EcCurve::P384      => der_to_fixed!(p384::ecdsa::Signature, signature),
			EcCurve::P521      => der_to_fixed!(p521::ecdsa::Signature, signature),
			EcCurve::Secp256k1 => der_to_fixed!(k256::ecdsa::Signature, signature),
		}
	}
}

impl Verifier for EcdsaAlgorithm {
	fn verify(&self, key: &Key, signing_input: &[u8], signature: &[u8]) -> Result<()> {
		let public_key = match key.public_key() {
			Some(Key::EcPublic(public_key)) => public_key,
			_ => return Err(Error::key_type_mismatch(format!("ECDSA verification requires an EC key, got {:?}", key.key_type()))),
		};
		self.check_curve(public_key.curve())?;

		if signature.len() != 2 * self.curve.byte_size() {
			return Err(Error::invalid_signature(format!(
				"invalid signature length for curve {}: expected {} bytes, got {}",
				self.curve.name(),
				2 * self.curve.byte_size(),
				signature.len(),
			)));
		}

		match &public_key {
			EcPublicKey::P256(key) => verify_with!(key, p256::ecdsa::Signature, signing_input, signature),
			EcPublicKey::P384(key) => verify_with!(key, p384::ecdsa::Signature, signing_input, signature),
			EcPublicKey::P521(key) => verify_with!(key, p521::ecdsa::Signature, signing_input, signature),
			EcPublicKey::Secp256k1(key) => {
				// Accept both low-S and high-S signatures, like the other curves.
				let parsed = k256::ecdsa::Signature::from_slice(signature).map_err(|_| Error::invalid_signature("invalid ECDSA signature encoding"))?;
				let parsed = parsed.normalize_s().unwrap_or(parsed);
				key.verify(signing_input, &parsed).map_err(|_| Error::invalid_signature("ECDSA signature mismatch"))
			},
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::{CryptoSigner, ErrorKind};
	use assert2::assert;

	fn private_key(curve: EcCurve) -> Key {
		let key: EcPrivateKey = match curve {
			EcCurve::P256      => p256::ecdsa::SigningKey::from_slice(&[0x11; 32]).unwrap().into(),
			EcCurve::P384      => p384::ecdsa::SigningKey::from_slice(&[0x22; 48]).unwrap().into(),
			EcCurve::P521      => p521::ecdsa::SigningKey::from_slice(&[0x01; 66]).unwrap().into(),
			EcCurve::Secp256k1 => k256::ecdsa::SigningKey::from_slice(&[0x33; 32]).unwrap().into(),
		};
		Key::from(key)
	}

	/// A signer that returns ASN.1 DER signatures, like most hardware tokens do.
	struct DerSigner(p256::ecdsa::SigningKey);

	impl CryptoSigner for DerSigner {
		fn public_key(&self) -> Key {
			Key::from(self.0.verifying_key().clone())
		}

		fn sign(&self, data: &[u8], options: SignerOptions) -> Result<Vec<u8>> {
			use p256::ecdsa::signature::hazmat::PrehashSigner;
			assert!(options == SignerOptions::Ecdsa(crate::HashAlgorithm::Sha256));
			let signature: p256::ecdsa::Signature = self.0.sign_prehash(data).unwrap();
			Ok(signature.to_der().as_bytes().to_vec())
		}
	}

	#[test]
	fn test_sign_verify_all_curves() {
		for curve in [EcCurve::P256, EcCurve::P384, EcCurve::P521, EcCurve::Secp256k1] {
			let algorithm = EcdsaAlgorithm::new(curve);
			let key = private_key(curve);
			let public = key.public_key().unwrap();

			let signature = algorithm.sign(&key, b"header.payload").unwrap();
			assert!(signature.len() == 2 * curve.byte_size());
			assert!(let Ok(()) = algorithm.verify(&public, b"header.payload", &signature));
			assert!(algorithm.verify(&public, b"header.payloaf", &signature).unwrap_err().kind() == ErrorKind::InvalidSignature);
		}
	}

	#[test]
	fn test_signature_length_is_checked() {
		let key = private_key(EcCurve::P256);
		let mut signature = EcdsaAlgorithm::ES256.sign(&key, b"foo").unwrap();
		signature.push(0);
		assert!(EcdsaAlgorithm::ES256.verify(&key, b"foo", &signature).unwrap_err().kind() == ErrorKind::InvalidSignature);
		assert!(EcdsaAlgorithm::ES256.verify(&key, b"foo", &signature[..63]).unwrap_err().kind() == ErrorKind::InvalidSignature);
	}

	#[test]
	fn test_curve_mismatch() {
		let key = private_key(EcCurve::P384);
		assert!(EcdsaAlgorithm::ES256.sign(&key, b"foo").unwrap_err().kind() == ErrorKind::KeyTypeMismatch);
		assert!(EcdsaAlgorithm::ES512.verify(&key, b"foo", &[0; 132]).unwrap_err().kind() == ErrorKind::KeyTypeMismatch);
		assert!(EcdsaAlgorithm::ES256K.sign(&Key::octet(b"secret".to_vec()), b"foo").unwrap_err().kind() == ErrorKind::KeyTypeMismatch);
	}

	#[test]
	fn test_der_signer_is_converted() {
		let signing_key = p256::ecdsa::SigningKey::from_slice(&[0x44; 32]).unwrap();
		let public = Key::from(signing_key.verifying_key().clone());
		let signer = Key::signer(DerSigner(signing_key));

		let signature = EcdsaAlgorithm::ES256.sign(&signer, b"header.payload").unwrap();
		assert!(signature.len() == 64);
		assert!(let Ok(()) = EcdsaAlgorithm::ES256.verify(&public, b"header.payload", &signature));
	}

	#[test]
	fn test_short_r_is_left_padded() {
		let signing_key = p256::ecdsa::SigningKey::from_slice(&[0x44; 32]).unwrap();
		let key = Key::from(signing_key.clone());
		let public = key.public_key().unwrap();
		let der_signer = Key::signer(DerSigner(signing_key));

		// Signing is deterministic, so search for an input whose R starts with a zero byte.
		let (input, signature) = (0..100_000)
			.map(|i| format!("header.{}", i))
			.map(|input| {
				let signature = EcdsaAlgorithm::ES256.sign(&key, input.as_bytes()).unwrap();
				(input, signature)
			})
			.find(|(_, signature)| signature[0] == 0)
			.unwrap();

		assert!(signature.len() == 64);
		assert!(let Ok(()) = EcdsaAlgorithm::ES256.verify(&public, input.as_bytes(), &signature));

		// The DER form drops the leading zero of R, the fixed-width form must not.
		let der = p256::ecdsa::Signature::from_slice(&signature).unwrap().to_der();
		assert!(der.as_bytes().len() < 72);
		let converted = EcdsaAlgorithm::ES256.sign(&der_signer, input.as_bytes()).unwrap();
		assert!(converted == signature);
		assert!(let Ok(()) = EcdsaAlgorithm::ES256.verify(&public, input.as_bytes(), &converted));

		// Without the padding byte the signature is rejected.
		let error = EcdsaAlgorithm::ES256.verify(&public, input.as_bytes(), &signature[1..]).unwrap_err();
		assert!(error.kind() == ErrorKind::InvalidSignature);
	}

	#[test]
	fn test_secp256k1_high_s_is_accepted() {
		let key = private_key(EcCurve::Secp256k1);
		let public = key.public_key().unwrap();
		let signature = EcdsaAlgorithm::ES256K.sign(&key, b"foo").unwrap();

		// Flip S to the high half of the curve order.
		let parsed = k256::ecdsa::Signature::from_slice(&signature).unwrap();
		let (r, s) = parsed.split_scalars();
		let high = k256::ecdsa::Signature::from_scalars(r, -s).unwrap();
		assert!(let Ok(()) = EcdsaAlgorithm::ES256K.verify(&public, b"foo", &high.to_bytes()));
	}
}
