//! Keys for signing and verifying messages.
//!
//! A [`Key`] holds the key material a caller passes to [`with_key`](crate::with_key).
//! Each algorithm family decides which variants it accepts.
//! A key wrapped in a [`Jwk`] carries JWK metadata such as the key ID,
//! and keys held elsewhere (for example in a hardware module) can be used through the [`CryptoSigner`] trait.

use std::fmt;
use std::sync::Arc;

use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};

use crate::{Error, HashAlgorithm, Result, SignatureAlgorithm};

/// Key material for signing or verifying.
#[derive(Clone)]
pub enum Key {
	/// A symmetric key for the HMAC algorithms.
	Octet(Vec<u8>),

	/// An RSA private key.
	RsaPrivate(Box<RsaPrivateKey>),

	/// An RSA public key.
	RsaPublic(RsaPublicKey),

	/// An ECDSA private key.
	EcPrivate(EcPrivateKey),

	/// An ECDSA public key.
	EcPublic(EcPublicKey),

	/// An Ed25519 private key.
	Ed25519Private(ed25519_dalek::SigningKey),

	/// An Ed25519 public key.
	Ed25519Public(ed25519_dalek::VerifyingKey),

	/// An opaque signer that does not expose its private key.
	Signer(Arc<dyn CryptoSigner>),

	/// A key with JWK metadata.
	Jwk(Box<Jwk>),
}

/// A key with JSON Web Key metadata.
#[derive(Clone, Debug, PartialEq)]
pub struct Jwk {
	/// The `kid` parameter.
	pub key_id: Option<String>,

	/// The `alg` parameter.
	pub algorithm: Option<SignatureAlgorithm>,

	/// The `use` parameter.
	pub key_use: Option<String>,

	/// The key material.
	pub key: Key,
}

/// The key types of RFC 7518 section 6.1.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum KeyType {
	Octet,
	Rsa,
	Ec,
	Okp,
}

/// The elliptic curves supported for ECDSA.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum EcCurve {
	P256,
	P384,
	P521,
	Secp256k1,
}

/// An ECDSA private key on one of the supported curves.
#[derive(Clone)]
pub enum EcPrivateKey {
	P256(p256::ecdsa::SigningKey),
	P384(p384::ecdsa::SigningKey),
	P521(p521::ecdsa::SigningKey),
	Secp256k1(k256::ecdsa::SigningKey),
}

/// An ECDSA public key on one of the supported curves.
#[derive(Clone)]
pub enum EcPublicKey {
	P256(p256::ecdsa::VerifyingKey),
	P384(p384::ecdsa::VerifyingKey),
	P521(p521::ecdsa::VerifyingKey),
	Secp256k1(k256::ecdsa::VerifyingKey),
}

impl fmt::Debug for EcPublicKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("EcPublicKey")
			.field("curve", &self.curve())
			.field("sec1", &self.to_sec1_bytes())
			.finish()
	}
}

/// How a [`CryptoSigner`] should sign.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SignerOptions {
	/// RSASSA-PKCS1-v1_5 over a digest.
	Pkcs1v15(HashAlgorithm),

	/// RSASSA-PSS over a digest, with the salt length equal to the digest length.
	Pss(HashAlgorithm),

	/// ECDSA over a digest. The signature may be returned ASN.1 DER encoded.
	Ecdsa(HashAlgorithm),

	/// Ed25519 over the whole message.
	Ed25519,
}

/// A signing capability that does not expose its private key.
///
/// The signing input is hashed before it is passed to [`sign`](Self::sign),
/// except for Ed25519 which signs the message itself.
/// ECDSA signers may return ASN.1 DER signatures, they are converted to the fixed-width JWS form.
pub trait CryptoSigner: Send + Sync {
	/// The public key of this signer.
	fn public_key(&self) -> Key;

	/// Sign a digest or message.
	fn sign(&self, data: &[u8], options: SignerOptions) -> Result<Vec<u8>>;
}

impl EcCurve {
	/// The size of the curve in bits.
	pub fn bits(self) -> usize {
		match self {
			Self::P256 | Self::Secp256k1 => 256,
			Self::P384                   => 384,
			Self::P521                   => 521,
		}
	}

	/// The size in bytes of one half of a fixed-width signature.
	pub fn byte_size(self) -> usize {
		(self.bits() + 7) / 8
	}

	/// The JWK name of the curve.
	pub fn name(self) -> &'static str {
		match self {
			Self::P256      => "P-256",
			Self::P384      => "P-384",
			Self::P521      => "P-521",
			Self::Secp256k1 => "secp256k1",
		}
	}

	/// The ECDSA algorithm that uses this curve.
	pub fn algorithm(self) -> SignatureAlgorithm {
		match self {
			Self::P256      => SignatureAlgorithm::ES256,
			Self::P384      => SignatureAlgorithm::ES384,
			Self::P521      => SignatureAlgorithm::ES512,
			Self::Secp256k1 => SignatureAlgorithm::ES256K,
		}
	}
}

impl EcPrivateKey {
	pub fn curve(&self) -> EcCurve {
		match self {
			Self::P256(_)      => EcCurve::P256,
			Self::P384(_)      => EcCurve::P384,
			Self::P521(_)      => EcCurve::P521,
			Self::Secp256k1(_) => EcCurve::Secp256k1,
		}
	}

	pub fn public_key(&self) -> EcPublicKey {
		match self {
			Self::P256(key)      => EcPublicKey::P256(key.verifying_key().clone()),
			Self::P384(key)      => EcPublicKey::P384(key.verifying_key().clone()),
			Self::P521(key)      => EcPublicKey::P521(p521::ecdsa::VerifyingKey::from(key)),
			Self::Secp256k1(key) => EcPublicKey::Secp256k1(key.verifying_key().clone()),
		}
	}
}

impl EcPublicKey {
	pub fn curve(&self) -> EcCurve {
		match self {
			Self::P256(_)      => EcCurve::P256,
			Self::P384(_)      => EcCurve::P384,
			Self::P521(_)      => EcCurve::P521,
			Self::Secp256k1(_) => EcCurve::Secp256k1,
		}
	}

	/// The uncompressed SEC1 encoding of the public point.
	pub fn to_sec1_bytes(&self) -> Vec<u8> {
		match self {
			Self::P256(key)      => key.to_encoded_point(false).as_bytes().to_vec(),
			Self::P384(key)      => key.to_encoded_point(false).as_bytes().to_vec(),
			Self::P521(key)      => key.to_encoded_point(false).as_bytes().to_vec(),
			Self::Secp256k1(key) => key.to_encoded_point(false).as_bytes().to_vec(),
		}
	}

	/// Decode a SEC1 encoded public point on the given curve.
	pub fn from_sec1_bytes(curve: EcCurve, data: &[u8]) -> Result<Self> {
		let invalid = || Error::invalid_key(format!("invalid SEC1 encoded point for curve {}", curve.name()));
		Ok(match curve {
			EcCurve::P256      => Self::P256(p256::ecdsa::VerifyingKey::from_sec1_bytes(data).map_err(|_| invalid())?),
			EcCurve::P384      => Self::P384(p384::ecdsa::VerifyingKey::from_sec1_bytes(data).map_err(|_| invalid())?),
			EcCurve::P521      => Self::P521(p521::ecdsa::VerifyingKey::from_sec1_bytes(data).map_err(|_| invalid())?),
			EcCurve::Secp256k1 => Self::Secp256k1(k256::ecdsa::VerifyingKey::from_sec1_bytes(data).map_err(|_| invalid())?),
		})
	}
}

impl PartialEq for EcPrivateKey {
	fn eq(&self, other: &Self) -> bool {
		self.public_key() == other.public_key()
	}
}

impl PartialEq for EcPublicKey {
	fn eq(&self, other: &Self) -> bool {
		self.curve() == other.curve() && self.to_sec1_bytes() == other.to_sec1_bytes()
	}
}

impl Jwk {
	/// Wrap a key without any metadata.
	pub fn new(key: impl Into<Key>) -> Self {
		Self {
			key_id: None,
			algorithm: None,
			key_use: None,
			key: key.into(),
		}
	}

	pub fn with_key_id(mut self, key_id: impl Into<String>) -> Self {
		self.key_id = Some(key_id.into());
		self
	}

	pub fn with_algorithm(mut self, algorithm: SignatureAlgorithm) -> Self {
		self.algorithm = Some(algorithm);
		self
	}

	pub fn with_key_use(mut self, key_use: impl Into<String>) -> Self {
		self.key_use = Some(key_use.into());
		self
	}
}

impl Key {
	/// Create a symmetric key.
	pub fn octet(key: impl Into<Vec<u8>>) -> Self {
		Self::Octet(key.into())
	}

	/// Create a key from an opaque signer.
	pub fn signer(signer: impl CryptoSigner + 'static) -> Self {
		Self::Signer(Arc::new(signer))
	}

	/// The key material, with all [`Jwk`] wrappers removed.
	pub fn material(&self) -> &Key {
		let mut key = self;
		while let Key::Jwk(jwk) = key {
			key = &jwk.key;
		}
		key
	}

	/// The JWK metadata of this key, if it has any.
	pub fn as_jwk(&self) -> Option<&Jwk> {
		match self {
			Key::Jwk(jwk) => Some(jwk),
			_             => None,
		}
	}

	/// The key ID of a JWK, if set.
	pub fn key_id(&self) -> Option<&str> {
		self.as_jwk().and_then(|jwk| jwk.key_id.as_deref())
	}

	/// The key type.
	pub fn key_type(&self) -> KeyType {
		match self.material() {
			Key::Octet(_)                               => KeyType::Octet,
			Key::RsaPrivate(_) | Key::RsaPublic(_)      => KeyType::Rsa,
			Key::EcPrivate(_) | Key::EcPublic(_)        => KeyType::Ec,
			Key::Ed25519Private(_) | Key::Ed25519Public(_) => KeyType::Okp,
			Key::Signer(signer)                         => signer.public_key().key_type(),
			Key::Jwk(jwk)                               => jwk.key.key_type(),
		}
	}

	/// The public key for this key.
	///
	/// Returns `None` for symmetric keys.
	pub fn public_key(&self) -> Option<Key> {
		match self.material() {
			Key::Octet(_)             => None,
			Key::RsaPrivate(key)      => Some(Key::RsaPublic(key.to_public_key())),
			Key::RsaPublic(key)       => Some(Key::RsaPublic(key.clone())),
			Key::EcPrivate(key)       => Some(Key::EcPublic(key.public_key())),
			Key::EcPublic(key)        => Some(Key::EcPublic(key.clone())),
			Key::Ed25519Private(key)  => Some(Key::Ed25519Public(key.verifying_key())),
			Key::Ed25519Public(key)   => Some(Key::Ed25519Public(*key)),
			Key::Signer(signer)       => signer.public_key().public_key(),
			Key::Jwk(jwk)             => jwk.key.public_key(),
		}
	}

	/// Check that the key is usable.
	pub fn validate(&self) -> Result<()> {
		match self.material() {
			Key::Octet(key) => {
				if key.is_empty() {
					return Err(Error::invalid_key("symmetric key must not be empty"));
				}
				Ok(())
			},
			Key::RsaPrivate(key) => {
				key.validate().map_err(|e| Error::invalid_key(format!("invalid RSA private key: {}", e)))
			},
			Key::RsaPublic(key) => {
				if key.e() < &rsa::BigUint::from(3u32) || key.n() == &rsa::BigUint::from(0u32) {
					return Err(Error::invalid_key("invalid RSA public key parameters"));
				}
				Ok(())
			},
			Key::EcPrivate(_) | Key::EcPublic(_) | Key::Ed25519Private(_) | Key::Ed25519Public(_) => Ok(()),
			Key::Signer(signer) => signer.public_key().validate(),
			Key::Jwk(jwk) => jwk.key.validate(),
		}
	}
}

impl PartialEq for Key {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Key::Octet(a),          Key::Octet(b))          => a == b,
			(Key::RsaPrivate(a),     Key::RsaPrivate(b))     => a == b,
			(Key::RsaPublic(a),      Key::RsaPublic(b))      => a == b,
			(Key::EcPrivate(a),      Key::EcPrivate(b))      => a == b,
			(Key::EcPublic(a),       Key::EcPublic(b))       => a == b,
			(Key::Ed25519Private(a), Key::Ed25519Private(b)) => a.to_bytes() == b.to_bytes(),
			(Key::Ed25519Public(a),  Key::Ed25519Public(b))  => a == b,
			(Key::Signer(a),         Key::Signer(b))         => Arc::ptr_eq(a, b),
			(Key::Jwk(a),            Key::Jwk(b))            => a == b,
			_ => false,
		}
	}
}

impl fmt::Debug for Key {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Key::Octet(key)          => write!(f, "Octet({} bytes)", key.len()),
			Key::RsaPrivate(key)     => write!(f, "RsaPrivate({} bits)", key.size() * 8),
			Key::RsaPublic(key)      => write!(f, "RsaPublic({} bits)", key.size() * 8),
			Key::EcPrivate(key)      => write!(f, "EcPrivate({})", key.curve().name()),
			Key::EcPublic(key)       => write!(f, "EcPublic({})", key.curve().name()),
			Key::Ed25519Private(_)   => write!(f, "Ed25519Private"),
			Key::Ed25519Public(_)    => write!(f, "Ed25519Public"),
			Key::Signer(_)           => write!(f, "Signer"),
			Key::Jwk(jwk)            => f.debug_tuple("Jwk").field(jwk).finish(),
		}
	}
}

/// The built-in algorithms that can be used with a key.
///
/// Only the key type is considered, not the size of the key.
pub fn algorithms_for_key(key: &Key) -> Vec<SignatureAlgorithm> {
	use SignatureAlgorithm as A;
	match key.key_type() {
		KeyType::Octet => vec![A::HS256, A::HS384, A::HS512],
		KeyType::Rsa   => vec![A::RS256, A::RS384, A::RS512, A::PS256, A::PS384, A::PS512],
		KeyType::Okp   => vec![A::EDDSA],
		KeyType::Ec    => match key.public_key() {
			Some(Key::EcPublic(public)) => vec![public.curve().algorithm()],
			_                           => vec![A::ES256, A::ES384, A::ES512, A::ES256K],
		},
	}
}

macro_rules! impl_from_key {
	($type:ty, $variant:ident) => {
		impl From<$type> for Key {
			fn from(key: $type) -> Self {
				Key::$variant(key.into())
			}
		}
	};
}

impl_from_key!(Vec<u8>,                        Octet);
impl_from_key!(&[u8],                          Octet);
impl_from_key!(RsaPrivateKey,                  RsaPrivate);
impl_from_key!(RsaPublicKey,                   RsaPublic);
impl_from_key!(EcPrivateKey,                   EcPrivate);
impl_from_key!(EcPublicKey,                    EcPublic);
impl_from_key!(ed25519_dalek::SigningKey,      Ed25519Private);
impl_from_key!(ed25519_dalek::VerifyingKey,    Ed25519Public);
impl_from_key!(Arc<dyn CryptoSigner>,          Signer);
impl_from_key!(Jwk,                            Jwk);

macro_rules! impl_from_ec_key {
	($type:ty, $wrapper:ident, $variant:ident) => {
		impl From<$type> for $wrapper {
			fn from(key: $type) -> Self {
				$wrapper::$variant(key)
			}
		}

		impl From<$type> for Key {
			fn from(key: $type) -> Self {
				$wrapper::$variant(key).into()
			}
		}
	};
}

impl_from_ec_key!(p256::ecdsa::SigningKey,   EcPrivateKey, P256);
impl_from_ec_key!(p384::ecdsa::SigningKey,   EcPrivateKey, P384);
impl_from_ec_key!(p521::ecdsa::SigningKey,   EcPrivateKey, P521);
impl_from_ec_key!(k256::ecdsa::SigningKey,   EcPrivateKey, Secp256k1);
impl_from_ec_key!(p256::ecdsa::VerifyingKey, EcPublicKey,  P256);
impl_from_ec_key!(p384::ecdsa::VerifyingKey, EcPublicKey,  P384);
impl_from_ec_key!(p521::ecdsa::VerifyingKey, EcPublicKey,  P521);
impl_from_ec_key!(k256::ecdsa::VerifyingKey, EcPublicKey,  Secp256k1);

#[cfg(test)]
pub(crate) mod test {
	use super::*;
	use crate::ErrorKind;
	use assert2::assert;
	use rsa::pkcs8::DecodePrivateKey;

	pub(crate) fn rsa_private_key() -> RsaPrivateKey {
		RsaPrivateKey::from_pkcs8_pem(include_str!("../testdata/rsa2048.pem")).unwrap()
	}

	pub(crate) fn other_rsa_private_key() -> RsaPrivateKey {
		RsaPrivateKey::from_pkcs8_pem(include_str!("../testdata/rsa2048-other.pem")).unwrap()
	}

	pub(crate) fn ed25519_private_key(seed: u8) -> ed25519_dalek::SigningKey {
		ed25519_dalek::SigningKey::from_bytes(&[seed; 32])
	}

	#[test]
	fn test_key_type_and_public_key() {
		let rsa = Key::from(rsa_private_key());
		assert!(rsa.key_type() == KeyType::Rsa);
		assert!(let Some(Key::RsaPublic(_)) = rsa.public_key());

		let ec = Key::from(p256::ecdsa::SigningKey::from_slice(&[1; 32]).unwrap());
		assert!(ec.key_type() == KeyType::Ec);
		assert!(algorithms_for_key(&ec) == [SignatureAlgorithm::ES256]);

		let ed = Key::from(ed25519_private_key(3));
		assert!(ed.key_type() == KeyType::Okp);
		assert!(ed.public_key() == Some(Key::from(ed25519_private_key(3).verifying_key())));

		assert!(Key::octet(b"secret".to_vec()).public_key().is_none());
		assert!(algorithms_for_key(&Key::octet(b"secret".to_vec())).len() == 3);
	}

	#[test]
	fn test_jwk_wrapper() {
		let key = Key::from(Jwk::new(Key::octet(b"secret".to_vec())).with_key_id("my-key"));
		assert!(key.key_id() == Some("my-key"));
		assert!(key.material() == &Key::octet(b"secret".to_vec()));
		assert!(key.key_type() == KeyType::Octet);
		assert!(Key::octet(b"secret".to_vec()).key_id() == None);
	}

	#[test]
	fn test_validate() {
		assert!(let Ok(()) = Key::octet(b"secret".to_vec()).validate());
		assert!(Key::octet(Vec::new()).validate().unwrap_err().kind() == ErrorKind::InvalidKey);
		assert!(let Ok(()) = Key::from(rsa_private_key()).validate());
		assert!(let Ok(()) = Key::from(rsa_private_key().to_public_key()).validate());
		assert!(let Ok(()) = Key::from(ed25519_private_key(1)).validate());
	}

	#[test]
	fn test_curve_sizes() {
		assert!(EcCurve::P256.byte_size() == 32);
		assert!(EcCurve::P384.byte_size() == 48);
		assert!(EcCurve::P521.byte_size() == 66);
		assert!(EcCurve::Secp256k1.byte_size() == 32);
	}

	#[test]
	fn test_ec_public_key_sec1_round_trip() {
		let private = EcPrivateKey::from(p384::ecdsa::SigningKey::from_slice(&[7; 48]).unwrap());
		let public = private.public_key();
		let decoded = EcPublicKey::from_sec1_bytes(EcCurve::P384, &public.to_sec1_bytes()).unwrap();
		assert!(decoded == public);
		assert!(EcPublicKey::from_sec1_bytes(EcCurve::P256, &public.to_sec1_bytes()).unwrap_err().kind() == ErrorKind::InvalidKey);
	}
}
