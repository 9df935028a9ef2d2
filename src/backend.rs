//! The built-in crypto backend.
//!
//! When nothing is registered for an algorithm, the [`registry`](crate::registry) hands out a [`BuiltinSigner`] or [`BuiltinVerifier`].
//! Those dispatch on the algorithm identifier to the implementations in the
//! [`hmac`](crate::hmac), [`rsa`](crate::rsa), [`ecdsa`](crate::ecdsa), [`eddsa`](crate::eddsa) and [`none`](crate::none) modules.
//! Unsupported identifiers are only reported when signing or verifying.

use crate::ecdsa::EcdsaAlgorithm;
use crate::eddsa::EdDsaAlgorithm;
use crate::hmac::HmacAlgorithm;
use crate::none::NoneAlgorithm;
use crate::rsa::RsaAlgorithm;
use crate::{Error, Key, Result, SignatureAlgorithm, Signer, Verifier};

/// A built-in algorithm implementation.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Builtin {
	Hmac(HmacAlgorithm),
	Rsa(RsaAlgorithm),
	Ecdsa(EcdsaAlgorithm),
	EdDsa(EdDsaAlgorithm),
	Unsecured(NoneAlgorithm),
}

impl Builtin {
	/// Find the built-in implementation for an algorithm.
	pub fn find(alg: &SignatureAlgorithm) -> Option<Self> {
		Some(match alg.as_str() {
			"HS256"  => Self::Hmac(HmacAlgorithm::HS256),
			"HS384"  => Self::Hmac(HmacAlgorithm::HS384),
			"HS512"  => Self::Hmac(HmacAlgorithm::HS512),
			"RS256"  => Self::Rsa(RsaAlgorithm::RS256),
			"RS384"  => Self::Rsa(RsaAlgorithm::RS384),
			"RS512"  => Self::Rsa(RsaAlgorithm::RS512),
			"PS256"  => Self::Rsa(RsaAlgorithm::PS256),
			"PS384"  => Self::Rsa(RsaAlgorithm::PS384),
			"PS512"  => Self::Rsa(RsaAlgorithm::PS512),
			"ES256"  => Self::Ecdsa(EcdsaAlgorithm::ES256),
			"ES384"  => Self::Ecdsa(EcdsaAlgorithm::ES384),
			"ES512"  => Self::Ecdsa(EcdsaAlgorithm::ES512),
			"ES256K" => Self::Ecdsa(EcdsaAlgorithm::ES256K),
			"EdDSA"  => Self::EdDsa(EdDsaAlgorithm),
			"none"   => Self::Unsecured(NoneAlgorithm),
			_        => return None,
		})
	}

	fn signer(&self) -> &dyn Signer {
		match self {
			Self::Hmac(x)      => x,
			Self::Rsa(x)       => x,
			Self::Ecdsa(x)     => x,
			Self::EdDsa(x)     => x,
			Self::Unsecured(x) => x,
		}
	}

	fn verifier(&self) -> &dyn Verifier {
		match self {
			Self::Hmac(x)      => x,
			Self::Rsa(x)       => x,
			Self::Ecdsa(x)     => x,
			Self::EdDsa(x)     => x,
			Self::Unsecured(x) => x,
		}
	}
}

/// Signer that delegates to the built-in backend.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BuiltinSigner {
	alg: SignatureAlgorithm,
}

/// Verifier that delegates to the built-in backend.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BuiltinVerifier {
	alg: SignatureAlgorithm,
}

impl BuiltinSigner {
	pub fn new(alg: SignatureAlgorithm) -> Self {
		Self { alg }
	}
}

impl BuiltinVerifier {
	pub fn new(alg: SignatureAlgorithm) -> Self {
		Self { alg }
	}
}

fn find(alg: &SignatureAlgorithm) -> Result<Builtin> {
	Builtin::find(alg).ok_or_else(|| Error::unsupported_algorithm(format!("algorithm {} is not supported by the built-in backend", alg)))
}

impl Signer for BuiltinSigner {
	fn sign(&self, key: &Key, signing_input: &[u8]) -> Result<Vec<u8>> {
		find(&self.alg)?.signer().sign(key, signing_input)
	}
}

impl Verifier for BuiltinVerifier {
	fn verify(&self, key: &Key, signing_input: &[u8], signature: &[u8]) -> Result<()> {
		find(&self.alg)?.verifier().verify(key, signing_input, signature)
	}
}
