//! [`Verifier`] and [`Signer`] implementations for the `none` algorithm.
//!
//! The `none` algorithm is defined in [RFC 7518 section 3.6](https://tools.ietf.org/html/rfc7518#section-3.6).
//! It does not provide any integrity protection.
//!
//! These exist so unsecured messages can be produced with [`with_insecure_no_signature`](crate::with_insecure_no_signature).
//! [`verify`](crate::verify()) never accepts the `none` algorithm, no matter what is registered for it.

use crate::{Error, Key, Result, Signer, Verifier};

/// Signer and verifier for the `none` algorithm.
///
/// Produces an empty signature.
/// The verifier checks that the signature is indeed empty as required by [RFC 7518 (section 3.6)](https://tools.ietf.org/html/rfc7518#section-3.6).
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct NoneAlgorithm;

impl Signer for NoneAlgorithm {
	fn sign(&self, _key: &Key, _signing_input: &[u8]) -> Result<Vec<u8>> {
		Ok(Vec::new())
	}
}

impl Verifier for NoneAlgorithm {
	fn verify(&self, _key: &Key, _signing_input: &[u8], signature: &[u8]) -> Result<()> {
		if !signature.is_empty() {
			Err(Error::invalid_signature("signature for algorithm none must be empty"))
		} else {
			Ok(())
		}
	}
}
