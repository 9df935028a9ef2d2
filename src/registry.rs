//! The process-wide algorithm registry.
//!
//! Two generations of provider interfaces can be registered:
//! the current [`Signer`] and [`Verifier`] traits,
//! and the legacy [`LegacySigner`] and [`LegacyVerifier`] traits which are created on demand through a factory.
//! Registering one generation for an algorithm removes the other generation for the same algorithm.
//!
//! Lookups prefer a registered [`Signer`] or [`Verifier`], then a legacy factory wrapped in an adapter,
//! and finally fall back to the [built-in backend](crate::backend).
//!
//! Registration adds the algorithm to the set of [known algorithms](crate::algorithm::known_algorithms).
//! Unregistration does not remove it again.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::algorithm::{register_known, reset_known};
use crate::backend::{BuiltinSigner, BuiltinVerifier};
use crate::{Key, Result, SignatureAlgorithm, Signer, Verifier};

/// A signer with the legacy argument order.
pub trait LegacySigner: Send + Sync {
	/// The algorithm this signer produces signatures for.
	fn algorithm(&self) -> SignatureAlgorithm;

	/// Sign the signing input.
	fn sign(&self, signing_input: &[u8], key: &Key) -> Result<Vec<u8>>;
}

/// A verifier with the legacy argument order.
pub trait LegacyVerifier: Send + Sync {
	/// Verify a signature over the signing input.
	fn verify(&self, signing_input: &[u8], signature: &[u8], key: &Key) -> Result<()>;
}

/// Creates a [`LegacySigner`] for every lookup.
pub trait SignerFactory: Send + Sync {
	fn create(&self) -> Result<Box<dyn LegacySigner>>;
}

/// Creates a [`LegacyVerifier`] for every lookup.
pub trait VerifierFactory: Send + Sync {
	fn create(&self) -> Result<Box<dyn LegacyVerifier>>;
}

impl<F> SignerFactory for F
where
	F: Fn() -> Result<Box<dyn LegacySigner>> + Send + Sync,
{
	fn create(&self) -> Result<Box<dyn LegacySigner>> {
		self()
	}
}

impl<F> VerifierFactory for F
where
	F: Fn() -> Result<Box<dyn LegacyVerifier>> + Send + Sync,
{
	fn create(&self) -> Result<Box<dyn LegacyVerifier>> {
		self()
	}
}

/// The providers of both generations for one kind of operation.
struct Providers<Current: ?Sized, Factory: ?Sized> {
	current   : HashMap<SignatureAlgorithm, Arc<Current>>,
	factories : HashMap<SignatureAlgorithm, Arc<Factory>>,
}

impl<Current: ?Sized, Factory: ?Sized> Providers<Current, Factory> {
	fn new() -> Self {
		Self {
			current: HashMap::new(),
			factories: HashMap::new(),
		}
	}
}

type SignerProviders = Providers<dyn Signer, dyn SignerFactory>;
type VerifierProviders = Providers<dyn Verifier, dyn VerifierFactory>;

static SIGNERS: Lazy<RwLock<SignerProviders>> = Lazy::new(|| RwLock::new(Providers::new()));
static VERIFIERS: Lazy<RwLock<VerifierProviders>> = Lazy::new(|| RwLock::new(Providers::new()));

/// Register a signer for an algorithm.
///
/// Replaces any signer or legacy signer factory registered for the same algorithm.
pub fn register_signer(alg: SignatureAlgorithm, signer: impl Signer + 'static) {
	register_known(&alg);
	let mut signers = SIGNERS.write();
	signers.factories.remove(&alg);
	signers.current.insert(alg.clone(), Arc::new(signer));
	tracing::debug!(%alg, "registered signer");
}

/// Register a legacy signer factory for an algorithm.
///
/// Replaces any signer or legacy signer factory registered for the same algorithm.
pub fn register_signer_factory(alg: SignatureAlgorithm, factory: impl SignerFactory + 'static) {
	register_known(&alg);
	let mut signers = SIGNERS.write();
	signers.current.remove(&alg);
	signers.factories.insert(alg.clone(), Arc::new(factory));
	tracing::debug!(%alg, "registered legacy signer factory");
}

/// Register a verifier for an algorithm.
///
/// Replaces any verifier or legacy verifier factory registered for the same algorithm.
pub fn register_verifier(alg: SignatureAlgorithm, verifier: impl Verifier + 'static) {
	register_known(&alg);
	let mut verifiers = VERIFIERS.write();
	verifiers.factories.remove(&alg);
	verifiers.current.insert(alg.clone(), Arc::new(verifier));
	tracing::debug!(%alg, "registered verifier");
}

/// Register a legacy verifier factory for an algorithm.
///
/// Replaces any verifier or legacy verifier factory registered for the same algorithm.
pub fn register_verifier_factory(alg: SignatureAlgorithm, factory: impl VerifierFactory + 'static) {
	register_known(&alg);
	let mut verifiers = VERIFIERS.write();
	verifiers.current.remove(&alg);
	verifiers.factories.insert(alg.clone(), Arc::new(factory));
	tracing::debug!(%alg, "registered legacy verifier factory");
}

/// Remove the signers of both generations for an algorithm.
///
/// Lookups fall back to the built-in backend afterwards.
pub fn unregister_signer(alg: &SignatureAlgorithm) {
	let mut signers = SIGNERS.write();
	signers.current.remove(alg);
	signers.factories.remove(alg);
	tracing::debug!(%alg, "unregistered signer");
}

/// Remove the verifiers of both generations for an algorithm.
///
/// Lookups fall back to the built-in backend afterwards.
pub fn unregister_verifier(alg: &SignatureAlgorithm) {
	let mut verifiers = VERIFIERS.write();
	verifiers.current.remove(alg);
	verifiers.factories.remove(alg);
	tracing::debug!(%alg, "unregistered verifier");
}

/// Get the signer for an algorithm.
///
/// This only fails if a legacy factory fails to create a signer.
/// An algorithm that is not supported at all is reported when signing.
pub fn signer_for(alg: &SignatureAlgorithm) -> Result<Arc<dyn Signer>> {
	// Do not hold the lock while running the factory.
	let factory = {
		let signers = SIGNERS.read();
		if let Some(signer) = signers.current.get(alg) {
			return Ok(signer.clone());
		}
		signers.factories.get(alg).cloned()
	};

	match factory {
		Some(factory) => Ok(Arc::new(LegacySignerAdapter(factory.create()?))),
		None          => Ok(Arc::new(BuiltinSigner::new(alg.clone()))),
	}
}

/// Get the verifier for an algorithm.
///
/// This only fails if a legacy factory fails to create a verifier.
/// An algorithm that is not supported at all is reported when verifying.
pub fn verifier_for(alg: &SignatureAlgorithm) -> Result<Arc<dyn Verifier>> {
	let factory = {
		let verifiers = VERIFIERS.read();
		if let Some(verifier) = verifiers.current.get(alg) {
			return Ok(verifier.clone());
		}
		verifiers.factories.get(alg).cloned()
	};

	match factory {
		Some(factory) => Ok(Arc::new(LegacyVerifierAdapter(factory.create()?))),
		None          => Ok(Arc::new(BuiltinVerifier::new(alg.clone()))),
	}
}

/// Get the signer for an algorithm with the legacy interface.
pub fn legacy_signer_for(alg: &SignatureAlgorithm) -> Result<Box<dyn LegacySigner>> {
	let factory = SIGNERS.read().factories.get(alg).cloned();
	match factory {
		Some(factory) => factory.create(),
		None => Ok(Box::new(CurrentSignerAdapter {
			alg: alg.clone(),
			signer: signer_for(alg)?,
		})),
	}
}

/// Get the verifier for an algorithm with the legacy interface.
pub fn legacy_verifier_for(alg: &SignatureAlgorithm) -> Result<Box<dyn LegacyVerifier>> {
	let factory = VERIFIERS.read().factories.get(alg).cloned();
	match factory {
		Some(factory) => factory.create(),
		None => Ok(Box::new(CurrentVerifierAdapter(verifier_for(alg)?))),
	}
}

/// Remove all registered providers and forget all non built-in algorithms.
pub fn reset() {
	*SIGNERS.write() = Providers::new();
	*VERIFIERS.write() = Providers::new();
	reset_known();
	tracing::debug!("reset algorithm registry");
}

struct LegacySignerAdapter(Box<dyn LegacySigner>);
struct LegacyVerifierAdapter(Box<dyn LegacyVerifier>);

struct CurrentSignerAdapter {
	alg: SignatureAlgorithm,
	signer: Arc<dyn Signer>,
}

struct CurrentVerifierAdapter(Arc<dyn Verifier>);

impl Signer for LegacySignerAdapter {
	fn sign(&self, key: &Key, signing_input: &[u8]) -> Result<Vec<u8>> {
		self.0.sign(signing_input, key)
	}
}

impl Verifier for LegacyVerifierAdapter {
	fn verify(&self, key: &Key, signing_input: &[u8], signature: &[u8]) -> Result<()> {
		self.0.verify(signing_input, signature, key)
	}
}

impl LegacySigner for CurrentSignerAdapter {
	fn algorithm(&self) -> SignatureAlgorithm {
		self.alg.clone()
	}

	fn sign(&self, signing_input: &[u8], key: &Key) -> Result<Vec<u8>> {
		self.signer.sign(key, signing_input)
	}
}

impl LegacyVerifier for CurrentVerifierAdapter {
	fn verify(&self, signing_input: &[u8], signature: &[u8], key: &Key) -> Result<()> {
		self.0.verify(key, signing_input, signature)
	}
}
