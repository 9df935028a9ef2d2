//! Sources of verification keys.
//!
//! [`verify`](crate::verify()) asks every [`KeyProvider`] for candidate keys for each signature of a message.
//! A provider hands out `(algorithm, key)` pairs through a [`KeySink`],
//! and every pair is tried until one verifies the signature.

use crate::key::algorithms_for_key;
use crate::{Context, Error, Jwk, Key, Message, Result, Signature, SignatureAlgorithm};

/// Receives candidate keys from a [`KeyProvider`].
pub trait KeySink {
	/// Add a candidate key for verifying a signature with an algorithm.
	fn key(&mut self, alg: SignatureAlgorithm, key: Key);
}

/// A source of verification keys.
pub trait KeyProvider: Send + Sync {
	/// Add the candidate keys for one signature of a message to the sink.
	///
	/// An error aborts the whole verification.
	fn fetch_keys(&self, context: &Context, sink: &mut dyn KeySink, signature: &Signature, message: &Message) -> Result<()>;
}

/// Collects candidate keys in order.
#[derive(Debug, Default)]
pub(crate) struct KeyList {
	keys: Vec<(SignatureAlgorithm, Key)>,
}

impl KeyList {
	pub(crate) fn new() -> Self {
		Self::default()
	}

	pub(crate) fn into_keys(self) -> Vec<(SignatureAlgorithm, Key)> {
		self.keys
	}
}

impl KeySink for KeyList {
	fn key(&mut self, alg: SignatureAlgorithm, key: Key) {
		self.keys.push((alg, key));
	}
}

/// A provider that always hands out the same key.
///
/// This is what [`with_key`](crate::with_key) creates.
#[derive(Clone, Debug)]
pub struct StaticKeyProvider {
	alg: SignatureAlgorithm,
	key: Key,
}

impl StaticKeyProvider {
	pub fn new(alg: SignatureAlgorithm, key: impl Into<Key>) -> Self {
		Self { alg, key: key.into() }
	}
}

impl KeyProvider for StaticKeyProvider {
	fn fetch_keys(&self, _context: &Context, sink: &mut dyn KeySink, _signature: &Signature, _message: &Message) -> Result<()> {
		sink.key(self.alg.clone(), self.key.clone());
		Ok(())
	}
}

/// A provider implemented by a function.
pub struct KeyProviderFn<F> {
	function: F,
}

impl<F> KeyProviderFn<F>
where
	F: Fn(&Context, &mut dyn KeySink, &Signature, &Message) -> Result<()> + Send + Sync,
{
	pub fn new(function: F) -> Self {
		Self { function }
	}
}

impl<F> KeyProvider for KeyProviderFn<F>
where
	F: Fn(&Context, &mut dyn KeySink, &Signature, &Message) -> Result<()> + Send + Sync,
{
	fn fetch_keys(&self, context: &Context, sink: &mut dyn KeySink, signature: &Signature, message: &Message) -> Result<()> {
		(self.function)(context, sink, signature, message)
	}
}

/// A provider that selects keys from a set of JWKs.
///
/// By default every key in the set is a candidate and keys without an `alg` parameter are skipped.
/// Keys with a `use` parameter other than `sig` are always skipped.
#[derive(Clone, Debug, Default)]
pub struct KeySetProvider {
	keys                     : Vec<Jwk>,
	require_kid              : bool,
	use_default              : bool,
	infer_algorithm          : bool,
	multiple_keys_per_key_id : bool,
}

impl KeySetProvider {
	pub fn new(keys: impl IntoIterator<Item = Jwk>) -> Self {
		Self {
			keys: keys.into_iter().collect(),
			..Self::default()
		}
	}

	/// Only use keys with a `kid` matching the `kid` header parameter of the signature.
	pub fn require_kid(mut self, value: bool) -> Self {
		self.require_kid = value;
		self
	}

	/// When a `kid` is required but the signature has none, use the only key of the set.
	pub fn use_default(mut self, value: bool) -> Self {
		self.use_default = value;
		self
	}

	/// For keys without an `alg` parameter, derive the algorithm from the key type.
	///
	/// If the signature names an algorithm it must be one of the derived algorithms.
	pub fn infer_algorithm(mut self, value: bool) -> Self {
		self.infer_algorithm = value;
		self
	}

	/// Allow multiple keys with the same `kid` and try all of them.
	pub fn multiple_keys_per_key_id(mut self, value: bool) -> Self {
		self.multiple_keys_per_key_id = value;
		self
	}

	fn select_key(&self, sink: &mut dyn KeySink, jwk: &Jwk, signature: &Signature) -> Result<()> {
		if let Some(key_use) = jwk.key_use.as_deref() {
			if key_use != "sig" {
				return Ok(());
			}
		}

		let key = Key::Jwk(Box::new(jwk.clone()));
		if let Some(alg) = &jwk.algorithm {
			sink.key(alg.clone(), key);
			return Ok(());
		}

		if !self.infer_algorithm {
			return Ok(());
		}

		let algorithms = algorithms_for_key(&jwk.key);
		match signature.algorithm() {
			Some(alg) if algorithms.contains(&alg) => sink.key(alg, key),
			Some(alg) => return Err(Error::unsupported_algorithm(format!("algorithm {} is not valid for key type {:?}", alg, jwk.key.key_type()))),
			None => {
				for alg in algorithms {
					sink.key(alg, key.clone());
				}
			},
		}
		Ok(())
	}
}

impl KeyProvider for KeySetProvider {
	fn fetch_keys(&self, _context: &Context, sink: &mut dyn KeySink, signature: &Signature, _message: &Message) -> Result<()> {
		if !self.require_kid {
			for jwk in &self.keys {
				if let Err(error) = self.select_key(sink, jwk, signature) {
					tracing::debug!(key_id = ?jwk.key_id, %error, "skipping unusable key in key set");
				}
			}
			return Ok(());
		}

		let wanted = match signature.key_id() {
			Some(key_id) => key_id,
			None if self.use_default && self.keys.len() == 1 => {
				return self.select_key(sink, &self.keys[0], signature);
			},
			None if self.use_default => {
				return Err(Error::verify("key set must contain exactly one key to use it as default"));
			},
			None => return Err(Error::missing_header_param(crate::header::KEY_ID)),
		};

		let mut matching = self.keys.iter().filter(|jwk| jwk.key_id.as_deref() == Some(wanted));
		if !self.multiple_keys_per_key_id {
			let jwk = matching.next().ok_or_else(|| Error::verify(format!("no key with kid {:?} in key set", wanted)))?;
			return self.select_key(sink, jwk, signature);
		}

		let mut found = false;
		for jwk in matching {
			if self.select_key(sink, jwk, signature).is_ok() {
				found = true;
			}
		}
		if !found {
			return Err(Error::verify(format!("no usable key with kid {:?} in key set", wanted)));
		}
		Ok(())
	}
}
