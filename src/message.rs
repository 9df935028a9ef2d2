//! Signed messages and their serializations.
//!
//! A [`Message`] is a payload with one or more [`Signature`]s.
//! It can be serialized in the JWS Compact Serialization (exactly one signature),
//! or in the general or flattened JWS JSON Serialization.

use std::sync::Arc;

use serde::{Serialize, Serializer};

use crate::encoding::default_encoder;
use crate::header::get_header_param;
use crate::signing_input::{join_compact, signing_input};
use crate::{Base64Encoder, Error, ErrorKind, Headers, JsonObject, JsonValue, Result, SignatureAlgorithm};

/// A JWS message: a payload with signatures.
#[derive(Clone, Debug)]
pub struct Message {
	payload    : Vec<u8>,
	signatures : Vec<Signature>,
	b64        : bool,
}

/// One signature of a [`Message`].
#[derive(Clone, Debug)]
pub struct Signature {
	protected   : Headers,
	unprotected : Option<Headers>,
	signature   : Vec<u8>,
	encoder     : Arc<dyn Base64Encoder>,
	detached    : bool,
}

/// Options for [`Message::compact`].
#[derive(Clone, Debug, Default)]
pub struct CompactOptions {
	/// Leave the payload out of the serialized message.
	pub detached: bool,

	/// The encoder to use instead of the encoder of the signature.
	pub encoder: Option<Arc<dyn Base64Encoder>>,
}

impl Message {
	/// Create a message without signatures.
	pub fn new(payload: impl Into<Vec<u8>>) -> Self {
		Self {
			payload: payload.into(),
			signatures: Vec::new(),
			b64: true,
		}
	}

	pub(crate) fn from_parts(payload: Vec<u8>, signatures: Vec<Signature>, b64: bool) -> Self {
		Self { payload, signatures, b64 }
	}

	/// The payload.
	///
	/// Empty if the payload was detached.
	pub fn payload(&self) -> &[u8] {
		&self.payload
	}

	pub fn into_payload(self) -> Vec<u8> {
		self.payload
	}

	pub(crate) fn set_payload(&mut self, payload: Vec<u8>) {
		self.payload = payload;
	}

	pub fn signatures(&self) -> &[Signature] {
		&self.signatures
	}

	/// The signatures with a `kid` header parameter equal to `key_id`.
	pub fn signatures_with_key_id<'a>(&'a self, key_id: &'a str) -> impl Iterator<Item = &'a Signature> + 'a {
		self.signatures.iter().filter(move |signature| signature.key_id() == Some(key_id))
	}

	/// Add a signature.
	pub fn append_signature(&mut self, signature: Signature) {
		self.signatures.push(signature);
	}

	/// Check if the payload is base64url encoded on the wire.
	pub fn b64(&self) -> bool {
		self.b64
	}

	pub fn set_b64(&mut self, b64: bool) {
		self.b64 = b64;
	}

	fn is_detached(&self) -> bool {
		self.signatures.iter().any(|signature| signature.detached)
	}

	fn payload_encoder(&self) -> Arc<dyn Base64Encoder> {
		match self.signatures.first() {
			Some(signature) => signature.encoder.clone(),
			None => default_encoder(),
		}
	}

	/// Serialize the message in the JWS Compact Serialization.
	///
	/// The message must have exactly one signature without unprotected header parameters.
	/// An unencoded payload (`b64` set to false) must not contain a `.`, unless the payload is detached.
	pub fn compact(&self, options: &CompactOptions) -> Result<Vec<u8>> {
		let signature = match self.signatures.as_slice() {
			[signature] => signature,
			other => return Err(Error::serialization_conflict(format!(
				"compact serialization requires exactly one signature, message has {}",
				other.len()
			))),
		};

		if signature.unprotected.as_ref().map_or(false, |header| !header.is_empty()) {
			return Err(Error::serialization_conflict("compact serialization can not hold unprotected header parameters"));
		}

		let detached = options.detached || signature.detached;
		let b64 = signature.b64();
		if !b64 && !detached && self.payload.contains(&b'.') {
			return Err(Error::serialization_conflict("unencoded payload can not contain '.' in compact serialization"));
		}

		let encoder = options.encoder.as_deref().unwrap_or(&*signature.encoder);
		let protected = signature.protected_bytes()?;
		join_compact(&protected, &self.payload, &signature.signature, encoder, b64, detached)
	}

	/// Serialize the message as a JSON value in the general JWS JSON Serialization.
	pub fn to_json_value(&self) -> Result<JsonValue> {
		let mut object = JsonObject::new();
		self.insert_payload(&mut object)?;
		let signatures = self.signatures.iter()
			.map(|signature| signature.to_json_object().map(JsonValue::Object))
			.collect::<Result<Vec<_>>>()?;
		object.insert("signatures".into(), JsonValue::Array(signatures));
		Ok(JsonValue::Object(object))
	}

	/// Serialize the message in the general JWS JSON Serialization.
	pub fn to_json(&self) -> Result<Vec<u8>> {
		Ok(serde_json::to_vec(&self.to_json_value()?)?)
	}

	/// Serialize the message in the general JWS JSON Serialization, with indentation.
	pub fn to_json_pretty(&self) -> Result<Vec<u8>> {
		Ok(serde_json::to_vec_pretty(&self.to_json_value()?)?)
	}

	/// Serialize the message in the flattened JWS JSON Serialization.
	///
	/// The message must have exactly one signature.
	pub fn to_json_flattened(&self) -> Result<Vec<u8>> {
		let signature = match self.signatures.as_slice() {
			[signature] => signature,
			other => return Err(Error::serialization_conflict(format!(
				"flattened JSON serialization requires exactly one signature, message has {}",
				other.len()
			))),
		};

		let mut object = JsonObject::new();
		self.insert_payload(&mut object)?;
		object.extend(signature.to_json_object()?);
		Ok(serde_json::to_vec(&object)?)
	}

	/// Add the payload member. A detached payload is written as an empty string.
	fn insert_payload(&self, object: &mut JsonObject) -> Result<()> {
		let payload = if self.is_detached() {
			String::new()
		} else if self.b64 {
			self.payload_encoder().encode(&self.payload)
		} else {
			String::from_utf8(self.payload.clone())
				.map_err(|_| Error::new(ErrorKind::InvalidUtf8, "unencoded payload must be valid UTF-8 in JSON serialization"))?
		};
		object.insert("payload".into(), JsonValue::String(payload));
		Ok(())
	}
}

impl Serialize for Message {
	fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
		self.to_json_value().map_err(serde::ser::Error::custom)?.serialize(serializer)
	}
}

impl Signature {
	/// Create a signature using the default base64 encoder.
	pub fn new(protected: Headers, unprotected: Option<Headers>, signature: Vec<u8>) -> Self {
		Self {
			protected,
			unprotected,
			signature,
			encoder: default_encoder(),
			detached: false,
		}
	}

	/// Use a different base64 encoder when serializing this signature.
	pub fn with_encoder(mut self, encoder: Arc<dyn Base64Encoder>) -> Self {
		self.encoder = encoder;
		self
	}

	pub(crate) fn with_detached(mut self, detached: bool) -> Self {
		self.detached = detached;
		self
	}

	pub fn protected_headers(&self) -> &Headers {
		&self.protected
	}

	pub fn unprotected_headers(&self) -> Option<&Headers> {
		self.unprotected.as_ref()
	}

	/// The raw signature bytes.
	pub fn signature(&self) -> &[u8] {
		&self.signature
	}

	pub fn encoder(&self) -> &dyn Base64Encoder {
		&*self.encoder
	}

	/// Check if the payload is left out when this signature is serialized.
	pub fn is_detached(&self) -> bool {
		self.detached
	}

	/// The `alg` parameter of the protected header.
	pub fn algorithm(&self) -> Option<SignatureAlgorithm> {
		self.protected.algorithm()
	}

	/// The `kid` parameter from the protected or unprotected header.
	pub fn key_id(&self) -> Option<&str> {
		self.header_param(crate::header::KEY_ID).and_then(JsonValue::as_str)
	}

	/// Get a header parameter, preferring the protected header over the unprotected header.
	pub fn header_param(&self, key: &str) -> Option<&JsonValue> {
		get_header_param(Some(&self.protected), self.unprotected.as_ref(), key)
	}

	/// The `b64` parameter of the protected header.
	pub fn b64(&self) -> bool {
		self.protected.b64()
	}

	/// The protected header bytes covered by the signature.
	pub fn protected_bytes(&self) -> Result<Vec<u8>> {
		self.protected.protected_bytes()
	}

	/// The JWS signing input for this signature over a payload.
	pub fn signing_input(&self, payload: &[u8]) -> Result<Vec<u8>> {
		let protected = self.protected_bytes()?;
		Ok(signing_input(&protected, payload, &*self.encoder, self.b64()))
	}

	fn to_json_object(&self) -> Result<JsonObject> {
		let mut object = JsonObject::new();
		let protected = self.protected_bytes()?;
		if !protected.is_empty() {
			object.insert("protected".into(), JsonValue::String(self.encoder.encode(&protected)));
		}
		if let Some(unprotected) = self.unprotected.as_ref().filter(|header| !header.is_empty()) {
			object.insert("header".into(), JsonValue::Object(unprotected.as_object().clone()));
		}
		object.insert("signature".into(), JsonValue::String(self.encoder.encode(&self.signature)));
		Ok(object)
	}
}
