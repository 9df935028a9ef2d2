//! Types for working with message headers.
//!
//! A [`Headers`] value is an ordered set of JOSE header parameters.
//! Known parameters are type checked when they are set or parsed.
//! Headers parsed from a message remember the exact bytes they were parsed from,
//! because JSON serialization is not canonical and a signature covers the original bytes.

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::{Error, JsonObject, JsonValue, Result, SignatureAlgorithm};

pub const ALGORITHM          : &str = "alg";
pub const KEY_ID             : &str = "kid";
pub const TYPE               : &str = "typ";
pub const CONTENT_TYPE       : &str = "cty";
pub const CRITICAL           : &str = "crit";
pub const JWK_SET_URL        : &str = "jku";
pub const JWK                : &str = "jwk";
pub const X509_URL           : &str = "x5u";
pub const X509_CHAIN         : &str = "x5c";
pub const X509_THUMBPRINT    : &str = "x5t";
pub const X509_THUMBPRINT_S256 : &str = "x5t#S256";
pub const BASE64_ENCODE_PAYLOAD : &str = "b64";

/// A set of JOSE header parameters.
#[derive(Clone, Debug, Default)]
pub struct Headers {
	fields : JsonObject,
	raw    : Option<Vec<u8>>,
}

/// Decoder for a custom header parameter.
///
/// The decoder receives the value as found in the JSON header and returns the value to store.
pub trait CustomDecoder: Send + Sync {
	fn decode(&self, value: &JsonValue) -> Result<JsonValue>;
}

impl<F> CustomDecoder for F
where
	F: Fn(&JsonValue) -> Result<JsonValue> + Send + Sync,
{
	fn decode(&self, value: &JsonValue) -> Result<JsonValue> {
		self(value)
	}
}

static CUSTOM_FIELDS: Lazy<RwLock<HashMap<String, Arc<dyn CustomDecoder>>>> = Lazy::new(Default::default);

/// Register a decoder for a custom header parameter.
///
/// The decoder is applied whenever the parameter is set or parsed.
/// This has a global effect.
pub fn register_custom_field(name: impl Into<String>, decoder: impl CustomDecoder + 'static) {
	let name = name.into();
	tracing::debug!(field = %name, "registering custom header field");
	CUSTOM_FIELDS.write().insert(name, Arc::new(decoder));
}

/// Register that a custom header parameter must decode as type `T`.
///
/// Values that do not deserialize as `T` are rejected with an [`ErrorKind::InvalidHeaderParam`](crate::ErrorKind::InvalidHeaderParam) error.
/// Accepted values are stored as `T` serializes them.
pub fn register_custom_field_type<T>(name: impl Into<String>)
where
	T: DeserializeOwned + Serialize + 'static,
{
	let name = name.into();
	let field = name.clone();
	register_custom_field(name, move |value: &JsonValue| {
		let decoded = T::deserialize(value).map_err(|e| Error::invalid_header_param(format!("invalid value for custom header parameter {:?}: {}", field, e)))?;
		Ok(serde_json::to_value(decoded)?)
	});
}

/// Remove the decoder for a custom header parameter.
pub fn unregister_custom_field(name: &str) {
	CUSTOM_FIELDS.write().remove(name);
}

fn custom_decoder(name: &str) -> Option<Arc<dyn CustomDecoder>> {
	CUSTOM_FIELDS.read().get(name).cloned()
}

/// Check the type of a known header parameter and run custom decoders.
fn check_param(key: &str, value: JsonValue) -> Result<JsonValue> {
	let valid = match key {
		ALGORITHM | KEY_ID | TYPE | CONTENT_TYPE | JWK_SET_URL | X509_URL | X509_THUMBPRINT | X509_THUMBPRINT_S256 => value.is_string(),
		CRITICAL | X509_CHAIN => value.as_array().map_or(false, |items| items.iter().all(JsonValue::is_string)),
		JWK => value.is_object(),
		BASE64_ENCODE_PAYLOAD => value.is_boolean(),
		_ => match custom_decoder(key) {
			Some(decoder) => return decoder.decode(&value),
			None => true,
		},
	};

	if valid {
		Ok(value)
	} else {
		Err(Error::invalid_header_param(format!("invalid type for header parameter {:?}", key)))
	}
}

impl Headers {
	/// Create an empty header.
	pub fn new() -> Self {
		Self::default()
	}

	/// Create a header from a JSON object, checking all known parameters.
	pub fn from_object(object: JsonObject) -> Result<Self> {
		let mut fields = JsonObject::new();
		for (key, value) in object {
			let value = check_param(&key, value)?;
			fields.insert(key, value);
		}
		Ok(Self { fields, raw: None })
	}

	/// Parse a header from JSON bytes.
	///
	/// The bytes are retained and returned by [`raw_buffer`](Self::raw_buffer).
	pub fn parse(data: &[u8]) -> Result<Self> {
		let object: JsonObject = serde_json::from_slice(data)?;
		let mut header = Self::from_object(object)?;
		header.raw = Some(data.to_vec());
		Ok(header)
	}

	/// Create an empty header that remembers empty raw bytes.
	///
	/// Used for signatures without a protected header.
	pub(crate) fn empty_raw() -> Self {
		Self { fields: JsonObject::new(), raw: Some(Vec::new()) }
	}

	/// The bytes this header was parsed from, if it was parsed.
	pub fn raw_buffer(&self) -> Option<&[u8]> {
		self.raw.as_deref()
	}

	/// Serialize the header parameters to JSON.
	pub fn to_json_bytes(&self) -> Result<Vec<u8>> {
		Ok(serde_json::to_vec(&self.fields)?)
	}

	/// The bytes covered by a signature: the raw bytes if available, the serialized header otherwise.
	pub fn protected_bytes(&self) -> Result<Vec<u8>> {
		match &self.raw {
			Some(raw) => Ok(raw.clone()),
			None      => self.to_json_bytes(),
		}
	}

	/// Set a header parameter.
	///
	/// Known parameters are type checked.
	/// Setting a parameter forgets the raw bytes of a parsed header.
	pub fn set(&mut self, key: impl Into<String>, value: impl Into<JsonValue>) -> Result<()> {
		let key = key.into();
		let value = check_param(&key, value.into())?;
		self.fields.insert(key, value);
		self.raw = None;
		Ok(())
	}

	/// Remove a header parameter.
	pub fn remove(&mut self, key: &str) -> Option<JsonValue> {
		let value = self.fields.remove(key);
		if value.is_some() {
			self.raw = None;
		}
		value
	}

	/// Get a header parameter without deserializing it.
	pub fn get_value(&self, key: &str) -> Option<&JsonValue> {
		self.fields.get(key)
	}

	/// Get and deserialize a required header parameter.
	///
	/// A missing parameter is reported as [`ErrorKind::MissingHeaderParam`](crate::ErrorKind::MissingHeaderParam),
	/// a parameter of the wrong type as [`ErrorKind::InvalidHeaderParam`](crate::ErrorKind::InvalidHeaderParam).
	pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
		let value = self.fields.get(key).ok_or_else(|| Error::missing_header_param(key))?;
		T::deserialize(value).map_err(|_| Error::invalid_header_param(format!("invalid type for header parameter {:?}", key)))
	}

	/// Check if a parameter is present.
	pub fn contains(&self, key: &str) -> bool {
		self.fields.contains_key(key)
	}

	/// The parameter names in the order they were set.
	pub fn keys(&self) -> impl Iterator<Item = &str> {
		self.fields.keys().map(String::as_str)
	}

	/// Iterate over all parameters in the order they were set.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &JsonValue)> {
		self.fields.iter().map(|(key, value)| (key.as_str(), value))
	}

	pub fn len(&self) -> usize {
		self.fields.len()
	}

	pub fn is_empty(&self) -> bool {
		self.fields.is_empty()
	}

	/// Copy all parameters into another header, overwriting parameters with the same name.
	pub fn copy_to(&self, dst: &mut Headers) {
		for (key, value) in &self.fields {
			dst.fields.insert(key.clone(), value.clone());
		}
		dst.raw = None;
	}

	/// Create a new header with the parameters of `self` overlaid by the parameters of `other`.
	pub fn merge(&self, other: &Headers) -> Headers {
		let mut merged = Headers { fields: self.fields.clone(), raw: None };
		other.copy_to(&mut merged);
		merged
	}

	/// The parameters as JSON object.
	pub fn as_object(&self) -> &JsonObject {
		&self.fields
	}

	/// The `alg` parameter.
	pub fn algorithm(&self) -> Option<SignatureAlgorithm> {
		self.str_param(ALGORITHM).map(|name| SignatureAlgorithm::new(name))
	}

	/// The `kid` parameter.
	pub fn key_id(&self) -> Option<&str> {
		self.str_param(KEY_ID)
	}

	/// The `typ` parameter.
	pub fn typ(&self) -> Option<&str> {
		self.str_param(TYPE)
	}

	/// The `cty` parameter.
	pub fn content_type(&self) -> Option<&str> {
		self.str_param(CONTENT_TYPE)
	}

	/// The `jku` parameter.
	pub fn jwk_set_url(&self) -> Option<&str> {
		self.str_param(JWK_SET_URL)
	}

	/// The `x5u` parameter.
	pub fn x509_url(&self) -> Option<&str> {
		self.str_param(X509_URL)
	}

	/// The `x5t` parameter.
	pub fn x509_thumbprint(&self) -> Option<&str> {
		self.str_param(X509_THUMBPRINT)
	}

	/// The `x5t#S256` parameter.
	pub fn x509_thumbprint_s256(&self) -> Option<&str> {
		self.str_param(X509_THUMBPRINT_S256)
	}

	/// The `jwk` parameter.
	pub fn jwk(&self) -> Option<&JsonObject> {
		self.fields.get(JWK).and_then(JsonValue::as_object)
	}

	/// The `crit` parameter.
	pub fn critical(&self) -> Option<Vec<String>> {
		self.get(CRITICAL).ok()
	}

	/// The `x5c` parameter.
	pub fn x509_chain(&self) -> Option<Vec<String>> {
		self.get(X509_CHAIN).ok()
	}

	/// The `b64` parameter, `true` if absent.
	pub fn b64(&self) -> bool {
		self.fields.get(BASE64_ENCODE_PAYLOAD).and_then(JsonValue::as_bool).unwrap_or(true)
	}

	fn str_param(&self, key: &str) -> Option<&str> {
		self.fields.get(key).and_then(JsonValue::as_str)
	}
}

impl PartialEq for Headers {
	fn eq(&self, other: &Self) -> bool {
		self.fields == other.fields
	}
}

impl TryFrom<JsonObject> for Headers {
	type Error = Error;

	fn try_from(object: JsonObject) -> Result<Self> {
		Self::from_object(object)
	}
}

impl Serialize for Headers {
	fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
		self.fields.serialize(serializer)
	}
}

impl<'de> Deserialize<'de> for Headers {
	fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
		let object = JsonObject::deserialize(deserializer)?;
		Self::from_object(object).map_err(serde::de::Error::custom)
	}
}

/// Get a parameter from either the protected or unprotected header.
///
/// If a parameter is found in the protected header, the unprotected header is not consulted anymore.
pub fn get_header_param<'a>(protected: Option<&'a Headers>, unprotected: Option<&'a Headers>, key: &str) -> Option<&'a JsonValue> {
	protected
		.and_then(|header| header.get_value(key))
		.or_else(|| unprotected?.get_value(key))
}

/// Get and deserialize a required parameter from either header.
///
/// Deserialization errors are reported as [`ErrorKind::InvalidHeaderParam`](crate::ErrorKind::InvalidHeaderParam).
pub fn parse_required_header_param<T: DeserializeOwned>(protected: Option<&Headers>, unprotected: Option<&Headers>, key: &str) -> Result<T> {
	let value = get_header_param(protected, unprotected, key).ok_or_else(|| Error::missing_header_param(key))?;
	T::deserialize(value).map_err(|_| Error::invalid_header_param(format!("invalid type for header parameter {:?}", key)))
}
