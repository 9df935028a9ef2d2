//! Parsing of serialized messages without verifying them.
//!
//! The serialization is detected from the first non-whitespace byte:
//! a `{` starts a JSON serialization (general or flattened), anything else a compact serialization.

use std::io::Read;

use serde_derive::Deserialize;

use crate::compact::{split_compact, split_compact_reader, CompactParts};
use crate::options::Serialization;
use crate::{encoding, Error, ErrorKind, Headers, Message, Result, Signature};

/// Options for [`parse_with`].
#[derive(Clone, Debug)]
pub enum ParseOption {
	/// Only accept the given serialization.
	Serialization(Serialization),
}

impl From<Serialization> for ParseOption {
	fn from(other: Serialization) -> Self {
		Self::Serialization(other)
	}
}

/// Parse a message in any serialization.
pub fn parse(data: &[u8]) -> Result<Message> {
	parse_with(data, [])
}

/// Parse a message from a string in any serialization.
pub fn parse_str(data: &str) -> Result<Message> {
	parse(data.as_bytes())
}

/// Parse a message read from a stream.
///
/// Compact messages are split while reading, so input with too many parts is refused early.
pub fn parse_reader(mut reader: impl Read) -> Result<Message> {
	let mut start = Vec::new();
	let first = loop {
		let mut byte = [0u8];
		match reader.read(&mut byte) {
			Ok(0) => break None,
			Ok(_) => {
				start.push(byte[0]);
				if !byte[0].is_ascii_whitespace() {
					break Some(byte[0]);
				}
			},
			Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
			Err(e) => return Err(Error::from(e).wrap(ErrorKind::Parse, "failed to read message")),
		}
	};

	match first {
		None => Err(Error::parse("empty input")),
		Some(b'{') => {
			let mut data = start;
			reader.read_to_end(&mut data).map_err(|e| Error::from(e).wrap(ErrorKind::Parse, "failed to read message"))?;
			parse_json(&data).map_err(|e| e.wrap(ErrorKind::Parse, "failed to parse JSON message"))
		},
		Some(_) => {
			let parts = split_compact_reader(std::io::Cursor::new(start).chain(reader))
				.map_err(|e| e.wrap(ErrorKind::Parse, "failed to parse compact message"))?;
			let parts = trim_parts(parts.as_parts());
			parts.decode().map_err(|e| e.wrap(ErrorKind::Parse, "failed to parse compact message"))
		},
	}
}

/// Parse a message, restricting the accepted serializations.
///
/// Without a serialization option, or with both a JSON and the compact option, any serialization is accepted.
pub fn parse_with(data: &[u8], options: impl IntoIterator<Item = ParseOption>) -> Result<Message> {
	let mut accept_json = false;
	let mut accept_compact = false;
	for option in options {
		match option {
			ParseOption::Serialization(serialization) if serialization.is_json() => accept_json = true,
			ParseOption::Serialization(_) => accept_compact = true,
		}
	}

	let first = data.iter().position(|byte| !byte.is_ascii_whitespace()).map(|i| data[i]);
	let is_json = match first {
		None => return Err(Error::parse("empty input")),
		Some(first) => first == b'{',
	};

	if accept_json != accept_compact {
		let found = if is_json { "JSON" } else { "compact" };
		if accept_json != is_json {
			return Err(Error::parse(format!("expected a {} message, found a {} message", if accept_json { "JSON" } else { "compact" }, found)));
		}
	}

	if is_json {
		parse_json(data).map_err(|e| e.wrap(ErrorKind::Parse, "failed to parse JSON message"))
	} else {
		parse_compact(data).map_err(|e| e.wrap(ErrorKind::Parse, "failed to parse compact message"))
	}
}

/// Parse a message in the JWS Compact Serialization.
pub(crate) fn parse_compact(data: &[u8]) -> Result<Message> {
	let parts = split_compact(trim(data))?;
	parts.decode()
}

fn trim(data: &[u8]) -> &[u8] {
	let start = data.iter().position(|byte| !byte.is_ascii_whitespace()).unwrap_or(data.len());
	let end = data.iter().rposition(|byte| !byte.is_ascii_whitespace()).map_or(start, |i| i + 1);
	&data[start..end.max(start)]
}

fn trim_parts(parts: CompactParts) -> CompactParts {
	CompactParts {
		header: trim(parts.header),
		payload: parts.payload,
		signature: trim(parts.signature),
	}
}

#[derive(Deserialize)]
struct JsonMessage {
	#[serde(default)]
	payload: Option<String>,

	#[serde(default)]
	signatures: Option<Vec<JsonSignatureFields>>,

	#[serde(flatten)]
	flattened: JsonSignatureFields,
}

#[derive(Deserialize, Default)]
struct JsonSignatureFields {
	#[serde(default)]
	protected: Option<String>,

	#[serde(default)]
	header: Option<Headers>,

	#[serde(default)]
	signature: Option<String>,
}

impl JsonSignatureFields {
	fn is_empty(&self) -> bool {
		self.protected.is_none() && self.header.is_none() && self.signature.is_none()
	}

	fn decode(self) -> Result<Signature> {
		let signature = self.signature.ok_or_else(|| Error::invalid_message("signature is missing the \"signature\" member"))?;
		let signature = encoding::decode(signature.as_bytes()).map_err(|e| e.wrap(ErrorKind::InvalidBase64, "invalid signature encoding"))?;

		let protected = match self.protected {
			Some(protected) if !protected.is_empty() => {
				let decoded = encoding::decode(protected.as_bytes()).map_err(|e| e.wrap(ErrorKind::InvalidBase64, "invalid protected header encoding"))?;
				Headers::parse(&decoded)?
			},
			_ => {
				if self.header.is_none() {
					return Err(Error::invalid_message("signature has neither a protected nor an unprotected header"));
				}
				Headers::empty_raw()
			},
		};

		Ok(Signature::new(protected, self.header, signature))
	}
}

/// Parse a message in the general or flattened JWS JSON Serialization.
pub(crate) fn parse_json(data: &[u8]) -> Result<Message> {
	let raw: JsonMessage = serde_json::from_slice(data)?;

	let signatures = match raw.signatures {
		Some(signatures) => {
			if !raw.flattened.is_empty() {
				return Err(Error::invalid_message("message mixes the general and flattened JSON serialization"));
			}
			if signatures.is_empty() {
				return Err(Error::invalid_message("message has no signatures"));
			}
			signatures.into_iter()
				.map(JsonSignatureFields::decode)
				.collect::<Result<Vec<_>>>()?
		},
		None => vec![raw.flattened.decode()?],
	};

	// All signatures must agree on the payload encoding.
	let b64 = signatures[0].b64();
	if signatures.iter().any(|signature| signature.b64() != b64) {
		return Err(Error::invalid_header_param("signatures disagree on the b64 header parameter"));
	}

	let payload = match raw.payload {
		None => Vec::new(),
		Some(payload) if b64 => encoding::decode(payload.as_bytes()).map_err(|e| e.wrap(ErrorKind::InvalidBase64, "invalid payload encoding"))?,
		Some(payload) => payload.into_bytes(),
	};

	Ok(Message::from_parts(payload, signatures, b64))
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::{json_object, with_compact, with_json};
	use assert2::assert;

	const COMPACT: &str = "eyJhbGciOiJub25lIn0.Zm9v.";

	#[test]
	fn test_autodetect() {
		let compact = parse_str(COMPACT).unwrap();
		assert!(compact.payload() == b"foo");

		let json = parse(br#"  {"payload":"Zm9v","protected":"eyJhbGciOiJub25lIn0","signature":""}"#).unwrap();
		assert!(json.payload() == b"foo");
		assert!(json.signatures().len() == 1);

		let general = parse(br#"{"payload":"Zm9v","signatures":[{"protected":"eyJhbGciOiJub25lIn0","signature":""},{"header":{"alg":"none","kid":"x"},"signature":""}]}"#).unwrap();
		assert!(general.signatures().len() == 2);
		assert!(general.signatures()[1].key_id() == Some("x"));
		assert!(general.signatures()[1].protected_headers().raw_buffer() == Some(&b""[..]));
		assert!(general.signatures()[1].protected_headers().is_empty());
	}

	#[test]
	fn test_empty_input() {
		assert!(parse(b"").unwrap_err().kind() == ErrorKind::Parse);
		assert!(parse(b"  \n ").unwrap_err().kind() == ErrorKind::Parse);
		assert!(parse_reader(&b""[..]).unwrap_err().kind() == ErrorKind::Parse);
	}

	#[test]
	fn test_serialization_option() {
		assert!(let Ok(_) = parse_with(COMPACT.as_bytes(), [with_compact()]));
		assert!(parse_with(COMPACT.as_bytes(), [with_json()]).unwrap_err().kind() == ErrorKind::Parse);
		assert!(parse_with(br#"{"payload":"","signatures":[]}"#, [with_compact()]).unwrap_err().kind() == ErrorKind::Parse);
		assert!(let Ok(_) = parse_with(COMPACT.as_bytes(), [with_json(), with_compact()]));
	}

	#[test]
	fn test_invalid_json_messages() {
		let error = parse(br#"{"payload":"Zm9v","signatures":[]}"#).unwrap_err();
		assert!(error.kind() == ErrorKind::Parse);
		assert!(error.is(ErrorKind::InvalidMessage));

		let mixed = br#"{"payload":"Zm9v","signature":"","signatures":[{"protected":"eyJhbGciOiJub25lIn0","signature":""}]}"#;
		assert!(parse(mixed).unwrap_err().is(ErrorKind::InvalidMessage));

		let no_headers = br#"{"payload":"Zm9v","signature":""}"#;
		assert!(parse(no_headers).unwrap_err().is(ErrorKind::InvalidMessage));

		assert!(parse(b"{not json").unwrap_err().is(ErrorKind::InvalidJson));
	}

	#[test]
	fn test_b64_must_agree() {
		// {"alg":"none","b64":false}
		let data = br#"{"payload":"foo","signatures":[{"protected":"eyJhbGciOiJub25lIiwiYjY0IjpmYWxzZX0","signature":""},{"protected":"eyJhbGciOiJub25lIn0","signature":""}]}"#;
		assert!(parse(data).unwrap_err().is(ErrorKind::InvalidHeaderParam));
	}

	#[test]
	fn test_unencoded_json_payload() {
		let data = br#"{"payload":"$.02","protected":"eyJhbGciOiJub25lIiwiYjY0IjpmYWxzZX0","signature":""}"#;
		let message = parse(data).unwrap();
		assert!(!message.b64());
		assert!(message.payload() == b"$.02");
		assert!(message.signatures()[0].protected_headers().as_object() == &json_object!{"alg": "none", "b64": false});
	}

	#[test]
	fn test_detached_json_payload() {
		let message = parse(br#"{"protected":"eyJhbGciOiJub25lIn0","signature":""}"#).unwrap();
		assert!(message.payload().is_empty());
	}

	#[test]
	fn test_parse_reader() {
		let message = parse_reader(format!("\n {}\n", COMPACT).as_bytes()).unwrap();
		assert!(message.payload() == b"foo");

		let message = parse_reader(&br#" {"payload":"Zm9v","protected":"eyJhbGciOiJub25lIn0","signature":""}"#[..]).unwrap();
		assert!(message.payload() == b"foo");

		assert!(parse_reader(&b"a.b.c.d"[..]).unwrap_err().is(ErrorKind::InvalidMessage));
	}

	#[test]
	fn test_compact_whitespace_is_trimmed() {
		let message = parse(format!("  {}\r\n", COMPACT).as_bytes()).unwrap();
		assert!(message.payload() == b"foo");
	}
}
