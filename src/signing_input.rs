//! Construction of the JWS Signing Input.
//!
//! The signing input is `BASE64URL(protected) || '.' || payload`,
//! where the payload is base64url encoded unless the `b64` header parameter is `false` ([RFC 7797](https://tools.ietf.org/html/rfc7797)).

use crate::{Base64Encoder, Error, Result};

/// Compact messages larger than this are refused.
const MAX_COMPACT_SIZE: usize = 1 << 30;

/// Build the signing input from the protected header bytes and the payload.
pub fn signing_input(protected: &[u8], payload: &[u8], encoder: &dyn Base64Encoder, b64: bool) -> Vec<u8> {
	let mut buffer = Vec::with_capacity(protected.len() * 4 / 3 + payload.len() * 4 / 3 + 4);
	encoder.append_encode(&mut buffer, protected);
	buffer.push(b'.');
	append_payload(&mut buffer, payload, encoder, b64);
	buffer
}

/// Build the signing input from an already encoded protected header.
pub fn signing_input_encoded(encoded_protected: &[u8], payload: &[u8], encoder: &dyn Base64Encoder, b64: bool) -> Vec<u8> {
	let mut buffer = Vec::with_capacity(encoded_protected.len() + payload.len() * 4 / 3 + 4);
	buffer.extend_from_slice(encoded_protected);
	buffer.push(b'.');
	append_payload(&mut buffer, payload, encoder, b64);
	buffer
}

/// Join the parts of a JWS Compact Serialization message.
///
/// The payload is left empty if `detached` is true.
pub fn join_compact(protected: &[u8], payload: &[u8], signature: &[u8], encoder: &dyn Base64Encoder, b64: bool, detached: bool) -> Result<Vec<u8>> {
	let total = protected.len() + payload.len() + signature.len() + 2;
	if total > MAX_COMPACT_SIZE {
		return Err(Error::invalid_message("input sizes exceed maximum allowable buffer size"));
	}

	let mut buffer = Vec::with_capacity(total * 4 / 3 + 4);
	encoder.append_encode(&mut buffer, protected);
	buffer.push(b'.');
	if !detached {
		append_payload(&mut buffer, payload, encoder, b64);
	}
	buffer.push(b'.');
	encoder.append_encode(&mut buffer, signature);
	Ok(buffer)
}

fn append_payload(buffer: &mut Vec<u8>, payload: &[u8], encoder: &dyn Base64Encoder, b64: bool) {
	if b64 {
		encoder.append_encode(buffer, payload);
	} else {
		buffer.extend_from_slice(payload);
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::{PaddedUrlEncoding, RawUrlEncoding};
	use assert2::assert;

	#[test]
	fn test_signing_input_b64() {
		let input = signing_input(br#"{"alg":"HS256"}"#, b"$.02", &RawUrlEncoding, true);
		assert!(input == b"eyJhbGciOiJIUzI1NiJ9.JC4wMg");
	}

	#[test]
	fn test_signing_input_unencoded() {
		let input = signing_input(br#"{"alg":"HS256"}"#, b"$.02", &RawUrlEncoding, false);
		assert!(input == b"eyJhbGciOiJIUzI1NiJ9.$.02");
	}

	#[test]
	fn test_signing_input_encoded_header() {
		let input = signing_input_encoded(b"e30", b"fo", &PaddedUrlEncoding, true);
		assert!(input == b"e30.Zm8=");
	}

	#[test]
	fn test_join_compact() {
		let joined = join_compact(b"{}", b"foo", b"sig", &RawUrlEncoding, true, false).unwrap();
		assert!(joined == b"e30.Zm9v.c2ln");

		let detached = join_compact(b"{}", b"foo", b"sig", &RawUrlEncoding, true, true).unwrap();
		assert!(detached == b"e30..c2ln");

		let unencoded = join_compact(b"{}", b"foo", b"", &RawUrlEncoding, false, false).unwrap();
		assert!(unencoded == b"e30.foo.");
	}
}
