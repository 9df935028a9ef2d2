//! Base64url encoding used for the parts of a JWS message.
//!
//! Messages are encoded with the unpadded URL-safe alphabet from [RFC 4648 section 5](https://tools.ietf.org/html/rfc4648#section-5) by default.
//! Some producers insist on padding, so the encoder is a trait object that can be swapped per call
//! with [`with_base64_encoder`](crate::with_base64_encoder).

use std::fmt;
use std::sync::Arc;

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig, URL_SAFE, URL_SAFE_NO_PAD};
use base64::engine::DecodePaddingMode;
use base64::Engine;

use crate::Result;

/// Engine that decodes URL-safe base64 with or without padding.
const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(
	&alphabet::URL_SAFE,
	GeneralPurposeConfig::new()
		.with_encode_padding(false)
		.with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// An encoder for the base64 parts of a JWS message.
pub trait Base64Encoder: fmt::Debug + Send + Sync {
	/// Encode bytes to a string.
	fn encode(&self, input: &[u8]) -> String;

	/// Decode bytes previously produced by [`encode`](Self::encode).
	fn decode(&self, input: &[u8]) -> Result<Vec<u8>>;

	/// Append the encoded form of `input` to `output`.
	fn append_encode(&self, output: &mut Vec<u8>, input: &[u8]) {
		output.extend_from_slice(self.encode(input).as_bytes());
	}
}

/// URL-safe base64 without padding, the encoding mandated by RFC 7515.
///
/// Decoding also accepts padded input.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct RawUrlEncoding;

/// URL-safe base64 with padding.
///
/// Decoding also accepts unpadded input.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct PaddedUrlEncoding;

impl Base64Encoder for RawUrlEncoding {
	fn encode(&self, input: &[u8]) -> String {
		URL_SAFE_NO_PAD.encode(input)
	}

	fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
		decode(input)
	}

	fn append_encode(&self, output: &mut Vec<u8>, input: &[u8]) {
		let start = output.len();
		output.resize(start + base64::encoded_len(input.len(), false).unwrap_or(0), 0);
		let written = URL_SAFE_NO_PAD.encode_slice(input, &mut output[start..]).unwrap_or(0);
		output.truncate(start + written);
	}
}

impl Base64Encoder for PaddedUrlEncoding {
	fn encode(&self, input: &[u8]) -> String {
		URL_SAFE.encode(input)
	}

	fn decode(&self, input: &[u8]) -> Result<Vec<u8>> {
		decode(input)
	}
}

/// The encoder used when no encoder is specified.
pub fn default_encoder() -> Arc<dyn Base64Encoder> {
	Arc::new(RawUrlEncoding)
}

/// Encode bytes with the default encoding.
pub fn encode(input: &[u8]) -> String {
	URL_SAFE_NO_PAD.encode(input)
}

/// Decode URL-safe base64 data, with or without padding.
///
/// Any byte outside of the URL-safe alphabet is an error.
pub fn decode(input: &[u8]) -> Result<Vec<u8>> {
	Ok(URL_SAFE_LENIENT.decode(input)?)
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::ErrorKind;
	use assert2::assert;

	#[test]
	fn test_encode_raw() {
		assert!(RawUrlEncoding.encode(b"foo") == "Zm9v");
		assert!(RawUrlEncoding.encode(b"fo") == "Zm8");
		assert!(RawUrlEncoding.encode(&[0xfb, 0xff]) == "-_8");
		assert!(PaddedUrlEncoding.encode(b"fo") == "Zm8=");
	}

	#[test]
	fn test_append_encode() {
		let mut output = b"prefix.".to_vec();
		RawUrlEncoding.append_encode(&mut output, b"hello");
		assert!(output == b"prefix.aGVsbG8");

		let mut output = Vec::new();
		PaddedUrlEncoding.append_encode(&mut output, b"hello");
		assert!(output == b"aGVsbG8=");
	}

	#[test]
	fn test_decode_with_and_without_padding() {
		assert!(decode(b"Zm8").unwrap() == b"fo");
		assert!(decode(b"Zm8=").unwrap() == b"fo");
		assert!(decode(b"").unwrap() == b"");
		assert!(RawUrlEncoding.decode(b"-_8").unwrap() == [0xfb, 0xff]);
	}

	#[test]
	fn test_decode_rejects_foreign_alphabet() {
		let error = decode(b"+/8").unwrap_err();
		assert!(error.kind() == ErrorKind::InvalidBase64);
		assert!(let Err(_) = decode(b"Zm9v.Zm9v"));
	}
}
