//! JWS Compact Serialization splitting and decoding.

use std::io::Read;

use crate::{encoding, Error, ErrorKind, Headers, Message, Result, Signature};

/// The individual (still encoded) parts of a JWS Compact Serialization message.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct CompactParts<'a> {
	pub header    : &'a [u8],
	pub payload   : &'a [u8],
	pub signature : &'a [u8],
}

/// The parts of a JWS Compact Serialization message read from a stream.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct CompactPartsBuf {
	pub header    : Vec<u8>,
	pub payload   : Vec<u8>,
	pub signature : Vec<u8>,
}

/// Split a compact message at its two periods.
///
/// Each of the resulting parts may be empty, but a message with fewer or more than two periods is rejected.
pub fn split_compact(data: &[u8]) -> Result<CompactParts> {
	let mut periods = data.iter().enumerate().filter(|&(_, &c)| c == b'.').map(|(i, _)| i);
	let (first, second) = match (periods.next(), periods.next(), periods.next()) {
		(Some(first), Some(second), None) => (first, second),
		(_, _, Some(_)) => return Err(Error::invalid_message(TOO_MANY_PARTS)),
		(_, _, None) => return Err(Error::invalid_message("compact JWS must have three parts separated by '.'")),
	};

	Ok(CompactParts {
		header    : &data[..first],
		payload   : &data[first + 1..second],
		signature : &data[second + 1..],
	})
}

const TOO_MANY_PARTS: &str = "compact JWS has more than three parts";

/// Split the parts of a JWS Compact Serialization message in a string.
pub fn split_compact_str(data: &str) -> Result<CompactParts> {
	split_compact(data.as_bytes())
}

/// Split the parts of a JWS Compact Serialization message while reading it from a stream.
///
/// Reading stops with an error as soon as a third period is found.
pub fn split_compact_reader(mut reader: impl Read) -> Result<CompactPartsBuf> {
	let mut parts: [Vec<u8>; 3] = Default::default();
	let mut index = 0;
	let mut buffer = [0u8; 4096];

	loop {
		let read = match reader.read(&mut buffer) {
			Ok(0) => break,
			Ok(read) => read,
			Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
			Err(e) => return Err(e.into()),
		};

		for &byte in &buffer[..read] {
			if byte != b'.' {
				parts[index].push(byte);
				continue;
			}
			index += 1;
			if index > 2 {
				return Err(Error::invalid_message(TOO_MANY_PARTS));
			}
		}
	}

	if index != 2 {
		return Err(Error::invalid_message(format!("encoded message must have 3 parts, found {}", index + 1)));
	}

	let [header, payload, signature] = parts;
	Ok(CompactPartsBuf { header, payload, signature })
}

impl<'a> CompactParts<'a> {
	/// Decode the parts into a message with a single signature.
	///
	/// The payload is base64url decoded unless the protected header sets `b64` to false.
	pub fn decode(&self) -> Result<Message> {
		let header = encoding::decode(self.header).map_err(|e| e.wrap(ErrorKind::InvalidBase64, "invalid protected header encoding"))?;
		let protected = Headers::parse(&header)?;

		let b64 = protected.b64();
		let payload = if b64 {
			encoding::decode(self.payload).map_err(|e| e.wrap(ErrorKind::InvalidBase64, "invalid payload encoding"))?
		} else {
			self.payload.to_vec()
		};

		let signature = encoding::decode(self.signature).map_err(|e| e.wrap(ErrorKind::InvalidBase64, "invalid signature encoding"))?;
		Ok(Message::from_parts(payload, vec![Signature::new(protected, None, signature)], b64))
	}
}

impl CompactPartsBuf {
	pub fn as_parts(&self) -> CompactParts {
		CompactParts {
			header: &self.header,
			payload: &self.payload,
			signature: &self.signature,
		}
	}
}
