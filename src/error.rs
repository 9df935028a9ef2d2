//! Error types for this crate.
//!
//! Every error has a [`ErrorKind`] and a message.
//! Errors are wrapped with a new kind and message whenever they cross a boundary
//! (for example from the parser into [`verify`](crate::verify())),
//! so the top-level kind tells you which operation failed,
//! while [`Error::is`] tells you if a specific kind occurred anywhere in the chain.

pub type Result<T> = std::result::Result<T, Error>;

/// The kind of an error.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, thiserror::Error)]
#[non_exhaustive]
pub enum ErrorKind {
	/// The input could not be parsed as a JWS message.
	#[error("failed to parse JWS message")]
	Parse,

	/// Signing a payload failed.
	#[error("failed to sign payload")]
	Sign,

	/// Verifying a message failed for a reason other than a rejected signature.
	#[error("failed to verify message")]
	Verify,

	/// No key could verify any of the signatures of a message.
	#[error("signature verification failed")]
	Verification,

	/// A signature did not match the signing input.
	#[error("invalid signature")]
	InvalidSignature,

	/// The algorithm is not supported by the provider or the built-in backend.
	#[error("unsupported algorithm")]
	UnsupportedAlgorithm,

	/// The key can not be used with the requested algorithm.
	#[error("key type mismatch")]
	KeyTypeMismatch,

	/// The key failed self-validation.
	#[error("invalid key")]
	InvalidKey,

	/// A required header parameter is missing.
	#[error("missing required header parameter")]
	MissingHeaderParam,

	/// A header parameter has the wrong type or value.
	#[error("invalid header parameter")]
	InvalidHeaderParam,

	/// Invalid base64 data.
	#[error("invalid base64")]
	InvalidBase64,

	/// Invalid JSON data.
	#[error("invalid JSON")]
	InvalidJson,

	/// Data that should be UTF-8 is not.
	#[error("invalid UTF-8")]
	InvalidUtf8,

	/// The message structure is invalid.
	#[error("invalid message")]
	InvalidMessage,

	/// The requested serialization can not represent the message.
	#[error("serialization conflict")]
	SerializationConflict,

	/// The operation was cancelled through its [`Context`](crate::Context).
	#[error("operation cancelled")]
	Cancelled,

	/// An I/O error while reading input.
	#[error("I/O error")]
	Io,
}

/// An error with a kind, a message, and optionally the errors that caused it.
#[derive(Clone, Debug, thiserror::Error)]
#[error("{}{}{}", headline(.kind, .message), caused_by(.source), joined_list(.joined))]
pub struct Error {
	kind    : ErrorKind,
	message : String,
	#[source]
	source  : Option<Box<Error>>,
	joined  : Vec<Error>,
}

fn headline(kind: &ErrorKind, message: &str) -> String {
	if message.is_empty() {
		kind.to_string()
	} else {
		message.to_owned()
	}
}

fn caused_by(source: &Option<Box<Error>>) -> String {
	match source {
		Some(source) => format!(": {}", source),
		None         => String::new(),
	}
}

fn joined_list(joined: &[Error]) -> String {
	if joined.is_empty() {
		return String::new();
	}
	let joined: Vec<String> = joined.iter().map(Error::to_string).collect();
	format!(": {}", joined.join("; "))
}

macro_rules! define_constructor {
	($name:ident, $kind:ident) => {
		#[doc = concat!("Create a new [`ErrorKind::", stringify!($kind), "`] error.")]
		pub fn $name(message: impl Into<String>) -> Self {
			Self::new(ErrorKind::$kind, message)
		}
	};
}

impl Error {
	/// Create a new error with a kind and message.
	pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
		Self {
			kind,
			message: message.into(),
			source: None,
			joined: Vec::new(),
		}
	}

	define_constructor!(parse,                  Parse);
	define_constructor!(sign,                   Sign);
	define_constructor!(verify,                 Verify);
	define_constructor!(invalid_signature,      InvalidSignature);
	define_constructor!(unsupported_algorithm,  UnsupportedAlgorithm);
	define_constructor!(key_type_mismatch,      KeyTypeMismatch);
	define_constructor!(invalid_key,            InvalidKey);
	define_constructor!(invalid_header_param,   InvalidHeaderParam);
	define_constructor!(invalid_message,        InvalidMessage);
	define_constructor!(serialization_conflict, SerializationConflict);
	define_constructor!(cancelled,              Cancelled);

	/// Create a [`ErrorKind::MissingHeaderParam`] error for a header parameter.
	pub fn missing_header_param(name: impl AsRef<str>) -> Self {
		Self::new(ErrorKind::MissingHeaderParam, format!("missing required header parameter {:?}", name.as_ref()))
	}

	/// Create a [`ErrorKind::Verification`] error joining the errors of all attempts.
	pub fn verification(message: impl Into<String>, attempts: Vec<Error>) -> Self {
		Self {
			kind: ErrorKind::Verification,
			message: message.into(),
			source: None,
			joined: attempts,
		}
	}

	/// Wrap this error in a new error of the given kind.
	pub fn wrap(self, kind: ErrorKind, message: impl Into<String>) -> Self {
		Self {
			kind,
			message: message.into(),
			source: Some(Box::new(self)),
			joined: Vec::new(),
		}
	}

	/// The top-level kind of this error.
	pub fn kind(&self) -> ErrorKind {
		self.kind
	}

	/// The message of this error, without the messages of its causes.
	pub fn message(&self) -> &str {
		&self.message
	}

	/// The error this error wraps, if any.
	pub fn cause(&self) -> Option<&Error> {
		self.source.as_deref()
	}

	/// The errors joined into this error.
	///
	/// This is only non-empty for [`ErrorKind::Verification`] errors,
	/// where it holds the failure of each verification attempt in order.
	pub fn joined(&self) -> &[Error] {
		&self.joined
	}

	/// Check if this error or any error in its chain has the given kind.
	pub fn is(&self, kind: ErrorKind) -> bool {
		if self.kind == kind {
			return true;
		}
		if let Some(source) = &self.source {
			if source.is(kind) {
				return true;
			}
		}
		self.joined.iter().any(|e| e.is(kind))
	}

	/// The innermost error of the source chain.
	///
	/// Joined errors are not followed.
	pub fn root_cause(&self) -> &Error {
		let mut current = self;
		while let Some(source) = &current.source {
			current = source;
		}
		current
	}
}

impl From<serde_json::Error> for Error {
	fn from(other: serde_json::Error) -> Self {
		Self::new(ErrorKind::InvalidJson, other.to_string())
	}
}

impl From<base64::DecodeError> for Error {
	fn from(other: base64::DecodeError) -> Self {
		Self::new(ErrorKind::InvalidBase64, other.to_string())
	}
}

impl From<std::string::FromUtf8Error> for Error {
	fn from(other: std::string::FromUtf8Error) -> Self {
		Self::new(ErrorKind::InvalidUtf8, other.to_string())
	}
}

impl From<std::str::Utf8Error> for Error {
	fn from(other: std::str::Utf8Error) -> Self {
		Self::new(ErrorKind::InvalidUtf8, other.to_string())
	}
}

impl From<std::io::Error> for Error {
	fn from(other: std::io::Error) -> Self {
		Self::new(ErrorKind::Io, other.to_string())
	}
}
