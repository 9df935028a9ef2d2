//! Cancellation and deadlines for key providers.
//!
//! A [`Context`] passed with [`with_context`](crate::with_context) is checked before every key provider runs
//! and is handed to the provider, so providers doing slow work (like fetching a key set) can stop early.
//! Cancellation is carried by a [`CancellationToken`], so a context can be tied to the cancellation of a larger task.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::{Error, Result};

/// A cancellation token and an optional deadline, checked before each key provider runs.
#[derive(Clone, Debug, Default)]
pub struct Context {
	token    : CancellationToken,
	deadline : Option<Instant>,
}

/// Cancels the [`Context`] it was created with.
#[derive(Clone, Debug)]
pub struct CancelHandle {
	token: CancellationToken,
}

impl Context {
	/// A context that is never cancelled and has no deadline.
	pub fn background() -> Self {
		Self::default()
	}

	/// Create a context that can be cancelled with the returned handle.
	pub fn with_cancel() -> (Self, CancelHandle) {
		let token = CancellationToken::new();
		let handle = CancelHandle { token: token.clone() };
		(Self::from_token(token), handle)
	}

	/// Create a context that is cancelled together with an existing token.
	pub fn from_token(token: CancellationToken) -> Self {
		Self { token, deadline: None }
	}

	/// Create a child context.
	///
	/// The child is cancelled when this context is cancelled, but cancelling the child leaves this context alone.
	/// The child keeps the deadline of this context.
	pub fn child(&self) -> Self {
		Self {
			token: self.token.child_token(),
			deadline: self.deadline,
		}
	}

	/// Set a deadline, keeping an earlier deadline if there is one.
	pub fn with_deadline(mut self, deadline: Instant) -> Self {
		self.deadline = Some(match self.deadline {
			Some(current) => current.min(deadline),
			None => deadline,
		});
		self
	}

	/// Set a deadline relative to now.
	pub fn with_timeout(self, timeout: Duration) -> Self {
		self.with_deadline(Instant::now() + timeout)
	}

	pub fn deadline(&self) -> Option<Instant> {
		self.deadline
	}

	/// The cancellation token of this context.
	pub fn token(&self) -> &CancellationToken {
		&self.token
	}

	/// Check if the context was cancelled or its deadline passed.
	pub fn is_done(&self) -> bool {
		self.check().is_err()
	}

	/// Return an [`ErrorKind::Cancelled`](crate::ErrorKind::Cancelled) error if the context is done.
	pub fn check(&self) -> Result<()> {
		if self.token.is_cancelled() {
			return Err(Error::cancelled("context cancelled"));
		}
		if let Some(deadline) = self.deadline {
			if Instant::now() >= deadline {
				return Err(Error::cancelled("context deadline exceeded"));
			}
		}
		Ok(())
	}
}

impl CancelHandle {
	pub fn cancel(&self) {
		self.token.cancel();
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::ErrorKind;
	use assert2::assert;

	#[test]
	fn test_background_is_never_done() {
		assert!(let Ok(()) = Context::background().check());
		assert!(!Context::background().is_done());
	}

	#[test]
	fn test_cancel() {
		let (context, handle) = Context::with_cancel();
		let clone = context.clone();
		assert!(!context.is_done());
		handle.cancel();
		assert!(context.is_done());
		assert!(context.token().is_cancelled());
		assert!(clone.check().unwrap_err().kind() == ErrorKind::Cancelled);
	}

	#[test]
	fn test_child_follows_parent() {
		let (parent, handle) = Context::with_cancel();
		let parent = parent.with_timeout(Duration::from_secs(3600));
		let child = parent.child();
		assert!(child.deadline() == parent.deadline());

		// Cancelling a child does not reach the parent.
		child.token().cancel();
		assert!(child.is_done());
		assert!(!parent.is_done());

		let second = parent.child();
		assert!(!second.is_done());
		handle.cancel();
		assert!(second.check().unwrap_err().kind() == ErrorKind::Cancelled);
	}

	#[test]
	fn test_external_token() {
		let token = CancellationToken::new();
		let context = Context::from_token(token.clone());
		assert!(let Ok(()) = context.check());
		token.cancel();
		assert!(context.check().unwrap_err().kind() == ErrorKind::Cancelled);
	}

	#[test]
	fn test_deadline() {
		let past = Instant::now();
		let context = Context::background().with_timeout(Duration::from_secs(3600));
		assert!(!context.is_done());
		let context = context.with_deadline(past);
		assert!(context.deadline() == Some(past));
		assert!(context.check().unwrap_err().kind() == ErrorKind::Cancelled);
	}
}
