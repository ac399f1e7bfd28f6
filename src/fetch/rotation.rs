//! Process-wide sticky cursor over the configured upstream credentials.

// std
use std::sync::atomic::{AtomicUsize, Ordering};
// self
use crate::{_prelude::*, error::ConfigError, model::Credential};

/// Ordered credential list plus the index of the credential new downloads start with.
///
/// The cursor only moves when a credential is rate limited, so every download keeps using the
/// last credential that worked. Two downloads rotating at the same time may skip or repeat a
/// credential; each download still makes at most one attempt per configured credential.
#[derive(Debug)]
pub struct CredentialRing {
	credentials: Vec<Credential>,
	cursor: AtomicUsize,
}
impl CredentialRing {
	/// Builds a ring starting at the first credential.
	pub fn new(credentials: Vec<Credential>) -> Result<Self, ConfigError> {
		if credentials.is_empty() {
			return Err(ConfigError::NoCredentials);
		}

		Ok(Self { credentials, cursor: AtomicUsize::new(0) })
	}

	/// Number of configured credentials.
	pub fn len(&self) -> usize {
		self.credentials.len()
	}

	/// Always `false`; construction rejects empty lists.
	pub fn is_empty(&self) -> bool {
		self.credentials.is_empty()
	}

	/// Index the next download starts from.
	pub fn position(&self) -> usize {
		self.cursor.load(Ordering::Acquire)
	}

	/// Credential at `index`, wrapping around the ring.
	pub fn credential(&self, index: usize) -> &Credential {
		&self.credentials[index % self.credentials.len()]
	}

	/// Moves the cursor past `from`, returning the index to try next.
	///
	/// If another download already rotated away from `from`, its choice is adopted instead of
	/// rotating a second time.
	pub fn advance(&self, from: usize) -> usize {
		let next = (from + 1) % self.credentials.len();

		match self.cursor.compare_exchange(from, next, Ordering::AcqRel, Ordering::Acquire) {
			Ok(_) => next,
			Err(current) => current,
		}
	}
}
