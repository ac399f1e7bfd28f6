//! Observability helpers shared by the key pool, fetcher, and filing cache.
//!
//! # Feature Flags
//!
//! - Spans are always emitted through `tracing`, named `filing_broker.op` with the `op`
//!   (operation) and `stage` (call site) fields.
//! - Enable `metrics` to increment the `filing_broker_op_total` counter for every
//!   attempt/success/failure, labeled by `op` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Broker operations observed by spans and counters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpKind {
	/// Filing cache resolution.
	ResolveFiling,
	/// Upstream download with credential rotation.
	Download,
	/// Listing available keys.
	ListKeys,
	/// Atomically claiming available keys.
	LeaseKeys,
	/// Marking keys as used.
	MarkKeys,
	/// Counting available keys.
	CountKeys,
	/// Daily stale-key reset sweep.
	ResetStale,
}
impl OpKind {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpKind::ResolveFiling => "resolve_filing",
			OpKind::Download => "download",
			OpKind::ListKeys => "list_keys",
			OpKind::LeaseKeys => "lease_keys",
			OpKind::MarkKeys => "mark_keys",
			OpKind::CountKeys => "count_keys",
			OpKind::ResetStale => "reset_stale",
		}
	}
}
impl Display for OpKind {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OpOutcome {
	/// Entry to a broker operation.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
}
impl OpOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			OpOutcome::Attempt => "attempt",
			OpOutcome::Success => "success",
			OpOutcome::Failure => "failure",
		}
	}
}
impl Display for OpOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn labels_are_snake_case() {
		assert_eq!(OpKind::ResolveFiling.to_string(), "resolve_filing");
		assert_eq!(OpKind::ResetStale.as_str(), "reset_stale");
		assert_eq!(OpOutcome::Failure.to_string(), "failure");
	}
}
