// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for upstream downloads.
#[derive(Debug, Default)]
pub struct FetchMetrics {
	attempts: AtomicU64,
	rate_limited: AtomicU64,
	success: AtomicU64,
	failure: AtomicU64,
}
impl FetchMetrics {
	/// Returns the total number of HTTP attempts, one per credential tried.
	pub fn attempts(&self) -> u64 {
		self.attempts.load(Ordering::Relaxed)
	}

	/// Returns the number of HTTP 429 responses observed.
	pub fn rate_limited(&self) -> u64 {
		self.rate_limited.load(Ordering::Relaxed)
	}

	/// Returns the number of downloads that produced a body.
	pub fn successes(&self) -> u64 {
		self.success.load(Ordering::Relaxed)
	}

	/// Returns the number of downloads that failed.
	pub fn failures(&self) -> u64 {
		self.failure.load(Ordering::Relaxed)
	}

	pub(crate) fn record_attempt(&self) {
		self.attempts.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_rate_limited(&self) {
		self.rate_limited.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.success.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failure.fetch_add(1, Ordering::Relaxed);
	}
}
