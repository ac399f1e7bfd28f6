// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for filing cache resolutions.
#[derive(Debug, Default)]
pub struct CacheMetrics {
	hits: AtomicU64,
	fetches: AtomicU64,
	drift_repairs: AtomicU64,
	metadata_write_failures: AtomicU64,
}
impl CacheMetrics {
	/// Returns the number of resolutions answered from the cache.
	pub fn hits(&self) -> u64 {
		self.hits.load(Ordering::Relaxed)
	}

	/// Returns the number of resolutions that downloaded the filing.
	pub fn fetches(&self) -> u64 {
		self.fetches.load(Ordering::Relaxed)
	}

	/// Returns the number of fetches triggered by a record whose object was missing.
	pub fn drift_repairs(&self) -> u64 {
		self.drift_repairs.load(Ordering::Relaxed)
	}

	/// Returns the number of record writes that failed after the object was stored.
	pub fn metadata_write_failures(&self) -> u64 {
		self.metadata_write_failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_hit(&self) {
		self.hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_fetch(&self) {
		self.fetches.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_drift_repair(&self) {
		self.drift_repairs.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_metadata_write_failure(&self) {
		self.metadata_write_failures.fetch_add(1, Ordering::Relaxed);
	}
}
