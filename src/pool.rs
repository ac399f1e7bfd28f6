//! Key pool allocator over the `tokens` collection.
//!
//! Listing never changes a key's status, so two callers listing at the same time may receive
//! the same ids; [`KeyPool::mark_used`] is a separate, best-effort step. [`KeyPool::lease`]
//! claims keys with a conditional update instead, so each id is handed to exactly one caller.

// crates.io
use futures_util::StreamExt;
// self
use crate::{
	_prelude::*,
	model::{KeyId, KeyStatus, KeyToken},
	obs::{self, OpKind, OpOutcome, OpSpan},
	store::{CompareAndSwapOutcome, Document, DocumentStore, StoreError, UpdateOutcome},
};

/// Summary of a [`KeyPool::mark_used`] batch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct MarkOutcome {
	/// Number of ids in the batch.
	pub requested: usize,
	/// Number of records moved to `used`.
	pub updated: usize,
}
impl MarkOutcome {
	/// Ids that were invalid, missing, or failed to update.
	pub fn failed(&self) -> usize {
		self.requested - self.updated
	}
}

/// Summary of a [`KeyPool::reset_stale`] sweep.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ResetReport {
	/// `used` records visited.
	pub scanned: usize,
	/// Records returned to `available`.
	pub reset: usize,
	/// Records left alone: unreadable, missing a timestamp, or changed concurrently.
	pub skipped: usize,
}

/// Allocator for pooled API keys.
#[derive(Clone)]
pub struct KeyPool {
	store: Arc<dyn DocumentStore>,
	collection: String,
}
impl KeyPool {
	/// Collection used when none is configured.
	pub const DEFAULT_COLLECTION: &'static str = "tokens";

	/// Creates a pool over the default collection.
	pub fn new(store: Arc<dyn DocumentStore>) -> Self {
		Self::with_collection(store, Self::DEFAULT_COLLECTION)
	}

	/// Creates a pool over `collection`.
	pub fn with_collection(store: Arc<dyn DocumentStore>, collection: impl Into<String>) -> Self {
		Self { store, collection: collection.into() }
	}

	/// Collection holding the key records.
	pub fn collection(&self) -> &str {
		&self.collection
	}

	/// Returns up to `n` available key ids in store order without changing their status.
	pub async fn list_available(&self, n: usize) -> Result<Vec<KeyId>> {
		const KIND: OpKind = OpKind::ListKeys;

		let span = OpSpan::new(KIND, "list_available");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span.instrument(self.collect_available(n)).await;

		record(KIND, &result);

		result
	}

	/// Moves every id in the batch to `used`, stamping the current time.
	///
	/// Invalid or unknown ids and per-record failures are logged and skipped; nothing is rolled
	/// back.
	pub async fn mark_used<I>(&self, ids: I) -> MarkOutcome
	where
		I: IntoIterator,
		I::Item: AsRef<str>,
	{
		const KIND: OpKind = OpKind::MarkKeys;

		let span = OpSpan::new(KIND, "mark_used");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let outcome = span.instrument(self.mark_each(ids, OffsetDateTime::now_utc())).await;

		tracing::info!(requested = outcome.requested, updated = outcome.updated, "Marked keys used.");
		obs::record_op_outcome(KIND, OpOutcome::Success);

		outcome
	}

	/// Counts keys whose status is `available`.
	pub async fn count_available(&self) -> Result<usize> {
		const KIND: OpKind = OpKind::CountKeys;

		let span = OpSpan::new(KIND, "count_available");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span.instrument(self.count_matching()).await;

		record(KIND, &result);

		result
	}

	/// Returns `used` keys last modified on an earlier calendar day than `now` to `available`.
	///
	/// Days are compared in `now`'s UTC offset, so callers pass the local time. Running the
	/// sweep twice on the same day resets nothing the second time.
	pub async fn reset_stale(&self, now: OffsetDateTime) -> Result<ResetReport> {
		const KIND: OpKind = OpKind::ResetStale;

		let span = OpSpan::new(KIND, "reset_stale");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span.instrument(self.sweep(now)).await;

		if let Ok(report) = &result {
			tracing::info!(
				scanned = report.scanned,
				reset = report.reset,
				skipped = report.skipped,
				"Stale key sweep finished."
			);
		}

		record(KIND, &result);

		result
	}

	/// Claims up to `n` available keys, moving each to `used` with a conditional update.
	///
	/// Only ids this call won are returned, so the result may be shorter than `n` under
	/// contention.
	pub async fn lease(&self, n: usize) -> Result<Vec<KeyId>> {
		const KIND: OpKind = OpKind::LeaseKeys;

		let span = OpSpan::new(KIND, "lease");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let result = span.instrument(self.claim(n, OffsetDateTime::now_utc())).await;

		record(KIND, &result);

		result
	}

	async fn collect_available(&self, n: usize) -> Result<Vec<KeyId>> {
		if n == 0 {
			return Ok(Vec::new());
		}

		let filter = KeyStatus::Available.filter();
		let mut cursor = self.store.query(&self.collection, &filter, Some(n)).await?;
		let mut ids = Vec::with_capacity(n);

		while let Some(item) = cursor.next().await {
			if let Some(id) = readable_id(item) {
				ids.push(id);
			}
		}

		Ok(ids)
	}

	async fn mark_each<I>(&self, ids: I, now: OffsetDateTime) -> MarkOutcome
	where
		I: IntoIterator,
		I::Item: AsRef<str>,
	{
		let mut outcome = MarkOutcome::default();
		let fields = match KeyToken::transition_fields(KeyStatus::Used, now) {
			Ok(fields) => fields,
			Err(e) => {
				tracing::warn!(error = %e, "Failed to build key transition; nothing marked.");

				return MarkOutcome { requested: ids.into_iter().count(), updated: 0 };
			},
		};

		for raw in ids {
			let raw = raw.as_ref();

			outcome.requested += 1;

			let id = match KeyId::new(raw) {
				Ok(id) => id,
				Err(e) => {
					tracing::warn!(key = raw, error = %e, "Skipping invalid key id.");

					continue;
				},
			};

			match self.store.update(&self.collection, id.as_str(), fields.clone()).await {
				Ok(UpdateOutcome::Updated) => outcome.updated += 1,
				Ok(UpdateOutcome::Missing) => tracing::warn!(key = %id, "Skipping unknown key."),
				Err(e) => tracing::warn!(key = %id, error = %e, "Failed to mark key used."),
			}
		}

		outcome
	}

	async fn count_matching(&self) -> Result<usize> {
		let filter = KeyStatus::Available.filter();
		let mut cursor = self.store.query(&self.collection, &filter, None).await?;
		let mut count = 0;

		while let Some(item) = cursor.next().await {
			match item {
				Ok(_) => count += 1,
				Err(e) => tracing::warn!(error = %e, "Skipping unreadable key record."),
			}
		}

		Ok(count)
	}

	async fn sweep(&self, now: OffsetDateTime) -> Result<ResetReport> {
		let filter = KeyStatus::Used.filter();
		let fields = KeyToken::transition_fields(KeyStatus::Available, now)?;
		let mut cursor = self.store.query(&self.collection, &filter, None).await?;
		let mut report = ResetReport::default();

		while let Some(item) = cursor.next().await {
			report.scanned += 1;

			let token = match item.and_then(|document| KeyToken::from_document(&document)) {
				Ok(token) => token,
				Err(e) => {
					tracing::warn!(error = %e, "Skipping unreadable key record.");
					report.skipped += 1;

					continue;
				},
			};

			match token.is_stale_at(now) {
				Some(true) => {},
				Some(false) => continue,
				None => {
					tracing::warn!(key = %token.id, "Skipping used key without `last_modified`.");
					report.skipped += 1;

					continue;
				},
			}

			match self
				.store
				.compare_and_update(&self.collection, token.id.as_str(), &filter, fields.clone())
				.await
			{
				Ok(CompareAndSwapOutcome::Updated) => report.reset += 1,
				Ok(outcome) => {
					tracing::debug!(key = %token.id, ?outcome, "Key changed during sweep.");
					report.skipped += 1;
				},
				Err(e) => {
					tracing::warn!(key = %token.id, error = %e, "Failed to reset key.");
					report.skipped += 1;
				},
			}
		}

		Ok(report)
	}

	async fn claim(&self, n: usize, now: OffsetDateTime) -> Result<Vec<KeyId>> {
		if n == 0 {
			return Ok(Vec::new());
		}

		let filter = KeyStatus::Available.filter();
		let fields = KeyToken::transition_fields(KeyStatus::Used, now)?;
		let mut cursor = self.store.query(&self.collection, &filter, Some(n)).await?;
		let mut claimed = Vec::with_capacity(n);

		while let Some(item) = cursor.next().await {
			let Some(id) = readable_id(item) else {
				continue;
			};

			match self
				.store
				.compare_and_update(&self.collection, id.as_str(), &filter, fields.clone())
				.await
			{
				Ok(CompareAndSwapOutcome::Updated) => claimed.push(id),
				Ok(outcome) => tracing::debug!(key = %id, ?outcome, "Key was claimed elsewhere."),
				Err(e) => tracing::warn!(key = %id, error = %e, "Failed to claim key."),
			}
		}

		Ok(claimed)
	}
}
impl Debug for KeyPool {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("KeyPool").field("collection", &self.collection).finish()
	}
}

fn readable_id(item: Result<Document, StoreError>) -> Option<KeyId> {
	let document = match item {
		Ok(document) => document,
		Err(e) => {
			tracing::warn!(error = %e, "Skipping unreadable key record.");

			return None;
		},
	};

	KeyId::new(&document.id)
		.map_err(|e| tracing::warn!(key = %document.id, error = %e, "Skipping invalid key id."))
		.ok()
}

fn record<T>(kind: OpKind, result: &Result<T>) {
	match result {
		Ok(_) => obs::record_op_outcome(kind, OpOutcome::Success),
		Err(e) => {
			tracing::warn!(error = %e, "Key pool operation failed.");
			obs::record_op_outcome(kind, OpOutcome::Failure);
		},
	}
}
