//! Idempotent filing cache: metadata lookup, object existence check, download, store, record.
//!
//! The object store is the source of truth for "is this filing cached". A record whose object
//! has gone missing is treated as drift and repaired by downloading again; an object whose record
//! is stale is not detected. The record is written after the object, so a crash in between leaves
//! an orphaned object that the next resolution overwrites.

mod metrics;

pub use metrics::CacheMetrics;

// self
use crate::{
	_prelude::*,
	fetch::RateLimitedFetcher,
	http::FetchHttpClient,
	model::FilingRecord,
	object::{ObjectKey, ObjectStore},
	obs::{self, OpKind, OpOutcome, OpSpan},
	store::DocumentStore,
};

/// Resolves filings to public object URLs, downloading each filing at most once.
pub struct FilingCache<C>
where
	C: ?Sized + FetchHttpClient,
{
	/// Shared resolution counters.
	pub metrics: Arc<CacheMetrics>,
	documents: Arc<dyn DocumentStore>,
	objects: Arc<dyn ObjectStore>,
	fetcher: Arc<RateLimitedFetcher<C>>,
	collection: String,
}
impl<C> FilingCache<C>
where
	C: ?Sized + FetchHttpClient,
{
	/// Collection used when none is configured.
	pub const DEFAULT_COLLECTION: &'static str = "financialReports";

	/// Creates a cache over the default metadata collection.
	pub fn new(
		documents: Arc<dyn DocumentStore>,
		objects: Arc<dyn ObjectStore>,
		fetcher: impl Into<Arc<RateLimitedFetcher<C>>>,
	) -> Self {
		Self {
			metrics: Default::default(),
			documents,
			objects,
			fetcher: fetcher.into(),
			collection: Self::DEFAULT_COLLECTION.into(),
		}
	}

	/// Overrides the metadata collection.
	pub fn with_collection(mut self, collection: impl Into<String>) -> Self {
		self.collection = collection.into();

		self
	}

	/// Collection holding filing records.
	pub fn collection(&self) -> &str {
		&self.collection
	}

	/// Fetcher used on cache misses.
	pub fn fetcher(&self) -> &RateLimitedFetcher<C> {
		&self.fetcher
	}

	/// Returns the public URL of the filing's object, downloading and storing it on a miss.
	pub async fn resolve(&self, filing: FilingRecord) -> Result<String> {
		const KIND: OpKind = OpKind::ResolveFiling;

		let span = OpSpan::new(KIND, "resolve");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);

		let filing_id = filing.filing_id.clone();
		let result = span.instrument(self.resolve_inner(filing)).await;

		match &result {
			Ok(url) => {
				tracing::info!(filing = %filing_id, url = %url, "Resolved filing.");
				obs::record_op_outcome(KIND, OpOutcome::Success);
			},
			Err(e) => {
				tracing::warn!(filing = %filing_id, error = %e, "Failed to resolve filing.");
				obs::record_op_outcome(KIND, OpOutcome::Failure);
			},
		}

		result
	}

	async fn resolve_inner(&self, filing: FilingRecord) -> Result<String> {
		let key = ObjectKey::for_filing(&filing.filing_id);

		if let Some(document) =
			self.documents.get(&self.collection, filing.filing_id.as_str()).await?
		{
			let record = FilingRecord::from_document(&document)?;
			let cached = self.objects.exists(&key).await?;

			match (cached, record.stored_url) {
				(true, Some(url)) => {
					self.metrics.record_hit();

					return Ok(url);
				},
				(true, None) => {
					tracing::debug!(key = %key, "Record has no stored URL; fetching again.");
				},
				(false, _) => {
					tracing::warn!(key = %key, "Record exists but object is missing; repairing.");
					self.metrics.record_drift_repair();
				},
			}
		}

		self.metrics.record_fetch();

		let bytes = self.fetcher.download(&filing.filing_url).await?;
		let url = self.objects.put(&key, bytes).await?.to_string();

		self.write_record(filing, &url).await;

		Ok(url)
	}

	async fn write_record(&self, mut record: FilingRecord, url: &str) {
		record.stored_url = Some(url.to_owned());
		record.last_updated = Some(OffsetDateTime::now_utc());

		let written = match record.to_document() {
			Ok(document) => self.documents.set(&self.collection, document).await,
			Err(e) => Err(e),
		};

		if let Err(e) = written {
			self.metrics.record_metadata_write_failure();
			tracing::error!(
				filing = %record.filing_id,
				error = %e,
				"Stored the object but failed to write its record."
			);
		}
	}
}
impl<C> Debug for FilingCache<C>
where
	C: ?Sized + FetchHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("FilingCache")
			.field("collection", &self.collection)
			.field("fetcher", &self.fetcher)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::sync::atomic::{AtomicUsize, Ordering};
	// crates.io
	use time::macros::datetime;
	// self
	use super::*;
	use crate::{
		http::{HttpFuture, HttpReply},
		model::{Credential, FilingId},
		object::{MemoryObjectStore, PublicUrlBase},
		store::MemoryStore,
	};

	#[derive(Debug, ThisError)]
	#[error("unreachable")]
	struct Never;

	/// Serves the same PDF body for every request and counts calls.
	#[derive(Default)]
	struct Pdf(AtomicUsize);
	impl FetchHttpClient for Pdf {
		type TransportError = Never;

		fn get(&self, _url: Url) -> HttpFuture<'_, Self::TransportError> {
			self.0.fetch_add(1, Ordering::SeqCst);

			Box::pin(async { Ok(HttpReply::new(200, "%PDF")) })
		}
	}

	fn cache() -> (FilingCache<Pdf>, Arc<MemoryStore>, Arc<MemoryObjectStore>) {
		let documents = Arc::new(MemoryStore::default());
		let objects = Arc::new(MemoryObjectStore::new(
			PublicUrlBase::new("storage.example", "bucket").expect("Base should build."),
		));
		let fetcher = RateLimitedFetcher::new(
			Pdf::default(),
			Url::parse("https://upstream.example/reader").expect("Endpoint should parse."),
			vec![Credential::new("k1")],
		)
		.expect("Fetcher should build.");

		(FilingCache::new(documents.clone(), objects.clone(), fetcher), documents, objects)
	}

	async fn record_of(documents: &MemoryStore) -> FilingRecord {
		let document = documents
			.get(FilingCache::<Pdf>::DEFAULT_COLLECTION, "F1")
			.await
			.expect("Get should work.")
			.expect("Record should exist.");

		FilingRecord::from_document(&document).expect("Record should decode.")
	}

	async fn save(documents: &MemoryStore, record: &FilingRecord) {
		let document = record.to_document().expect("Record should encode.");

		documents
			.set(FilingCache::<Pdf>::DEFAULT_COLLECTION, document)
			.await
			.expect("Record should save.");
	}

	fn filing() -> FilingRecord {
		FilingRecord::new(FilingId::new("F1").expect("Filing fixture should be valid."), "http://src/f1")
	}

	#[tokio::test]
	async fn second_resolution_is_a_hit() {
		let (cache, documents, objects) = cache();
		let first = cache.resolve(filing()).await.expect("Miss should download.");
		let second = cache.resolve(filing()).await.expect("Hit should succeed.");

		assert_eq!(first, "https://storage.example/bucket/filings/F1.pdf");
		assert_eq!(second, first);
		assert_eq!(cache.fetcher().http_client.0.load(Ordering::SeqCst), 1);
		assert_eq!(objects.writes(), 1);
		assert_eq!(documents.len(FilingCache::<Pdf>::DEFAULT_COLLECTION), 1);
		assert_eq!(cache.metrics.hits(), 1);
		assert_eq!(cache.metrics.fetches(), 1);
	}

	#[tokio::test]
	async fn missing_object_is_repaired() {
		let (cache, documents, objects) = cache();
		let url = cache.resolve(filing()).await.expect("Miss should download.");
		let mut stale = record_of(&documents).await;

		stale.last_updated = Some(datetime!(2020-01-01 00:00 UTC));
		save(&documents, &stale).await;

		assert!(objects.remove(&ObjectKey::for_filing(&filing().filing_id)));
		assert_eq!(cache.resolve(filing()).await.expect("Drift should be repaired."), url);
		assert_eq!(cache.metrics.drift_repairs(), 1);
		assert_eq!(objects.writes(), 2);

		let repaired = record_of(&documents).await;

		assert_eq!(repaired.stored_url.as_deref(), Some(url.as_str()));
		assert!(repaired.last_updated.is_some_and(|at| at > datetime!(2020-01-01 00:00 UTC)));
	}

	#[tokio::test]
	async fn record_without_stored_url_is_refetched() {
		let (cache, documents, objects) = cache();
		let key = ObjectKey::for_filing(&filing().filing_id);

		save(&documents, &filing()).await;
		objects.put(&key, b"old".to_vec()).await.expect("Object should save.");

		let url = cache.resolve(filing()).await.expect("Resolution should succeed.");

		assert_eq!(url, "https://storage.example/bucket/filings/F1.pdf");
		assert_eq!(cache.fetcher().http_client.0.load(Ordering::SeqCst), 1);
		assert_eq!(cache.metrics.hits(), 0);
		assert_eq!(cache.metrics.drift_repairs(), 0);
		assert_eq!(objects.writes(), 2);
		assert_eq!(record_of(&documents).await.stored_url, Some(url));
	}
}
