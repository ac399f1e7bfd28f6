//! Fixtures shared by the integration suites.

#![allow(dead_code, unused_imports)]

// std
use std::{
	collections::HashSet,
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
};
// crates.io
use futures_util::{StreamExt, stream};
use parking_lot::Mutex;
use time::OffsetDateTime;
// self
#[cfg(feature = "reqwest")]
use filing_broker::{
	fetch::RateLimitedFetcher,
	http::ReqwestHttpClient,
	model::Credential,
	url::Url,
};
use filing_broker::{
	model::{KeyId, KeyStatus, KeyToken},
	object::PublicUrlBase,
	store::{
		CompareAndSwapOutcome, Document, DocumentCursor, DocumentStore, FieldFilter, Fields,
		MemoryStore, StoreError, StoreFuture, UpdateOutcome,
	},
};

pub const TOKENS: &str = "tokens";
pub const FILINGS: &str = "financialReports";

/// [`MemoryStore`] wrapper with switchable failures.
#[derive(Default)]
pub struct FlakyStore {
	pub inner: MemoryStore,
	pub fail_get: AtomicBool,
	pub fail_set: AtomicBool,
	pub fail_query: AtomicBool,
	pub poison_cursor: AtomicBool,
	pub fail_writes_for: Mutex<HashSet<String>>,
}
impl FlakyStore {
	pub fn fail_writes_for(&self, id: &str) {
		self.fail_writes_for.lock().insert(id.to_owned());
	}

	fn check(flag: &AtomicBool, what: &str) -> Result<(), StoreError> {
		if flag.load(Ordering::SeqCst) {
			Err(StoreError::Backend { message: format!("injected {what} failure") })
		} else {
			Ok(())
		}
	}

	fn check_write(&self, id: &str) -> Result<(), StoreError> {
		if self.fail_writes_for.lock().contains(id) {
			Err(StoreError::Backend { message: format!("injected write failure for {id}") })
		} else {
			Ok(())
		}
	}
}
impl DocumentStore for FlakyStore {
	fn get<'a>(&'a self, collection: &'a str, id: &'a str) -> StoreFuture<'a, Option<Document>> {
		Box::pin(async move {
			Self::check(&self.fail_get, "get")?;

			self.inner.get(collection, id).await
		})
	}

	fn set<'a>(&'a self, collection: &'a str, document: Document) -> StoreFuture<'a, ()> {
		Box::pin(async move {
			Self::check(&self.fail_set, "set")?;

			self.inner.set(collection, document).await
		})
	}

	fn update<'a>(
		&'a self,
		collection: &'a str,
		id: &'a str,
		fields: Fields,
	) -> StoreFuture<'a, UpdateOutcome> {
		Box::pin(async move {
			self.check_write(id)?;

			self.inner.update(collection, id, fields).await
		})
	}

	fn compare_and_update<'a>(
		&'a self,
		collection: &'a str,
		id: &'a str,
		expected: &'a FieldFilter,
		fields: Fields,
	) -> StoreFuture<'a, CompareAndSwapOutcome> {
		Box::pin(async move {
			self.check_write(id)?;

			self.inner.compare_and_update(collection, id, expected, fields).await
		})
	}

	fn query<'a>(
		&'a self,
		collection: &'a str,
		filter: &'a FieldFilter,
		limit: Option<usize>,
	) -> StoreFuture<'a, DocumentCursor<'a>> {
		Box::pin(async move {
			Self::check(&self.fail_query, "query")?;

			let cursor = self.inner.query(collection, filter, limit).await?;

			if !self.poison_cursor.load(Ordering::SeqCst) {
				return Ok(cursor);
			}

			let poisoned: DocumentCursor<'a> = Box::pin(
				stream::iter([Err(StoreError::Backend { message: "injected read failure".into() })])
					.chain(cursor),
			);

			Ok(poisoned)
		})
	}
}

pub fn key(id: &str) -> KeyId {
	KeyId::new(id).expect("Key fixture should be valid.")
}

pub async fn seed_token(
	store: &dyn DocumentStore,
	id: &str,
	status: KeyStatus,
	last_modified: Option<OffsetDateTime>,
) {
	let mut token = KeyToken::new(key(id), status);

	token.last_modified = last_modified;

	store
		.set(TOKENS, token.to_document().expect("Token fixture should encode."))
		.await
		.expect("Token fixture should be saved.");
}

pub async fn token(store: &dyn DocumentStore, id: &str) -> KeyToken {
	let document = store
		.get(TOKENS, id)
		.await
		.expect("Token lookup should succeed.")
		.expect("Token should exist.");

	KeyToken::from_document(&document).expect("Token should decode.")
}

pub fn public_base() -> PublicUrlBase {
	PublicUrlBase::new("storage.example", "filing-pdf").expect("Public base fixture should build.")
}

#[cfg(feature = "reqwest")]
pub fn fetcher(
	endpoint: &str,
	credentials: &[&str],
) -> Arc<RateLimitedFetcher<ReqwestHttpClient>> {
	let fetcher = RateLimitedFetcher::new(
		ReqwestHttpClient::default(),
		Url::parse(endpoint).expect("Mock endpoint should parse."),
		credentials.iter().map(|value| Credential::new(*value)).collect(),
	)
	.expect("Fetcher fixture should build.");

	Arc::new(fetcher)
}
