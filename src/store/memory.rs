//! Thread-safe in-memory [`DocumentStore`] implementation for local development and tests.

// std
use std::collections::BTreeMap;
// crates.io
use futures_util::stream;
// self
use crate::{
	_prelude::*,
	store::{
		CompareAndSwapOutcome, Document, DocumentCursor, DocumentStore, FieldFilter, Fields,
		StoreFuture, UpdateOutcome,
	},
};

pub(crate) type Collections = BTreeMap<String, BTreeMap<String, Fields>>;

type StoreMap = Arc<RwLock<Collections>>;

/// Thread-safe storage backend that keeps documents in-process for tests and demos.
///
/// Documents are kept ordered by id inside each collection, which is the order queries yield.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreMap);
impl MemoryStore {
	/// Returns the number of documents stored in `collection`.
	pub fn len(&self, collection: &str) -> usize {
		self.0.read().get(collection).map_or(0, BTreeMap::len)
	}

	/// Returns `true` when `collection` holds no documents.
	pub fn is_empty(&self, collection: &str) -> bool {
		self.len(collection) == 0
	}

	fn get_now(map: StoreMap, collection: &str, id: &str) -> Option<Document> {
		map.read()
			.get(collection)
			.and_then(|docs| docs.get(id))
			.map(|fields| Document::new(id, fields.clone()))
	}

	fn set_now(map: StoreMap, collection: &str, document: Document) {
		map.write().entry(collection.to_owned()).or_default().insert(document.id, document.fields);
	}

	fn update_now(map: StoreMap, collection: &str, id: &str, fields: Fields) -> UpdateOutcome {
		let mut guard = map.write();

		match guard.get_mut(collection).and_then(|docs| docs.get_mut(id)) {
			Some(existing) => {
				existing.extend(fields);

				UpdateOutcome::Updated
			},
			None => UpdateOutcome::Missing,
		}
	}

	fn cas_now(
		map: StoreMap,
		collection: &str,
		id: &str,
		expected: &FieldFilter,
		fields: Fields,
	) -> CompareAndSwapOutcome {
		let mut guard = map.write();

		match guard.get_mut(collection).and_then(|docs| docs.get_mut(id)) {
			Some(existing) if expected.matches(existing) => {
				existing.extend(fields);

				CompareAndSwapOutcome::Updated
			},
			Some(_) => CompareAndSwapOutcome::Mismatch,
			None => CompareAndSwapOutcome::Missing,
		}
	}

	fn query_now(
		map: StoreMap,
		collection: &str,
		filter: &FieldFilter,
		limit: Option<usize>,
	) -> Vec<Document> {
		let guard = map.read();
		let Some(docs) = guard.get(collection) else {
			return Vec::new();
		};

		docs.iter()
			.filter(|(_, fields)| filter.matches(fields))
			.take(limit.unwrap_or(usize::MAX))
			.map(|(id, fields)| Document::new(id.as_str(), fields.clone()))
			.collect()
	}
}
impl DocumentStore for MemoryStore {
	fn get<'a>(&'a self, collection: &'a str, id: &'a str) -> StoreFuture<'a, Option<Document>> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::get_now(map, collection, id)) })
	}

	fn set<'a>(&'a self, collection: &'a str, document: Document) -> StoreFuture<'a, ()> {
		let map = self.0.clone();

		Box::pin(async move {
			Self::set_now(map, collection, document);

			Ok(())
		})
	}

	fn update<'a>(
		&'a self,
		collection: &'a str,
		id: &'a str,
		fields: Fields,
	) -> StoreFuture<'a, UpdateOutcome> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::update_now(map, collection, id, fields)) })
	}

	fn compare_and_update<'a>(
		&'a self,
		collection: &'a str,
		id: &'a str,
		expected: &'a FieldFilter,
		fields: Fields,
	) -> StoreFuture<'a, CompareAndSwapOutcome> {
		let map = self.0.clone();

		Box::pin(async move { Ok(Self::cas_now(map, collection, id, expected, fields)) })
	}

	fn query<'a>(
		&'a self,
		collection: &'a str,
		filter: &'a FieldFilter,
		limit: Option<usize>,
	) -> StoreFuture<'a, DocumentCursor<'a>> {
		let map = self.0.clone();

		Box::pin(async move {
			let documents = Self::query_now(map, collection, filter, limit);
			let cursor: DocumentCursor<'a> = Box::pin(stream::iter(documents.into_iter().map(Ok)));

			Ok(cursor)
		})
	}
}
