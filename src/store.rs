//! Document-store contracts and built-in store implementations for key tokens and filing records.
//!
//! The broker only needs a narrow slice of a document database: get/set by id, field merges,
//! a conditional merge used for atomic status transitions, and equality queries that yield a lazy
//! cursor. Each cursor item is a separate `Result` so callers can skip a single unreadable record
//! without abandoning the whole scan.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// crates.io
use futures_util::stream::Stream;
use serde_json::{Map, Value};
// self
use crate::_prelude::*;

/// Field map carried by a [`Document`].
pub type Fields = Map<String, Value>;

/// Boxed future returned by [`DocumentStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Lazy cursor over query results; every record is yielded (or fails) independently.
pub type DocumentCursor<'a> =
	Pin<Box<dyn Stream<Item = Result<Document, StoreError>> + 'a + Send>>;

/// Storage backend contract implemented by broker document stores.
pub trait DocumentStore
where
	Self: Send + Sync,
{
	/// Fetches the document stored under `id`, if present.
	fn get<'a>(&'a self, collection: &'a str, id: &'a str) -> StoreFuture<'a, Option<Document>>;

	/// Persists or fully replaces a document.
	fn set<'a>(&'a self, collection: &'a str, document: Document) -> StoreFuture<'a, ()>;

	/// Merges `fields` into an existing document; missing documents are reported, not created.
	fn update<'a>(
		&'a self,
		collection: &'a str,
		id: &'a str,
		fields: Fields,
	) -> StoreFuture<'a, UpdateOutcome>;

	/// Merges `fields` only if the stored document still matches `expected`.
	fn compare_and_update<'a>(
		&'a self,
		collection: &'a str,
		id: &'a str,
		expected: &'a FieldFilter,
		fields: Fields,
	) -> StoreFuture<'a, CompareAndSwapOutcome>;

	/// Opens a cursor over documents matching `filter`, yielding at most `limit` records.
	fn query<'a>(
		&'a self,
		collection: &'a str,
		filter: &'a FieldFilter,
		limit: Option<usize>,
	) -> StoreFuture<'a, DocumentCursor<'a>>;
}

/// A stored document: its id plus a JSON field map.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Document {
	/// Document identifier, unique within a collection.
	pub id: String,
	/// Document payload.
	pub fields: Fields,
}
impl Document {
	/// Creates a document from its id and fields.
	pub fn new(id: impl Into<String>, fields: Fields) -> Self {
		Self { id: id.into(), fields }
	}

	/// Returns the value stored under `name`, if any.
	pub fn field(&self, name: &str) -> Option<&Value> {
		self.fields.get(name)
	}

	/// Returns `true` if the document satisfies the equality filter.
	pub fn matches(&self, filter: &FieldFilter) -> bool {
		filter.matches(&self.fields)
	}
}

/// Equality filter over a single top-level field.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldFilter {
	/// Field name to compare.
	pub field: String,
	/// Value the field must equal.
	pub value: Value,
}
impl FieldFilter {
	/// Builds a `field == value` filter.
	pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
		Self { field: field.into(), value: value.into() }
	}

	/// Evaluates the filter against a raw field map.
	pub fn matches(&self, fields: &Fields) -> bool {
		fields.get(&self.field) == Some(&self.value)
	}
}

/// Result of a field merge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateOutcome {
	/// The document existed and was updated.
	Updated,
	/// No document matched the id.
	Missing,
}

/// Result of a conditional field merge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareAndSwapOutcome {
	/// The document matched the expectation and was updated.
	Updated,
	/// The document exists but no longer matches the expectation.
	Mismatch,
	/// No document matched the id.
	Missing,
}

/// Error type produced by [`DocumentStore`] implementations and record decoding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
	/// A stored record could not be decoded into its domain type.
	#[error("Document `{id}` is malformed: {message}.")]
	Malformed {
		/// Offending document id.
		id: String,
		/// Human-readable error payload.
		message: String,
	},
}
impl StoreError {
	/// Builds a [`StoreError::Malformed`] for the provided document id.
	pub fn malformed(id: impl Into<String>, message: impl Into<String>) -> Self {
		Self::Malformed { id: id.into(), message: message.into() }
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::error::Error as StdError;
	// crates.io
	use serde_json::json;
	// self
	use super::*;
	use crate::error::Error;

	#[test]
	fn store_error_converts_into_broker_error_with_source() {
		let store_error = StoreError::Backend { message: "database unreachable".into() };
		let broker_error: Error = store_error.clone().into();

		assert!(matches!(broker_error, Error::Storage(_)));
		assert!(broker_error.to_string().contains("database unreachable"));

		let source = StdError::source(&broker_error)
			.expect("Broker error should expose the original store error as its source.");

		assert_eq!(source.to_string(), store_error.to_string());
	}

	#[test]
	fn field_filter_compares_exact_values() {
		let mut fields = Fields::new();

		fields.insert("status".into(), json!("available"));

		let document = Document::new("key-1", fields);

		assert!(document.matches(&FieldFilter::eq("status", "available")));
		assert!(!document.matches(&FieldFilter::eq("status", "used")));
		assert!(!document.matches(&FieldFilter::eq("missing", "available")));
	}

	#[test]
	fn compare_and_swap_outcome_can_be_serialized() {
		let payload = serde_json::to_string(&CompareAndSwapOutcome::Mismatch)
			.expect("CompareAndSwapOutcome should serialize to JSON.");

		assert_eq!(payload, "\"Mismatch\"");
	}
}
