// crates.io
use futures_util::TryStreamExt;
use serde_json::json;
// self
use filing_broker::store::{
	CompareAndSwapOutcome, Document, DocumentStore, FieldFilter, Fields, MemoryStore,
	UpdateOutcome,
};

fn fields(value: serde_json::Value) -> Fields {
	value.as_object().cloned().expect("Field fixture should be a JSON object.")
}

#[tokio::test]
async fn set_overwrites_and_update_merges() {
	let store = MemoryStore::default();

	store
		.set("financialReports", Document::new("F1", fields(json!({ "ticker": "OLD", "formType": "10-K" }))))
		.await
		.expect("Saving the first document should succeed.");
	store
		.set("financialReports", Document::new("F1", fields(json!({ "ticker": "NEW" }))))
		.await
		.expect("Overwriting the document should succeed.");

	let stored = store
		.get("financialReports", "F1")
		.await
		.expect("Fetching the document should succeed.")
		.expect("Document should exist.");

	assert_eq!(stored.field("ticker"), Some(&json!("NEW")));
	assert_eq!(stored.field("formType"), None);

	let outcome = store
		.update("financialReports", "F1", fields(json!({ "formType": "8-K" })))
		.await
		.expect("Merging fields should succeed.");
	let merged = store
		.get("financialReports", "F1")
		.await
		.expect("Fetching the document should succeed.")
		.expect("Document should exist.");

	assert_eq!(outcome, UpdateOutcome::Updated);
	assert_eq!(merged.field("ticker"), Some(&json!("NEW")));
	assert_eq!(merged.field("formType"), Some(&json!("8-K")));
}

#[tokio::test]
async fn update_never_creates_documents() {
	let store = MemoryStore::default();
	let outcome = store
		.update("tokens", "ghost", fields(json!({ "status": "used" })))
		.await
		.expect("Update should report instead of failing.");

	assert_eq!(outcome, UpdateOutcome::Missing);
	assert!(store.is_empty("tokens"));
}

#[tokio::test]
async fn cas_success_mismatch_and_missing() {
	let store = MemoryStore::default();
	let available = FieldFilter::eq("status", "available");

	store
		.set("tokens", Document::new("k1", fields(json!({ "status": "available" }))))
		.await
		.expect("Seeding the token should succeed.");

	let first = store
		.compare_and_update("tokens", "k1", &available, fields(json!({ "status": "used" })))
		.await
		.expect("First CAS should run.");
	let second = store
		.compare_and_update("tokens", "k1", &available, fields(json!({ "status": "used" })))
		.await
		.expect("Second CAS should run.");
	let missing = store
		.compare_and_update("tokens", "k2", &available, fields(json!({ "status": "used" })))
		.await
		.expect("CAS on a missing document should run.");

	assert_eq!(first, CompareAndSwapOutcome::Updated);
	assert_eq!(second, CompareAndSwapOutcome::Mismatch);
	assert_eq!(missing, CompareAndSwapOutcome::Missing);
}

#[tokio::test]
async fn query_scopes_by_collection() {
	let store = MemoryStore::default();
	let used = FieldFilter::eq("status", "used");

	store
		.set("tokens", Document::new("k1", fields(json!({ "status": "used" }))))
		.await
		.expect("Seeding the token should succeed.");
	store
		.set("other", Document::new("k2", fields(json!({ "status": "used" }))))
		.await
		.expect("Seeding the other collection should succeed.");

	let documents: Vec<Document> = store
		.query("tokens", &used, None)
		.await
		.expect("Query should open.")
		.try_collect()
		.await
		.expect("Memory cursors never fail.");

	assert_eq!(documents.len(), 1);
	assert_eq!(documents[0].id, "k1");

	let none: Vec<Document> = store
		.query("unknown", &used, None)
		.await
		.expect("Query should open.")
		.try_collect()
		.await
		.expect("Memory cursors never fail.");

	assert!(none.is_empty());
}
