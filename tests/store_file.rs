// crates.io
use serde_json::json;
// self
use filing_broker::store::{
	CompareAndSwapOutcome, Document, DocumentStore, FieldFilter, FileStore, StoreError,
};

#[tokio::test]
async fn documents_survive_reopen() {
	let dir = tempfile::tempdir().expect("Temp dir should be created.");
	let path = dir.path().join("nested").join("documents.json");

	{
		let store = FileStore::open(&path).expect("Store should open on a fresh path.");
		let mut fields = serde_json::Map::new();

		fields.insert("status".into(), json!("available"));
		store
			.set("tokens", Document::new("k1", fields))
			.await
			.expect("Saving the token should succeed.");

		let mut patch = serde_json::Map::new();

		patch.insert("status".into(), json!("used"));

		let outcome = store
			.compare_and_update("tokens", "k1", &FieldFilter::eq("status", "available"), patch)
			.await
			.expect("CAS should run.");

		assert_eq!(outcome, CompareAndSwapOutcome::Updated);
	}

	let reopened = FileStore::open(&path).expect("Store should reopen from its snapshot.");
	let document = reopened
		.get("tokens", "k1")
		.await
		.expect("Lookup should succeed.")
		.expect("Token should persist.");

	assert_eq!(reopened.path(), path.as_path());
	assert_eq!(document.field("status"), Some(&json!("used")));
	assert!(!path.with_extension("tmp").exists());
}

#[test]
fn corrupt_snapshots_are_reported() {
	let dir = tempfile::tempdir().expect("Temp dir should be created.");
	let path = dir.path().join("documents.json");

	std::fs::write(&path, b"{ not json").expect("Corrupt fixture should be written.");

	let err = FileStore::open(&path).expect_err("Corrupt snapshot must be rejected.");

	assert!(matches!(err, StoreError::Serialization { .. }));
}
