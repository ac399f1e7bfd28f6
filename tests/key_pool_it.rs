mod common;

// std
use std::sync::{Arc, atomic::Ordering};
// crates.io
use time::macros::datetime;
// self
use common::{FlakyStore, TOKENS, key, seed_token, token};
use filing_broker::{
	error::Error,
	model::KeyStatus,
	pool::{KeyPool, MarkOutcome, ResetReport},
	store::{DocumentStore, MemoryStore},
};

#[tokio::test]
async fn list_then_mark_hands_out_the_same_keys_until_marked() {
	let store = Arc::new(MemoryStore::default());

	for id in ["k1", "k2", "k3"] {
		seed_token(store.as_ref(), id, KeyStatus::Available, None).await;
	}

	let pool = KeyPool::with_collection(store.clone(), TOKENS);
	let first = pool.list_available(2).await.expect("Listing should succeed.");
	let second = pool.list_available(2).await.expect("Listing should succeed.");

	assert_eq!(first, [key("k1"), key("k2")]);
	assert_eq!(second, first);

	let outcome = pool.mark_used(first.iter().map(|id| id.as_str())).await;

	assert_eq!(outcome, MarkOutcome { requested: 2, updated: 2 });
	assert_eq!(pool.list_available(2).await.expect("Listing should succeed."), [key("k3")]);
	assert_eq!(pool.count_available().await.expect("Counting should succeed."), 1);

	let marked = token(store.as_ref(), "k1").await;

	assert_eq!(marked.status, KeyStatus::Used);
	assert!(marked.last_modified.is_some());
}

#[tokio::test]
async fn query_failures_surface_but_bad_records_are_skipped() {
	let store = Arc::new(FlakyStore::default());

	seed_token(store.as_ref(), "k1", KeyStatus::Available, None).await;

	let pool = KeyPool::new(store.clone());

	store.poison_cursor.store(true, Ordering::SeqCst);

	assert_eq!(pool.list_available(5).await.expect("Listing should skip bad items."), [key("k1")]);
	assert_eq!(pool.count_available().await.expect("Counting should skip bad items."), 1);

	store.fail_query.store(true, Ordering::SeqCst);

	assert!(matches!(pool.list_available(5).await, Err(Error::Storage(_))));
	assert!(matches!(pool.count_available().await, Err(Error::Storage(_))));
	assert!(matches!(pool.lease(1).await, Err(Error::Storage(_))));
}

#[tokio::test]
async fn mark_continues_past_failed_records() {
	let store = Arc::new(FlakyStore::default());

	for id in ["k1", "k2", "k3"] {
		seed_token(store.as_ref(), id, KeyStatus::Available, None).await;
	}

	store.fail_writes_for("k2");

	let pool = KeyPool::new(store.clone());
	let outcome = pool.mark_used(["k1", "k2", "k3", ""]).await;

	assert_eq!(outcome, MarkOutcome { requested: 4, updated: 2 });
	assert_eq!(token(store.as_ref(), "k1").await.status, KeyStatus::Used);
	assert_eq!(token(store.as_ref(), "k2").await.status, KeyStatus::Available);
	assert_eq!(token(store.as_ref(), "k3").await.status, KeyStatus::Used);
}

#[tokio::test]
async fn reset_is_per_calendar_day_and_idempotent() {
	let store = Arc::new(FlakyStore::default());
	let now = datetime!(2025-11-11 00:01 -05:00);

	seed_token(store.as_ref(), "yesterday", KeyStatus::Used, Some(datetime!(2025-11-10 12:00 -05:00)))
		.await;
	seed_token(store.as_ref(), "today", KeyStatus::Used, Some(datetime!(2025-11-11 05:00:30 UTC)))
		.await;
	seed_token(store.as_ref(), "stuck", KeyStatus::Used, Some(datetime!(2025-11-01 00:00 UTC))).await;
	seed_token(store.as_ref(), "free", KeyStatus::Available, None).await;
	store.fail_writes_for("stuck");

	let pool = KeyPool::new(store.clone());
	let report = pool.reset_stale(now).await.expect("Sweep should succeed.");

	assert_eq!(report, ResetReport { scanned: 3, reset: 1, skipped: 1 });

	let reset = token(store.as_ref(), "yesterday").await;

	assert_eq!(reset.status, KeyStatus::Available);
	assert_eq!(reset.last_modified, Some(now));
	assert_eq!(token(store.as_ref(), "today").await.status, KeyStatus::Used);
	assert_eq!(token(store.as_ref(), "stuck").await.status, KeyStatus::Used);

	let again = pool.reset_stale(now).await.expect("Second sweep should succeed.");

	assert_eq!(again.reset, 0);
	assert_eq!(pool.count_available().await.expect("Counting should succeed."), 2);
}

#[tokio::test]
async fn concurrent_leases_never_share_a_key() {
	let store = Arc::new(MemoryStore::default());

	for index in 0..6 {
		seed_token(store.as_ref(), &format!("k{index}"), KeyStatus::Available, None).await;
	}

	let pool = KeyPool::new(store.clone());
	let (left, right) = tokio::join!(pool.lease(4), pool.lease(4));
	let mut all = left.expect("Left lease should succeed.");

	all.extend(right.expect("Right lease should succeed."));

	let total = all.len();

	all.sort();
	all.dedup();

	assert_eq!(all.len(), total);
	assert!(total <= 6);
	assert_eq!(pool.count_available().await.expect("Counting should succeed."), 6 - total);

	for id in &all {
		assert_eq!(token(store.as_ref(), id.as_str()).await.status, KeyStatus::Used);
	}
}

#[tokio::test]
async fn zero_counts_touch_nothing() {
	let store = Arc::new(MemoryStore::default());

	seed_token(store.as_ref(), "k1", KeyStatus::Available, None).await;

	let pool = KeyPool::new(store.clone() as Arc<dyn DocumentStore>);

	assert!(pool.list_available(0).await.expect("Listing should succeed.").is_empty());
	assert!(pool.lease(0).await.expect("Leasing should succeed.").is_empty());
	assert_eq!(token(store.as_ref(), "k1").await.status, KeyStatus::Available);
}
