//! Integration tests for the SQLite persistence layer: idempotence,
//! check/retry counters, tombstones, and execution metadata.

use std::collections::HashSet;

use chrono::{Duration, Utc};
use uuid::Uuid;

use immowatch::testing::sample_raw_listing;
use immowatch::{
    ExecutionMetadata, ExecutionStatus, ListingPersister, ListingStore, RawListing,
    SqliteListingStore,
};

async fn store() -> std::sync::Arc<SqliteListingStore> {
    std::sync::Arc::new(SqliteListingStore::in_memory().await.unwrap())
}

#[tokio::test]
async fn upserting_the_same_fetch_twice_keeps_one_row() {
    let store = store().await;
    let persister = ListingPersister::new(store.clone());
    let raw = vec![sample_raw_listing("https://example.com/expose/1")];

    let first = persister
        .upsert_with_deduplication(&raw, "köln", Uuid::new_v4(), Utc::now())
        .await;
    assert_eq!(first.new, 1);
    assert_eq!(first.updated, 0);

    let second = persister
        .upsert_with_deduplication(&raw, "köln", Uuid::new_v4(), Utc::now())
        .await;
    assert_eq!(second.new, 0);
    assert_eq!(second.updated, 1);

    let record = store
        .get_listing("https://example.com/expose/1")
        .await
        .unwrap()
        .expect("row exists");
    // One row, check_count incremented per call, healthy retry state.
    assert_eq!(record.check_count, 2);
    assert_eq!(record.retry_count, 0);
    assert!(record.last_error.is_none());
    assert_eq!(
        store.live_urls("köln").await.unwrap(),
        HashSet::from(["https://example.com/expose/1".to_string()])
    );
}

#[tokio::test]
async fn quality_score_is_persisted_and_bounded() {
    let store = store().await;
    let persister = ListingPersister::new(store.clone());

    // Full payload scores 1.0.
    let full = sample_raw_listing("https://example.com/full");
    // Title and address only score 0.40.
    let mut partial = RawListing::new("https://example.com/partial");
    partial.title = Some("Wohnung".into());
    partial.address = Some("Hauptstraße 1, 10115 Berlin".into());

    persister
        .upsert_with_deduplication(&[full, partial], "berlin", Uuid::new_v4(), Utc::now())
        .await;

    let full_row = store
        .get_listing("https://example.com/full")
        .await
        .unwrap()
        .unwrap();
    assert!((full_row.quality_score - 1.0).abs() < 1e-9);

    let partial_row = store
        .get_listing("https://example.com/partial")
        .await
        .unwrap()
        .unwrap();
    assert!((partial_row.quality_score - 0.40).abs() < 1e-9);
    assert_eq!(partial_row.postal_code.as_deref(), Some("10115"));
}

#[tokio::test]
async fn recorded_failure_sets_retry_state() {
    let store = store().await;
    let persister = ListingPersister::new(store.clone());

    persister
        .upsert_with_deduplication(
            &[sample_raw_listing("https://example.com/1")],
            "köln",
            Uuid::new_v4(),
            Utc::now(),
        )
        .await;

    store
        .record_failure("https://example.com/1", "timeout", Utc::now())
        .await
        .unwrap();

    let record = store
        .get_listing("https://example.com/1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.retry_count, 1);
    assert_eq!(record.last_error.as_deref(), Some("timeout"));

    // A later success resets the retry state.
    persister
        .upsert_with_deduplication(
            &[sample_raw_listing("https://example.com/1")],
            "köln",
            Uuid::new_v4(),
            Utc::now(),
        )
        .await;
    let record = store
        .get_listing("https://example.com/1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(record.retry_count, 0);
    assert!(record.last_error.is_none());
    assert_eq!(record.check_count, 2);
}

#[tokio::test]
async fn missing_listings_are_tombstoned_not_deleted() {
    let store = store().await;
    let persister = ListingPersister::new(store.clone());

    persister
        .upsert_with_deduplication(
            &[
                sample_raw_listing("https://example.com/1"),
                sample_raw_listing("https://example.com/2"),
            ],
            "köln",
            Uuid::new_v4(),
            Utc::now(),
        )
        .await;

    let seen: HashSet<String> = ["https://example.com/1".to_string()].into();
    let tombstoned = store.mark_missing("köln", &seen, Utc::now()).await.unwrap();
    assert_eq!(tombstoned, 1);

    let gone = store
        .get_listing("https://example.com/2")
        .await
        .unwrap()
        .unwrap();
    assert!(gone.deleted_ts.is_some());
    assert_eq!(store.live_urls("köln").await.unwrap().len(), 1);

    // A re-listed url revives the same row.
    let outcome = persister
        .upsert_with_deduplication(
            &[sample_raw_listing("https://example.com/2")],
            "köln",
            Uuid::new_v4(),
            Utc::now(),
        )
        .await;
    assert_eq!(outcome.new, 1);
    let revived = store
        .get_listing("https://example.com/2")
        .await
        .unwrap()
        .unwrap();
    assert!(revived.deleted_ts.is_none());
    assert_eq!(revived.check_count, 2);
}

#[tokio::test]
async fn batch_lookup_returns_only_known_urls() {
    let store = store().await;
    let persister = ListingPersister::new(store.clone());

    persister
        .upsert_with_deduplication(
            &[sample_raw_listing("https://example.com/1")],
            "köln",
            Uuid::new_v4(),
            Utc::now(),
        )
        .await;

    let rows = store
        .get_listings_by_urls(&[
            "https://example.com/1".to_string(),
            "https://example.com/unknown".to_string(),
        ])
        .await
        .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].url, "https://example.com/1");

    assert!(store.get_listings_by_urls(&[]).await.unwrap().is_empty());
}

#[tokio::test]
async fn batch_lookup_and_tombstoning_handle_large_url_sets() {
    // Well past one bind-parameter chunk, so the IN queries must split.
    let store = store().await;
    let persister = ListingPersister::new(store.clone());
    let raw: Vec<RawListing> = (0..1200)
        .map(|i| sample_raw_listing(&format!("https://example.com/expose/{i}")))
        .collect();

    let outcome = persister
        .upsert_with_deduplication(&raw, "köln", Uuid::new_v4(), Utc::now())
        .await;
    assert_eq!(outcome.new, 1200);

    let candidates: Vec<String> = (0..1500)
        .map(|i| format!("https://example.com/expose/{i}"))
        .collect();
    let rows = store.get_listings_by_urls(&candidates).await.unwrap();
    assert_eq!(rows.len(), 1200);

    let tombstoned = store
        .mark_missing("köln", &HashSet::new(), Utc::now())
        .await
        .unwrap();
    assert_eq!(tombstoned, 1200);
    assert!(store.live_urls("köln").await.unwrap().is_empty());
}

#[tokio::test]
async fn execution_rows_upsert_by_id_and_read_most_recent_first() {
    let store = store().await;
    let now = Utc::now();

    let mut older = ExecutionMetadata::started("köln", now - Duration::hours(2));
    older.status = ExecutionStatus::Completed;
    older.listings_processed = 50;
    older.execution_time_seconds = 100.0;
    store.record_execution(&older).await.unwrap();

    let mut newer = ExecutionMetadata::started("köln", now);
    store.record_execution(&newer).await.unwrap();

    // Finishing the run updates the same row.
    newer.status = ExecutionStatus::Completed;
    newer.completed_at = Some(now + Duration::minutes(5));
    newer.listings_processed = 80;
    newer.execution_time_seconds = 240.0;
    store.record_execution(&newer).await.unwrap();

    let history = store.execution_history("köln", 10).await.unwrap();
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].execution_id, newer.execution_id);
    assert_eq!(history[0].listings_processed, 80);
    assert_eq!(history[1].execution_id, older.execution_id);

    // Other cities see nothing.
    assert!(store.execution_history("berlin", 10).await.unwrap().is_empty());
}
