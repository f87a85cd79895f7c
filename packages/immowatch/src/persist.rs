//! Idempotent persistence of fetched listings.
//!
//! One call is one store transaction. Error-marker rows are counted as
//! failed without touching storage; normalization problems degrade to
//! per-row failures; a transaction-level failure reports every input row
//! as failed so the caller can retry the whole batch.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use crate::normalize::normalize_listing;
use crate::traits::ListingStore;
use crate::types::{NormalizedListing, RawListing, UpsertError, UpsertOutcome};

/// Writes fetch results through the store, keyed by url.
pub struct ListingPersister {
    store: Arc<dyn ListingStore>,
}

impl ListingPersister {
    pub fn new(store: Arc<dyn ListingStore>) -> Self {
        Self { store }
    }

    /// Upsert fetched results for a city.
    ///
    /// Idempotent in row count (unique key on url) but not in
    /// `check_count`, which increments on every successful call — it
    /// measures re-check frequency.
    pub async fn upsert_with_deduplication(
        &self,
        results: &[RawListing],
        city: &str,
        execution_id: Uuid,
        now: DateTime<Utc>,
    ) -> UpsertOutcome {
        let mut outcome = UpsertOutcome::default();
        let mut to_write: Vec<NormalizedListing> = Vec::with_capacity(results.len());

        for raw in results {
            if let Some(error) = &raw.error {
                // Failed fetch: counted, never written. Retry state is
                // recorded separately by the run loop.
                outcome.failed += 1;
                outcome.errors.push(UpsertError {
                    url: raw.url.clone(),
                    message: error.clone(),
                });
                continue;
            }

            match normalize_listing(raw) {
                Ok(normalized) => to_write.push(normalized),
                Err(e) => {
                    warn!(url = %raw.url, error = %e, "Skipping invalid listing");
                    outcome.failed += 1;
                    outcome.errors.push(UpsertError {
                        url: raw.url.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        if !to_write.is_empty() {
            match self.store.upsert_listings(&to_write, city, now).await {
                Ok(stats) => {
                    outcome.new += stats.new;
                    outcome.updated += stats.updated;
                    outcome.failed += stats.errors.len();
                    outcome.errors.extend(stats.errors);
                }
                Err(e) => {
                    // Lost transaction: every row in this call failed.
                    warn!(city, execution_id = %execution_id, error = %e, "Upsert transaction failed");
                    let message = e.to_string();
                    outcome.failed += to_write.len();
                    outcome
                        .errors
                        .extend(to_write.iter().map(|l| UpsertError {
                            url: l.url.clone(),
                            message: message.clone(),
                        }));
                }
            }
        }

        info!(
            city,
            execution_id = %execution_id,
            new = outcome.new,
            updated = outcome.updated,
            skipped = outcome.skipped,
            failed = outcome.failed,
            "Upsert completed"
        );

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stores::MemoryStore;
    use crate::testing::sample_raw_listing;

    #[tokio::test]
    async fn error_marker_rows_fail_without_touching_storage() {
        let store = Arc::new(MemoryStore::new());
        let persister = ListingPersister::new(store.clone());

        let results = vec![
            sample_raw_listing("https://example.com/1"),
            RawListing::failed("https://example.com/2", "timeout"),
        ];
        let outcome = persister
            .upsert_with_deduplication(&results, "berlin", Uuid::new_v4(), Utc::now())
            .await;

        assert_eq!(outcome.new, 1);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.errors.len(), 1);
        assert_eq!(outcome.errors[0].url, "https://example.com/2");
        assert!(store
            .get_listing("https://example.com/2")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn invalid_rows_do_not_abort_the_call() {
        let store = Arc::new(MemoryStore::new());
        let persister = ListingPersister::new(store);

        let results = vec![RawListing::new(""), sample_raw_listing("https://example.com/1")];
        let outcome = persister
            .upsert_with_deduplication(&results, "berlin", Uuid::new_v4(), Utc::now())
            .await;

        assert_eq!(outcome.new, 1);
        assert_eq!(outcome.failed, 1);
    }
}
