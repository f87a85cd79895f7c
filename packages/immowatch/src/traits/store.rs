//! Storage trait for listing rows and execution metadata.
//!
//! Backends: [`SqliteListingStore`](crate::stores::SqliteListingStore) for
//! production, [`MemoryStore`](crate::stores::MemoryStore) for tests and
//! development.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::types::{ExecutionMetadata, ListingRecord, NormalizedListing, UpsertError};

/// Row-level result of a transactional upsert, before the caller folds in
/// error-marker rows.
#[derive(Debug, Clone, Default)]
pub struct StoreUpsertStats {
    pub new: usize,
    pub updated: usize,
    /// Per-row failures caught inside the transaction. They never abort
    /// the remaining rows.
    pub errors: Vec<UpsertError>,
}

/// Persistence operations used by planning and the run loop.
#[async_trait]
pub trait ListingStore: Send + Sync {
    /// Look up one listing by url.
    async fn get_listing(&self, url: &str) -> Result<Option<ListingRecord>>;

    /// Fetch all stored rows for a candidate url set in one indexed query
    /// (`url IN (...)`), avoiding N round trips during classification.
    async fn get_listings_by_urls(&self, urls: &[String]) -> Result<Vec<ListingRecord>>;

    /// Urls of all live (non-tombstoned) listings for a city.
    async fn live_urls(&self, city: &str) -> Result<HashSet<String>>;

    /// Upsert normalized listings in a single transaction.
    ///
    /// Live url → UPDATE: fetched fields overwritten, `check_count + 1`,
    /// quality recomputed, `retry_count = 0`, `last_error` and
    /// `deleted_ts` cleared. Anything else → INSERT with
    /// `check_count = 1`. A transaction-level error propagates; per-row
    /// errors are collected and the loop continues.
    async fn upsert_listings(
        &self,
        listings: &[NormalizedListing],
        city: &str,
        now: DateTime<Utc>,
    ) -> Result<StoreUpsertStats>;

    /// Record a failed fetch for an existing row: `retry_count + 1`,
    /// `last_error` and `last_check_ts` set. A url without a row is a
    /// no-op (there is no retry state to track yet).
    async fn record_failure(&self, url: &str, error: &str, now: DateTime<Utc>) -> Result<()>;

    /// Tombstone live listings for `city` that are absent from
    /// `seen_urls`. Returns the number of rows tombstoned. Rows are never
    /// physically deleted.
    async fn mark_missing(
        &self,
        city: &str,
        seen_urls: &HashSet<String>,
        now: DateTime<Utc>,
    ) -> Result<usize>;

    /// Upsert an execution row by `execution_id`.
    async fn record_execution(&self, meta: &ExecutionMetadata) -> Result<()>;

    /// Most-recent-first execution rows for a city.
    async fn execution_history(&self, city: &str, limit: usize)
        -> Result<Vec<ExecutionMetadata>>;

    /// Number of live listings for a city.
    async fn live_listing_count(&self, city: &str) -> Result<usize> {
        Ok(self.live_urls(city).await?.len())
    }
}
