//! In-memory storage implementation for testing and development.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{ImmowatchError, Result};
use crate::traits::store::{ListingStore, StoreUpsertStats};
use crate::types::{ExecutionMetadata, ListingRecord, NormalizedListing};

/// In-memory listing store.
///
/// Useful for tests and development. Not suitable for production as data
/// is lost on restart.
pub struct MemoryStore {
    listings: RwLock<HashMap<String, ListingRecord>>,
    executions: RwLock<Vec<ExecutionMetadata>>,
    /// When set, the next upsert call fails at the transaction level
    /// (used to exercise the all-rows-failed path).
    fail_next_upsert: AtomicBool,
    /// When set, the next `record_failure` call fails (used to exercise
    /// the batch abort path).
    fail_next_failure_write: AtomicBool,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self {
            listings: RwLock::new(HashMap::new()),
            executions: RwLock::new(Vec::new()),
            fail_next_upsert: AtomicBool::new(false),
            fail_next_failure_write: AtomicBool::new(false),
        }
    }

    /// Make the next `upsert_listings` call fail like a lost connection.
    pub fn fail_next_upsert(&self) {
        self.fail_next_upsert.store(true, Ordering::SeqCst);
    }

    /// Make the next `record_failure` call fail like a lost connection.
    pub fn fail_next_failure_write(&self) {
        self.fail_next_failure_write.store(true, Ordering::SeqCst);
    }

    /// Number of stored listing rows (live and tombstoned).
    pub fn listing_count(&self) -> usize {
        self.listings.read().unwrap().len()
    }

    /// Seed a row directly, bypassing the upsert path.
    pub fn insert_record(&self, record: ListingRecord) {
        self.listings
            .write()
            .unwrap()
            .insert(record.url.clone(), record);
    }
}

#[async_trait]
impl ListingStore for MemoryStore {
    async fn get_listing(&self, url: &str) -> Result<Option<ListingRecord>> {
        Ok(self.listings.read().unwrap().get(url).cloned())
    }

    async fn get_listings_by_urls(&self, urls: &[String]) -> Result<Vec<ListingRecord>> {
        let listings = self.listings.read().unwrap();
        Ok(urls
            .iter()
            .filter_map(|url| listings.get(url).cloned())
            .collect())
    }

    async fn live_urls(&self, city: &str) -> Result<HashSet<String>> {
        Ok(self
            .listings
            .read()
            .unwrap()
            .values()
            .filter(|r| r.city == city && r.is_live())
            .map(|r| r.url.clone())
            .collect())
    }

    async fn upsert_listings(
        &self,
        listings: &[NormalizedListing],
        city: &str,
        now: DateTime<Utc>,
    ) -> Result<StoreUpsertStats> {
        if self.fail_next_upsert.swap(false, Ordering::SeqCst) {
            return Err(ImmowatchError::Storage("simulated lost connection".into()));
        }

        let mut stored = self.listings.write().unwrap();
        let mut stats = StoreUpsertStats::default();

        for listing in listings {
            match stored.get_mut(&listing.url) {
                Some(record) => {
                    let was_live = record.is_live();
                    record.city = city.to_string();
                    record.title = listing.title.clone();
                    record.address = listing.address.clone();
                    record.postal_code = listing.postal_code.clone();
                    record.price = listing.price;
                    record.size = listing.size;
                    record.rooms = listing.rooms;
                    record.year_built = listing.year_built;
                    record.extra = listing.extra.clone();
                    record.last_check_ts = Some(now);
                    record.check_count += 1;
                    record.retry_count = 0;
                    record.last_error = None;
                    record.deleted_ts = None;
                    record.quality_score = listing.quality_score;
                    if was_live {
                        stats.updated += 1;
                    } else {
                        // Revived tombstone: new from the caller's view.
                        stats.new += 1;
                    }
                }
                None => {
                    stored.insert(
                        listing.url.clone(),
                        ListingRecord {
                            url: listing.url.clone(),
                            city: city.to_string(),
                            title: listing.title.clone(),
                            address: listing.address.clone(),
                            postal_code: listing.postal_code.clone(),
                            price: listing.price,
                            size: listing.size,
                            rooms: listing.rooms,
                            year_built: listing.year_built,
                            extra: listing.extra.clone(),
                            last_check_ts: Some(now),
                            check_count: 1,
                            retry_count: 0,
                            last_error: None,
                            deleted_ts: None,
                            quality_score: listing.quality_score,
                        },
                    );
                    stats.new += 1;
                }
            }
        }

        Ok(stats)
    }

    async fn record_failure(&self, url: &str, error: &str, now: DateTime<Utc>) -> Result<()> {
        if self.fail_next_failure_write.swap(false, Ordering::SeqCst) {
            return Err(ImmowatchError::Storage("simulated lost connection".into()));
        }
        if let Some(record) = self.listings.write().unwrap().get_mut(url) {
            record.retry_count += 1;
            record.last_error = Some(error.to_string());
            record.last_check_ts = Some(now);
        }
        Ok(())
    }

    async fn mark_missing(
        &self,
        city: &str,
        seen_urls: &HashSet<String>,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        let mut stored = self.listings.write().unwrap();
        let mut tombstoned = 0;
        for record in stored.values_mut() {
            if record.city == city && record.is_live() && !seen_urls.contains(&record.url) {
                record.deleted_ts = Some(now);
                tombstoned += 1;
            }
        }
        Ok(tombstoned)
    }

    async fn record_execution(&self, meta: &ExecutionMetadata) -> Result<()> {
        let mut executions = self.executions.write().unwrap();
        match executions
            .iter_mut()
            .find(|m| m.execution_id == meta.execution_id)
        {
            Some(existing) => *existing = meta.clone(),
            None => executions.push(meta.clone()),
        }
        Ok(())
    }

    async fn execution_history(
        &self,
        city: &str,
        limit: usize,
    ) -> Result<Vec<ExecutionMetadata>> {
        let mut rows: Vec<ExecutionMetadata> = self
            .executions
            .read()
            .unwrap()
            .iter()
            .filter(|m| m.city == city)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        rows.truncate(limit);
        Ok(rows)
    }
}
