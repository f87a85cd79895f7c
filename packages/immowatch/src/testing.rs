//! Testing utilities including mock collaborators.
//!
//! Useful for testing orchestrators built on this crate without real
//! network calls or a lock service.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::{ImmowatchError, Result};
use crate::traits::{ListingScraper, WorkLock};
use crate::types::{ListingRecord, RawListing};

/// A scripted scraper for tests.
///
/// Returns configured urls per city and configured detail payloads per
/// url; unscripted urls come back as failed fetches.
#[derive(Default)]
pub struct MockScraper {
    discovered: RwLock<HashMap<String, Vec<String>>>,
    details: RwLock<HashMap<String, RawListing>>,
    fail_discovery: RwLock<HashSet<String>>,
}

impl MockScraper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script the discovery result for a city.
    pub fn with_discovered(self, city: impl Into<String>, urls: Vec<String>) -> Self {
        self.discovered.write().unwrap().insert(city.into(), urls);
        self
    }

    /// Script one detail page.
    pub fn with_detail(self, raw: RawListing) -> Self {
        self.details.write().unwrap().insert(raw.url.clone(), raw);
        self
    }

    /// Make discovery fail for a city.
    pub fn with_failing_discovery(self, city: impl Into<String>) -> Self {
        self.fail_discovery.write().unwrap().insert(city.into());
        self
    }
}

#[async_trait]
impl ListingScraper for MockScraper {
    async fn discover_urls(&self, city: &str) -> Result<Vec<String>> {
        if self.fail_discovery.read().unwrap().contains(city) {
            return Err(ImmowatchError::Fetch {
                url: city.to_string(),
                reason: "scripted discovery failure".into(),
            });
        }
        Ok(self
            .discovered
            .read()
            .unwrap()
            .get(city)
            .cloned()
            .unwrap_or_default())
    }

    async fn fetch_detail(&self, url: &str) -> Result<RawListing> {
        Ok(self
            .details
            .read()
            .unwrap()
            .get(url)
            .cloned()
            .unwrap_or_else(|| RawListing::failed(url, "not scripted")))
    }
}

/// A process-local lease lock for tests and single-node setups.
#[derive(Default)]
pub struct MemoryWorkLock {
    held: Arc<RwLock<HashSet<String>>>,
    /// Keys that always refuse to acquire, to simulate contention.
    contended: RwLock<HashSet<String>>,
}

impl MemoryWorkLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a key as held by another node.
    pub fn with_contended(self, key: impl Into<String>) -> Self {
        self.contended.write().unwrap().insert(key.into());
        self
    }

    pub fn is_held(&self, key: &str) -> bool {
        self.held.read().unwrap().contains(key)
    }
}

#[async_trait]
impl WorkLock for MemoryWorkLock {
    async fn acquire(&self, key: &str, _ttl_seconds: u64) -> Result<bool> {
        if self.contended.read().unwrap().contains(key) {
            return Ok(false);
        }
        Ok(self.held.write().unwrap().insert(key.to_string()))
    }

    async fn release(&self, key: &str) -> Result<()> {
        self.held.write().unwrap().remove(key);
        Ok(())
    }
}

/// A complete, parseable detail payload for `url`.
pub fn sample_raw_listing(url: &str) -> RawListing {
    let mut raw = RawListing::new(url);
    raw.title = Some("Helle 3-Zimmer-Wohnung mit Balkon".into());
    raw.address = Some("Gartenweg 4, 50667 Köln".into());
    raw.price = Some("289.000 €".into());
    raw.size = Some("78,5 m²".into());
    raw.rooms = Some("3".into());
    raw.year_built = Some("1978".into());
    raw.overview = Some("Ruhige Lage, frisch renoviert.".into());
    raw
}

/// A healthy stored row checked at `now`, for classification tests.
pub fn stored_listing(url: &str, city: &str, now: DateTime<Utc>) -> ListingRecord {
    ListingRecord {
        url: url.to_string(),
        city: city.to_string(),
        title: Some("Wohnung".into()),
        address: Some("Gartenweg 4, 50667 Köln".into()),
        postal_code: Some("50667".into()),
        price: Some(289_000.0),
        size: Some(78.5),
        rooms: Some(3.0),
        year_built: Some(1978),
        extra: Default::default(),
        last_check_ts: Some(now),
        check_count: 1,
        retry_count: 0,
        last_error: None,
        deleted_ts: None,
        quality_score: 1.0,
    }
}
