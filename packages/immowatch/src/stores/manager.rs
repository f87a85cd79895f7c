//! Process-local store registry.
//!
//! One [`SqliteListingStore`] per database path, created under a mutex so
//! connection setup to the same file is never concurrent. The manager is
//! owned by the application root and handed down explicitly — there is no
//! ambient global registry.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::info;

use crate::error::Result;
use crate::stores::SqliteListingStore;

/// Registry of open stores keyed by connection URL.
#[derive(Default)]
pub struct StoreManager {
    stores: Mutex<HashMap<String, Arc<SqliteListingStore>>>,
}

impl StoreManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the store for `database_url`, opening it on first use.
    ///
    /// Holding the registry mutex across creation serializes connection
    /// setup; this is a resource-safety measure for the embedded engine,
    /// not a performance optimization.
    pub async fn open(&self, database_url: &str) -> Result<Arc<SqliteListingStore>> {
        let mut stores = self.stores.lock().await;

        if let Some(store) = stores.get(database_url) {
            return Ok(store.clone());
        }

        info!(database_url, "Opening listing store");
        let store = Arc::new(SqliteListingStore::new(database_url).await?);
        stores.insert(database_url.to_string(), store.clone());
        Ok(store)
    }

    /// Number of open stores.
    pub async fn open_count(&self) -> usize {
        self.stores.lock().await.len()
    }
}
