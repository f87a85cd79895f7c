//! Fetch collaborator interface. The actual HTTP/browser automation lives
//! outside this crate; [`MockScraper`](crate::testing::MockScraper) covers
//! tests.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::RawListing;

/// Discovers and fetches listing pages for a city.
#[async_trait]
pub trait ListingScraper: Send + Sync {
    /// All currently advertised listing urls for a city.
    async fn discover_urls(&self, city: &str) -> Result<Vec<String>>;

    /// Fetch one detail page. A transient failure may surface either as
    /// an `Err` or as a [`RawListing`] carrying an error marker; the run
    /// loop treats both the same way.
    async fn fetch_detail(&self, url: &str) -> Result<RawListing>;
}
