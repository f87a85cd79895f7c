//! Trait seams: storage backend and external collaborators.

pub mod lock;
pub mod scraper;
pub mod store;

pub use lock::WorkLock;
pub use scraper::ListingScraper;
pub use store::{ListingStore, StoreUpsertStats};
