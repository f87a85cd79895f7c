//! Storage implementations.

pub mod manager;
pub mod memory;
pub mod sqlite;

pub use manager::StoreManager;
pub use memory::MemoryStore;
pub use sqlite::SqliteListingStore;
