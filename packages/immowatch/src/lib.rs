//! Incremental re-scrape planning and idempotent persistence for a large,
//! slowly-changing catalog of real-estate listing urls.
//!
//! Re-fetching everything on every run wastes budget and risks
//! rate-limiting; never re-fetching misses updates. This crate decides
//! which candidate urls must be (re)fetched now, in what priority order
//! and batch size, then durably records fetch outcomes without creating
//! duplicates — tracking a derived quality score per listing and
//! run-level statistics that size future batches.
//!
//! The actual page fetching, CLI, reporting, and cluster-wide locking are
//! external collaborators behind traits.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use immowatch::{RecrawlConfig, RecrawlEngine, StoreManager};
//! use tokio_util::sync::CancellationToken;
//!
//! let manager = StoreManager::new();
//! let store = manager.open("sqlite://./listings.db?mode=rwc").await?;
//! let engine = RecrawlEngine::new(store, scraper, lock, RecrawlConfig::default())?;
//!
//! let plan = engine.plan_execution("köln").await?;
//! let meta = engine.run("köln", CancellationToken::new()).await?;
//! ```
//!
//! # Modules
//!
//! - [`decision`] - Per-url classification (the one place with
//!   retry/staleness arithmetic)
//! - [`planner`] - Priority ordering and batching
//! - [`stats`] - Historical seconds-per-url estimation
//! - [`persist`] - Idempotent upserts with quality scoring
//! - [`stores`] - Storage backends (SQLite, in-memory) and the registry
//! - [`traits`] - Seams for storage and external collaborators
//! - [`testing`] - Mock collaborators for tests

pub mod decision;
pub mod engine;
pub mod error;
pub mod normalize;
pub mod persist;
pub mod planner;
pub mod quality;
pub mod stats;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core surface at crate root
pub use decision::{classify, DecisionEngine};
pub use engine::RecrawlEngine;
pub use error::{ImmowatchError, Result};
pub use persist::ListingPersister;
pub use planner::BatchPlanner;
pub use quality::quality_score;
pub use stats::estimate_seconds_per_url;
pub use stores::{MemoryStore, SqliteListingStore, StoreManager};
pub use traits::{ListingScraper, ListingStore, WorkLock};
pub use types::{
    Batch, BatchPriority, Decision, DecisionKind, ExecutionMetadata, ExecutionStatus,
    ExtraValue, ListingRecord, NormalizedListing, PlanSummary, RawListing, RecrawlConfig,
    UpsertError, UpsertOutcome,
};
