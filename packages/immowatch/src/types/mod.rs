//! Core data types for planning, persistence, and run accounting.

pub mod batch;
pub mod config;
pub mod decision;
pub mod execution;
pub mod listing;

pub use batch::{Batch, BatchPriority};
pub use config::RecrawlConfig;
pub use decision::{Decision, DecisionKind};
pub use execution::{
    ExecutionMetadata, ExecutionStatus, PlanSummary, UpsertError, UpsertOutcome,
};
pub use listing::{ExtraValue, ListingRecord, NormalizedListing, RawListing};
