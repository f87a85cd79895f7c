//! Run-level accounting: execution metadata rows, upsert outcomes, and
//! planning summaries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle state of a scraping execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    Running,
    Completed,
    Cancelled,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionStatus::Running => "running",
            ExecutionStatus::Completed => "completed",
            ExecutionStatus::Cancelled => "cancelled",
            ExecutionStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "completed" => ExecutionStatus::Completed,
            "cancelled" => ExecutionStatus::Cancelled,
            "failed" => ExecutionStatus::Failed,
            _ => ExecutionStatus::Running,
        }
    }
}

/// One row per run. Append-mostly; read back by the statistics estimator
/// to size future batches and by external reporting.
#[derive(Debug, Clone)]
pub struct ExecutionMetadata {
    pub execution_id: Uuid,
    pub city: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub status: ExecutionStatus,
    pub listings_processed: i64,
    pub listings_new: i64,
    pub listings_updated: i64,
    pub listings_skipped: i64,
    pub listings_failed: i64,
    pub execution_time_seconds: f64,
}

impl ExecutionMetadata {
    /// A freshly started run for `city`.
    pub fn started(city: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            execution_id: Uuid::new_v4(),
            city: city.into(),
            started_at: now,
            completed_at: None,
            status: ExecutionStatus::Running,
            listings_processed: 0,
            listings_new: 0,
            listings_updated: 0,
            listings_skipped: 0,
            listings_failed: 0,
            execution_time_seconds: 0.0,
        }
    }
}

/// One failed input row inside an upsert call.
#[derive(Debug, Clone)]
pub struct UpsertError {
    pub url: String,
    pub message: String,
}

/// Aggregate result of one `upsert_with_deduplication` call.
///
/// Per-row failures land in `errors` without aborting the call; a
/// transaction-level failure reports every input row here instead.
#[derive(Debug, Clone, Default)]
pub struct UpsertOutcome {
    pub new: usize,
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
    pub errors: Vec<UpsertError>,
}

impl UpsertOutcome {
    pub fn processed(&self) -> usize {
        self.new + self.updated
    }
}

/// Decision counts for a candidate url set, before batching.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanSummary {
    pub total_urls: usize,
    pub new_urls: usize,
    pub stale_urls: usize,
    pub retry_urls: usize,
    /// Both skip kinds: recently checked and retry-limit exhausted.
    pub skip_urls: usize,
}
