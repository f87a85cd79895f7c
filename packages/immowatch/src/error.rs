//! Typed errors for the re-scrape engine.
//!
//! Uses `thiserror` for library errors (not `anyhow`) so callers can match
//! on the failure class: per-row problems are recovered locally and
//! aggregated into an [`UpsertOutcome`](crate::types::UpsertOutcome), while
//! transaction-level and configuration errors propagate.

use thiserror::Error;

/// Errors that can occur during planning and persistence.
#[derive(Debug, Error)]
pub enum ImmowatchError {
    /// A single listing failed validation (missing url, unusable payload).
    /// Logged and counted as failed; never aborts a batch.
    #[error("validation failed for {url}: {reason}")]
    Validation { url: String, reason: String },

    /// The fetch collaborator reported a transient failure for one url.
    #[error("fetch failed for {url}: {reason}")]
    Fetch { url: String, reason: String },

    /// Storage operation failed at the transaction level. The whole upsert
    /// call reports every input row as failed and the caller retries the
    /// batch.
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The distributed lock collaborator failed (not a contended lock —
    /// a contended lock is a normal `false` from `acquire`).
    #[error("work lock error: {0}")]
    Lock(String),

    /// Invalid staleness/retry/batch settings. Fails fast at construction.
    #[error("config error: {0}")]
    Config(String),

    /// JSON handling of the extra-attributes side map failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<sqlx::Error> for ImmowatchError {
    fn from(e: sqlx::Error) -> Self {
        ImmowatchError::Storage(Box::new(e))
    }
}

/// Convenience result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, ImmowatchError>;
