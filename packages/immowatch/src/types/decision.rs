//! Per-url re-scrape decisions. Derived, never persisted.

use serde::{Deserialize, Serialize};

/// What to do with a candidate url this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DecisionKind {
    /// No usable history: never seen, never checked, or tombstoned
    /// (the site may have re-listed it).
    ProcessNew,
    /// Last successful check is older than the staleness threshold.
    ProcessStale,
    /// Last fetch failed and the retry delay has elapsed.
    ProcessRetry,
    /// Checked recently (or still inside the retry delay). Nothing to do.
    SkipRecent,
    /// Failed too many times in a row; terminal until its data changes.
    SkipFailedRetryLimit,
}

impl DecisionKind {
    /// Whether this kind materializes into fetch work.
    pub fn is_process(&self) -> bool {
        matches!(
            self,
            DecisionKind::ProcessNew | DecisionKind::ProcessStale | DecisionKind::ProcessRetry
        )
    }
}

/// Classification result for one candidate url.
#[derive(Debug, Clone)]
pub struct Decision {
    pub url: String,
    pub kind: DecisionKind,
    /// Human-readable reason, logged for observability.
    pub reason: String,
    /// Hours since the last check, when history exists.
    pub staleness_hours: Option<f64>,
    /// Retry count carried from the stored row (0 for unseen urls).
    pub retry_count: i64,
}

impl Decision {
    pub fn is_process(&self) -> bool {
        self.kind.is_process()
    }
}
