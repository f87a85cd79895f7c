//! Work batches handed to the fetch collaborator. Transient: created per
//! planning call, discarded after execution.

use uuid::Uuid;

/// Cross-batch priority. New listings outrank retries, retries outrank
/// merely stale rows; the ordering is enforced in the planner only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum BatchPriority {
    High,
    Medium,
    Low,
}

impl BatchPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchPriority::High => "high",
            BatchPriority::Medium => "medium",
            BatchPriority::Low => "low",
        }
    }
}

/// A bounded, ordered slice of urls processed as one unit of work.
#[derive(Debug, Clone)]
pub struct Batch {
    pub id: Uuid,
    /// Ordered urls, at most `batch_size` of them.
    pub urls: Vec<String>,
    pub priority: BatchPriority,
    pub city: String,
    /// `urls.len() * historical seconds-per-url`.
    pub estimated_duration_seconds: f64,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }
}
