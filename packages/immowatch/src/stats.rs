//! Execution statistics estimator.
//!
//! Batch sizing uses historical seconds-per-url derived from completed
//! execution rows; cold starts and degenerate history fall back to a
//! fixed constant instead of dividing by zero.

use crate::types::{ExecutionMetadata, ExecutionStatus};

/// Mean `execution_time_seconds / listings_processed` over the given
/// rows, considering only completed executions that processed at least
/// one listing. Returns `fallback` when no row qualifies.
pub fn estimate_seconds_per_url(history: &[ExecutionMetadata], fallback: f64) -> f64 {
    let rates: Vec<f64> = history
        .iter()
        .filter(|m| m.status == ExecutionStatus::Completed && m.listings_processed > 0)
        .map(|m| m.execution_time_seconds / m.listings_processed as f64)
        .collect();

    if rates.is_empty() {
        return fallback;
    }
    rates.iter().sum::<f64>() / rates.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn execution(processed: i64, seconds: f64, status: ExecutionStatus) -> ExecutionMetadata {
        let mut m = ExecutionMetadata::started("berlin", Utc::now());
        m.status = status;
        m.listings_processed = processed;
        m.execution_time_seconds = seconds;
        m
    }

    #[test]
    fn empty_history_uses_fallback() {
        assert_eq!(estimate_seconds_per_url(&[], 5.0), 5.0);
    }

    #[test]
    fn zero_processed_rows_use_fallback() {
        let history = vec![
            execution(0, 120.0, ExecutionStatus::Completed),
            execution(0, 60.0, ExecutionStatus::Completed),
        ];
        assert_eq!(estimate_seconds_per_url(&history, 5.0), 5.0);
    }

    #[test]
    fn mean_over_completed_runs() {
        let history = vec![
            execution(100, 200.0, ExecutionStatus::Completed), // 2.0 s/url
            execution(50, 200.0, ExecutionStatus::Completed),  // 4.0 s/url
        ];
        assert!((estimate_seconds_per_url(&history, 5.0) - 3.0).abs() < 1e-9);
    }

    #[test]
    fn non_completed_runs_are_ignored() {
        let history = vec![
            execution(100, 200.0, ExecutionStatus::Completed), // 2.0 s/url
            execution(10, 1000.0, ExecutionStatus::Failed),
            execution(10, 1000.0, ExecutionStatus::Running),
        ];
        assert!((estimate_seconds_per_url(&history, 5.0) - 2.0).abs() < 1e-9);
    }
}
