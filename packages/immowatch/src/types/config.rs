//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::{ImmowatchError, Result};

/// Configuration for decision, batching, and estimation policy.
///
/// Validated at engine construction; invalid settings fail fast instead of
/// being silently defaulted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecrawlConfig {
    /// Maximum age of a successful check before a live listing is due for
    /// re-fetch. Default: 24.
    pub staleness_hours: i64,

    /// Minimum wait after a failed fetch before retrying. Default: 60.
    pub retry_delay_minutes: i64,

    /// Consecutive failures after which a url is skipped until its data
    /// changes. Default: 3.
    pub retry_limit: i64,

    /// Maximum urls per work batch. Default: 100.
    pub batch_size: usize,

    /// Completed execution rows considered by the duration estimator.
    /// Default: 20.
    pub stats_window: usize,

    /// Seconds-per-url estimate used when no usable history exists.
    /// Default: 5.0.
    pub fallback_seconds_per_url: f64,
}

impl Default for RecrawlConfig {
    fn default() -> Self {
        Self {
            staleness_hours: 24,
            retry_delay_minutes: 60,
            retry_limit: 3,
            batch_size: 100,
            stats_window: 20,
            fallback_seconds_per_url: 5.0,
        }
    }
}

impl RecrawlConfig {
    /// Create a config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the staleness threshold in hours.
    pub fn with_staleness_hours(mut self, hours: i64) -> Self {
        self.staleness_hours = hours;
        self
    }

    /// Set the retry delay in minutes.
    pub fn with_retry_delay_minutes(mut self, minutes: i64) -> Self {
        self.retry_delay_minutes = minutes;
        self
    }

    /// Set the retry limit.
    pub fn with_retry_limit(mut self, limit: i64) -> Self {
        self.retry_limit = limit;
        self
    }

    /// Set the batch size.
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size;
        self
    }

    /// Set the statistics history window.
    pub fn with_stats_window(mut self, window: usize) -> Self {
        self.stats_window = window;
        self
    }

    /// Check all settings, failing with a `Config` error on the first
    /// invalid one.
    pub fn validate(&self) -> Result<()> {
        if self.staleness_hours < 1 {
            return Err(ImmowatchError::Config(format!(
                "staleness_hours must be >= 1, got {}",
                self.staleness_hours
            )));
        }
        if self.retry_delay_minutes < 1 {
            return Err(ImmowatchError::Config(format!(
                "retry_delay_minutes must be >= 1, got {}",
                self.retry_delay_minutes
            )));
        }
        if self.retry_limit < 1 {
            return Err(ImmowatchError::Config(format!(
                "retry_limit must be >= 1, got {}",
                self.retry_limit
            )));
        }
        if self.batch_size == 0 {
            return Err(ImmowatchError::Config("batch_size must be >= 1".into()));
        }
        if self.stats_window == 0 {
            return Err(ImmowatchError::Config("stats_window must be >= 1".into()));
        }
        if !(self.fallback_seconds_per_url > 0.0) {
            return Err(ImmowatchError::Config(format!(
                "fallback_seconds_per_url must be positive, got {}",
                self.fallback_seconds_per_url
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(RecrawlConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_batch_size_rejected() {
        let cfg = RecrawlConfig::new().with_batch_size(0);
        assert!(matches!(
            cfg.validate(),
            Err(ImmowatchError::Config(_))
        ));
    }

    #[test]
    fn negative_staleness_rejected() {
        let cfg = RecrawlConfig::new().with_staleness_hours(-1);
        assert!(cfg.validate().is_err());
    }
}
