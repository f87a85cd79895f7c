//! Deduplication decision engine.
//!
//! All retry/staleness arithmetic lives in one pure [`classify`] function
//! so every caller shares a single tested policy. The batch entry point
//! loads existing rows in one `url IN (...)` query through the store
//! trait.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::error::Result;
use crate::traits::ListingStore;
use crate::types::{Decision, DecisionKind, ListingRecord, RecrawlConfig};

/// Classify one candidate url against its stored history.
///
/// First matching rule wins; read-only.
pub fn classify(
    url: &str,
    existing: Option<&ListingRecord>,
    now: DateTime<Utc>,
    config: &RecrawlConfig,
) -> Decision {
    let record = match existing {
        None => {
            return Decision {
                url: url.to_string(),
                kind: DecisionKind::ProcessNew,
                reason: "never processed".into(),
                staleness_hours: None,
                retry_count: 0,
            }
        }
        Some(r) => r,
    };

    if record.deleted_ts.is_some() {
        return Decision {
            url: url.to_string(),
            kind: DecisionKind::ProcessNew,
            reason: "previously delisted, may be relisted".into(),
            staleness_hours: None,
            retry_count: record.retry_count,
        };
    }

    let last_check = match record.last_check_ts {
        None => {
            return Decision {
                url: url.to_string(),
                kind: DecisionKind::ProcessNew,
                reason: "never checked".into(),
                staleness_hours: None,
                retry_count: record.retry_count,
            }
        }
        Some(ts) => ts,
    };

    let elapsed = now - last_check;
    let staleness_hours = elapsed.num_minutes() as f64 / 60.0;

    if record.retry_count >= config.retry_limit {
        return Decision {
            url: url.to_string(),
            kind: DecisionKind::SkipFailedRetryLimit,
            reason: format!(
                "failed {} times, retry limit {} reached",
                record.retry_count, config.retry_limit
            ),
            staleness_hours: Some(staleness_hours),
            retry_count: record.retry_count,
        };
    }

    if record.retry_count > 0 && record.last_error.is_some() {
        let retry_delay = Duration::minutes(config.retry_delay_minutes);
        if elapsed >= retry_delay {
            return Decision {
                url: url.to_string(),
                kind: DecisionKind::ProcessRetry,
                reason: format!(
                    "retry {}/{} after failure: {}",
                    record.retry_count,
                    config.retry_limit,
                    record.last_error.as_deref().unwrap_or("unknown")
                ),
                staleness_hours: Some(staleness_hours),
                retry_count: record.retry_count,
            };
        }
        let remaining = (retry_delay - elapsed).num_minutes().max(1);
        return Decision {
            url: url.to_string(),
            kind: DecisionKind::SkipRecent,
            reason: format!("retry delay not elapsed, {remaining} min remaining"),
            staleness_hours: Some(staleness_hours),
            retry_count: record.retry_count,
        };
    }

    if elapsed >= Duration::hours(config.staleness_hours) {
        return Decision {
            url: url.to_string(),
            kind: DecisionKind::ProcessStale,
            reason: format!(
                "last checked {staleness_hours:.1}h ago, threshold {}h",
                config.staleness_hours
            ),
            staleness_hours: Some(staleness_hours),
            retry_count: record.retry_count,
        };
    }

    Decision {
        url: url.to_string(),
        kind: DecisionKind::SkipRecent,
        reason: format!("recently checked ({staleness_hours:.1}h ago), healthy"),
        staleness_hours: Some(staleness_hours),
        retry_count: record.retry_count,
    }
}

/// Batch classifier over an injected store.
pub struct DecisionEngine {
    store: Arc<dyn ListingStore>,
    config: RecrawlConfig,
}

impl DecisionEngine {
    pub fn new(store: Arc<dyn ListingStore>, config: RecrawlConfig) -> Self {
        Self { store, config }
    }

    /// Classify a candidate url set, loading all existing rows in a
    /// single query. Decisions come back in input order.
    pub async fn classify_urls(
        &self,
        urls: &[String],
        now: DateTime<Utc>,
    ) -> Result<Vec<Decision>> {
        let existing = self.store.get_listings_by_urls(urls).await?;
        let by_url: HashMap<&str, &ListingRecord> =
            existing.iter().map(|r| (r.url.as_str(), r)).collect();

        let decisions: Vec<Decision> = urls
            .iter()
            .map(|url| classify(url, by_url.get(url.as_str()).copied(), now, &self.config))
            .collect();

        for d in &decisions {
            debug!(url = %d.url, kind = ?d.kind, reason = %d.reason, "Classified url");
        }

        Ok(decisions)
    }
}
