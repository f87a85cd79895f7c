//! Listing prioritizer and batcher.
//!
//! The canonical cross-group priority order is NEW > RETRY > STALE
//! (High/Medium/Low): retries carry a bounded retry budget and partial
//! data, so they outrank rows that are merely stale. This ordering is
//! enforced here and nowhere else.

use tracing::info;
use uuid::Uuid;

use crate::types::{Batch, BatchPriority, Decision, DecisionKind, RecrawlConfig};

/// Turns per-url decisions into ordered, size-bounded work batches.
pub struct BatchPlanner {
    config: RecrawlConfig,
}

impl BatchPlanner {
    pub fn new(config: RecrawlConfig) -> Self {
        Self { config }
    }

    /// Group PROCESS_* decisions by kind, order within each group, slice
    /// into `batch_size` chunks, and return the chunks in priority order.
    /// SKIP_* decisions are dropped with logged counts.
    pub fn plan_batches(
        &self,
        decisions: &[Decision],
        city: &str,
        seconds_per_url: f64,
    ) -> Vec<Batch> {
        let mut new_group: Vec<&Decision> = Vec::new();
        let mut retry_group: Vec<&Decision> = Vec::new();
        let mut stale_group: Vec<&Decision> = Vec::new();
        let mut skipped_recent = 0usize;
        let mut skipped_failed = 0usize;

        for decision in decisions {
            match decision.kind {
                DecisionKind::ProcessNew => new_group.push(decision),
                DecisionKind::ProcessRetry => retry_group.push(decision),
                DecisionKind::ProcessStale => stale_group.push(decision),
                DecisionKind::SkipRecent => skipped_recent += 1,
                DecisionKind::SkipFailedRetryLimit => skipped_failed += 1,
            }
        }

        // NEW keeps discovery order (no timestamp to sort by). RETRY and
        // STALE go oldest-first so starved urls surface before newer ones.
        sort_oldest_first(&mut retry_group);
        sort_oldest_first(&mut stale_group);

        let mut batches = Vec::new();
        self.slice_group(&new_group, BatchPriority::High, city, seconds_per_url, &mut batches);
        self.slice_group(&retry_group, BatchPriority::Medium, city, seconds_per_url, &mut batches);
        self.slice_group(&stale_group, BatchPriority::Low, city, seconds_per_url, &mut batches);

        info!(
            city,
            batches = batches.len(),
            new = new_group.len(),
            retry = retry_group.len(),
            stale = stale_group.len(),
            skipped_recent,
            skipped_failed,
            "Planned work batches"
        );

        batches
    }

    fn slice_group(
        &self,
        group: &[&Decision],
        priority: BatchPriority,
        city: &str,
        seconds_per_url: f64,
        out: &mut Vec<Batch>,
    ) {
        for chunk in group.chunks(self.config.batch_size) {
            out.push(Batch {
                id: Uuid::new_v4(),
                urls: chunk.iter().map(|d| d.url.clone()).collect(),
                priority,
                city: city.to_string(),
                estimated_duration_seconds: chunk.len() as f64 * seconds_per_url,
            });
        }
    }
}

/// Largest staleness first, which is oldest `last_check_ts` first.
/// Decisions without a staleness value sort last.
fn sort_oldest_first(group: &mut [&Decision]) {
    group.sort_by(|a, b| {
        let a_stale = a.staleness_hours.unwrap_or(f64::MIN);
        let b_stale = b.staleness_hours.unwrap_or(f64::MIN);
        b_stale
            .partial_cmp(&a_stale)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision(url: &str, kind: DecisionKind, staleness_hours: Option<f64>) -> Decision {
        Decision {
            url: url.to_string(),
            kind,
            reason: String::new(),
            staleness_hours,
            retry_count: 0,
        }
    }

    fn planner(batch_size: usize) -> BatchPlanner {
        BatchPlanner::new(RecrawlConfig::new().with_batch_size(batch_size))
    }

    #[test]
    fn mixed_decisions_produce_ceil_batches_per_kind_in_priority_order() {
        // 250 urls with batch_size 100: 120 new, 80 stale, 30 retry,
        // 20 skipped. Expect ceil(120/100)=2 high, ceil(30/100)=1 medium,
        // ceil(80/100)=1 low, in exactly that order.
        let mut decisions = Vec::new();
        for i in 0..120 {
            decisions.push(decision(&format!("https://example.com/new/{i}"), DecisionKind::ProcessNew, None));
        }
        for i in 0..80 {
            decisions.push(decision(
                &format!("https://example.com/stale/{i}"),
                DecisionKind::ProcessStale,
                Some(25.0 + i as f64),
            ));
        }
        for i in 0..30 {
            decisions.push(decision(
                &format!("https://example.com/retry/{i}"),
                DecisionKind::ProcessRetry,
                Some(2.0 + i as f64),
            ));
        }
        for i in 0..20 {
            decisions.push(decision(&format!("https://example.com/skip/{i}"), DecisionKind::SkipRecent, Some(1.0)));
        }

        let batches = planner(100).plan_batches(&decisions, "berlin", 5.0);

        assert_eq!(batches.len(), 4);
        assert_eq!(batches[0].priority, BatchPriority::High);
        assert_eq!(batches[0].len(), 100);
        assert_eq!(batches[1].priority, BatchPriority::High);
        assert_eq!(batches[1].len(), 20);
        assert_eq!(batches[2].priority, BatchPriority::Medium);
        assert_eq!(batches[2].len(), 30);
        assert_eq!(batches[3].priority, BatchPriority::Low);
        assert_eq!(batches[3].len(), 80);
    }

    #[test]
    fn new_urls_keep_discovery_order() {
        let decisions = vec![
            decision("https://example.com/3", DecisionKind::ProcessNew, None),
            decision("https://example.com/1", DecisionKind::ProcessNew, None),
            decision("https://example.com/2", DecisionKind::ProcessNew, None),
        ];
        let batches = planner(100).plan_batches(&decisions, "berlin", 5.0);
        assert_eq!(
            batches[0].urls,
            vec![
                "https://example.com/3",
                "https://example.com/1",
                "https://example.com/2"
            ]
        );
    }

    #[test]
    fn stale_urls_come_oldest_first() {
        let decisions = vec![
            decision("https://example.com/young", DecisionKind::ProcessStale, Some(26.0)),
            decision("https://example.com/oldest", DecisionKind::ProcessStale, Some(90.0)),
            decision("https://example.com/older", DecisionKind::ProcessStale, Some(40.0)),
        ];
        let batches = planner(100).plan_batches(&decisions, "berlin", 5.0);
        assert_eq!(
            batches[0].urls,
            vec![
                "https://example.com/oldest",
                "https://example.com/older",
                "https://example.com/young"
            ]
        );
    }

    #[test]
    fn skip_decisions_never_materialize() {
        let decisions = vec![
            decision("https://example.com/1", DecisionKind::SkipRecent, Some(1.0)),
            decision("https://example.com/2", DecisionKind::SkipFailedRetryLimit, Some(100.0)),
        ];
        let batches = planner(100).plan_batches(&decisions, "berlin", 5.0);
        assert!(batches.is_empty());
    }

    #[test]
    fn batch_duration_scales_with_size() {
        let decisions: Vec<Decision> = (0..10)
            .map(|i| decision(&format!("https://example.com/{i}"), DecisionKind::ProcessNew, None))
            .collect();
        let batches = planner(100).plan_batches(&decisions, "berlin", 4.0);
        assert_eq!(batches.len(), 1);
        assert!((batches[0].estimated_duration_seconds - 40.0).abs() < f64::EPSILON);
    }
}
