//! Re-crawl engine: the public surface consumed by orchestration.
//!
//! Planning and persistence are synchronous from the orchestrator's view:
//! batches are processed strictly one at a time within a run, with the
//! external work lock held across each batch's fetch + upsert cycle and a
//! cooperative cancellation checkpoint between batches.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::decision::DecisionEngine;
use crate::error::Result;
use crate::persist::ListingPersister;
use crate::planner::BatchPlanner;
use crate::stats;
use crate::traits::{ListingScraper, ListingStore, WorkLock};
use crate::types::{
    Batch, DecisionKind, ExecutionMetadata, ExecutionStatus, PlanSummary, RawListing,
    RecrawlConfig, UpsertOutcome,
};

/// Minimum lock TTL, in case the duration estimate is tiny.
const MIN_LOCK_TTL_SECONDS: u64 = 60;

pub struct RecrawlEngine {
    store: Arc<dyn ListingStore>,
    scraper: Arc<dyn ListingScraper>,
    lock: Arc<dyn WorkLock>,
    config: RecrawlConfig,
    decisions: DecisionEngine,
    planner: BatchPlanner,
    persister: ListingPersister,
}

impl RecrawlEngine {
    /// Build an engine over injected collaborators. Invalid configuration
    /// fails here, before any run starts.
    pub fn new(
        store: Arc<dyn ListingStore>,
        scraper: Arc<dyn ListingScraper>,
        lock: Arc<dyn WorkLock>,
        config: RecrawlConfig,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            decisions: DecisionEngine::new(store.clone(), config.clone()),
            planner: BatchPlanner::new(config.clone()),
            persister: ListingPersister::new(store.clone()),
            store,
            scraper,
            lock,
            config,
        })
    }

    /// Classify a city's discovered urls and summarize the counts.
    pub async fn plan_execution(&self, city: &str) -> Result<PlanSummary> {
        let urls = self.scraper.discover_urls(city).await?;
        let decisions = self.decisions.classify_urls(&urls, Utc::now()).await?;

        let mut summary = PlanSummary {
            total_urls: urls.len(),
            ..Default::default()
        };
        for d in &decisions {
            match d.kind {
                DecisionKind::ProcessNew => summary.new_urls += 1,
                DecisionKind::ProcessStale => summary.stale_urls += 1,
                DecisionKind::ProcessRetry => summary.retry_urls += 1,
                DecisionKind::SkipRecent | DecisionKind::SkipFailedRetryLimit => {
                    summary.skip_urls += 1
                }
            }
        }

        info!(
            city,
            total = summary.total_urls,
            new = summary.new_urls,
            stale = summary.stale_urls,
            retry = summary.retry_urls,
            skip = summary.skip_urls,
            "Planned execution"
        );
        Ok(summary)
    }

    /// Filter a city's candidate urls down to the ones due for
    /// processing, in batch priority order.
    pub async fn urls_to_process(&self, city: &str, urls: &[String]) -> Result<Vec<String>> {
        let decisions = self.decisions.classify_urls(urls, Utc::now()).await?;
        let rate = self.config.fallback_seconds_per_url;
        let batches = self.planner.plan_batches(&decisions, city, rate);
        Ok(batches.into_iter().flat_map(|b| b.urls).collect())
    }

    /// Plan work batches for a candidate url set, sized with historical
    /// timing for the city.
    pub async fn plan_batches(&self, city: &str, urls: &[String]) -> Result<Vec<Batch>> {
        let decisions = self.decisions.classify_urls(urls, Utc::now()).await?;
        let rate = self.estimate_seconds_per_url(city).await?;
        Ok(self.planner.plan_batches(&decisions, city, rate))
    }

    /// Historical seconds-per-url for a city, from the last
    /// `stats_window` completed executions.
    pub async fn estimate_seconds_per_url(&self, city: &str) -> Result<f64> {
        let history = self
            .store
            .execution_history(city, self.config.stats_window)
            .await?;
        Ok(stats::estimate_seconds_per_url(
            &history,
            self.config.fallback_seconds_per_url,
        ))
    }

    /// Estimated total seconds to process `urls`; only urls that classify
    /// as PROCESS_* count.
    pub async fn estimate_total_duration(&self, city: &str, urls: &[String]) -> Result<f64> {
        let decisions = self.decisions.classify_urls(urls, Utc::now()).await?;
        let due = decisions.iter().filter(|d| d.is_process()).count();
        let rate = self.estimate_seconds_per_url(city).await?;
        Ok(due as f64 * rate)
    }

    /// Persist fetched results for a city. See [`ListingPersister`].
    pub async fn upsert_with_deduplication(
        &self,
        results: &[RawListing],
        city: &str,
        execution_id: Uuid,
    ) -> UpsertOutcome {
        self.persister
            .upsert_with_deduplication(results, city, execution_id, Utc::now())
            .await
    }

    /// Run one full re-scrape cycle for a city.
    ///
    /// Discovers urls, classifies, plans, then processes batches
    /// sequentially. Cancellation is honored between batches; rows
    /// already upserted stay valid. Listings missing from discovery are
    /// tombstoned only after a complete, uncancelled sweep. The recorded
    /// execution row is returned; fetch problems and batch-level storage
    /// errors end up in the counts rather than propagating past this
    /// method.
    pub async fn run(&self, city: &str, cancel: CancellationToken) -> Result<ExecutionMetadata> {
        let started = Utc::now();
        let mut meta = ExecutionMetadata::started(city, started);
        self.store.record_execution(&meta).await?;

        let discovered = match self.scraper.discover_urls(city).await {
            Ok(urls) => urls,
            Err(e) => {
                warn!(city, error = %e, "Url discovery failed");
                return self.finish_failed(meta).await;
            }
        };

        let decisions = match self.decisions.classify_urls(&discovered, started).await {
            Ok(decisions) => decisions,
            Err(e) => {
                warn!(city, error = %e, "Classification failed");
                return self.finish_failed(meta).await;
            }
        };
        meta.listings_skipped = decisions.iter().filter(|d| !d.is_process()).count() as i64;

        let rate = match self.estimate_seconds_per_url(city).await {
            Ok(rate) => rate,
            Err(e) => {
                warn!(city, error = %e, "Duration estimate failed");
                return self.finish_failed(meta).await;
            }
        };
        let batches = self.planner.plan_batches(&decisions, city, rate);

        let mut cancelled = false;
        for batch in &batches {
            if cancel.is_cancelled() {
                info!(city, "Run cancelled between batches");
                cancelled = true;
                break;
            }
            self.process_batch(batch, &mut meta).await;
        }

        let mut sweep_failed = false;
        if !cancelled {
            let seen: HashSet<String> = discovered.iter().cloned().collect();
            match self.store.mark_missing(city, &seen, Utc::now()).await {
                Ok(tombstoned) => {
                    if tombstoned > 0 {
                        info!(city, tombstoned, "Tombstoned delisted listings");
                    }
                }
                Err(e) => {
                    warn!(city, error = %e, "Tombstone sweep failed");
                    sweep_failed = true;
                }
            }
        }

        let finished = Utc::now();
        meta.status = if cancelled {
            ExecutionStatus::Cancelled
        } else if sweep_failed {
            ExecutionStatus::Failed
        } else {
            ExecutionStatus::Completed
        };
        meta.completed_at = Some(finished);
        meta.execution_time_seconds = (finished - started).num_milliseconds() as f64 / 1000.0;
        self.store.record_execution(&meta).await?;

        info!(
            city,
            execution_id = %meta.execution_id,
            status = meta.status.as_str(),
            processed = meta.listings_processed,
            new = meta.listings_new,
            updated = meta.listings_updated,
            skipped = meta.listings_skipped,
            failed = meta.listings_failed,
            "Run finished"
        );
        Ok(meta)
    }

    /// Record a terminal Failed row for a run that could not get past
    /// planning; the counts accumulated so far stay in the row.
    async fn finish_failed(&self, mut meta: ExecutionMetadata) -> Result<ExecutionMetadata> {
        meta.status = ExecutionStatus::Failed;
        meta.completed_at = Some(Utc::now());
        self.store.record_execution(&meta).await?;
        Ok(meta)
    }

    /// Fetch and persist one batch under the work lock.
    ///
    /// Never propagates: a storage error mid-batch counts the batch's
    /// urls as failed, and the lock is released on every path so an
    /// aborted batch does not hold the lease until its TTL expires.
    async fn process_batch(&self, batch: &Batch, meta: &mut ExecutionMetadata) {
        let lock_key = format!("recrawl:{}", batch.city);
        let ttl = (batch.estimated_duration_seconds.ceil() as u64 * 2).max(MIN_LOCK_TTL_SECONDS);

        match self.lock.acquire(&lock_key, ttl).await {
            Ok(true) => {}
            Ok(false) => {
                warn!(
                    batch_id = %batch.id,
                    city = %batch.city,
                    "Work lock contended, skipping batch"
                );
                meta.listings_failed += batch.len() as i64;
                return;
            }
            Err(e) => {
                warn!(
                    batch_id = %batch.id,
                    city = %batch.city,
                    error = %e,
                    "Work lock acquire failed, skipping batch"
                );
                meta.listings_failed += batch.len() as i64;
                return;
            }
        }

        if let Err(e) = self.fetch_and_persist(batch, meta).await {
            warn!(
                batch_id = %batch.id,
                city = %batch.city,
                error = %e,
                "Batch aborted, counting its urls as failed"
            );
            meta.listings_failed += batch.len() as i64;
        }

        if let Err(e) = self.lock.release(&lock_key).await {
            warn!(key = %lock_key, error = %e, "Work lock release failed, lease expires by TTL");
        }
    }

    async fn fetch_and_persist(&self, batch: &Batch, meta: &mut ExecutionMetadata) -> Result<()> {
        let mut results = Vec::with_capacity(batch.len());
        for url in &batch.urls {
            match self.scraper.fetch_detail(url).await {
                Ok(raw) => results.push(raw),
                Err(e) => results.push(RawListing::failed(url, e.to_string())),
            }
        }

        // Retry state is written here, not by upsert: error rows bump
        // retry_count and keep last_error for the next classification.
        let now = Utc::now();
        for raw in results.iter().filter(|r| r.is_error()) {
            let error = raw.error.as_deref().unwrap_or("fetch failed");
            self.store.record_failure(&raw.url, error, now).await?;
        }

        let outcome = self
            .persister
            .upsert_with_deduplication(&results, &batch.city, meta.execution_id, now)
            .await;

        meta.listings_new += outcome.new as i64;
        meta.listings_updated += outcome.updated as i64;
        meta.listings_failed += outcome.failed as i64;
        meta.listings_processed += outcome.processed() as i64;

        Ok(())
    }
}
