//! Developer CLI for inspecting a listing store.
//!
//! Not the production orchestrator: this tool classifies candidate urls
//! and prints run history against a local database file. The database URL
//! comes from `IMMOWATCH_DATABASE_URL` (or `.env`); candidate urls for
//! `plan` are read from stdin, one per line.

use std::collections::HashMap;
use std::env;
use std::io::{self, BufRead};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use colored::Colorize;

use immowatch::{
    classify, DecisionKind, ListingStore, RecrawlConfig, StoreManager,
};

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "immowatch=info".into()),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let (command, city) = match (args.get(1), args.get(2)) {
        (Some(cmd), Some(city)) => (cmd.as_str(), city.as_str()),
        _ => {
            eprintln!("usage: immowatch-dev <plan|history> <city>");
            eprintln!("  plan     classify candidate urls read from stdin");
            eprintln!("  history  print recent executions for the city");
            bail!("missing command");
        }
    };

    let database_url = env::var("IMMOWATCH_DATABASE_URL")
        .unwrap_or_else(|_| "sqlite://./immowatch.db?mode=rwc".to_string());

    let manager = StoreManager::new();
    let store = manager
        .open(&database_url)
        .await
        .context("failed to open listing store")?;

    match command {
        "plan" => plan(store, city).await,
        "history" => history(store, city).await,
        other => bail!("unknown command: {other}"),
    }
}

async fn plan(store: Arc<immowatch::SqliteListingStore>, city: &str) -> Result<()> {
    let urls: Vec<String> = io::stdin()
        .lock()
        .lines()
        .collect::<io::Result<Vec<_>>>()?
        .into_iter()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect();
    if urls.is_empty() {
        bail!("no urls on stdin");
    }

    let config = RecrawlConfig::default();
    config.validate().context("invalid config")?;

    let existing = store.get_listings_by_urls(&urls).await?;
    let by_url: HashMap<&str, _> = existing.iter().map(|r| (r.url.as_str(), r)).collect();

    let now = Utc::now();
    let mut counts: HashMap<DecisionKind, usize> = HashMap::new();
    for url in &urls {
        let decision = classify(url, by_url.get(url.as_str()).copied(), now, &config);
        *counts.entry(decision.kind).or_default() += 1;
        let kind = match decision.kind {
            DecisionKind::ProcessNew => "NEW   ".bright_green(),
            DecisionKind::ProcessStale => "STALE ".yellow(),
            DecisionKind::ProcessRetry => "RETRY ".bright_yellow(),
            DecisionKind::SkipRecent => "SKIP  ".bright_black(),
            DecisionKind::SkipFailedRetryLimit => "DEAD  ".red(),
        };
        println!("{kind} {url}  {}", decision.reason.bright_black());
    }

    println!();
    println!(
        "{} {} urls for {city}: {} new, {} stale, {} retry, {} skipped",
        "Plan:".bold(),
        urls.len(),
        counts.get(&DecisionKind::ProcessNew).unwrap_or(&0),
        counts.get(&DecisionKind::ProcessStale).unwrap_or(&0),
        counts.get(&DecisionKind::ProcessRetry).unwrap_or(&0),
        counts.get(&DecisionKind::SkipRecent).unwrap_or(&0)
            + counts.get(&DecisionKind::SkipFailedRetryLimit).unwrap_or(&0),
    );
    println!(
        "{} live listings in store",
        store.live_listing_count(city).await?
    );
    Ok(())
}

async fn history(store: Arc<immowatch::SqliteListingStore>, city: &str) -> Result<()> {
    let rows = store.execution_history(city, 20).await?;
    if rows.is_empty() {
        println!("no executions recorded for {city}");
        return Ok(());
    }

    for meta in rows {
        let status = match meta.status {
            immowatch::ExecutionStatus::Completed => meta.status.as_str().bright_green(),
            immowatch::ExecutionStatus::Failed => meta.status.as_str().red(),
            _ => meta.status.as_str().yellow(),
        };
        println!(
            "{}  {}  {:>9}  processed={:<5} new={:<5} updated={:<5} failed={:<5} {:.1}s",
            meta.started_at.format("%Y-%m-%d %H:%M:%S"),
            meta.execution_id,
            status,
            meta.listings_processed,
            meta.listings_new,
            meta.listings_updated,
            meta.listings_failed,
            meta.execution_time_seconds,
        );
    }
    Ok(())
}
