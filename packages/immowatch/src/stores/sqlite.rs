//! SQLite storage implementation.
//!
//! The production backend: one physical database file per deployment.
//! Connections are kept to a single pooled handle because the embedded
//! engine does not tolerate uncoordinated concurrent writers on the same
//! file; cross-node coordination is the lock collaborator's job.

use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{QueryBuilder, Row, Sqlite};
use uuid::Uuid;

use crate::error::Result;
use crate::traits::store::{ListingStore, StoreUpsertStats};
use crate::types::{
    ExecutionMetadata, ExecutionStatus, ListingRecord, NormalizedListing, UpsertError,
};

/// SQLite-backed listing store.
pub struct SqliteListingStore {
    pool: SqlitePool,
}

/// Urls per `IN (...)` query, well under SQLite's host-parameter limit
/// (999 on older builds).
const BIND_CHUNK: usize = 500;

impl SqliteListingStore {
    /// Create a store for the given connection URL and run migrations.
    ///
    /// # Example URLs
    /// - `sqlite::memory:` - In-memory database (ephemeral)
    /// - `sqlite://./listings.db?mode=rwc` - File, created if missing
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(database_url)
            .await?;

        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing).
    pub async fn in_memory() -> Result<Self> {
        Self::new("sqlite::memory:").await
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS listings (
                url TEXT PRIMARY KEY,
                city TEXT NOT NULL,
                title TEXT,
                address TEXT,
                postal_code TEXT,
                price REAL,
                size REAL,
                rooms REAL,
                year_built INTEGER,
                extra_json TEXT NOT NULL DEFAULT '{}',
                last_check_ts TEXT,
                check_count INTEGER NOT NULL DEFAULT 0,
                retry_count INTEGER NOT NULL DEFAULT 0,
                last_error TEXT,
                deleted_ts TEXT,
                quality_score REAL NOT NULL DEFAULT 0.0
            );

            CREATE INDEX IF NOT EXISTS idx_listings_city ON listings(city);
            CREATE INDEX IF NOT EXISTS idx_listings_city_deleted ON listings(city, deleted_ts);
            CREATE INDEX IF NOT EXISTS idx_listings_last_check ON listings(last_check_ts);
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS scraping_executions (
                execution_id TEXT PRIMARY KEY,
                city TEXT NOT NULL,
                started_at TEXT NOT NULL,
                completed_at TEXT,
                status TEXT NOT NULL,
                listings_processed INTEGER NOT NULL DEFAULT 0,
                listings_new INTEGER NOT NULL DEFAULT 0,
                listings_updated INTEGER NOT NULL DEFAULT 0,
                listings_skipped INTEGER NOT NULL DEFAULT 0,
                listings_failed INTEGER NOT NULL DEFAULT 0,
                execution_time_seconds REAL NOT NULL DEFAULT 0.0
            );

            CREATE INDEX IF NOT EXISTS idx_executions_city_started
                ON scraping_executions(city, started_at);
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn row_to_record(row: &SqliteRow) -> ListingRecord {
    let extra_json: String = row.get("extra_json");
    ListingRecord {
        url: row.get("url"),
        city: row.get("city"),
        title: row.get("title"),
        address: row.get("address"),
        postal_code: row.get("postal_code"),
        price: row.get("price"),
        size: row.get("size"),
        rooms: row.get("rooms"),
        year_built: row.get("year_built"),
        extra: serde_json::from_str(&extra_json).unwrap_or_default(),
        last_check_ts: row.get("last_check_ts"),
        check_count: row.get("check_count"),
        retry_count: row.get("retry_count"),
        last_error: row.get("last_error"),
        deleted_ts: row.get("deleted_ts"),
        quality_score: row.get("quality_score"),
    }
}

fn row_to_execution(row: &SqliteRow) -> ExecutionMetadata {
    let id: String = row.get("execution_id");
    let status: String = row.get("status");
    ExecutionMetadata {
        execution_id: Uuid::parse_str(&id).unwrap_or_default(),
        city: row.get("city"),
        started_at: row.get("started_at"),
        completed_at: row.get("completed_at"),
        status: ExecutionStatus::parse(&status),
        listings_processed: row.get("listings_processed"),
        listings_new: row.get("listings_new"),
        listings_updated: row.get("listings_updated"),
        listings_skipped: row.get("listings_skipped"),
        listings_failed: row.get("listings_failed"),
        execution_time_seconds: row.get("execution_time_seconds"),
    }
}

const LISTING_COLUMNS: &str = "url, city, title, address, postal_code, price, size, rooms, \
     year_built, extra_json, last_check_ts, check_count, retry_count, last_error, deleted_ts, \
     quality_score";

#[async_trait]
impl ListingStore for SqliteListingStore {
    async fn get_listing(&self, url: &str) -> Result<Option<ListingRecord>> {
        let row = sqlx::query(&format!(
            "SELECT {LISTING_COLUMNS} FROM listings WHERE url = ?"
        ))
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(row_to_record))
    }

    async fn get_listings_by_urls(&self, urls: &[String]) -> Result<Vec<ListingRecord>> {
        let mut records = Vec::new();
        for chunk in urls.chunks(BIND_CHUNK) {
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
                "SELECT {LISTING_COLUMNS} FROM listings WHERE url IN ("
            ));
            let mut separated = builder.separated(", ");
            for url in chunk {
                separated.push_bind(url);
            }
            builder.push(")");

            let rows = builder.build().fetch_all(&self.pool).await?;
            records.extend(rows.iter().map(row_to_record));
        }
        Ok(records)
    }

    async fn live_urls(&self, city: &str) -> Result<HashSet<String>> {
        let rows = sqlx::query("SELECT url FROM listings WHERE city = ? AND deleted_ts IS NULL")
            .bind(city)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(|r| r.get("url")).collect())
    }

    async fn upsert_listings(
        &self,
        listings: &[NormalizedListing],
        city: &str,
        now: DateTime<Utc>,
    ) -> Result<StoreUpsertStats> {
        let mut tx = self.pool.begin().await?;

        // One query for the live set; decides new vs updated counting.
        let live_rows =
            sqlx::query("SELECT url FROM listings WHERE city = ? AND deleted_ts IS NULL")
                .bind(city)
                .fetch_all(&mut *tx)
                .await?;
        let live: HashSet<String> = live_rows.iter().map(|r| r.get("url")).collect();

        let mut stats = StoreUpsertStats::default();

        for listing in listings {
            let extra_json = serde_json::to_string(&listing.extra)?;

            // A revived tombstone takes the conflict path too: fields
            // overwritten, deleted_ts cleared, check_count kept monotonic.
            let result = sqlx::query(
                r#"
                INSERT INTO listings (
                    url, city, title, address, postal_code, price, size, rooms,
                    year_built, extra_json, last_check_ts, check_count,
                    retry_count, last_error, deleted_ts, quality_score
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 1, 0, NULL, NULL, ?)
                ON CONFLICT(url) DO UPDATE SET
                    city = excluded.city,
                    title = excluded.title,
                    address = excluded.address,
                    postal_code = excluded.postal_code,
                    price = excluded.price,
                    size = excluded.size,
                    rooms = excluded.rooms,
                    year_built = excluded.year_built,
                    extra_json = excluded.extra_json,
                    last_check_ts = excluded.last_check_ts,
                    check_count = listings.check_count + 1,
                    retry_count = 0,
                    last_error = NULL,
                    deleted_ts = NULL,
                    quality_score = excluded.quality_score
                "#,
            )
            .bind(&listing.url)
            .bind(city)
            .bind(&listing.title)
            .bind(&listing.address)
            .bind(&listing.postal_code)
            .bind(listing.price)
            .bind(listing.size)
            .bind(listing.rooms)
            .bind(listing.year_built)
            .bind(&extra_json)
            .bind(now)
            .bind(listing.quality_score)
            .execute(&mut *tx)
            .await;

            match result {
                Ok(_) => {
                    if live.contains(&listing.url) {
                        stats.updated += 1;
                    } else {
                        stats.new += 1;
                    }
                }
                Err(e) => {
                    stats.errors.push(UpsertError {
                        url: listing.url.clone(),
                        message: e.to_string(),
                    });
                }
            }
        }

        tx.commit().await?;
        Ok(stats)
    }

    async fn record_failure(&self, url: &str, error: &str, now: DateTime<Utc>) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE listings
            SET retry_count = retry_count + 1,
                last_error = ?,
                last_check_ts = ?
            WHERE url = ?
            "#,
        )
        .bind(error)
        .bind(now)
        .bind(url)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn mark_missing(
        &self,
        city: &str,
        seen_urls: &HashSet<String>,
        now: DateTime<Utc>,
    ) -> Result<usize> {
        let live = self.live_urls(city).await?;
        let missing: Vec<&String> = live.iter().filter(|u| !seen_urls.contains(*u)).collect();

        let mut tombstoned = 0usize;
        for chunk in missing.chunks(BIND_CHUNK) {
            let mut builder: QueryBuilder<Sqlite> =
                QueryBuilder::new("UPDATE listings SET deleted_ts = ");
            builder.push_bind(now);
            builder.push(" WHERE url IN (");
            let mut separated = builder.separated(", ");
            for url in chunk {
                separated.push_bind(url.as_str());
            }
            builder.push(")");

            let result = builder.build().execute(&self.pool).await?;
            tombstoned += result.rows_affected() as usize;
        }
        Ok(tombstoned)
    }

    async fn record_execution(&self, meta: &ExecutionMetadata) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO scraping_executions (
                execution_id, city, started_at, completed_at, status,
                listings_processed, listings_new, listings_updated,
                listings_skipped, listings_failed, execution_time_seconds
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(execution_id) DO UPDATE SET
                completed_at = excluded.completed_at,
                status = excluded.status,
                listings_processed = excluded.listings_processed,
                listings_new = excluded.listings_new,
                listings_updated = excluded.listings_updated,
                listings_skipped = excluded.listings_skipped,
                listings_failed = excluded.listings_failed,
                execution_time_seconds = excluded.execution_time_seconds
            "#,
        )
        .bind(meta.execution_id.to_string())
        .bind(&meta.city)
        .bind(meta.started_at)
        .bind(meta.completed_at)
        .bind(meta.status.as_str())
        .bind(meta.listings_processed)
        .bind(meta.listings_new)
        .bind(meta.listings_updated)
        .bind(meta.listings_skipped)
        .bind(meta.listings_failed)
        .bind(meta.execution_time_seconds)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn execution_history(
        &self,
        city: &str,
        limit: usize,
    ) -> Result<Vec<ExecutionMetadata>> {
        let rows = sqlx::query(
            r#"
            SELECT execution_id, city, started_at, completed_at, status,
                   listings_processed, listings_new, listings_updated,
                   listings_skipped, listings_failed, execution_time_seconds
            FROM scraping_executions
            WHERE city = ?
            ORDER BY started_at DESC
            LIMIT ?
            "#,
        )
        .bind(city)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(row_to_execution).collect())
    }

    async fn live_listing_count(&self, city: &str) -> Result<usize> {
        let row =
            sqlx::query("SELECT COUNT(*) AS n FROM listings WHERE city = ? AND deleted_ts IS NULL")
                .bind(city)
                .fetch_one(&self.pool)
                .await?;
        let n: i64 = row.get("n");
        Ok(n as usize)
    }
}
