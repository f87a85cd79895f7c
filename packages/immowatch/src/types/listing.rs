//! Listing record types: raw scrape payloads, normalized rows, stored rows.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A scalar value in the free-form extra-attributes side map.
///
/// Scraped detail pages carry arbitrary key/value pairs beyond the scored
/// core fields (energy class, floor, heating type, ...). They are kept in
/// an explicitly-typed side map serialized independently of the typed
/// columns, so new source attributes never weaken the scored schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExtraValue {
    Text(String),
    Number(f64),
    Bool(bool),
}

/// A listing detail page as delivered by the fetch collaborator.
///
/// Numeric fields arrive as raw display strings ("349.000 €", "82,5 m²")
/// and are normalized before persistence. A populated `error` marks the
/// fetch as failed; such rows are counted but never touch storage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawListing {
    pub url: String,
    pub title: Option<String>,
    pub address: Option<String>,
    pub price: Option<String>,
    pub size: Option<String>,
    pub rooms: Option<String>,
    pub year_built: Option<String>,
    pub overview: Option<String>,
    #[serde(default)]
    pub extra: BTreeMap<String, ExtraValue>,
    /// Error marker set by the fetch collaborator on a failed fetch.
    pub error: Option<String>,
}

impl RawListing {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// A failed-fetch marker row for the given url.
    pub fn failed(url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// A raw listing after field normalization and quality scoring.
///
/// Unparseable numeric fields become `None` (they lower the quality score
/// but never fail the row).
#[derive(Debug, Clone)]
pub struct NormalizedListing {
    pub url: String,
    pub title: Option<String>,
    pub address: Option<String>,
    pub postal_code: Option<String>,
    pub price: Option<f64>,
    pub size: Option<f64>,
    pub rooms: Option<f64>,
    pub year_built: Option<i32>,
    pub overview: Option<String>,
    pub extra: BTreeMap<String, ExtraValue>,
    pub quality_score: f64,
}

/// A stored listing row. Identity is the url (globally unique).
///
/// A record is live while `deleted_ts` is null and tombstoned once a full
/// sweep observed it missing from the source. Tombstones are never
/// physically deleted; a re-listed url revives the same row.
#[derive(Debug, Clone)]
pub struct ListingRecord {
    pub url: String,
    pub city: String,
    pub title: Option<String>,
    pub address: Option<String>,
    pub postal_code: Option<String>,
    pub price: Option<f64>,
    pub size: Option<f64>,
    pub rooms: Option<f64>,
    pub year_built: Option<i32>,
    pub extra: BTreeMap<String, ExtraValue>,
    /// When this url was last fetched (success or recorded failure).
    pub last_check_ts: Option<DateTime<Utc>>,
    /// Successful upserts for this url. Monotonic; measures re-check
    /// frequency, so it increments on every successful upsert by design.
    pub check_count: i64,
    /// Consecutive failed fetches since the last success.
    pub retry_count: i64,
    pub last_error: Option<String>,
    pub deleted_ts: Option<DateTime<Utc>>,
    /// Weighted completeness of the scored fields, in [0, 1].
    pub quality_score: f64,
}

impl ListingRecord {
    pub fn is_live(&self) -> bool {
        self.deleted_ts.is_none()
    }
}
