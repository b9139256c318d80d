//! Structured error types for the ingestion data path.
//!
//! Every failure carries enough context (dt, tickers, column names, keys)
//! for the caller to log and alert without re-deriving it.

use crate::provider::FetchError;
use crate::store::StoreError;
use chrono::NaiveDate;
use thiserror::Error;

/// Errors produced by the ingestion pipeline.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("invalid ticker: {reason}")]
    InvalidTicker { reason: String },

    #[error("invalid date '{input}' (expected YYYY-MM-DD)")]
    InvalidDate { input: String },

    #[error("invalid date range: start {start} is after end {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("schema validation failed, missing columns: {missing:?}")]
    SchemaValidation { missing: Vec<String> },

    #[error("no quote rows remained after normalization (dt: {dt:?}, tickers: {tickers:?})")]
    EmptyData {
        dt: Option<NaiveDate>,
        tickers: Vec<String>,
    },

    #[error("quote fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("storage write failed for '{key}': {source}")]
    StorageWrite { key: String, source: StoreError },

    #[error("table operation failed: {0}")]
    Table(String),
}

impl IngestError {
    /// Whether retrying the operation could reasonably succeed.
    ///
    /// Only provider-side transient failures qualify. Schema problems,
    /// empty partitions and storage failures propagate immediately.
    pub fn is_transient(&self) -> bool {
        matches!(self, IngestError::Fetch(e) if e.is_transient())
    }
}
