//! Quote provider trait and fetch error classification.
//!
//! The `QuoteProvider` trait is the single network boundary of the
//! pipeline. Implementations return a raw tabular frame; validation and
//! canonicalization happen downstream in the normalizer.

pub mod mock;
pub mod yahoo;

pub use mock::MockProvider;
pub use yahoo::YahooProvider;

use crate::ticker::Ticker;
use chrono::NaiveDate;
use polars::prelude::DataFrame;
use thiserror::Error;

/// Default relative window for daily ingestion runs.
pub const DEFAULT_PERIOD: &str = "5d";

/// Default bar interval.
pub const DEFAULT_INTERVAL: &str = "1d";

/// Time window of a quote fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchRange {
    /// Relative window ending now, in the provider's period syntax
    /// (`"5d"`, `"1mo"`).
    Period(String),
    /// Explicit inclusive calendar window.
    Between { start: NaiveDate, end: NaiveDate },
}

/// One fetch against the quote provider.
#[derive(Debug, Clone)]
pub struct QuoteRequest {
    pub tickers: Vec<Ticker>,
    pub range: FetchRange,
    pub interval: String,
}

/// Errors from the quote provider boundary.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network unreachable: {0}")]
    Network(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("provider returned HTTP {status}")]
    Status { status: u16 },

    #[error("response format changed: {0}")]
    ResponseFormat(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },
}

impl FetchError {
    /// Whether a retry could reasonably succeed.
    ///
    /// Connectivity problems, throttling, server-side failures and unstable
    /// payloads are transient. A provider-confirmed unknown symbol is not.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Network(_)
            | FetchError::Timeout(_)
            | FetchError::RateLimited { .. }
            | FetchError::ResponseFormat(_) => true,
            FetchError::Status { status } => *status == 429 || *status >= 500,
            FetchError::SymbolNotFound { .. } => false,
        }
    }
}

/// Trait for quote providers.
///
/// One call fetches all requested tickers for the window. Retry sits
/// above this trait; implementations make a single attempt.
pub trait QuoteProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch raw daily quotes for the request.
    fn fetch(&self, request: &QuoteRequest) -> Result<DataFrame, FetchError>;
}
