//! Daily and historical ingestion flows.
//!
//! A daily run resolves its target date, fetches a small provider
//! window, keeps only the target session, and writes one
//! `dt=YYYY-MM-DD` partition. A backfill walks an inclusive date range
//! the same way, one day at a time, and optionally starts the
//! refinement job for every partition it wrote.

use crate::jobs::{DispatchError, JobRequest, JobRun, JobTrigger};
use crate::settings::Settings;
use b3lake_core::calendar::{days_inclusive, is_business_day, resolve_target_date};
use b3lake_core::error::IngestError;
use b3lake_core::normalize::fetch_and_normalize;
use b3lake_core::partition::write_partition;
use b3lake_core::provider::{FetchRange, QuoteProvider, QuoteRequest};
use b3lake_core::retry::RetryPolicy;
use b3lake_core::store::ObjectStore;
use b3lake_core::ticker;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};

/// Everything one ingestion run needs to know.
#[derive(Debug, Clone)]
pub struct IngestionConfig {
    /// Tickers in raw user form.
    pub tickers: Vec<String>,
    pub period: String,
    pub interval: String,
    pub prefix: String,
    /// Explicit partition date (`YYYY-MM-DD`). `None` means previous
    /// business day.
    pub dt: Option<String>,
    pub retry: RetryPolicy,
}

impl IngestionConfig {
    pub fn from_settings(settings: &Settings, dt: Option<String>) -> Self {
        Self {
            tickers: settings.tickers.clone(),
            period: settings.period.clone(),
            interval: settings.interval.clone(),
            prefix: settings.prefix.clone(),
            dt,
            retry: settings.retry_policy(),
        }
    }
}

/// What one day of ingestion produced.
#[derive(Debug, Clone, Serialize)]
pub struct IngestionResult {
    pub dt: NaiveDate,
    /// True when the date had no trading session and nothing was
    /// fetched or written.
    pub skipped: bool,
    pub uri: Option<String>,
    pub rows_ingested: usize,
    pub ticker_count: usize,
}

/// Run one daily ingestion.
pub fn run_ingestion(
    provider: &dyn QuoteProvider,
    store: &dyn ObjectStore,
    config: &IngestionConfig,
    today: NaiveDate,
) -> Result<IngestionResult, IngestError> {
    let dt = resolve_target_date(config.dt.as_deref(), today)?;

    // An explicit date gets an exact window. The default daily run
    // uses the configured period, wide enough to contain D-1.
    let range = match &config.dt {
        Some(_) => FetchRange::Between { start: dt, end: dt },
        None => FetchRange::Period(config.period.clone()),
    };

    run_for_date(provider, store, config, dt, range)
}

fn run_for_date(
    provider: &dyn QuoteProvider,
    store: &dyn ObjectStore,
    config: &IngestionConfig,
    dt: NaiveDate,
    range: FetchRange,
) -> Result<IngestionResult, IngestError> {
    if !is_business_day(dt) {
        info!(%dt, "no trading session, skipping");
        return Ok(IngestionResult {
            dt,
            skipped: true,
            uri: None,
            rows_ingested: 0,
            ticker_count: 0,
        });
    }

    let tickers = ticker::resolve(&config.tickers)?;
    let ticker_count = tickers.len();
    let request = QuoteRequest {
        tickers,
        range,
        interval: config.interval.clone(),
    };

    let normalized = config.retry.run(
        || fetch_and_normalize(provider, &request, Some(dt)),
        |err: &IngestError| err.is_transient(),
    )?;

    let rows_ingested = normalized.table.height();
    let uri = write_partition(store, &config.prefix, &normalized.table, dt)?;
    info!(%dt, rows = rows_ingested, uri = %uri, "partition written");

    Ok(IngestionResult {
        dt,
        skipped: false,
        uri: Some(uri),
        rows_ingested,
        ticker_count,
    })
}

/// Refinement jobs to start for each backfilled partition.
pub struct RefinedTrigger<'a> {
    pub trigger: &'a dyn JobTrigger,
    pub job_name: &'a str,
}

/// Outcome of a whole backfill.
#[derive(Debug, Default)]
pub struct BackfillSummary {
    /// Per-day outcomes, skipped weekends included, in range order.
    pub results: Vec<IngestionResult>,
    /// Days whose ingestion failed after retries.
    pub failures: Vec<(NaiveDate, IngestError)>,
    pub dispatched: Vec<JobRun>,
    pub dispatch_failures: Vec<(NaiveDate, DispatchError)>,
}

impl BackfillSummary {
    pub fn ingested_count(&self) -> usize {
        self.results.iter().filter(|r| !r.skipped).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.results.iter().filter(|r| r.skipped).count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failures.is_empty() && self.dispatch_failures.is_empty()
    }
}

/// Ingest every day in `start..=end`, continuing past per-day failures.
///
/// Dispatch happens after the walk, once per successfully written
/// partition, so a failed day can never start its refinement.
pub fn backfill(
    provider: &dyn QuoteProvider,
    store: &dyn ObjectStore,
    config: &IngestionConfig,
    start: NaiveDate,
    end: NaiveDate,
    refined: Option<&RefinedTrigger<'_>>,
) -> Result<BackfillSummary, IngestError> {
    let days = days_inclusive(start, end)?;
    info!(%start, %end, days = days.len(), "starting backfill");

    let mut summary = BackfillSummary::default();

    for day in days {
        let range = FetchRange::Between {
            start: day,
            end: day,
        };
        match run_for_date(provider, store, config, day, range) {
            Ok(result) => summary.results.push(result),
            Err(err) => {
                warn!(dt = %day, error = %err, "backfill day failed");
                summary.failures.push((day, err));
            }
        }
    }

    if let Some(refined) = refined {
        for result in summary.results.iter().filter(|r| !r.skipped) {
            let request = JobRequest {
                job_name: refined.job_name.to_string(),
                dt: result.dt,
            };
            match refined.trigger.start(&request) {
                Ok(run) => summary.dispatched.push(run),
                Err(err) => {
                    warn!(dt = %result.dt, error = %err, "refinement dispatch failed");
                    summary.dispatch_failures.push((result.dt, err));
                }
            }
        }
    }

    info!(
        ingested = summary.ingested_count(),
        skipped = summary.skipped_count(),
        failed = summary.failures.len(),
        dispatched = summary.dispatched.len(),
        "backfill finished"
    );
    Ok(summary)
}
