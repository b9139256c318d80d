//! Raw quote frame normalization.
//!
//! Turns whatever a provider returned into the canonical quote table:
//!
//! - validates that every required column is present
//! - coerces `date` and `ticker`, dropping rows where coercion fails
//! - optionally keeps only rows for one target date
//! - defaults `adj_close` to `close` when the provider omitted it
//! - casts numeric columns, fixes column order, sorts and dedupes
//!
//! An output with zero rows is an error here, never an empty table: a
//! partition write downstream must always carry data.

use crate::error::IngestError;
use crate::provider::{QuoteProvider, QuoteRequest};
use crate::table::{
    rows_to_dataframe, QuoteRow, QuoteSchema, COL_ADJ_CLOSE, COL_CLOSE, COL_DATE, COL_HIGH,
    COL_LOW, COL_OPEN, COL_TICKER, COL_VOLUME,
};
use crate::ticker::Ticker;
use chrono::NaiveDate;
use polars::prelude::*;
use tracing::warn;

/// A normalized quote table plus how many raw rows were discarded.
#[derive(Debug, Clone)]
pub struct NormalizedQuotes {
    pub table: DataFrame,
    pub dropped_rows: usize,
}

/// Fetch quotes for `request` and normalize the resulting frame.
///
/// With `target_dt` set, rows outside that date are filtered away.
pub fn fetch_and_normalize(
    provider: &dyn QuoteProvider,
    request: &QuoteRequest,
    target_dt: Option<NaiveDate>,
) -> Result<NormalizedQuotes, IngestError> {
    let raw = provider.fetch(request)?;
    normalize_frame(raw, target_dt, &request.tickers)
}

/// Normalize a raw provider frame into the canonical quote table.
pub fn normalize_frame(
    raw: DataFrame,
    target_dt: Option<NaiveDate>,
    tickers: &[Ticker],
) -> Result<NormalizedQuotes, IngestError> {
    let missing = QuoteSchema::missing_columns(&raw);
    if !missing.is_empty() {
        return Err(IngestError::SchemaValidation { missing });
    }

    let mut work = raw;
    let has_adj = work.column(COL_ADJ_CLOSE).is_ok();

    // Coerce every column leniently so bad values turn into nulls
    // instead of failing the whole frame.
    let mut casts = vec![
        (COL_DATE, DataType::Date),
        (COL_TICKER, DataType::String),
        (COL_OPEN, DataType::Float64),
        (COL_HIGH, DataType::Float64),
        (COL_LOW, DataType::Float64),
        (COL_CLOSE, DataType::Float64),
        (COL_VOLUME, DataType::Int64),
    ];
    if has_adj {
        casts.push((COL_ADJ_CLOSE, DataType::Float64));
    }
    for (name, dtype) in casts {
        let coerced = work
            .column(name)
            .map_err(|e| IngestError::Table(e.to_string()))?
            .cast(&dtype)
            .map_err(|e| IngestError::Table(e.to_string()))?;
        work.with_column(coerced)
            .map_err(|e| IngestError::Table(e.to_string()))?;
    }

    let (mut rows, dropped_rows) = collect_candidate_rows(&work, has_adj)?;
    if dropped_rows > 0 {
        warn!(dropped_rows, "dropped rows with uncoercible date or ticker");
    }
    if rows.is_empty() {
        return Err(empty(target_dt, tickers));
    }

    if let Some(dt) = target_dt {
        rows.retain(|row| row.date == dt);
        if rows.is_empty() {
            return Err(empty(Some(dt), tickers));
        }
    }

    let table = rows_to_dataframe(&rows)?
        .lazy()
        .sort(
            [COL_TICKER, COL_DATE],
            SortMultipleOptions::default()
                .with_order_descending_multi([false, false])
                .with_maintain_order(true),
        )
        .unique_stable(
            Some(vec![COL_TICKER.into(), COL_DATE.into()]),
            UniqueKeepStrategy::First,
        )
        .collect()
        .map_err(|e| IngestError::Table(e.to_string()))?;

    Ok(NormalizedQuotes {
        table,
        dropped_rows,
    })
}

/// Extract rows from a coerced frame, dropping those whose date or
/// ticker is null. Null numeric values become NaN (volume becomes 0).
fn collect_candidate_rows(
    df: &DataFrame,
    has_adj: bool,
) -> Result<(Vec<QuoteRow>, usize), IngestError> {
    let column = |name: &str| df.column(name).map_err(|e| IngestError::Table(e.to_string()));

    let date_ca = column(COL_DATE)?
        .date()
        .map_err(|e| IngestError::Table(e.to_string()))?;
    let ticker_ca = column(COL_TICKER)?
        .str()
        .map_err(|e| IngestError::Table(e.to_string()))?;
    let open_ca = column(COL_OPEN)?
        .f64()
        .map_err(|e| IngestError::Table(e.to_string()))?;
    let high_ca = column(COL_HIGH)?
        .f64()
        .map_err(|e| IngestError::Table(e.to_string()))?;
    let low_ca = column(COL_LOW)?
        .f64()
        .map_err(|e| IngestError::Table(e.to_string()))?;
    let close_ca = column(COL_CLOSE)?
        .f64()
        .map_err(|e| IngestError::Table(e.to_string()))?;
    let volume_ca = column(COL_VOLUME)?
        .i64()
        .map_err(|e| IngestError::Table(e.to_string()))?;
    let adj_ca = if has_adj {
        Some(
            column(COL_ADJ_CLOSE)?
                .f64()
                .map_err(|e| IngestError::Table(e.to_string()))?,
        )
    } else {
        None
    };

    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
    let mut rows = Vec::with_capacity(df.height());
    let mut dropped = 0usize;

    for i in 0..df.height() {
        let days = match date_ca.get(i) {
            Some(d) => d,
            None => {
                dropped += 1;
                continue;
            }
        };
        let ticker = match ticker_ca.get(i) {
            Some(t) => t,
            None => {
                dropped += 1;
                continue;
            }
        };

        let close = close_ca.get(i).unwrap_or(f64::NAN);
        let adj_close = match adj_ca {
            Some(ca) => ca.get(i).unwrap_or(f64::NAN),
            None => close,
        };

        rows.push(QuoteRow {
            date: epoch + chrono::Duration::days(days as i64),
            ticker: ticker.to_string(),
            open: open_ca.get(i).unwrap_or(f64::NAN),
            high: high_ca.get(i).unwrap_or(f64::NAN),
            low: low_ca.get(i).unwrap_or(f64::NAN),
            close,
            adj_close,
            volume: volume_ca.get(i).unwrap_or(0),
        });
    }

    Ok((rows, dropped))
}

fn empty(dt: Option<NaiveDate>, tickers: &[Ticker]) -> IngestError {
    IngestError::EmptyData {
        dt,
        tickers: tickers.iter().map(|t| t.to_string()).collect(),
    }
}
