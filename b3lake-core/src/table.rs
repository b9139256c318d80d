//! Canonical quote table schema and row conversions.

use crate::error::IngestError;
use chrono::NaiveDate;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

pub const COL_DATE: &str = "date";
pub const COL_TICKER: &str = "ticker";
pub const COL_OPEN: &str = "open";
pub const COL_HIGH: &str = "high";
pub const COL_LOW: &str = "low";
pub const COL_CLOSE: &str = "close";
pub const COL_ADJ_CLOSE: &str = "adj_close";
pub const COL_VOLUME: &str = "volume";

/// Columns a raw provider frame must supply. `adj_close` is optional and
/// defaulted from `close` during normalization.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    COL_DATE, COL_TICKER, COL_OPEN, COL_HIGH, COL_LOW, COL_CLOSE, COL_VOLUME,
];

/// Canonical column order of a normalized partition.
pub const COLUMN_ORDER: [&str; 8] = [
    COL_DATE,
    COL_TICKER,
    COL_OPEN,
    COL_HIGH,
    COL_LOW,
    COL_CLOSE,
    COL_ADJ_CLOSE,
    COL_VOLUME,
];

/// One daily quote for one ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteRow {
    pub date: NaiveDate,
    pub ticker: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub adj_close: f64,
    pub volume: i64,
}

/// Expected schema of a normalized quote table.
pub struct QuoteSchema;

impl QuoteSchema {
    pub fn schema() -> Schema {
        Schema::from_iter(vec![
            Field::new(COL_DATE.into(), DataType::Date),
            Field::new(COL_TICKER.into(), DataType::String),
            Field::new(COL_OPEN.into(), DataType::Float64),
            Field::new(COL_HIGH.into(), DataType::Float64),
            Field::new(COL_LOW.into(), DataType::Float64),
            Field::new(COL_CLOSE.into(), DataType::Float64),
            Field::new(COL_ADJ_CLOSE.into(), DataType::Float64),
            Field::new(COL_VOLUME.into(), DataType::Int64),
        ])
    }

    /// Every required column absent from `df`, in canonical order.
    pub fn missing_columns(df: &DataFrame) -> Vec<String> {
        let actual = df.schema();
        REQUIRED_COLUMNS
            .iter()
            .filter(|name| !actual.contains(name))
            .map(|name| name.to_string())
            .collect()
    }
}

/// Build a canonical DataFrame from quote rows.
pub fn rows_to_dataframe(rows: &[QuoteRow]) -> Result<DataFrame, IngestError> {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
    let dates: Vec<i32> = rows
        .iter()
        .map(|r| (r.date - epoch).num_days() as i32)
        .collect();
    let tickers: Vec<String> = rows.iter().map(|r| r.ticker.clone()).collect();
    let opens: Vec<f64> = rows.iter().map(|r| r.open).collect();
    let highs: Vec<f64> = rows.iter().map(|r| r.high).collect();
    let lows: Vec<f64> = rows.iter().map(|r| r.low).collect();
    let closes: Vec<f64> = rows.iter().map(|r| r.close).collect();
    let adj_closes: Vec<f64> = rows.iter().map(|r| r.adj_close).collect();
    let volumes: Vec<i64> = rows.iter().map(|r| r.volume).collect();

    DataFrame::new(vec![
        Column::new(COL_DATE.into(), dates)
            .cast(&DataType::Date)
            .map_err(|e| IngestError::Table(format!("date cast: {e}")))?,
        Column::new(COL_TICKER.into(), tickers),
        Column::new(COL_OPEN.into(), opens),
        Column::new(COL_HIGH.into(), highs),
        Column::new(COL_LOW.into(), lows),
        Column::new(COL_CLOSE.into(), closes),
        Column::new(COL_ADJ_CLOSE.into(), adj_closes),
        Column::new(COL_VOLUME.into(), volumes),
    ])
    .map_err(|e| IngestError::Table(format!("dataframe creation: {e}")))
}

/// Read a canonical DataFrame back into quote rows.
///
/// `date` and `ticker` must be non-null in every row; numeric nulls fall
/// back to NaN (prices) or zero (volume).
pub fn dataframe_to_rows(df: &DataFrame) -> Result<Vec<QuoteRow>, IngestError> {
    let map_err = |e: PolarsError| IngestError::Table(format!("column read: {e}"));

    let date_ca = df
        .column(COL_DATE)
        .map_err(map_err)?
        .date()
        .map_err(|e| IngestError::Table(format!("date column type: {e}")))?;
    let ticker_ca = df
        .column(COL_TICKER)
        .map_err(map_err)?
        .str()
        .map_err(|e| IngestError::Table(format!("ticker column type: {e}")))?;
    let open_ca = df.column(COL_OPEN).map_err(map_err)?.f64().map_err(map_err)?;
    let high_ca = df.column(COL_HIGH).map_err(map_err)?.f64().map_err(map_err)?;
    let low_ca = df.column(COL_LOW).map_err(map_err)?.f64().map_err(map_err)?;
    let close_ca = df
        .column(COL_CLOSE)
        .map_err(map_err)?
        .f64()
        .map_err(map_err)?;
    let adj_ca = df
        .column(COL_ADJ_CLOSE)
        .map_err(map_err)?
        .f64()
        .map_err(map_err)?;
    let volume_ca = df
        .column(COL_VOLUME)
        .map_err(map_err)?
        .i64()
        .map_err(map_err)?;

    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap();
    let n = df.height();
    let mut rows = Vec::with_capacity(n);

    for i in 0..n {
        let date_days = date_ca
            .get(i)
            .ok_or_else(|| IngestError::Table(format!("null date at row {i}")))?;
        let ticker = ticker_ca
            .get(i)
            .ok_or_else(|| IngestError::Table(format!("null ticker at row {i}")))?;

        rows.push(QuoteRow {
            date: epoch + chrono::Duration::days(date_days as i64),
            ticker: ticker.to_string(),
            open: open_ca.get(i).unwrap_or(f64::NAN),
            high: high_ca.get(i).unwrap_or(f64::NAN),
            low: low_ca.get(i).unwrap_or(f64::NAN),
            close: close_ca.get(i).unwrap_or(f64::NAN),
            adj_close: adj_ca.get(i).unwrap_or(f64::NAN),
            volume: volume_ca.get(i).unwrap_or(0),
        });
    }

    Ok(rows)
}

/// Small fixed table shared by tests across the crate.
#[cfg(test)]
pub(crate) fn sample_rows() -> Vec<QuoteRow> {
    vec![
        QuoteRow {
            date: NaiveDate::from_ymd_opt(2026, 2, 20).unwrap(),
            ticker: "AZUL4.SA".into(),
            open: 12.1,
            high: 12.8,
            low: 11.9,
            close: 12.5,
            adj_close: 12.5,
            volume: 1_500_000,
        },
        QuoteRow {
            date: NaiveDate::from_ymd_opt(2026, 2, 20).unwrap(),
            ticker: "GOLL4.SA".into(),
            open: 7.4,
            high: 7.9,
            low: 7.3,
            close: 7.8,
            adj_close: 7.8,
            volume: 2_200_000,
        },
    ]
}
