//! Date-partitioned parquet layout.
//!
//! One ingested day lives at `{prefix}/dt=YYYY-MM-DD/data.parquet`.
//! Writes are idempotent: re-running a day overwrites the same key, so
//! the lake never accumulates duplicate partitions for one date.

use crate::error::IngestError;
use crate::store::ObjectStore;
use chrono::NaiveDate;
use polars::prelude::*;
use std::io::Cursor;
use thiserror::Error;

/// File name of the quote table inside a partition.
pub const RAW_OBJECT_NAME: &str = "data.parquet";

/// Object key for the partition holding `dt`.
pub fn partition_key(prefix: &str, dt: NaiveDate) -> String {
    format!("{prefix}/dt={dt}/{RAW_OBJECT_NAME}")
}

/// Why an object key does not name a quote partition.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyParseError {
    #[error("key '{key}' is not under prefix '{prefix}'")]
    WrongPrefix { key: String, prefix: String },
    #[error("key '{key}' has no dt=YYYY-MM-DD segment")]
    MissingDtSegment { key: String },
    #[error("key '{key}' has unparseable partition date '{value}'")]
    BadDate { key: String, value: String },
    #[error("key '{key}' does not end in a single object name")]
    MissingObjectName { key: String },
}

/// Extract the partition date from an object key.
///
/// Accepts exactly `{prefix}/dt=YYYY-MM-DD/{object}`; anything else is
/// rejected with a reason. Keys for other prefixes, nested objects, or
/// malformed dates must never dispatch downstream work.
pub fn parse_partition_key(key: &str, expected_prefix: &str) -> Result<NaiveDate, KeyParseError> {
    let rest = key
        .strip_prefix(expected_prefix)
        .and_then(|r| r.strip_prefix('/'))
        .ok_or_else(|| KeyParseError::WrongPrefix {
            key: key.to_string(),
            prefix: expected_prefix.to_string(),
        })?;

    let (dt_segment, object) = rest.split_once('/').ok_or_else(|| {
        KeyParseError::MissingDtSegment {
            key: key.to_string(),
        }
    })?;

    let value = dt_segment
        .strip_prefix("dt=")
        .ok_or_else(|| KeyParseError::MissingDtSegment {
            key: key.to_string(),
        })?;

    // Exactly YYYY-MM-DD: chrono would otherwise accept unpadded or
    // sign-prefixed year forms.
    let parsed = if is_iso_date_shape(value) {
        NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
    } else {
        None
    };
    let dt = parsed.ok_or_else(|| KeyParseError::BadDate {
        key: key.to_string(),
        value: value.to_string(),
    })?;

    if object.is_empty() || object.contains('/') {
        return Err(KeyParseError::MissingObjectName {
            key: key.to_string(),
        });
    }

    Ok(dt)
}

/// Ten ASCII bytes in `\d{4}-\d{2}-\d{2}` positions.
fn is_iso_date_shape(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 10
        && bytes.iter().enumerate().all(|(i, &b)| match i {
            4 | 7 => b == b'-',
            _ => b.is_ascii_digit(),
        })
}

/// Write a quote table to its partition, returning the object URI.
pub fn write_partition(
    store: &dyn ObjectStore,
    prefix: &str,
    table: &DataFrame,
    dt: NaiveDate,
) -> Result<String, IngestError> {
    if table.height() == 0 {
        return Err(IngestError::Table(
            "refusing to write an empty partition".to_string(),
        ));
    }

    let key = partition_key(prefix, dt);
    let bytes = frame_to_parquet_bytes(table)?;
    store
        .put(&key, &bytes)
        .map_err(|source| IngestError::StorageWrite {
            key: key.clone(),
            source,
        })?;

    Ok(store.uri(&key))
}

/// Serialize a frame to parquet in memory.
pub fn frame_to_parquet_bytes(table: &DataFrame) -> Result<Vec<u8>, IngestError> {
    let mut df = table.clone();
    let mut buf: Vec<u8> = Vec::new();
    ParquetWriter::new(&mut buf)
        .finish(&mut df)
        .map_err(|e| IngestError::Table(e.to_string()))?;
    Ok(buf)
}

/// Deserialize parquet bytes back into a frame.
pub fn parquet_bytes_to_frame(bytes: &[u8]) -> Result<DataFrame, IngestError> {
    ParquetReader::new(Cursor::new(bytes))
        .finish()
        .map_err(|e| IngestError::Table(e.to_string()))
}
