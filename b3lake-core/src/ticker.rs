//! Ticker canonicalization.
//!
//! User-facing symbols are uppercased and suffixed with the provider's
//! market suffix (`GOLL4` becomes `GOLL4.SA`). Symbols that already carry
//! a suffix, or index symbols starting with `^`, pass through untouched.

use crate::error::IngestError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Market suffix the quote provider expects on B3 symbols.
pub const PROVIDER_SUFFIX: &str = ".SA";

/// A canonical, provider-addressable ticker symbol.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ticker(String);

impl Ticker {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Ticker {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Canonicalize a list of user-supplied ticker strings.
///
/// Trims whitespace, uppercases, appends [`PROVIDER_SUFFIX`] when the symbol
/// has no suffix of its own, and collapses duplicates while preserving the
/// order of first appearance.
///
/// Fails on an empty input list and on tokens with no alphanumeric
/// characters.
pub fn resolve<S: AsRef<str>>(raw: &[S]) -> Result<Vec<Ticker>, IngestError> {
    if raw.is_empty() {
        return Err(IngestError::InvalidTicker {
            reason: "ticker list is empty".into(),
        });
    }

    let mut out: Vec<Ticker> = Vec::with_capacity(raw.len());
    for token in raw {
        let trimmed = token.as_ref().trim();
        if !trimmed.chars().any(|c| c.is_ascii_alphanumeric()) {
            return Err(IngestError::InvalidTicker {
                reason: format!("'{trimmed}' has no alphanumeric characters"),
            });
        }

        let upper = trimmed.to_ascii_uppercase();
        let canonical = if upper.contains('.') || upper.starts_with('^') {
            upper
        } else {
            format!("{upper}{PROVIDER_SUFFIX}")
        };

        let ticker = Ticker(canonical);
        if !out.contains(&ticker) {
            out.push(ticker);
        }
    }

    Ok(out)
}
