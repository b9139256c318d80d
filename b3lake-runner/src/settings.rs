//! Runtime settings for the ingestion pipeline.
//!
//! Sources, lowest to highest precedence: built-in defaults, a TOML
//! settings file, then `B3LAKE_*` environment variables.

use b3lake_core::provider::{DEFAULT_INTERVAL, DEFAULT_PERIOD};
use b3lake_core::retry::{Jitter, RetryPolicy};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Airline-sector B3 tickers ingested when nothing else is configured.
pub const DEFAULT_TICKERS: [&str; 4] = ["GOLL4", "AZUL4", "EMBR3", "EVEB31"];

/// Prefix of the raw zone inside the store.
pub const DEFAULT_PREFIX: &str = "raw";

/// Downstream job started when a raw partition lands.
pub const DEFAULT_JOB_NAME: &str = "b3-refined-quotes";

const DEFAULT_STORE_ROOT: &str = "data/b3lake";

/// Errors from loading a settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("read settings file '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("parse settings TOML: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Tickers to ingest, in raw user form (suffix optional).
    pub tickers: Vec<String>,
    /// Provider window for daily runs. Small on purpose so a D-1 quote
    /// is always inside it.
    pub period: String,
    pub interval: String,
    /// Filesystem root of the object store.
    pub store_root: PathBuf,
    /// Key prefix of the raw zone.
    pub prefix: String,
    /// Name of the refined job dispatched on partition arrival.
    pub job_name: String,
    pub retry: RetrySettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            tickers: DEFAULT_TICKERS.iter().map(|s| s.to_string()).collect(),
            period: DEFAULT_PERIOD.to_string(),
            interval: DEFAULT_INTERVAL.to_string(),
            store_root: PathBuf::from(DEFAULT_STORE_ROOT),
            prefix: DEFAULT_PREFIX.to_string(),
            job_name: DEFAULT_JOB_NAME.to_string(),
            retry: RetrySettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse settings from a TOML string. Absent fields keep defaults.
    pub fn from_toml(content: &str) -> Result<Self, SettingsError> {
        let mut settings: Settings = toml::from_str(content)?;
        settings.prefix = sanitize_prefix(&settings.prefix);
        Ok(settings)
    }

    /// Overlay `B3LAKE_*` environment variables.
    pub fn apply_env(&mut self) {
        self.apply_env_map(std::env::vars());
    }

    fn apply_env_map<I: IntoIterator<Item = (String, String)>>(&mut self, vars: I) {
        for (key, value) in vars {
            match key.as_str() {
                "B3LAKE_TICKERS" => {
                    let tickers: Vec<String> = value
                        .split(',')
                        .map(|t| t.trim().to_string())
                        .filter(|t| !t.is_empty())
                        .collect();
                    if !tickers.is_empty() {
                        self.tickers = tickers;
                    }
                }
                "B3LAKE_STORE_ROOT" => self.store_root = PathBuf::from(value),
                "B3LAKE_PREFIX" => self.prefix = sanitize_prefix(&value),
                "B3LAKE_JOB_NAME" => self.job_name = value,
                _ => {}
            }
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry.to_policy()
    }
}

/// Retry knobs in file-friendly units.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RetrySettings {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub jitter_fraction: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 1_000,
            jitter_fraction: 0.5,
        }
    }
}

impl RetrySettings {
    pub fn to_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            jitter: if self.jitter_fraction <= 0.0 {
                Jitter::None
            } else {
                Jitter::Fraction(self.jitter_fraction)
            },
        }
    }
}

/// Normalize a raw-zone prefix into a safe key prefix.
///
/// Strips whitespace and surrounding slashes. Empty values and the
/// `unsaved*` family of placeholder names fall back to [`DEFAULT_PREFIX`].
pub fn sanitize_prefix(raw: &str) -> String {
    let value = raw.trim().trim_matches('/');
    if value.is_empty() || value.to_ascii_lowercase().starts_with("unsaved") {
        DEFAULT_PREFIX.to_string()
    } else {
        value.to_string()
    }
}
