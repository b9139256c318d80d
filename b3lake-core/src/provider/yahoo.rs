//! Yahoo Finance quote provider.
//!
//! Fetches daily OHLCV quotes from Yahoo's v8 chart API, one request per
//! ticker, and assembles them into a single raw frame. Yahoo has no
//! official API and is subject to unannounced format changes; payload
//! surprises surface as `FetchError::ResponseFormat`.

use super::{FetchError, FetchRange, QuoteProvider, QuoteRequest};
use crate::table::{rows_to_dataframe, QuoteRow};
use polars::prelude::DataFrame;
use serde::Deserialize;
use std::time::Duration;

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
    adjclose: Option<Vec<AdjCloseData>>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    open: Vec<Option<f64>>,
    high: Vec<Option<f64>>,
    low: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
    volume: Vec<Option<i64>>,
}

#[derive(Debug, Deserialize)]
struct AdjCloseData {
    adjclose: Vec<Option<f64>>,
}

/// Yahoo Finance quote provider.
pub struct YahooProvider {
    client: reqwest::blocking::Client,
}

impl YahooProvider {
    pub fn new() -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .expect("failed to build HTTP client");

        Self { client }
    }

    /// Build the chart API URL for one symbol and window.
    fn chart_url(symbol: &str, range: &FetchRange, interval: &str) -> String {
        match range {
            FetchRange::Period(period) => format!(
                "https://query2.finance.yahoo.com/v8/finance/chart/{symbol}\
                 ?range={period}&interval={interval}&includeAdjustedClose=true"
            ),
            FetchRange::Between { start, end } => {
                let start_ts = start.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp();
                let end_ts = end.and_hms_opt(23, 59, 59).unwrap().and_utc().timestamp();
                format!(
                    "https://query2.finance.yahoo.com/v8/finance/chart/{symbol}\
                     ?period1={start_ts}&period2={end_ts}&interval={interval}\
                     &includeAdjustedClose=true"
                )
            }
        }
    }

    /// Execute one chart request and decode the JSON payload.
    fn get_chart(&self, url: &str, symbol: &str) -> Result<ChartResponse, FetchError> {
        let resp = self.client.get(url).send().map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout(e.to_string())
            } else {
                FetchError::Network(e.to_string())
            }
        })?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(60);
            return Err(FetchError::RateLimited {
                retry_after_secs: retry_after,
            });
        }
        if !status.is_success() {
            // Yahoo answers 404 with a JSON body naming the unknown symbol.
            // Decode it so a single delisted ticker is distinguishable from
            // a server-side failure affecting the whole batch.
            if status == reqwest::StatusCode::NOT_FOUND {
                if let Ok(body) = resp.json::<ChartResponse>() {
                    if body.chart.error.is_some() {
                        return Err(FetchError::SymbolNotFound {
                            symbol: symbol.to_string(),
                        });
                    }
                }
            }
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        resp.json().map_err(|e| {
            FetchError::ResponseFormat(format!("decode chart response for {symbol}: {e}"))
        })
    }

    /// Apply one ticker's fetch outcome to the accumulated rows.
    ///
    /// An unknown symbol contributes no rows instead of failing the batch:
    /// the other tickers still produce a partition, and an all-symbols-failed
    /// run surfaces downstream as empty data for the day. Every other error
    /// affects the batch as a whole and aborts it.
    fn absorb_ticker_result(
        symbol: &str,
        outcome: Result<ChartResponse, FetchError>,
        rows: &mut Vec<QuoteRow>,
    ) -> Result<(), FetchError> {
        match outcome.and_then(|chart| Self::collect_rows(symbol, chart, rows)) {
            Err(FetchError::SymbolNotFound { symbol }) => {
                tracing::warn!(ticker = %symbol, "symbol not found, skipping");
                Ok(())
            }
            other => other,
        }
    }

    /// Append the rows of one chart response to `rows`.
    fn collect_rows(
        symbol: &str,
        resp: ChartResponse,
        rows: &mut Vec<QuoteRow>,
    ) -> Result<(), FetchError> {
        let result = resp.chart.result.ok_or_else(|| match resp.chart.error {
            Some(err) if err.code == "Not Found" => FetchError::SymbolNotFound {
                symbol: symbol.to_string(),
            },
            Some(err) => FetchError::ResponseFormat(format!("{}: {}", err.code, err.description)),
            None => FetchError::ResponseFormat("empty result with no error".into()),
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::ResponseFormat("result array is empty".into()))?;

        // A window with no trading sessions arrives without a timestamp
        // array. That is a legitimate empty answer, not a format change.
        let timestamps = match data.timestamp {
            Some(ts) => ts,
            None => return Ok(()),
        };

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::ResponseFormat("no quote data".into()))?;

        let adj_closes = data
            .indicators
            .adjclose
            .and_then(|v| v.into_iter().next())
            .map(|a| a.adjclose);

        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.naive_utc().date())
                .ok_or_else(|| {
                    FetchError::ResponseFormat(format!("invalid timestamp: {ts}"))
                })?;

            let open = quote.open.get(i).copied().flatten();
            let high = quote.high.get(i).copied().flatten();
            let low = quote.low.get(i).copied().flatten();
            let close = quote.close.get(i).copied().flatten();
            let volume = quote.volume.get(i).copied().flatten();
            let adj_close = adj_closes.as_ref().and_then(|v| v.get(i).copied().flatten());

            // Skip bars where all OHLCV are None (holidays/non-trading days)
            if open.is_none()
                && high.is_none()
                && low.is_none()
                && close.is_none()
                && volume.is_none()
            {
                continue;
            }

            rows.push(QuoteRow {
                date,
                ticker: symbol.to_string(),
                open: open.unwrap_or(f64::NAN),
                high: high.unwrap_or(f64::NAN),
                low: low.unwrap_or(f64::NAN),
                close: close.unwrap_or(f64::NAN),
                adj_close: adj_close.unwrap_or(f64::NAN),
                volume: volume.unwrap_or(0),
            });
        }

        Ok(())
    }
}

impl Default for YahooProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl QuoteProvider for YahooProvider {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(&self, request: &QuoteRequest) -> Result<DataFrame, FetchError> {
        let mut rows: Vec<QuoteRow> = Vec::new();

        for ticker in &request.tickers {
            let url = Self::chart_url(ticker.as_str(), &request.range, &request.interval);
            tracing::debug!(ticker = %ticker, "requesting chart data");
            let outcome = self.get_chart(&url, ticker.as_str());
            Self::absorb_ticker_result(ticker.as_str(), outcome, &mut rows)?;
        }

        rows_to_dataframe(&rows)
            .map_err(|e| FetchError::ResponseFormat(format!("assemble quote frame: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn chart_with(timestamps: Option<Vec<i64>>, quote: QuoteData) -> ChartResponse {
        ChartResponse {
            chart: ChartResult {
                result: Some(vec![ChartData {
                    timestamp: timestamps,
                    indicators: Indicators {
                        quote: vec![quote],
                        adjclose: None,
                    },
                }]),
                error: None,
            },
        }
    }

    #[test]
    fn period_url_uses_range_parameter() {
        let url = YahooProvider::chart_url(
            "GOLL4.SA",
            &FetchRange::Period("5d".into()),
            "1d",
        );
        assert!(url.contains("/chart/GOLL4.SA?"));
        assert!(url.contains("range=5d"));
        assert!(url.contains("interval=1d"));
    }

    #[test]
    fn between_url_uses_epoch_bounds() {
        let day = NaiveDate::from_ymd_opt(2026, 2, 20).unwrap();
        let url = YahooProvider::chart_url(
            "GOLL4.SA",
            &FetchRange::Between {
                start: day,
                end: day,
            },
            "1d",
        );
        assert!(url.contains("period1="));
        assert!(url.contains("period2="));
        assert!(!url.contains("range="));
    }

    #[test]
    fn collect_rows_builds_quote_rows() {
        // 2026-02-20T13:00:00Z
        let resp = chart_with(
            Some(vec![1771592400]),
            QuoteData {
                open: vec![Some(7.4)],
                high: vec![Some(7.9)],
                low: vec![Some(7.3)],
                close: vec![Some(7.8)],
                volume: vec![Some(1000)],
            },
        );

        let mut rows = Vec::new();
        YahooProvider::collect_rows("GOLL4.SA", resp, &mut rows).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].ticker, "GOLL4.SA");
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2026, 2, 20).unwrap());
        assert_eq!(rows[0].close, 7.8);
        assert!(rows[0].adj_close.is_nan());
    }

    #[test]
    fn all_null_bars_are_skipped() {
        let resp = chart_with(
            Some(vec![1771592400, 1771678800]),
            QuoteData {
                open: vec![None, Some(7.4)],
                high: vec![None, Some(7.9)],
                low: vec![None, Some(7.3)],
                close: vec![None, Some(7.8)],
                volume: vec![None, Some(1000)],
            },
        );

        let mut rows = Vec::new();
        YahooProvider::collect_rows("GOLL4.SA", resp, &mut rows).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn missing_timestamps_mean_an_empty_window() {
        let resp = chart_with(
            None,
            QuoteData {
                open: vec![],
                high: vec![],
                low: vec![],
                close: vec![],
                volume: vec![],
            },
        );

        let mut rows = Vec::new();
        YahooProvider::collect_rows("GOLL4.SA", resp, &mut rows).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn provider_reported_unknown_symbol_is_permanent() {
        let resp = ChartResponse {
            chart: ChartResult {
                result: None,
                error: Some(ChartError {
                    code: "Not Found".into(),
                    description: "No data found, symbol may be delisted".into(),
                }),
            },
        };

        let mut rows = Vec::new();
        let err = YahooProvider::collect_rows("NOPE.SA", resp, &mut rows).unwrap_err();
        assert!(matches!(err, FetchError::SymbolNotFound { .. }));
        assert!(!err.is_transient());
    }

    fn not_found_response() -> ChartResponse {
        ChartResponse {
            chart: ChartResult {
                result: None,
                error: Some(ChartError {
                    code: "Not Found".into(),
                    description: "No data found, symbol may be delisted".into(),
                }),
            },
        }
    }

    #[test]
    fn unknown_symbol_is_skipped_not_fatal() {
        let mut rows = Vec::new();
        YahooProvider::absorb_ticker_result(
            "GOLL4.SA",
            Ok(chart_with(
                Some(vec![1771592400]),
                QuoteData {
                    open: vec![Some(7.4)],
                    high: vec![Some(7.9)],
                    low: vec![Some(7.3)],
                    close: vec![Some(7.8)],
                    volume: vec![Some(1000)],
                },
            )),
            &mut rows,
        )
        .unwrap();
        YahooProvider::absorb_ticker_result("NOPE.SA", Ok(not_found_response()), &mut rows)
            .unwrap();
        YahooProvider::absorb_ticker_result(
            "GONE.SA",
            Err(FetchError::SymbolNotFound {
                symbol: "GONE.SA".into(),
            }),
            &mut rows,
        )
        .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].ticker, "GOLL4.SA");
    }

    #[test]
    fn batch_wide_failures_still_abort() {
        let mut rows = Vec::new();
        let err = YahooProvider::absorb_ticker_result(
            "GOLL4.SA",
            Err(FetchError::RateLimited {
                retry_after_secs: 60,
            }),
            &mut rows,
        )
        .unwrap_err();
        assert!(matches!(err, FetchError::RateLimited { .. }));
        assert!(rows.is_empty());
    }
}
