#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/valuation/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Yahoo Finance price provider.
//!
//! This crate implements [`PriceProvider`] on top of Yahoo Finance's chart API.
//! A lookup downloads a short daily history and reads the most recent close;
//! an empty history counts as a failed attempt and is retried like a network
//! error.
//!
//! # Example
//!
//! ```no_run
//! use valuation_core::{EngineConfig, PriceProvider, Ticker};
//! use valuation_yahoo::YahooProvider;
//!
//! # async fn example() -> valuation_core::Result<()> {
//! let config = EngineConfig::new("unused-for-prices");
//! let provider = YahooProvider::new(&config)?;
//!
//! if let Some(quote) = provider.fetch_price(&Ticker::new("7203.T")).await {
//!     println!("Close: {}", quote.close);
//! }
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, TimeZone, Utc};
use polars::prelude::*;
use serde::Deserialize;
use std::fmt;
use tracing::{debug, error};
use valuation_core::{
    DataError, DataProvider, EngineConfig, PriceProvider, PriceQuote, Result, RetryPolicy, Ticker,
    YahooConfig,
};

/// Provider name used in logs and errors.
const PROVIDER_NAME: &str = "Yahoo Finance";

/// User agent for HTTP requests.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// Days between 0001-01-01 (CE day 1) and the Unix epoch.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Source of daily price histories.
///
/// One call is one request. The returned frame has at least a `date` column
/// (Date) and a `close` column (Float64, nullable). Retries are handled by
/// [`YahooProvider`].
#[async_trait]
pub trait ChartTransport: Send + Sync + fmt::Debug {
    /// Downloads the recent daily history for `ticker`.
    async fn fetch_history(&self, ticker: &Ticker) -> Result<DataFrame>;
}

/// Builds a history frame from parallel date and close vectors.
pub fn history_frame(dates: &[NaiveDate], closes: Vec<Option<f64>>) -> Result<DataFrame> {
    let days: Vec<i32> = dates
        .iter()
        .map(|d| d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
        .collect();

    let date_col = Column::new("date".into(), days)
        .cast(&DataType::Date)
        .map_err(|e| DataError::Parse(e.to_string()))?;

    DataFrame::new(vec![date_col, Column::new("close".into(), closes)])
        .map_err(|e| DataError::Parse(e.to_string()))
}

/// Reads the most recent finite close out of a history frame.
///
/// Rows are expected in ascending date order. Trailing rows without a close
/// (Yahoo leaves the current session empty until it settles) are skipped.
pub fn latest_close(ticker: &Ticker, history: &DataFrame) -> Result<PriceQuote> {
    if history.height() == 0 {
        return Err(DataError::DataNotAvailable(ticker.to_string()));
    }

    let closes = history
        .column("close")
        .map_err(|e| DataError::MissingField(e.to_string()))?
        .as_materialized_series()
        .f64()
        .map_err(|e| DataError::Parse(e.to_string()))?
        .clone();

    let days = history
        .column("date")
        .map_err(|e| DataError::MissingField(e.to_string()))?
        .cast(&DataType::Int32)
        .map_err(|e| DataError::Parse(e.to_string()))?;
    let days = days
        .as_materialized_series()
        .i32()
        .map_err(|e| DataError::Parse(e.to_string()))?
        .clone();

    let (idx, close) = (0..closes.len())
        .rev()
        .find_map(|i| closes.get(i).filter(|c| c.is_finite()).map(|c| (i, c)))
        .ok_or_else(|| DataError::DataNotAvailable(ticker.to_string()))?;

    let quote = PriceQuote::new(close);
    let as_of = days
        .get(idx)
        .and_then(|d| NaiveDate::from_num_days_from_ce_opt(d + UNIX_EPOCH_DAYS_FROM_CE));

    Ok(match as_of {
        Some(date) => quote.with_date(date),
        None => quote,
    })
}

/// [`ChartTransport`] over Yahoo's v8 chart endpoint.
#[derive(Debug, Clone)]
pub struct HttpChartTransport {
    client: reqwest::Client,
    config: YahooConfig,
}

impl HttpChartTransport {
    /// Creates a transport with a client honouring the configured timeout.
    pub fn new(config: &YahooConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(|e| DataError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client, config.clone()))
    }

    /// Creates a transport with a custom HTTP client.
    #[must_use]
    pub fn with_client(client: reqwest::Client, config: YahooConfig) -> Self {
        Self { client, config }
    }

    /// Build the chart API URL for a ticker.
    fn build_chart_url(&self, ticker: &Ticker) -> String {
        format!(
            "{}/{}?range={}&interval=1d",
            self.config.base_url,
            ticker.as_str(),
            self.config.range
        )
    }
}

/// Parse a chart response into a history frame.
fn parse_chart_response(ticker: &Ticker, response: ChartResponse) -> Result<DataFrame> {
    if let Some(error) = response.chart.error {
        return Err(DataError::DataNotAvailable(format!(
            "{ticker}: {}: {}",
            error.code, error.description
        )));
    }

    let result = response
        .chart
        .result
        .unwrap_or_default()
        .into_iter()
        .next()
        .ok_or_else(|| DataError::DataNotAvailable(ticker.to_string()))?;

    let timestamps = result.timestamp.unwrap_or_default();
    if timestamps.is_empty() {
        return Err(DataError::DataNotAvailable(ticker.to_string()));
    }

    let mut closes = result
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .ok_or_else(|| DataError::Parse("Missing quote data".to_string()))?;
    closes.resize(timestamps.len(), None);

    let dates = timestamps
        .iter()
        .map(|&ts| {
            Utc.timestamp_opt(ts, 0)
                .single()
                .map(|dt| dt.date_naive())
                .ok_or_else(|| DataError::Parse(format!("invalid timestamp {ts}")))
        })
        .collect::<Result<Vec<_>>>()?;

    history_frame(&dates, closes)
}

#[async_trait]
impl ChartTransport for HttpChartTransport {
    async fn fetch_history(&self, ticker: &Ticker) -> Result<DataFrame> {
        let url = self.build_chart_url(ticker);
        debug!("Fetching price history: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DataError::Network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(DataError::RateLimited {
                provider: PROVIDER_NAME.to_string(),
                retry_after: None,
            });
        }

        if !response.status().is_success() {
            return Err(DataError::HttpStatus {
                provider: PROVIDER_NAME.to_string(),
                status: response.status().as_u16(),
            });
        }

        let chart_response: ChartResponse = response
            .json()
            .await
            .map_err(|e| DataError::Parse(e.to_string()))?;

        parse_chart_response(ticker, chart_response)
    }
}

/// Yahoo Finance price provider.
///
/// Generic over its transport so tests can substitute scripted histories.
#[derive(Debug, Clone)]
pub struct YahooProvider<T = HttpChartTransport> {
    transport: T,
    retry: RetryPolicy,
}

impl YahooProvider {
    /// Create a provider using the configured chart endpoint and retry policy.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let transport = HttpChartTransport::new(&config.yahoo)?;
        Ok(Self::with_transport(transport, config.retry))
    }
}

impl<T: ChartTransport> YahooProvider<T> {
    /// Create a provider over an arbitrary transport.
    #[must_use]
    pub fn with_transport(transport: T, retry: RetryPolicy) -> Self {
        Self { transport, retry }
    }

    /// Returns the underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: ChartTransport> DataProvider for YahooProvider<T> {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn description(&self) -> &str {
        "Yahoo Finance - Latest daily close from the chart API"
    }
}

#[async_trait]
impl<T: ChartTransport> PriceProvider for YahooProvider<T> {
    async fn fetch_price(&self, ticker: &Ticker) -> Option<PriceQuote> {
        if ticker.is_empty() {
            debug!("Empty ticker, skipping price fetch");
            return None;
        }

        let result = self
            .retry
            .run(PROVIDER_NAME, |_| async move {
                let history = self.transport.fetch_history(ticker).await?;
                latest_close(ticker, &history)
            })
            .await;

        match result {
            Ok(quote) => Some(quote),
            Err(e) => {
                error!(ticker = %ticker, error = %e, "Price fetch failed");
                None
            }
        }
    }
}

// ============================================================================
// Yahoo Finance API Response Types
// ============================================================================

/// Chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    result: Option<Vec<ChartData>>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
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
    #[serde(default)]
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Debug, Default)]
    struct ScriptedChart {
        responses: Mutex<VecDeque<Result<DataFrame>>>,
        calls: Mutex<usize>,
    }

    impl ScriptedChart {
        fn new(responses: Vec<Result<DataFrame>>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(0),
            }
        }

        fn calls(&self) -> usize {
            *self.calls.lock().unwrap()
        }
    }

    #[async_trait]
    impl ChartTransport for ScriptedChart {
        async fn fetch_history(&self, _ticker: &Ticker) -> Result<DataFrame> {
            *self.calls.lock().unwrap() += 1;
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(DataFrame::empty()))
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn provider(responses: Vec<Result<DataFrame>>) -> YahooProvider<ScriptedChart> {
        YahooProvider::with_transport(ScriptedChart::new(responses), RetryPolicy::immediate(3))
    }

    #[tokio::test]
    async fn test_empty_history_exhausts_attempts() {
        let provider = provider(vec![
            Ok(DataFrame::empty()),
            Ok(DataFrame::empty()),
            Ok(DataFrame::empty()),
        ]);

        let quote = provider.fetch_price(&Ticker::new("7203.T")).await;

        assert!(quote.is_none());
        assert_eq!(provider.transport().calls(), 3);
    }

    #[tokio::test]
    async fn test_stops_at_first_non_empty_history() {
        let history = history_frame(&[date(2024, 6, 3)], vec![Some(2500.0)]).unwrap();
        let provider = provider(vec![
            Err(DataError::Network("timeout".to_string())),
            Ok(history),
            Ok(DataFrame::empty()),
        ]);

        let quote = provider.fetch_price(&Ticker::new("7203.T")).await.unwrap();

        assert_eq!(quote.close, 2500.0);
        assert_eq!(quote.as_of, Some(date(2024, 6, 3)));
        assert_eq!(provider.transport().calls(), 2);
    }

    #[tokio::test]
    async fn test_empty_ticker_makes_no_requests() {
        let provider = provider(vec![]);
        assert!(provider.fetch_price(&Ticker::new("")).await.is_none());
        assert_eq!(provider.transport().calls(), 0);
    }

    #[test]
    fn test_latest_close_skips_trailing_nulls() {
        let history = history_frame(
            &[date(2024, 6, 3), date(2024, 6, 4), date(2024, 6, 5)],
            vec![Some(2500.0), Some(2510.5), None],
        )
        .unwrap();

        let quote = latest_close(&Ticker::new("7203.T"), &history).unwrap();
        assert_eq!(quote.close, 2510.5);
        assert_eq!(quote.as_of, Some(date(2024, 6, 4)));
    }

    #[test]
    fn test_latest_close_all_null() {
        let history = history_frame(&[date(2024, 6, 3)], vec![None]).unwrap();
        let err = latest_close(&Ticker::new("7203.T"), &history).unwrap_err();
        assert!(matches!(err, DataError::DataNotAvailable(_)));
    }

    #[test]
    fn test_parse_chart_response() {
        let body = r#"{
            "chart": {
                "result": [{
                    "timestamp": [1717372800, 1717459200],
                    "indicators": {"quote": [{"close": [2500.0, null]}]}
                }],
                "error": null
            }
        }"#;
        let response: ChartResponse = serde_json::from_str(body).unwrap();
        let frame = parse_chart_response(&Ticker::new("7203.T"), response).unwrap();

        assert_eq!(frame.height(), 2);
        let quote = latest_close(&Ticker::new("7203.T"), &frame).unwrap();
        assert_eq!(quote.close, 2500.0);
        assert_eq!(quote.as_of, Some(date(2024, 6, 3)));
    }

    #[test]
    fn test_parse_chart_error_and_empty_result() {
        let body = r#"{"chart": {"result": null, "error": {"code": "Not Found", "description": "No data found"}}}"#;
        let response: ChartResponse = serde_json::from_str(body).unwrap();
        assert!(parse_chart_response(&Ticker::new("0000.T"), response).is_err());

        let body = r#"{"chart": {"result": [{"indicators": {"quote": []}}], "error": null}}"#;
        let response: ChartResponse = serde_json::from_str(body).unwrap();
        let err = parse_chart_response(&Ticker::new("7203.T"), response).unwrap_err();
        assert!(matches!(err, DataError::DataNotAvailable(_)));
    }

    #[test]
    fn test_build_chart_url() {
        let transport = HttpChartTransport::new(&YahooConfig::default()).unwrap();
        let url = transport.build_chart_url(&Ticker::new("7203.T"));

        assert!(url.ends_with("/7203.T?range=5d&interval=1d"));
    }

    #[test]
    fn test_provider_info() {
        let provider = provider(vec![]);
        assert_eq!(provider.name(), "Yahoo Finance");
        assert!(!provider.description().is_empty());
    }
}
