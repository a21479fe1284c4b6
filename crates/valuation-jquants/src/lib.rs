#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/valuation/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! J-Quants fundamentals provider.
//!
//! This crate implements [`StatementProvider`] for the
//! [J-Quants](https://jpx-jquants.com/) financial summary endpoint
//! (`GET {base}/fins/summary?code=...`).
//!
//! The first request is retried according to the configured [`RetryPolicy`].
//! Follow-up pages are requested while the response carries a
//! `pagination_key`; a failing page ends the walk and keeps what was already
//! collected.
//!
//! # Usage
//!
//! ```rust,ignore
//! use valuation_core::{EngineConfig, SecuritiesCode, StatementProvider};
//! use valuation_jquants::JQuantsProvider;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = EngineConfig::from_env()?;
//!     let provider = JQuantsProvider::new(&config)?;
//!
//!     let bundle = provider.fetch_statements(&SecuritiesCode::new("7203")).await;
//!     println!("{} PL records", bundle.profit_loss.len());
//!
//!     Ok(())
//! }
//! ```

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, error, warn};
use valuation_core::{
    DataError, DataProvider, EngineConfig, JQuantsConfig, RawRecord, Result, RetryPolicy,
    SecuritiesCode, StatementBundle, StatementProvider,
};

/// Provider name used in logs and errors.
const PROVIDER_NAME: &str = "J-Quants";

/// Financial summary endpoint, relative to the base URL.
const SUMMARY_ENDPOINT: &str = "fins/summary";

/// Header carrying the API key.
const API_KEY_HEADER: &str = "x-api-key";

/// One page of the financial summary response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SummaryPage {
    /// Disclosure records on this page.
    #[serde(default)]
    pub data: Vec<RawRecord>,
    /// Token for the next page, absent on the last page.
    #[serde(default)]
    pub pagination_key: Option<String>,
}

impl SummaryPage {
    /// Creates a final page.
    #[must_use]
    pub fn last(data: Vec<RawRecord>) -> Self {
        Self {
            data,
            pagination_key: None,
        }
    }

    /// Creates a page followed by another one.
    #[must_use]
    pub fn with_next(data: Vec<RawRecord>, key: impl Into<String>) -> Self {
        Self {
            data,
            pagination_key: Some(key.into()),
        }
    }

    fn next_key(&self) -> Option<&str> {
        self.pagination_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
    }
}

/// Single-request transport for the financial summary endpoint.
///
/// One call is one HTTP request. Retries and pagination are handled by
/// [`JQuantsProvider`], so tests can script responses page by page.
#[async_trait]
pub trait SummaryTransport: Send + Sync + fmt::Debug {
    /// Requests one page for `code`, continuing from `pagination_key` if given.
    async fn get_page(
        &self,
        code: &SecuritiesCode,
        pagination_key: Option<&str>,
    ) -> Result<SummaryPage>;
}

/// [`SummaryTransport`] over HTTPS with `reqwest`.
#[derive(Clone)]
pub struct HttpSummaryTransport {
    client: Client,
    config: JQuantsConfig,
}

impl fmt::Debug for HttpSummaryTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpSummaryTransport")
            .field("base_url", &self.config.base_url)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl HttpSummaryTransport {
    /// Creates a transport with a client honouring the configured timeout.
    pub fn new(config: &JQuantsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DataError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self::with_client(client, config.clone()))
    }

    /// Creates a transport with a custom HTTP client.
    #[must_use]
    pub fn with_client(client: Client, config: JQuantsConfig) -> Self {
        Self { client, config }
    }

    /// Full URL of the summary endpoint.
    fn url(&self) -> String {
        format!("{}/{SUMMARY_ENDPOINT}", self.config.base_url)
    }

    /// Builds the GET request for one page.
    fn request(&self, code: &SecuritiesCode, pagination_key: Option<&str>) -> RequestBuilder {
        let mut params = vec![("code", code.as_str())];
        if let Some(key) = pagination_key {
            params.push(("pagination_key", key));
        }
        self.client
            .get(self.url())
            .query(&params)
            .header(API_KEY_HEADER, &self.config.api_key)
    }
}

#[async_trait]
impl SummaryTransport for HttpSummaryTransport {
    async fn get_page(
        &self,
        code: &SecuritiesCode,
        pagination_key: Option<&str>,
    ) -> Result<SummaryPage> {
        debug!(code = %code, paginated = pagination_key.is_some(), "J-Quants request");

        let response = self
            .request(code, pagination_key)
            .send()
            .await
            .map_err(|e| DataError::Network(e.to_string()))?;

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return Err(DataError::RateLimited {
                provider: PROVIDER_NAME.to_string(),
                retry_after: None,
            });
        }
        if status != StatusCode::OK {
            return Err(DataError::HttpStatus {
                provider: PROVIDER_NAME.to_string(),
                status: status.as_u16(),
            });
        }

        let text = response
            .text()
            .await
            .map_err(|e| DataError::Network(e.to_string()))?;

        serde_json::from_str(&text).map_err(|e| {
            let head: String = text.chars().take(200).collect();
            DataError::Parse(format!("{e}: {head}"))
        })
    }
}

/// J-Quants statement provider.
///
/// Generic over its transport so tests can substitute scripted responses.
#[derive(Debug, Clone)]
pub struct JQuantsProvider<T = HttpSummaryTransport> {
    transport: T,
    retry: RetryPolicy,
}

impl JQuantsProvider {
    /// Creates a provider talking to the configured endpoint.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let transport = HttpSummaryTransport::new(&config.jquants)?;
        Ok(Self::with_transport(transport, config.retry))
    }
}

impl<T: SummaryTransport> JQuantsProvider<T> {
    /// Creates a provider over an arbitrary transport.
    #[must_use]
    pub fn with_transport(transport: T, retry: RetryPolicy) -> Self {
        Self { transport, retry }
    }

    /// Returns the underlying transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// Collects every raw record for `code`, in response order.
    ///
    /// Only the first request is retried. Once it succeeds, pages are appended
    /// until one arrives without a key; a failing page stops the walk and the
    /// pages gathered so far are returned.
    pub async fn fetch_raw(&self, code: &SecuritiesCode) -> Result<Vec<RawRecord>> {
        let first = self
            .retry
            .run(PROVIDER_NAME, |_| self.transport.get_page(code, None))
            .await?;

        let mut next_key = first.next_key().map(str::to_string);
        let mut records = first.data;
        let mut pages = 1usize;
        let mut requested = HashSet::new();

        while let Some(key) = next_key.take() {
            if !requested.insert(key.clone()) {
                warn!(code = %code, key = %key, "Pagination key repeated, stopping");
                break;
            }
            match self.transport.get_page(code, Some(&key)).await {
                Ok(page) => {
                    pages += 1;
                    next_key = page.next_key().map(str::to_string);
                    records.extend(page.data);
                }
                Err(e) => {
                    warn!(
                        code = %code,
                        pages,
                        error = %e,
                        "Pagination request failed, keeping collected pages"
                    );
                    break;
                }
            }
        }

        debug!(code = %code, pages, records = records.len(), "J-Quants fetch complete");
        Ok(records)
    }
}

impl<T: SummaryTransport> DataProvider for JQuantsProvider<T> {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn description(&self) -> &str {
        "J-Quants - Financial statement summaries for Japanese listed companies"
    }
}

#[async_trait]
impl<T: SummaryTransport> StatementProvider for JQuantsProvider<T> {
    async fn fetch_statements(&self, code: &SecuritiesCode) -> StatementBundle {
        if code.is_empty() {
            debug!("Empty code, skipping statement fetch");
            return StatementBundle::empty();
        }

        match self.fetch_raw(code).await {
            Ok(records) => StatementBundle::from_raw_records(&records),
            Err(e) => {
                error!(code = %code, error = %e, "Statement fetch failed");
                StatementBundle::empty()
            }
        }
    }
}
