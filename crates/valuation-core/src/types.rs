//! Identifier and output types.
//!
//! - [`SecuritiesCode`] - Statutory code used by the fundamentals provider
//! - [`Ticker`] - Exchange-qualified symbol used by the price provider
//! - [`PriceQuote`] - Most recent close
//! - [`ValuationMetrics`] - Final valuation record

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Exchange suffix appended to Tokyo Stock Exchange tickers.
pub const TOKYO_SUFFIX: &str = ".T";

/// A statutory securities code (e.g. `7203` or the five digit `72030`).
///
/// Surrounding whitespace is trimmed on creation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SecuritiesCode(String);

impl SecuritiesCode {
    /// Creates a new code from a string.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().trim().to_string())
    }

    /// Returns the code as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true if the code is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for SecuritiesCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SecuritiesCode {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for SecuritiesCode {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// An exchange-qualified ticker such as `7203.T`.
///
/// Tickers are uppercased on creation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Ticker(String);

impl Ticker {
    /// Creates a new ticker from a string, converting to uppercase.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().trim().to_uppercase())
    }

    /// Derives a Tokyo ticker from a statutory securities code.
    ///
    /// Code lists often carry the five digit form (`72030`), sometimes read back
    /// as a float (`72030.0`). The first four characters identify the listing.
    /// Returns `None` when fewer than four characters remain.
    #[must_use]
    pub fn from_securities_code(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let code = trimmed.strip_suffix(".0").unwrap_or(trimmed);
        let prefix: String = code.chars().take(4).collect();
        if prefix.chars().count() < 4 {
            return None;
        }
        Some(Self::new(format!("{prefix}{TOKYO_SUFFIX}")))
    }

    /// Returns the ticker as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the listing code with any exchange suffix removed.
    #[must_use]
    pub fn code(&self) -> &str {
        self.0.split('.').next().unwrap_or_default()
    }

    /// Returns the listing code as a [`SecuritiesCode`] for fundamentals lookups.
    #[must_use]
    pub fn securities_code(&self) -> SecuritiesCode {
        SecuritiesCode::new(self.code())
    }

    /// Returns true if the ticker is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Ticker {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Ticker {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Ticker {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// The most recent available closing price for a ticker.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Closing price.
    pub close: f64,
    /// Trading day of the close, when the provider reports one.
    pub as_of: Option<NaiveDate>,
}

impl PriceQuote {
    /// Creates a new quote without a trading date.
    #[must_use]
    pub const fn new(close: f64) -> Self {
        Self { close, as_of: None }
    }

    /// Sets the trading day of the close.
    #[must_use]
    pub const fn with_date(mut self, as_of: NaiveDate) -> Self {
        self.as_of = Some(as_of);
        self
    }
}

/// Valuation metrics for one company.
///
/// Every ratio is either a finite rounded number or `None` (serialized as `null`).
/// `per`, `roe` and `roa` are `None` whenever no annual filing was available.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValuationMetrics {
    /// Listing code, exchange suffix stripped.
    #[serde(rename = "Code")]
    pub code: String,
    /// Current price used for the ratios.
    #[serde(rename = "Price")]
    pub price: f64,
    /// Equity / total assets, percent, one decimal.
    #[serde(rename = "EquityRatio")]
    pub equity_ratio: Option<f64>,
    /// Price-to-book ratio.
    #[serde(rename = "PBR")]
    pub pbr: Option<f64>,
    /// Price-to-earnings ratio.
    #[serde(rename = "PER")]
    pub per: Option<f64>,
    /// Return on equity, percent.
    #[serde(rename = "ROE")]
    pub roe: Option<f64>,
    /// Return on assets, percent.
    #[serde(rename = "ROA")]
    pub roa: Option<f64>,
}
