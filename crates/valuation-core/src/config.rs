//! Engine configuration.
//!
//! Built once at process entry and handed to each provider by reference.
//! [`EngineConfig::from_lookup`] takes any key lookup so tests never have to
//! touch the process environment.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DataError, Result};
use crate::retry::RetryPolicy;

/// Default fundamentals API base URL.
pub const JQUANTS_BASE_URL: &str = "https://api.jquants.com/v2";

/// Default chart API base URL.
pub const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Default request timeout for provider HTTP clients.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Environment variable holding the fundamentals API key.
pub const ENV_JQUANTS_API: &str = "JQUANTS_API";
/// Environment variable overriding the fundamentals base URL.
pub const ENV_JQUANTS_API_URL: &str = "JQUANTS_API_URL";
/// Environment variable overriding the number of attempts.
pub const ENV_RETRY_ATTEMPTS: &str = "VALUATION_RETRY_ATTEMPTS";
/// Environment variable overriding the backoff in seconds.
pub const ENV_RETRY_DELAY_SECS: &str = "VALUATION_RETRY_DELAY_SECS";
/// Environment variable overriding the HTTP timeout in seconds.
pub const ENV_HTTP_TIMEOUT_SECS: &str = "VALUATION_HTTP_TIMEOUT_SECS";

/// How derived ratios behave when their denominator is zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RatioPolicy {
    /// Zero denominators and non-finite results become `None`.
    #[default]
    NullGuarded,
    /// Plain float division; NaN and infinities are passed through.
    Raw,
}

impl RatioPolicy {
    /// Divides `numerator` by `denominator` under this policy.
    #[must_use]
    pub fn divide(self, numerator: f64, denominator: f64) -> Option<f64> {
        let value = numerator / denominator;
        match self {
            Self::Raw => Some(value),
            Self::NullGuarded if denominator == 0.0 || !value.is_finite() => None,
            Self::NullGuarded => Some(value),
        }
    }
}

/// Fundamentals API settings.
#[derive(Clone)]
pub struct JQuantsConfig {
    /// Base URL without trailing slash.
    pub base_url: String,
    /// Value sent in the `x-api-key` header.
    pub api_key: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl fmt::Debug for JQuantsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JQuantsConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"[REDACTED]")
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl JQuantsConfig {
    /// Creates settings for the public endpoint with the given key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: JQUANTS_BASE_URL.to_string(),
            api_key: api_key.into(),
            timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }

    /// Points the client at another endpoint.
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

/// Price API settings.
#[derive(Clone, Debug)]
pub struct YahooConfig {
    /// Chart endpoint without trailing slash.
    pub base_url: String,
    /// History window requested per lookup (Yahoo `range` parameter).
    pub range: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self {
            base_url: YAHOO_CHART_URL.to_string(),
            range: "5d".to_string(),
            timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

/// Everything the engine needs, assembled at startup.
#[derive(Clone, Debug)]
pub struct EngineConfig {
    /// Fundamentals provider settings.
    pub jquants: JQuantsConfig,
    /// Price provider settings.
    pub yahoo: YahooConfig,
    /// Retry policy applied by both providers.
    pub retry: RetryPolicy,
    /// Zero-denominator behaviour for derived statement ratios.
    pub ratios: RatioPolicy,
}

impl EngineConfig {
    /// Creates a configuration with defaults and the given fundamentals key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            jquants: JQuantsConfig::new(api_key),
            yahoo: YahooConfig::default(),
            retry: RetryPolicy::default(),
            ratios: RatioPolicy::default(),
        }
    }

    /// Reads the configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(ENV_JQUANTS_API)
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| DataError::Config(format!("{ENV_JQUANTS_API} is not set")))?;

        let mut config = Self::new(api_key.trim());

        if let Some(url) = lookup(ENV_JQUANTS_API_URL).filter(|v| !v.trim().is_empty()) {
            config.jquants = config.jquants.with_base_url(url.trim());
        }
        if let Some(attempts) = parse_var::<u32>(&lookup, ENV_RETRY_ATTEMPTS)? {
            config.retry.max_attempts = attempts;
        }
        if let Some(secs) = parse_var::<f64>(&lookup, ENV_RETRY_DELAY_SECS)? {
            config.retry.backoff = duration_from_secs(ENV_RETRY_DELAY_SECS, secs)?;
        }
        if let Some(secs) = parse_var::<f64>(&lookup, ENV_HTTP_TIMEOUT_SECS)? {
            let timeout = duration_from_secs(ENV_HTTP_TIMEOUT_SECS, secs)?;
            config.jquants.timeout = timeout;
            config.yahoo.timeout = timeout;
        }

        Ok(config)
    }

    /// Replaces the retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Replaces the derived ratio policy.
    #[must_use]
    pub fn with_ratio_policy(mut self, ratios: RatioPolicy) -> Self {
        self.ratios = ratios;
        self
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>> {
    match lookup(key).filter(|v| !v.trim().is_empty()) {
        None => Ok(None),
        Some(v) => v
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| DataError::Config(format!("{key} has invalid value {v:?}"))),
    }
}

fn duration_from_secs(key: &str, secs: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(secs)
        .map_err(|_| DataError::Config(format!("{key} must be a non-negative number")))
}
