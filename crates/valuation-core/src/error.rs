//! Error types for retrieval and valuation stages.
//!
//! [`DataError`] is internal currency: fetchers and calculators return it between
//! stages, and the public engine entry points turn it into an empty result after
//! logging. It never reaches a consumer of the produced records.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while fetching or deriving financial data.
#[derive(Error, Debug)]
pub enum DataError {
    /// Transport-level failure (connection refused, timeout, TLS, ...).
    #[error("Network error: {0}")]
    Network(String),

    /// The provider answered with a non-200 status.
    #[error("HTTP {status} from {provider}")]
    HttpStatus {
        /// The provider that answered.
        provider: String,
        /// The status code received.
        status: u16,
    },

    /// Rate limit exceeded by a provider.
    #[error("Rate limited by {provider}: retry after {retry_after:?}")]
    RateLimited {
        /// The provider that rate limited the request.
        provider: String,
        /// Suggested time to wait before retrying.
        retry_after: Option<Duration>,
    },

    /// The provider answered but returned nothing usable (e.g. an empty price history).
    #[error("No data available for {0}")]
    DataNotAvailable(String),

    /// A value could not be parsed (dates, JSON bodies, ...).
    #[error("Parse error: {0}")]
    Parse(String),

    /// A required field or column is absent.
    #[error("Missing field: {0}")]
    MissingField(String),

    /// An invalid parameter was provided (empty code, empty record set, ...).
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Configuration could not be assembled.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DataError {
    /// Returns true for failures worth another attempt against the provider.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network(_)
                | Self::HttpStatus { .. }
                | Self::RateLimited { .. }
                | Self::DataNotAvailable(_)
                | Self::Parse(_)
        )
    }
}

/// Result type alias using [`DataError`].
pub type Result<T> = std::result::Result<T, DataError>;
