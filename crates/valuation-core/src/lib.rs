#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/valuation/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for statement retrieval and valuation.
//!
//! This crate provides the foundational abstractions shared by the provider
//! crates and the engine:
//!
//! - [`StatementProvider`](provider::StatementProvider) - PL/BS/CF statement records
//! - [`PriceProvider`](provider::PriceProvider) - Latest market close
//! - [`Statement`](statement::Statement) - Strict statement records coerced from provider JSON
//! - [`RetryPolicy`](retry::RetryPolicy) - Fixed-backoff retries
//! - [`EngineConfig`](config::EngineConfig) - Startup configuration

/// Startup configuration.
pub mod config;
/// Error types for data operations.
pub mod error;
/// Annual/interim filing classification.
pub mod filing;
/// Provider traits for fetching statements and prices.
pub mod provider;
/// Retry policy.
pub mod retry;
/// Statement records and boundary coercion.
pub mod statement;
/// Identifier and output types.
pub mod types;

// Re-export commonly used items at crate root
pub use config::{EngineConfig, JQuantsConfig, RatioPolicy, YahooConfig};
pub use error::{DataError, Result};
pub use filing::FilingBasis;
pub use provider::{DataProvider, PriceProvider, StatementProvider};
pub use retry::RetryPolicy;
pub use statement::{
    BalanceSheet, CashFlow, Field, ProfitLoss, RawRecord, Statement, StatementBundle,
    StatementHeader, StatementKind,
};
pub use types::{PriceQuote, SecuritiesCode, Ticker, ValuationMetrics};
