//! Provider traits for fetching statements and prices.
//!
//! - [`DataProvider`] - Base trait for all data providers
//! - [`StatementProvider`] - PL/BS/CF statement records for a company code
//! - [`PriceProvider`] - Latest close for a ticker
//!
//! Implementations absorb every failure: retries are applied internally and an
//! exhausted retry budget resolves to an empty bundle or `None`, never an error.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    statement::StatementBundle,
    types::{PriceQuote, SecuritiesCode, Ticker},
};

/// Base trait for all data providers.
pub trait DataProvider: Send + Sync + Debug {
    /// Returns the name of this provider (e.g., "J-Quants").
    fn name(&self) -> &str;

    /// Returns a description of this provider.
    fn description(&self) -> &str;
}

/// Provider for financial statement records.
#[async_trait]
pub trait StatementProvider: DataProvider {
    /// Fetches every available statement record for `code`.
    ///
    /// Records keep the provider's response order. An empty code, or a provider
    /// that keeps failing, yields [`StatementBundle::empty`].
    async fn fetch_statements(&self, code: &SecuritiesCode) -> StatementBundle;
}

/// Provider for current market prices.
#[async_trait]
pub trait PriceProvider: DataProvider {
    /// Fetches the most recent close for `ticker`, or `None` if none could be obtained.
    async fn fetch_price(&self, ticker: &Ticker) -> Option<PriceQuote>;
}
