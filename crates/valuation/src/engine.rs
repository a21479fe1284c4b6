//! Single-company valuation pipeline.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use valuation_core::{
    BalanceSheet, PriceProvider, ProfitLoss, RatioPolicy, SecuritiesCode, StatementProvider,
    Ticker, ValuationMetrics,
};

use crate::augment::AugmentedStatements;
use crate::directory::Company;
use crate::metrics;
use crate::select::{select_balance_sheet, select_profit_loss};

/// Everything produced for one company.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CompanyReport {
    /// Company name.
    #[serde(rename = "Name")]
    pub name: String,
    /// Code used for the statement lookup.
    #[serde(rename = "Code")]
    pub code: SecuritiesCode,
    /// Ticker used for the price lookup.
    #[serde(rename = "Ticker")]
    pub ticker: Option<Ticker>,
    /// Augmented PL, BS and CF sets.
    #[serde(flatten)]
    pub statements: AugmentedStatements,
    /// Valuation metrics, `None` when they could not be computed.
    #[serde(rename = "Metrics")]
    pub metrics: Option<ValuationMetrics>,
}

/// Runs the fetch, select and compute pipeline against a pair of providers.
///
/// Public entry points never fail: every error is logged and resolved to an
/// empty statement set or `None` metrics.
///
/// # Example
///
/// ```rust,ignore
/// use valuation::{Company, EngineConfig, ValuationEngine};
///
/// let config = EngineConfig::from_env()?;
/// let engine = ValuationEngine::from_config(&config)?;
///
/// let report = engine.analyze(&Company::new("Toyota", "輸送用機器", "72030")).await;
/// println!("{:?}", report.metrics);
/// ```
#[derive(Clone)]
pub struct ValuationEngine {
    statements: Arc<dyn StatementProvider>,
    prices: Arc<dyn PriceProvider>,
    ratios: RatioPolicy,
}

impl std::fmt::Debug for ValuationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValuationEngine")
            .field("statements", &self.statements.name())
            .field("prices", &self.prices.name())
            .field("ratios", &self.ratios)
            .finish()
    }
}

impl ValuationEngine {
    /// Creates an engine over the given providers with the default ratio policy.
    pub fn new(statements: Arc<dyn StatementProvider>, prices: Arc<dyn PriceProvider>) -> Self {
        debug!(
            statements = statements.name(),
            prices = prices.name(),
            "Creating valuation engine"
        );
        Self {
            statements,
            prices,
            ratios: RatioPolicy::default(),
        }
    }

    /// Creates an engine over the HTTP providers described by `config`.
    #[cfg(all(feature = "jquants", feature = "yahoo"))]
    pub fn from_config(config: &valuation_core::EngineConfig) -> valuation_core::Result<Self> {
        let statements = Arc::new(valuation_jquants::JQuantsProvider::new(config)?);
        let prices = Arc::new(valuation_yahoo::YahooProvider::new(config)?);
        Ok(Self::new(statements, prices).with_ratio_policy(config.ratios))
    }

    /// Sets the policy for derived statement ratios.
    #[must_use]
    pub fn with_ratio_policy(mut self, ratios: RatioPolicy) -> Self {
        self.ratios = ratios;
        self
    }

    /// The policy applied to derived statement ratios.
    pub const fn ratio_policy(&self) -> RatioPolicy {
        self.ratios
    }

    /// Fetches and augments the statements of `code`.
    pub async fn statements(&self, code: &SecuritiesCode) -> AugmentedStatements {
        let bundle = self.statements.fetch_statements(code).await;
        AugmentedStatements::from_bundle(bundle, self.ratios)
    }

    /// Computes valuation metrics, or `None` when they cannot be computed.
    ///
    /// Empty inputs short-circuit without any request. Selection failures
    /// (bad dates, nothing reporting sales or total assets) are logged and give
    /// `None` before the price is fetched. A missing price also gives `None`.
    pub async fn compute_metrics(
        &self,
        ticker: &Ticker,
        profit_loss: &[ProfitLoss],
        balance_sheet: &[BalanceSheet],
    ) -> Option<ValuationMetrics> {
        if ticker.is_empty() || profit_loss.is_empty() || balance_sheet.is_empty() {
            debug!(ticker = %ticker, "Missing inputs, skipping metrics");
            return None;
        }

        let selected = select_profit_loss(profit_loss)
            .and_then(|pl| select_balance_sheet(balance_sheet).map(|bs| (pl, bs)));
        let (pl, bs) = match selected {
            Ok(pair) => pair,
            Err(e) => {
                error!(ticker = %ticker, error = %e, "Record selection failed");
                return None;
            }
        };
        debug!(
            ticker = %ticker,
            pl_period = %pl.period_end,
            bs_period = %bs.period_end,
            annual = pl.is_annual(),
            "Selected records"
        );

        let Some(quote) = self.prices.fetch_price(ticker).await else {
            warn!(ticker = %ticker, "No price available, skipping metrics");
            return None;
        };

        Some(metrics::calculate(ticker, quote.close, &pl, &bs))
    }

    /// Runs the whole pipeline for one company.
    ///
    /// Metrics are only attempted when both PL and BS sets are non-empty.
    pub async fn analyze(&self, company: &Company) -> CompanyReport {
        let code = company
            .ticker
            .as_ref()
            .map(Ticker::securities_code)
            .unwrap_or_default();
        info!(company = %company.name, code = %code, "Analyzing company");

        let bundle = self.statements.fetch_statements(&code).await;

        let metrics = match &company.ticker {
            Some(ticker) if !bundle.profit_loss.is_empty() && !bundle.balance_sheet.is_empty() => {
                self.compute_metrics(ticker, &bundle.profit_loss, &bundle.balance_sheet)
                    .await
            }
            _ => None,
        };

        CompanyReport {
            name: company.name.clone(),
            code,
            ticker: company.ticker.clone(),
            statements: AugmentedStatements::from_bundle(bundle, self.ratios),
            metrics,
        }
    }
}
