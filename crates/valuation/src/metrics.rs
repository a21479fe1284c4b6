//! Valuation ratios from the selected records and a price.

use valuation_core::{BalanceSheet, ProfitLoss, Ticker, ValuationMetrics};

use crate::select::Selection;

/// Rounds to `decimals` places on the exact decimal value of `value`.
///
/// Exact ties go to the even digit, so `15.625` becomes `15.62`. Values that
/// only look like ties in decimal (`2.675` is stored just below) round the way
/// their binary value dictates.
#[must_use]
pub fn round_to(value: f64, decimals: usize) -> f64 {
    if !value.is_finite() {
        return value;
    }
    format!("{value:.decimals$}").parse().unwrap_or(value)
}

/// `numerator / denominator * scale`, rounded, when the denominator is positive.
fn guarded(numerator: f64, denominator: f64, scale: f64, decimals: usize) -> Option<f64> {
    if denominator > 0.0 {
        Some(round_to(numerator / denominator * scale, decimals)).filter(|v| v.is_finite())
    } else {
        None
    }
}

/// Computes the metrics for one company.
///
/// `per`, `roe` and `roa` are only filled in when the PL selection is an annual
/// filing; interim EPS and net profit are not used for them.
#[must_use]
pub fn calculate(
    ticker: &Ticker,
    price: f64,
    profit_loss: &Selection<'_, ProfitLoss>,
    balance_sheet: &Selection<'_, BalanceSheet>,
) -> ValuationMetrics {
    let pl = profit_loss.record;
    let bs = balance_sheet.record;

    let mut metrics = ValuationMetrics {
        code: ticker.code().to_string(),
        price,
        equity_ratio: guarded(bs.equity, bs.total_assets, 100.0, 1),
        pbr: guarded(price, bs.book_value_per_share, 1.0, 2),
        per: None,
        roe: None,
        roa: None,
    };

    if profit_loss.is_annual() {
        metrics.per = guarded(price, pl.eps, 1.0, 2);
        metrics.roe = guarded(pl.net_profit, bs.equity, 100.0, 2);
        metrics.roa = guarded(pl.net_profit, bs.total_assets, 100.0, 2);
    }

    metrics
}
