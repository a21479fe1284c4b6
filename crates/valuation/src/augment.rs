//! Derived statement fields and tabular export.
//!
//! Every coerced record is paired with the columns computed from it:
//! operating margin for PL, liabilities and the computed equity ratio for BS,
//! free cash flow for CF. Ratio columns follow the configured [`RatioPolicy`].

use std::fmt::Debug;

use chrono::{Datelike, NaiveDate};
use polars::prelude::*;
use serde::Serialize;

use valuation_core::{
    BalanceSheet, CashFlow, DataError, ProfitLoss, RatioPolicy, Result, Statement, StatementBundle,
};

/// Days between 0001-01-01 (CE day 1) and the Unix epoch.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// A statement record type that carries derived columns.
pub trait Augment: Statement + Serialize {
    /// Columns computed from one record.
    type Derived: Clone + Debug + PartialEq + Serialize + Send + Sync;

    /// Computes the derived columns of `self`.
    fn derive(&self, ratios: RatioPolicy) -> Self::Derived;

    /// Numeric columns of a frame built from `rows`, in display order.
    fn frame_columns(rows: &[&Augmented<Self>]) -> Vec<Column>;
}

/// Derived profit and loss columns.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct PlDerived {
    /// Operating profit over sales.
    #[serde(rename = "OperatingMargin")]
    pub operating_margin: Option<f64>,
}

/// Derived balance sheet columns.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct BsDerived {
    /// Total assets minus equity.
    #[serde(rename = "Liabilities")]
    pub liabilities: f64,
    /// Equity over total assets, as a fraction.
    #[serde(rename = "EquityRatioComputed")]
    pub equity_ratio_computed: Option<f64>,
}

/// Derived cash flow columns.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CfDerived {
    /// Operating plus investing cash flow.
    #[serde(rename = "FreeCashFlow")]
    pub free_cash_flow: f64,
}

/// One record with its derived columns, serialized as a single flat object.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(bound(serialize = "S: Serialize, S::Derived: Serialize"))]
pub struct Augmented<S: Augment> {
    /// The coerced record.
    #[serde(flatten)]
    pub record: S,
    /// Columns computed from the record.
    #[serde(flatten)]
    pub derived: S::Derived,
}

impl<S: Augment> Augmented<S> {
    /// Pairs `record` with its derived columns.
    pub fn new(record: S, ratios: RatioPolicy) -> Self {
        let derived = record.derive(ratios);
        Self { record, derived }
    }
}

impl Augment for ProfitLoss {
    type Derived = PlDerived;

    fn derive(&self, ratios: RatioPolicy) -> PlDerived {
        PlDerived {
            operating_margin: ratios.divide(self.operating_profit, self.sales),
        }
    }

    fn frame_columns(rows: &[&Augmented<Self>]) -> Vec<Column> {
        vec![
            float_column("Sales", rows, |r| r.record.sales),
            float_column("OperatingProfit", rows, |r| r.record.operating_profit),
            float_column("OrdinaryProfit", rows, |r| r.record.ordinary_profit),
            float_column("NetProfit", rows, |r| r.record.net_profit),
            float_column("EPS", rows, |r| r.record.eps),
            float_column("DilutedEPS", rows, |r| r.record.diluted_eps),
            ratio_column("OperatingMargin", rows, |r| r.derived.operating_margin),
        ]
    }
}

impl Augment for BalanceSheet {
    type Derived = BsDerived;

    fn derive(&self, ratios: RatioPolicy) -> BsDerived {
        BsDerived {
            liabilities: self.total_assets - self.equity,
            equity_ratio_computed: ratios.divide(self.equity, self.total_assets),
        }
    }

    fn frame_columns(rows: &[&Augmented<Self>]) -> Vec<Column> {
        vec![
            float_column("TotalAssets", rows, |r| r.record.total_assets),
            float_column("Equity", rows, |r| r.record.equity),
            float_column("CashEquivalents", rows, |r| r.record.cash_equivalents),
            float_column("EquityRatioReported", rows, |r| r.record.equity_ratio_reported),
            float_column("BookValuePerShare", rows, |r| r.record.book_value_per_share),
            float_column("Liabilities", rows, |r| r.derived.liabilities),
            ratio_column("EquityRatioComputed", rows, |r| {
                r.derived.equity_ratio_computed
            }),
        ]
    }
}

impl Augment for CashFlow {
    type Derived = CfDerived;

    fn derive(&self, _ratios: RatioPolicy) -> CfDerived {
        CfDerived {
            free_cash_flow: self.operating_cf + self.investing_cf,
        }
    }

    fn frame_columns(rows: &[&Augmented<Self>]) -> Vec<Column> {
        vec![
            float_column("OperatingCF", rows, |r| r.record.operating_cf),
            float_column("InvestingCF", rows, |r| r.record.investing_cf),
            float_column("FinancingCF", rows, |r| r.record.financing_cf),
            float_column("CashEquivalents", rows, |r| r.record.cash_equivalents),
            float_column("FreeCashFlow", rows, |r| r.derived.free_cash_flow),
        ]
    }
}

fn float_column<S: Augment>(
    name: &str,
    rows: &[&Augmented<S>],
    value: impl Fn(&Augmented<S>) -> f64,
) -> Column {
    let values: Vec<f64> = rows.iter().map(|r| value(r)).collect();
    Column::new(name.into(), values)
}

fn ratio_column<S: Augment>(
    name: &str,
    rows: &[&Augmented<S>],
    value: impl Fn(&Augmented<S>) -> Option<f64>,
) -> Column {
    let values: Vec<Option<f64>> = rows.iter().map(|r| value(r)).collect();
    Column::new(name.into(), values)
}

/// An ordered sequence of augmented records of one statement type.
///
/// Rows keep the provider response order; [`StatementSet::to_frame`] sorts by
/// period end.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(transparent, bound(serialize = "S: Serialize, S::Derived: Serialize"))]
pub struct StatementSet<S: Augment> {
    rows: Vec<Augmented<S>>,
}

impl<S: Augment> Default for StatementSet<S> {
    fn default() -> Self {
        Self { rows: Vec::new() }
    }
}

impl<S: Augment> StatementSet<S> {
    /// Attaches derived columns to every record.
    pub fn augment(records: Vec<S>, ratios: RatioPolicy) -> Self {
        Self {
            rows: records
                .into_iter()
                .map(|r| Augmented::new(r, ratios))
                .collect(),
        }
    }

    /// Augmented rows in provider order.
    pub fn rows(&self) -> &[Augmented<S>] {
        &self.rows
    }

    /// The underlying records in provider order.
    pub fn records(&self) -> impl Iterator<Item = &S> {
        self.rows.iter().map(|r| &r.record)
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Returns true if the set holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Renders the set as a frame sorted by period end.
    ///
    /// Columns are `Code`, `DocType`, `CurPerEn` (Date) followed by the
    /// statement's numeric and derived columns. Fails if any period end does
    /// not parse.
    pub fn to_frame(&self) -> Result<DataFrame> {
        let mut dated = self
            .rows
            .iter()
            .map(|row| Ok((row.record.header().period_end()?, row)))
            .collect::<Result<Vec<(NaiveDate, &Augmented<S>)>>>()?;
        dated.sort_by_key(|(date, _)| *date);

        let (dates, rows): (Vec<NaiveDate>, Vec<&Augmented<S>>) = dated.into_iter().unzip();
        let days: Vec<i32> = dates
            .iter()
            .map(|d| d.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE)
            .collect();

        let codes: Vec<&str> = rows.iter().map(|r| r.record.header().code.as_str()).collect();
        let doc_types: Vec<&str> = rows
            .iter()
            .map(|r| r.record.header().doc_type.as_str())
            .collect();

        let mut columns = vec![
            Column::new("Code".into(), codes),
            Column::new("DocType".into(), doc_types),
            Column::new("CurPerEn".into(), days)
                .cast(&DataType::Date)
                .map_err(|e| DataError::Parse(e.to_string()))?,
        ];
        columns.extend(S::frame_columns(&rows));

        DataFrame::new(columns).map_err(|e| DataError::Parse(e.to_string()))
    }
}

/// The three augmented statement sets of one company.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AugmentedStatements {
    /// Profit and loss.
    #[serde(rename = "PL")]
    pub profit_loss: StatementSet<ProfitLoss>,
    /// Balance sheet.
    #[serde(rename = "BS")]
    pub balance_sheet: StatementSet<BalanceSheet>,
    /// Cash flow.
    #[serde(rename = "CF")]
    pub cash_flow: StatementSet<CashFlow>,
}

impl AugmentedStatements {
    /// Augments every set of a fetched bundle.
    pub fn from_bundle(bundle: StatementBundle, ratios: RatioPolicy) -> Self {
        Self {
            profit_loss: StatementSet::augment(bundle.profit_loss, ratios),
            balance_sheet: StatementSet::augment(bundle.balance_sheet, ratios),
            cash_flow: StatementSet::augment(bundle.cash_flow, ratios),
        }
    }

    /// Returns true if all three sets are empty.
    pub fn is_empty(&self) -> bool {
        self.profit_loss.is_empty() && self.balance_sheet.is_empty() && self.cash_flow.is_empty()
    }
}
