//! Financial statement records.
//!
//! The fundamentals provider returns one loosely typed JSON object per
//! disclosure, mixing numbers, numeric strings and empty strings. This module
//! is the only place that touches that shape: [`Statement::from_raw`] coerces a
//! [`RawRecord`] into a strict record where every numeric field is an `f64`
//! (0.0 when absent or unparsable) and the unparsable fields are remembered so
//! later stages can tell "reported zero" from "not reported".

use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{DataError, Result};
use crate::filing::FilingBasis;

/// One untyped record as delivered by the provider.
pub type RawRecord = serde_json::Map<String, Value>;

/// Date layouts accepted for period columns.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Numeric statement fields, keyed by their provider column names.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Field {
    /// Revenue.
    Sales,
    /// Operating profit.
    OperatingProfit,
    /// Ordinary profit.
    OrdinaryProfit,
    /// Net profit attributable to owners.
    NetProfit,
    /// Earnings per share.
    Eps,
    /// Diluted earnings per share.
    DilutedEps,
    /// Total assets.
    TotalAssets,
    /// Cash and cash equivalents at period end.
    CashEquivalents,
    /// Equity (net assets).
    Equity,
    /// Equity ratio as reported by the company.
    EquityRatioReported,
    /// Book value per share.
    BookValuePerShare,
    /// Cash flow from operating activities.
    OperatingCf,
    /// Cash flow from investing activities.
    InvestingCf,
    /// Cash flow from financing activities.
    FinancingCf,
}

impl Field {
    /// Column name used by the fundamentals provider.
    #[must_use]
    pub const fn provider_key(self) -> &'static str {
        match self {
            Self::Sales => "Sales",
            Self::OperatingProfit => "OP",
            Self::OrdinaryProfit => "OdP",
            Self::NetProfit => "NP",
            Self::Eps => "EPS",
            Self::DilutedEps => "DEPS",
            Self::TotalAssets => "TA",
            Self::CashEquivalents => "CashEq",
            Self::Equity => "Eq",
            Self::EquityRatioReported => "EqAR",
            Self::BookValuePerShare => "BPS",
            Self::OperatingCf => "CFO",
            Self::InvestingCf => "CFI",
            Self::FinancingCf => "CFF",
        }
    }
}

/// Which statement a record belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StatementKind {
    /// Profit and loss.
    ProfitLoss,
    /// Balance sheet.
    BalanceSheet,
    /// Cash flow.
    CashFlow,
}

/// Coerces a provider value into a finite float.
///
/// Numbers pass through, strings are trimmed and parsed, everything else
/// (absent, null, empty, non-numeric, NaN, infinities) yields `None`.
#[must_use]
pub fn coerce_number(value: Option<&Value>) -> Option<f64> {
    let parsed = match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    parsed.filter(|v| v.is_finite())
}

fn coerce_text(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => String::new(),
    }
}

/// Parses a provider date column.
pub fn parse_period_date(raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .ok_or_else(|| DataError::Parse(format!("invalid period date {raw:?}")))
}

/// Reads numeric fields out of a raw record, tracking the ones that were not reported.
#[derive(Debug)]
struct Coercer<'a> {
    raw: &'a RawRecord,
    unreported: BTreeSet<Field>,
}

impl<'a> Coercer<'a> {
    fn new(raw: &'a RawRecord) -> Self {
        Self {
            raw,
            unreported: BTreeSet::new(),
        }
    }

    fn number(&mut self, field: Field) -> f64 {
        match coerce_number(self.raw.get(field.provider_key())) {
            Some(v) => v,
            None => {
                self.unreported.insert(field);
                0.0
            }
        }
    }
}

/// Columns shared by every statement record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementHeader {
    /// Provider company code.
    #[serde(rename = "Code")]
    pub code: String,
    /// Provider document classification.
    #[serde(rename = "DocType")]
    pub doc_type: String,
    /// End of the current reporting period, as delivered.
    #[serde(rename = "CurPerEn")]
    pub current_period_end: String,
    /// End of the current fiscal year, as delivered.
    #[serde(rename = "CurFYEn")]
    pub current_fiscal_year_end: String,
}

impl StatementHeader {
    fn from_raw(raw: &RawRecord) -> Self {
        Self {
            code: coerce_text(raw.get("Code")),
            doc_type: coerce_text(raw.get("DocType")),
            current_period_end: coerce_text(raw.get("CurPerEn")),
            current_fiscal_year_end: coerce_text(raw.get("CurFYEn")),
        }
    }

    /// Parses the current period end.
    pub fn period_end(&self) -> Result<NaiveDate> {
        parse_period_date(&self.current_period_end)
    }

    /// Classifies the document as annual or interim.
    #[must_use]
    pub fn basis(&self) -> FilingBasis {
        FilingBasis::from_doc_type(&self.doc_type)
    }
}

/// Behaviour shared by the three statement record types.
pub trait Statement: Clone + std::fmt::Debug + Send + Sync {
    /// The statement this record type represents.
    const KIND: StatementKind;

    /// Coerces one provider record into this statement shape.
    fn from_raw(raw: &RawRecord) -> Self;

    /// Shared header columns.
    fn header(&self) -> &StatementHeader;

    /// Fields that were absent, empty or non-numeric in the provider record.
    fn unreported(&self) -> &BTreeSet<Field>;

    /// Returns true if the provider supplied a numeric value for `field`.
    fn is_reported(&self, field: Field) -> bool {
        !self.unreported().contains(&field)
    }
}

/// Profit and loss columns of one disclosure.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfitLoss {
    /// Shared columns.
    #[serde(flatten)]
    pub header: StatementHeader,
    /// Revenue.
    #[serde(rename = "Sales")]
    pub sales: f64,
    /// Operating profit.
    #[serde(rename = "OperatingProfit")]
    pub operating_profit: f64,
    /// Ordinary profit.
    #[serde(rename = "OrdinaryProfit")]
    pub ordinary_profit: f64,
    /// Net profit.
    #[serde(rename = "NetProfit")]
    pub net_profit: f64,
    /// Earnings per share.
    #[serde(rename = "EPS")]
    pub eps: f64,
    /// Diluted earnings per share.
    #[serde(rename = "DilutedEPS")]
    pub diluted_eps: f64,
    #[serde(skip)]
    unreported: BTreeSet<Field>,
}

impl Statement for ProfitLoss {
    const KIND: StatementKind = StatementKind::ProfitLoss;

    fn from_raw(raw: &RawRecord) -> Self {
        let mut c = Coercer::new(raw);
        Self {
            header: StatementHeader::from_raw(raw),
            sales: c.number(Field::Sales),
            operating_profit: c.number(Field::OperatingProfit),
            ordinary_profit: c.number(Field::OrdinaryProfit),
            net_profit: c.number(Field::NetProfit),
            eps: c.number(Field::Eps),
            diluted_eps: c.number(Field::DilutedEps),
            unreported: c.unreported,
        }
    }

    fn header(&self) -> &StatementHeader {
        &self.header
    }

    fn unreported(&self) -> &BTreeSet<Field> {
        &self.unreported
    }
}

/// Balance sheet columns of one disclosure.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheet {
    /// Shared columns.
    #[serde(flatten)]
    pub header: StatementHeader,
    /// Total assets.
    #[serde(rename = "TotalAssets")]
    pub total_assets: f64,
    /// Cash and cash equivalents.
    #[serde(rename = "CashEquivalents")]
    pub cash_equivalents: f64,
    /// Equity.
    #[serde(rename = "Equity")]
    pub equity: f64,
    /// Equity ratio as reported.
    #[serde(rename = "EquityRatioReported")]
    pub equity_ratio_reported: f64,
    /// Book value per share.
    #[serde(rename = "BookValuePerShare")]
    pub book_value_per_share: f64,
    #[serde(skip)]
    unreported: BTreeSet<Field>,
}

impl Statement for BalanceSheet {
    const KIND: StatementKind = StatementKind::BalanceSheet;

    fn from_raw(raw: &RawRecord) -> Self {
        let mut c = Coercer::new(raw);
        Self {
            header: StatementHeader::from_raw(raw),
            total_assets: c.number(Field::TotalAssets),
            cash_equivalents: c.number(Field::CashEquivalents),
            equity: c.number(Field::Equity),
            equity_ratio_reported: c.number(Field::EquityRatioReported),
            book_value_per_share: c.number(Field::BookValuePerShare),
            unreported: c.unreported,
        }
    }

    fn header(&self) -> &StatementHeader {
        &self.header
    }

    fn unreported(&self) -> &BTreeSet<Field> {
        &self.unreported
    }
}

/// Cash flow columns of one disclosure.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CashFlow {
    /// Shared columns.
    #[serde(flatten)]
    pub header: StatementHeader,
    /// Operating cash flow.
    #[serde(rename = "OperatingCF")]
    pub operating_cf: f64,
    /// Investing cash flow.
    #[serde(rename = "InvestingCF")]
    pub investing_cf: f64,
    /// Financing cash flow.
    #[serde(rename = "FinancingCF")]
    pub financing_cf: f64,
    /// Cash and cash equivalents.
    #[serde(rename = "CashEquivalents")]
    pub cash_equivalents: f64,
    #[serde(skip)]
    unreported: BTreeSet<Field>,
}

impl Statement for CashFlow {
    const KIND: StatementKind = StatementKind::CashFlow;

    fn from_raw(raw: &RawRecord) -> Self {
        let mut c = Coercer::new(raw);
        Self {
            header: StatementHeader::from_raw(raw),
            operating_cf: c.number(Field::OperatingCf),
            investing_cf: c.number(Field::InvestingCf),
            financing_cf: c.number(Field::FinancingCf),
            cash_equivalents: c.number(Field::CashEquivalents),
            unreported: c.unreported,
        }
    }

    fn header(&self) -> &StatementHeader {
        &self.header
    }

    fn unreported(&self) -> &BTreeSet<Field> {
        &self.unreported
    }
}

/// The three statement sequences for one company, in provider response order.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementBundle {
    /// Profit and loss records.
    pub profit_loss: Vec<ProfitLoss>,
    /// Balance sheet records.
    pub balance_sheet: Vec<BalanceSheet>,
    /// Cash flow records.
    pub cash_flow: Vec<CashFlow>,
}

impl StatementBundle {
    /// Three empty sequences, the "no data" result of a fetch.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Splits raw provider records into the three statement shapes.
    #[must_use]
    pub fn from_raw_records(records: &[RawRecord]) -> Self {
        Self {
            profit_loss: records.iter().map(ProfitLoss::from_raw).collect(),
            balance_sheet: records.iter().map(BalanceSheet::from_raw).collect(),
            cash_flow: records.iter().map(CashFlow::from_raw).collect(),
        }
    }

    /// Returns true if all three sequences are empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profit_loss.is_empty() && self.balance_sheet.is_empty() && self.cash_flow.is_empty()
    }
}
