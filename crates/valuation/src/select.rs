//! Choosing the authoritative PL and BS records for valuation.

use chrono::NaiveDate;
use tracing::debug;

use valuation_core::{BalanceSheet, DataError, Field, FilingBasis, ProfitLoss, Result, Statement};

/// A selected record with its parsed period end.
#[derive(Debug, Clone)]
pub struct Selection<'a, S> {
    /// The chosen record.
    pub record: &'a S,
    /// Its parsed period end.
    pub period_end: NaiveDate,
    /// Whether the choice came from an annual filing.
    pub basis: FilingBasis,
}

impl<S> Selection<'_, S> {
    /// Returns true if the selected record is an annual filing.
    pub const fn is_annual(&self) -> bool {
        self.basis.is_annual()
    }
}

/// Parses every period end, sorts ascending and drops records that did not
/// report `required`.
///
/// The sort is stable, so records sharing a period end keep provider order.
fn chronological<S: Statement>(records: &[S], required: Field) -> Result<Vec<(NaiveDate, &S)>> {
    let mut dated = records
        .iter()
        .map(|r| Ok((r.header().period_end()?, r)))
        .collect::<Result<Vec<_>>>()?;
    dated.sort_by_key(|(date, _)| *date);

    let before = dated.len();
    dated.retain(|(_, r)| r.is_reported(required));
    if dated.len() < before {
        debug!(
            kind = ?S::KIND,
            dropped = before - dated.len(),
            "Dropped records without {}",
            required.provider_key()
        );
    }

    if dated.is_empty() {
        return Err(DataError::MissingField(format!(
            "no {:?} record reports {}",
            S::KIND,
            required.provider_key()
        )));
    }
    Ok(dated)
}

/// Selects the PL record used for valuation.
///
/// Prefers the most recent annual filing; without one, falls back to the most
/// recent record of any kind and marks the selection as interim.
pub fn select_profit_loss(records: &[ProfitLoss]) -> Result<Selection<'_, ProfitLoss>> {
    let dated = chronological(records, Field::Sales)?;

    let annual = dated
        .iter()
        .rev()
        .find(|(_, r)| r.header().basis().is_annual());

    let (&(period_end, record), basis) = match annual {
        Some(found) => (found, FilingBasis::Annual),
        None => (
            dated
                .last()
                .ok_or_else(|| DataError::MissingField("no PL record".to_string()))?,
            FilingBasis::Interim,
        ),
    };

    Ok(Selection {
        record,
        period_end,
        basis,
    })
}

/// Selects the most recent BS record that reports total assets.
pub fn select_balance_sheet(records: &[BalanceSheet]) -> Result<Selection<'_, BalanceSheet>> {
    let dated = chronological(records, Field::TotalAssets)?;
    let &(period_end, record) = dated
        .last()
        .ok_or_else(|| DataError::MissingField("no BS record".to_string()))?;

    Ok(Selection {
        record,
        period_end,
        basis: record.header().basis(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{Value, json};
    use valuation_core::RawRecord;

    fn raw(value: Value) -> RawRecord {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn pl(doc_type: &str, period_end: &str, sales: Value, eps: f64) -> ProfitLoss {
        ProfitLoss::from_raw(&raw(json!({
            "Code": "72030",
            "DocType": doc_type,
            "CurPerEn": period_end,
            "Sales": sales,
            "EPS": eps,
        })))
    }

    fn bs(period_end: &str, total_assets: Value) -> BalanceSheet {
        BalanceSheet::from_raw(&raw(json!({
            "Code": "72030",
            "DocType": "3QFinancialStatements_Consolidated_IFRS",
            "CurPerEn": period_end,
            "TA": total_assets,
        })))
    }

    #[test]
    fn test_prefers_latest_annual() {
        let records = vec![
            pl("3QFinancialStatements_Consolidated_IFRS", "2024-12-31", json!("900"), 3.0),
            pl("FYFinancialStatements_Consolidated_IFRS", "2024-03-31", json!("1000"), 2.0),
            pl("FYFinancialStatements_Consolidated_IFRS", "2023-03-31", json!("800"), 1.0),
        ];

        let selection = select_profit_loss(&records).unwrap();
        assert!(selection.is_annual());
        assert_eq!(selection.record.eps, 2.0);
        assert_eq!(
            selection.period_end,
            NaiveDate::from_ymd_opt(2024, 3, 31).unwrap()
        );
    }

    #[test]
    fn test_falls_back_to_latest_interim() {
        let records = vec![
            pl("2QFinancialStatements_Consolidated_JP", "2024-09-30", json!("500"), 2.0),
            pl("1QFinancialStatements_Consolidated_JP", "2024-06-30", json!("250"), 1.0),
        ];

        let selection = select_profit_loss(&records).unwrap();
        assert!(!selection.is_annual());
        assert_eq!(selection.record.eps, 2.0);
    }

    #[test]
    fn test_ignores_records_without_sales() {
        let records = vec![
            pl("FYFinancialStatements_Consolidated_IFRS", "2024-03-31", json!("1000"), 2.0),
            pl("EarnForecastRevision", "2024-05-10", json!(""), 9.0),
            pl("FYForecastRevision", "2024-06-10", Value::Null, 9.0),
        ];

        let selection = select_profit_loss(&records).unwrap();
        assert_eq!(selection.record.eps, 2.0);
    }

    #[test]
    fn test_reported_zero_sales_is_kept() {
        let records = vec![pl("1QFinancialStatements", "2024-06-30", json!(0), 1.0)];
        assert!(select_profit_loss(&records).is_ok());
    }

    #[test]
    fn test_annual_match_is_case_insensitive() {
        let records = vec![pl("annualReport", "2024-03-31", json!("1"), 1.0)];
        assert!(select_profit_loss(&records).unwrap().is_annual());
    }

    #[test]
    fn test_empty_after_filtering_fails() {
        assert!(select_profit_loss(&[]).is_err());

        let records = vec![pl("EarnForecastRevision", "2024-05-10", json!(""), 1.0)];
        assert!(matches!(
            select_profit_loss(&records),
            Err(DataError::MissingField(_))
        ));
    }

    #[test]
    fn test_malformed_date_fails() {
        let records = vec![
            pl("FYFinancialStatements", "2024-03-31", json!("1"), 1.0),
            pl("FYFinancialStatements", "", json!("1"), 1.0),
        ];
        assert!(matches!(
            select_profit_loss(&records),
            Err(DataError::Parse(_))
        ));
    }

    #[test]
    fn test_balance_sheet_takes_latest_reported() {
        let records = vec![
            bs("2024-06-30", json!("5000")),
            bs("2024-12-31", json!("")),
            bs("2024-09-30", json!("5200")),
        ];

        let selection = select_balance_sheet(&records).unwrap();
        assert_eq!(selection.record.total_assets, 5200.0);
        assert!(!selection.is_annual());
    }

    #[test]
    fn test_balance_sheet_without_assets_fails() {
        let records = vec![bs("2024-06-30", Value::Null)];
        assert!(select_balance_sheet(&records).is_err());
    }
}
