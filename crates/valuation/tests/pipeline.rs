//! End-to-end pipeline tests against in-memory providers.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use serde_json::{Value, json};
use valuation::{
    BatchStrategy, Buffered, Company, DataProvider, PriceProvider, PriceQuote, RatioPolicy,
    RawRecord, SecuritiesCode, Sequential, StatementBundle, StatementProvider, Ticker,
    ValuationEngine,
};

#[derive(Debug)]
struct FakeStatements {
    records: Vec<RawRecord>,
    calls: AtomicUsize,
}

impl FakeStatements {
    fn new(records: Vec<Value>) -> Self {
        Self {
            records: records
                .into_iter()
                .map(|v| match v {
                    Value::Object(map) => map,
                    _ => panic!("expected object"),
                })
                .collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

impl DataProvider for FakeStatements {
    fn name(&self) -> &str {
        "fake-statements"
    }

    fn description(&self) -> &str {
        "Fixed statement records"
    }
}

#[async_trait]
impl StatementProvider for FakeStatements {
    async fn fetch_statements(&self, code: &SecuritiesCode) -> StatementBundle {
        if code.is_empty() {
            return StatementBundle::empty();
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        StatementBundle::from_raw_records(&self.records)
    }
}

#[derive(Debug)]
struct FakePrices {
    close: Option<f64>,
    calls: AtomicUsize,
}

impl FakePrices {
    fn new(close: Option<f64>) -> Self {
        Self {
            close,
            calls: AtomicUsize::new(0),
        }
    }
}

impl DataProvider for FakePrices {
    fn name(&self) -> &str {
        "fake-prices"
    }

    fn description(&self) -> &str {
        "Fixed closing price"
    }
}

#[async_trait]
impl PriceProvider for FakePrices {
    async fn fetch_price(&self, _ticker: &Ticker) -> Option<PriceQuote> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.close.map(PriceQuote::new)
    }
}

fn annual() -> Value {
    json!({
        "Code": "72030",
        "DocType": "FYFinancialStatements_Consolidated_IFRS",
        "CurPerEn": "2024-03-31",
        "CurFYEn": "2024-03-31",
        "Sales": "45095325000000",
        "OP": "5352934000000",
        "NP": "4944933000000",
        "EPS": "100",
        "TA": "90114296000000",
        "Eq": "35239338000000",
        "BPS": "2000",
        "CFO": "4206373000000",
        "CFI": "-4998751000000",
        "CFF": "1156807000000",
    })
}

fn interim() -> Value {
    json!({
        "Code": "72030",
        "DocType": "1QFinancialStatements_Consolidated_IFRS",
        "CurPerEn": "2024-06-30",
        "CurFYEn": "2025-03-31",
        "Sales": "11837158000000",
        "OP": "1308503000000",
        "NP": "1333384000000",
        "EPS": "98.44",
        "TA": "93664483000000",
        "Eq": "37016342000000",
        "BPS": "2400",
        "CFO": "",
        "CFI": "",
    })
}

fn forecast_revision() -> Value {
    json!({
        "Code": "72030",
        "DocType": "EarnForecastRevision",
        "CurPerEn": "2024-09-30",
        "CurFYEn": "2025-03-31",
        "Sales": "",
        "TA": "",
    })
}

fn engine(
    records: Vec<Value>,
    close: Option<f64>,
) -> (ValuationEngine, Arc<FakeStatements>, Arc<FakePrices>) {
    let statements = Arc::new(FakeStatements::new(records));
    let prices = Arc::new(FakePrices::new(close));
    let engine = ValuationEngine::new(statements.clone(), prices.clone());
    (engine, statements, prices)
}

fn toyota() -> Company {
    Company::new("トヨタ自動車株式会社", "輸送用機器", "72030")
}

#[tokio::test]
async fn test_annual_filing_yields_full_metrics() {
    let (engine, statements, prices) =
        engine(vec![interim(), annual(), forecast_revision()], Some(500.0));

    let report = engine.analyze(&toyota()).await;
    let metrics = report.metrics.expect("metrics");

    assert_eq!(report.code.as_str(), "7203");
    assert_eq!(metrics.code, "7203");
    assert_eq!(metrics.price, 500.0);
    assert_eq!(metrics.per, Some(5.0));
    // PBR and equity ratio come from the latest balance sheet (the interim one).
    assert_eq!(metrics.pbr, Some(0.21));
    assert_eq!(metrics.equity_ratio, Some(39.5));
    assert!(metrics.roe.is_some());
    assert!(metrics.roa.is_some());

    assert_eq!(report.statements.profit_loss.len(), 3);
    assert_eq!(statements.calls.load(Ordering::SeqCst), 1);
    assert_eq!(prices.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_interim_only_nulls_earnings_ratios() {
    let (engine, _, _) = engine(vec![interim()], Some(500.0));

    let report = engine.analyze(&toyota()).await;
    let metrics = report.metrics.expect("metrics");

    assert_eq!(metrics.per, None);
    assert_eq!(metrics.roe, None);
    assert_eq!(metrics.roa, None);
    assert_eq!(metrics.pbr, Some(0.21));
    assert_eq!(metrics.equity_ratio, Some(39.5));
}

#[tokio::test]
async fn test_zero_denominators_give_nulls() {
    let mut record = annual();
    record["BPS"] = json!("0");
    record["TA"] = json!("0");
    let (engine, _, _) = engine(vec![record], Some(500.0));

    let metrics = engine.analyze(&toyota()).await.metrics.expect("metrics");

    assert_eq!(metrics.pbr, None);
    assert_eq!(metrics.equity_ratio, None);
    assert_eq!(metrics.roa, None);
    assert_eq!(metrics.per, Some(5.0));
}

#[tokio::test]
async fn test_missing_price_gives_no_metrics() {
    let (engine, _, prices) = engine(vec![annual()], None);

    let report = engine.analyze(&toyota()).await;

    assert!(report.metrics.is_none());
    assert_eq!(report.statements.balance_sheet.len(), 1);
    assert_eq!(prices.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_bad_dates_skip_price_lookup() {
    let mut record = annual();
    record["CurPerEn"] = json!("not a date");
    let (engine, _, prices) = engine(vec![record], Some(500.0));

    let report = engine.analyze(&toyota()).await;

    assert!(report.metrics.is_none());
    assert_eq!(report.statements.cash_flow.len(), 1);
    assert_eq!(prices.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_empty_inputs_short_circuit() {
    let (engine, _, prices) = engine(vec![annual()], Some(500.0));

    assert!(engine.compute_metrics(&Ticker::new(""), &[], &[]).await.is_none());

    let bundle = StatementBundle::from_raw_records(&[match annual() {
        Value::Object(map) => map,
        _ => unreachable!(),
    }]);
    assert!(
        engine
            .compute_metrics(&Ticker::new("7203.T"), &bundle.profit_loss, &[])
            .await
            .is_none()
    );
    assert_eq!(prices.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_company_without_ticker() {
    let (engine, statements, prices) = engine(vec![annual()], Some(500.0));

    let report = engine.analyze(&Company::new("Unlisted", "Other", "")).await;

    assert!(report.statements.is_empty());
    assert!(report.metrics.is_none());
    assert_eq!(statements.calls.load(Ordering::SeqCst), 0);
    assert_eq!(prices.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_metrics_are_idempotent() {
    let (engine, _, _) = engine(vec![annual(), interim()], Some(2500.0));
    let bundle = StatementBundle::from_raw_records(
        &[annual(), interim()]
            .into_iter()
            .map(|v| match v {
                Value::Object(map) => map,
                _ => unreachable!(),
            })
            .collect::<Vec<_>>(),
    );
    let ticker = Ticker::new("7203.T");

    let first = engine
        .compute_metrics(&ticker, &bundle.profit_loss, &bundle.balance_sheet)
        .await;
    let second = engine
        .compute_metrics(&ticker, &bundle.profit_loss, &bundle.balance_sheet)
        .await;

    assert!(first.is_some());
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_derived_columns_hold_exactly() {
    let (engine, _, _) = engine(vec![annual(), interim()], Some(500.0));

    let report = engine.analyze(&toyota()).await;

    for row in report.statements.balance_sheet.rows() {
        assert_eq!(
            row.derived.liabilities,
            row.record.total_assets - row.record.equity
        );
    }
    for row in report.statements.cash_flow.rows() {
        assert_eq!(
            row.derived.free_cash_flow,
            row.record.operating_cf + row.record.investing_cf
        );
    }
}

#[tokio::test]
async fn test_ratio_policy_reaches_derived_columns() {
    let mut record = annual();
    record["Sales"] = json!("0");
    let (engine, _, _) = engine(vec![record], Some(500.0));

    let guarded = engine.analyze(&toyota()).await;
    assert_eq!(
        guarded.statements.profit_loss.rows()[0].derived.operating_margin,
        None
    );

    let raw = engine
        .with_ratio_policy(RatioPolicy::Raw)
        .analyze(&toyota())
        .await;
    assert_eq!(
        raw.statements.profit_loss.rows()[0].derived.operating_margin,
        Some(f64::INFINITY)
    );
}

#[tokio::test]
async fn test_report_serialization() {
    let (engine, _, _) = engine(vec![interim()], Some(500.0));

    let report = engine.analyze(&toyota()).await;
    let value = serde_json::to_value(&report).unwrap();

    assert_eq!(value["Name"], "トヨタ自動車株式会社");
    assert_eq!(value["Code"], "7203");
    assert_eq!(value["Ticker"], "7203.T");
    assert_eq!(value["Metrics"]["PER"], Value::Null);
    assert_eq!(value["Metrics"]["PBR"], 0.21);
    assert_eq!(value["PL"][0]["DocType"], "1QFinancialStatements_Consolidated_IFRS");
    assert_eq!(value["CF"][0]["FreeCashFlow"], 0.0);
}

#[tokio::test]
async fn test_batch_strategies_preserve_order() {
    let (engine, _, _) = engine(vec![annual()], Some(500.0));
    let companies = vec![
        toyota(),
        Company::new("ソニーグループ株式会社", "電気機器", "67580"),
        Company::new("Unlisted", "Other", ""),
    ];

    let sequential = Sequential.run(&engine, &companies).await;
    let buffered = Buffered::new(2).run(&engine, &companies).await;

    let names = |reports: &[valuation::CompanyReport]| {
        reports.iter().map(|r| r.name.clone()).collect::<Vec<_>>()
    };
    let expected: Vec<String> = companies.iter().map(|c| c.name.clone()).collect();
    assert_eq!(names(&sequential), expected);
    assert_eq!(names(&buffered), expected);
    assert_eq!(sequential, buffered);
}

fn assert_send<T: Send>(value: T) -> T {
    value
}

#[tokio::test]
async fn test_buffered_batch_runs_as_send_future() {
    let (engine, statements, prices) = engine(vec![annual()], Some(500.0));
    let companies = vec![
        toyota(),
        Company::new("ソニーグループ株式会社", "電気機器", "67580"),
        Company::new("任天堂株式会社", "その他製品", "79740"),
    ];

    let strategy = valuation::strategy_for(2);
    let reports = assert_send(strategy.run(&engine, &companies)).await;

    assert_eq!(reports.len(), 3);
    assert_eq!(reports[2].code.as_str(), "7974");
    assert!(reports.iter().all(|r| r.metrics.is_some()));
    assert_eq!(statements.calls.load(Ordering::SeqCst), 3);
    assert_eq!(prices.calls.load(Ordering::SeqCst), 3);
}
