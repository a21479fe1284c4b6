//! Applying the single-company pipeline to many companies.
//!
//! Each company is analyzed independently; strategies only decide how many
//! pipelines are in flight. Reports always come back in input order.

use std::fmt::Debug;

use async_trait::async_trait;
use futures::StreamExt;
use tracing::info;

use crate::directory::Company;
use crate::engine::{CompanyReport, ValuationEngine};

/// Execution strategy for a batch of companies.
#[async_trait]
pub trait BatchStrategy: Send + Sync + Debug {
    /// Analyzes every company, returning one report per input in input order.
    async fn run(&self, engine: &ValuationEngine, companies: &[Company]) -> Vec<CompanyReport>;
}

/// One company at a time, each pipeline running to completion before the next.
#[derive(Debug, Clone, Copy, Default)]
pub struct Sequential;

#[async_trait]
impl BatchStrategy for Sequential {
    async fn run(&self, engine: &ValuationEngine, companies: &[Company]) -> Vec<CompanyReport> {
        info!(companies = companies.len(), "Running sequential batch");
        let mut reports = Vec::with_capacity(companies.len());
        for company in companies {
            reports.push(engine.analyze(company).await);
        }
        reports
    }
}

/// Up to `concurrency` pipelines in flight at once.
#[derive(Debug, Clone, Copy)]
pub struct Buffered {
    concurrency: usize,
}

impl Buffered {
    /// Creates a strategy with the given limit; values below 1 are raised to 1.
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    /// The in-flight limit.
    pub const fn concurrency(&self) -> usize {
        self.concurrency
    }
}

#[async_trait]
impl BatchStrategy for Buffered {
    async fn run(&self, engine: &ValuationEngine, companies: &[Company]) -> Vec<CompanyReport> {
        info!(
            companies = companies.len(),
            concurrency = self.concurrency,
            "Running buffered batch"
        );
        // Collected up front so no borrowing closure is held across the await.
        let pipelines: Vec<_> = companies.iter().map(|c| engine.analyze(c)).collect();
        futures::stream::iter(pipelines)
            .buffered(self.concurrency)
            .collect()
            .await
    }
}

/// Picks [`Sequential`] for a limit of 1 and [`Buffered`] otherwise.
pub fn strategy_for(concurrency: usize) -> Box<dyn BatchStrategy> {
    if concurrency <= 1 {
        Box::new(Sequential)
    } else {
        Box::new(Buffered::new(concurrency))
    }
}
