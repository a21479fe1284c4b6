//! Interface to the narrative commentary collaborator.
//!
//! Commentary generation itself lives outside this crate. Callers hand over the
//! company's industry, metrics and augmented statements and get a markdown
//! string back.

use std::fmt::Debug;

use async_trait::async_trait;

use valuation_core::ValuationMetrics;

use crate::augment::AugmentedStatements;

/// Returned when there is nothing to comment on.
pub const NO_DATA: &str = "No Data";

/// Returned when no commentary backend is configured.
pub const NO_KEY: &str = "No commentary API key. No commentary applied.";

/// Inputs for one company's commentary.
#[derive(Debug, Clone, Copy)]
pub struct CommentaryRequest<'a> {
    /// Company industry.
    pub industry: &'a str,
    /// Metrics, when they could be computed.
    pub metrics: Option<&'a ValuationMetrics>,
    /// Augmented statements.
    pub statements: &'a AugmentedStatements,
}

impl CommentaryRequest<'_> {
    /// Returns true if neither metrics nor any statement rows are present.
    pub fn is_empty(&self) -> bool {
        self.metrics.is_none() && self.statements.is_empty()
    }
}

/// Produces a narrative for one company.
#[async_trait]
pub trait CommentaryProvider: Send + Sync + Debug {
    /// Returns markdown commentary, or a fixed message when none can be made.
    async fn comment(&self, request: CommentaryRequest<'_>) -> String;
}

/// Commentary backend used when no key is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledCommentary;

#[async_trait]
impl CommentaryProvider for DisabledCommentary {
    async fn comment(&self, request: CommentaryRequest<'_>) -> String {
        if request.is_empty() {
            NO_DATA.to_string()
        } else {
            NO_KEY.to_string()
        }
    }
}
