//! Filing basis classification.
//!
//! The fundamentals provider labels each disclosure with a `DocType` such as
//! `FYFinancialStatements_Consolidated_IFRS` or
//! `3QFinancialStatements_Consolidated_JP`. Only full fiscal-year documents are
//! trusted for earnings-based ratios.

use serde::{Deserialize, Serialize};

/// Markers that identify a full fiscal-year document, matched case-insensitively.
const ANNUAL_MARKERS: &[&str] = &["fy", "annual"];

/// Whether a filing covers a full fiscal year.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilingBasis {
    /// Full fiscal-year filing.
    Annual,
    /// Quarterly, half-year, or forecast-revision filing.
    #[default]
    Interim,
}

impl FilingBasis {
    /// Classifies a provider `DocType` string.
    #[must_use]
    pub fn from_doc_type(doc_type: &str) -> Self {
        let lowered = doc_type.to_lowercase();
        if ANNUAL_MARKERS.iter().any(|m| lowered.contains(m)) {
            Self::Annual
        } else {
            Self::Interim
        }
    }

    /// Returns true for [`FilingBasis::Annual`].
    #[must_use]
    pub const fn is_annual(&self) -> bool {
        matches!(self, Self::Annual)
    }
}
