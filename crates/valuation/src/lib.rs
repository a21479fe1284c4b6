#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/valuation/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Valuation engine for listed Japanese companies.
//!
//! This crate re-exports the core types and provider implementations and adds
//! the pipeline on top of them:
//!
//! - [`augment`] - Derived statement columns and frame export
//! - [`select`] - Annual/interim record selection
//! - [`metrics`] - PER, PBR, ROE, ROA and equity ratio
//! - [`ValuationEngine`] - Single-company pipeline
//! - [`BatchStrategy`] - Sequential or buffered batches
//! - [`CompanyDirectory`] - EDINET code list
//! - [`CommentaryProvider`] - Narrative commentary seam
//!
//! # Features
//!
//! - `jquants` - J-Quants statement provider
//! - `yahoo` - Yahoo Finance price provider
//!
//! # Example
//!
//! ```rust,ignore
//! use valuation::{Company, EngineConfig, ValuationEngine};
//!
//! #[tokio::main]
//! async fn main() -> valuation::Result<()> {
//!     let config = EngineConfig::from_env()?;
//!     let engine = ValuationEngine::from_config(&config)?;
//!
//!     let report = engine.analyze(&Company::new("Toyota", "輸送用機器", "72030")).await;
//!     println!("{:?}", report.metrics);
//!
//!     Ok(())
//! }
//! ```

// Core types and traits
pub use valuation_core::*;

// Providers
#[cfg(feature = "jquants")]
pub use valuation_jquants::JQuantsProvider;
#[cfg(feature = "yahoo")]
pub use valuation_yahoo::YahooProvider;

pub mod augment;
pub mod batch;
pub mod commentary;
pub mod directory;
mod engine;
pub mod metrics;
pub mod select;

pub use augment::{Augment, Augmented, AugmentedStatements, StatementSet};
pub use batch::{BatchStrategy, Buffered, Sequential, strategy_for};
pub use commentary::{CommentaryProvider, CommentaryRequest, DisabledCommentary};
pub use directory::{Company, CompanyDirectory};
pub use engine::{CompanyReport, ValuationEngine};
