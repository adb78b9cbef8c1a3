//! Forensic Economics - wrongful-death economic loss engine
//!
//! This library provides:
//! - Life and worklife expectancy lookups against validated reference tables
//! - Wage projection with education-adjusted growth
//! - Present-value cashflow ledgers with first/final-year proration
//! - Provenance (audit trail) for every calculation step
//! - Parallel batch processing of case intakes

pub mod error;
pub mod provenance;
pub mod intake;
pub mod tables;
pub mod expectancy;
pub mod economics;
pub mod projection;
pub mod pipeline;
pub mod report;
pub mod config;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use error::{Error, Result};
pub use intake::{Intake, Sex, EducationTier};
pub use tables::{ActuarialTableStore, InterpolationMode};
pub use projection::{PresentValueEngine, Ledger, CashflowYear};
pub use pipeline::{CasePipeline, CaseAssumptions, CaseReport, CaseFlag};
pub use config::EngineConfig;
