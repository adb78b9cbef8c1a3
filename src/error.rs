//! Error taxonomy for the loss engine
//!
//! - [`TableError`]: reference data absent or malformed (fatal at startup)
//! - [`LookupError`]: an age the table cannot answer
//! - [`ValidationError`]: malformed intake or numeric input
//! - [`Error`]: crate-level wrapper, including which pipeline stage failed

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::tables::TableKind;

/// Reference table construction failures. These are configuration errors:
/// the store refuses to build and nothing is retried.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed CSV in {origin}: {source}")]
    Csv {
        origin: String,
        #[source]
        source: csv::Error,
    },

    #[error("malformed JSON reference data: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{table} table has no rows for {key}")]
    MissingPartition { table: TableKind, key: String },

    #[error("{table} table: invalid age key '{raw}'")]
    InvalidAgeKey { table: TableKind, raw: String },

    #[error("{table} table: age {age} for {key} has invalid value {value}")]
    InvalidValue {
        table: TableKind,
        key: String,
        age: u32,
        value: f64,
    },

    #[error("{table} table: duplicate age {age} for {key}")]
    DuplicateAge {
        table: TableKind,
        key: String,
        age: u32,
    },

    #[error("{table} table: {key} appears more than once")]
    DuplicatePartition { table: TableKind, key: String },

    #[error("{table} table: unrecognised {field} '{raw}'")]
    UnknownKey {
        table: TableKind,
        field: &'static str,
        raw: String,
    },
}

/// A query the table store cannot answer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LookupError {
    #[error("age {age} not found in {table} table for {key}")]
    AgeNotFound {
        table: TableKind,
        key: String,
        age: f64,
    },

    #[error("age must be a finite non-negative number, got {0}")]
    InvalidAge(f64),

    #[error("worklife lookup requires an education tier")]
    MissingEducation,
}

/// Rejected intake fields and numeric inputs.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("{field} must be a valid date (YYYY-MM-DD or MM/DD/YYYY), got '{value}'")]
    InvalidDate { field: &'static str, value: String },

    #[error("{0}")]
    DateOrder(String),

    #[error("unknown sex '{0}', expected male or female")]
    UnknownSex(String),

    #[error("unknown employment status '{0}'")]
    UnknownEmploymentStatus(String),

    #[error("{field} must be a finite number >= 0, got {value}")]
    NegativeOrNonFinite { field: String, value: f64 },

    #[error("{field} must be a finite rate above -100%, got {value}")]
    InvalidRate { field: &'static str, value: f64 },

    #[error("age {0} is outside the supported range 0..=120")]
    AgeOutOfRange(u32),
}

impl ValidationError {
    pub(crate) fn non_negative(field: impl Into<String>, value: f64) -> std::result::Result<f64, Self> {
        if value.is_finite() && value >= 0.0 {
            Ok(value)
        } else {
            Err(Self::NegativeOrNonFinite {
                field: field.into(),
                value,
            })
        }
    }

    pub(crate) fn rate(field: &'static str, value: f64) -> std::result::Result<f64, Self> {
        if value.is_finite() && value > -1.0 {
            Ok(value)
        } else {
            Err(Self::InvalidRate { field, value })
        }
    }
}

/// Pipeline stage names, used to say where a case failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    Intake,
    LifeExpectancy,
    Worklife,
    WageGrowth,
    Discount,
    PresentValue,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Intake => "intake validation",
            PipelineStage::LifeExpectancy => "life expectancy",
            PipelineStage::Worklife => "worklife expectancy",
            PipelineStage::WageGrowth => "wage projection",
            PipelineStage::Discount => "discount curve",
            PipelineStage::PresentValue => "present value",
        };
        f.write_str(name)
    }
}

/// Crate-level error
#[derive(Debug, Error)]
pub enum Error {
    #[error("reference table error: {0}")]
    Table(#[from] TableError),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("{stage} failed for case {case_id}: {source}")]
    Stage {
        stage: PipelineStage,
        case_id: String,
        #[source]
        source: Box<Error>,
    },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

impl Error {
    /// Attach the failing stage and case to an error.
    pub fn at_stage(self, stage: PipelineStage, case_id: &str) -> Self {
        Error::Stage {
            stage,
            case_id: case_id.to_string(),
            source: Box::new(self),
        }
    }

    /// The stage a pipeline error came from, if any.
    pub fn stage(&self) -> Option<PipelineStage> {
        match self {
            Error::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// The innermost error, with stage wrappers removed.
    pub fn root(&self) -> &Error {
        match self {
            Error::Stage { source, .. } => source.root(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_negative_check() {
        assert_eq!(ValidationError::non_negative("salary", 10.0), Ok(10.0));
        assert!(ValidationError::non_negative("salary", -1.0).is_err());
        assert!(ValidationError::non_negative("salary", f64::NAN).is_err());
        assert!(ValidationError::non_negative("salary", f64::INFINITY).is_err());
    }

    #[test]
    fn test_rate_check() {
        assert_eq!(ValidationError::rate("growth", -0.02), Ok(-0.02));
        assert!(ValidationError::rate("growth", -1.0).is_err());
        assert!(ValidationError::rate("growth", f64::NAN).is_err());
    }

    #[test]
    fn test_stage_wrapping_keeps_root() {
        let err = Error::from(LookupError::InvalidAge(-3.0)).at_stage(PipelineStage::Worklife, "case-1");
        assert_eq!(err.stage(), Some(PipelineStage::Worklife));
        assert!(matches!(err.root(), Error::Lookup(LookupError::InvalidAge(_))));
        assert!(err.to_string().contains("worklife expectancy failed for case case-1"));
    }
}
