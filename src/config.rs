//! Engine configuration
//!
//! Defaults, overridden by environment variables, overridden in turn by CLI
//! flags in the binaries:
//!
//! | variable              | default       |
//! |-----------------------|---------------|
//! | `FORENSIC_TABLES_DIR` | `data/tables` |
//! | `DISCOUNT_RATE`       | `0.035`       |
//! | `BASE_GROWTH_RATE`    | `0.03`        |
//! | `GROWTH_RATE`         | unset (education-adjusted) |
//! | `PRORATE_FIRST_YEAR`  | `false`       |
//! | `TABLE_INTERPOLATION` | `adjacent`    |

use std::env;
use std::path::PathBuf;

use crate::economics::{GrowthRateTable, DEFAULT_BASE_GROWTH_RATE, DEFAULT_DISCOUNT_RATE};
use crate::error::TableError;
use crate::pipeline::{CaseAssumptions, GrowthRateSource};
use crate::tables::{loader::DEFAULT_TABLES_PATH, ActuarialTableStore, InterpolationMode};

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub tables_dir: PathBuf,
    pub discount_rate: f64,
    pub base_growth_rate: f64,
    /// Fixed growth rate; when unset the rate is derived from education
    pub growth_rate: Option<f64>,
    pub prorate_first_year: bool,
    pub interpolation: InterpolationMode,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tables_dir: PathBuf::from(DEFAULT_TABLES_PATH),
            discount_rate: DEFAULT_DISCOUNT_RATE,
            base_growth_rate: DEFAULT_BASE_GROWTH_RATE,
            growth_rate: None,
            prorate_first_year: false,
            interpolation: InterpolationMode::Adjacent,
        }
    }
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

impl EngineConfig {
    /// Read config from the process environment or use defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unparseable values fall back to defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let number = |key: &str| lookup(key).and_then(|s| s.trim().parse::<f64>().ok());

        Self {
            tables_dir: lookup("FORENSIC_TABLES_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.tables_dir),
            discount_rate: number("DISCOUNT_RATE").unwrap_or(defaults.discount_rate),
            base_growth_rate: number("BASE_GROWTH_RATE").unwrap_or(defaults.base_growth_rate),
            growth_rate: number("GROWTH_RATE"),
            prorate_first_year: lookup("PRORATE_FIRST_YEAR")
                .and_then(|s| parse_flag(&s))
                .unwrap_or(defaults.prorate_first_year),
            interpolation: match lookup("TABLE_INTERPOLATION").as_deref().map(str::trim) {
                Some("bracketing") => InterpolationMode::Bracketing,
                _ => defaults.interpolation,
            },
        }
    }

    /// Per-case economic assumptions
    pub fn case_assumptions(&self) -> CaseAssumptions {
        let growth = match self.growth_rate {
            Some(rate) => GrowthRateSource::Fixed(rate),
            None => GrowthRateSource::EducationAdjusted(GrowthRateTable::with_base_rate(self.base_growth_rate)),
        };
        CaseAssumptions {
            discount_rate: self.discount_rate,
            growth,
            prorate_first_year: self.prorate_first_year,
        }
    }

    /// Load and validate the reference tables this config points at
    pub fn load_tables(&self) -> Result<ActuarialTableStore, TableError> {
        let is_json = self
            .tables_dir
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let store = if is_json {
            ActuarialTableStore::from_json_path(&self.tables_dir)?
        } else {
            ActuarialTableStore::from_csv_path(&self.tables_dir)?
        };
        Ok(store.with_interpolation(self.interpolation))
    }
}
