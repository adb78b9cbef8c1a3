//! Wage projection and growth-rate derivation

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::ValidationError;
use crate::intake::EducationTier;
use crate::provenance::{ProvenanceEntry, ProvenanceLog};

const COMPONENT: &str = "WageProjector";

/// Historical average nominal wage growth
pub const DEFAULT_BASE_GROWTH_RATE: f64 = 0.03;

const ECI_SOURCE_URL: &str = "https://www.bls.gov/ncs/ect/";
const ECI_SOURCE_DATE: &str = "2023-01-01";

/// Base wage growth plus a fixed adjustment per education tier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrowthRateTable {
    pub base_rate: f64,
    /// Indexed by [`EducationTier::index`]
    pub adjustments: [f64; 4],
}

impl Default for GrowthRateTable {
    fn default() -> Self {
        Self::with_base_rate(DEFAULT_BASE_GROWTH_RATE)
    }
}

impl GrowthRateTable {
    pub fn with_base_rate(base_rate: f64) -> Self {
        Self {
            base_rate,
            adjustments: [-0.005, 0.0, 0.002, 0.005],
        }
    }

    pub fn adjustment(&self, tier: EducationTier) -> f64 {
        self.adjustments[tier.index()]
    }

    /// `base_rate + adjustment(tier)`
    pub fn rate_for(&self, tier: EducationTier) -> f64 {
        self.base_rate + self.adjustment(tier)
    }

    /// Derive the growth rate for a tier and record both components
    pub fn derive(&self, tier: EducationTier, log: &mut ProvenanceLog) -> Result<f64, ValidationError> {
        let base = ValidationError::rate("base_growth_rate", self.base_rate)?;
        log.record(
            ProvenanceEntry::new(
                COMPONENT,
                "base_growth_rate",
                "Historical average wage growth rate (BLS Employment Cost Index)",
                json!(base),
            )
            .with_formula("BLS Employment Cost Index average")
            .with_source(ECI_SOURCE_URL, ECI_SOURCE_DATE),
        );

        let rate = ValidationError::rate("annual_growth_rate", self.rate_for(tier))?;
        log.record(
            ProvenanceEntry::new(
                COMPONENT,
                "education_adjustment",
                format!("Adjust growth rate for {} education", tier),
                json!({"adjustment": self.adjustment(tier), "growthRate": rate}),
            )
            .with_formula("base_growth_rate + education_adjustment"),
        );
        Ok(rate)
    }
}

/// Compounds a salary forward at a constant growth rate
#[derive(Debug, Clone, Copy, Default)]
pub struct WageProjector;

impl WageProjector {
    /// `wage[0] = salary`, `wage[t] = wage[t-1] * (1 + growth)`, for
    /// `horizon_years` entries.
    pub fn project(
        &self,
        current_salary: f64,
        annual_growth_rate: f64,
        horizon_years: usize,
    ) -> Result<Vec<f64>, ValidationError> {
        let salary = ValidationError::non_negative("current_salary", current_salary)?;
        let growth = ValidationError::rate("annual_growth_rate", annual_growth_rate)?;
        Ok(std::iter::successors(Some(salary), |wage| Some(wage * (1.0 + growth)))
            .take(horizon_years)
            .collect())
    }

    /// [`WageProjector::project`], recording inputs and the resulting series
    pub fn project_recorded(
        &self,
        current_salary: f64,
        annual_growth_rate: f64,
        horizon_years: usize,
        log: &mut ProvenanceLog,
    ) -> Result<Vec<f64>, ValidationError> {
        let wages = self.project(current_salary, annual_growth_rate, horizon_years)?;
        log.record(ProvenanceEntry::input(
            COMPONENT,
            "Received wage projection parameters",
            json!({
                "currentSalary": current_salary,
                "annualGrowthRate": annual_growth_rate,
                "horizonYears": horizon_years,
            }),
        ));
        log.record(
            ProvenanceEntry::new(
                COMPONENT,
                "wage_projection",
                format!("Projected wages for {} years", wages.len()),
                json!({"firstYear": wages.first(), "finalYear": wages.last()}),
            )
            .with_formula("wage[t] = wage[t-1] * (1 + g)"),
        );
        Ok(wages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_compounding() {
        let wages = WageProjector.project(50_000.0, 0.03, 3).unwrap();
        assert_eq!(wages.len(), 3);
        assert_eq!(wages[0], 50_000.0);
        assert_relative_eq!(wages[1], 51_500.0, epsilon = 1e-9);
        assert_relative_eq!(wages[2], 53_045.0, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_horizon_is_empty() {
        assert!(WageProjector.project(50_000.0, 0.03, 0).unwrap().is_empty());
    }

    #[test]
    fn test_negative_growth_allowed() {
        let wages = WageProjector.project(100.0, -0.1, 2).unwrap();
        assert_relative_eq!(wages[1], 90.0, epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_inputs() {
        assert!(WageProjector.project(-1.0, 0.03, 5).is_err());
        assert!(WageProjector.project(f64::NAN, 0.03, 5).is_err());
        assert!(WageProjector.project(1.0, f64::INFINITY, 5).is_err());
        assert!(WageProjector.project(1.0, -1.0, 5).is_err());
    }

    #[test]
    fn test_growth_table_rates() {
        let table = GrowthRateTable::default();
        assert_relative_eq!(table.rate_for(EducationTier::LessThanHighSchool), 0.025, epsilon = 1e-12);
        assert_relative_eq!(table.rate_for(EducationTier::HighSchool), 0.03, epsilon = 1e-12);
        assert_relative_eq!(table.rate_for(EducationTier::SomeCollege), 0.032, epsilon = 1e-12);
        assert_relative_eq!(table.rate_for(EducationTier::BachelorsOrHigher), 0.035, epsilon = 1e-12);
    }

    #[test]
    fn test_derive_records_provenance() {
        let mut log = ProvenanceLog::new();
        let rate = GrowthRateTable::with_base_rate(0.025)
            .derive(EducationTier::SomeCollege, &mut log)
            .unwrap();
        assert_relative_eq!(rate, 0.027, epsilon = 1e-12);
        assert_eq!(log.len(), 2);
        assert_eq!(log.data_sources()[0].source_url, ECI_SOURCE_URL);
    }
}
