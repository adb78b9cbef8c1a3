//! Worklife expectancy by age, sex and education tier
//!
//! Unlike the life calculator there is no fallback: any lookup failure is
//! returned to the caller.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::remaining_by_age;
use crate::error::{Result, ValidationError};
use crate::intake::{normalize_education, EducationMatch, EducationTier, MatchMethod, Sex};
use crate::provenance::{ProvenanceEntry, ProvenanceLog};
use crate::tables::{ActuarialTableStore, TableKind};

const COMPONENT: &str = "WorklifeExpectancyCalculator";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorklifeExpectancy {
    pub age: f64,
    pub sex: Sex,
    pub worklife_years: f64,
    /// `floor(age + worklife_years)`
    pub implied_retirement_age: u32,
    pub education_tier: EducationTier,
    pub education_match: EducationMatch,
    pub beyond_table: bool,
    pub remaining_by_age: BTreeMap<u32, f64>,
}

pub struct WorklifeExpectancyCalculator<'a> {
    store: &'a ActuarialTableStore,
}

impl<'a> WorklifeExpectancyCalculator<'a> {
    pub fn new(store: &'a ActuarialTableStore) -> Self {
        Self { store }
    }

    /// Normalize free-text education, then look up worklife years
    pub fn compute(
        &self,
        age: f64,
        sex: Sex,
        education: &str,
        log: &mut ProvenanceLog,
    ) -> Result<WorklifeExpectancy> {
        let education_match = normalize_education(education);
        match education_match.method {
            MatchMethod::Defaulted => log::warn!(
                "Education '{}' not recognised; defaulting to {}",
                education,
                education_match.tier
            ),
            MatchMethod::Keyword => log::debug!(
                "Education '{}' matched {} by keyword",
                education,
                education_match.tier
            ),
            _ => {}
        }
        self.compute_for_match(age, sex, education_match, log)
    }

    /// Look up worklife years for an already-known tier
    pub fn compute_for_tier(
        &self,
        age: f64,
        sex: Sex,
        tier: EducationTier,
        log: &mut ProvenanceLog,
    ) -> Result<WorklifeExpectancy> {
        let education_match = EducationMatch {
            input: tier.key().to_string(),
            tier,
            method: MatchMethod::Exact,
        };
        self.compute_for_match(age, sex, education_match, log)
    }

    fn compute_for_match(
        &self,
        age: f64,
        sex: Sex,
        education_match: EducationMatch,
        log: &mut ProvenanceLog,
    ) -> Result<WorklifeExpectancy> {
        ValidationError::non_negative("age", age)?;
        let tier = education_match.tier;

        log.record(ProvenanceEntry::input(
            COMPONENT,
            "Received decedent demographics",
            json!({"age": age, "sex": sex, "education": education_match.input}),
        ));
        log.record(ProvenanceEntry::new(
            COMPONENT,
            "education_normalization",
            format!("Education mapped to tier {}", tier),
            json!({"tier": tier, "method": education_match.method}),
        ));

        let result = self.store.worklife_expectancy(age, sex, tier)?;
        let source = self.store.source(TableKind::WorklifeExpectancy);
        log.record(
            ProvenanceEntry::new(
                COMPONENT,
                "worklife_table_lookup",
                source.name.clone(),
                json!({"worklifeYears": result.value, "method": result.method}),
            )
            .with_formula("WLE(x, sex, education); linear interpolation between whole ages")
            .with_source(source.url.clone(), source.published.clone()),
        );

        let beyond_table = result.is_beyond_table();
        if beyond_table {
            log.record(ProvenanceEntry::new(
                COMPONENT,
                "beyond_table_sentinel",
                "Age is past the last table row; no remaining worklife",
                json!(result.value),
            ));
        }

        let worklife_years = result.value;
        let implied_retirement_age = (age + worklife_years).floor() as u32;
        log.record(
            ProvenanceEntry::new(
                COMPONENT,
                "retirement_age_calculation",
                "Implied retirement age",
                json!(implied_retirement_age),
            )
            .with_formula("floor(age + worklife_years)"),
        );

        Ok(WorklifeExpectancy {
            age,
            sex,
            worklife_years,
            implied_retirement_age,
            education_tier: tier,
            education_match,
            beyond_table,
            remaining_by_age: remaining_by_age(age, worklife_years),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, LookupError};
    use crate::test_support::fixture_store;
    use approx::assert_relative_eq;

    #[test]
    fn test_compute_from_free_text() {
        let store = fixture_store();
        let mut log = ProvenanceLog::new();
        let result = WorklifeExpectancyCalculator::new(&store)
            .compute(39.0, Sex::Male, "Bachelor's Degree", &mut log)
            .unwrap();
        let expected = (67.0 - 39.0) * 0.85 + 1.5;
        assert_relative_eq!(result.worklife_years, expected, epsilon = 1e-12);
        assert_eq!(result.education_tier, EducationTier::BachelorsOrHigher);
        assert_eq!(result.implied_retirement_age, (39.0 + expected).floor() as u32);
        assert!(log.contains_step("worklife_table_lookup"));
    }

    #[test]
    fn test_sentinel_beyond_table() {
        let store = fixture_store();
        let mut log = ProvenanceLog::new();
        let result = WorklifeExpectancyCalculator::new(&store)
            .compute_for_tier(80.0, Sex::Male, EducationTier::HighSchool, &mut log)
            .unwrap();
        assert_eq!(result.worklife_years, 0.0);
        assert_eq!(result.implied_retirement_age, 80);
        assert!(result.beyond_table);
    }

    #[test]
    fn test_missing_age_propagates() {
        let store = fixture_store();
        let mut log = ProvenanceLog::new();
        let err = WorklifeExpectancyCalculator::new(&store)
            .compute(45.0, Sex::Female, "some college", &mut log)
            .unwrap_err();
        assert!(matches!(err, Error::Lookup(LookupError::AgeNotFound { .. })));
    }

    #[test]
    fn test_unrecognised_education_defaults() {
        let store = fixture_store();
        let mut log = ProvenanceLog::new();
        let result = WorklifeExpectancyCalculator::new(&store)
            .compute(30.0, Sex::Female, "homeschooled", &mut log)
            .unwrap();
        assert_eq!(result.education_tier, EducationTier::HighSchool);
        assert!(result.education_match.is_defaulted());
    }

    #[test]
    fn test_negative_age_rejected() {
        let store = fixture_store();
        let mut log = ProvenanceLog::new();
        let err = WorklifeExpectancyCalculator::new(&store)
            .compute_for_tier(-1.0, Sex::Male, EducationTier::HighSchool, &mut log)
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
