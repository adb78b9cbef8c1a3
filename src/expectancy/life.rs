//! Remaining life expectancy with a degraded baseline fallback
//!
//! A table miss never aborts a case here: the calculator substitutes a
//! hardcoded baseline, marks the result as a fallback and records it.
//! Callers that prefer to abort use [`LifeExpectancyCalculator::try_compute`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{remaining_by_age, Confidence};
use crate::error::{LookupError, ValidationError};
use crate::intake::Sex;
use crate::provenance::{ProvenanceEntry, ProvenanceLog};
use crate::tables::{ActuarialTableStore, LookupResult, TableKind};

const COMPONENT: &str = "LifeExpectancyCalculator";

/// Baseline life expectancy at birth used when the table cannot answer
pub const FALLBACK_MALE: f64 = 78.5;
pub const FALLBACK_FEMALE: f64 = 82.3;

fn fallback_baseline(sex: Sex) -> f64 {
    match sex {
        Sex::Male => FALLBACK_MALE,
        Sex::Female => FALLBACK_FEMALE,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LifeExpectancy {
    pub age: f64,
    pub sex: Sex,
    pub remaining_years: f64,
    /// Expected age at death (`age + remaining_years`)
    pub life_expectancy_at_birth: f64,
    pub is_fallback: bool,
    pub confidence: Confidence,
    /// Set when the age was past the last table row
    pub beyond_table: bool,
    pub remaining_by_age: BTreeMap<u32, f64>,
}

pub struct LifeExpectancyCalculator<'a> {
    store: &'a ActuarialTableStore,
}

impl<'a> LifeExpectancyCalculator<'a> {
    pub fn new(store: &'a ActuarialTableStore) -> Self {
        Self { store }
    }

    /// Remaining life years, falling back to the baseline on a table miss.
    ///
    /// Only malformed ages are rejected.
    pub fn compute(
        &self,
        age: f64,
        sex: Sex,
        log: &mut ProvenanceLog,
    ) -> Result<LifeExpectancy, ValidationError> {
        ValidationError::non_negative("age", age)?;
        log.record(ProvenanceEntry::input(
            COMPONENT,
            "Received decedent demographics",
            json!({"age": age, "sex": sex}),
        ));

        match self.store.life_expectancy(age, sex) {
            Ok(result) => Ok(self.table_result(result, log)),
            Err(err) => {
                let baseline = fallback_baseline(sex);
                let remaining = (baseline - age).max(0.0);
                log::warn!(
                    "Life table lookup failed ({}); using {} baseline {} for age {}",
                    err,
                    sex,
                    baseline,
                    age
                );
                log.record(
                    ProvenanceEntry::new(
                        COMPONENT,
                        "life_table_fallback",
                        format!("Table lookup failed ({}); baseline life expectancy used", err),
                        json!({"baseline": baseline, "remainingYears": remaining}),
                    )
                    .with_formula("max(0, baseline_life_expectancy - age)"),
                );
                Ok(LifeExpectancy {
                    age,
                    sex,
                    remaining_years: remaining,
                    life_expectancy_at_birth: age + remaining,
                    is_fallback: true,
                    confidence: Confidence::Degraded,
                    beyond_table: false,
                    remaining_by_age: remaining_by_age(age, remaining),
                })
            }
        }
    }

    /// Strict variant: any table miss is returned to the caller.
    pub fn try_compute(
        &self,
        age: f64,
        sex: Sex,
        log: &mut ProvenanceLog,
    ) -> Result<LifeExpectancy, LookupError> {
        let result = self.store.life_expectancy(age, sex)?;
        log.record(ProvenanceEntry::input(
            COMPONENT,
            "Received decedent demographics",
            json!({"age": age, "sex": sex}),
        ));
        Ok(self.table_result(result, log))
    }

    fn table_result(&self, result: LookupResult, log: &mut ProvenanceLog) -> LifeExpectancy {
        let source = self.store.source(TableKind::LifeExpectancy);
        log.record(
            ProvenanceEntry::new(
                COMPONENT,
                "life_table_lookup",
                source.name.clone(),
                json!({"remainingYears": result.value, "method": result.method}),
            )
            .with_formula("e(x) at age x; linear interpolation between whole ages")
            .with_source(source.url.clone(), source.published.clone()),
        );

        let beyond_table = result.is_beyond_table();
        if beyond_table {
            log.record(ProvenanceEntry::new(
                COMPONENT,
                "beyond_table_sentinel",
                "Age is past the last table row; sentinel remaining years used",
                json!(result.value),
            ));
        }

        let remaining = result.value;
        log.record(
            ProvenanceEntry::new(
                COMPONENT,
                "remaining_years_calculation",
                "Expected age at death",
                json!(result.age + remaining),
            )
            .with_formula("age + remaining_years"),
        );

        LifeExpectancy {
            age: result.age,
            sex: result.sex,
            remaining_years: remaining,
            life_expectancy_at_birth: result.age + remaining,
            is_fallback: false,
            confidence: Confidence::Table,
            beyond_table,
            remaining_by_age: remaining_by_age(result.age, remaining),
        }
    }
}
