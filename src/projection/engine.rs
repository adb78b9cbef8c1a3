//! Present-value engine: builds the year-by-year loss ledger

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde_json::json;

use super::ledger::{CashflowYear, Ledger};
use super::proration::{first_year_portion, year_portions};
use crate::economics::DiscountCurve;
use crate::error::ValidationError;
use crate::provenance::{ProvenanceEntry, ProvenanceLog};

const COMPONENT: &str = "PresentValueEngine";

/// Inputs for one ledger run
#[derive(Debug, Clone)]
pub struct LedgerInputs<'a> {
    pub start_age: f64,
    pub worklife_years: f64,
    /// Projected wage per year index
    pub wages: &'a [f64],
    pub discount_curve: &'a DiscountCurve,
    /// Annual benefit amounts, added flat to every year
    pub benefits: &'a BTreeMap<String, f64>,
    /// When set, year 0 is prorated to the end of its calendar year
    pub start_date: Option<NaiveDate>,
}

/// Turns a worklife, wage series and discount curve into a ledger
#[derive(Debug, Clone, Copy, Default)]
pub struct PresentValueEngine;

impl PresentValueEngine {
    /// Build the ledger.
    ///
    /// Year `t` runs for `portion_of_year` of the year and is discounted by
    /// `1/(1+r_t)^(t+1)`. Rows with no portion are not emitted. If `wages`
    /// is shorter than the worklife needs, the ledger stops at the end of the
    /// wage series and is marked `horizon_truncated`.
    pub fn compute_ledger(
        &self,
        inputs: &LedgerInputs<'_>,
        log: &mut ProvenanceLog,
    ) -> Result<Ledger, ValidationError> {
        let start_age = ValidationError::non_negative("start_age", inputs.start_age)?;
        let worklife = ValidationError::non_negative("worklife_years", inputs.worklife_years)?;
        for (year, wage) in inputs.wages.iter().enumerate() {
            ValidationError::non_negative(format!("wages[{}]", year), *wage)?;
        }
        for (name, amount) in inputs.benefits {
            ValidationError::non_negative(format!("benefits.{}", name), *amount)?;
        }
        let curve = inputs.discount_curve;
        if curve.is_empty() {
            return Err(ValidationError::MissingField("discount_curve"));
        }
        let benefits: f64 = inputs.benefits.values().sum();

        log.record(ProvenanceEntry::input(
            COMPONENT,
            "Received present value inputs",
            json!({
                "startAge": start_age,
                "worklifeYears": worklife,
                "wageYears": inputs.wages.len(),
                "benefits": inputs.benefits,
                "startDate": inputs.start_date,
            }),
        ));

        if let Some(date) = inputs.start_date {
            log.record(
                ProvenanceEntry::new(
                    COMPONENT,
                    "first_year_proration",
                    format!("First-year portion from {} to year end", date),
                    json!(first_year_portion(date)),
                )
                .with_formula("(days_in_year - day_of_year + 1) / days_in_year"),
            );
        }

        let mut portions = year_portions(worklife, inputs.start_date);
        let years_requested = portions.len();
        let horizon_truncated = portions
            .last()
            .is_some_and(|(year, _)| *year >= inputs.wages.len());
        if horizon_truncated {
            portions.retain(|(year, _)| *year < inputs.wages.len());
            log::warn!(
                "Wage series covers {} years but worklife of {:.2} years needs {}; ledger truncated",
                inputs.wages.len(),
                worklife,
                years_requested
            );
        }

        let rows: Vec<CashflowYear> = portions
            .into_iter()
            .scan((0.0_f64, 0.0_f64), |running, (year, portion)| {
                let wage = inputs.wages[year];
                let full_year_value = wage + benefits;
                let actual_value = full_year_value * portion;
                let discount_factor = curve.discount_factor(year);
                let present_value = actual_value * discount_factor;
                running.0 += actual_value;
                running.1 += present_value;

                Some(CashflowYear {
                    year_index: year,
                    age: start_age + year as f64,
                    portion_of_year: portion,
                    wage,
                    benefits,
                    full_year_value,
                    actual_value,
                    cumulative_actual_value: running.0,
                    discount_rate: curve.rate_for_year(year),
                    discount_factor,
                    present_value,
                    cumulative_present_value: running.1,
                })
            })
            .collect();

        let total_nominal: f64 = rows.iter().map(|r| r.actual_value).sum();
        let total_present_value: f64 = rows.iter().map(|r| r.present_value).sum();

        log.record(
            ProvenanceEntry::new(
                COMPONENT,
                "cashflow_projection",
                format!("Projected {} years of wages and benefits", rows.len()),
                json!({"totalNominal": total_nominal}),
            )
            .with_formula("actual_value[t] = (wage[t] + benefits) * portion_of_year[t]"),
        );

        if horizon_truncated {
            log.record(ProvenanceEntry::new(
                COMPONENT,
                "horizon_truncated",
                "Wage series shorter than worklife; ledger ends with the wage series",
                json!({"yearsRequested": years_requested, "yearsEmitted": rows.len()}),
            ));
        }

        log.record(
            ProvenanceEntry::new(
                COMPONENT,
                "present_value_calculation",
                "Present value of lost earnings",
                json!(total_present_value),
            )
            .with_formula("PV = sum(actual_value[t] / (1 + r_t)^(t + 1))"),
        );

        Ok(Ledger {
            rows,
            total_nominal,
            total_present_value,
            worklife_years: worklife,
            years_requested,
            horizon_truncated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::economics::WageProjector;
    use approx::assert_relative_eq;

    fn run(
        worklife: f64,
        wages: &[f64],
        rate: f64,
        benefits: &BTreeMap<String, f64>,
        start_date: Option<NaiveDate>,
    ) -> (Ledger, ProvenanceLog) {
        let curve = DiscountCurve::flat(rate, wages.len()).unwrap();
        let mut log = ProvenanceLog::new();
        let ledger = PresentValueEngine
            .compute_ledger(
                &LedgerInputs {
                    start_age: 35.0,
                    worklife_years: worklife,
                    wages,
                    discount_curve: &curve,
                    benefits,
                    start_date,
                },
                &mut log,
            )
            .unwrap();
        (ledger, log)
    }

    #[test]
    fn test_thirty_year_round_trip() {
        let wages = WageProjector.project(85_000.0, 0.035, 30).unwrap();
        let (ledger, _) = run(30.0, &wages, 0.035, &BTreeMap::new(), None);

        assert_eq!(ledger.len(), 30);
        let expected_nominal = 85_000.0 * (1.035f64.powi(30) - 1.0) / 0.035;
        assert_relative_eq!(ledger.total_nominal, expected_nominal, max_relative = 1e-9);
        // growth equal to discount: every year is worth salary / 1.035 today
        assert_relative_eq!(ledger.total_present_value, 30.0 * 85_000.0 / 1.035, max_relative = 1e-9);
        assert!(ledger.total_present_value < ledger.total_nominal);
    }

    #[test]
    fn test_present_value_below_nominal_for_positive_rate() {
        let wages = WageProjector.project(60_000.0, 0.02, 20).unwrap();
        let (ledger, _) = run(19.3, &wages, 0.04, &BTreeMap::new(), None);
        assert!(ledger.total_present_value < ledger.total_nominal);
    }

    #[test]
    fn test_row_identities() {
        let wages = WageProjector.project(50_000.0, 0.03, 12).unwrap();
        let benefits = BTreeMap::from([
            ("retirement_contribution".to_string(), 2_500.0),
            ("health_benefits".to_string(), 6_000.0),
        ]);
        let start = NaiveDate::from_ymd_opt(2025, 4, 10);
        let (ledger, log) = run(10.6, &wages, 0.045, &benefits, start);

        let mut cumulative_actual = 0.0;
        let mut cumulative_pv = 0.0;
        for row in &ledger.rows {
            assert!(row.portion_of_year > 0.0 && row.portion_of_year <= 1.0);
            assert_relative_eq!(row.full_year_value, row.wage + 8_500.0, epsilon = 1e-9);
            assert_relative_eq!(row.actual_value, row.full_year_value * row.portion_of_year, epsilon = 1e-9);
            let factor = 1.0 / (1.0 + row.discount_rate).powi(row.year_index as i32 + 1);
            assert!((row.discount_factor - factor).abs() < 1e-9);
            assert_relative_eq!(row.present_value, row.actual_value * row.discount_factor, epsilon = 1e-9);

            cumulative_actual += row.actual_value;
            cumulative_pv += row.present_value;
            assert_relative_eq!(row.cumulative_actual_value, cumulative_actual, max_relative = 1e-12);
            assert_relative_eq!(row.cumulative_present_value, cumulative_pv, max_relative = 1e-12);
        }

        let last = ledger.rows.last().unwrap();
        assert_relative_eq!(last.cumulative_actual_value, ledger.total_nominal, max_relative = 1e-12);
        assert_relative_eq!(last.cumulative_present_value, ledger.total_present_value, max_relative = 1e-12);
        assert_eq!(ledger.len(), 11);
        assert_relative_eq!(last.portion_of_year, 0.6, epsilon = 1e-9);
        assert_relative_eq!(
            ledger.rows[0].portion_of_year,
            first_year_portion(NaiveDate::from_ymd_opt(2025, 4, 10).unwrap()),
            epsilon = 1e-12
        );
        assert!(log.contains_step("first_year_proration"));
    }

    #[test]
    fn test_zero_worklife() {
        let wages = WageProjector.project(50_000.0, 0.03, 5).unwrap();
        let (ledger, log) = run(0.0, &wages, 0.03, &BTreeMap::new(), None);
        assert!(ledger.is_empty());
        assert_eq!(ledger.total_nominal, 0.0);
        assert_eq!(ledger.total_present_value, 0.0);
        assert!(log.contains_step("present_value_calculation"));
    }

    #[test]
    fn test_short_wage_series_truncates() {
        let wages = WageProjector.project(50_000.0, 0.03, 5).unwrap();
        let (ledger, log) = run(8.5, &wages, 0.03, &BTreeMap::new(), None);
        assert!(ledger.horizon_truncated);
        assert_eq!(ledger.len(), 5);
        assert_eq!(ledger.years_requested, 9);
        assert!(log.contains_step("horizon_truncated"));
    }

    #[test]
    fn test_discount_rate_clamped_to_curve_end() {
        let wages = vec![1_000.0; 4];
        let curve = DiscountCurve::from_rates(vec![0.01, 0.02]).unwrap();
        let mut log = ProvenanceLog::new();
        let benefits = BTreeMap::new();
        let ledger = PresentValueEngine
            .compute_ledger(
                &LedgerInputs {
                    start_age: 50.0,
                    worklife_years: 4.0,
                    wages: &wages,
                    discount_curve: &curve,
                    benefits: &benefits,
                    start_date: None,
                },
                &mut log,
            )
            .unwrap();
        assert_eq!(ledger.rows[3].discount_rate, 0.02);
        assert_relative_eq!(ledger.rows[3].discount_factor, 1.0 / 1.02f64.powi(4), epsilon = 1e-12);
        assert_eq!(ledger.rows[3].age, 53.0);
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        let wages = vec![1_000.0; 4];
        let curve = DiscountCurve::flat(0.03, 4).unwrap();
        let benefits = BTreeMap::from([("health_benefits".to_string(), -5.0)]);
        let mut log = ProvenanceLog::new();

        let bad_benefit = LedgerInputs {
            start_age: 50.0,
            worklife_years: 4.0,
            wages: &wages,
            discount_curve: &curve,
            benefits: &benefits,
            start_date: None,
        };
        assert!(PresentValueEngine.compute_ledger(&bad_benefit, &mut log).is_err());

        let no_benefits = BTreeMap::new();
        let bad_worklife = LedgerInputs {
            worklife_years: -1.0,
            benefits: &no_benefits,
            ..bad_benefit.clone()
        };
        assert!(matches!(
            PresentValueEngine.compute_ledger(&bad_worklife, &mut log),
            Err(ValidationError::NegativeOrNonFinite { .. })
        ));

        let nan_worklife = LedgerInputs {
            worklife_years: f64::NAN,
            benefits: &no_benefits,
            ..bad_benefit
        };
        assert!(PresentValueEngine.compute_ledger(&nan_worklife, &mut log).is_err());
    }
}
