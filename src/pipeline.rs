//! Case pipeline: intake to present-value report
//!
//! Holds a reference to the loaded table store and runs each case through
//! life, worklife, growth, wage, discount and ledger steps, concatenating
//! provenance in call order. Batches run in parallel, one independent
//! pipeline invocation per case.
//!
//! # Example
//! ```ignore
//! let store = ActuarialTableStore::from_csv()?;
//! let pipeline = CasePipeline::new(&store, CaseAssumptions::default());
//! let report = pipeline.run(&intake)?;
//! println!("PV: {:.2}", report.total_present_value);
//! ```

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{DateTime, NaiveDate, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::economics::{
    DiscountCurveProvider, GrowthRateTable, WageProjector, DEFAULT_DISCOUNT_RATE,
};
use crate::error::{Error, PipelineStage, Result, ValidationError};
use crate::expectancy::{
    LifeExpectancy, LifeExpectancyCalculator, WorklifeExpectancy, WorklifeExpectancyCalculator,
};
use crate::intake::{BatchRecord, EmploymentStatus, Intake, MatchMethod, Sex};
use crate::projection::{LedgerInputs, Ledger, LedgerSummary, PresentValueEngine};
use crate::provenance::{DataSource, ProvenanceEntry, ProvenanceLog};
use crate::tables::ActuarialTableStore;

const COMPONENT: &str = "CasePipeline";

/// Where a case's wage growth rate comes from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GrowthRateSource {
    /// One externally supplied rate
    Fixed(f64),
    /// Base rate plus the education-tier adjustment
    EducationAdjusted(GrowthRateTable),
}

impl Default for GrowthRateSource {
    fn default() -> Self {
        GrowthRateSource::EducationAdjusted(GrowthRateTable::default())
    }
}

/// Economic assumptions applied to every case in a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseAssumptions {
    pub discount_rate: f64,
    pub growth: GrowthRateSource,
    /// Prorate year 0 from the present date to the end of its calendar year
    pub prorate_first_year: bool,
}

impl Default for CaseAssumptions {
    fn default() -> Self {
        Self {
            discount_rate: DEFAULT_DISCOUNT_RATE,
            growth: GrowthRateSource::default(),
            prorate_first_year: false,
        }
    }
}

/// Conditions a reviewer should see before relying on a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseFlag {
    /// Life table could not answer; baseline fallback used
    LifeExpectancyFallback,
    /// Education text matched nothing; default tier used
    EducationDefaulted,
    /// Education tier inferred from keywords rather than an exact or alias match
    EducationKeywordMatch,
    /// An age was past the last table row; sentinel value used
    BeyondTable,
    /// Ledger stopped before the end of the worklife
    HorizonTruncated,
}

/// Identifying details of the decedent carried into the report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VictimSummary {
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    pub present_date: NaiveDate,
    pub date_of_death: Option<NaiveDate>,
    pub age: u32,
    pub sex: Sex,
    pub education: String,
    pub occupation: String,
    pub employment_status: EmploymentStatus,
    pub annual_salary: f64,
    pub benefits: BTreeMap<String, f64>,
    pub location: Option<String>,
}

impl From<&Intake> for VictimSummary {
    fn from(intake: &Intake) -> Self {
        Self {
            full_name: intake.full_name.clone(),
            date_of_birth: intake.date_of_birth,
            present_date: intake.present_date,
            date_of_death: intake.date_of_death,
            age: intake.age(),
            sex: intake.sex,
            education: intake.education.clone(),
            occupation: intake.occupation.clone(),
            employment_status: intake.employment_status,
            annual_salary: intake.annual_salary,
            benefits: intake.benefits.clone(),
            location: intake.location.clone(),
        }
    }
}

/// Everything computed for one case
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseReport {
    pub case_id: String,
    pub victim: VictimSummary,
    pub life_expectancy: LifeExpectancy,
    pub worklife: WorklifeExpectancy,
    pub growth_rate: f64,
    pub discount_rate: f64,
    pub projected_wages: Vec<f64>,
    pub ledger: Ledger,
    pub summary: LedgerSummary,
    pub total_nominal: f64,
    pub total_present_value: f64,
    pub flags: Vec<CaseFlag>,
    pub data_sources: Vec<DataSource>,
    pub provenance: ProvenanceLog,
    pub generated_at: DateTime<Utc>,
    pub generator_version: String,
}

impl CaseReport {
    pub fn has_flag(&self, flag: CaseFlag) -> bool {
        self.flags.contains(&flag)
    }
}

/// Runs cases against a pre-loaded table store
#[derive(Debug, Clone)]
pub struct CasePipeline<'a> {
    store: &'a ActuarialTableStore,
    assumptions: CaseAssumptions,
}

impl<'a> CasePipeline<'a> {
    pub fn new(store: &'a ActuarialTableStore, assumptions: CaseAssumptions) -> Self {
        Self { store, assumptions }
    }

    pub fn assumptions(&self) -> &CaseAssumptions {
        &self.assumptions
    }

    fn growth_rate(&self, worklife: &WorklifeExpectancy, log: &mut ProvenanceLog) -> std::result::Result<f64, ValidationError> {
        match &self.assumptions.growth {
            GrowthRateSource::Fixed(rate) => {
                let rate = ValidationError::rate("annual_growth_rate", *rate)?;
                log.record(ProvenanceEntry::new(
                    COMPONENT,
                    "growth_rate",
                    "Externally supplied wage growth rate",
                    json!(rate),
                ));
                Ok(rate)
            }
            GrowthRateSource::EducationAdjusted(table) => table.derive(worklife.education_tier, log),
        }
    }

    /// Run one case end to end
    pub fn run(&self, intake: &Intake) -> Result<CaseReport> {
        let case_id = intake.case_id.as_str();
        let stage = move |stage: PipelineStage| move |err: Error| err.at_stage(stage, case_id);

        intake
            .validate()
            .map_err(Error::from)
            .map_err(stage(PipelineStage::Intake))?;

        let age = intake.age() as f64;
        let mut log = ProvenanceLog::new();
        log.record(ProvenanceEntry::new(
            COMPONENT,
            "pipeline_start",
            format!("Loss calculation for case {}", case_id),
            json!({"age": age, "sex": intake.sex, "employmentStatus": intake.employment_status}),
        ));

        let life = LifeExpectancyCalculator::new(self.store)
            .compute(age, intake.sex, &mut log)
            .map_err(Error::from)
            .map_err(stage(PipelineStage::LifeExpectancy))?;

        let worklife = WorklifeExpectancyCalculator::new(self.store)
            .compute(age, intake.sex, &intake.education, &mut log)
            .map_err(stage(PipelineStage::Worklife))?;

        let horizon = worklife.worklife_years.ceil() as usize;
        let growth_rate = self
            .growth_rate(&worklife, &mut log)
            .map_err(Error::from)
            .map_err(stage(PipelineStage::WageGrowth))?;
        let wages = WageProjector
            .project_recorded(intake.annual_salary, growth_rate, horizon, &mut log)
            .map_err(Error::from)
            .map_err(stage(PipelineStage::WageGrowth))?;

        let curve = DiscountCurveProvider
            .curve(self.assumptions.discount_rate, horizon, &mut log)
            .map_err(Error::from)
            .map_err(stage(PipelineStage::Discount))?;

        let ledger = PresentValueEngine
            .compute_ledger(
                &LedgerInputs {
                    start_age: age,
                    worklife_years: worklife.worklife_years,
                    wages: &wages,
                    discount_curve: &curve,
                    benefits: &intake.benefits,
                    start_date: self
                        .assumptions
                        .prorate_first_year
                        .then_some(intake.present_date),
                },
                &mut log,
            )
            .map_err(Error::from)
            .map_err(stage(PipelineStage::PresentValue))?;

        let flags = collect_flags(&life, &worklife, &ledger);
        log.record(ProvenanceEntry::new(
            COMPONENT,
            "pipeline_complete",
            "Loss calculation complete",
            json!({
                "totalNominal": ledger.total_nominal,
                "totalPresentValue": ledger.total_present_value,
                "flags": flags,
            }),
        ));
        log::info!(
            "Case {}: {} ledger years, PV {:.2}",
            case_id,
            ledger.len(),
            ledger.total_present_value
        );

        Ok(CaseReport {
            case_id: case_id.to_string(),
            victim: VictimSummary::from(intake),
            growth_rate,
            discount_rate: self.assumptions.discount_rate,
            projected_wages: wages,
            summary: ledger.summary(),
            total_nominal: ledger.total_nominal,
            total_present_value: ledger.total_present_value,
            data_sources: log.data_sources(),
            life_expectancy: life,
            worklife,
            ledger,
            flags,
            provenance: log,
            generated_at: Utc::now(),
            generator_version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    /// Run many cases in parallel, one result per case in input order
    pub fn run_batch(&self, intakes: &[Intake]) -> Vec<Result<CaseReport>> {
        let start = Instant::now();
        let results: Vec<Result<CaseReport>> = intakes.par_iter().map(|intake| self.run(intake)).collect();
        let failed = results.iter().filter(|r| r.is_err()).count();
        log::info!(
            "Ran {} cases ({} failed) in {:?}",
            results.len(),
            failed,
            start.elapsed()
        );
        results
    }

    /// Run a loaded batch in parallel. Records that failed at load keep their
    /// intake error; each result is paired with its case id, in input order.
    pub fn run_records(&self, records: Vec<BatchRecord>) -> Vec<(String, Result<CaseReport>)> {
        let start = Instant::now();
        let results: Vec<(String, Result<CaseReport>)> = records
            .into_par_iter()
            .map(|record| {
                let result = record.intake.and_then(|intake| self.run(&intake));
                (record.case_id, result)
            })
            .collect();
        let failed = results.iter().filter(|(_, r)| r.is_err()).count();
        log::info!(
            "Ran {} batch records ({} failed) in {:?}",
            results.len(),
            failed,
            start.elapsed()
        );
        results
    }
}

fn collect_flags(life: &LifeExpectancy, worklife: &WorklifeExpectancy, ledger: &Ledger) -> Vec<CaseFlag> {
    let mut flags = Vec::new();
    if life.is_fallback {
        flags.push(CaseFlag::LifeExpectancyFallback);
    }
    match worklife.education_match.method {
        MatchMethod::Defaulted => flags.push(CaseFlag::EducationDefaulted),
        MatchMethod::Keyword => flags.push(CaseFlag::EducationKeywordMatch),
        MatchMethod::Exact | MatchMethod::Alias => {}
    }
    if life.beyond_table || worklife.beyond_table {
        flags.push(CaseFlag::BeyondTable);
    }
    if ledger.horizon_truncated {
        flags.push(CaseFlag::HorizonTruncated);
    }
    flags
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::EducationTier;
    use crate::test_support::{fixture_store, fixture_tables, sample_intake};
    use approx::assert_relative_eq;

    #[test]
    fn test_run_sample_case() {
        let store = fixture_store();
        let pipeline = CasePipeline::new(&store, CaseAssumptions::default());
        let report = pipeline.run(&sample_intake()).unwrap();

        assert_eq!(report.case_id, "case-1");
        assert_eq!(report.victim.age, 39);
        assert_eq!(report.worklife.education_tier, EducationTier::BachelorsOrHigher);
        assert_relative_eq!(report.growth_rate, 0.035, epsilon = 1e-12);
        assert_eq!(report.projected_wages.len(), report.worklife.worklife_years.ceil() as usize);
        assert!(report.total_present_value < report.total_nominal);
        assert!(report.flags.is_empty());
        assert_eq!(report.ledger.rows[0].full_year_value, 85_000.0 + 10_250.0);
    }

    #[test]
    fn test_provenance_spans_all_components_in_order() {
        let store = fixture_store();
        let report = CasePipeline::new(&store, CaseAssumptions::default())
            .run(&sample_intake())
            .unwrap();
        let entries = report.provenance.entries();
        assert_eq!(entries.first().map(|e| e.step.as_str()), Some("pipeline_start"));
        assert_eq!(entries.last().map(|e| e.step.as_str()), Some("pipeline_complete"));

        let position = |step: &str| entries.iter().position(|e| e.step == step).unwrap();
        assert!(position("life_table_lookup") < position("worklife_table_lookup"));
        assert!(position("worklife_table_lookup") < position("wage_projection"));
        assert!(position("discount_curve") < position("present_value_calculation"));

        // CDC, Skoog and BLS, each cited once
        assert_eq!(report.data_sources.len(), 3);
    }

    #[test]
    fn test_fixed_growth_and_proration() {
        let store = fixture_store();
        let assumptions = CaseAssumptions {
            discount_rate: 0.04,
            growth: GrowthRateSource::Fixed(0.02),
            prorate_first_year: true,
        };
        let report = CasePipeline::new(&store, assumptions).run(&sample_intake()).unwrap();
        assert_eq!(report.growth_rate, 0.02);
        // present date 2025-03-01 is day 60 of 365
        assert_relative_eq!(report.ledger.rows[0].portion_of_year, 306.0 / 365.0, epsilon = 1e-12);
        assert!(report.provenance.contains_step("first_year_proration"));
    }

    #[test]
    fn test_flags_for_defaulted_education_and_fallback() {
        let mut tables = fixture_tables();
        if let Some(values) = tables.life.get_mut(&Sex::Male) {
            values.remove(&39);
        }
        let store = ActuarialTableStore::new(tables).unwrap();
        let intake = Intake {
            education: "unknown".to_string(),
            ..sample_intake()
        };
        let report = CasePipeline::new(&store, CaseAssumptions::default()).run(&intake).unwrap();
        assert!(report.has_flag(CaseFlag::LifeExpectancyFallback));
        assert!(report.has_flag(CaseFlag::EducationDefaulted));
        assert!(report.life_expectancy.is_fallback);
    }

    #[test]
    fn test_worklife_miss_names_the_stage() {
        let store = fixture_store();
        let intake = Intake {
            sex: Sex::Female,
            education: "Some College".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1980, 1, 1).unwrap(),
            ..sample_intake()
        };
        // age 45 falls in the gap of the female/some_college fixture
        let err = CasePipeline::new(&store, CaseAssumptions::default())
            .run(&intake)
            .unwrap_err();
        assert_eq!(err.stage(), Some(PipelineStage::Worklife));
        assert!(matches!(err.root(), Error::Lookup(_)));
    }

    #[test]
    fn test_invalid_intake_fails_at_intake_stage() {
        let store = fixture_store();
        let intake = Intake {
            annual_salary: f64::NAN,
            ..sample_intake()
        };
        let err = CasePipeline::new(&store, CaseAssumptions::default())
            .run(&intake)
            .unwrap_err();
        assert_eq!(err.stage(), Some(PipelineStage::Intake));
    }

    #[test]
    fn test_invalid_discount_rate_fails_at_discount_stage() {
        let store = fixture_store();
        let assumptions = CaseAssumptions {
            discount_rate: f64::NAN,
            ..CaseAssumptions::default()
        };
        let err = CasePipeline::new(&store, assumptions).run(&sample_intake()).unwrap_err();
        assert_eq!(err.stage(), Some(PipelineStage::Discount));
    }

    #[test]
    fn test_run_batch_keeps_order_and_isolates_failures() {
        let store = fixture_store();
        let pipeline = CasePipeline::new(&store, CaseAssumptions::default());
        let intakes: Vec<Intake> = (0..8)
            .map(|i| Intake {
                case_id: format!("case-{}", i),
                annual_salary: if i == 3 { -1.0 } else { 40_000.0 + 1_000.0 * i as f64 },
                ..sample_intake()
            })
            .collect();

        let results = pipeline.run_batch(&intakes);
        assert_eq!(results.len(), 8);
        assert!(results[3].is_err());
        for (i, result) in results.iter().enumerate().filter(|(i, _)| *i != 3) {
            assert_eq!(result.as_ref().unwrap().case_id, format!("case-{}", i));
        }
    }

    #[test]
    fn test_run_records_reports_every_row() {
        use crate::intake::load_intake_batch_csv_from_reader;
        use crate::report::CaseSummaryRow;

        let csv_text = "\
case_id,full_name,date_of_birth,present_date,sex,education,employment_status,annual_salary
WD-1,Jordan Doe,1985-06-15,2025-03-01,M,Bachelor's Degree,employed_full_time,85000
WD-2,Sam Roe,1962-03-02,2025-03-01,F,High School,employed_part_time,-5
WD-3,Alex Poe,1979-09-30,2025-03-01,F,High School,self_employed,61000
";
        let batch = load_intake_batch_csv_from_reader(csv_text.as_bytes()).unwrap();
        let store = fixture_store();
        let pipeline = CasePipeline::new(&store, CaseAssumptions::default());
        let results = pipeline.run_records(batch);

        let rows: Vec<CaseSummaryRow> = results
            .iter()
            .map(|(case_id, result)| match result {
                Ok(report) => CaseSummaryRow::from_report(report),
                Err(err) => CaseSummaryRow::from_error(case_id, err),
            })
            .collect();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].status, "ok");
        assert_eq!(rows[2].status, "ok");
        assert_eq!(rows[1].case_id, "WD-2");
        assert_eq!(rows[1].status, "failed");
        assert!(rows[1].error.as_deref().is_some_and(|e| e.contains("annual_salary")));
        assert_eq!(results[1].1.as_ref().unwrap_err().stage(), Some(PipelineStage::Intake));
    }
}
