//! Report export: ledger CSV, case report JSON and batch summaries
//!
//! Values are carried at full precision everywhere else; rounding happens
//! only here, at presentation.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::error::{Error, Result};
use crate::pipeline::CaseReport;
use crate::projection::Ledger;

/// Round to cents
pub fn round_currency(value: f64) -> f64 {
    round_to(value, 2)
}

/// Round a rate to 4 decimal places
pub fn round_rate(value: f64) -> f64 {
    round_to(value, 4)
}

/// Round a discount factor to 6 decimal places
pub fn round_factor(value: f64) -> f64 {
    round_to(value, 6)
}

fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })
}

#[derive(Serialize)]
struct LedgerCsvRow {
    year_index: usize,
    age: f64,
    portion_of_year: f64,
    wage: f64,
    benefits: f64,
    full_year_value: f64,
    actual_value: f64,
    cumulative_actual_value: f64,
    discount_rate: f64,
    discount_factor: f64,
    present_value: f64,
    cumulative_present_value: f64,
}

/// Write the ledger as CSV, one row per year, presentation-rounded
pub fn write_ledger_csv<W: Write>(ledger: &Ledger, writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in &ledger.rows {
        csv_writer.serialize(LedgerCsvRow {
            year_index: row.year_index,
            age: row.age,
            portion_of_year: round_rate(row.portion_of_year),
            wage: round_currency(row.wage),
            benefits: round_currency(row.benefits),
            full_year_value: round_currency(row.full_year_value),
            actual_value: round_currency(row.actual_value),
            cumulative_actual_value: round_currency(row.cumulative_actual_value),
            discount_rate: round_rate(row.discount_rate),
            discount_factor: round_factor(row.discount_factor),
            present_value: round_currency(row.present_value),
            cumulative_present_value: round_currency(row.cumulative_present_value),
        })?;
    }
    csv_writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

pub fn write_ledger_csv_path(ledger: &Ledger, path: &Path) -> Result<()> {
    write_ledger_csv(ledger, create(path)?)
}

/// Write the full case report, provenance included, as pretty JSON
pub fn write_report_json(report: &CaseReport, path: &Path) -> Result<()> {
    let mut writer = create(path)?;
    serde_json::to_writer_pretty(&mut writer, report)?;
    writer.flush().map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// One line of a batch summary
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseSummaryRow {
    pub case_id: String,
    pub status: &'static str,
    pub age: Option<u32>,
    pub remaining_life_years: Option<f64>,
    pub worklife_years: Option<f64>,
    pub education_tier: Option<String>,
    pub growth_rate: Option<f64>,
    pub discount_rate: Option<f64>,
    pub total_nominal: Option<f64>,
    pub total_present_value: Option<f64>,
    /// Flags joined with `;`
    pub flags: String,
    pub error: Option<String>,
}

impl CaseSummaryRow {
    pub fn from_report(report: &CaseReport) -> Self {
        let flags: Vec<String> = report
            .flags
            .iter()
            .filter_map(|flag| serde_json::to_value(flag).ok())
            .filter_map(|value| value.as_str().map(str::to_string))
            .collect();
        Self {
            case_id: report.case_id.clone(),
            status: "ok",
            age: Some(report.victim.age),
            remaining_life_years: Some(round_rate(report.life_expectancy.remaining_years)),
            worklife_years: Some(round_rate(report.worklife.worklife_years)),
            education_tier: Some(report.worklife.education_tier.to_string()),
            growth_rate: Some(round_rate(report.growth_rate)),
            discount_rate: Some(round_rate(report.discount_rate)),
            total_nominal: Some(round_currency(report.total_nominal)),
            total_present_value: Some(round_currency(report.total_present_value)),
            flags: flags.join(";"),
            error: None,
        }
    }

    pub fn from_error(case_id: &str, error: &Error) -> Self {
        Self {
            case_id: case_id.to_string(),
            status: "failed",
            age: None,
            remaining_life_years: None,
            worklife_years: None,
            education_tier: None,
            growth_rate: None,
            discount_rate: None,
            total_nominal: None,
            total_present_value: None,
            flags: String::new(),
            error: Some(error.to_string()),
        }
    }
}

/// Write batch summary rows as CSV
pub fn write_case_summaries<W: Write>(rows: &[CaseSummaryRow], writer: W) -> Result<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    for row in rows {
        csv_writer.serialize(row)?;
    }
    csv_writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

pub fn write_case_summaries_path(rows: &[CaseSummaryRow], path: &Path) -> Result<()> {
    write_case_summaries(rows, create(path)?)
}

/// File name for a case's ledger CSV. Anything outside `[A-Za-z0-9._-]`
/// becomes `_`, and leading dots are dropped, so the name stays inside the
/// output directory.
pub fn ledger_file_name(case_id: &str) -> String {
    let safe: String = case_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') { c } else { '_' })
        .collect();
    let safe = safe.trim_start_matches('.');
    if safe.is_empty() {
        "case_ledger.csv".to_string()
    } else {
        format!("{}_ledger.csv", safe)
    }
}
