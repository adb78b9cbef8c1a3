//! Load case intakes from JSON or CSV
//!
//! Raw records keep every field as text so that free-form spellings
//! (`M`, `06/15/1985`, `Full Time`) are accepted and reported with the field
//! name when they cannot be parsed.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{Local, NaiveDate};
use serde::Deserialize;

use super::data::{parse_date, EmploymentStatus, Intake, Sex};
use crate::error::{Error, PipelineStage, Result, ValidationError};

/// Raw intake as written in a JSON case file
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntakeRecord {
    #[serde(default, alias = "case_id")]
    pub case_id: Option<String>,
    #[serde(alias = "full_name")]
    pub full_name: String,
    #[serde(alias = "date_of_birth")]
    pub date_of_birth: String,
    #[serde(default, alias = "present_date")]
    pub present_date: Option<String>,
    #[serde(default, alias = "date_of_death")]
    pub date_of_death: Option<String>,
    pub sex: String,
    #[serde(default)]
    pub education: String,
    #[serde(default)]
    pub occupation: String,
    #[serde(alias = "employment_status")]
    pub employment_status: String,
    #[serde(alias = "annual_salary")]
    pub annual_salary: f64,
    #[serde(default)]
    pub benefits: BTreeMap<String, f64>,
    #[serde(default)]
    pub location: Option<String>,
}

impl IntakeRecord {
    /// The case id this record will carry, `case-{index + 1}` when unset
    pub fn resolved_case_id(&self, index: usize) -> String {
        self.case_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("case-{}", index + 1))
    }

    /// Convert to a validated [`Intake`]. `index` names cases without an id;
    /// `today` stands in for a missing present date.
    pub fn to_intake(self, index: usize, today: NaiveDate) -> std::result::Result<Intake, ValidationError> {
        let present_date = match self.present_date.as_deref() {
            Some(raw) if !raw.trim().is_empty() => parse_date("present_date", raw)?,
            _ => today,
        };
        let date_of_death = match self.date_of_death.as_deref() {
            Some(raw) if !raw.trim().is_empty() => Some(parse_date("date_of_death", raw)?),
            _ => None,
        };

        let intake = Intake {
            case_id: self.resolved_case_id(index),
            full_name: self.full_name.trim().to_string(),
            date_of_birth: parse_date("date_of_birth", &self.date_of_birth)?,
            present_date,
            date_of_death,
            sex: self.sex.parse::<Sex>()?,
            education: self.education,
            occupation: self.occupation,
            employment_status: self.employment_status.parse::<EmploymentStatus>()?,
            annual_salary: self.annual_salary,
            benefits: self.benefits,
            location: self.location.filter(|l| !l.trim().is_empty()),
        };
        intake.validate()?;
        Ok(intake)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(IntakeRecord),
    Many(Vec<IntakeRecord>),
}

/// Raw CSV row for batch intake files
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(default)]
    case_id: Option<String>,
    full_name: String,
    date_of_birth: String,
    #[serde(default)]
    present_date: Option<String>,
    #[serde(default)]
    date_of_death: Option<String>,
    sex: String,
    #[serde(default)]
    education: String,
    #[serde(default)]
    occupation: String,
    employment_status: String,
    annual_salary: f64,
    #[serde(default)]
    retirement_contribution: Option<f64>,
    #[serde(default)]
    health_benefits: Option<f64>,
    #[serde(default)]
    location: Option<String>,
}

impl CsvRow {
    fn into_record(self) -> IntakeRecord {
        let benefits = [
            ("retirement_contribution", self.retirement_contribution),
            ("health_benefits", self.health_benefits),
        ]
        .into_iter()
        .filter_map(|(name, amount)| amount.map(|a| (name.to_string(), a)))
        .collect();

        IntakeRecord {
            case_id: self.case_id,
            full_name: self.full_name,
            date_of_birth: self.date_of_birth,
            present_date: self.present_date,
            date_of_death: self.date_of_death,
            sex: self.sex,
            education: self.education,
            occupation: self.occupation,
            employment_status: self.employment_status,
            annual_salary: self.annual_salary,
            benefits,
            location: self.location,
        }
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn convert_all(records: Vec<IntakeRecord>, today: NaiveDate) -> Result<Vec<Intake>> {
    records
        .into_iter()
        .enumerate()
        .map(|(i, record)| record.to_intake(i, today).map_err(Error::from))
        .collect()
}

/// One record of a batch file. A record that fails to parse or validate
/// keeps its case id so the failure can be reported against it.
#[derive(Debug)]
pub struct BatchRecord {
    pub case_id: String,
    pub intake: Result<Intake>,
}

fn convert_each(records: Vec<IntakeRecord>, today: NaiveDate) -> Vec<BatchRecord> {
    records
        .into_iter()
        .enumerate()
        .map(|(i, record)| {
            let case_id = record.resolved_case_id(i);
            let intake = record
                .to_intake(i, today)
                .map_err(|err| Error::from(err).at_stage(PipelineStage::Intake, &case_id));
            BatchRecord { case_id, intake }
        })
        .collect()
}

fn json_records(json: &str) -> Result<Vec<IntakeRecord>> {
    Ok(match serde_json::from_str::<OneOrMany>(json)? {
        OneOrMany::One(record) => vec![record],
        OneOrMany::Many(records) => records,
    })
}

fn csv_records<R: Read>(reader: R) -> Result<Vec<IntakeRecord>> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut records = Vec::new();
    for result in reader.deserialize() {
        let row: CsvRow = result?;
        records.push(row.into_record());
    }
    log::debug!("Read {} intake rows from CSV", records.len());
    Ok(records)
}

fn read_text(path: &Path) -> Result<String> {
    let mut text = String::new();
    File::open(path)
        .and_then(|mut f| f.read_to_string(&mut text))
        .map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(text)
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
}

/// Parse one case or an array of cases from JSON text
pub fn load_intakes_json_str(json: &str) -> Result<Vec<Intake>> {
    convert_all(json_records(json)?, today())
}

/// Load cases from a JSON file
pub fn load_intakes_json(path: &Path) -> Result<Vec<Intake>> {
    load_intakes_json_str(&read_text(path)?)
}

/// Load cases from any CSV reader
pub fn load_intakes_csv_from_reader<R: Read>(reader: R) -> Result<Vec<Intake>> {
    convert_all(csv_records(reader)?, today())
}

/// Load cases from a CSV file
pub fn load_intakes_csv(path: &Path) -> Result<Vec<Intake>> {
    let file = File::open(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    load_intakes_csv_from_reader(file)
}

/// Load cases, choosing the format by file extension
pub fn load_intakes(path: &Path) -> Result<Vec<Intake>> {
    if is_csv(path) {
        load_intakes_csv(path)
    } else {
        load_intakes_json(path)
    }
}

/// Read a batch from any CSV reader, converting each row on its own.
///
/// Only a malformed file is an error; a row that fails validation comes
/// back as a failed [`BatchRecord`].
pub fn load_intake_batch_csv_from_reader<R: Read>(reader: R) -> Result<Vec<BatchRecord>> {
    Ok(convert_each(csv_records(reader)?, today()))
}

/// Read a batch from JSON text, converting each case on its own
pub fn load_intake_batch_json_str(json: &str) -> Result<Vec<BatchRecord>> {
    Ok(convert_each(json_records(json)?, today()))
}

/// Read a batch file, choosing the format by file extension
pub fn load_intake_batch(path: &Path) -> Result<Vec<BatchRecord>> {
    if is_csv(path) {
        let file = File::open(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        load_intake_batch_csv_from_reader(file)
    } else {
        load_intake_batch_json_str(&read_text(path)?)
    }
}
