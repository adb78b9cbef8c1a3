//! Case intake data structures

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Oldest age the engine will accept at intake
pub const MAX_INTAKE_AGE: u32 = 120;

/// Sex of the decedent, used to select a table partition
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sex {
    Male,
    Female,
}

impl Sex {
    pub const ALL: [Sex; 2] = [Sex::Male, Sex::Female];

    pub fn key(&self) -> &'static str {
        match self {
            Sex::Male => "male",
            Sex::Female => "female",
        }
    }
}

impl fmt::Display for Sex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Sex {
    type Err = ValidationError;

    /// Accepts M/F/Male/Female in any case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "m" | "male" => Ok(Sex::Male),
            "f" | "female" => Ok(Sex::Female),
            _ => Err(ValidationError::UnknownSex(s.to_string())),
        }
    }
}

/// Employment status at the time of death
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentStatus {
    EmployedFullTime,
    EmployedPartTime,
    SelfEmployed,
    Unemployed,
    Retired,
}

impl EmploymentStatus {
    pub fn key(&self) -> &'static str {
        match self {
            EmploymentStatus::EmployedFullTime => "employed_full_time",
            EmploymentStatus::EmployedPartTime => "employed_part_time",
            EmploymentStatus::SelfEmployed => "self_employed",
            EmploymentStatus::Unemployed => "unemployed",
            EmploymentStatus::Retired => "retired",
        }
    }
}

impl FromStr for EmploymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "employed_full_time" | "full_time" => Ok(EmploymentStatus::EmployedFullTime),
            "employed_part_time" | "part_time" => Ok(EmploymentStatus::EmployedPartTime),
            "self_employed" => Ok(EmploymentStatus::SelfEmployed),
            "unemployed" => Ok(EmploymentStatus::Unemployed),
            "retired" => Ok(EmploymentStatus::Retired),
            _ => Err(ValidationError::UnknownEmploymentStatus(s.to_string())),
        }
    }
}

/// Parse a date in `YYYY-MM-DD` or `MM/DD/YYYY` form
pub fn parse_date(field: &'static str, raw: &str) -> Result<NaiveDate, ValidationError> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
        .map_err(|_| ValidationError::InvalidDate {
            field,
            value: raw.to_string(),
        })
}

/// Completed years between two dates
pub fn completed_years(from: NaiveDate, to: NaiveDate) -> u32 {
    let mut years = to.year() - from.year();
    if (to.month(), to.day()) < (from.month(), from.day()) {
        years -= 1;
    }
    years.max(0) as u32
}

/// One wrongful-death case as received from intake
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Intake {
    pub case_id: String,
    pub full_name: String,
    pub date_of_birth: NaiveDate,
    /// Valuation date; ages and proration are measured from here
    pub present_date: NaiveDate,
    pub date_of_death: Option<NaiveDate>,
    pub sex: Sex,
    /// Free-text education, normalized before worklife lookup
    pub education: String,
    pub occupation: String,
    pub employment_status: EmploymentStatus,
    pub annual_salary: f64,
    /// Annual benefit amounts by name (retirement contribution, health, ...)
    #[serde(default)]
    pub benefits: BTreeMap<String, f64>,
    pub location: Option<String>,
}

impl Intake {
    /// Age in completed years at the present date
    pub fn age(&self) -> u32 {
        completed_years(self.date_of_birth, self.present_date)
    }

    /// Sum of annual benefit amounts
    pub fn total_benefits(&self) -> f64 {
        self.benefits.values().sum()
    }

    /// Check every field the calculators rely on
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.full_name.trim().is_empty() {
            return Err(ValidationError::MissingField("full_name"));
        }
        if self.date_of_birth >= self.present_date {
            return Err(ValidationError::DateOrder(format!(
                "date of birth {} must be before present date {}",
                self.date_of_birth, self.present_date
            )));
        }
        if let Some(dod) = self.date_of_death {
            if dod <= self.date_of_birth {
                return Err(ValidationError::DateOrder(format!(
                    "date of death {} must be after date of birth {}",
                    dod, self.date_of_birth
                )));
            }
        }
        let age = self.age();
        if age > MAX_INTAKE_AGE {
            return Err(ValidationError::AgeOutOfRange(age));
        }
        ValidationError::non_negative("annual_salary", self.annual_salary)?;
        for (name, amount) in &self.benefits {
            ValidationError::non_negative(format!("benefits.{}", name), *amount)?;
        }
        Ok(())
    }
}
