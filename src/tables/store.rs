//! Validated, immutable store of the life and worklife reference tables

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::loader::{load_tables_from_json, load_tables_from_json_str, AgeValues, LoadedTables};
use super::table::{ActuarialTable, InterpolationMode, LookupMethod, TableKind};
use crate::error::{LookupError, TableError};
use crate::intake::{EducationTier, Sex};

/// Citation for a reference dataset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceInfo {
    pub name: String,
    pub url: String,
    pub published: String,
}

impl SourceInfo {
    pub fn cdc_life_tables() -> Self {
        Self {
            name: "CDC National Vital Statistics System, United States Life Tables, 2023".to_string(),
            url: "https://www.cdc.gov/nchs/products/life_tables.htm".to_string(),
            published: "2025-07-15".to_string(),
        }
    }

    pub fn skoog_worklife_tables() -> Self {
        Self {
            name: "Skoog, Ciecka & Krueger (2019), Markov model worklife expectancy tables".to_string(),
            url: "https://doi.org/10.5384/28-1-2".to_string(),
            published: "2019".to_string(),
        }
    }
}

/// One answered lookup: the value plus the key and method that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupResult {
    pub table: TableKind,
    pub age: f64,
    pub sex: Sex,
    pub education: Option<EducationTier>,
    pub value: f64,
    pub method: LookupMethod,
}

impl LookupResult {
    pub fn is_beyond_table(&self) -> bool {
        matches!(self.method, LookupMethod::BeyondTable { .. })
    }

    pub fn is_interpolated(&self) -> bool {
        matches!(self.method, LookupMethod::Interpolated { .. })
    }
}

fn partition_key(sex: Sex, education: Option<EducationTier>) -> String {
    match education {
        Some(tier) => format!("{}/{}", sex, tier),
        None => sex.to_string(),
    }
}

fn validate_partition(table: TableKind, key: String, values: AgeValues) -> Result<ActuarialTable, TableError> {
    if values.is_empty() {
        return Err(TableError::MissingPartition { table, key });
    }
    if let Some((&age, &value)) = values.iter().find(|(_, v)| !(v.is_finite() && **v >= 0.0)) {
        return Err(TableError::InvalidValue { table, key, age, value });
    }
    Ok(ActuarialTable::new(values))
}

/// Reference tables, loaded and validated once, then shared read-only.
///
/// Construction fails if either sex is missing, any worklife sex lacks one of
/// the four education tiers, or any value is negative or non-finite.
#[derive(Debug, Clone)]
pub struct ActuarialTableStore {
    life: BTreeMap<Sex, ActuarialTable>,
    worklife: BTreeMap<(Sex, EducationTier), ActuarialTable>,
    interpolation: InterpolationMode,
    life_source: SourceInfo,
    worklife_source: SourceInfo,
}

impl ActuarialTableStore {
    /// Validate raw tables and build the store
    pub fn new(loaded: LoadedTables) -> Result<Self, TableError> {
        let LoadedTables {
            mut life,
            mut worklife,
        } = loaded;

        let life = Sex::ALL
            .into_iter()
            .map(|sex| -> Result<_, TableError> {
                let values = life.remove(&sex).unwrap_or_default();
                Ok((sex, validate_partition(TableKind::LifeExpectancy, sex.to_string(), values)?))
            })
            .collect::<Result<BTreeMap<_, _>, TableError>>()?;

        let worklife = Sex::ALL
            .into_iter()
            .flat_map(|sex| EducationTier::ALL.into_iter().map(move |tier| (sex, tier)))
            .map(|(sex, tier)| -> Result<_, TableError> {
                let values = worklife.remove(&(sex, tier)).unwrap_or_default();
                let key = partition_key(sex, Some(tier));
                Ok(((sex, tier), validate_partition(TableKind::WorklifeExpectancy, key, values)?))
            })
            .collect::<Result<BTreeMap<_, _>, TableError>>()?;

        Ok(Self {
            life,
            worklife,
            interpolation: InterpolationMode::default(),
            life_source: SourceInfo::cdc_life_tables(),
            worklife_source: SourceInfo::skoog_worklife_tables(),
        })
    }

    /// Load CSV tables from the default location (data/tables/)
    pub fn from_csv() -> Result<Self, TableError> {
        Self::new(LoadedTables::load_default()?)
    }

    /// Load CSV tables from a specific directory
    pub fn from_csv_path(path: &Path) -> Result<Self, TableError> {
        Self::new(LoadedTables::load_from(path)?)
    }

    pub fn from_json_str(json: &str) -> Result<Self, TableError> {
        Self::new(load_tables_from_json_str(json)?)
    }

    pub fn from_json_path(path: &Path) -> Result<Self, TableError> {
        Self::new(load_tables_from_json(path)?)
    }

    pub fn with_interpolation(mut self, mode: InterpolationMode) -> Self {
        self.interpolation = mode;
        self
    }

    pub fn interpolation(&self) -> InterpolationMode {
        self.interpolation
    }

    pub fn source(&self, table: TableKind) -> &SourceInfo {
        match table {
            TableKind::LifeExpectancy => &self.life_source,
            TableKind::WorklifeExpectancy => &self.worklife_source,
        }
    }

    /// The partition a lookup would read
    pub fn table(
        &self,
        kind: TableKind,
        sex: Sex,
        education: Option<EducationTier>,
    ) -> Result<&ActuarialTable, LookupError> {
        let table = match kind {
            TableKind::LifeExpectancy => self.life.get(&sex),
            TableKind::WorklifeExpectancy => {
                let tier = education.ok_or(LookupError::MissingEducation)?;
                self.worklife.get(&(sex, tier))
            }
        };
        // every partition was checked at construction
        table.ok_or_else(|| LookupError::AgeNotFound {
            table: kind,
            key: partition_key(sex, education),
            age: f64::NAN,
        })
    }

    /// Look up remaining years at `age`.
    ///
    /// Whole ages are read directly, fractional ages interpolate between the
    /// bracketing rows, and ages past the last row return the table's
    /// sentinel (life 0.5, worklife 0.0) rather than an error.
    pub fn lookup(
        &self,
        kind: TableKind,
        age: f64,
        sex: Sex,
        education: Option<EducationTier>,
    ) -> Result<LookupResult, LookupError> {
        if !age.is_finite() || age < 0.0 {
            return Err(LookupError::InvalidAge(age));
        }
        let education = match kind {
            TableKind::LifeExpectancy => None,
            TableKind::WorklifeExpectancy => education,
        };
        let table = self.table(kind, sex, education)?;

        let (value, method) = table
            .resolve(age, self.interpolation, kind.beyond_table_sentinel())
            .ok_or_else(|| LookupError::AgeNotFound {
                table: kind,
                key: partition_key(sex, education),
                age,
            })?;

        Ok(LookupResult {
            table: kind,
            age,
            sex,
            education,
            value,
            method,
        })
    }

    pub fn life_expectancy(&self, age: f64, sex: Sex) -> Result<LookupResult, LookupError> {
        self.lookup(TableKind::LifeExpectancy, age, sex, None)
    }

    pub fn worklife_expectancy(
        &self,
        age: f64,
        sex: Sex,
        education: EducationTier,
    ) -> Result<LookupResult, LookupError> {
        self.lookup(TableKind::WorklifeExpectancy, age, sex, Some(education))
    }
}
