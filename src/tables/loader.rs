//! Reference table loader
//!
//! Loads life and worklife expectancy tables from CSV files in
//! `data/tables/`, or from a single JSON document keyed by stringified ages.
//! Both paths produce the same [`LoadedTables`], which the store validates.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::Deserialize;

use super::table::TableKind;
use crate::error::TableError;
use crate::intake::{EducationTier, Sex};

/// Default path to the reference tables directory
pub const DEFAULT_TABLES_PATH: &str = "data/tables";

pub const LIFE_TABLE_FILE: &str = "life_expectancy.csv";
pub const WORKLIFE_TABLE_FILE: &str = "worklife_expectancy.csv";

pub type AgeValues = BTreeMap<u32, f64>;

/// Raw table data before validation
#[derive(Debug, Clone, Default)]
pub struct LoadedTables {
    pub life: BTreeMap<Sex, AgeValues>,
    pub worklife: BTreeMap<(Sex, EducationTier), AgeValues>,
}

impl LoadedTables {
    /// Load from CSV files in the default location (data/tables/)
    pub fn load_default() -> Result<Self, TableError> {
        Self::load_from(Path::new(DEFAULT_TABLES_PATH))
    }

    /// Load both CSV tables from a directory
    pub fn load_from(path: &Path) -> Result<Self, TableError> {
        Ok(Self {
            life: load_life_table(&path.join(LIFE_TABLE_FILE))?,
            worklife: load_worklife_table(&path.join(WORKLIFE_TABLE_FILE))?,
        })
    }
}

#[derive(Debug, Deserialize)]
struct LifeRow {
    age: u32,
    male: f64,
    female: f64,
}

#[derive(Debug, Deserialize)]
struct WorklifeRow {
    age: u32,
    sex: String,
    less_than_high_school: f64,
    high_school: f64,
    some_college: f64,
    bachelors_or_higher: f64,
}

impl WorklifeRow {
    fn values(&self) -> [(EducationTier, f64); 4] {
        [
            (EducationTier::LessThanHighSchool, self.less_than_high_school),
            (EducationTier::HighSchool, self.high_school),
            (EducationTier::SomeCollege, self.some_college),
            (EducationTier::BachelorsOrHigher, self.bachelors_or_higher),
        ]
    }
}

fn open(path: &Path) -> Result<File, TableError> {
    File::open(path).map_err(|source| TableError::Io {
        path: path.to_path_buf(),
        source,
    })
}

fn insert_unique(
    table: TableKind,
    key: impl Fn() -> String,
    values: &mut AgeValues,
    age: u32,
    value: f64,
) -> Result<(), TableError> {
    if values.insert(age, value).is_some() {
        return Err(TableError::DuplicateAge {
            table,
            key: key(),
            age,
        });
    }
    Ok(())
}

fn parse_sex(table: TableKind, raw: &str) -> Result<Sex, TableError> {
    raw.parse::<Sex>().map_err(|_| TableError::UnknownKey {
        table,
        field: "sex",
        raw: raw.to_string(),
    })
}

fn parse_age_key(table: TableKind, raw: &str) -> Result<u32, TableError> {
    raw.trim().parse::<u32>().map_err(|_| TableError::InvalidAgeKey {
        table,
        raw: raw.to_string(),
    })
}

/// Read a life table with columns `age,male,female`
pub fn load_life_table_from_reader<R: Read>(
    reader: R,
    origin: &str,
) -> Result<BTreeMap<Sex, AgeValues>, TableError> {
    let table = TableKind::LifeExpectancy;
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut life: BTreeMap<Sex, AgeValues> = BTreeMap::new();

    for result in reader.deserialize() {
        let row: LifeRow = result.map_err(|source| TableError::Csv {
            origin: origin.to_string(),
            source,
        })?;
        for (sex, value) in [(Sex::Male, row.male), (Sex::Female, row.female)] {
            let values = life.entry(sex).or_default();
            insert_unique(table, || sex.to_string(), values, row.age, value)?;
        }
    }

    Ok(life)
}

/// Read a worklife table with columns
/// `age,sex,less_than_high_school,high_school,some_college,bachelors_or_higher`
pub fn load_worklife_table_from_reader<R: Read>(
    reader: R,
    origin: &str,
) -> Result<BTreeMap<(Sex, EducationTier), AgeValues>, TableError> {
    let table = TableKind::WorklifeExpectancy;
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let mut worklife: BTreeMap<(Sex, EducationTier), AgeValues> = BTreeMap::new();

    for result in reader.deserialize() {
        let row: WorklifeRow = result.map_err(|source| TableError::Csv {
            origin: origin.to_string(),
            source,
        })?;
        let sex = parse_sex(table, &row.sex)?;
        for (tier, value) in row.values() {
            let values = worklife.entry((sex, tier)).or_default();
            insert_unique(table, || format!("{}/{}", sex, tier), values, row.age, value)?;
        }
    }

    Ok(worklife)
}

/// Load life expectancy rows from a CSV file
pub fn load_life_table(path: &Path) -> Result<BTreeMap<Sex, AgeValues>, TableError> {
    let origin = path.display().to_string();
    let tables = load_life_table_from_reader(open(path)?, &origin)?;
    log::info!("Loaded life expectancy table from {}", origin);
    Ok(tables)
}

/// Load worklife expectancy rows from a CSV file
pub fn load_worklife_table(path: &Path) -> Result<BTreeMap<(Sex, EducationTier), AgeValues>, TableError> {
    let origin = path.display().to_string();
    let tables = load_worklife_table_from_reader(open(path)?, &origin)?;
    log::info!("Loaded worklife expectancy table from {}", origin);
    Ok(tables)
}

/// JSON reference document: ages are object keys, as strings.
///
/// ```json
/// {
///   "life_expectancy": { "male": { "40": 39.08 }, "female": { "40": 45.48 } },
///   "worklife_expectancy": { "male": { "high_school": { "40": 21.2 } } }
/// }
/// ```
#[derive(Debug, Deserialize)]
struct ReferenceData {
    life_expectancy: BTreeMap<String, BTreeMap<String, f64>>,
    worklife_expectancy: BTreeMap<String, BTreeMap<String, BTreeMap<String, f64>>>,
}

fn parse_age_map(
    table: TableKind,
    key: &str,
    raw: BTreeMap<String, f64>,
) -> Result<AgeValues, TableError> {
    let mut values = AgeValues::new();
    for (age, value) in raw {
        let age = parse_age_key(table, &age)?;
        insert_unique(table, || key.to_string(), &mut values, age, value)?;
    }
    Ok(values)
}

fn insert_partition<K: Ord>(
    table: TableKind,
    partitions: &mut BTreeMap<K, AgeValues>,
    partition: K,
    key: String,
    values: AgeValues,
) -> Result<(), TableError> {
    if partitions.insert(partition, values).is_some() {
        return Err(TableError::DuplicatePartition { table, key });
    }
    Ok(())
}

/// Parse a JSON reference document.
///
/// Keys that name the same sex, tier or age twice (`"female"` and `"F"`,
/// `"40"` and `"040"`) are rejected, as duplicate CSV rows are.
pub fn load_tables_from_json_str(json: &str) -> Result<LoadedTables, TableError> {
    let data: ReferenceData = serde_json::from_str(json)?;
    let mut loaded = LoadedTables::default();

    let life = TableKind::LifeExpectancy;
    for (sex_key, ages) in data.life_expectancy {
        let sex = parse_sex(life, &sex_key)?;
        let key = sex.to_string();
        let values = parse_age_map(life, &key, ages)?;
        insert_partition(life, &mut loaded.life, sex, key, values)?;
    }

    let worklife = TableKind::WorklifeExpectancy;
    for (sex_key, tiers) in data.worklife_expectancy {
        let sex = parse_sex(worklife, &sex_key)?;
        for (tier_key, ages) in tiers {
            let tier = EducationTier::from_key(&tier_key).ok_or_else(|| TableError::UnknownKey {
                table: worklife,
                field: "education tier",
                raw: tier_key.clone(),
            })?;
            let key = format!("{}/{}", sex, tier);
            let values = parse_age_map(worklife, &key, ages)?;
            insert_partition(worklife, &mut loaded.worklife, (sex, tier), key, values)?;
        }
    }

    Ok(loaded)
}

/// Load a JSON reference document from disk
pub fn load_tables_from_json(path: &Path) -> Result<LoadedTables, TableError> {
    let mut text = String::new();
    open(path)?
        .read_to_string(&mut text)
        .map_err(|source| TableError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    let loaded = load_tables_from_json_str(&text)?;
    log::info!("Loaded reference tables from {}", path.display());
    Ok(loaded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_life_csv() {
        let csv_text = "age,male,female\n40,39.08,45.48\n41,38.17,44.54\n";
        let life = load_life_table_from_reader(csv_text.as_bytes(), "inline").unwrap();
        assert_eq!(life[&Sex::Male][&40], 39.08);
        assert_eq!(life[&Sex::Female][&41], 44.54);
    }

    #[test]
    fn test_life_csv_duplicate_age() {
        let csv_text = "age,male,female\n40,39.08,45.48\n40,39.0,45.0\n";
        let err = load_life_table_from_reader(csv_text.as_bytes(), "inline").unwrap_err();
        assert!(matches!(err, TableError::DuplicateAge { age: 40, .. }));
    }

    #[test]
    fn test_life_csv_malformed_value() {
        let csv_text = "age,male,female\n40,abc,45.48\n";
        let err = load_life_table_from_reader(csv_text.as_bytes(), "inline").unwrap_err();
        assert!(matches!(err, TableError::Csv { .. }));
    }

    #[test]
    fn test_worklife_csv_partitions() {
        let csv_text = "\
age,sex,less_than_high_school,high_school,some_college,bachelors_or_higher
35,male,21.6,25.37,27.15,29.44
35,F,18.0,22.0,24.0,26.5
";
        let worklife = load_worklife_table_from_reader(csv_text.as_bytes(), "inline").unwrap();
        assert_eq!(worklife.len(), 8);
        assert_eq!(worklife[&(Sex::Male, EducationTier::SomeCollege)][&35], 27.15);
        assert_eq!(worklife[&(Sex::Female, EducationTier::BachelorsOrHigher)][&35], 26.5);
    }

    #[test]
    fn test_worklife_csv_unknown_sex() {
        let csv_text = "\
age,sex,less_than_high_school,high_school,some_college,bachelors_or_higher
35,other,1,2,3,4
";
        let err = load_worklife_table_from_reader(csv_text.as_bytes(), "inline").unwrap_err();
        assert!(matches!(err, TableError::UnknownKey { field: "sex", .. }));
    }

    #[test]
    fn test_json_reference_data() {
        let json = r#"{
            "life_expectancy": {"male": {"40": 39.08}, "female": {"40": 45.48}},
            "worklife_expectancy": {"female": {"some_college": {"40": 20.5, "41": 19.7}}}
        }"#;
        let loaded = load_tables_from_json_str(json).unwrap();
        assert_eq!(loaded.life[&Sex::Female][&40], 45.48);
        assert_eq!(loaded.worklife[&(Sex::Female, EducationTier::SomeCollege)].len(), 2);
    }

    #[test]
    fn test_json_bad_age_key() {
        let json = r#"{
            "life_expectancy": {"male": {"forty": 39.08}},
            "worklife_expectancy": {}
        }"#;
        let err = load_tables_from_json_str(json).unwrap_err();
        assert!(matches!(err, TableError::InvalidAgeKey { .. }));
    }

    #[test]
    fn test_json_unknown_tier() {
        let json = r#"{
            "life_expectancy": {},
            "worklife_expectancy": {"male": {"phd": {"40": 1.0}}}
        }"#;
        let err = load_tables_from_json_str(json).unwrap_err();
        assert!(matches!(err, TableError::UnknownKey { field: "education tier", .. }));
    }

    #[test]
    fn test_json_duplicate_age_keys() {
        let json = r#"{
            "life_expectancy": {"male": {"40": 39.08, "040": 99.0}, "female": {"40": 45.48}},
            "worklife_expectancy": {}
        }"#;
        let err = load_tables_from_json_str(json).unwrap_err();
        assert!(matches!(err, TableError::DuplicateAge { age: 40, ref key, .. } if key == "male"));
    }

    #[test]
    fn test_json_duplicate_sex_keys() {
        let json = r#"{
            "life_expectancy": {"female": {"40": 45.48}, "F": {"40": 1.0}},
            "worklife_expectancy": {}
        }"#;
        let err = load_tables_from_json_str(json).unwrap_err();
        assert!(matches!(err, TableError::DuplicatePartition { ref key, .. } if key == "female"));
    }

    #[test]
    fn test_json_duplicate_worklife_partition() {
        let json = r#"{
            "life_expectancy": {},
            "worklife_expectancy": {
                "male": {"high_school": {"40": 21.2}},
                "M": {"high_school": {"40": 20.0}}
            }
        }"#;
        let err = load_tables_from_json_str(json).unwrap_err();
        assert!(matches!(
            err,
            TableError::DuplicatePartition { table: TableKind::WorklifeExpectancy, .. }
        ));
    }

    #[test]
    fn test_load_shipped_tables() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join(DEFAULT_TABLES_PATH);
        let loaded = LoadedTables::load_from(&path).unwrap();
        assert_eq!(loaded.life[&Sex::Male].len(), 101);
        assert_eq!(loaded.worklife.len(), 8);
        assert_eq!(loaded.worklife[&(Sex::Female, EducationTier::HighSchool)].keys().next(), Some(&18));
    }
}
