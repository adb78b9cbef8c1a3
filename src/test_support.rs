//! Shared fixtures for unit tests

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::intake::{EducationTier, EmploymentStatus, Intake, Sex};
use crate::tables::{ActuarialTableStore, LoadedTables};

/// Small in-memory tables.
///
/// Life: ages 0..=100 for both sexes, with male 40 = 39.08, 41 = 38.17.
/// Worklife: ages 18..=75 for every partition, except female/some_college
/// which only has 40 = 13.96 and 52 = 10.00 between 39 and 53.
pub(crate) fn fixture_tables() -> LoadedTables {
    let mut loaded = LoadedTables::default();

    for sex in Sex::ALL {
        let base = match sex {
            Sex::Male => 79.0,
            Sex::Female => 84.0,
        };
        let values = (0..=100u32).map(|age| (age, (base - age as f64).max(1.0))).collect();
        loaded.life.insert(sex, values);
    }
    if let Some(male) = loaded.life.get_mut(&Sex::Male) {
        male.insert(40, 39.08);
        male.insert(41, 38.17);
    }

    for sex in Sex::ALL {
        for tier in EducationTier::ALL {
            let bonus = tier.index() as f64 * 0.5;
            let values: BTreeMap<u32, f64> = (18..=75u32)
                .map(|age| (age, ((67.0 - age as f64) * 0.85 + bonus).max(0.0)))
                .collect();
            loaded.worklife.insert((sex, tier), values);
        }
    }
    if let Some(values) = loaded.worklife.get_mut(&(Sex::Female, EducationTier::SomeCollege)) {
        values.retain(|age, _| !(40..=52).contains(age));
        values.insert(40, 13.96);
        values.insert(52, 10.00);
    }

    loaded
}

pub(crate) fn fixture_store() -> ActuarialTableStore {
    ActuarialTableStore::new(fixture_tables()).expect("fixture tables are valid")
}

/// 39-year-old male electrician, bachelor's degree, $85k salary
pub(crate) fn sample_intake() -> Intake {
    Intake {
        case_id: "case-1".to_string(),
        full_name: "Jordan Doe".to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(1985, 6, 15).unwrap(),
        present_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        date_of_death: Some(NaiveDate::from_ymd_opt(2024, 11, 2).unwrap()),
        sex: Sex::Male,
        education: "Bachelor's Degree".to_string(),
        occupation: "Electrician".to_string(),
        employment_status: EmploymentStatus::EmployedFullTime,
        annual_salary: 85_000.0,
        benefits: BTreeMap::from([
            ("retirement_contribution".to_string(), 4_250.0),
            ("health_benefits".to_string(), 6_000.0),
        ]),
        location: None,
    }
}
