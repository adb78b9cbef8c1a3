//! Case intake: the decedent profile the calculators run against

mod data;
mod education;
mod loader;

pub use data::{completed_years, parse_date, EmploymentStatus, Intake, Sex, MAX_INTAKE_AGE};
pub use education::{normalize_education, EducationMatch, EducationTier, MatchMethod, DEFAULT_TIER};
pub use loader::{
    load_intake_batch, load_intake_batch_csv_from_reader, load_intake_batch_json_str, load_intakes,
    load_intakes_csv, load_intakes_csv_from_reader, load_intakes_json, load_intakes_json_str,
    BatchRecord, IntakeRecord,
};
