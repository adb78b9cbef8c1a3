//! Life and worklife expectancy calculators built on the table store

mod life;
mod worklife;

pub use life::{LifeExpectancy, LifeExpectancyCalculator, FALLBACK_FEMALE, FALLBACK_MALE};
pub use worklife::{WorklifeExpectancy, WorklifeExpectancyCalculator};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Whether a result came from the reference tables or a fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Table,
    Degraded,
}

/// Remaining years at each whole age from `age` until the expectancy runs out:
/// `age + k -> max(0, years - k)` for `k = 0..=floor(years)`.
pub fn remaining_by_age(age: f64, years: f64) -> BTreeMap<u32, f64> {
    let start = age.floor() as u32;
    (0..=years.max(0.0).floor() as u32)
        .map(|offset| (start + offset, (years - offset as f64).max(0.0)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remaining_by_age_schedule() {
        let schedule = remaining_by_age(40.0, 2.5);
        assert_eq!(schedule.len(), 3);
        assert_eq!(schedule[&40], 2.5);
        assert_eq!(schedule[&41], 1.5);
        assert_eq!(schedule[&42], 0.5);
    }

    #[test]
    fn test_remaining_by_age_zero_years() {
        let schedule = remaining_by_age(70.0, 0.0);
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule[&70], 0.0);
    }
}
