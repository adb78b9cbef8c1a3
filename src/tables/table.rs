//! Single age-indexed table partition with interpolation

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Which reference dataset a lookup targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    LifeExpectancy,
    WorklifeExpectancy,
}

impl TableKind {
    /// Value returned for ages past the last row of the table
    pub fn beyond_table_sentinel(&self) -> f64 {
        match self {
            TableKind::LifeExpectancy => 0.5,
            TableKind::WorklifeExpectancy => 0.0,
        }
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableKind::LifeExpectancy => f.write_str("life expectancy"),
            TableKind::WorklifeExpectancy => f.write_str("worklife expectancy"),
        }
    }
}

/// How missing ages inside the table range are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterpolationMode {
    /// Only whole ages present, or fractional ages between two adjacent
    /// present ages; anything else is not found
    #[default]
    Adjacent,
    /// Interpolate between the nearest known ages below and above
    Bracketing,
}

/// How a looked-up value was obtained
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum LookupMethod {
    Exact,
    Interpolated { lower_age: u32, upper_age: u32 },
    BeyondTable { max_age: u32 },
}

/// Remaining-years values keyed by integer age, for one sex (and tier)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActuarialTable {
    values: BTreeMap<u32, f64>,
}

impl ActuarialTable {
    pub fn new(values: BTreeMap<u32, f64>) -> Self {
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn max_age(&self) -> Option<u32> {
        self.values.keys().next_back().copied()
    }

    /// Value stored for a whole age
    pub fn get(&self, age: u32) -> Option<f64> {
        self.values.get(&age).copied()
    }

    /// Resolve a (possibly fractional) age. `age` must already be finite and
    /// non-negative. Returns `None` when the age falls in a gap the mode
    /// cannot bridge, or below the first row.
    pub fn resolve(&self, age: f64, mode: InterpolationMode, sentinel: f64) -> Option<(f64, LookupMethod)> {
        let max_age = self.max_age()?;
        if age > max_age as f64 {
            return Some((sentinel, LookupMethod::BeyondTable { max_age }));
        }

        let floor = age.floor() as u32;
        let fraction = age - age.floor();

        if fraction == 0.0 {
            if let Some(value) = self.get(floor) {
                return Some((value, LookupMethod::Exact));
            }
        } else if let (Some(lower), Some(upper)) = (self.get(floor), self.get(floor + 1)) {
            return Some((
                interpolate(lower, upper, fraction),
                LookupMethod::Interpolated {
                    lower_age: floor,
                    upper_age: floor + 1,
                },
            ));
        }

        match mode {
            InterpolationMode::Adjacent => None,
            InterpolationMode::Bracketing => self.bracket(age),
        }
    }

    fn bracket(&self, age: f64) -> Option<(f64, LookupMethod)> {
        let floor = age.floor() as u32;
        let (&lower_age, &lower) = self.values.range(..=floor).next_back()?;
        let (&upper_age, &upper) = self.values.range(floor + 1..).next()?;
        let weight = (age - lower_age as f64) / (upper_age - lower_age) as f64;
        Some((
            interpolate(lower, upper, weight),
            LookupMethod::Interpolated { lower_age, upper_age },
        ))
    }
}

impl FromIterator<(u32, f64)> for ActuarialTable {
    fn from_iter<I: IntoIterator<Item = (u32, f64)>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

fn interpolate(lower: f64, upper: f64, weight: f64) -> f64 {
    lower + weight * (upper - lower)
}
