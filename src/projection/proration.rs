//! Partial-year portions for the first and final years of the loss period

use chrono::{Datelike, NaiveDate};

/// 365, or 366 in a leap year
pub fn days_in_year(year: i32) -> u32 {
    if NaiveDate::from_ymd_opt(year, 2, 29).is_some() {
        366
    } else {
        365
    }
}

/// Share of the calendar year remaining from `start_date` to 31 December,
/// counting the start date itself.
pub fn first_year_portion(start_date: NaiveDate) -> f64 {
    let days = days_in_year(start_date.year());
    (days - start_date.ordinal() + 1) as f64 / days as f64
}

/// Fractional part of the worklife, worked in the final year
pub fn final_year_portion(worklife_years: f64) -> f64 {
    worklife_years - worklife_years.floor()
}

/// `(year_index, portion)` for every year with a positive portion.
///
/// Interior years count in full. The final index `floor(worklife)` gets the
/// fractional remainder and is skipped when there is none. With a start date,
/// year 0 gets the calendar portion instead; when year 0 is also the final
/// year the smaller of the two applies.
pub fn year_portions(worklife_years: f64, start_date: Option<NaiveDate>) -> Vec<(usize, f64)> {
    let last = worklife_years.floor() as usize;
    let final_portion = final_year_portion(worklife_years);

    (0..=last)
        .map(|year| {
            let portion = if year == last { final_portion } else { 1.0 };
            match (year, start_date) {
                (0, Some(date)) if last == 0 => (year, first_year_portion(date).min(final_portion)),
                (0, Some(date)) => (year, first_year_portion(date)),
                _ => (year, portion),
            }
        })
        .filter(|(_, portion)| *portion > 0.0)
        .collect()
}
