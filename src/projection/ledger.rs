//! Cashflow ledger output structures

use serde::{Deserialize, Serialize};

/// One year of the loss period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CashflowYear {
    // Timing
    pub year_index: usize,
    pub age: f64,
    /// Share of the year worked, in (0, 1]
    pub portion_of_year: f64,

    // Value
    pub wage: f64,
    pub benefits: f64,
    /// `wage + benefits`
    pub full_year_value: f64,
    /// `full_year_value * portion_of_year`
    pub actual_value: f64,
    pub cumulative_actual_value: f64,

    // Discounting
    pub discount_rate: f64,
    /// `1 / (1 + discount_rate)^(year_index + 1)`
    pub discount_factor: f64,
    /// `actual_value * discount_factor`
    pub present_value: f64,
    pub cumulative_present_value: f64,
}

/// Complete ledger from one engine run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ledger {
    pub rows: Vec<CashflowYear>,
    pub total_nominal: f64,
    pub total_present_value: f64,
    pub worklife_years: f64,
    /// Rows the worklife called for, before any truncation
    pub years_requested: usize,
    /// Set when the wage series ran out before the worklife did
    pub horizon_truncated: bool,
}

impl Ledger {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Get summary statistics
    pub fn summary(&self) -> LedgerSummary {
        let total_wages: f64 = self.rows.iter().map(|r| r.wage * r.portion_of_year).sum();
        let total_benefits: f64 = self.rows.iter().map(|r| r.benefits * r.portion_of_year).sum();
        let years_of_loss: f64 = self.rows.iter().map(|r| r.portion_of_year).sum();

        LedgerSummary {
            total_years: self.rows.len(),
            years_of_loss,
            total_wages,
            total_benefits,
            total_nominal: self.total_nominal,
            total_present_value: self.total_present_value,
            final_age: self.rows.last().map(|r| r.age),
            average_discount_factor: if self.total_nominal > 0.0 {
                self.total_present_value / self.total_nominal
            } else {
                1.0
            },
        }
    }
}

/// Summary statistics for a ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerSummary {
    pub total_years: usize,
    /// Sum of year portions
    pub years_of_loss: f64,
    pub total_wages: f64,
    pub total_benefits: f64,
    pub total_nominal: f64,
    pub total_present_value: f64,
    pub final_age: Option<f64>,
    /// `total_present_value / total_nominal`
    pub average_discount_factor: f64,
}
