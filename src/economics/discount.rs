//! Per-year discount curves
//!
//! Supports:
//! - Flat curve from one recommended rate (the standard case)
//! - Explicit per-year rates
//!
//! Discounting is end-of-year: year `t` is discounted by `1/(1+r_t)^(t+1)`.
//! Reads past the end of the curve reuse the last rate.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::ValidationError;
use crate::provenance::{ProvenanceEntry, ProvenanceLog};

const COMPONENT: &str = "DiscountCurveProvider";

/// Default recommended discount rate
pub const DEFAULT_DISCOUNT_RATE: f64 = 0.035;

/// Annual discount rates indexed by year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscountCurve {
    rates: Vec<f64>,
}

impl DiscountCurve {
    /// Same rate for every year; always at least one entry
    pub fn flat(rate: f64, horizon_years: usize) -> Result<Self, ValidationError> {
        let rate = ValidationError::rate("discount_rate", rate)?;
        Ok(Self {
            rates: vec![rate; horizon_years.max(1)],
        })
    }

    /// Explicit per-year rates; must be non-empty and each above -100%
    pub fn from_rates(rates: Vec<f64>) -> Result<Self, ValidationError> {
        if rates.is_empty() {
            return Err(ValidationError::MissingField("discount_curve"));
        }
        for rate in &rates {
            ValidationError::rate("discount_rate", *rate)?;
        }
        Ok(Self { rates })
    }

    pub fn rates(&self) -> &[f64] {
        &self.rates
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Rate for a year, clamped to the last entry
    pub fn rate_for_year(&self, year_index: usize) -> f64 {
        self.rates
            .get(year_index)
            .or_else(|| self.rates.last())
            .copied()
            .unwrap_or(0.0)
    }

    /// `1 / (1 + r_t)^(t + 1)`
    pub fn discount_factor(&self, year_index: usize) -> f64 {
        let rate = self.rate_for_year(year_index);
        1.0 / (1.0 + rate).powi(year_index as i32 + 1)
    }

    /// Present value of `(year_index, amount)` pairs
    pub fn pv_stream(&self, amounts: &[(usize, f64)]) -> f64 {
        amounts
            .iter()
            .map(|(year, amount)| amount * self.discount_factor(*year))
            .sum()
    }
}

/// Builds the curve used for a case
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscountCurveProvider;

impl DiscountCurveProvider {
    /// Flat curve from one recommended rate. There is no term structure.
    pub fn curve(
        &self,
        recommended_rate: f64,
        horizon_years: usize,
        log: &mut ProvenanceLog,
    ) -> Result<DiscountCurve, ValidationError> {
        let curve = DiscountCurve::flat(recommended_rate, horizon_years)?;
        log.record(ProvenanceEntry::input(
            COMPONENT,
            "Received recommended discount rate",
            json!({"recommendedRate": recommended_rate, "horizonYears": horizon_years}),
        ));
        log.record(
            ProvenanceEntry::new(
                COMPONENT,
                "discount_curve",
                format!("Flat discount curve over {} years", curve.len()),
                json!(recommended_rate),
            )
            .with_formula("r_t = recommended_rate for all t"),
        );
        Ok(curve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_flat_curve() {
        let curve = DiscountCurve::flat(0.05, 10).unwrap();
        assert_eq!(curve.len(), 10);
        assert!(curve.rates().iter().all(|r| (*r - 0.05).abs() < 1e-15));
    }

    #[test]
    fn test_zero_horizon_still_has_a_rate() {
        let curve = DiscountCurve::flat(0.05, 0).unwrap();
        assert_eq!(curve.len(), 1);
    }

    #[test]
    fn test_discount_factor_end_of_year() {
        let curve = DiscountCurve::flat(0.05, 3).unwrap();
        assert_relative_eq!(curve.discount_factor(0), 1.0 / 1.05, epsilon = 1e-12);
        assert_relative_eq!(curve.discount_factor(2), 1.0 / 1.05f64.powi(3), epsilon = 1e-12);
    }

    #[test]
    fn test_rate_clamped_past_end() {
        let curve = DiscountCurve::from_rates(vec![0.02, 0.03]).unwrap();
        assert_eq!(curve.rate_for_year(1), 0.03);
        assert_eq!(curve.rate_for_year(40), 0.03);
        assert_relative_eq!(curve.discount_factor(4), 1.0 / 1.03f64.powi(5), epsilon = 1e-12);
    }

    #[test]
    fn test_invalid_curves() {
        assert!(DiscountCurve::from_rates(vec![]).is_err());
        assert!(DiscountCurve::from_rates(vec![0.03, f64::NAN]).is_err());
        assert!(DiscountCurve::flat(-1.5, 5).is_err());
    }

    #[test]
    fn test_pv_stream() {
        let curve = DiscountCurve::flat(0.10, 2).unwrap();
        let pv = curve.pv_stream(&[(0, 110.0), (1, 121.0)]);
        assert_relative_eq!(pv, 200.0, epsilon = 1e-9);
    }

    #[test]
    fn test_provider_records_curve() {
        let mut log = ProvenanceLog::new();
        let curve = DiscountCurveProvider.curve(0.035, 30, &mut log).unwrap();
        assert_eq!(curve.len(), 30);
        assert!(log.contains_step("discount_curve"));
    }
}
