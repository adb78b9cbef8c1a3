//! Economic inputs: wage growth and discounting

mod discount;
mod wage;

pub use discount::{DiscountCurve, DiscountCurveProvider, DEFAULT_DISCOUNT_RATE};
pub use wage::{GrowthRateTable, WageProjector, DEFAULT_BASE_GROWTH_RATE};
