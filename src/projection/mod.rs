//! Present-value projection of lost earnings

mod engine;
mod ledger;
pub mod proration;

pub use engine::{LedgerInputs, PresentValueEngine};
pub use ledger::{CashflowYear, Ledger, LedgerSummary};
pub use proration::{final_year_portion, first_year_portion, year_portions};
