//! Actuarial reference tables: life expectancy by sex, worklife expectancy by
//! sex and education tier

mod table;
mod store;
pub mod loader;

pub use table::{ActuarialTable, InterpolationMode, LookupMethod, TableKind};
pub use store::{ActuarialTableStore, LookupResult, SourceInfo};
pub use loader::LoadedTables;
