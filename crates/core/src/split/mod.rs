//! Split input: types, share calculation, and validation.
//!
//! Everything here runs before the ledger is touched. A split that leaves
//! this module is structurally sound; the ledger only decides what moves.

pub mod allocation;
pub mod error;
pub mod shares;
pub mod types;
pub mod validation;

#[cfg(test)]
mod shares_props;

pub use allocation::AllocationUtil;
pub use error::ValidationError;
pub use shares::ShareCalculator;
pub use types::{CurrencyType, Participant, ShareEntry, Split, SplitType};
pub use validation::SplitValidator;
