//! Core ledger logic for Tally.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! Database and HTTP layers call into it to decide what to write; it never
//! writes anything itself.
//!
//! # Modules
//!
//! - `split` - Split types, share calculation, and input validation
//! - `ledger` - Balance mutation planning, precision policy, reconciliation
//! - `settlement` - Settlement state machine and payment confirmation matching
//! - `reminder` - Reminder eligibility and status rules
//! - `balances` - Read-side projections over the balance tables

pub mod balances;
pub mod ledger;
pub mod reminder;
pub mod settlement;
pub mod split;
