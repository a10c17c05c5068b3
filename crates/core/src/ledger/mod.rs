//! Balance ledger engine.
//!
//! Pairwise balances are kept in two parallel tables: a global one keyed by
//! (user, friend, currency) and a group one keyed additionally by group. This
//! module plans every change to them:
//!
//! - [`LedgerService::apply`] / [`LedgerService::reverse`] / [`LedgerService::edit`]
//!   for expenses
//! - [`LedgerService::settle`] for confirmed settlements
//! - [`LedgerBook::reconcile_zero_balances`] semantics for the cleanup pass
//!
//! Plans are applied by the database layer inside one transaction.

pub mod book;
pub mod error;
pub mod mutation;
pub mod policy;
pub mod precision;
pub mod service;

#[cfg(test)]
mod service_props;

pub use book::LedgerBook;
pub use error::LedgerError;
pub use mutation::{BalanceKey, BalanceMutation, MutationPlan, ReconcileTarget};
pub use policy::AccessPolicy;
pub use precision::{PrecisionPolicy, canonical_currency};
pub use service::{LedgerService, SettlementLeg};
