//! Settlement lifecycle.
//!
//! A settlement records payments meant to clear balances. It is created
//! `PENDING`, and only a verified, matching payment confirmation moves the
//! ledger; the status change and the settle mutations commit together.

pub mod service;
pub mod types;

pub use service::SettlementService;
pub use types::{
    ConfirmationOutcome, NewSettlement, PaymentConfirmation, SettlementItemDraft,
    SettlementStatus, Transfer,
};
