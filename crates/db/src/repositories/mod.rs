//! Repository abstractions for data access.
//!
//! Repositories take validated input, ask `tally-core` what the ledger should
//! do, and execute the answer inside one database transaction.

pub mod balance;
pub mod expense;
pub mod group;
pub mod ledger;
pub mod reminder;
pub mod settlement;
pub mod user;

pub use balance::{BalanceRepository, GroupWithTotals};
pub use expense::{ExpenseRepository, ExpenseUpdate, ExpenseWithParticipants, NewExpense};
pub use group::GroupRepository;
pub use ledger::LedgerWriter;
pub use reminder::{NewReminder, ReminderRepository};
pub use settlement::{SettlementRepository, SettlementWithItems};
pub use user::UserRepository;
