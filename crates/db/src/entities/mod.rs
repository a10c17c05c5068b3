//! `SeaORM` entity definitions, one module per table.

pub mod prelude;

pub mod balances;
pub mod expense_participants;
pub mod expenses;
pub mod group_balances;
pub mod group_users;
pub mod groups;
pub mod reminders;
pub mod sea_orm_active_enums;
pub mod settlement_items;
pub mod settlement_transactions;
pub mod users;
