//! Entity aliases.

pub use super::balances::Entity as Balances;
pub use super::expense_participants::Entity as ExpenseParticipants;
pub use super::expenses::Entity as Expenses;
pub use super::group_balances::Entity as GroupBalances;
pub use super::group_users::Entity as GroupUsers;
pub use super::groups::Entity as Groups;
pub use super::reminders::Entity as Reminders;
pub use super::settlement_items::Entity as SettlementItems;
pub use super::settlement_transactions::Entity as SettlementTransactions;
pub use super::users::Entity as Users;
