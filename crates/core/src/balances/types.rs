//! Read-side balance views.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{GroupId, UserId};

/// An amount in one currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrencyAmount {
    /// Currency code or token symbol.
    pub currency: String,
    /// Amount.
    pub amount: Decimal,
}

impl CurrencyAmount {
    /// Creates an amount.
    #[must_use]
    pub fn new(currency: impl Into<String>, amount: Decimal) -> Self {
        Self {
            currency: currency.into(),
            amount,
        }
    }
}

/// One of a user's ledger rows, seen from that user.
///
/// Positive `amount` means the user owes `friend_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceRow {
    /// Counterparty.
    pub friend_id: UserId,
    /// Currency.
    pub currency: String,
    /// Signed balance.
    pub amount: Decimal,
}

impl BalanceRow {
    /// Creates a row.
    #[must_use]
    pub fn new(friend_id: UserId, currency: impl Into<String>, amount: Decimal) -> Self {
        Self {
            friend_id,
            currency: currency.into(),
            amount,
        }
    }
}

/// "You owe" and "you are owed" totals per currency.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSummary {
    /// Currencies where the user owes on net.
    pub you_owe: Vec<CurrencyAmount>,
    /// Currencies where the user is owed on net, as positive amounts.
    pub you_get: Vec<CurrencyAmount>,
}

/// A counterparty and the nonzero balances with them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FriendBalance {
    /// Counterparty.
    pub friend_id: UserId,
    /// Nonzero balances; empty once everything is settled.
    pub balances: Vec<CurrencyAmount>,
}

/// A user's view of one group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupBalanceView {
    /// The group.
    pub group_id: GroupId,
    /// Net per currency across the group.
    pub totals: Vec<CurrencyAmount>,
    /// Per-member breakdown.
    pub friends: Vec<FriendBalance>,
}

/// One participant row of an expense, for analytics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareRow {
    /// Who paid the expense.
    pub payer: UserId,
    /// Participant of this row.
    pub participant: UserId,
    /// Currency.
    pub currency: String,
    /// Participant's share.
    pub amount: Decimal,
}

/// Monthly totals for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyAnalytics {
    /// First day of the month.
    pub month: NaiveDate,
    /// Shares the user owes on expenses others paid.
    pub you_owed: Vec<CurrencyAmount>,
    /// Shares others owe on expenses the user paid.
    pub you_lent: Vec<CurrencyAmount>,
    /// Completed settlements the user took part in.
    pub you_settled: Vec<CurrencyAmount>,
}
