//! Projections over the balance tables.
//!
//! Nothing here writes. Views are grouped per currency and never mix
//! currencies in one figure.

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tally_shared::types::{GroupId, UserId};

use super::types::{
    BalanceRow, BalanceSummary, CurrencyAmount, FriendBalance, GroupBalanceView, MonthlyAnalytics,
    ShareRow,
};
use crate::ledger::LedgerError;

/// Stateless read-side queries.
pub struct BalanceQueries;

impl BalanceQueries {
    /// Nets a user's global rows per currency into owe / get buckets.
    ///
    /// A positive net goes to `you_owe`, a negative net to `you_get` as its
    /// absolute value, and a zero net is omitted.
    #[must_use]
    pub fn summarize(rows: &[BalanceRow]) -> BalanceSummary {
        let mut summary = BalanceSummary::default();
        for total in Self::totals_by_currency(rows) {
            if total.amount > Decimal::ZERO {
                summary.you_owe.push(total);
            } else {
                summary
                    .you_get
                    .push(CurrencyAmount::new(total.currency, total.amount.abs()));
            }
        }
        summary
    }

    /// Nonzero net per currency, sorted by currency.
    #[must_use]
    pub fn totals_by_currency(rows: &[BalanceRow]) -> Vec<CurrencyAmount> {
        net_by_currency(rows.iter())
    }

    /// Every counterparty with its nonzero balances, sorted by friend.
    ///
    /// A friend whose balances all netted to zero is kept with an empty list.
    #[must_use]
    pub fn friends(rows: &[BalanceRow]) -> Vec<FriendBalance> {
        let mut by_friend: BTreeMap<UserId, Vec<&BalanceRow>> = BTreeMap::new();
        for row in rows {
            by_friend.entry(row.friend_id).or_default().push(row);
        }
        by_friend
            .into_iter()
            .map(|(friend_id, rows)| FriendBalance {
                friend_id,
                balances: net_by_currency(rows.into_iter()),
            })
            .collect()
    }

    /// A user's view of one group from their GroupBalance rows.
    #[must_use]
    pub fn group_view(group_id: GroupId, rows: &[BalanceRow]) -> GroupBalanceView {
        GroupBalanceView {
            group_id,
            totals: Self::totals_by_currency(rows),
            friends: Self::friends(rows),
        }
    }

    /// Fails unless every amount is exactly zero.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::OutstandingBalance` naming `scope`.
    pub fn ensure_settled(
        amounts: impl IntoIterator<Item = Decimal>,
        scope: &str,
    ) -> Result<(), LedgerError> {
        if amounts.into_iter().any(|a| !a.is_zero()) {
            return Err(LedgerError::OutstandingBalance(format!(
                "{scope} still has unsettled balances"
            )));
        }
        Ok(())
    }

    /// Monthly totals for `user_id`.
    ///
    /// `shares` are participant rows of the month's live expenses, `settled`
    /// the month's completed settlement items the user took part in.
    #[must_use]
    pub fn analytics(
        user_id: UserId,
        month: NaiveDate,
        shares: &[ShareRow],
        settled: &[CurrencyAmount],
    ) -> MonthlyAnalytics {
        let owed = shares
            .iter()
            .filter(|s| s.payer != user_id && s.participant == user_id);
        let lent = shares
            .iter()
            .filter(|s| s.payer == user_id && s.participant != user_id);

        MonthlyAnalytics {
            month: first_of_month(month),
            you_owed: sum_by_currency(owed.map(|s| (&s.currency, s.amount))),
            you_lent: sum_by_currency(lent.map(|s| (&s.currency, s.amount))),
            you_settled: sum_by_currency(settled.iter().map(|s| (&s.currency, s.amount))),
        }
    }

    /// Half-open date range `[first day, first day of next month)` containing `date`.
    #[must_use]
    pub fn month_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
        let start = first_of_month(date);
        let end = start
            .checked_add_months(chrono::Months::new(1))
            .unwrap_or(NaiveDate::MAX);
        (start, end)
    }

    /// Parses `YYYY-MM` into the first day of that month.
    #[must_use]
    pub fn parse_month(s: &str) -> Option<NaiveDate> {
        let (year, month) = s.trim().split_once('-')?;
        NaiveDate::from_ymd_opt(year.parse().ok()?, month.parse().ok()?, 1)
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn net_by_currency<'a>(rows: impl Iterator<Item = &'a BalanceRow>) -> Vec<CurrencyAmount> {
    let mut net: BTreeMap<&str, Decimal> = BTreeMap::new();
    for row in rows {
        *net.entry(row.currency.as_str()).or_default() += row.amount;
    }
    net.into_iter()
        .filter(|(_, amount)| !amount.is_zero())
        .map(|(currency, amount)| CurrencyAmount::new(currency, amount))
        .collect()
}

fn sum_by_currency<'a>(items: impl Iterator<Item = (&'a String, Decimal)>) -> Vec<CurrencyAmount> {
    let mut sums: BTreeMap<&str, Decimal> = BTreeMap::new();
    for (currency, amount) in items {
        *sums.entry(currency.as_str()).or_default() += amount;
    }
    sums.into_iter()
        .filter(|(_, amount)| !amount.is_zero())
        .map(|(currency, amount)| CurrencyAmount::new(currency, amount))
        .collect()
}
