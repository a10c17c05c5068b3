//! In-memory ledger book.
//!
//! Applies mutation plans with the same upsert-increment and reconciliation
//! semantics as the database writer. It is the reference model the ledger
//! tests check plans against.

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tally_shared::types::{GroupId, UserId};

use super::mutation::{BalanceKey, MutationPlan};

/// Balance and GroupBalance rows held in memory.
///
/// Rows are created on first mutation and never removed; a row that nets to
/// zero stays present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerBook {
    rows: BTreeMap<BalanceKey, Decimal>,
}

impl LedgerBook {
    /// Creates an empty book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a book from existing rows.
    pub fn from_rows(rows: impl IntoIterator<Item = (BalanceKey, Decimal)>) -> Self {
        Self {
            rows: rows.into_iter().collect(),
        }
    }

    /// Applies every mutation of `plan` as an increment.
    pub fn apply(&mut self, plan: &MutationPlan) {
        for mutation in plan.mutations() {
            *self.rows.entry(mutation.key.clone()).or_default() += mutation.delta;
        }
    }

    /// Runs every reconciliation pass requested by `plan`.
    ///
    /// Returns the number of group rows forced to zero.
    pub fn reconcile(&mut self, plan: &MutationPlan) -> usize {
        plan.reconcile_targets()
            .iter()
            .map(|t| self.reconcile_zero_balances(t.user_id, &t.counterparties, &t.currency))
            .sum()
    }

    /// Zeroes the group rows of every pair whose global row exists and is exactly zero.
    ///
    /// Only the global ledger triggers this; a group that nets to zero on its
    /// own leaves the global row alone. Returns the number of rows changed.
    pub fn reconcile_zero_balances(
        &mut self,
        user_id: UserId,
        counterparties: &[UserId],
        currency: &str,
    ) -> usize {
        let mut changed = 0;
        for friend_id in counterparties {
            let global = BalanceKey::global(user_id, *friend_id, currency);
            if self.rows.get(&global) != Some(&Decimal::ZERO) {
                continue;
            }
            for (key, amount) in &mut self.rows {
                let same_pair = (key.user_id == user_id && key.friend_id == *friend_id)
                    || (key.user_id == *friend_id && key.friend_id == user_id);
                if key.group_id.is_some()
                    && same_pair
                    && key.currency == currency
                    && !amount.is_zero()
                {
                    *amount = Decimal::ZERO;
                    changed += 1;
                }
            }
        }
        changed
    }

    /// Row value, `None` if the row was never created.
    #[must_use]
    pub fn get(&self, key: &BalanceKey) -> Option<Decimal> {
        self.rows.get(key).copied()
    }

    /// Global balance of `user_id` toward `friend_id`; absent rows read as zero.
    #[must_use]
    pub fn balance(&self, user_id: UserId, friend_id: UserId, currency: &str) -> Decimal {
        self.get(&BalanceKey::global(user_id, friend_id, currency))
            .unwrap_or_default()
    }

    /// Group balance of `user_id` toward `friend_id`; absent rows read as zero.
    #[must_use]
    pub fn group_balance(
        &self,
        group_id: GroupId,
        user_id: UserId,
        friend_id: UserId,
        currency: &str,
    ) -> Decimal {
        self.get(&BalanceKey::group(group_id, user_id, friend_id, currency))
            .unwrap_or_default()
    }

    /// Every global row.
    pub fn global_rows(&self) -> impl Iterator<Item = (&BalanceKey, &Decimal)> {
        self.rows.iter().filter(|(k, _)| k.is_global())
    }

    /// Every group row.
    pub fn group_rows(&self) -> impl Iterator<Item = (&BalanceKey, &Decimal)> {
        self.rows.iter().filter(|(k, _)| !k.is_global())
    }
}
