//! Balance mutations and mutation plans.
//!
//! A plan is the full set of relative increments one ledger operation issues.
//! The store applies a plan inside a single transaction with
//! `amount = amount + delta` upserts, never absolute writes.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tally_shared::types::{GroupId, UserId};

/// Key of one directed ledger row.
///
/// `group_id == None` addresses the global Balance table, `Some(g)` the
/// GroupBalance table scoped to `g`. Positive amounts mean `user_id` owes
/// `friend_id`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BalanceKey {
    /// Group scope, `None` for the global ledger.
    pub group_id: Option<GroupId>,
    /// Owner of the row.
    pub user_id: UserId,
    /// Counterparty.
    pub friend_id: UserId,
    /// Currency code or token symbol.
    pub currency: String,
}

impl BalanceKey {
    /// Key into the global ledger.
    #[must_use]
    pub fn global(user_id: UserId, friend_id: UserId, currency: impl Into<String>) -> Self {
        Self {
            group_id: None,
            user_id,
            friend_id,
            currency: currency.into(),
        }
    }

    /// Key into a group ledger.
    #[must_use]
    pub fn group(
        group_id: GroupId,
        user_id: UserId,
        friend_id: UserId,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            group_id: Some(group_id),
            user_id,
            friend_id,
            currency: currency.into(),
        }
    }

    /// The opposite-direction row of the same pair.
    #[must_use]
    pub fn mirror(&self) -> Self {
        Self {
            group_id: self.group_id,
            user_id: self.friend_id,
            friend_id: self.user_id,
            currency: self.currency.clone(),
        }
    }

    /// Returns true if this key addresses the global ledger.
    #[must_use]
    pub fn is_global(&self) -> bool {
        self.group_id.is_none()
    }
}

/// A relative increment of one ledger row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceMutation {
    /// Row to change.
    pub key: BalanceKey,
    /// Signed amount added to the row.
    pub delta: Decimal,
}

impl BalanceMutation {
    /// Creates a mutation.
    #[must_use]
    pub const fn new(key: BalanceKey, delta: Decimal) -> Self {
        Self { key, delta }
    }
}

/// Pairs whose group rows get zeroed once the global row nets to zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileTarget {
    /// The user on one side of every pair.
    pub user_id: UserId,
    /// Counterparties to check against `user_id`.
    pub counterparties: Vec<UserId>,
    /// Currency of the pairs.
    pub currency: String,
}

/// Ordered set of mutations produced by one ledger operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MutationPlan {
    mutations: Vec<BalanceMutation>,
    reconcile: Vec<ReconcileTarget>,
}

impl MutationPlan {
    /// A plan that changes nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, key: BalanceKey, delta: Decimal) {
        if !delta.is_zero() {
            self.mutations.push(BalanceMutation::new(key, delta));
        }
    }

    pub(crate) fn push_reconcile(&mut self, target: ReconcileTarget) {
        if !target.counterparties.is_empty() {
            self.reconcile.push(target);
        }
    }

    /// Mutations in the order they were planned.
    #[must_use]
    pub fn mutations(&self) -> &[BalanceMutation] {
        &self.mutations
    }

    /// Reconciliation passes to run once the plan is committed.
    #[must_use]
    pub fn reconcile_targets(&self) -> &[ReconcileTarget] {
        &self.reconcile
    }

    /// Returns true if the plan mutates nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// Number of planned mutations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    /// The same plan with every delta negated.
    #[must_use]
    pub fn negated(mut self) -> Self {
        for mutation in &mut self.mutations {
            mutation.delta = -mutation.delta;
        }
        self
    }

    /// Appends `other` after this plan.
    #[must_use]
    pub fn then(mut self, other: Self) -> Self {
        self.mutations.extend(other.mutations);
        for target in other.reconcile {
            if !self.reconcile.contains(&target) {
                self.reconcile.push(target);
            }
        }
        self
    }

    /// Net delta per key, sorted by key, zero nets dropped.
    ///
    /// Sorting gives concurrent writers the same lock order on shared rows.
    #[must_use]
    pub fn consolidated(&self) -> Vec<BalanceMutation> {
        let mut net: BTreeMap<&BalanceKey, Decimal> = BTreeMap::new();
        for mutation in &self.mutations {
            *net.entry(&mutation.key).or_default() += mutation.delta;
        }
        net.into_iter()
            .filter(|(_, delta)| !delta.is_zero())
            .map(|(key, delta)| BalanceMutation::new(key.clone(), delta))
            .collect()
    }

    /// Sum of every delta planned for `key`.
    #[must_use]
    pub fn net_delta(&self, key: &BalanceKey) -> Decimal {
        self.mutations
            .iter()
            .filter(|m| &m.key == key)
            .map(|m| m.delta)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn user(n: u128) -> UserId {
        UserId::from_uuid(Uuid::from_u128(n))
    }

    #[test]
    fn test_mirror_swaps_pair() {
        let key = BalanceKey::global(user(1), user(2), "USD");
        let mirror = key.mirror();
        assert_eq!(mirror.user_id, user(2));
        assert_eq!(mirror.friend_id, user(1));
        assert_eq!(mirror.mirror(), key);
    }

    #[test]
    fn test_zero_deltas_are_not_planned() {
        let mut plan = MutationPlan::empty();
        plan.push(BalanceKey::global(user(1), user(2), "USD"), Decimal::ZERO);
        assert!(plan.is_empty());
    }

    #[test]
    fn test_negated() {
        let mut plan = MutationPlan::empty();
        plan.push(BalanceKey::global(user(1), user(2), "USD"), dec!(-10));
        let negated = plan.negated();
        assert_eq!(negated.mutations()[0].delta, dec!(10));
    }

    #[test]
    fn test_consolidated_nets_and_sorts() {
        let a = BalanceKey::global(user(2), user(1), "USD");
        let b = BalanceKey::global(user(1), user(2), "USD");
        let c = BalanceKey::global(user(1), user(3), "USD");

        let mut plan = MutationPlan::empty();
        plan.push(a.clone(), dec!(10));
        plan.push(b.clone(), dec!(-10));
        plan.push(c.clone(), dec!(5));
        plan.push(c.clone(), dec!(-5));
        plan.push(a.clone(), dec!(2.5));

        let consolidated = plan.consolidated();
        assert_eq!(
            consolidated,
            vec![
                BalanceMutation::new(b, dec!(-10)),
                BalanceMutation::new(a.clone(), dec!(12.5)),
            ]
        );
        assert_eq!(plan.net_delta(&a), dec!(12.5));
    }

    #[test]
    fn test_then_deduplicates_reconcile_targets() {
        let target = ReconcileTarget {
            user_id: user(1),
            counterparties: vec![user(2)],
            currency: "USD".into(),
        };
        let mut first = MutationPlan::empty();
        first.push_reconcile(target.clone());
        let mut second = MutationPlan::empty();
        second.push_reconcile(target);

        let combined = first.then(second);
        assert_eq!(combined.reconcile_targets().len(), 1);
    }
}
