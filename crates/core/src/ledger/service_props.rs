//! Property-based tests for LedgerService against the in-memory book.
//!
//! - Zero-sum: every row equals the negation of its mirror
//! - Conservation of a single split
//! - Reversal restores every row exactly
//! - Edit equals reverse followed by apply
//! - Group rows move with global rows
//! - Self-pairs are never mutated
//! - Reconciliation zeroes group rows once the global pair nets to zero

use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_shared::types::{GroupId, UserId};
use uuid::Uuid;

use super::book::LedgerBook;
use super::mutation::BalanceKey;
use super::service::{LedgerService, SettlementLeg};
use crate::split::{Participant, Split};

const POOL: usize = 5;

fn user(n: usize) -> UserId {
    UserId::from_uuid(Uuid::from_u128(n as u128 + 1))
}

fn group(n: u128) -> GroupId {
    GroupId::from_uuid(Uuid::from_u128(1_000 + n))
}

/// Strategy for currency codes.
fn currency_code() -> impl Strategy<Value = String> {
    prop_oneof![Just("USD".to_string()), Just("EUR".to_string())]
}

/// Strategy for splits among a small user pool, optionally in one of two groups.
fn split_strategy() -> impl Strategy<Value = Split> {
    (
        0..POOL,
        prop::collection::btree_map(0..POOL, 0i64..100_000, 1..POOL),
        prop::option::of(0u128..2),
        currency_code(),
    )
        .prop_map(|(payer, shares, g, currency)| {
            let participants = shares
                .into_iter()
                .map(|(i, cents)| Participant::new(user(i), Decimal::new(cents, 2)))
                .collect();
            Split::new(user(payer), currency, participants, g.map(group))
        })
}

/// Strategy for splits that are always group-scoped.
fn group_split_strategy() -> impl Strategy<Value = Split> {
    split_strategy().prop_map(|mut split| {
        split.group_id.get_or_insert(group(0));
        split
    })
}

fn book_after(splits: &[Split]) -> LedgerBook {
    let mut book = LedgerBook::new();
    for split in splits {
        book.apply(&LedgerService::apply(split).unwrap());
    }
    book
}

/// Rows read as zero when absent; a reversal may leave a new row at zero.
fn same_values(a: &LedgerBook, b: &LedgerBook) -> bool {
    a.global_rows()
        .chain(a.group_rows())
        .all(|(k, v)| b.get(k).unwrap_or_default() == *v)
        && b.global_rows()
            .chain(b.group_rows())
            .all(|(k, v)| a.get(k).unwrap_or_default() == *v)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Every row equals the negation of its mirror after any sequence of splits.
    #[test]
    fn prop_zero_sum(splits in prop::collection::vec(split_strategy(), 1..10)) {
        let book = book_after(&splits);
        for (key, amount) in book.global_rows().chain(book.group_rows()) {
            prop_assert_eq!(book.get(&key.mirror()), Some(-*amount));
        }
    }

    /// Payer rows move by minus each owed amount, debtor rows by plus.
    #[test]
    fn prop_conservation(split in split_strategy()) {
        let plan = LedgerService::apply(&split).unwrap();
        let mut payer_total = Decimal::ZERO;
        for p in split.debtors() {
            let out = plan.net_delta(&BalanceKey::global(split.payer, p.user_id, &*split.currency));
            let back = plan.net_delta(&BalanceKey::global(p.user_id, split.payer, &*split.currency));
            prop_assert_eq!(out, -p.amount);
            prop_assert_eq!(back, p.amount);
            payer_total += out;
        }
        prop_assert_eq!(payer_total, -split.owed_total().unwrap());
    }

    /// Apply followed by reverse leaves every row at its previous value.
    #[test]
    fn prop_reversal_restores(
        history in prop::collection::vec(split_strategy(), 0..6),
        split in split_strategy(),
    ) {
        let before = book_after(&history);
        let mut book = before.clone();
        book.apply(&LedgerService::apply(&split).unwrap());
        book.apply(&LedgerService::reverse(&split).unwrap());
        prop_assert!(same_values(&book, &before));
    }

    /// An edit lands on the same state as a separate reverse then apply.
    #[test]
    fn prop_edit_equivalence(old in split_strategy(), new in split_strategy()) {
        let mut edited = book_after(std::slice::from_ref(&old));
        edited.apply(&LedgerService::edit(&old, &new).unwrap());

        let mut stepwise = book_after(std::slice::from_ref(&old));
        stepwise.apply(&LedgerService::reverse(&old).unwrap());
        stepwise.apply(&LedgerService::apply(&new).unwrap());

        prop_assert_eq!(edited, stepwise);
    }

    /// A group split moves each group row by the same delta as its global row.
    #[test]
    fn prop_group_matches_global(split in group_split_strategy()) {
        let plan = LedgerService::apply(&split).unwrap();
        let group_id = split.group_id.unwrap();
        for mutation in plan.mutations().iter().filter(|m| m.key.is_global()) {
            let scoped = BalanceKey::group(
                group_id,
                mutation.key.user_id,
                mutation.key.friend_id,
                &*mutation.key.currency,
            );
            prop_assert_eq!(plan.net_delta(&scoped), plan.net_delta(&mutation.key));
        }
    }

    /// The payer's own participant row never produces a mutation.
    #[test]
    fn prop_self_exclusion(split in split_strategy()) {
        let plan = LedgerService::apply(&split).unwrap();
        prop_assert!(plan.mutations().iter().all(|m| m.key.user_id != m.key.friend_id));
    }

    /// Settling every debt of a group split globally, then reconciling,
    /// leaves every group row between those pairs at zero.
    #[test]
    fn prop_reconcile_after_full_settlement(split in group_split_strategy()) {
        let mut book = book_after(std::slice::from_ref(&split));
        let currency = split.currency.clone();

        for debtor in split.debtors().filter(|p| !p.amount.is_zero()) {
            let leg = SettlementLeg::new(split.payer, debtor.amount, &*currency);
            let plan = LedgerService::settle(debtor.user_id, &[leg], None).unwrap();
            book.apply(&plan);
            book.reconcile(&plan);
        }

        for (key, amount) in book.group_rows() {
            prop_assert!(amount.is_zero(), "group row {:?} left at {}", key, amount);
        }
    }
}
