//! Ledger service: turns splits into balance mutation plans.
//!
//! Every operation here is pure. It validates its input and returns the
//! exact set of relative increments the store must commit atomically,
//! together with the reconciliation passes to run afterwards.

use rust_decimal::Decimal;
use std::collections::BTreeMap;
use tally_shared::types::{GroupId, UserId};

use super::error::LedgerError;
use super::mutation::{BalanceKey, MutationPlan, ReconcileTarget};
use super::precision::{PrecisionPolicy, canonical_currency};
use crate::split::{
    Participant, ShareCalculator, ShareEntry, Split, SplitType, SplitValidator, ValidationError,
};

/// One counterparty paid off by a settlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettlementLeg {
    /// Who receives the payment.
    pub friend_id: UserId,
    /// Amount settled, in `currency`.
    pub amount: Decimal,
    /// Ledger currency of the debt being settled.
    pub currency: String,
}

impl SettlementLeg {
    /// Creates a leg.
    #[must_use]
    pub fn new(friend_id: UserId, amount: Decimal, currency: impl Into<String>) -> Self {
        Self {
            friend_id,
            amount,
            currency: currency.into(),
        }
    }
}

/// Stateless ledger planner.
pub struct LedgerService;

impl LedgerService {
    /// Computes, normalizes, and validates a split from raw input.
    ///
    /// The currency is canonicalized, the total is rounded to the currency's
    /// minor unit, shares are computed at that precision, and the result is
    /// checked against the total. The returned split is what gets persisted
    /// and, later, reversed verbatim.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Validation` for any malformed input.
    pub fn prepare_split(
        payer: UserId,
        currency: &str,
        total: Decimal,
        split_type: SplitType,
        entries: &[ShareEntry],
        group_id: Option<GroupId>,
        policy: &PrecisionPolicy,
    ) -> Result<(Split, Decimal), LedgerError> {
        let currency = canonical_currency(currency);
        if currency.is_empty() {
            return Err(ValidationError::EmptyCurrency.into());
        }

        let total = policy.normalize(&currency, total);
        let participants = ShareCalculator::compute(
            payer,
            total,
            split_type,
            entries,
            policy.minor_units(&currency),
        )?;
        let split = policy.normalize_split(Split::new(payer, currency, participants, group_id));
        SplitValidator::validate(&split, total)?;

        Ok((split, total))
    }

    /// Plans the mutations of a new split.
    ///
    /// For each participant other than the payer, the payer's row moves by
    /// `-amount` and the participant's row by `+amount`, in the global ledger
    /// and, for a group split, in the group ledger. Zero amounts and the
    /// payer's own row produce nothing.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Validation` if the participant list is malformed.
    pub fn apply(split: &Split) -> Result<MutationPlan, LedgerError> {
        SplitValidator::validate_participants(split)?;

        let mut plan = MutationPlan::empty();
        for participant in split.debtors() {
            Self::push_pair(&mut plan, split, participant);
        }
        plan.push_reconcile(ReconcileTarget {
            user_id: split.payer,
            counterparties: split.counterparties(),
            currency: split.currency.clone(),
        });
        Ok(plan)
    }

    /// Plans the exact inverse of [`Self::apply`] for a previously applied split.
    ///
    /// Must be given the split as it was stored, not an updated one.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Validation` if the participant list is malformed.
    pub fn reverse(split: &Split) -> Result<MutationPlan, LedgerError> {
        Ok(Self::apply(split)?.negated())
    }

    /// Plans an edit: undo `old`, then apply `new`, as one unit.
    ///
    /// Different currencies touch different rows and are never netted.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Validation` if either split is malformed.
    pub fn edit(old: &Split, new: &Split) -> Result<MutationPlan, LedgerError> {
        Ok(Self::reverse(old)?.then(Self::apply(new)?))
    }

    /// Plans a confirmed settlement paid by `settled_by`.
    ///
    /// Each leg reduces what `settled_by` owes the leg's friend, so a debt of
    /// exactly the leg amount lands on zero. Legs are grouped by currency.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Validation` for an empty list, a non-positive
    /// amount, a self-payment, or a repeated friend within one currency.
    pub fn settle(
        settled_by: UserId,
        legs: &[SettlementLeg],
        group_id: Option<GroupId>,
    ) -> Result<MutationPlan, LedgerError> {
        if legs.is_empty() {
            return Err(ValidationError::EmptyParticipants.into());
        }

        let mut by_currency: BTreeMap<String, Vec<Participant>> = BTreeMap::new();
        for leg in legs {
            if leg.friend_id == settled_by {
                return Err(ValidationError::SelfCounterparty.into());
            }
            if leg.amount <= Decimal::ZERO {
                return Err(ValidationError::NonPositiveTotal(leg.amount).into());
            }
            by_currency
                .entry(canonical_currency(&leg.currency))
                .or_default()
                .push(Participant::new(leg.friend_id, leg.amount));
        }

        let mut plan = MutationPlan::empty();
        for (currency, participants) in by_currency {
            let split = Split::new(settled_by, currency, participants, group_id);
            plan = plan.then(Self::apply(&split)?);
        }
        Ok(plan)
    }

    fn push_pair(plan: &mut MutationPlan, split: &Split, participant: &Participant) {
        let payer = split.payer;
        let debtor = participant.user_id;
        let amount = participant.amount;

        plan.push(BalanceKey::global(payer, debtor, &*split.currency), -amount);
        plan.push(BalanceKey::global(debtor, payer, &*split.currency), amount);

        if let Some(group_id) = split.group_id {
            plan.push(
                BalanceKey::group(group_id, payer, debtor, &*split.currency),
                -amount,
            );
            plan.push(
                BalanceKey::group(group_id, debtor, payer, &*split.currency),
                amount,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::book::LedgerBook;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    fn alice() -> UserId {
        UserId::from_uuid(Uuid::from_u128(1))
    }
    fn bob() -> UserId {
        UserId::from_uuid(Uuid::from_u128(2))
    }
    fn charlie() -> UserId {
        UserId::from_uuid(Uuid::from_u128(3))
    }
    fn group() -> GroupId {
        GroupId::from_uuid(Uuid::from_u128(100))
    }

    fn equal_split(payer: UserId, total: Decimal, users: &[UserId], g: Option<GroupId>) -> Split {
        let entries: Vec<ShareEntry> = users.iter().copied().map(ShareEntry::bare).collect();
        LedgerService::prepare_split(
            payer,
            "usd",
            total,
            SplitType::Equal,
            &entries,
            g,
            &PrecisionPolicy::default(),
        )
        .unwrap()
        .0
    }

    #[test]
    fn test_prepare_split_rejects_overflowing_shares() {
        let entries = [
            ShareEntry::with_value(alice(), Decimal::MAX),
            ShareEntry::with_value(bob(), Decimal::MAX),
        ];
        let err = LedgerService::prepare_split(
            alice(),
            "USD",
            dec!(100),
            SplitType::Share,
            &entries,
            None,
            &PrecisionPolicy::default(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            LedgerError::Validation(ValidationError::AmountOutOfRange)
        ));
        assert_eq!(err.error_code(), "AMOUNT_OUT_OF_RANGE");
    }

    #[test]
    fn test_alice_pays_for_herself_and_bob() {
        let split = equal_split(alice(), dec!(100), &[alice(), bob()], None);
        let plan = LedgerService::apply(&split).unwrap();
        assert_eq!(plan.len(), 2);

        let mut book = LedgerBook::new();
        book.apply(&plan);
        assert_eq!(book.balance(alice(), bob(), "USD"), dec!(-50));
        assert_eq!(book.balance(bob(), alice(), "USD"), dec!(50));
        assert!(book.group_rows().next().is_none());
    }

    #[test]
    fn test_group_split_three_ways() {
        let split = equal_split(alice(), dec!(90), &[alice(), bob(), charlie()], Some(group()));
        let plan = LedgerService::apply(&split).unwrap();
        assert_eq!(plan.len(), 8);

        let mut book = LedgerBook::new();
        book.apply(&plan);
        for friend in [bob(), charlie()] {
            assert_eq!(book.group_balance(group(), alice(), friend, "USD"), dec!(-30));
            assert_eq!(book.group_balance(group(), friend, alice(), "USD"), dec!(30));
            assert_eq!(book.balance(alice(), friend, "USD"), dec!(-30));
        }
    }

    #[test]
    fn test_edit_drops_charlie() {
        let old = equal_split(alice(), dec!(90), &[alice(), bob(), charlie()], Some(group()));
        let new = equal_split(alice(), dec!(90), &[alice(), bob()], Some(group()));

        let mut book = LedgerBook::new();
        book.apply(&LedgerService::apply(&old).unwrap());
        book.apply(&LedgerService::edit(&old, &new).unwrap());

        assert_eq!(book.group_balance(group(), alice(), charlie(), "USD"), dec!(0));
        assert_eq!(book.group_balance(group(), charlie(), alice(), "USD"), dec!(0));
        assert_eq!(book.group_balance(group(), alice(), bob(), "USD"), dec!(-45));
        assert_eq!(book.balance(alice(), bob(), "USD"), dec!(-45));
    }

    #[test]
    fn test_delete_restores_previous_values() {
        let mut book = LedgerBook::new();
        let earlier = equal_split(bob(), dec!(33.33), &[alice(), bob()], None);
        book.apply(&LedgerService::apply(&earlier).unwrap());
        let before = book.clone();

        let split = equal_split(alice(), dec!(100), &[alice(), bob()], None);
        book.apply(&LedgerService::apply(&split).unwrap());
        book.apply(&LedgerService::reverse(&split).unwrap());

        assert_eq!(book, before);
    }

    #[test]
    fn test_bob_settles_with_alice() {
        let split = equal_split(alice(), dec!(100), &[alice(), bob()], Some(group()));
        let mut book = LedgerBook::new();
        book.apply(&LedgerService::apply(&split).unwrap());

        let plan = LedgerService::settle(bob(), &[SettlementLeg::new(alice(), dec!(50), "USD")], None)
            .unwrap();
        book.apply(&plan);
        assert_eq!(book.balance(alice(), bob(), "USD"), dec!(0));
        assert_eq!(book.balance(bob(), alice(), "USD"), dec!(0));
        // settled outside the group, so the group rows still show the debt
        assert_eq!(book.group_balance(group(), bob(), alice(), "USD"), dec!(50));

        book.reconcile(&plan);
        assert_eq!(book.group_balance(group(), bob(), alice(), "USD"), dec!(0));
        assert_eq!(book.group_balance(group(), alice(), bob(), "USD"), dec!(0));
    }

    #[test]
    fn test_currency_change_does_not_net() {
        let old = equal_split(alice(), dec!(100), &[alice(), bob()], None);
        let mut new = old.clone();
        new.currency = "EUR".into();

        let mut book = LedgerBook::new();
        book.apply(&LedgerService::apply(&old).unwrap());
        book.apply(&LedgerService::edit(&old, &new).unwrap());

        assert_eq!(book.balance(alice(), bob(), "USD"), dec!(0));
        assert_eq!(book.balance(alice(), bob(), "EUR"), dec!(-50));
    }

    #[test]
    fn test_payer_row_produces_nothing() {
        let split = Split::new(alice(), "USD", vec![Participant::new(alice(), dec!(10))], None);
        assert!(LedgerService::apply(&split).unwrap().is_empty());
    }

    #[test]
    fn test_apply_rejects_duplicates() {
        let split = Split::new(
            alice(),
            "USD",
            vec![
                Participant::new(bob(), dec!(10)),
                Participant::new(bob(), dec!(10)),
            ],
            None,
        );
        assert!(matches!(
            LedgerService::apply(&split),
            Err(LedgerError::Validation(ValidationError::DuplicateParticipant(_)))
        ));
    }

    #[test]
    fn test_prepare_split_rounds_to_minor_unit() {
        let entries = [ShareEntry::bare(alice()), ShareEntry::bare(bob()), ShareEntry::bare(charlie())];
        let (split, total) = LedgerService::prepare_split(
            alice(),
            "jpy",
            dec!(1000.4),
            SplitType::Equal,
            &entries,
            None,
            &PrecisionPolicy::default(),
        )
        .unwrap();
        assert_eq!(total, dec!(1000));
        assert_eq!(split.currency, "JPY");
        let amounts: Vec<Decimal> = split.participants.iter().map(|p| p.amount).collect();
        assert_eq!(amounts, vec![dec!(334), dec!(333), dec!(333)]);
    }

    #[test]
    fn test_settle_validation() {
        assert!(LedgerService::settle(bob(), &[], None).is_err());
        assert!(matches!(
            LedgerService::settle(bob(), &[SettlementLeg::new(bob(), dec!(5), "USD")], None),
            Err(LedgerError::Validation(ValidationError::SelfCounterparty))
        ));
        assert!(matches!(
            LedgerService::settle(bob(), &[SettlementLeg::new(alice(), dec!(0), "USD")], None),
            Err(LedgerError::Validation(ValidationError::NonPositiveTotal(_)))
        ));
    }

    #[test]
    fn test_settle_groups_legs_by_currency() {
        let plan = LedgerService::settle(
            bob(),
            &[
                SettlementLeg::new(alice(), dec!(5), "usd"),
                SettlementLeg::new(charlie(), dec!(7), "USD"),
                SettlementLeg::new(alice(), dec!(100), "JPY"),
            ],
            None,
        )
        .unwrap();
        assert_eq!(plan.len(), 6);
        assert_eq!(plan.reconcile_targets().len(), 2);
        assert_eq!(
            plan.net_delta(&BalanceKey::global(bob(), alice(), "USD")),
            dec!(-5)
        );
    }
}
