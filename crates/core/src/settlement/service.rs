//! Settlement service: item validation, confirmation matching, settle plans.
//!
//! A settlement never touches the ledger until the external payment has been
//! verified and matched against its stored items.

use rust_decimal::Decimal;
use std::collections::HashSet;
use tally_shared::types::{GroupId, UserId};

use super::types::{
    ConfirmationOutcome, PaymentConfirmation, SettlementItemDraft, SettlementStatus, Transfer,
};
use crate::ledger::{
    BalanceKey, LedgerError, LedgerService, PrecisionPolicy, SettlementLeg, canonical_currency,
};
use crate::split::ValidationError;

/// Stateless settlement logic.
pub struct SettlementService;

impl SettlementService {
    /// Canonicalizes each item's currency and rounds its ledger amount to that
    /// currency's minor unit.
    ///
    /// The settlement amount is kept as sent; it is matched against the
    /// external payment, not written to the ledger.
    #[must_use]
    pub fn normalize_items(
        items: Vec<SettlementItemDraft>,
        policy: &PrecisionPolicy,
    ) -> Vec<SettlementItemDraft> {
        items
            .into_iter()
            .map(|mut item| {
                item.original_currency = canonical_currency(&item.original_currency);
                item.original_amount =
                    policy.normalize(&item.original_currency, item.original_amount);
                item
            })
            .collect()
    }

    /// Checks the items of a new settlement.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Validation` for an empty list, a blank currency,
    /// a non-positive amount, a self-payment, or a repeated
    /// (friend, currency) pair.
    pub fn validate_items(
        settler: UserId,
        items: &[SettlementItemDraft],
    ) -> Result<(), LedgerError> {
        if items.is_empty() {
            return Err(ValidationError::EmptyParticipants.into());
        }

        let mut seen = HashSet::with_capacity(items.len());
        for item in items {
            let currency = canonical_currency(&item.original_currency);
            if currency.is_empty() {
                return Err(ValidationError::EmptyCurrency.into());
            }
            if item.friend_id == settler {
                return Err(ValidationError::SelfCounterparty.into());
            }
            if item.original_amount <= Decimal::ZERO {
                return Err(ValidationError::NonPositiveTotal(item.original_amount).into());
            }
            if item.settlement_amount <= Decimal::ZERO {
                return Err(ValidationError::NonPositiveTotal(item.settlement_amount).into());
            }
            if !seen.insert((item.friend_id, currency)) {
                return Err(ValidationError::DuplicateParticipant(item.friend_id).into());
            }
        }
        Ok(())
    }

    /// Builds items for every group debt `settler` has in `currency`.
    ///
    /// Rows where the settler owes (positive amount) become items paid in the
    /// same currency. Rows of other users, other currencies, or the global
    /// ledger are ignored.
    pub fn outstanding_debts<'a>(
        settler: UserId,
        currency: &str,
        rows: impl IntoIterator<Item = (&'a BalanceKey, Decimal)>,
    ) -> Vec<SettlementItemDraft> {
        let currency = canonical_currency(currency);
        rows.into_iter()
            .filter(|(key, amount)| {
                key.group_id.is_some()
                    && key.user_id == settler
                    && key.currency == currency
                    && *amount > Decimal::ZERO
            })
            .map(|(key, amount)| SettlementItemDraft {
                friend_id: key.friend_id,
                original_amount: amount,
                original_currency: currency.clone(),
                settlement_amount: amount,
            })
            .collect()
    }

    /// Balance of the settler toward the item's friend once the item is settled.
    #[must_use]
    pub fn projected_balance(current: Decimal, item: &SettlementItemDraft) -> Decimal {
        current - item.original_amount
    }

    /// Ledger legs for a set of items.
    #[must_use]
    pub fn legs(items: &[SettlementItemDraft]) -> Vec<SettlementLeg> {
        items
            .iter()
            .map(|item| {
                SettlementLeg::new(item.friend_id, item.original_amount, &*item.original_currency)
            })
            .collect()
    }

    /// Checks that the transfers pay exactly the items, one to one.
    ///
    /// Matching is by (recipient, settlement amount) as a multiset; order does
    /// not matter.
    ///
    /// # Errors
    ///
    /// Returns a description of the first mismatch.
    pub fn matches(items: &[SettlementItemDraft], transfers: &[Transfer]) -> Result<(), String> {
        if items.len() != transfers.len() {
            return Err(format!(
                "expected {} transfers, got {}",
                items.len(),
                transfers.len()
            ));
        }

        let mut expected: Vec<(UserId, Decimal)> = items
            .iter()
            .map(|i| (i.friend_id, i.settlement_amount.normalize()))
            .collect();
        let mut actual: Vec<(UserId, Decimal)> = transfers
            .iter()
            .map(|t| (t.recipient, t.amount.normalize()))
            .collect();
        expected.sort();
        actual.sort();

        for (want, got) in expected.iter().zip(&actual) {
            if want != got {
                return Err(format!(
                    "expected {} to {}, got {} to {}",
                    want.1, want.0, got.1, got.0
                ));
            }
        }
        Ok(())
    }

    /// Decides what a payment confirmation does to a stored settlement.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidStateTransition` for a settlement that
    /// already failed, or completed under a different transaction hash.
    pub fn evaluate(
        status: SettlementStatus,
        stored_hash: Option<&str>,
        settler: UserId,
        group_id: Option<GroupId>,
        items: &[SettlementItemDraft],
        confirmation: &PaymentConfirmation,
    ) -> Result<ConfirmationOutcome, LedgerError> {
        if status == SettlementStatus::Completed
            && stored_hash.is_some()
            && stored_hash == confirmation.transaction_hash.as_deref()
        {
            return Ok(ConfirmationOutcome::AlreadyCompleted);
        }

        let target = if confirmation.success {
            SettlementStatus::Completed
        } else {
            SettlementStatus::Failed
        };
        status.transition(target)?;

        if !confirmation.success {
            return Ok(ConfirmationOutcome::Fail);
        }
        if let Err(reason) = Self::matches(items, &confirmation.transfers) {
            return Ok(ConfirmationOutcome::Mismatch { reason });
        }

        let plan = LedgerService::settle(settler, &Self::legs(items), group_id)?;
        Ok(ConfirmationOutcome::Settle { plan })
    }
}
