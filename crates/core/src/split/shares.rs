//! Turns a split type and raw participant input into owed amounts.

use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashSet;
use tally_shared::types::UserId;

use super::allocation::AllocationUtil;
use super::error::ValidationError;
use super::types::{Participant, ShareEntry, SplitType};

/// Stateless calculator for participant amounts.
pub struct ShareCalculator;

impl ShareCalculator {
    /// Computes what each entry owes so that the amounts sum exactly to `total`.
    ///
    /// `total` is expected to be normalized to `minor_units` already; every
    /// computed amount is expressed in the same precision.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the entries are empty or duplicated, the
    /// total is not positive, or the values do not fit the split type.
    pub fn compute(
        payer: UserId,
        total: Decimal,
        split_type: SplitType,
        entries: &[ShareEntry],
        minor_units: u32,
    ) -> Result<Vec<Participant>, ValidationError> {
        if entries.is_empty() {
            return Err(ValidationError::EmptyParticipants);
        }
        if total <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveTotal(total));
        }
        let mut seen = HashSet::with_capacity(entries.len());
        for entry in entries {
            if !seen.insert(entry.user_id) {
                return Err(ValidationError::DuplicateParticipant(entry.user_id));
            }
        }

        let amounts = match split_type {
            SplitType::Equal => AllocationUtil::allocate_equal(total, entries.len(), minor_units)?,
            SplitType::Exact => Self::values(entries, split_type)?,
            SplitType::Percentage => Self::percentage(total, entries, minor_units)?,
            SplitType::Share => Self::share(total, entries, minor_units)?,
            SplitType::Adjustment => Self::adjustment(total, entries, minor_units)?,
            SplitType::Settlement => return Self::settlement(payer, total, entries),
        };

        Ok(entries
            .iter()
            .zip(amounts)
            .map(|(entry, amount)| Participant::new(entry.user_id, amount))
            .collect())
    }

    fn values(
        entries: &[ShareEntry],
        split_type: SplitType,
    ) -> Result<Vec<Decimal>, ValidationError> {
        entries
            .iter()
            .map(|e| {
                e.value.ok_or(ValidationError::MissingSplitValue {
                    user_id: e.user_id,
                    split_type,
                })
            })
            .collect()
    }

    fn percentage(
        total: Decimal,
        entries: &[ShareEntry],
        minor_units: u32,
    ) -> Result<Vec<Decimal>, ValidationError> {
        let percentages = Self::values(entries, SplitType::Percentage)?;
        let sum = AllocationUtil::checked_sum(percentages.iter().copied())?;
        if sum != Decimal::ONE_HUNDRED || percentages.iter().any(|p| *p < Decimal::ZERO) {
            return Err(ValidationError::InvalidPercentages(sum));
        }
        AllocationUtil::allocate_by_weights(total, &percentages, minor_units)
    }

    fn share(
        total: Decimal,
        entries: &[ShareEntry],
        minor_units: u32,
    ) -> Result<Vec<Decimal>, ValidationError> {
        let weights = Self::values(entries, SplitType::Share)?;
        if weights.iter().any(|w| *w < Decimal::ZERO) {
            return Err(ValidationError::InvalidShares);
        }
        let portions = AllocationUtil::allocate_by_weights(total, &weights, minor_units)?;
        if portions.is_empty() {
            return Err(ValidationError::InvalidShares);
        }
        Ok(portions)
    }

    /// Even split of what remains after adjustments, plus each adjustment.
    fn adjustment(
        total: Decimal,
        entries: &[ShareEntry],
        minor_units: u32,
    ) -> Result<Vec<Decimal>, ValidationError> {
        let adjustments: Vec<Decimal> = Self::values(entries, SplitType::Adjustment)?
            .into_iter()
            .map(|a| a.round_dp_with_strategy(minor_units, RoundingStrategy::MidpointNearestEven))
            .collect();
        let remaining = total
            .checked_sub(AllocationUtil::checked_sum(adjustments.iter().copied())?)
            .ok_or(ValidationError::AmountOutOfRange)?;
        if remaining < Decimal::ZERO {
            return Err(ValidationError::InvalidAdjustments);
        }

        let amounts = AllocationUtil::allocate_equal(remaining, entries.len(), minor_units)?
            .into_iter()
            .zip(&adjustments)
            .map(|(base, adj)| base.checked_add(*adj).ok_or(ValidationError::AmountOutOfRange))
            .collect::<Result<Vec<Decimal>, _>>()?;
        if amounts.iter().any(|a| *a < Decimal::ZERO) {
            return Err(ValidationError::InvalidAdjustments);
        }
        Ok(amounts)
    }

    /// Payer at zero, the single counterparty owes the full total.
    fn settlement(
        payer: UserId,
        total: Decimal,
        entries: &[ShareEntry],
    ) -> Result<Vec<Participant>, ValidationError> {
        let counterparties: Vec<UserId> = entries
            .iter()
            .map(|e| e.user_id)
            .filter(|id| *id != payer)
            .collect();
        if counterparties.len() != 1 || entries.len() > 2 {
            return Err(ValidationError::InvalidSettlementSplit);
        }

        let mut participants = vec![Participant::new(counterparties[0], total)];
        if entries.len() == 2 {
            participants.insert(0, Participant::new(payer, Decimal::ZERO));
        }
        Ok(participants)
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

    fn amounts(participants: &[Participant]) -> Vec<Decimal> {
        participants.iter().map(|p| p.amount).collect()
    }

    #[test]
    fn test_equal_split_three_ways() {
        let entries = [ShareEntry::bare(user(1)), ShareEntry::bare(user(2)), ShareEntry::bare(user(3))];
        let result = ShareCalculator::compute(user(1), dec!(90), SplitType::Equal, &entries, 2).unwrap();
        assert_eq!(amounts(&result), vec![dec!(30), dec!(30), dec!(30)]);
        assert_eq!(result[2].user_id, user(3));
    }

    #[test]
    fn test_exact_passes_values_through() {
        let entries = [
            ShareEntry::with_value(user(1), dec!(45)),
            ShareEntry::with_value(user(2), dec!(45)),
        ];
        let result = ShareCalculator::compute(user(1), dec!(90), SplitType::Exact, &entries, 2).unwrap();
        assert_eq!(amounts(&result), vec![dec!(45), dec!(45)]);
    }

    #[test]
    fn test_exact_requires_values() {
        let entries = [ShareEntry::bare(user(1))];
        let result = ShareCalculator::compute(user(1), dec!(90), SplitType::Exact, &entries, 2);
        assert!(matches!(result, Err(ValidationError::MissingSplitValue { .. })));
    }

    #[test]
    fn test_percentage_split() {
        let entries = [
            ShareEntry::with_value(user(1), dec!(25)),
            ShareEntry::with_value(user(2), dec!(75)),
        ];
        let result =
            ShareCalculator::compute(user(1), dec!(80), SplitType::Percentage, &entries, 2).unwrap();
        assert_eq!(amounts(&result), vec![dec!(20), dec!(60)]);
    }

    #[test]
    fn test_percentage_must_sum_to_hundred() {
        let entries = [
            ShareEntry::with_value(user(1), dec!(25)),
            ShareEntry::with_value(user(2), dec!(70)),
        ];
        let result = ShareCalculator::compute(user(1), dec!(80), SplitType::Percentage, &entries, 2);
        assert_eq!(result, Err(ValidationError::InvalidPercentages(dec!(95))));
    }

    #[test]
    fn test_share_weights() {
        let entries = [
            ShareEntry::with_value(user(1), dec!(1)),
            ShareEntry::with_value(user(2), dec!(2)),
            ShareEntry::with_value(user(3), dec!(1)),
        ];
        let result = ShareCalculator::compute(user(1), dec!(100), SplitType::Share, &entries, 2).unwrap();
        assert_eq!(amounts(&result), vec![dec!(25), dec!(50), dec!(25)]);
    }

    #[test]
    fn test_share_rejects_all_zero() {
        let entries = [
            ShareEntry::with_value(user(1), dec!(0)),
            ShareEntry::with_value(user(2), dec!(0)),
        ];
        let result = ShareCalculator::compute(user(1), dec!(100), SplitType::Share, &entries, 2);
        assert_eq!(result, Err(ValidationError::InvalidShares));
    }

    #[test]
    fn test_adjustment_split() {
        // 100 - 10 = 90 split evenly (45/45), then +10 to the first
        let entries = [
            ShareEntry::with_value(user(1), dec!(10)),
            ShareEntry::with_value(user(2), dec!(0)),
        ];
        let result =
            ShareCalculator::compute(user(1), dec!(100), SplitType::Adjustment, &entries, 2).unwrap();
        assert_eq!(amounts(&result), vec![dec!(55), dec!(45)]);
    }

    #[test]
    fn test_adjustment_cannot_go_negative() {
        let entries = [
            ShareEntry::with_value(user(1), dec!(-80)),
            ShareEntry::with_value(user(2), dec!(0)),
        ];
        // remaining 180 -> 90 each, first lands at 10: allowed
        let ok = ShareCalculator::compute(user(1), dec!(100), SplitType::Adjustment, &entries, 2).unwrap();
        assert_eq!(amounts(&ok), vec![dec!(10), dec!(90)]);

        let entries = [
            ShareEntry::with_value(user(1), dec!(-120)),
            ShareEntry::with_value(user(2), dec!(0)),
        ];
        let result = ShareCalculator::compute(user(1), dec!(100), SplitType::Adjustment, &entries, 2);
        assert_eq!(result, Err(ValidationError::InvalidAdjustments));

        let entries = [ShareEntry::with_value(user(1), dec!(150))];
        let result = ShareCalculator::compute(user(1), dec!(100), SplitType::Adjustment, &entries, 2);
        assert_eq!(result, Err(ValidationError::InvalidAdjustments));
    }

    #[test]
    fn test_overflowing_values_are_rejected() {
        let huge = [
            ShareEntry::with_value(user(1), Decimal::MAX),
            ShareEntry::with_value(user(2), Decimal::MAX),
        ];
        for split_type in [SplitType::Share, SplitType::Percentage, SplitType::Adjustment] {
            assert_eq!(
                ShareCalculator::compute(user(1), dec!(100), split_type, &huge, 2),
                Err(ValidationError::AmountOutOfRange),
                "{split_type}"
            );
        }

        // the sum fits but total minus it does not
        let entries = [
            ShareEntry::with_value(user(1), Decimal::MIN),
            ShareEntry::with_value(user(2), dec!(0)),
        ];
        assert_eq!(
            ShareCalculator::compute(user(1), dec!(100), SplitType::Adjustment, &entries, 2),
            Err(ValidationError::AmountOutOfRange)
        );
    }

    #[test]
    fn test_settlement_split() {
        let entries = [ShareEntry::bare(user(1)), ShareEntry::bare(user(2))];
        let result =
            ShareCalculator::compute(user(1), dec!(40), SplitType::Settlement, &entries, 2).unwrap();
        assert_eq!(
            result,
            vec![
                Participant::new(user(1), dec!(0)),
                Participant::new(user(2), dec!(40)),
            ]
        );
    }

    #[test]
    fn test_settlement_requires_single_counterparty() {
        let entries = [ShareEntry::bare(user(2)), ShareEntry::bare(user(3))];
        let result = ShareCalculator::compute(user(1), dec!(40), SplitType::Settlement, &entries, 2);
        assert_eq!(result, Err(ValidationError::InvalidSettlementSplit));
    }

    #[test]
    fn test_rejects_duplicates_and_empty() {
        let entries = [ShareEntry::bare(user(1)), ShareEntry::bare(user(1))];
        assert_eq!(
            ShareCalculator::compute(user(1), dec!(10), SplitType::Equal, &entries, 2),
            Err(ValidationError::DuplicateParticipant(user(1)))
        );
        assert_eq!(
            ShareCalculator::compute(user(1), dec!(10), SplitType::Equal, &[], 2),
            Err(ValidationError::EmptyParticipants)
        );
        assert_eq!(
            ShareCalculator::compute(user(1), dec!(0), SplitType::Equal, &[ShareEntry::bare(user(1))], 2),
            Err(ValidationError::NonPositiveTotal(dec!(0)))
        );
    }
}
