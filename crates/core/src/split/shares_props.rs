//! Property-based tests for share calculation.
//!
//! - Computed amounts always sum exactly to the total
//! - No amount is negative or finer than the currency's minor unit

use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_shared::types::UserId;
use uuid::Uuid;

use super::shares::ShareCalculator;
use super::types::{ShareEntry, Split, SplitType};
use super::validation::SplitValidator;

/// Strategy for totals from 0.01 to 100,000.00.
fn positive_total() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

/// Strategy for share weights 0..=20, at least one positive.
fn weights() -> impl Strategy<Value = Vec<Decimal>> {
    prop::collection::vec(0i64..=20, 1..8)
        .prop_filter("needs a positive weight", |w| w.iter().any(|x| *x > 0))
        .prop_map(|w| w.into_iter().map(Decimal::from).collect())
}

fn user(n: usize) -> UserId {
    UserId::from_uuid(Uuid::from_u128(n as u128 + 1))
}

fn assert_well_formed(amounts: &[Decimal], total: Decimal, minor_units: u32) {
    assert_eq!(amounts.iter().copied().sum::<Decimal>(), total);
    for amount in amounts {
        assert!(*amount >= Decimal::ZERO);
        assert!(amount.scale() <= minor_units);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Equal splits sum to the total for any participant count.
    #[test]
    fn prop_equal_split_conserves_total(total in positive_total(), count in 1usize..12) {
        let entries: Vec<ShareEntry> = (0..count).map(|i| ShareEntry::bare(user(i))).collect();
        let participants =
            ShareCalculator::compute(user(0), total, SplitType::Equal, &entries, 2).unwrap();

        let amounts: Vec<Decimal> = participants.iter().map(|p| p.amount).collect();
        assert_well_formed(&amounts, total, 2);

        // portions differ by at most one minor unit
        let max = amounts.iter().max().copied().unwrap();
        let min = amounts.iter().min().copied().unwrap();
        prop_assert!(max - min <= Decimal::new(1, 2));
    }

    /// Weighted splits sum to the total and pass full split validation.
    #[test]
    fn prop_share_split_conserves_total(total in positive_total(), weights in weights()) {
        let entries: Vec<ShareEntry> = weights
            .iter()
            .enumerate()
            .map(|(i, w)| ShareEntry::with_value(user(i), *w))
            .collect();
        let participants =
            ShareCalculator::compute(user(0), total, SplitType::Share, &entries, 2).unwrap();

        let amounts: Vec<Decimal> = participants.iter().map(|p| p.amount).collect();
        assert_well_formed(&amounts, total, 2);

        let split = Split::new(user(0), "USD", participants, None);
        prop_assert!(SplitValidator::validate(&split, total).is_ok());
    }

    /// Zero-decimal currencies never produce fractional amounts.
    #[test]
    fn prop_zero_minor_units(units in 1i64..1_000_000, count in 1usize..7) {
        let total = Decimal::from(units);
        let entries: Vec<ShareEntry> = (0..count).map(|i| ShareEntry::bare(user(i))).collect();
        let participants =
            ShareCalculator::compute(user(0), total, SplitType::Equal, &entries, 0).unwrap();

        let amounts: Vec<Decimal> = participants.iter().map(|p| p.amount).collect();
        assert_well_formed(&amounts, total, 0);
    }
}
