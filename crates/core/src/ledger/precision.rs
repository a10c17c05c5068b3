//! Per-currency precision policy.
//!
//! Amounts are rounded to the currency's minor unit exactly once, when a split
//! is normalized. Balance arithmetic after that point is exact.

use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashMap;
use tally_shared::LedgerConfig;

use crate::split::Split;

/// Largest scale `rust_decimal` can represent.
const MAX_SCALE: u32 = 28;

/// Resolves the minor-unit exponent of a currency and rounds amounts to it.
#[derive(Debug, Clone)]
pub struct PrecisionPolicy {
    default_minor_units: u32,
    minor_units: HashMap<String, u32>,
}

impl PrecisionPolicy {
    /// Creates a policy from explicit settings. Currency keys are matched
    /// case-insensitively.
    #[must_use]
    pub fn new(default_minor_units: u32, minor_units: HashMap<String, u32>) -> Self {
        Self {
            default_minor_units: default_minor_units.min(MAX_SCALE),
            minor_units: minor_units
                .into_iter()
                .map(|(code, units)| (code.to_uppercase(), units.min(MAX_SCALE)))
                .collect(),
        }
    }

    /// Creates a policy from the `ledger` section of the app config.
    #[must_use]
    pub fn from_config(config: &LedgerConfig) -> Self {
        Self::new(
            config.default_minor_units,
            config.currency_minor_units.clone(),
        )
    }

    /// Minor-unit exponent of `currency`.
    #[must_use]
    pub fn minor_units(&self, currency: &str) -> u32 {
        self.minor_units
            .get(&currency.trim().to_uppercase())
            .copied()
            .unwrap_or(self.default_minor_units)
    }

    /// Rounds `amount` to the currency's minor unit, half to even.
    #[must_use]
    pub fn normalize(&self, currency: &str, amount: Decimal) -> Decimal {
        amount.round_dp_with_strategy(
            self.minor_units(currency),
            RoundingStrategy::MidpointNearestEven,
        )
    }

    /// Returns true if `amount` is already expressible in the currency's minor unit.
    #[must_use]
    pub fn is_normalized(&self, currency: &str, amount: Decimal) -> bool {
        self.normalize(currency, amount) == amount
    }

    /// Canonicalizes the currency code and rounds every participant amount.
    #[must_use]
    pub fn normalize_split(&self, mut split: Split) -> Split {
        split.currency = canonical_currency(&split.currency);
        for participant in &mut split.participants {
            participant.amount = self.normalize(&split.currency, participant.amount);
        }
        split
    }
}

impl Default for PrecisionPolicy {
    fn default() -> Self {
        Self::from_config(&LedgerConfig::default())
    }
}

/// Canonical form of a currency code: trimmed and upper-case.
#[must_use]
pub fn canonical_currency(currency: &str) -> String {
    currency.trim().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::split::Participant;
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use tally_shared::types::UserId;
    use uuid::Uuid;

    #[rstest]
    #[case("USD", 2)]
    #[case("usd", 2)]
    #[case("JPY", 0)]
    #[case("xlm", 7)]
    #[case("ETH", 18)]
    #[case("ZZZ", 2)]
    fn test_minor_units(#[case] currency: &str, #[case] expected: u32) {
        assert_eq!(PrecisionPolicy::default().minor_units(currency), expected);
    }

    #[test]
    fn test_lowercase_config_keys_are_matched() {
        let policy = PrecisionPolicy::new(2, HashMap::from([("jpy".to_string(), 0)]));
        assert_eq!(policy.minor_units("JPY"), 0);
    }

    #[test]
    fn test_exponent_is_clamped() {
        let policy = PrecisionPolicy::new(40, HashMap::new());
        assert_eq!(policy.minor_units("ANY"), MAX_SCALE);
    }

    #[rstest]
    #[case("USD", dec!(10.005), dec!(10.00))]
    #[case("USD", dec!(10.015), dec!(10.02))]
    #[case("USD", dec!(33.333333), dec!(33.33))]
    #[case("JPY", dec!(100.5), dec!(100))]
    #[case("JPY", dec!(101.5), dec!(102))]
    fn test_normalize_half_even(
        #[case] currency: &str,
        #[case] amount: Decimal,
        #[case] expected: Decimal,
    ) {
        assert_eq!(PrecisionPolicy::default().normalize(currency, amount), expected);
    }

    #[test]
    fn test_normalize_split_uppercases_currency() {
        let user = UserId::from_uuid(Uuid::from_u128(1));
        let split = Split::new(
            user,
            " jpy ",
            vec![Participant::new(user, dec!(333.4))],
            None,
        );
        let normalized = PrecisionPolicy::default().normalize_split(split);
        assert_eq!(normalized.currency, "JPY");
        assert_eq!(normalized.participants[0].amount, dec!(333));
    }

    #[test]
    fn test_is_normalized() {
        let policy = PrecisionPolicy::default();
        assert!(policy.is_normalized("USD", dec!(1.25)));
        assert!(!policy.is_normalized("USD", dec!(1.255)));
    }
}
