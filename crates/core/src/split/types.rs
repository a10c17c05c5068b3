//! Split domain types.
//!
//! A split is a payer's outlay in one currency, divided among participants.
//! Participant amounts are what each participant owes toward the total; the
//! payer's own row, when present, records their share and never moves a balance.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tally_shared::types::{GroupId, UserId};

use super::allocation::AllocationUtil;
use super::error::ValidationError;

/// How the total of an expense is divided among its participants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SplitType {
    /// Total divided evenly.
    Equal,
    /// Each participant owes a percentage of the total.
    Percentage,
    /// Each participant owes an explicit amount.
    Exact,
    /// Each participant owes in proportion to a weight.
    Share,
    /// Even split of the total after per-participant adjustments.
    Adjustment,
    /// Manual settlement: the payer pays a single counterparty in full.
    Settlement,
}

impl SplitType {
    /// Returns the string representation stored in the database.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Equal => "EQUAL",
            Self::Percentage => "PERCENTAGE",
            Self::Exact => "EXACT",
            Self::Share => "SHARE",
            Self::Adjustment => "ADJUSTMENT",
            Self::Settlement => "SETTLEMENT",
        }
    }

    /// Parses a split type, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "EQUAL" => Some(Self::Equal),
            "PERCENTAGE" => Some(Self::Percentage),
            "EXACT" => Some(Self::Exact),
            "SHARE" => Some(Self::Share),
            "ADJUSTMENT" => Some(Self::Adjustment),
            "SETTLEMENT" => Some(Self::Settlement),
            _ => None,
        }
    }

    /// Returns true if each participant must supply a value.
    #[must_use]
    pub fn requires_values(&self) -> bool {
        !matches!(self, Self::Equal | Self::Settlement)
    }
}

impl fmt::Display for SplitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether an amount is denominated in a fiat currency or an on-chain token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CurrencyType {
    /// ISO 4217 currency.
    #[default]
    Fiat,
    /// Token symbol on some chain.
    Token,
}

impl CurrencyType {
    /// Returns the string representation stored in the database.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fiat => "FIAT",
            Self::Token => "TOKEN",
        }
    }

    /// Parses a currency type, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "FIAT" => Some(Self::Fiat),
            "TOKEN" => Some(Self::Token),
            _ => None,
        }
    }
}

/// What one participant owes toward a split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// The participant.
    pub user_id: UserId,
    /// Portion of the total this participant owes.
    pub amount: Decimal,
}

impl Participant {
    /// Creates a participant row.
    #[must_use]
    pub const fn new(user_id: UserId, amount: Decimal) -> Self {
        Self { user_id, amount }
    }
}

/// A payer's outlay in one currency, divided among participants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Split {
    /// User who advanced the money.
    pub payer: UserId,
    /// Currency code or token symbol. Every ledger row is single-currency.
    pub currency: String,
    /// Who owes what.
    pub participants: Vec<Participant>,
    /// Group scope; when present the group ledger moves as well.
    pub group_id: Option<GroupId>,
}

impl Split {
    /// Creates a split.
    #[must_use]
    pub fn new(
        payer: UserId,
        currency: impl Into<String>,
        participants: Vec<Participant>,
        group_id: Option<GroupId>,
    ) -> Self {
        Self {
            payer,
            currency: currency.into(),
            participants,
            group_id,
        }
    }

    /// Participants other than the payer, in listing order.
    pub fn debtors(&self) -> impl Iterator<Item = &Participant> {
        self.participants
            .iter()
            .filter(move |p| p.user_id != self.payer)
    }

    /// Ids of every participant other than the payer.
    #[must_use]
    pub fn counterparties(&self) -> Vec<UserId> {
        self.debtors().map(|p| p.user_id).collect()
    }

    /// Total advanced by the payer on other participants' behalf.
    ///
    /// # Errors
    ///
    /// Returns `AmountOutOfRange` if the amounts overflow.
    pub fn owed_total(&self) -> Result<Decimal, ValidationError> {
        AllocationUtil::checked_sum(self.debtors().map(|p| p.amount))
    }

    /// Sum of every participant row, the payer's own share included.
    ///
    /// # Errors
    ///
    /// Returns `AmountOutOfRange` if the amounts overflow.
    pub fn participant_total(&self) -> Result<Decimal, ValidationError> {
        AllocationUtil::checked_sum(self.participants.iter().map(|p| p.amount))
    }

    /// Returns true if `user_id` is the payer or listed as a participant.
    #[must_use]
    pub fn involves(&self, user_id: UserId) -> bool {
        self.payer == user_id || self.participants.iter().any(|p| p.user_id == user_id)
    }
}

/// Raw per-participant input to a share calculation.
///
/// The meaning of `value` depends on the [`SplitType`]: an amount for
/// `Exact`, a percentage for `Percentage`, a weight for `Share`, and a signed
/// adjustment for `Adjustment`. `Equal` and `Settlement` ignore it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareEntry {
    /// The participant.
    pub user_id: UserId,
    /// Split-type specific value.
    pub value: Option<Decimal>,
}

impl ShareEntry {
    /// Entry without a value.
    #[must_use]
    pub const fn bare(user_id: UserId) -> Self {
        Self {
            user_id,
            value: None,
        }
    }

    /// Entry carrying a value.
    #[must_use]
    pub const fn with_value(user_id: UserId, value: Decimal) -> Self {
        Self {
            user_id,
            value: Some(value),
        }
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
    fn test_split_type_round_trip() {
        for split_type in [
            SplitType::Equal,
            SplitType::Percentage,
            SplitType::Exact,
            SplitType::Share,
            SplitType::Adjustment,
            SplitType::Settlement,
        ] {
            assert_eq!(SplitType::parse(split_type.as_str()), Some(split_type));
        }
        assert_eq!(SplitType::parse("equal"), Some(SplitType::Equal));
        assert_eq!(SplitType::parse("ratio"), None);
    }

    #[test]
    fn test_debtors_skip_payer() {
        let split = Split::new(
            user(1),
            "USD",
            vec![
                Participant::new(user(1), dec!(50)),
                Participant::new(user(2), dec!(50)),
            ],
            None,
        );
        assert_eq!(split.counterparties(), vec![user(2)]);
        assert_eq!(split.owed_total(), Ok(dec!(50)));
        assert_eq!(split.participant_total(), Ok(dec!(100)));
        assert!(split.involves(user(1)));
        assert!(!split.involves(user(3)));
    }

    #[test]
    fn test_totals_report_overflow() {
        let split = Split::new(
            user(1),
            "USD",
            vec![
                Participant::new(user(2), Decimal::MAX),
                Participant::new(user(3), Decimal::MAX),
            ],
            None,
        );
        assert_eq!(split.owed_total(), Err(ValidationError::AmountOutOfRange));
        assert_eq!(split.participant_total(), Err(ValidationError::AmountOutOfRange));
    }

    #[test]
    fn test_currency_type_parse() {
        assert_eq!(CurrencyType::parse("token"), Some(CurrencyType::Token));
        assert_eq!(CurrencyType::default(), CurrencyType::Fiat);
        assert_eq!(CurrencyType::parse("nft"), None);
    }
}
