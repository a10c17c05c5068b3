//! Structural validation of a split before it reaches the ledger.

use rust_decimal::Decimal;
use std::collections::HashSet;

use super::error::ValidationError;
use super::types::Split;

/// Stateless validator for split input.
pub struct SplitValidator;

impl SplitValidator {
    /// Checks the participant list: currency present, at least one
    /// participant, no duplicate user, no negative amount, and a sum that
    /// fits a decimal.
    ///
    /// # Errors
    ///
    /// Returns the first `ValidationError` found, in the order listed above.
    pub fn validate_participants(split: &Split) -> Result<(), ValidationError> {
        if split.currency.trim().is_empty() {
            return Err(ValidationError::EmptyCurrency);
        }
        if split.participants.is_empty() {
            return Err(ValidationError::EmptyParticipants);
        }

        let mut seen = HashSet::with_capacity(split.participants.len());
        for participant in &split.participants {
            if !seen.insert(participant.user_id) {
                return Err(ValidationError::DuplicateParticipant(participant.user_id));
            }
            if participant.amount < Decimal::ZERO {
                return Err(ValidationError::NegativeAmount(participant.user_id));
            }
        }
        split.participant_total()?;
        Ok(())
    }

    /// Full validation of an expense split against its total.
    ///
    /// On top of [`Self::validate_participants`], the total must be positive
    /// and equal to the sum of every participant row (the payer's own share
    /// included).
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` describing the first problem found.
    pub fn validate(split: &Split, total: Decimal) -> Result<(), ValidationError> {
        Self::validate_participants(split)?;

        if total <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveTotal(total));
        }

        let actual = split.participant_total()?;
        if actual != total {
            return Err(ValidationError::SumMismatch {
                expected: total,
                actual,
            });
        }
        Ok(())
    }
}
