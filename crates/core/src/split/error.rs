//! Validation errors for split input.
//!
//! Every variant is raised before any ledger mutation is planned, so a
//! rejected split never writes anything.

use rust_decimal::Decimal;
use tally_shared::types::UserId;
use thiserror::Error;

use super::types::SplitType;

/// Malformed split input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    // ========== Shape ==========
    /// Currency code is blank.
    #[error("Currency is required")]
    EmptyCurrency,

    /// No participants were supplied.
    #[error("At least one participant is required")]
    EmptyParticipants,

    /// A user appears more than once.
    #[error("Participant {0} is listed more than once")]
    DuplicateParticipant(UserId),

    // ========== Amounts ==========
    /// A participant owes a negative amount.
    #[error("Participant {0} has a negative amount")]
    NegativeAmount(UserId),

    /// Total must be greater than zero.
    #[error("Total must be positive, got {0}")]
    NonPositiveTotal(Decimal),

    /// Participant amounts do not add up to the total.
    #[error("Participant amounts sum to {actual}, expected {expected}")]
    SumMismatch {
        /// The expense total.
        expected: Decimal,
        /// Sum of participant amounts.
        actual: Decimal,
    },

    /// An amount, or a sum or product of amounts, does not fit a decimal.
    #[error("Amount is out of range")]
    AmountOutOfRange,

    // ========== Split-type input ==========
    /// A split type that needs per-participant values got none for this user.
    #[error("{split_type} split requires a value for participant {user_id}")]
    MissingSplitValue {
        /// The participant missing a value.
        user_id: UserId,
        /// The split type in use.
        split_type: SplitType,
    },

    /// Percentages are negative or do not sum to 100.
    #[error("Percentages must be non-negative and sum to 100, got {0}")]
    InvalidPercentages(Decimal),

    /// Share weights are negative or all zero.
    #[error("Share weights must be non-negative with a positive total")]
    InvalidShares,

    /// Adjustments exceed the total or drive a participant below zero.
    #[error("Adjustments leave a negative amount")]
    InvalidAdjustments,

    /// A settlement split must name the payer at zero and exactly one payee.
    #[error("Settlement must have exactly the payer and one counterparty")]
    InvalidSettlementSplit,

    /// A user cannot settle with or remind themselves.
    #[error("A user cannot settle with themselves")]
    SelfCounterparty,
}

impl ValidationError {
    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::EmptyCurrency => "EMPTY_CURRENCY",
            Self::EmptyParticipants => "EMPTY_PARTICIPANTS",
            Self::DuplicateParticipant(_) => "DUPLICATE_PARTICIPANT",
            Self::NegativeAmount(_) => "NEGATIVE_AMOUNT",
            Self::NonPositiveTotal(_) => "NON_POSITIVE_TOTAL",
            Self::SumMismatch { .. } => "SUM_MISMATCH",
            Self::AmountOutOfRange => "AMOUNT_OUT_OF_RANGE",
            Self::MissingSplitValue { .. } => "MISSING_SPLIT_VALUE",
            Self::InvalidPercentages(_) => "INVALID_PERCENTAGES",
            Self::InvalidShares => "INVALID_SHARES",
            Self::InvalidAdjustments => "INVALID_ADJUSTMENTS",
            Self::InvalidSettlementSplit => "INVALID_SETTLEMENT_SPLIT",
            Self::SelfCounterparty => "SELF_COUNTERPARTY",
        }
    }
}
