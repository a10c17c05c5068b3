//! Ledger error types.
//!
//! Every failure of a ledger operation surfaces as one of these. Only
//! `TransactionFailure` is retryable: the store rolled everything back and
//! nothing was applied.

use tally_shared::AppError;
use thiserror::Error;
use uuid::Uuid;

use crate::split::ValidationError;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Lookup ==========
    /// Referenced expense, settlement, group, reminder, or user does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of record.
        entity: &'static str,
        /// The id that was looked up.
        id: Uuid,
    },

    // ========== Permission ==========
    /// Actor may not perform this mutation.
    #[error("User {actor} is not allowed to {action}")]
    Unauthorized {
        /// The acting user.
        actor: Uuid,
        /// What they tried to do.
        action: &'static str,
    },

    // ========== Input ==========
    /// Malformed split input; nothing was written.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    // ========== State ==========
    /// A status transition that the lifecycle does not allow.
    #[error("Cannot move {entity} from {from} to {to}")]
    InvalidStateTransition {
        /// Kind of record.
        entity: &'static str,
        /// Current status.
        from: &'static str,
        /// Requested status.
        to: &'static str,
    },

    /// Operation needs every balance in scope to be settled first.
    #[error("Outstanding balances remain: {0}")]
    OutstandingBalance(String),

    /// A business precondition (such as "the receiver owes you money") failed.
    #[error("Not eligible: {0}")]
    NotEligible(String),

    // ========== Settlement ==========
    /// Verified payment details do not match the stored settlement items.
    #[error("Payment confirmation for settlement {settlement_id} does not match: {reason}")]
    ExternalConfirmationMismatch {
        /// The settlement being confirmed.
        settlement_id: Uuid,
        /// First mismatch found.
        reason: String,
    },

    // ========== Store ==========
    /// The store aborted the transaction; everything was rolled back.
    #[error("Ledger transaction failed: {0}")]
    TransactionFailure(String),
}

impl LedgerError {
    /// Shorthand for [`LedgerError::NotFound`].
    #[must_use]
    pub const fn not_found(entity: &'static str, id: Uuid) -> Self {
        Self::NotFound { entity, id }
    }

    /// Shorthand for [`LedgerError::Unauthorized`].
    #[must_use]
    pub const fn unauthorized(actor: Uuid, action: &'static str) -> Self {
        Self::Unauthorized { actor, action }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Unauthorized { .. } => "UNAUTHORIZED_ACTOR",
            Self::Validation(inner) => inner.error_code(),
            Self::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            Self::OutstandingBalance(_) => "OUTSTANDING_BALANCE",
            Self::NotEligible(_) => "NOT_ELIGIBLE",
            Self::ExternalConfirmationMismatch { .. } => "EXTERNAL_CONFIRMATION_MISMATCH",
            Self::TransactionFailure(_) => "TRANSACTION_FAILED",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Unauthorized { .. } => 403,
            Self::NotFound { .. } => 404,
            Self::InvalidStateTransition { .. } | Self::OutstandingBalance(_) => 409,
            Self::NotEligible(_) | Self::ExternalConfirmationMismatch { .. } => 422,
            Self::TransactionFailure(_) => 503,
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransactionFailure(_))
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err {
            LedgerError::NotFound { .. } => Self::NotFound(message),
            LedgerError::Unauthorized { .. } => Self::Forbidden(message),
            LedgerError::Validation(_) => Self::Validation(message),
            LedgerError::InvalidStateTransition { .. } | LedgerError::OutstandingBalance(_) => {
                Self::Conflict(message)
            }
            LedgerError::NotEligible(_) | LedgerError::ExternalConfirmationMismatch { .. } => {
                Self::BusinessRule(message)
            }
            LedgerError::TransactionFailure(_) => Self::TransactionFailed(message),
        }
    }
}
