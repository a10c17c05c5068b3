//! Settlement domain types.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tally_shared::types::{GroupId, UserId};

use crate::ledger::{LedgerError, MutationPlan};

/// Settlement transaction status.
///
/// The valid transitions are:
/// - Pending → Completed (payment verified and matched)
/// - Pending → Failed (payment failed or did not match)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SettlementStatus {
    /// Created, waiting for the external payment.
    Pending,
    /// Payment verified; the ledger was settled.
    Completed,
    /// Payment failed or did not match; the ledger was not touched.
    Failed,
}

impl SettlementStatus {
    /// Returns the string representation stored in the database.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        }
    }

    /// Parses a status, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "COMPLETED" => Some(Self::Completed),
            "FAILED" => Some(Self::Failed),
            _ => None,
        }
    }

    /// Returns true once no further transition is possible.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Validates a transition to `to`.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::InvalidStateTransition` unless moving out of `Pending`.
    pub fn transition(self, to: Self) -> Result<Self, LedgerError> {
        match (self, to) {
            (Self::Pending, Self::Completed | Self::Failed) => Ok(to),
            _ => Err(LedgerError::InvalidStateTransition {
                entity: "settlement",
                from: self.as_str(),
                to: to.as_str(),
            }),
        }
    }
}

impl fmt::Display for SettlementStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One counterparty paid by a settlement, before it is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementItemDraft {
    /// Who receives the payment.
    pub friend_id: UserId,
    /// Debt being settled, in the ledger currency.
    pub original_amount: Decimal,
    /// Ledger currency of the debt.
    pub original_currency: String,
    /// Amount transferred, in the settlement asset.
    pub settlement_amount: Decimal,
}

/// Input to create a settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSettlement {
    /// Counterparties paid.
    pub items: Vec<SettlementItemDraft>,
    /// Asset the payment is made in.
    pub settlement_currency: String,
    /// Chain the payment runs on, if on-chain.
    pub chain_id: Option<String>,
    /// Token used on that chain, if any.
    pub token_id: Option<String>,
    /// Group whose balances are settled, if any.
    pub group_id: Option<GroupId>,
}

/// A transfer reported by the payment subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// Who received funds.
    pub recipient: UserId,
    /// Amount received, in the settlement asset.
    pub amount: Decimal,
}

/// Verified result of an external payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    /// Whether the payment went through.
    pub success: bool,
    /// Chain transaction hash or payment reference.
    pub transaction_hash: Option<String>,
    /// Transfers actually made.
    #[serde(default)]
    pub transfers: Vec<Transfer>,
}

/// What confirming a settlement should do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationOutcome {
    /// Mark completed and commit `plan` in the same transaction.
    Settle {
        /// Settle mutations for every item.
        plan: MutationPlan,
    },
    /// The payment failed; mark failed, leave the ledger alone.
    Fail,
    /// The payment does not match the items; mark failed and report.
    Mismatch {
        /// First mismatch found.
        reason: String,
    },
    /// Replay of a confirmation that already completed; do nothing.
    AlreadyCompleted,
}

impl ConfirmationOutcome {
    /// Status the settlement ends in.
    #[must_use]
    pub fn status(&self) -> SettlementStatus {
        match self {
            Self::Settle { .. } | Self::AlreadyCompleted => SettlementStatus::Completed,
            Self::Fail | Self::Mismatch { .. } => SettlementStatus::Failed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pending_transitions() {
        assert_eq!(
            SettlementStatus::Pending.transition(SettlementStatus::Completed).unwrap(),
            SettlementStatus::Completed
        );
        assert_eq!(
            SettlementStatus::Pending.transition(SettlementStatus::Failed).unwrap(),
            SettlementStatus::Failed
        );
    }

    #[test]
    fn test_terminal_states_reject_transitions() {
        for from in [SettlementStatus::Completed, SettlementStatus::Failed] {
            assert!(from.is_terminal());
            for to in [
                SettlementStatus::Pending,
                SettlementStatus::Completed,
                SettlementStatus::Failed,
            ] {
                assert!(matches!(
                    from.transition(to),
                    Err(LedgerError::InvalidStateTransition { .. })
                ));
            }
        }
    }

    #[test]
    fn test_parse() {
        assert_eq!(SettlementStatus::parse("completed"), Some(SettlementStatus::Completed));
        assert_eq!(SettlementStatus::parse("DONE"), None);
        assert_eq!(SettlementStatus::Failed.to_string(), "FAILED");
    }
}
