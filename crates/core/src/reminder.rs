//! Payment reminders.
//!
//! A reminder asks someone who owes money to pay it. `USER` reminders are
//! about the overall balance between two users, `SPLIT` reminders about one
//! expense.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use tally_shared::types::UserId;

use crate::ledger::LedgerError;
use crate::split::{Participant, ValidationError};

/// What a reminder is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReminderType {
    /// The receiver's overall debt to the sender.
    User,
    /// The receiver's share of one expense.
    Split,
}

impl ReminderType {
    /// Returns the string representation stored in the database.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "USER",
            Self::Split => "SPLIT",
        }
    }

    /// Parses a reminder type, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "USER" => Some(Self::User),
            "SPLIT" => Some(Self::Split),
            _ => None,
        }
    }
}

/// Reminder status.
///
/// - Pending → Completed (receiver accepts)
/// - Pending → Cancelled (receiver rejects)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReminderStatus {
    /// Waiting for the receiver.
    Pending,
    /// Accepted by the receiver.
    Completed,
    /// Rejected by the receiver.
    Cancelled,
}

impl ReminderStatus {
    /// Returns the string representation stored in the database.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Parses a status, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_uppercase().as_str() {
            "PENDING" => Some(Self::Pending),
            "COMPLETED" => Some(Self::Completed),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

impl fmt::Display for ReminderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stateless reminder rules.
pub struct ReminderService;

impl ReminderService {
    /// Checks a `USER` reminder and returns what the receiver owes, per currency.
    ///
    /// `receiver_balances` are the receiver's global rows toward the sender,
    /// as (currency, amount). A positive amount means the receiver owes.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Validation` for a self-reminder and
    /// `LedgerError::NotEligible` if the receiver owes nothing.
    pub fn check_user_reminder(
        sender: UserId,
        receiver: UserId,
        receiver_balances: impl IntoIterator<Item = (String, Decimal)>,
    ) -> Result<Vec<(String, Decimal)>, LedgerError> {
        if sender == receiver {
            return Err(ValidationError::SelfCounterparty.into());
        }
        let owed: Vec<(String, Decimal)> = receiver_balances
            .into_iter()
            .filter(|(_, amount)| *amount > Decimal::ZERO)
            .collect();
        if owed.is_empty() {
            return Err(LedgerError::NotEligible(
                "this user doesn't owe you any money".into(),
            ));
        }
        Ok(owed)
    }

    /// Checks a `SPLIT` reminder and returns the receiver's share.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::NotEligible` unless the sender paid the expense,
    /// the expense is live, and the receiver owes a positive share of it.
    pub fn check_split_reminder(
        sender: UserId,
        receiver: UserId,
        payer: UserId,
        participants: &[Participant],
        deleted: bool,
    ) -> Result<Decimal, LedgerError> {
        if sender == receiver {
            return Err(ValidationError::SelfCounterparty.into());
        }
        if deleted {
            return Err(LedgerError::NotEligible("the expense was deleted".into()));
        }
        if payer != sender {
            return Err(LedgerError::NotEligible(
                "only the person who paid can send reminders for this expense".into(),
            ));
        }
        let share = participants
            .iter()
            .find(|p| p.user_id == receiver)
            .map(|p| p.amount)
            .ok_or_else(|| {
                LedgerError::NotEligible("receiver is not a participant in this expense".into())
            })?;
        if share <= Decimal::ZERO {
            return Err(LedgerError::NotEligible(
                "receiver doesn't owe any money in this expense".into(),
            ));
        }
        Ok(share)
    }

    /// Receiver's answer to a pending reminder.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Unauthorized` if `actor` is not the receiver and
    /// `LedgerError::InvalidStateTransition` if the reminder was already answered.
    pub fn respond(
        status: ReminderStatus,
        actor: UserId,
        receiver: UserId,
        accept: bool,
    ) -> Result<ReminderStatus, LedgerError> {
        if actor != receiver {
            return Err(LedgerError::unauthorized(actor.0, "answer this reminder"));
        }
        let to = if accept {
            ReminderStatus::Completed
        } else {
            ReminderStatus::Cancelled
        };
        if status != ReminderStatus::Pending {
            return Err(LedgerError::InvalidStateTransition {
                entity: "reminder",
                from: status.as_str(),
                to: to.as_str(),
            });
        }
        Ok(to)
    }
}
