//! Who may mutate what.
//!
//! The HTTP layer authenticates the actor; these checks run again against
//! stored data before any ledger mutation is planned.

use std::collections::HashSet;
use tally_shared::types::UserId;

use super::error::LedgerError;

/// Stateless authorization checks for ledger mutations.
pub struct AccessPolicy;

impl AccessPolicy {
    /// Actor must be the payer, the adder, or a participant of the expense.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Unauthorized` otherwise.
    pub fn ensure_can_modify(
        actor: UserId,
        payer: UserId,
        added_by: UserId,
        participants: &[UserId],
    ) -> Result<(), LedgerError> {
        if actor == payer || actor == added_by || participants.contains(&actor) {
            Ok(())
        } else {
            Err(LedgerError::unauthorized(actor.0, "modify this expense"))
        }
    }

    /// Actor and every involved user must belong to the group.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Unauthorized` if the actor is not a member and
    /// `LedgerError::NotEligible` if any other involved user is not.
    pub fn ensure_members(
        actor: UserId,
        involved: impl IntoIterator<Item = UserId>,
        members: &HashSet<UserId>,
    ) -> Result<(), LedgerError> {
        if !members.contains(&actor) {
            return Err(LedgerError::unauthorized(actor.0, "act in this group"));
        }
        for user_id in involved {
            if !members.contains(&user_id) {
                return Err(LedgerError::NotEligible(format!(
                    "user {user_id} is not a member of the group"
                )));
            }
        }
        Ok(())
    }

    /// Only the group creator may perform `action`.
    ///
    /// # Errors
    ///
    /// Returns `LedgerError::Unauthorized` if `actor` is not the creator.
    pub fn ensure_creator(
        actor: UserId,
        created_by: UserId,
        action: &'static str,
    ) -> Result<(), LedgerError> {
        if actor == created_by {
            Ok(())
        } else {
            Err(LedgerError::unauthorized(actor.0, action))
        }
    }
}
