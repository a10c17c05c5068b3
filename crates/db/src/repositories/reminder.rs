//! Reminder repository.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tally_core::ledger::LedgerError;
use tally_core::reminder::{ReminderService, ReminderStatus, ReminderType};
use tally_core::split::Participant;
use tally_shared::types::{ExpenseId, ReminderId, UserId};
use tracing::info;
use uuid::Uuid;

use super::user::ensure_users_exist;
use crate::entities::sea_orm_active_enums::ReminderStatus as DbReminderStatus;
use crate::entities::{balances, expense_participants, expenses, reminders};
use crate::error::StoreError;

/// Input for sending a reminder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewReminder {
    /// Who is reminded.
    pub receiver_id: UserId,
    /// Overall balance or one expense.
    pub reminder_type: ReminderType,
    /// The expense, for `SPLIT` reminders.
    pub split_id: Option<ExpenseId>,
    /// Free-form message.
    pub content: Option<String>,
}

/// Reminder repository.
#[derive(Debug, Clone)]
pub struct ReminderRepository {
    db: DatabaseConnection,
}

impl ReminderRepository {
    /// Creates a new reminder repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Sends a reminder after checking that the receiver actually owes.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown receiver or expense, `NotEligible`
    /// when nothing is owed, `Validation` for a self-reminder or a `SPLIT`
    /// reminder without an expense, or a database error.
    pub async fn create(
        &self,
        sender: UserId,
        input: NewReminder,
    ) -> Result<reminders::Model, StoreError> {
        ensure_users_exist(&self.db, &[input.receiver_id]).await?;

        let split_id = match input.reminder_type {
            ReminderType::User => {
                self.check_user_reminder(sender, input.receiver_id).await?;
                None
            }
            ReminderType::Split => {
                let expense_id = input.split_id.ok_or_else(|| {
                    LedgerError::NotEligible("a split reminder needs an expense".into())
                })?;
                self.check_split_reminder(sender, input.receiver_id, expense_id)
                    .await?;
                Some(expense_id.0)
            }
        };

        let now = chrono::Utc::now().into();
        let reminder = reminders::ActiveModel {
            id: Set(Uuid::new_v4()),
            sender_id: Set(sender.0),
            receiver_id: Set(input.receiver_id.0),
            reminder_type: Set(input.reminder_type.into()),
            split_id: Set(split_id),
            content: Set(input.content),
            status: Set(DbReminderStatus::Pending),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&self.db)
        .await?;

        info!(
            reminder_id = %reminder.id,
            sender = %sender,
            receiver = %input.receiver_id,
            "reminder sent"
        );
        Ok(reminder)
    }

    /// Pending reminders addressed to the user, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_for_receiver(
        &self,
        user_id: UserId,
    ) -> Result<Vec<reminders::Model>, StoreError> {
        Ok(reminders::Entity::find()
            .filter(reminders::Column::ReceiverId.eq(user_id.0))
            .filter(reminders::Column::Status.eq(DbReminderStatus::Pending))
            .order_by_desc(reminders::Column::CreatedAt)
            .all(&self.db)
            .await?)
    }

    /// Accepts or rejects a pending reminder addressed to `actor`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Unauthorized` for anyone but the receiver,
    /// `InvalidStateTransition` if it was already answered, or a database error.
    pub async fn respond(
        &self,
        actor: UserId,
        reminder_id: ReminderId,
        accept: bool,
    ) -> Result<reminders::Model, StoreError> {
        let txn = self.db.begin().await?;
        let reminder = reminders::Entity::find_by_id(reminder_id.0)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| LedgerError::not_found("reminder", reminder_id.0))?;

        let status = ReminderService::respond(
            ReminderStatus::from(reminder.status),
            actor,
            UserId::from_uuid(reminder.receiver_id),
            accept,
        )?;

        let mut model = reminder.into_active_model();
        model.status = Set(status.into());
        model.updated_at = Set(chrono::Utc::now().into());
        let reminder = model.update(&txn).await?;
        txn.commit().await?;

        info!(reminder_id = %reminder_id, status = %status, "reminder answered");
        Ok(reminder)
    }

    async fn check_user_reminder(
        &self,
        sender: UserId,
        receiver: UserId,
    ) -> Result<(), StoreError> {
        let rows = balances::Entity::find()
            .filter(balances::Column::UserId.eq(receiver.0))
            .filter(balances::Column::FriendId.eq(sender.0))
            .all(&self.db)
            .await?;
        ReminderService::check_user_reminder(
            sender,
            receiver,
            rows.into_iter().map(|r| (r.currency, r.amount)),
        )?;
        Ok(())
    }

    async fn check_split_reminder(
        &self,
        sender: UserId,
        receiver: UserId,
        expense_id: ExpenseId,
    ) -> Result<(), StoreError> {
        let expense = expenses::Entity::find_by_id(expense_id.0)
            .one(&self.db)
            .await?
            .ok_or_else(|| LedgerError::not_found("expense", expense_id.0))?;
        let participants: Vec<Participant> = expense_participants::Entity::find()
            .filter(expense_participants::Column::ExpenseId.eq(expense.id))
            .all(&self.db)
            .await?
            .into_iter()
            .map(|p| Participant::new(UserId::from_uuid(p.user_id), p.amount))
            .collect();

        ReminderService::check_split_reminder(
            sender,
            receiver,
            UserId::from_uuid(expense.paid_by),
            &participants,
            expense.is_deleted(),
        )?;
        Ok(())
    }
}
