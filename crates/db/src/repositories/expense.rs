//! Expense repository: the write path that moves balances.
//!
//! Create, edit, and delete each commit the expense rows and the ledger plan
//! in one transaction. Edit and delete lock the expense row first so two
//! concurrent edits cannot both reverse the same stored split.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, EntityTrait, IntoActiveModel, QueryFilter, QueryOrder, QuerySelect, Set,
    TransactionTrait, sea_query::Query,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tally_core::ledger::{AccessPolicy, LedgerError, LedgerService, PrecisionPolicy};
use tally_core::split::{CurrencyType, Participant, ShareEntry, Split, SplitType};
use tally_shared::types::{ExpenseId, GroupId, UserId};
use tracing::info;
use uuid::Uuid;

use super::group::{find_group, member_ids};
use super::ledger::LedgerWriter;
use super::user::ensure_users_exist;
use crate::entities::{expense_participants, expenses};
use crate::error::{StoreError, is_unique_violation};

/// Input for creating an expense.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewExpense {
    /// Short description.
    pub name: String,
    /// Optional category label.
    pub category: Option<String>,
    /// Total paid.
    pub amount: Decimal,
    /// Who paid.
    pub paid_by: UserId,
    /// How the total is divided.
    pub split_type: SplitType,
    /// Currency code or token symbol.
    pub currency: String,
    /// Fiat or token.
    #[serde(default)]
    pub currency_type: CurrencyType,
    /// Token id for token-denominated expenses.
    pub token_id: Option<String>,
    /// Chain id for token-denominated expenses.
    pub chain_id: Option<String>,
    /// Group scope.
    pub group_id: Option<GroupId>,
    /// When the money was spent; defaults to now.
    pub expense_date: Option<DateTime<Utc>>,
    /// Reference to an attached receipt.
    pub file_key: Option<String>,
    /// Who takes part, with split-type specific values.
    pub participants: Vec<ShareEntry>,
    /// Client key making a retried create return the first result.
    pub idempotency_key: Option<String>,
}

/// Input for editing an expense. The group scope cannot change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpenseUpdate {
    /// Short description.
    pub name: String,
    /// Optional category label.
    pub category: Option<String>,
    /// Total paid.
    pub amount: Decimal,
    /// Who paid.
    pub paid_by: UserId,
    /// How the total is divided.
    pub split_type: SplitType,
    /// Currency code or token symbol.
    pub currency: String,
    /// Fiat or token.
    #[serde(default)]
    pub currency_type: CurrencyType,
    /// Token id for token-denominated expenses.
    pub token_id: Option<String>,
    /// Chain id for token-denominated expenses.
    pub chain_id: Option<String>,
    /// When the money was spent; unchanged when absent.
    pub expense_date: Option<DateTime<Utc>>,
    /// Reference to an attached receipt.
    pub file_key: Option<String>,
    /// Who takes part, with split-type specific values.
    pub participants: Vec<ShareEntry>,
}

/// An expense with its participant rows.
#[derive(Debug, Clone, Serialize)]
pub struct ExpenseWithParticipants {
    /// The expense row.
    pub expense: expenses::Model,
    /// What each participant owes.
    pub participants: Vec<expense_participants::Model>,
}

impl ExpenseWithParticipants {
    /// The stored split, exactly as it was applied to the ledger.
    #[must_use]
    pub fn split(&self) -> Split {
        stored_split(&self.expense, &self.participants)
    }
}

/// Expense repository.
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    db: DatabaseConnection,
    precision: PrecisionPolicy,
}

impl ExpenseRepository {
    /// Creates a new expense repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, precision: PrecisionPolicy) -> Self {
        Self { db, precision }
    }

    /// Records an expense and applies its split to the ledger.
    ///
    /// A repeated call with the same `(actor, idempotency_key)` returns the
    /// expense committed by the first call without touching the ledger again.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for a malformed split, `Unauthorized` if the actor
    /// may not add it, `NotEligible` if a participant is outside the group,
    /// `NotFound` for unknown users or group, or a database error.
    pub async fn create_expense(
        &self,
        actor: UserId,
        input: NewExpense,
    ) -> Result<ExpenseWithParticipants, StoreError> {
        if let Some(key) = input.idempotency_key.as_deref()
            && let Some(existing) = self.find_idempotent(actor, key).await?
        {
            info!(expense_id = %existing.expense.id, "idempotent replay of create");
            return Ok(existing);
        }

        let (split, total) = LedgerService::prepare_split(
            input.paid_by,
            &input.currency,
            input.amount,
            input.split_type,
            &input.participants,
            input.group_id,
            &self.precision,
        )?;
        authorize_split(&self.db, actor, &split).await?;
        let plan = LedgerService::apply(&split)?;

        let now = Utc::now();
        let model = expenses::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(input.name.trim().to_string()),
            category: Set(input.category),
            amount: Set(total),
            paid_by: Set(split.payer.0),
            added_by: Set(actor.0),
            group_id: Set(split.group_id.map(|g| g.0)),
            split_type: Set(input.split_type.into()),
            currency: Set(split.currency.clone()),
            currency_type: Set(input.currency_type.into()),
            token_id: Set(input.token_id),
            chain_id: Set(input.chain_id),
            expense_date: Set(input.expense_date.unwrap_or(now).into()),
            file_key: Set(input.file_key),
            idempotency_key: Set(input.idempotency_key.clone()),
            updated_by: Set(None),
            deleted_at: Set(None),
            deleted_by: Set(None),
            created_at: Set(now.into()),
            updated_at: Set(now.into()),
        };

        let txn = self.db.begin().await?;
        let expense = match model.insert(&txn).await {
            Ok(expense) => expense,
            Err(e) if is_unique_violation(&e) => {
                // A concurrent retry with the same key committed first.
                drop(txn);
                if let Some(key) = input.idempotency_key.as_deref()
                    && let Some(existing) = self.find_idempotent(actor, key).await?
                {
                    return Ok(existing);
                }
                return Err(e.into());
            }
            Err(e) => return Err(e.into()),
        };
        let participants = insert_participants(&txn, expense.id, &split.participants).await?;
        LedgerWriter::apply(&txn, &plan).await?;
        txn.commit().await?;

        LedgerWriter::reconcile_best_effort(&self.db, &plan).await;
        info!(
            expense_id = %expense.id,
            paid_by = %split.payer,
            currency = %split.currency,
            amount = %total,
            "expense created"
        );

        Ok(ExpenseWithParticipants {
            expense,
            participants,
        })
    }

    /// Replaces an expense's split, reversing the old one and applying the new.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing or deleted expense, `Unauthorized`
    /// unless the actor is the payer, the adder, or a participant, and the
    /// create-path errors for the new split.
    pub async fn edit_expense(
        &self,
        actor: UserId,
        expense_id: ExpenseId,
        update: ExpenseUpdate,
    ) -> Result<ExpenseWithParticipants, StoreError> {
        let txn = self.db.begin().await?;
        let current = lock_live_expense(&txn, expense_id).await?;
        authorize_modify(actor, &current)?;

        let old = current.split();
        let (new, total) = LedgerService::prepare_split(
            update.paid_by,
            &update.currency,
            update.amount,
            update.split_type,
            &update.participants,
            old.group_id,
            &self.precision,
        )?;
        authorize_split(&txn, actor, &new).await?;
        let plan = LedgerService::edit(&old, &new)?;

        let now = Utc::now();
        let mut model = current.expense.into_active_model();
        model.name = Set(update.name.trim().to_string());
        model.category = Set(update.category);
        model.amount = Set(total);
        model.paid_by = Set(new.payer.0);
        model.split_type = Set(update.split_type.into());
        model.currency = Set(new.currency.clone());
        model.currency_type = Set(update.currency_type.into());
        model.token_id = Set(update.token_id);
        model.chain_id = Set(update.chain_id);
        if let Some(date) = update.expense_date {
            model.expense_date = Set(date.into());
        }
        model.file_key = Set(update.file_key);
        model.updated_by = Set(Some(actor.0));
        model.updated_at = Set(now.into());
        let expense = model.update(&txn).await?;

        expense_participants::Entity::delete_many()
            .filter(expense_participants::Column::ExpenseId.eq(expense.id))
            .exec(&txn)
            .await?;
        let participants = insert_participants(&txn, expense.id, &new.participants).await?;
        LedgerWriter::apply(&txn, &plan).await?;
        txn.commit().await?;

        LedgerWriter::reconcile_best_effort(&self.db, &plan).await;
        info!(expense_id = %expense.id, updated_by = %actor, "expense edited");

        Ok(ExpenseWithParticipants {
            expense,
            participants,
        })
    }

    /// Soft-deletes an expense and reverses its split.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for a missing or already deleted expense and
    /// `Unauthorized` unless the actor is the payer, the adder, or a participant.
    pub async fn delete_expense(
        &self,
        actor: UserId,
        expense_id: ExpenseId,
    ) -> Result<(), StoreError> {
        let txn = self.db.begin().await?;
        let current = lock_live_expense(&txn, expense_id).await?;
        authorize_modify(actor, &current)?;

        let plan = LedgerService::reverse(&current.split())?;

        let now = Utc::now();
        let mut model = current.expense.into_active_model();
        model.deleted_at = Set(Some(now.into()));
        model.deleted_by = Set(Some(actor.0));
        model.updated_at = Set(now.into());
        model.update(&txn).await?;

        LedgerWriter::apply(&txn, &plan).await?;
        txn.commit().await?;

        LedgerWriter::reconcile_best_effort(&self.db, &plan).await;
        info!(expense_id = %expense_id, deleted_by = %actor, "expense deleted");
        Ok(())
    }

    /// Records that `actor` paid `friend` outside the app, as a
    /// `SETTLEMENT` expense.
    ///
    /// # Errors
    ///
    /// Same as [`Self::create_expense`].
    pub async fn mark_as_paid(
        &self,
        actor: UserId,
        friend: UserId,
        amount: Decimal,
        currency: &str,
        group_id: Option<GroupId>,
    ) -> Result<ExpenseWithParticipants, StoreError> {
        let input = NewExpense {
            name: "Payment".to_string(),
            category: None,
            amount,
            paid_by: actor,
            split_type: SplitType::Settlement,
            currency: currency.to_string(),
            currency_type: CurrencyType::Fiat,
            token_id: None,
            chain_id: None,
            group_id,
            expense_date: None,
            file_key: None,
            participants: vec![ShareEntry::bare(actor), ShareEntry::bare(friend)],
            idempotency_key: None,
        };
        self.create_expense(actor, input).await
    }

    /// Finds an expense visible to `actor`: they take part in it or belong
    /// to its group.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `Unauthorized`.
    pub async fn find_by_id(
        &self,
        actor: UserId,
        expense_id: ExpenseId,
    ) -> Result<ExpenseWithParticipants, StoreError> {
        let expense = expenses::Entity::find_by_id(expense_id.0)
            .one(&self.db)
            .await?
            .ok_or_else(|| LedgerError::not_found("expense", expense_id.0))?;
        let participants = load_participants(&self.db, &[expense.id])
            .await?
            .remove(&expense.id)
            .unwrap_or_default();
        let found = ExpenseWithParticipants {
            expense,
            participants,
        };

        if authorize_modify(actor, &found).is_err() {
            let group_id = found
                .expense
                .group_id
                .ok_or_else(|| LedgerError::unauthorized(actor.0, "view this expense"))?;
            let members = member_ids(&self.db, GroupId::from_uuid(group_id)).await?;
            AccessPolicy::ensure_members(actor, [], &members)?;
        }
        Ok(found)
    }

    /// Live expenses of a group, newest first.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown group and `Unauthorized` for a
    /// non-member.
    pub async fn list_for_group(
        &self,
        actor: UserId,
        group_id: GroupId,
    ) -> Result<Vec<ExpenseWithParticipants>, StoreError> {
        find_group(&self.db, group_id).await?;
        let members = member_ids(&self.db, group_id).await?;
        AccessPolicy::ensure_members(actor, [], &members)?;

        let rows = expenses::Entity::find()
            .filter(expenses::Column::GroupId.eq(group_id.0))
            .filter(expenses::Column::DeletedAt.is_null())
            .order_by_desc(expenses::Column::CreatedAt)
            .all(&self.db)
            .await?;
        self.with_participants(rows).await
    }

    /// Live expenses shared between `actor` and `friend`: one paid and the
    /// other takes part. Newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_with_friend(
        &self,
        actor: UserId,
        friend: UserId,
    ) -> Result<Vec<ExpenseWithParticipants>, StoreError> {
        let paid_for = |payer: UserId, participant: UserId| {
            Condition::all()
                .add(expenses::Column::PaidBy.eq(payer.0))
                .add(
                    expenses::Column::Id.in_subquery(
                        Query::select()
                            .column(expense_participants::Column::ExpenseId)
                            .from(expense_participants::Entity)
                            .and_where(expense_participants::Column::UserId.eq(participant.0))
                            .to_owned(),
                    ),
                )
        };

        let rows = expenses::Entity::find()
            .filter(expenses::Column::DeletedAt.is_null())
            .filter(
                Condition::any()
                    .add(paid_for(actor, friend))
                    .add(paid_for(friend, actor)),
            )
            .order_by_desc(expenses::Column::CreatedAt)
            .all(&self.db)
            .await?;
        self.with_participants(rows).await
    }

    async fn with_participants(
        &self,
        rows: Vec<expenses::Model>,
    ) -> Result<Vec<ExpenseWithParticipants>, StoreError> {
        let ids: Vec<Uuid> = rows.iter().map(|e| e.id).collect();
        let mut by_expense = load_participants(&self.db, &ids).await?;
        Ok(rows
            .into_iter()
            .map(|expense| {
                let participants = by_expense.remove(&expense.id).unwrap_or_default();
                ExpenseWithParticipants {
                    expense,
                    participants,
                }
            })
            .collect())
    }

    async fn find_idempotent(
        &self,
        actor: UserId,
        key: &str,
    ) -> Result<Option<ExpenseWithParticipants>, StoreError> {
        let Some(expense) = expenses::Entity::find()
            .filter(expenses::Column::AddedBy.eq(actor.0))
            .filter(expenses::Column::IdempotencyKey.eq(key))
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };
        let participants = load_participants(&self.db, &[expense.id])
            .await?
            .remove(&expense.id)
            .unwrap_or_default();
        Ok(Some(ExpenseWithParticipants {
            expense,
            participants,
        }))
    }
}

/// Group expenses need every involved user in the group; other expenses
/// need the actor to take part. Every involved user must exist.
async fn authorize_split<C: ConnectionTrait>(
    conn: &C,
    actor: UserId,
    split: &Split,
) -> Result<(), StoreError> {
    let mut involved: Vec<UserId> = split.participants.iter().map(|p| p.user_id).collect();
    involved.push(split.payer);

    match split.group_id {
        Some(group_id) => {
            find_group(conn, group_id).await?;
            let members = member_ids(conn, group_id).await?;
            AccessPolicy::ensure_members(actor, involved.iter().copied(), &members)?;
        }
        None if !split.involves(actor) => {
            return Err(LedgerError::unauthorized(actor.0, "add an expense for others").into());
        }
        None => {}
    }
    ensure_users_exist(conn, &involved).await
}

fn stored_split(expense: &expenses::Model, participants: &[expense_participants::Model]) -> Split {
    Split::new(
        UserId::from_uuid(expense.paid_by),
        expense.currency.clone(),
        participants
            .iter()
            .map(|p| Participant::new(UserId::from_uuid(p.user_id), p.amount))
            .collect(),
        expense.group_id.map(GroupId::from_uuid),
    )
}

fn authorize_modify(actor: UserId, found: &ExpenseWithParticipants) -> Result<(), LedgerError> {
    let participants: Vec<UserId> = found
        .participants
        .iter()
        .map(|p| UserId::from_uuid(p.user_id))
        .collect();
    AccessPolicy::ensure_can_modify(
        actor,
        UserId::from_uuid(found.expense.paid_by),
        UserId::from_uuid(found.expense.added_by),
        &participants,
    )
}

/// Loads a live expense under a row lock, with its participants.
async fn lock_live_expense(
    txn: &DatabaseTransaction,
    expense_id: ExpenseId,
) -> Result<ExpenseWithParticipants, StoreError> {
    let expense = expenses::Entity::find_by_id(expense_id.0)
        .lock_exclusive()
        .one(txn)
        .await?
        .filter(|e| !e.is_deleted())
        .ok_or_else(|| LedgerError::not_found("expense", expense_id.0))?;
    let participants = load_participants(txn, &[expense.id])
        .await?
        .remove(&expense.id)
        .unwrap_or_default();
    Ok(ExpenseWithParticipants {
        expense,
        participants,
    })
}

async fn insert_participants(
    txn: &DatabaseTransaction,
    expense_id: Uuid,
    participants: &[Participant],
) -> Result<Vec<expense_participants::Model>, StoreError> {
    let models: Vec<expense_participants::Model> = participants
        .iter()
        .map(|p| expense_participants::Model {
            expense_id,
            user_id: p.user_id.0,
            amount: p.amount,
        })
        .collect();

    expense_participants::Entity::insert_many(
        models
            .iter()
            .cloned()
            .map(IntoActiveModel::into_active_model),
    )
    .exec_without_returning(txn)
    .await?;
    Ok(models)
}

async fn load_participants<C: ConnectionTrait>(
    conn: &C,
    expense_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<expense_participants::Model>>, StoreError> {
    if expense_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = expense_participants::Entity::find()
        .filter(expense_participants::Column::ExpenseId.is_in(expense_ids.iter().copied()))
        .all(conn)
        .await?;

    let mut by_expense: HashMap<Uuid, Vec<expense_participants::Model>> = HashMap::new();
    for row in rows {
        by_expense.entry(row.expense_id).or_default().push(row);
    }
    Ok(by_expense)
}
