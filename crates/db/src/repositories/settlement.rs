//! Settlement repository.
//!
//! A settlement is stored `PENDING` and moves the ledger only when a matching
//! payment confirmation arrives. The status flip is a guarded update that
//! commits in the same transaction as the settle mutations, so a replayed
//! confirmation can never apply the increments twice.

use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection,
    DatabaseTransaction, DbBackend, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set,
    Statement, TransactionTrait,
};
use serde::Serialize;
use std::collections::HashMap;
use tally_core::ledger::{
    AccessPolicy, BalanceKey, LedgerError, PrecisionPolicy, canonical_currency,
};
use tally_core::settlement::{
    ConfirmationOutcome, NewSettlement, PaymentConfirmation, SettlementItemDraft,
    SettlementService, SettlementStatus,
};
use tally_shared::types::{GroupId, SettlementId, UserId};
use tracing::{info, warn};
use uuid::Uuid;

use super::group::{find_group, member_ids};
use super::ledger::LedgerWriter;
use super::user::ensure_users_exist;
use crate::entities::sea_orm_active_enums::SettlementStatus as DbSettlementStatus;
use crate::entities::{balances, group_balances, settlement_items, settlement_transactions};
use crate::error::StoreError;

const COMPLETE_SQL: &str = r"
UPDATE settlement_transactions
SET status = 'COMPLETED', transaction_hash = $2, completed_at = now()
WHERE id = $1 AND status = 'PENDING'
";

const FAIL_SQL: &str = r"
UPDATE settlement_transactions
SET status = 'FAILED', transaction_hash = $2
WHERE id = $1 AND status = 'PENDING'
";

/// A settlement with its items.
#[derive(Debug, Clone, Serialize)]
pub struct SettlementWithItems {
    /// The settlement row.
    pub settlement: settlement_transactions::Model,
    /// One row per counterparty paid.
    pub items: Vec<settlement_items::Model>,
}

impl SettlementWithItems {
    /// Current status in core terms.
    #[must_use]
    pub fn status(&self) -> SettlementStatus {
        self.settlement.status.into()
    }

    fn drafts(&self) -> Vec<SettlementItemDraft> {
        self.items
            .iter()
            .map(|item| SettlementItemDraft {
                friend_id: UserId::from_uuid(item.friend_id),
                original_amount: item.original_amount,
                original_currency: item.original_currency.clone(),
                settlement_amount: item.settlement_amount,
            })
            .collect()
    }
}

/// Settlement repository.
#[derive(Debug, Clone)]
pub struct SettlementRepository {
    db: DatabaseConnection,
    precision: PrecisionPolicy,
}

impl SettlementRepository {
    /// Creates a new settlement repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, precision: PrecisionPolicy) -> Self {
        Self { db, precision }
    }

    /// Stores a `PENDING` settlement. The ledger is not touched.
    ///
    /// Item amounts are rounded to their currency's minor unit before they are
    /// stored, so the settle plan lands on the same grid as expenses. Each item
    /// records the balance the settler would hold against that friend once the
    /// settlement completes.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for malformed items, `NotFound` for unknown users
    /// or group, `Unauthorized`/`NotEligible` for group membership, or a
    /// database error.
    pub async fn create_settlement(
        &self,
        actor: UserId,
        input: NewSettlement,
    ) -> Result<SettlementWithItems, StoreError> {
        let drafts = SettlementService::normalize_items(input.items, &self.precision);
        SettlementService::validate_items(actor, &drafts)?;
        let friends: Vec<UserId> = drafts.iter().map(|i| i.friend_id).collect();
        if let Some(group_id) = input.group_id {
            find_group(&self.db, group_id).await?;
            let members = member_ids(&self.db, group_id).await?;
            AccessPolicy::ensure_members(actor, friends.iter().copied(), &members)?;
        }
        ensure_users_exist(&self.db, &friends).await?;

        let now = chrono::Utc::now().into();
        let settlement_id = Uuid::new_v4();
        let txn = self.db.begin().await?;

        let settlement = settlement_transactions::ActiveModel {
            id: Set(settlement_id),
            user_id: Set(actor.0),
            group_id: Set(input.group_id.map(|g| g.0)),
            settlement_currency: Set(canonical_currency(&input.settlement_currency)),
            chain_id: Set(input.chain_id),
            token_id: Set(input.token_id),
            status: Set(DbSettlementStatus::Pending),
            transaction_hash: Set(None),
            created_at: Set(now),
            completed_at: Set(None),
        }
        .insert(&txn)
        .await?;

        let mut items = Vec::with_capacity(drafts.len());
        for draft in &drafts {
            let currency = draft.original_currency.clone();
            let current = current_balance(&txn, actor, draft.friend_id, &currency).await?;
            let item = settlement_items::ActiveModel {
                id: Set(Uuid::new_v4()),
                settlement_transaction_id: Set(settlement_id),
                user_id: Set(actor.0),
                friend_id: Set(draft.friend_id.0),
                group_id: Set(input.group_id.map(|g| g.0)),
                original_amount: Set(draft.original_amount),
                original_currency: Set(currency),
                settlement_amount: Set(draft.settlement_amount),
                after_settlement_balance: Set(Some(SettlementService::projected_balance(
                    current, draft,
                ))),
                created_at: Set(now),
            }
            .insert(&txn)
            .await?;
            items.push(item);
        }

        txn.commit().await?;
        info!(
            settlement_id = %settlement.id,
            user_id = %actor,
            items = items.len(),
            "settlement created"
        );

        Ok(SettlementWithItems { settlement, items })
    }

    /// Creates a settlement covering everything the actor owes inside a
    /// group in one currency. Each debt is paid in that same currency.
    ///
    /// # Errors
    ///
    /// Returns `NotEligible` when the actor owes nothing there, plus the
    /// errors of [`Self::create_settlement`].
    pub async fn settle_with_everyone(
        &self,
        actor: UserId,
        group_id: GroupId,
        currency: &str,
    ) -> Result<SettlementWithItems, StoreError> {
        let currency = canonical_currency(currency);
        let rows = group_balances::Entity::find()
            .filter(group_balances::Column::GroupId.eq(group_id.0))
            .filter(group_balances::Column::UserId.eq(actor.0))
            .filter(group_balances::Column::Currency.eq(currency.as_str()))
            .order_by_asc(group_balances::Column::FriendId)
            .all(&self.db)
            .await?;
        let keyed: Vec<(BalanceKey, Decimal)> = rows
            .into_iter()
            .map(|r| {
                let key = BalanceKey::group(
                    group_id,
                    UserId::from_uuid(r.user_id),
                    UserId::from_uuid(r.friend_id),
                    r.currency,
                );
                (key, r.amount)
            })
            .collect();

        let items = SettlementService::outstanding_debts(
            actor,
            &currency,
            keyed.iter().map(|(key, amount)| (key, *amount)),
        );
        if items.is_empty() {
            return Err(LedgerError::NotEligible(format!(
                "nothing is owed in {currency} in this group"
            ))
            .into());
        }

        self.create_settlement(
            actor,
            NewSettlement {
                items,
                settlement_currency: currency,
                chain_id: None,
                token_id: None,
                group_id: Some(group_id),
            },
        )
        .await
    }

    /// Applies a verified payment result to a settlement.
    ///
    /// A matching success completes the settlement and applies the settle
    /// mutations in one transaction. A failure or a mismatch marks it failed
    /// and leaves the ledger alone. Replaying a confirmation that already
    /// completed with the same hash changes nothing.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Unauthorized` unless the actor is the settler,
    /// `InvalidStateTransition` for a settlement no longer pending,
    /// `ExternalConfirmationMismatch` after recording the failure, or a
    /// database error.
    pub async fn confirm_settlement(
        &self,
        actor: UserId,
        settlement_id: SettlementId,
        confirmation: PaymentConfirmation,
    ) -> Result<SettlementWithItems, StoreError> {
        let txn = self.db.begin().await?;
        let current = lock_settlement(&txn, settlement_id).await?;
        let settler = UserId::from_uuid(current.settlement.user_id);
        if actor != settler {
            return Err(LedgerError::unauthorized(actor.0, "confirm this settlement").into());
        }

        let outcome = SettlementService::evaluate(
            current.status(),
            current.settlement.transaction_hash.as_deref(),
            settler,
            current.settlement.group_id.map(GroupId::from_uuid),
            &current.drafts(),
            &confirmation,
        )?;

        let hash = confirmation.transaction_hash;
        match outcome {
            ConfirmationOutcome::AlreadyCompleted => {
                info!(settlement_id = %settlement_id, "confirmation replay ignored");
                return Ok(current);
            }
            ConfirmationOutcome::Fail => {
                guarded_transition(&txn, settlement_id, SettlementStatus::Failed, hash).await?;
                txn.commit().await?;
                info!(settlement_id = %settlement_id, "settlement failed");
            }
            ConfirmationOutcome::Mismatch { reason } => {
                guarded_transition(&txn, settlement_id, SettlementStatus::Failed, hash).await?;
                txn.commit().await?;
                warn!(settlement_id = %settlement_id, %reason, "payment does not match settlement");
                return Err(LedgerError::ExternalConfirmationMismatch {
                    settlement_id: settlement_id.0,
                    reason,
                }
                .into());
            }
            ConfirmationOutcome::Settle { plan } => {
                guarded_transition(&txn, settlement_id, SettlementStatus::Completed, hash).await?;
                LedgerWriter::apply(&txn, &plan).await?;
                txn.commit().await?;
                LedgerWriter::reconcile_best_effort(&self.db, &plan).await;
                info!(settlement_id = %settlement_id, user_id = %settler, "settlement completed");
            }
        }

        self.load(settlement_id).await
    }

    /// Finds a settlement visible to `actor`: the settler or a counterparty.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or `Unauthorized`.
    pub async fn find(
        &self,
        actor: UserId,
        settlement_id: SettlementId,
    ) -> Result<SettlementWithItems, StoreError> {
        let found = self.load(settlement_id).await?;
        let visible = found.settlement.user_id == actor.0
            || found.items.iter().any(|item| item.friend_id == actor.0);
        if !visible {
            return Err(LedgerError::unauthorized(actor.0, "view this settlement").into());
        }
        Ok(found)
    }

    /// Settlements the user made or received, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_for_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<SettlementWithItems>, StoreError> {
        let received: Vec<Uuid> = settlement_items::Entity::find()
            .filter(settlement_items::Column::FriendId.eq(user_id.0))
            .select_only()
            .column(settlement_items::Column::SettlementTransactionId)
            .into_tuple()
            .all(&self.db)
            .await?;

        let settlements = settlement_transactions::Entity::find()
            .filter(
                Condition::any()
                    .add(settlement_transactions::Column::UserId.eq(user_id.0))
                    .add(settlement_transactions::Column::Id.is_in(received)),
            )
            .order_by_desc(settlement_transactions::Column::CreatedAt)
            .all(&self.db)
            .await?;

        let ids: Vec<Uuid> = settlements.iter().map(|s| s.id).collect();
        let mut by_settlement = load_items(&self.db, &ids).await?;
        Ok(settlements
            .into_iter()
            .map(|settlement| {
                let items = by_settlement.remove(&settlement.id).unwrap_or_default();
                SettlementWithItems { settlement, items }
            })
            .collect())
    }

    async fn load(&self, settlement_id: SettlementId) -> Result<SettlementWithItems, StoreError> {
        let settlement = settlement_transactions::Entity::find_by_id(settlement_id.0)
            .one(&self.db)
            .await?
            .ok_or_else(|| LedgerError::not_found("settlement", settlement_id.0))?;
        let items = load_items(&self.db, &[settlement.id])
            .await?
            .remove(&settlement.id)
            .unwrap_or_default();
        Ok(SettlementWithItems { settlement, items })
    }
}

async fn lock_settlement(
    txn: &DatabaseTransaction,
    settlement_id: SettlementId,
) -> Result<SettlementWithItems, StoreError> {
    let settlement = settlement_transactions::Entity::find_by_id(settlement_id.0)
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or_else(|| LedgerError::not_found("settlement", settlement_id.0))?;
    let items = load_items(txn, &[settlement.id])
        .await?
        .remove(&settlement.id)
        .unwrap_or_default();
    Ok(SettlementWithItems { settlement, items })
}

/// Moves a pending settlement out of `PENDING`. Exactly one row must change.
async fn guarded_transition(
    txn: &DatabaseTransaction,
    settlement_id: SettlementId,
    target: SettlementStatus,
    transaction_hash: Option<String>,
) -> Result<(), StoreError> {
    let sql = match target {
        SettlementStatus::Completed => COMPLETE_SQL,
        SettlementStatus::Pending | SettlementStatus::Failed => FAIL_SQL,
    };
    let result = txn
        .execute(Statement::from_sql_and_values(
            DbBackend::Postgres,
            sql,
            [settlement_id.0.into(), transaction_hash.into()],
        ))
        .await?;
    if result.rows_affected() != 1 {
        return Err(LedgerError::InvalidStateTransition {
            entity: "settlement",
            from: "PENDING",
            to: target.as_str(),
        }
        .into());
    }
    Ok(())
}

async fn current_balance<C: ConnectionTrait>(
    conn: &C,
    user_id: UserId,
    friend_id: UserId,
    currency: &str,
) -> Result<Decimal, StoreError> {
    let row = balances::Entity::find()
        .filter(balances::Column::UserId.eq(user_id.0))
        .filter(balances::Column::FriendId.eq(friend_id.0))
        .filter(balances::Column::Currency.eq(currency))
        .one(conn)
        .await?;
    Ok(row.map_or(Decimal::ZERO, |r| r.amount))
}

async fn load_items<C: ConnectionTrait>(
    conn: &C,
    settlement_ids: &[Uuid],
) -> Result<HashMap<Uuid, Vec<settlement_items::Model>>, StoreError> {
    if settlement_ids.is_empty() {
        return Ok(HashMap::new());
    }
    let rows = settlement_items::Entity::find()
        .filter(
            settlement_items::Column::SettlementTransactionId.is_in(settlement_ids.iter().copied()),
        )
        .order_by_asc(settlement_items::Column::CreatedAt)
        .all(conn)
        .await?;

    let mut by_settlement: HashMap<Uuid, Vec<settlement_items::Model>> = HashMap::new();
    for row in rows {
        by_settlement
            .entry(row.settlement_transaction_id)
            .or_default()
            .push(row);
    }
    Ok(by_settlement)
}
