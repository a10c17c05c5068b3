//! Group repository: groups, membership, and the settled-before-leaving rule.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    ModelTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::collections::HashSet;
use tally_core::balances::BalanceQueries;
use tally_core::ledger::{AccessPolicy, LedgerError};
use tally_shared::types::{GroupId, UserId};
use tracing::info;
use uuid::Uuid;

use crate::entities::{group_balances, group_users, groups};
use crate::error::StoreError;

/// Group repository.
#[derive(Debug, Clone)]
pub struct GroupRepository {
    db: DatabaseConnection,
}

impl GroupRepository {
    /// Creates a new group repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a group; the creator becomes its first member.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails.
    pub async fn create(
        &self,
        actor: UserId,
        name: &str,
        description: Option<String>,
    ) -> Result<groups::Model, StoreError> {
        let now = chrono::Utc::now().into();
        let txn = self.db.begin().await?;

        let group = groups::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(name.trim().to_string()),
            description: Set(description),
            created_by: Set(actor.0),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(&txn)
        .await?;

        group_users::ActiveModel {
            group_id: Set(group.id),
            user_id: Set(actor.0),
            joined_at: Set(now),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        info!(group_id = %group.id, created_by = %actor, "group created");
        Ok(group)
    }

    /// Finds a group.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if there is no such group.
    pub async fn find(&self, group_id: GroupId) -> Result<groups::Model, StoreError> {
        find_group(&self.db, group_id).await
    }

    /// Ids of every member of the group.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn member_ids(&self, group_id: GroupId) -> Result<HashSet<UserId>, StoreError> {
        member_ids(&self.db, group_id).await
    }

    /// Groups the user belongs to, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<groups::Model>, StoreError> {
        let rows = group_users::Entity::find()
            .filter(group_users::Column::UserId.eq(user_id.0))
            .find_also_related(groups::Entity)
            .order_by_asc(group_users::Column::JoinedAt)
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().filter_map(|(_, group)| group).collect())
    }

    /// Adds `user_id` to the group. Any member may add others; adding an
    /// existing member is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown group and `Unauthorized` if the
    /// actor is not a member.
    pub async fn add_member(
        &self,
        actor: UserId,
        group_id: GroupId,
        user_id: UserId,
    ) -> Result<(), StoreError> {
        find_group(&self.db, group_id).await?;
        let members = member_ids(&self.db, group_id).await?;
        AccessPolicy::ensure_members(actor, [], &members)?;
        if members.contains(&user_id) {
            return Ok(());
        }

        group_users::ActiveModel {
            group_id: Set(group_id.0),
            user_id: Set(user_id.0),
            joined_at: Set(chrono::Utc::now().into()),
        }
        .insert(&self.db)
        .await?;

        info!(group_id = %group_id, user_id = %user_id, added_by = %actor, "member added");
        Ok(())
    }

    /// Removes `user_id` from the group.
    ///
    /// Members may leave; only the creator may remove someone else. The
    /// member must have no nonzero balance in the group.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Unauthorized`, `OutstandingBalance`, or a
    /// database error.
    pub async fn remove_member(
        &self,
        actor: UserId,
        group_id: GroupId,
        user_id: UserId,
    ) -> Result<(), StoreError> {
        let group = find_group(&self.db, group_id).await?;
        if actor != user_id {
            AccessPolicy::ensure_creator(
                actor,
                UserId::from_uuid(group.created_by),
                "remove group members",
            )?;
        }

        let txn = self.db.begin().await?;
        let membership = group_users::Entity::find_by_id((group_id.0, user_id.0))
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| LedgerError::not_found("group member", user_id.0))?;

        let open = group_balances::Entity::find()
            .filter(group_balances::Column::GroupId.eq(group_id.0))
            .filter(
                Condition::any()
                    .add(group_balances::Column::UserId.eq(user_id.0))
                    .add(group_balances::Column::FriendId.eq(user_id.0)),
            )
            .all(&txn)
            .await?;
        BalanceQueries::ensure_settled(open.iter().map(|row| row.amount), "member")?;

        membership.delete(&txn).await?;
        txn.commit().await?;

        info!(group_id = %group_id, user_id = %user_id, removed_by = %actor, "member removed");
        Ok(())
    }

    /// Deletes the group. Only the creator may, and only once every group
    /// balance is zero.
    ///
    /// # Errors
    ///
    /// Returns `NotFound`, `Unauthorized`, `OutstandingBalance`, or a
    /// database error.
    pub async fn delete_group(&self, actor: UserId, group_id: GroupId) -> Result<(), StoreError> {
        let txn = self.db.begin().await?;
        let group = groups::Entity::find_by_id(group_id.0)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| LedgerError::not_found("group", group_id.0))?;
        AccessPolicy::ensure_creator(
            actor,
            UserId::from_uuid(group.created_by),
            "delete this group",
        )?;

        let rows = group_balances::Entity::find()
            .filter(group_balances::Column::GroupId.eq(group_id.0))
            .all(&txn)
            .await?;
        BalanceQueries::ensure_settled(rows.iter().map(|row| row.amount), "group")?;

        group.delete(&txn).await?;
        txn.commit().await?;

        info!(group_id = %group_id, deleted_by = %actor, "group deleted");
        Ok(())
    }
}

pub(crate) async fn find_group<C: ConnectionTrait>(
    conn: &C,
    group_id: GroupId,
) -> Result<groups::Model, StoreError> {
    groups::Entity::find_by_id(group_id.0)
        .one(conn)
        .await?
        .ok_or_else(|| LedgerError::not_found("group", group_id.0).into())
}

pub(crate) async fn member_ids<C: ConnectionTrait>(
    conn: &C,
    group_id: GroupId,
) -> Result<HashSet<UserId>, StoreError> {
    let rows = group_users::Entity::find()
        .filter(group_users::Column::GroupId.eq(group_id.0))
        .all(conn)
        .await?;
    Ok(rows
        .into_iter()
        .map(|m| UserId::from_uuid(m.user_id))
        .collect())
}
