//! User repository for database operations.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter,
    Set,
};
use std::collections::HashSet;
use tally_core::ledger::LedgerError;
use tally_shared::types::UserId;
use uuid::Uuid;

use crate::entities::users;
use crate::error::{StoreError, is_unique_violation};

/// User repository.
#[derive(Debug, Clone)]
pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    /// Creates a new user repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Creates a user.
    ///
    /// # Errors
    ///
    /// Returns `NotEligible` if the email is taken, or a database error.
    pub async fn create(&self, email: &str, name: &str) -> Result<users::Model, StoreError> {
        let now = chrono::Utc::now().into();
        let user = users::ActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email.trim().to_lowercase()),
            name: Set(name.trim().to_string()),
            created_at: Set(now),
            updated_at: Set(now),
        };

        user.insert(&self.db).await.map_err(|e| {
            if is_unique_violation(&e) {
                LedgerError::NotEligible(format!("email {email} is already registered")).into()
            } else {
                StoreError::from(e)
            }
        })
    }

    /// Finds a user by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: UserId) -> Result<Option<users::Model>, StoreError> {
        Ok(users::Entity::find_by_id(id.0).one(&self.db).await?)
    }

    /// Finds a user by email.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<users::Model>, StoreError> {
        Ok(users::Entity::find()
            .filter(users::Column::Email.eq(email.trim().to_lowercase()))
            .one(&self.db)
            .await?)
    }

    /// Fails with `NotFound` for the first id that has no user row.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` or a database error.
    pub async fn ensure_exist(&self, ids: &[UserId]) -> Result<(), StoreError> {
        ensure_users_exist(&self.db, ids).await
    }
}

pub(crate) async fn ensure_users_exist<C: ConnectionTrait>(
    conn: &C,
    ids: &[UserId],
) -> Result<(), StoreError> {
    let wanted: HashSet<Uuid> = ids.iter().map(|id| id.0).collect();
    let found: HashSet<Uuid> = users::Entity::find()
        .filter(users::Column::Id.is_in(wanted.iter().copied()))
        .all(conn)
        .await?
        .into_iter()
        .map(|u| u.id)
        .collect();

    match ids.iter().find(|id| !found.contains(&id.0)) {
        Some(missing) => Err(LedgerError::not_found("user", missing.0).into()),
        None => Ok(()),
    }
}
