//! Store errors and their mapping onto the ledger taxonomy.

use sea_orm::{DbErr, RuntimeErr};
use tally_core::ledger::LedgerError;
use tally_shared::AppError;

/// Error type for repository operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A ledger rule rejected the operation before or during the write.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// The database failed; the surrounding transaction was rolled back.
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

/// Postgres failure class, read from the SQLSTATE of the underlying driver error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// `40001`: another transaction won; retrying is safe.
    SerializationFailure,
    /// `40P01`.
    Deadlock,
    /// `23505`.
    UniqueViolation,
    /// The connection or pool failed before the statement ran.
    Connection,
    /// Anything else.
    Other,
}

impl FailureClass {
    /// Classifies a `SeaORM` error.
    #[must_use]
    pub fn of(err: &DbErr) -> Self {
        if matches!(err, DbErr::Conn(_) | DbErr::ConnectionAcquire(_)) {
            return Self::Connection;
        }
        match sqlstate(err).as_deref() {
            Some("40001") => Self::SerializationFailure,
            Some("40P01") => Self::Deadlock,
            Some("23505") => Self::UniqueViolation,
            _ => Self::Other,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Self::SerializationFailure => "serialization failure",
            Self::Deadlock => "deadlock detected",
            Self::UniqueViolation => "unique constraint violated",
            Self::Connection => "connection lost",
            Self::Other => "database error",
        }
    }
}

/// SQLSTATE code of a driver-level error, if there is one.
#[must_use]
pub fn sqlstate(err: &DbErr) -> Option<String> {
    let runtime = match err {
        DbErr::Query(runtime) | DbErr::Exec(runtime) | DbErr::Conn(runtime) => runtime,
        _ => return None,
    };
    match runtime {
        RuntimeErr::SqlxError(sqlx::Error::Database(db)) => db.code().map(|code| code.into_owned()),
        _ => None,
    }
}

/// Returns true when `err` is a unique-constraint violation.
#[must_use]
pub fn is_unique_violation(err: &DbErr) -> bool {
    FailureClass::of(err) == FailureClass::UniqueViolation
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Ledger(inner) => inner,
            StoreError::Database(db) => {
                let class = FailureClass::of(&db);
                Self::TransactionFailure(format!("{}: {db}", class.describe()))
            }
        }
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        LedgerError::from(err).into()
    }
}

impl StoreError {
    /// Returns true if the whole operation may be retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Ledger(inner) => inner.is_retryable(),
            Self::Database(_) => true,
        }
    }
}
