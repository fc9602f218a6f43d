//! Repository error type.

use sea_orm::{DbErr, RuntimeErr, SqlErr};
use tally_core::customer::CustomerError;
use tally_core::inventory::InventoryError;
use tally_core::ledger::LedgerError;
use tally_shared::{AppError, ErrorKind};
use uuid::Uuid;

/// SQLSTATE codes that mean another writer got in the way.
const RETRYABLE_SQLSTATES: [&str; 3] = [
    "40001", // serialization_failure
    "40P01", // deadlock_detected
    "55P03", // lock_not_available
];

/// Errors returned by the repositories.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    /// Customer or bank account rule rejected the operation.
    #[error(transparent)]
    Customer(#[from] CustomerError),

    /// Ledger rule rejected the operation.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Inventory rule rejected the operation.
    #[error(transparent)]
    Inventory(#[from] InventoryError),

    /// Concurrent modification detected, the whole operation should be retried.
    #[error("Concurrent modification detected, please retry: {0}")]
    Conflict(String),

    /// A stored row cannot be mapped back to the domain.
    #[error("Row {id} in {table} is inconsistent: {reason}")]
    CorruptRow {
        /// Table name.
        table: &'static str,
        /// Row id.
        id: Uuid,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// Database error.
    #[error("Database error: {0}")]
    Database(DbErr),
}

impl From<DbErr> for RepositoryError {
    fn from(err: DbErr) -> Self {
        if is_contention(&err) {
            Self::Conflict(err.to_string())
        } else {
            Self::Database(err)
        }
    }
}

/// Lock timeouts, deadlocks and serialization failures, plus unique
/// violations that slipped past the checks made under the customer lock.
fn is_contention(err: &DbErr) -> bool {
    if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        return true;
    }
    match err {
        DbErr::Exec(RuntimeErr::SqlxError(sqlx::Error::Database(db_err)))
        | DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::Database(db_err))) => db_err
            .code()
            .is_some_and(|code| RETRYABLE_SQLSTATES.contains(&&*code)),
        _ => false,
    }
}

impl RepositoryError {
    /// Returns the error category.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Customer(err) => err.kind(),
            Self::Ledger(err) => err.kind(),
            Self::Inventory(err) => err.kind(),
            Self::Conflict(_) => ErrorKind::ConflictRetryable,
            Self::CorruptRow { .. } | Self::Database(_) => ErrorKind::Internal,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Customer(err) => err.error_code(),
            Self::Ledger(err) => err.error_code(),
            Self::Inventory(err) => err.error_code(),
            Self::Conflict(_) => "CONCURRENT_MODIFICATION",
            Self::CorruptRow { .. } => "CORRUPT_ROW",
            Self::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub fn http_status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Database(db) => Self::Database(db.to_string()),
            other => Self::from_kind(other.kind(), other.to_string()),
        }
    }
}
