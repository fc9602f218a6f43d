//! Application-wide error types.
//!
//! Every domain error in the workspace maps onto one [`ErrorKind`], and every
//! domain error converts into [`AppError`] for callers that only care about
//! the category.

use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Error categories shared by all ledger operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Unknown customer, transaction, bank account or inventory position.
    NotFound,
    /// Non-positive amounts, missing payment fields, malformed input.
    InvalidArgument,
    /// The operation would break a ledger or inventory invariant.
    InvariantViolation,
    /// Concurrent mutation detected; the whole operation may be retried.
    ConflictRetryable,
    /// Storage or unexpected internal failure.
    Internal,
}

impl ErrorKind {
    /// Returns the HTTP status code conventionally used for this category.
    #[must_use]
    pub const fn status_code(self) -> u16 {
        match self {
            Self::NotFound => 404,
            Self::InvalidArgument => 400,
            Self::InvariantViolation => 422,
            Self::ConflictRetryable => 409,
            Self::Internal => 500,
        }
    }

    /// Returns true if the caller should retry the whole operation.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::ConflictRetryable)
    }
}

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Business invariant violation.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Concurrent modification, retry the operation.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Database error.
    #[error("Database error: {0}")]
    Database(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Returns the error category.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::InvariantViolation(_) => ErrorKind::InvariantViolation,
            Self::Conflict(_) => ErrorKind::ConflictRetryable,
            Self::Database(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Builds an `AppError` from a category and a message.
    #[must_use]
    pub fn from_kind(kind: ErrorKind, message: String) -> Self {
        match kind {
            ErrorKind::NotFound => Self::NotFound(message),
            ErrorKind::InvalidArgument => Self::InvalidArgument(message),
            ErrorKind::InvariantViolation => Self::InvariantViolation(message),
            ErrorKind::ConflictRetryable => Self::Conflict(message),
            ErrorKind::Internal => Self::Internal(message),
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> u16 {
        self.kind().status_code()
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "NOT_FOUND",
            Self::InvalidArgument(_) => "INVALID_ARGUMENT",
            Self::InvariantViolation(_) => "INVARIANT_VIOLATION",
            Self::Conflict(_) => "CONFLICT_RETRYABLE",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.kind().is_retryable()
    }
}
