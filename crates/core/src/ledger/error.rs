//! Ledger error types for validation, lookup and invariant errors.
//!
//! Every variant carries the ids and amounts an operator needs to explain a
//! rejected stock entry or payment.

use rust_decimal::Decimal;
use tally_shared::types::{BankAccountId, CustomerId, TransactionId};
use tally_shared::{AppError, ErrorKind};
use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    // ========== Lookup Errors ==========
    /// Customer not found.
    #[error("Customer not found: {0}")]
    CustomerNotFound(CustomerId),

    /// Transaction not found in the customer's ledger.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    /// Bank account not found for the customer.
    #[error("Bank account not found: {0}")]
    BankAccountNotFound(BankAccountId),

    // ========== Validation Errors ==========
    /// Amount must be strictly positive.
    #[error("{field} must be positive, got {amount}")]
    NonPositiveAmount {
        /// The offending field.
        field: &'static str,
        /// The rejected amount.
        amount: Decimal,
    },

    /// Value cannot be negative.
    #[error("{field} cannot be negative, got {value}")]
    NegativeValue {
        /// The offending field.
        field: &'static str,
        /// The rejected value.
        value: Decimal,
    },

    /// Stock needs a quality type.
    #[error("Quality type cannot be blank")]
    BlankQualityType,

    /// Bank payments must reference a bank account.
    #[error("Bank payments require a bank account")]
    MissingBankAccount,

    /// Only bank payments may reference a bank account.
    #[error("Bank account {0} given for a non-bank payment")]
    UnexpectedBankAccount(BankAccountId),

    /// Bank account is deactivated.
    #[error("Bank account {0} is inactive")]
    BankAccountInactive(BankAccountId),

    /// Input names a different customer than the ledger it is applied to.
    #[error("Input for customer {given} applied to ledger of customer {expected}")]
    CustomerMismatch {
        /// The ledger's customer.
        expected: CustomerId,
        /// The customer named by the input.
        given: CustomerId,
    },

    /// Allocation target is a payment, not stock.
    #[error("Transaction {0} is not a stock transaction")]
    NotAStockTransaction(TransactionId),

    /// The same stock transaction was listed twice in a manual allocation.
    #[error("Transaction {0} appears more than once in the allocation")]
    DuplicateAllocation(TransactionId),

    /// Manual allocations add up to more than the payment.
    #[error("Allocations total {allocated} but the payment is only {amount}")]
    AllocationExceedsPayment {
        /// Sum of requested slices.
        allocated: Decimal,
        /// Payment amount.
        amount: Decimal,
    },

    // ========== Invariant Errors ==========
    /// A stock balance would go negative.
    #[error("Transaction {transaction_id} would have negative balance {balance}")]
    NegativeBalance {
        /// The affected transaction.
        transaction_id: TransactionId,
        /// The offending balance.
        balance: Decimal,
    },

    // ========== Concurrency Errors ==========
    /// Concurrent modification detected.
    #[error("Concurrent modification detected for customer {0}, please retry")]
    ConcurrentModification(CustomerId),
}

impl LedgerError {
    /// Returns the error category.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::CustomerNotFound(_)
            | Self::TransactionNotFound(_)
            | Self::BankAccountNotFound(_) => ErrorKind::NotFound,

            Self::NonPositiveAmount { .. }
            | Self::NegativeValue { .. }
            | Self::BlankQualityType
            | Self::MissingBankAccount
            | Self::UnexpectedBankAccount(_)
            | Self::BankAccountInactive(_)
            | Self::CustomerMismatch { .. }
            | Self::NotAStockTransaction(_)
            | Self::DuplicateAllocation(_)
            | Self::AllocationExceedsPayment { .. } => ErrorKind::InvalidArgument,

            Self::NegativeBalance { .. } => ErrorKind::InvariantViolation,

            Self::ConcurrentModification(_) => ErrorKind::ConflictRetryable,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::CustomerNotFound(_) => "CUSTOMER_NOT_FOUND",
            Self::TransactionNotFound(_) => "TRANSACTION_NOT_FOUND",
            Self::BankAccountNotFound(_) => "BANK_ACCOUNT_NOT_FOUND",
            Self::NonPositiveAmount { .. } => "NON_POSITIVE_AMOUNT",
            Self::NegativeValue { .. } => "NEGATIVE_VALUE",
            Self::BlankQualityType => "BLANK_QUALITY_TYPE",
            Self::MissingBankAccount => "MISSING_BANK_ACCOUNT",
            Self::UnexpectedBankAccount(_) => "UNEXPECTED_BANK_ACCOUNT",
            Self::BankAccountInactive(_) => "BANK_ACCOUNT_INACTIVE",
            Self::CustomerMismatch { .. } => "CUSTOMER_MISMATCH",
            Self::NotAStockTransaction(_) => "NOT_A_STOCK_TRANSACTION",
            Self::DuplicateAllocation(_) => "DUPLICATE_ALLOCATION",
            Self::AllocationExceedsPayment { .. } => "ALLOCATION_EXCEEDS_PAYMENT",
            Self::NegativeBalance { .. } => "NEGATIVE_BALANCE",
            Self::ConcurrentModification(_) => "CONCURRENT_MODIFICATION",
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

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        Self::from_kind(err.kind(), err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(LedgerError::BlankQualityType.error_code(), "BLANK_QUALITY_TYPE");
        assert_eq!(
            LedgerError::AllocationExceedsPayment {
                allocated: Decimal::new(100, 0),
                amount: Decimal::new(50, 0),
            }
            .error_code(),
            "ALLOCATION_EXCEEDS_PAYMENT"
        );
        assert_eq!(LedgerError::MissingBankAccount.error_code(), "MISSING_BANK_ACCOUNT");
    }

    #[test]
    fn test_http_status_codes() {
        assert_eq!(
            LedgerError::CustomerNotFound(CustomerId::new()).http_status_code(),
            404
        );
        assert_eq!(LedgerError::MissingBankAccount.http_status_code(), 400);
        assert_eq!(
            LedgerError::NegativeBalance {
                transaction_id: TransactionId::new(),
                balance: Decimal::new(-1, 0),
            }
            .http_status_code(),
            422
        );
        assert_eq!(
            LedgerError::ConcurrentModification(CustomerId::new()).http_status_code(),
            409
        );
    }

    #[test]
    fn test_retryable_errors() {
        assert!(LedgerError::ConcurrentModification(CustomerId::new()).is_retryable());
        assert!(!LedgerError::BlankQualityType.is_retryable());
    }

    #[test]
    fn test_error_display() {
        let err = LedgerError::NonPositiveAmount {
            field: "amount",
            amount: Decimal::new(-500, 2),
        };
        assert_eq!(err.to_string(), "amount must be positive, got -5.00");
    }

    #[test]
    fn test_into_app_error_keeps_category() {
        let app: AppError = LedgerError::MissingBankAccount.into();
        assert_eq!(app.kind(), ErrorKind::InvalidArgument);
        assert_eq!(app.to_string(), "Invalid argument: Bank payments require a bank account");
    }
}
