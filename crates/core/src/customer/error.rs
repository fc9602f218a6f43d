//! Customer and bank account error types.

use tally_shared::types::{BankAccountId, CustomerId};
use tally_shared::{AppError, ErrorKind};
use thiserror::Error;

/// Errors that can occur while managing customers and their bank accounts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CustomerError {
    /// Customer not found.
    #[error("Customer not found: {0}")]
    NotFound(CustomerId),

    /// Bank account not found for the customer.
    #[error("Bank account {account_id} not found for customer {customer_id}")]
    BankAccountNotFound {
        /// The customer searched.
        customer_id: CustomerId,
        /// The missing account.
        account_id: BankAccountId,
    },

    /// Required text field is empty.
    #[error("{0} cannot be blank")]
    BlankField(&'static str),

    /// Email address is malformed.
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    /// Tax identifier does not match its kind's format.
    #[error("Invalid {kind} number: {value}")]
    InvalidTaxIdentifier {
        /// Identifier kind (GST, PAN, Aadhaar).
        kind: &'static str,
        /// The rejected value.
        value: String,
    },

    /// IFSC must be 11 characters: 4 letters, a zero, then 6 alphanumerics.
    #[error("Invalid IFSC code: {0}")]
    InvalidIfsc(String),

    /// Account number already registered for this customer.
    #[error("Account number {account_number} already exists for customer {customer_id}")]
    DuplicateAccountNumber {
        /// Owning customer.
        customer_id: CustomerId,
        /// The duplicated number.
        account_number: String,
    },

    /// Operation needs an active account.
    #[error("Bank account {0} is inactive")]
    BankAccountInactive(BankAccountId),

    /// Input names a different customer than the book it is applied to.
    #[error("Input for customer {given} applied to accounts of customer {expected}")]
    CustomerMismatch {
        /// The book's customer.
        expected: CustomerId,
        /// The customer named by the input.
        given: CustomerId,
    },
}

impl CustomerError {
    /// Returns the error category.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) | Self::BankAccountNotFound { .. } => ErrorKind::NotFound,
            Self::BlankField(_)
            | Self::InvalidEmail(_)
            | Self::InvalidTaxIdentifier { .. }
            | Self::InvalidIfsc(_)
            | Self::DuplicateAccountNumber { .. }
            | Self::BankAccountInactive(_)
            | Self::CustomerMismatch { .. } => ErrorKind::InvalidArgument,
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "CUSTOMER_NOT_FOUND",
            Self::BankAccountNotFound { .. } => "BANK_ACCOUNT_NOT_FOUND",
            Self::BlankField(_) => "BLANK_FIELD",
            Self::InvalidEmail(_) => "INVALID_EMAIL",
            Self::InvalidTaxIdentifier { .. } => "INVALID_TAX_IDENTIFIER",
            Self::InvalidIfsc(_) => "INVALID_IFSC",
            Self::DuplicateAccountNumber { .. } => "DUPLICATE_ACCOUNT_NUMBER",
            Self::BankAccountInactive(_) => "BANK_ACCOUNT_INACTIVE",
            Self::CustomerMismatch { .. } => "CUSTOMER_MISMATCH",
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

impl From<CustomerError> for AppError {
    fn from(err: CustomerError) -> Self {
        Self::from_kind(err.kind(), err.to_string())
    }
}
