//! Inventory error types.

use rust_decimal::Decimal;
use tally_shared::types::{CustomerId, TransactionId};
use tally_shared::{AppError, ErrorKind};
use thiserror::Error;

use crate::ledger::LedgerError;

/// Errors that can occur during inventory operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InventoryError {
    // ========== Lookup Errors ==========
    /// No position for the key.
    #[error("No inventory position for customer {customer_id} and quality {quality_type}")]
    PositionNotFound {
        /// Customer searched.
        customer_id: CustomerId,
        /// Quality type searched.
        quality_type: String,
    },

    // ========== Validation Errors ==========
    /// Value cannot be negative.
    #[error("{field} cannot be negative, got {value}")]
    NegativeValue {
        /// The offending field.
        field: &'static str,
        /// The rejected value.
        value: Decimal,
    },

    /// Expense with neither weight loss nor expenditure.
    #[error("Expense must have a weight loss or an expenditure")]
    EmptyExpense,

    /// Quality type is blank.
    #[error("Quality type cannot be blank")]
    BlankQualityType,

    /// Only stock transactions feed inventory.
    #[error("Transaction {0} is not a stock transaction")]
    NotAStockTransaction(TransactionId),

    /// Processing without inputs.
    #[error("Processing needs at least one input")]
    NoProcessingInputs,

    /// Quantity must be strictly positive.
    #[error("Quantity for {quality_type} must be positive, got {quantity}")]
    NonPositiveQuantity {
        /// The quality concerned.
        quality_type: String,
        /// The rejected quantity.
        quantity: Decimal,
    },

    // ========== Invariant Errors ==========
    /// Weight loss on an empty position.
    #[error("No inventory available for customer {customer_id} and quality {quality_type}")]
    NoInventoryAvailable {
        /// Position customer.
        customer_id: CustomerId,
        /// Position quality.
        quality_type: String,
    },

    /// Weight loss larger than what is on hand.
    #[error("Weight loss {weight_loss} exceeds available quantity {available} of {quality_type}")]
    WeightLossExceedsQuantity {
        /// Position quality.
        quality_type: String,
        /// Requested loss.
        weight_loss: Decimal,
        /// Quantity on hand.
        available: Decimal,
    },

    /// Processing consumes more than is on hand.
    #[error("Insufficient inventory of {quality_type}: requested {requested}, available {available}")]
    InsufficientInventory {
        /// Input quality.
        quality_type: String,
        /// Total requested.
        requested: Decimal,
        /// Quantity on hand.
        available: Decimal,
    },

    // ========== Ledger Errors ==========
    /// Recording the processing output in the ledger failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

impl InventoryError {
    /// Returns the error category.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PositionNotFound { .. } => ErrorKind::NotFound,
            Self::NegativeValue { .. }
            | Self::EmptyExpense
            | Self::BlankQualityType
            | Self::NotAStockTransaction(_)
            | Self::NoProcessingInputs
            | Self::NonPositiveQuantity { .. } => ErrorKind::InvalidArgument,
            Self::NoInventoryAvailable { .. }
            | Self::WeightLossExceedsQuantity { .. }
            | Self::InsufficientInventory { .. } => ErrorKind::InvariantViolation,
            Self::Ledger(err) => err.kind(),
        }
    }

    /// Returns the error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::PositionNotFound { .. } => "INVENTORY_POSITION_NOT_FOUND",
            Self::NegativeValue { .. } => "NEGATIVE_VALUE",
            Self::EmptyExpense => "EMPTY_EXPENSE",
            Self::BlankQualityType => "BLANK_QUALITY_TYPE",
            Self::NotAStockTransaction(_) => "NOT_A_STOCK_TRANSACTION",
            Self::NoProcessingInputs => "NO_PROCESSING_INPUTS",
            Self::NonPositiveQuantity { .. } => "NON_POSITIVE_QUANTITY",
            Self::NoInventoryAvailable { .. } => "NO_INVENTORY_AVAILABLE",
            Self::WeightLossExceedsQuantity { .. } => "WEIGHT_LOSS_EXCEEDS_QUANTITY",
            Self::InsufficientInventory { .. } => "INSUFFICIENT_INVENTORY",
            Self::Ledger(err) => err.error_code(),
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

impl From<InventoryError> for AppError {
    fn from(err: InventoryError) -> Self {
        Self::from_kind(err.kind(), err.to_string())
    }
}
