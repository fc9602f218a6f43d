//! Customer ledger logic.
//!
//! This module implements the stock and payment ledger:
//! - Transaction types and inputs
//! - Running balance calculation
//! - Payment allocation over outstanding stock
//! - The per-customer ledger aggregate
//! - Transaction filters and payment insights
//! - Error types for ledger operations

pub mod allocation;
pub mod balance;
pub mod book;
pub mod error;
pub mod insights;
pub mod types;

#[cfg(test)]
mod book_props;

pub use allocation::{AllocationPlan, PaymentAllocator, PlannedAllocation};
pub use balance::{CustomerBalance, RunningBalanceCalculator, available_advance};
pub use book::{CustomerLedger, LedgerChanges, PaymentOutcome};
pub use error::LedgerError;
pub use insights::{MethodTotal, PaymentInsights, TransactionFilter};
pub use types::{
    AllocationRequest, AppliedAllocation, ManualAllocation, NewPaymentTransaction,
    NewStockTransaction, PaymentMethod, PaymentStatus, StockFigures, Transaction,
    TransactionDetail, TransactionKind,
};
