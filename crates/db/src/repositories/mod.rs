//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.

pub mod customer;
pub mod error;
pub mod inventory;
pub mod ledger;
mod locking;
mod mapping;

pub use customer::CustomerRepository;
pub use error::RepositoryError;
pub use inventory::InventoryRepository;
pub use ledger::{BulkPaymentEntry, BulkPaymentResult, LedgerRepository, RecordedStock};
