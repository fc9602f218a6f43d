//! Customer registry and bank accounts.
//!
//! - Customer records with a tagged tax identifier
//! - Bank accounts with a single default per customer

pub mod bank;
pub mod error;
pub mod types;

pub use bank::{BankAccount, BankAccountBook, BankAccountChanges, NewBankAccount};
pub use error::CustomerError;
pub use types::{Customer, NewCustomer, TaxIdentifier};
