//! `SeaORM` entity definitions.

pub mod bank_accounts;
pub mod customers;
pub mod inventory_expenses;
pub mod inventory_positions;
pub mod sea_orm_active_enums;
pub mod transactions;

pub mod prelude {
    //! Entity re-exports.

    pub use super::bank_accounts::Entity as BankAccounts;
    pub use super::customers::Entity as Customers;
    pub use super::inventory_expenses::Entity as InventoryExpenses;
    pub use super::inventory_positions::Entity as InventoryPositions;
    pub use super::transactions::Entity as Transactions;
}
