//! Core business logic for Tally.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and calculations live here.
//!
//! # Modules
//!
//! - `ledger` - Stock and payment ledger, running balances and payment allocation
//! - `customer` - Customer registry and bank accounts
//! - `inventory` - Inventory positions, expenses and rebuilds

pub mod customer;
pub mod inventory;
pub mod ledger;
