//! Shared types, errors, and configuration for Tally.
//!
//! This crate provides common types used across all other crates:
//! - Fixed-point rounding rules for money, quantities and unit costs
//! - Typed IDs for type-safe entity references
//! - Ledger policy enums (allocation order, backdate handling)
//! - Pagination types for list queries
//! - Application-wide error taxonomy
//! - Configuration management

pub mod config;
pub mod error;
pub mod types;

pub use config::AppConfig;
pub use error::{AppError, AppResult, ErrorKind};
