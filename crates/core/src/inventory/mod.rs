//! Inventory derived from stock movements.
//!
//! This module implements:
//! - Positions per customer and quality type with weighted-average cost
//! - The aggregator folding stock transactions into positions
//! - The expense adjuster (weight loss and expenditure)
//! - The inventory book with the rebuild and replay pipeline
//! - Processing of input qualities into an output quality

pub mod aggregator;
pub mod book;
pub mod error;
pub mod expense;
pub mod processing;
pub mod types;

pub use aggregator::{InventoryAggregator, PositionKey, StockTotals};
pub use book::InventoryBook;
pub use error::InventoryError;
pub use expense::ExpenseAdjuster;
pub use processing::process_inventory;
pub use types::{
    ExpenseInput, InventoryChanges, InventoryExpenseRecord, InventoryPosition, ProcessingInput,
    ProcessingInputLine, ProcessingOutcome, RebuildOptions, RebuildReport, RebuildScope,
    SkippedExpense,
};
