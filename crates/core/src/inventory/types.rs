//! Inventory domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::money::unit_cost;
use tally_shared::types::{CustomerId, ExpenseRecordId, InventoryPositionId, TransactionId};

/// Inventory held for one `(customer, quality_type)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryPosition {
    /// Unique identifier.
    pub id: InventoryPositionId,
    /// Owning customer.
    pub customer_id: CustomerId,
    /// Quality grade.
    pub quality_type: String,
    /// Quantity on hand.
    pub quantity: Decimal,
    /// Cost basis of the quantity on hand.
    pub total_cost: Decimal,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last mutation time.
    pub updated_at: DateTime<Utc>,
}

impl InventoryPosition {
    /// Creates an empty position.
    #[must_use]
    pub fn empty(customer_id: CustomerId, quality_type: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: InventoryPositionId::new(),
            customer_id,
            quality_type: quality_type.into(),
            quantity: Decimal::ZERO,
            total_cost: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    /// Weighted average cost per unit, always derived from quantity and total cost.
    #[must_use]
    pub fn avg_cost(&self) -> Decimal {
        unit_cost(self.total_cost, self.quantity)
    }

    /// Returns true if the position belongs to the given key.
    #[must_use]
    pub fn is_for(&self, customer_id: CustomerId, quality_type: &str) -> bool {
        self.customer_id == customer_id && self.quality_type == quality_type
    }
}

/// Parameters of an inventory expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseInput {
    /// Customer owning the position.
    pub customer_id: CustomerId,
    /// Quality grade of the position.
    pub quality_type: String,
    /// Quantity lost (>= 0).
    pub weight_loss: Decimal,
    /// Money spent (>= 0).
    pub expenditure: Decimal,
    /// Processing costs are recorded but stay out of the cost basis.
    pub is_processing: bool,
    /// Optional notes.
    pub notes: Option<String>,
    /// Actor applying the expense.
    pub created_by: String,
}

/// Audit record of one applied expense. Never mutated once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryExpenseRecord {
    /// Unique identifier.
    pub id: ExpenseRecordId,
    /// Position the expense was applied to.
    pub position_id: InventoryPositionId,
    /// Customer owning the position.
    pub customer_id: CustomerId,
    /// Quality grade of the position.
    pub quality_type: String,
    /// Quantity lost.
    pub weight_loss: Decimal,
    /// Money spent.
    pub expenditure: Decimal,
    /// Processing flag.
    pub is_processing: bool,
    /// Quantity before.
    pub old_quantity: Decimal,
    /// Quantity after.
    pub new_quantity: Decimal,
    /// Average cost before.
    pub old_avg_cost: Decimal,
    /// Average cost after.
    pub new_avg_cost: Decimal,
    /// Notes.
    pub notes: Option<String>,
    /// Actor.
    pub created_by: String,
    /// When the expense was first applied; kept across replays.
    pub created_at: DateTime<Utc>,
}

impl InventoryExpenseRecord {
    /// The original parameters, for replay.
    #[must_use]
    pub fn to_input(&self) -> ExpenseInput {
        ExpenseInput {
            customer_id: self.customer_id,
            quality_type: self.quality_type.clone(),
            weight_loss: self.weight_loss,
            expenditure: self.expenditure,
            is_processing: self.is_processing,
            notes: self.notes.clone(),
            created_by: self.created_by.clone(),
        }
    }
}

/// Customer and quality type restriction of a rebuild. `None` means all.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildScope {
    /// Only this customer.
    pub customer_id: Option<CustomerId>,
    /// Only this quality type.
    pub quality_type: Option<String>,
}

impl RebuildScope {
    /// Returns true if the key lies inside the scope.
    #[must_use]
    pub fn contains(&self, customer_id: CustomerId, quality_type: &str) -> bool {
        self.customer_id.is_none_or(|c| c == customer_id)
            && self.quality_type.as_deref().is_none_or(|q| q == quality_type)
    }
}

/// Rebuild switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildOptions {
    /// Delete expense records and positions in scope before rebuilding.
    pub clear: bool,
    /// Replay the scope's expense records on the rebuilt positions.
    pub reapply_expenses: bool,
}

/// An expense record that could not be replayed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedExpense {
    /// The original record.
    pub record_id: ExpenseRecordId,
    /// Its customer.
    pub customer_id: CustomerId,
    /// Its quality type.
    pub quality_type: String,
    /// Why it was skipped.
    pub reason: String,
}

/// Summary of a rebuild.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebuildReport {
    /// Positions deleted by clearing.
    pub cleared_positions: usize,
    /// Expense records deleted by clearing or replaced by a replay.
    pub cleared_expenses: usize,
    /// Positions created.
    pub created: usize,
    /// Existing positions overwritten.
    pub updated: usize,
    /// Expense records replayed.
    pub applied: usize,
    /// Expense records that could not be replayed.
    pub skipped: Vec<SkippedExpense>,
}

/// Rows touched by an inventory operation, for persistence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InventoryChanges {
    /// Expense records to delete (applied first).
    pub deleted_expenses: Vec<ExpenseRecordId>,
    /// Positions to delete.
    pub deleted_positions: Vec<InventoryPositionId>,
    /// Positions to insert or overwrite.
    pub upserted_positions: Vec<InventoryPositionId>,
    /// Expense records to insert.
    pub inserted_expenses: Vec<ExpenseRecordId>,
}

impl InventoryChanges {
    /// Notes a position write once.
    pub fn upsert(&mut self, id: InventoryPositionId) {
        if !self.upserted_positions.contains(&id) {
            self.upserted_positions.push(id);
        }
    }

    /// Merges the changes of a later step.
    pub fn absorb(&mut self, other: Self) {
        self.deleted_expenses.extend(other.deleted_expenses);
        self.deleted_positions.extend(other.deleted_positions);
        for id in other.upserted_positions {
            self.upsert(id);
        }
        self.inserted_expenses.extend(other.inserted_expenses);
    }
}

/// One input consumed by processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingInputLine {
    /// Input quality grade.
    pub quality_type: String,
    /// Quantity consumed.
    pub quantity: Decimal,
}

/// Conversion of input qualities into one output quality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingInput {
    /// Customer owning all positions.
    pub customer_id: CustomerId,
    /// Inputs consumed.
    pub inputs: Vec<ProcessingInputLine>,
    /// Output quality grade.
    pub output_quality_type: String,
    /// Output quantity produced.
    pub output_quantity: Decimal,
    /// Output rate per unit.
    pub output_rate: Decimal,
    /// Processing cost, recorded against the output position.
    pub processing_cost: Decimal,
    /// Optional notes.
    pub notes: Option<String>,
    /// Actor.
    pub created_by: String,
}

/// Everything produced by one processing run.
#[derive(Debug, Clone)]
pub struct ProcessingOutcome {
    /// Weight-loss records of the inputs.
    pub input_records: Vec<InventoryExpenseRecord>,
    /// Stock transaction for the output.
    pub output_transaction_id: TransactionId,
    /// Processing cost record, if any cost was given.
    pub cost_record: Option<InventoryExpenseRecord>,
    /// Output position after processing.
    pub output_position: InventoryPosition,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_avg_cost_is_derived() {
        let mut position = InventoryPosition::empty(CustomerId::new(), "A", Utc::now());
        assert_eq!(position.avg_cost(), Decimal::ZERO);
        position.quantity = dec!(15);
        position.total_cost = dec!(160);
        assert_eq!(position.avg_cost(), dec!(10.667));
    }

    #[test]
    fn test_scope_contains() {
        let customer = CustomerId::new();
        assert!(RebuildScope::default().contains(customer, "A"));

        let scoped = RebuildScope {
            customer_id: Some(customer),
            quality_type: Some("A".to_string()),
        };
        assert!(scoped.contains(customer, "A"));
        assert!(!scoped.contains(customer, "B"));
        assert!(!scoped.contains(CustomerId::new(), "A"));
    }

    #[test]
    fn test_changes_absorb_dedupes_positions() {
        let id = InventoryPositionId::new();
        let mut changes = InventoryChanges::default();
        changes.upsert(id);
        let mut later = InventoryChanges::default();
        later.upsert(id);
        later.inserted_expenses.push(ExpenseRecordId::new());
        changes.absorb(later);
        assert_eq!(changes.upserted_positions, vec![id]);
        assert_eq!(changes.inserted_expenses.len(), 1);
    }
}
