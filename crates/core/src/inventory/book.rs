//! Inventory book.
//!
//! [`InventoryBook`] holds the positions and expense records of a scope and
//! runs every inventory mutation: folding new stock, applying expenses and
//! the rebuild pipeline (clear, recompute, replay).

use chrono::{DateTime, Utc};
use tally_shared::types::CustomerId;

use super::aggregator::InventoryAggregator;
use super::error::InventoryError;
use super::expense::ExpenseAdjuster;
use super::types::{
    ExpenseInput, InventoryChanges, InventoryExpenseRecord, InventoryPosition, RebuildOptions,
    RebuildReport, RebuildScope, SkippedExpense,
};
use crate::ledger::Transaction;

/// Positions and expense records of one scope.
#[derive(Debug, Clone, Default)]
pub struct InventoryBook {
    positions: Vec<InventoryPosition>,
    expenses: Vec<InventoryExpenseRecord>,
}

impl InventoryBook {
    /// Wraps stored positions and expense records.
    #[must_use]
    pub fn new(positions: Vec<InventoryPosition>, mut expenses: Vec<InventoryExpenseRecord>) -> Self {
        expenses.sort_by_key(|e| (e.created_at, e.id));
        Self {
            positions,
            expenses,
        }
    }

    /// All positions.
    #[must_use]
    pub fn positions(&self) -> &[InventoryPosition] {
        &self.positions
    }

    /// All expense records, oldest first.
    #[must_use]
    pub fn expenses(&self) -> &[InventoryExpenseRecord] {
        &self.expenses
    }

    /// Position for a key.
    #[must_use]
    pub fn position(&self, customer_id: CustomerId, quality_type: &str) -> Option<&InventoryPosition> {
        self.positions
            .iter()
            .find(|p| p.is_for(customer_id, quality_type))
    }

    /// A customer's positions.
    pub fn customer_positions(
        &self,
        customer_id: CustomerId,
    ) -> impl Iterator<Item = &InventoryPosition> {
        self.positions
            .iter()
            .filter(move |p| p.customer_id == customer_id)
    }

    /// A customer's expense records, newest first.
    #[must_use]
    pub fn customer_expenses(&self, customer_id: CustomerId) -> Vec<&InventoryExpenseRecord> {
        self.expenses
            .iter()
            .rev()
            .filter(|e| e.customer_id == customer_id)
            .collect()
    }

    /// Folds one new stock transaction into its position, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is not stock.
    pub fn receive_stock(
        &mut self,
        tx: &Transaction,
        now: DateTime<Utc>,
    ) -> Result<(InventoryPosition, InventoryChanges), InventoryError> {
        let (Some(quality_type), Some(quantity)) = (tx.quality_type(), tx.quantity()) else {
            return Err(InventoryError::NotAStockTransaction(tx.id));
        };

        let index = self.position_index_or_create(tx.customer_id, quality_type, now);
        let position = &mut self.positions[index];
        position.quantity += quantity;
        position.total_cost += tx.total;
        position.updated_at = now;

        let mut changes = InventoryChanges::default();
        changes.upsert(position.id);
        Ok((position.clone(), changes))
    }

    /// Applies an expense to an existing position.
    ///
    /// # Errors
    ///
    /// Returns `PositionNotFound` for an unknown key, or the adjuster's
    /// rejection. On error nothing changes.
    pub fn apply_expense(
        &mut self,
        input: &ExpenseInput,
        now: DateTime<Utc>,
    ) -> Result<(InventoryExpenseRecord, InventoryChanges), InventoryError> {
        self.apply_expense_at(input, now, now)
    }

    fn apply_expense_at(
        &mut self,
        input: &ExpenseInput,
        recorded_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<(InventoryExpenseRecord, InventoryChanges), InventoryError> {
        let quality_type = input.quality_type.trim();
        if quality_type.is_empty() {
            return Err(InventoryError::BlankQualityType);
        }
        let position = self
            .positions
            .iter_mut()
            .find(|p| p.is_for(input.customer_id, quality_type))
            .ok_or_else(|| InventoryError::PositionNotFound {
                customer_id: input.customer_id,
                quality_type: quality_type.to_string(),
            })?;

        let record = ExpenseAdjuster::apply(position, input, recorded_at, now)?;

        let mut changes = InventoryChanges::default();
        changes.upsert(position.id);
        changes.inserted_expenses.push(record.id);
        let index = self
            .expenses
            .partition_point(|e| (e.created_at, e.id) <= (record.created_at, record.id));
        self.expenses.insert(index, record.clone());

        Ok((record, changes))
    }

    /// Rebuilds the positions of `scope` from stock transactions.
    ///
    /// `stock` must contain every stock transaction of the scope. Replay
    /// failures are collected in the report instead of aborting the batch.
    pub fn rebuild(
        &mut self,
        stock: &[Transaction],
        scope: &RebuildScope,
        options: RebuildOptions,
        now: DateTime<Utc>,
    ) -> (RebuildReport, InventoryChanges) {
        let mut report = RebuildReport::default();
        let mut changes = InventoryChanges::default();

        let snapshot: Vec<InventoryExpenseRecord> = if options.reapply_expenses {
            self.expenses
                .iter()
                .filter(|e| scope.contains(e.customer_id, &e.quality_type))
                .cloned()
                .collect()
        } else {
            Vec::new()
        };

        // Expense records go first; they reference positions.
        if options.clear || options.reapply_expenses {
            let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.expenses)
                .into_iter()
                .partition(|e| scope.contains(e.customer_id, &e.quality_type));
            self.expenses = kept;
            report.cleared_expenses = removed.len();
            changes
                .deleted_expenses
                .extend(removed.into_iter().map(|e| e.id));
        }
        if options.clear {
            let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.positions)
                .into_iter()
                .partition(|p| scope.contains(p.customer_id, &p.quality_type));
            self.positions = kept;
            report.cleared_positions = removed.len();
            changes
                .deleted_positions
                .extend(removed.into_iter().map(|p| p.id));
        }

        for ((customer_id, quality_type), totals) in InventoryAggregator::fold(stock, scope) {
            let existed = self.position(customer_id, &quality_type).is_some();
            let index = self.position_index_or_create(customer_id, &quality_type, now);
            let position = &mut self.positions[index];
            position.quantity = totals.quantity;
            position.total_cost = totals.total_cost;
            position.updated_at = now;
            changes.upsert(position.id);

            if existed {
                report.updated += 1;
            } else {
                report.created += 1;
            }
        }

        for record in snapshot {
            match self.apply_expense_at(&record.to_input(), record.created_at, now) {
                Ok((_, replayed)) => {
                    report.applied += 1;
                    changes.absorb(replayed);
                }
                Err(err) => report.skipped.push(SkippedExpense {
                    record_id: record.id,
                    customer_id: record.customer_id,
                    quality_type: record.quality_type.clone(),
                    reason: err.to_string(),
                }),
            }
        }

        (report, changes)
    }

    fn position_index_or_create(
        &mut self,
        customer_id: CustomerId,
        quality_type: &str,
        now: DateTime<Utc>,
    ) -> usize {
        if let Some(index) = self
            .positions
            .iter()
            .position(|p| p.is_for(customer_id, quality_type))
        {
            return index;
        }
        self.positions
            .push(InventoryPosition::empty(customer_id, quality_type, now));
        self.positions.len() - 1
    }
}
