//! Inventory repository: rebuilds, expenses, processing and position views.

use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DatabaseTransaction, EntityTrait,
    QueryFilter, QueryOrder,
};
use tally_core::inventory::{
    ExpenseInput, InventoryBook, InventoryChanges, InventoryExpenseRecord, InventoryPosition,
    ProcessingInput, ProcessingOutcome, RebuildOptions, RebuildReport, RebuildScope,
    process_inventory,
};
use tally_shared::config::LedgerConfig;
use tally_shared::types::CustomerId;
use tracing::{info, warn};

use super::error::RepositoryError;
use super::ledger::{ensure_customer, load_ledger, load_stock, persist_ledger};
use super::locking::{begin, lock_customer, lock_customers};
use super::mapping;
use crate::entities::{inventory_expenses, inventory_positions};

/// Inventory repository.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    db: DatabaseConnection,
    config: LedgerConfig,
}

impl InventoryRepository {
    /// Creates a new inventory repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, config: LedgerConfig) -> Self {
        Self { db, config }
    }

    /// Rebuilds positions from stock transactions.
    ///
    /// Every customer in scope is locked for the whole rebuild, so no stock
    /// or expense can land in between the delete and the recompute.
    /// Expenses that no longer fit are skipped and reported.
    pub async fn rebuild(
        &self,
        scope: RebuildScope,
        options: RebuildOptions,
    ) -> Result<RebuildReport, RepositoryError> {
        let scope = RebuildScope {
            customer_id: scope.customer_id,
            quality_type: scope
                .quality_type
                .map(|q| q.trim().to_string())
                .filter(|q| !q.is_empty()),
        };

        let txn = begin(&self.db).await?;
        let locked = lock_customers(&txn, scope.customer_id).await?;

        let stock = load_stock(&txn, &scope).await?;
        let mut book = load_book(&txn, &scope, true).await?;
        let (report, changes) = book.rebuild(&stock, &scope, options, Utc::now());
        persist_inventory(&txn, &book, &changes).await?;

        txn.commit().await?;

        for skipped in &report.skipped {
            warn!(
                expense_id = %skipped.record_id,
                customer_id = %skipped.customer_id,
                quality_type = %skipped.quality_type,
                reason = %skipped.reason,
                "Skipped expense during inventory rebuild"
            );
        }
        info!(
            customers = locked.len(),
            cleared_positions = report.cleared_positions,
            cleared_expenses = report.cleared_expenses,
            created = report.created,
            updated = report.updated,
            applied = report.applied,
            skipped = report.skipped.len(),
            "Inventory rebuilt"
        );
        Ok(report)
    }

    /// Applies weight loss and expenditure to a position.
    pub async fn apply_expense(
        &self,
        input: ExpenseInput,
    ) -> Result<InventoryExpenseRecord, RepositoryError> {
        let txn = begin(&self.db).await?;
        lock_customer(&txn, input.customer_id).await?;

        let scope = RebuildScope {
            customer_id: Some(input.customer_id),
            quality_type: Some(input.quality_type.trim().to_string()),
        };
        let mut book = load_book(&txn, &scope, false).await?;
        let (record, changes) = book.apply_expense(&input, Utc::now())?;
        persist_inventory(&txn, &book, &changes).await?;

        txn.commit().await?;

        info!(
            customer_id = %record.customer_id,
            expense_id = %record.id,
            quality_type = %record.quality_type,
            weight_loss = %record.weight_loss,
            amount = %record.expenditure,
            new_quantity = %record.new_quantity,
            "Inventory expense applied"
        );
        Ok(record)
    }

    /// Converts input qualities into an output quality.
    ///
    /// Inputs, the output stock transaction and the processing cost are
    /// written together or not at all.
    pub async fn process(
        &self,
        input: ProcessingInput,
    ) -> Result<ProcessingOutcome, RepositoryError> {
        let customer_id = input.customer_id;
        let txn = begin(&self.db).await?;
        lock_customer(&txn, customer_id).await?;

        let mut ledger = load_ledger(&txn, customer_id, self.config.backdate_policy).await?;
        let scope = RebuildScope {
            customer_id: Some(customer_id),
            quality_type: None,
        };
        let mut book = load_book(&txn, &scope, false).await?;

        let (outcome, ledger_changes, inventory_changes) =
            process_inventory(&mut ledger, &mut book, input, Utc::now())?;
        persist_ledger(&txn, &ledger, &ledger_changes).await?;
        persist_inventory(&txn, &book, &inventory_changes).await?;

        txn.commit().await?;

        info!(
            customer_id = %customer_id,
            transaction_id = %outcome.output_transaction_id,
            inputs = outcome.input_records.len(),
            output_quality = %outcome.output_position.quality_type,
            "Inventory processed"
        );
        Ok(outcome)
    }

    /// All positions, by customer then quality type.
    pub async fn list_positions(&self) -> Result<Vec<InventoryPosition>, RepositoryError> {
        let models = inventory_positions::Entity::find()
            .order_by_asc(inventory_positions::Column::CustomerId)
            .order_by_asc(inventory_positions::Column::QualityType)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(mapping::position).collect())
    }

    /// A customer's positions by quality type.
    pub async fn customer_positions(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<InventoryPosition>, RepositoryError> {
        ensure_customer(&self.db, customer_id).await?;
        let models = inventory_positions::Entity::find()
            .filter(inventory_positions::Column::CustomerId.eq(customer_id.into_inner()))
            .order_by_asc(inventory_positions::Column::QualityType)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(mapping::position).collect())
    }

    /// A customer's expense records, newest first.
    pub async fn customer_expenses(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<InventoryExpenseRecord>, RepositoryError> {
        ensure_customer(&self.db, customer_id).await?;
        let models = inventory_expenses::Entity::find()
            .filter(inventory_expenses::Column::CustomerId.eq(customer_id.into_inner()))
            .order_by_desc(inventory_expenses::Column::CreatedAt)
            .order_by_desc(inventory_expenses::Column::Id)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(mapping::expense).collect())
    }
}

/// Loads the positions of `scope`, and its expense records when asked.
pub(crate) async fn load_book(
    txn: &DatabaseTransaction,
    scope: &RebuildScope,
    with_expenses: bool,
) -> Result<InventoryBook, RepositoryError> {
    let mut positions = inventory_positions::Entity::find();
    if let Some(customer_id) = scope.customer_id {
        positions =
            positions.filter(inventory_positions::Column::CustomerId.eq(customer_id.into_inner()));
    }
    if let Some(quality_type) = &scope.quality_type {
        positions =
            positions.filter(inventory_positions::Column::QualityType.eq(quality_type.as_str()));
    }
    let positions = positions.all(txn).await?;

    let expenses = if with_expenses {
        let mut query = inventory_expenses::Entity::find();
        if let Some(customer_id) = scope.customer_id {
            query =
                query.filter(inventory_expenses::Column::CustomerId.eq(customer_id.into_inner()));
        }
        if let Some(quality_type) = &scope.quality_type {
            query = query.filter(inventory_expenses::Column::QualityType.eq(quality_type.as_str()));
        }
        query.all(txn).await?
    } else {
        Vec::new()
    };

    Ok(InventoryBook::new(
        positions.into_iter().map(mapping::position).collect(),
        expenses.into_iter().map(mapping::expense).collect(),
    ))
}

/// Writes an inventory change set: deletions, then position upserts, then
/// new expense records.
pub(crate) async fn persist_inventory(
    txn: &DatabaseTransaction,
    book: &InventoryBook,
    changes: &InventoryChanges,
) -> Result<(), RepositoryError> {
    if !changes.deleted_expenses.is_empty() {
        inventory_expenses::Entity::delete_many()
            .filter(
                inventory_expenses::Column::Id
                    .is_in(changes.deleted_expenses.iter().map(|id| id.into_inner())),
            )
            .exec(txn)
            .await?;
    }
    if !changes.deleted_positions.is_empty() {
        inventory_positions::Entity::delete_many()
            .filter(
                inventory_positions::Column::Id
                    .is_in(changes.deleted_positions.iter().map(|id| id.into_inner())),
            )
            .exec(txn)
            .await?;
    }

    for id in &changes.upserted_positions {
        let Some(position) = book.positions().iter().find(|p| p.id == *id) else {
            continue;
        };
        inventory_positions::Entity::insert(mapping::position_row(position))
            .on_conflict(
                OnConflict::column(inventory_positions::Column::Id)
                    .update_columns([
                        inventory_positions::Column::Quantity,
                        inventory_positions::Column::TotalCost,
                        inventory_positions::Column::AvgCost,
                        inventory_positions::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(txn)
            .await?;
    }

    for id in &changes.inserted_expenses {
        if let Some(record) = book.expenses().iter().find(|e| e.id == *id) {
            mapping::expense_row(record).insert(txn).await?;
        }
    }

    Ok(())
}
