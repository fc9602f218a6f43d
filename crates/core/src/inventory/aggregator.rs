//! Inventory aggregator.
//!
//! Folds stock transactions into per `(customer, quality_type)` totals. The
//! cost side uses each transaction's authoritative `total`, not
//! `quantity × rate`, so total overrides are respected.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tally_shared::types::CustomerId;

use super::types::RebuildScope;
use crate::ledger::Transaction;

/// Quantity and cost folded from stock transactions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StockTotals {
    /// Σ quantity.
    pub quantity: Decimal,
    /// Σ total.
    pub total_cost: Decimal,
}

/// Grouping key.
pub type PositionKey = (CustomerId, String);

/// Inventory aggregator.
pub struct InventoryAggregator;

impl InventoryAggregator {
    /// Groups the stock transactions inside `scope` by customer and quality type.
    ///
    /// Payments and stock without a quality type are ignored.
    #[must_use]
    pub fn fold<'a, I>(transactions: I, scope: &RebuildScope) -> BTreeMap<PositionKey, StockTotals>
    where
        I: IntoIterator<Item = &'a Transaction>,
    {
        let mut groups: BTreeMap<PositionKey, StockTotals> = BTreeMap::new();

        for tx in transactions {
            let (Some(quality_type), Some(quantity)) = (tx.quality_type(), tx.quantity()) else {
                continue;
            };
            if quality_type.is_empty() || !scope.contains(tx.customer_id, quality_type) {
                continue;
            }
            let totals = groups
                .entry((tx.customer_id, quality_type.to_string()))
                .or_default();
            totals.quantity += quantity;
            totals.total_cost += tx.total;
        }

        groups
    }
}
