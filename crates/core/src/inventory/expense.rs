//! Expense adjuster.
//!
//! Applies weight loss and expenditure to a position. The result depends only
//! on the position state and the expense parameters, which is what lets a
//! rebuild replay stored expense records.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tally_shared::types::ExpenseRecordId;
use tally_shared::types::money::{round_money, round_quantity};

use super::error::InventoryError;
use super::types::{ExpenseInput, InventoryExpenseRecord, InventoryPosition};

/// Expense adjuster.
pub struct ExpenseAdjuster;

impl ExpenseAdjuster {
    /// Checks an expense against a position without touching it.
    ///
    /// Returns the weight loss at quantity scale and the expenditure at money
    /// scale; those are the figures that get applied and recorded.
    ///
    /// # Errors
    ///
    /// Returns an error for negative expenses, expenses that round to
    /// nothing, and weight loss that the position cannot cover.
    pub fn check(
        position: &InventoryPosition,
        input: &ExpenseInput,
    ) -> Result<(Decimal, Decimal), InventoryError> {
        if input.weight_loss < Decimal::ZERO {
            return Err(InventoryError::NegativeValue {
                field: "weight_loss",
                value: input.weight_loss,
            });
        }
        if input.expenditure < Decimal::ZERO {
            return Err(InventoryError::NegativeValue {
                field: "expenditure",
                value: input.expenditure,
            });
        }
        let weight_loss = round_quantity(input.weight_loss);
        let expenditure = round_money(input.expenditure);
        if weight_loss.is_zero() && expenditure.is_zero() {
            return Err(InventoryError::EmptyExpense);
        }

        if weight_loss > Decimal::ZERO {
            if position.quantity <= Decimal::ZERO {
                return Err(InventoryError::NoInventoryAvailable {
                    customer_id: position.customer_id,
                    quality_type: position.quality_type.clone(),
                });
            }
            if weight_loss > position.quantity {
                return Err(InventoryError::WeightLossExceedsQuantity {
                    quality_type: position.quality_type.clone(),
                    weight_loss,
                    available: position.quantity,
                });
            }
        }

        Ok((weight_loss, expenditure))
    }

    /// Applies an expense and returns its audit record.
    ///
    /// 1. Weight loss removes quantity and the same share of total cost.
    /// 2. Expenditure is added to total cost unless it is a processing cost.
    /// 3. The average cost follows from the new quantity and total cost.
    ///
    /// `recorded_at` becomes the record's timestamp; replays pass the
    /// original one.
    ///
    /// # Errors
    ///
    /// See [`ExpenseAdjuster::check`]. On error the position is unchanged.
    pub fn apply(
        position: &mut InventoryPosition,
        input: &ExpenseInput,
        recorded_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<InventoryExpenseRecord, InventoryError> {
        let (weight_loss, expenditure) = Self::check(position, input)?;

        let old_quantity = position.quantity;
        let old_avg_cost = position.avg_cost();

        if weight_loss > Decimal::ZERO {
            let removed_cost = if weight_loss == position.quantity {
                position.total_cost
            } else {
                round_money(position.total_cost * weight_loss / position.quantity)
            };
            position.total_cost -= removed_cost;
            position.quantity = round_quantity(position.quantity - weight_loss);
        }

        if expenditure > Decimal::ZERO && !input.is_processing {
            position.total_cost = round_money(position.total_cost + expenditure);
        }
        position.updated_at = now;

        Ok(InventoryExpenseRecord {
            id: ExpenseRecordId::new(),
            position_id: position.id,
            customer_id: position.customer_id,
            quality_type: position.quality_type.clone(),
            weight_loss,
            expenditure,
            is_processing: input.is_processing,
            old_quantity,
            new_quantity: position.quantity,
            old_avg_cost,
            new_avg_cost: position.avg_cost(),
            notes: input.notes.clone(),
            created_by: input.created_by.clone(),
            created_at: recorded_at,
        })
    }
}
