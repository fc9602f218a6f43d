//! Inventory processing.
//!
//! Converts quantities of input qualities into an output quality. Inputs are
//! consumed as processing weight loss, the output is bought in as stock, and
//! the processing cost is recorded against the output position without
//! entering its cost basis.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tally_shared::types::money::{round_money, round_quantity};

use super::book::InventoryBook;
use super::error::InventoryError;
use super::types::{ExpenseInput, InventoryChanges, ProcessingInput, ProcessingOutcome};
use crate::ledger::{CustomerLedger, LedgerChanges, NewStockTransaction};

/// Runs a processing job against a customer's ledger and inventory.
///
/// Everything is validated before the first mutation; on error neither the
/// ledger nor the book changes.
///
/// # Errors
///
/// Returns an error for empty or non-positive inputs, unknown input
/// positions, inputs exceeding the quantity on hand, or an invalid output.
pub fn process_inventory(
    ledger: &mut CustomerLedger,
    book: &mut InventoryBook,
    input: ProcessingInput,
    now: DateTime<Utc>,
) -> Result<(ProcessingOutcome, LedgerChanges, InventoryChanges), InventoryError> {
    if input.inputs.is_empty() {
        return Err(InventoryError::NoProcessingInputs);
    }
    let output_quality = input.output_quality_type.trim().to_string();
    if output_quality.is_empty() {
        return Err(InventoryError::BlankQualityType);
    }
    let output_quantity = round_quantity(input.output_quantity);
    if output_quantity <= Decimal::ZERO {
        return Err(InventoryError::NonPositiveQuantity {
            quality_type: output_quality,
            quantity: input.output_quantity,
        });
    }
    if input.processing_cost < Decimal::ZERO {
        return Err(InventoryError::NegativeValue {
            field: "processing_cost",
            value: input.processing_cost,
        });
    }
    let processing_cost = round_money(input.processing_cost);

    // Same quality listed twice consumes the sum.
    let mut lines = Vec::with_capacity(input.inputs.len());
    let mut requested: BTreeMap<String, Decimal> = BTreeMap::new();
    for line in &input.inputs {
        let quality_type = line.quality_type.trim();
        if quality_type.is_empty() {
            return Err(InventoryError::BlankQualityType);
        }
        let quantity = round_quantity(line.quantity);
        if quantity <= Decimal::ZERO {
            return Err(InventoryError::NonPositiveQuantity {
                quality_type: quality_type.to_string(),
                quantity: line.quantity,
            });
        }
        *requested.entry(quality_type.to_string()).or_default() += quantity;
        lines.push((quality_type.to_string(), quantity));
    }
    for (quality_type, quantity) in &requested {
        let position = book.position(input.customer_id, quality_type).ok_or_else(|| {
            InventoryError::PositionNotFound {
                customer_id: input.customer_id,
                quality_type: quality_type.clone(),
            }
        })?;
        if *quantity > position.quantity {
            return Err(InventoryError::InsufficientInventory {
                quality_type: quality_type.clone(),
                requested: *quantity,
                available: position.quantity,
            });
        }
    }

    let mut next_ledger = ledger.clone();
    let mut next_book = book.clone();
    let mut inventory_changes = InventoryChanges::default();

    let mut input_records = Vec::with_capacity(lines.len());
    for (quality_type, quantity) in lines {
        let expense = ExpenseInput {
            customer_id: input.customer_id,
            quality_type,
            weight_loss: quantity,
            expenditure: Decimal::ZERO,
            is_processing: true,
            notes: Some(format!("Processing input for {output_quality}")),
            created_by: input.created_by.clone(),
        };
        let (record, changes) = next_book.apply_expense(&expense, now)?;
        inventory_changes.absorb(changes);
        input_records.push(record);
    }

    let (output_tx, ledger_changes) = next_ledger.record_stock(
        NewStockTransaction {
            customer_id: input.customer_id,
            quality_type: output_quality.clone(),
            quantity: output_quantity,
            rate: input.output_rate,
            total: None,
            occurred_at: None,
            notes: input.notes.clone(),
            created_by: input.created_by.clone(),
        },
        now,
    )?;
    let (_, changes) = next_book.receive_stock(&output_tx, now)?;
    inventory_changes.absorb(changes);

    let cost_record = if processing_cost > Decimal::ZERO {
        let expense = ExpenseInput {
            customer_id: input.customer_id,
            quality_type: output_quality.clone(),
            weight_loss: Decimal::ZERO,
            expenditure: processing_cost,
            is_processing: true,
            notes: Some(input.notes.clone().unwrap_or_else(|| "Processing cost".to_string())),
            created_by: input.created_by.clone(),
        };
        let (record, changes) = next_book.apply_expense(&expense, now)?;
        inventory_changes.absorb(changes);
        Some(record)
    } else {
        None
    };

    let output_position = next_book
        .position(input.customer_id, &output_quality)
        .cloned()
        .ok_or(InventoryError::PositionNotFound {
            customer_id: input.customer_id,
            quality_type: output_quality,
        })?;

    *ledger = next_ledger;
    *book = next_book;

    Ok((
        ProcessingOutcome {
            input_records,
            output_transaction_id: output_tx.id,
            cost_record,
            output_position,
        },
        ledger_changes,
        inventory_changes,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::types::ProcessingInputLine;
    use crate::ledger::TransactionKind;
    use rust_decimal_macros::dec;
    use tally_shared::types::{BackdatePolicy, CustomerId};

    fn setup() -> (CustomerLedger, InventoryBook) {
        let customer = CustomerId::new();
        let mut ledger = CustomerLedger::new(customer, vec![], BackdatePolicy::Cascade);
        let mut book = InventoryBook::default();
        for (quality, quantity, rate) in [("Raw A", dec!(10), dec!(10)), ("Raw B", dec!(5), dec!(20))] {
            let (tx, _) = ledger
                .record_stock(
                    NewStockTransaction {
                        customer_id: customer,
                        quality_type: quality.to_string(),
                        quantity,
                        rate,
                        total: None,
                        occurred_at: None,
                        notes: None,
                        created_by: "clerk".to_string(),
                    },
                    Utc::now(),
                )
                .unwrap();
            book.receive_stock(&tx, Utc::now()).unwrap();
        }
        (ledger, book)
    }

    fn job(ledger: &CustomerLedger, a: Decimal, b: Decimal, cost: Decimal) -> ProcessingInput {
        ProcessingInput {
            customer_id: ledger.customer_id(),
            inputs: vec![
                ProcessingInputLine {
                    quality_type: "Raw A".to_string(),
                    quantity: a,
                },
                ProcessingInputLine {
                    quality_type: "Raw B".to_string(),
                    quantity: b,
                },
            ],
            output_quality_type: "Blend".to_string(),
            output_quantity: dec!(12),
            output_rate: dec!(15),
            processing_cost: cost,
            notes: None,
            created_by: "clerk".to_string(),
        }
    }

    #[test]
    fn test_processing_consumes_inputs_and_records_output() {
        let (mut ledger, mut book) = setup();
        let customer = ledger.customer_id();
        let input = job(&ledger, dec!(8), dec!(4), dec!(30));

        let (outcome, ledger_changes, changes) =
            process_inventory(&mut ledger, &mut book, input, Utc::now()).unwrap();

        assert_eq!(outcome.input_records.len(), 2);
        assert!(outcome.input_records.iter().all(|r| r.is_processing));
        assert_eq!(book.position(customer, "Raw A").unwrap().quantity, dec!(2));
        assert_eq!(book.position(customer, "Raw B").unwrap().quantity, dec!(1));

        let output = ledger.get(outcome.output_transaction_id).unwrap();
        assert_eq!(output.kind(), TransactionKind::Stock);
        assert_eq!(output.total, dec!(180));
        assert_eq!(ledger_changes.inserted, vec![output.id]);

        // Processing cost is audited but stays out of the cost basis.
        assert_eq!(outcome.output_position.quantity, dec!(12));
        assert_eq!(outcome.output_position.total_cost, dec!(180));
        assert_eq!(outcome.cost_record.unwrap().expenditure, dec!(30));
        assert_eq!(changes.inserted_expenses.len(), 3);
        assert_eq!(book.customer_expenses(customer).len(), 3);
    }

    #[test]
    fn test_processing_rejects_before_mutating() {
        let (mut ledger, mut book) = setup();
        let customer = ledger.customer_id();
        let before_tx = ledger.transactions().len();
        let input = job(&ledger, dec!(8), dec!(6), Decimal::ZERO);

        let err = process_inventory(&mut ledger, &mut book, input, Utc::now()).unwrap_err();
        assert!(matches!(err, InventoryError::InsufficientInventory { .. }));
        assert_eq!(ledger.transactions().len(), before_tx);
        assert_eq!(book.position(customer, "Raw A").unwrap().quantity, dec!(10));
        assert!(book.expenses().is_empty());
    }

    #[test]
    fn test_processing_sums_repeated_inputs() {
        let (mut ledger, mut book) = setup();
        let mut input = job(&ledger, dec!(6), dec!(1), Decimal::ZERO);
        input.inputs.push(ProcessingInputLine {
            quality_type: "Raw A".to_string(),
            quantity: dec!(6),
        });

        assert!(matches!(
            process_inventory(&mut ledger, &mut book, input, Utc::now()),
            Err(InventoryError::InsufficientInventory { .. })
        ));
    }

    #[test]
    fn test_processing_figures_are_rounded_to_column_scale() {
        let (mut ledger, mut book) = setup();
        let customer = ledger.customer_id();
        let mut input = job(&ledger, dec!(1.004), dec!(0.996), dec!(2.499));
        input.output_quantity = dec!(1.996);

        let (outcome, _, _) = process_inventory(&mut ledger, &mut book, input, Utc::now()).unwrap();

        assert_eq!(outcome.input_records[0].weight_loss, dec!(1.00));
        assert_eq!(outcome.input_records[1].weight_loss, dec!(1.00));
        assert_eq!(book.position(customer, "Raw A").unwrap().quantity, dec!(9));
        assert_eq!(outcome.output_position.quantity, dec!(2.00));
        assert_eq!(outcome.cost_record.unwrap().expenditure, dec!(2.50));

        let mut dust = job(&ledger, dec!(0.004), dec!(1), Decimal::ZERO);
        dust.inputs.truncate(1);
        assert!(matches!(
            process_inventory(&mut ledger, &mut book, dust, Utc::now()),
            Err(InventoryError::NonPositiveQuantity { .. })
        ));
    }

    #[test]
    fn test_processing_unknown_input_position() {
        let (mut ledger, mut book) = setup();
        let mut input = job(&ledger, dec!(1), dec!(1), Decimal::ZERO);
        input.inputs[0].quality_type = "Raw Z".to_string();
        assert!(matches!(
            process_inventory(&mut ledger, &mut book, input, Utc::now()),
            Err(InventoryError::PositionNotFound { .. })
        ));
    }
}
