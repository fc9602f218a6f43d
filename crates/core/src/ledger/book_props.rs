//! Property-based tests for CustomerLedger.
//!
//! - Stock settlement: `amount_paid + balance == total` and `balance >= 0`
//! - Balance summary agrees with `Σ stock.total − Σ payment.amount_paid`
//! - Cascaded running balances chain through the whole history

use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use tally_shared::types::{AllocationOrder, BackdatePolicy, CustomerId};

use super::book::CustomerLedger;
use super::types::{
    AllocationRequest, NewPaymentTransaction, NewStockTransaction, PaymentMethod, TransactionKind,
};

/// One generated ledger operation.
#[derive(Debug, Clone)]
enum Op {
    Stock { quantity: Decimal, rate: Decimal },
    Payment { amount: Decimal, order: AllocationOrder },
}

/// Strategy to generate positive amounts (0.01 to 10,000.00).
fn positive_amount() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|cents| Decimal::new(cents, 2))
}

fn order_strategy() -> impl Strategy<Value = AllocationOrder> {
    prop_oneof![
        Just(AllocationOrder::OldestFirst),
        Just(AllocationOrder::SmallestBalanceFirst),
        Just(AllocationOrder::LargestBalanceFirst),
    ]
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        ((1i64..10_000i64), (1i64..50_000i64)).prop_map(|(q, r)| Op::Stock {
            quantity: Decimal::new(q, 2),
            rate: Decimal::new(r, 2),
        }),
        (positive_amount(), order_strategy()).prop_map(|(amount, order)| Op::Payment { amount, order }),
    ]
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 1, 1, 8, 0, 0).unwrap()
}

/// Replays operations; `backdate` holds per-op day offsets into the past.
fn run(ops: &[(Op, Option<i64>)], policy: BackdatePolicy) -> CustomerLedger {
    let customer_id = CustomerId::new();
    let mut ledger = CustomerLedger::new(customer_id, vec![], policy);

    for (i, (op, backdate)) in ops.iter().enumerate() {
        let now = base_time() + Duration::hours(i64::try_from(i).unwrap());
        let occurred_at = backdate.map(|days| now - Duration::days(days));
        match op {
            Op::Stock { quantity, rate } => {
                ledger
                    .record_stock(
                        NewStockTransaction {
                            customer_id,
                            quality_type: "A".to_string(),
                            quantity: *quantity,
                            rate: *rate,
                            total: None,
                            occurred_at,
                            notes: None,
                            created_by: "prop".to_string(),
                        },
                        now,
                    )
                    .unwrap();
            }
            Op::Payment { amount, order } => {
                ledger
                    .record_payment(
                        NewPaymentTransaction {
                            customer_id,
                            method: PaymentMethod::Cash,
                            amount: *amount,
                            bank_account_id: None,
                            allocation: AllocationRequest::Automatic(Some(*order)),
                            occurred_at,
                            notes: None,
                            created_by: "prop".to_string(),
                        },
                        &[],
                        AllocationOrder::OldestFirst,
                        now,
                    )
                    .unwrap();
            }
        }
    }

    ledger
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Every stock transaction stays settled consistently and never overpaid.
    #[test]
    fn prop_stock_settlement_invariant(
        ops in prop::collection::vec((op_strategy(), Just(None)), 1..40),
    ) {
        let ledger = run(&ops, BackdatePolicy::Cascade);

        for tx in ledger.transactions() {
            match tx.kind() {
                TransactionKind::Stock => {
                    prop_assert_eq!(tx.amount_paid + tx.balance, tx.total);
                    prop_assert!(tx.balance >= Decimal::ZERO);
                    prop_assert!(tx.amount_paid <= tx.total);
                }
                TransactionKind::Payment => {
                    prop_assert_eq!(tx.balance, Decimal::ZERO);
                    prop_assert_eq!(tx.amount_paid, tx.total);
                }
            }
        }
    }

    /// The balance summary matches the raw sums and the last running balance.
    #[test]
    fn prop_balance_summary_matches_history(
        ops in prop::collection::vec((op_strategy(), Just(None)), 1..40),
    ) {
        let ledger = run(&ops, BackdatePolicy::Cascade);
        let balance = ledger.balance();

        let (stock, paid) = ledger.transactions().iter().fold(
            (Decimal::ZERO, Decimal::ZERO),
            |(stock, paid), tx| match tx.kind() {
                TransactionKind::Stock => (stock + tx.total, paid),
                TransactionKind::Payment => (stock, paid + tx.amount_paid),
            },
        );

        prop_assert_eq!(balance.net_balance, stock - paid);
        prop_assert_eq!(balance.is_advance, stock < paid);
        prop_assert!(balance.total_pending >= Decimal::ZERO);
        prop_assert_eq!(
            ledger.transactions().last().unwrap().running_balance,
            balance.net_balance
        );
    }

    /// With cascading, backdated inserts still leave a consistent chain.
    #[test]
    fn prop_backdated_inserts_keep_chain(
        ops in prop::collection::vec(
            (op_strategy(), prop::option::of(1i64..30)),
            1..30,
        ),
    ) {
        let ledger = run(&ops, BackdatePolicy::Cascade);
        let history = ledger.transactions();

        prop_assert_eq!(history[0].running_balance, history[0].running_balance_delta());
        for pair in history.windows(2) {
            prop_assert!(pair[0].created_at < pair[1].created_at);
            prop_assert_eq!(
                pair[1].running_balance,
                pair[0].running_balance + pair[1].running_balance_delta()
            );
        }
    }
}
