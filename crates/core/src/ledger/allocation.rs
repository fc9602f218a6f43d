//! Payment allocation over outstanding stock transactions.
//!
//! Planning is separated from applying: a plan is computed and validated
//! against the current ledger first, and only a valid plan is applied, so a
//! rejected payment never leaves a half-updated ledger behind.

use std::collections::HashSet;

use rust_decimal::Decimal;
use tally_shared::types::money::round_money;
use tally_shared::types::{AllocationOrder, TransactionId};

use super::error::LedgerError;
use super::types::{ManualAllocation, PaymentStatus, Transaction};

/// One planned slice of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedAllocation {
    /// Stock transaction receiving money.
    pub transaction_id: TransactionId,
    /// Amount to apply, never more than its outstanding balance.
    pub amount: Decimal,
}

/// Validated distribution of a payment.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AllocationPlan {
    /// Slices in application order.
    pub lines: Vec<PlannedAllocation>,
    /// Part of the payment not attached to any stock (advance).
    pub unallocated: Decimal,
}

impl AllocationPlan {
    /// Total amount attached to stock transactions.
    #[must_use]
    pub fn allocated(&self) -> Decimal {
        self.lines.iter().map(|line| line.amount).sum()
    }
}

/// Payment allocator.
pub struct PaymentAllocator;

impl PaymentAllocator {
    /// Orders outstanding stock transactions according to the policy.
    ///
    /// Ties fall back to oldest first so the walk is deterministic.
    #[must_use]
    pub fn outstanding<'a>(
        history: &'a [Transaction],
        order: AllocationOrder,
    ) -> Vec<&'a Transaction> {
        let mut pending: Vec<&Transaction> =
            history.iter().filter(|tx| tx.is_outstanding()).collect();

        match order {
            AllocationOrder::OldestFirst => {
                pending.sort_by_key(|tx| (tx.created_at, tx.id));
            }
            AllocationOrder::SmallestBalanceFirst => {
                pending.sort_by_key(|tx| (tx.balance, tx.created_at, tx.id));
            }
            AllocationOrder::LargestBalanceFirst => {
                pending.sort_by(|a, b| {
                    b.balance
                        .cmp(&a.balance)
                        .then_with(|| (a.created_at, a.id).cmp(&(b.created_at, b.id)))
                });
            }
        }

        pending
    }

    /// Plans an automatic allocation: walk the ordered outstanding list,
    /// applying `min(remaining, balance)` until the payment is used up.
    #[must_use]
    pub fn plan_automatic(
        history: &[Transaction],
        amount: Decimal,
        order: AllocationOrder,
    ) -> AllocationPlan {
        let mut remaining = amount.max(Decimal::ZERO);
        let mut lines = Vec::new();

        for tx in Self::outstanding(history, order) {
            if remaining <= Decimal::ZERO {
                break;
            }
            let applied = remaining.min(tx.balance);
            lines.push(PlannedAllocation {
                transaction_id: tx.id,
                amount: applied,
            });
            remaining -= applied;
        }

        AllocationPlan {
            lines,
            unallocated: remaining,
        }
    }

    /// Plans a manual allocation from caller-chosen slices.
    ///
    /// Each slice is clamped to the target's outstanding balance; slices
    /// against already settled stock apply nothing and are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if a target is unknown or not stock, if a slice is
    /// not positive, if a target is listed twice, or if the requested slices
    /// add up to more than the payment.
    pub fn plan_manual(
        history: &[Transaction],
        amount: Decimal,
        requests: &[ManualAllocation],
    ) -> Result<AllocationPlan, LedgerError> {
        let mut seen = HashSet::with_capacity(requests.len());
        let mut requested_total = Decimal::ZERO;
        let mut lines = Vec::with_capacity(requests.len());

        for request in requests {
            if !seen.insert(request.transaction_id) {
                return Err(LedgerError::DuplicateAllocation(request.transaction_id));
            }
            // Slices are settled at money scale, like the payment itself.
            let requested = round_money(request.amount);
            if requested <= Decimal::ZERO {
                return Err(LedgerError::NonPositiveAmount {
                    field: "allocation",
                    amount: request.amount,
                });
            }

            let target = history
                .iter()
                .find(|tx| tx.id == request.transaction_id)
                .ok_or(LedgerError::TransactionNotFound(request.transaction_id))?;
            if !target.is_stock() {
                return Err(LedgerError::NotAStockTransaction(target.id));
            }
            if target.balance < Decimal::ZERO {
                return Err(LedgerError::NegativeBalance {
                    transaction_id: target.id,
                    balance: target.balance,
                });
            }

            requested_total += requested;
            let applied = requested.min(target.balance);
            if applied > Decimal::ZERO {
                lines.push(PlannedAllocation {
                    transaction_id: target.id,
                    amount: applied,
                });
            }
        }

        if requested_total > amount {
            return Err(LedgerError::AllocationExceedsPayment {
                allocated: requested_total,
                amount,
            });
        }

        let plan = AllocationPlan { lines, unallocated: Decimal::ZERO };
        let unallocated = amount - plan.allocated();
        Ok(AllocationPlan { unallocated, ..plan })
    }
}

/// Opening settlement of a new stock transaction from an unconsumed advance.
///
/// Returns `(amount_paid, balance, status)`.
#[must_use]
pub fn seed_from_advance(advance: Decimal, total: Decimal) -> (Decimal, Decimal, PaymentStatus) {
    let amount_paid = advance.max(Decimal::ZERO).min(total);
    (
        amount_paid,
        total - amount_paid,
        PaymentStatus::classify(total, amount_paid),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::TransactionDetail;
    use chrono::{Duration, TimeZone, Utc};
    use rust_decimal_macros::dec;
    use tally_shared::types::CustomerId;

    fn stock(balance: Decimal, minutes: i64) -> Transaction {
        Transaction {
            id: TransactionId::new(),
            customer_id: CustomerId::new(),
            detail: TransactionDetail::Stock {
                quality_type: "A".to_string(),
                quantity: dec!(1),
                rate: balance,
            },
            total: balance,
            amount_paid: Decimal::ZERO,
            balance,
            running_balance: Decimal::ZERO,
            payment_status: PaymentStatus::Pending,
            notes: None,
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
                + Duration::minutes(minutes),
            created_by: "tester".to_string(),
        }
    }

    #[test]
    fn test_oldest_first_partial_walk() {
        let history = vec![stock(dec!(30), 0), stock(dec!(50), 1)];
        let plan = PaymentAllocator::plan_automatic(&history, dec!(40), AllocationOrder::OldestFirst);

        assert_eq!(plan.lines.len(), 2);
        assert_eq!(plan.lines[0].transaction_id, history[0].id);
        assert_eq!(plan.lines[0].amount, dec!(30));
        assert_eq!(plan.lines[1].amount, dec!(10));
        assert_eq!(plan.unallocated, Decimal::ZERO);
    }

    #[test]
    fn test_smallest_balance_first() {
        let history = vec![stock(dec!(50), 0), stock(dec!(30), 1), stock(dec!(40), 2)];
        let plan =
            PaymentAllocator::plan_automatic(&history, dec!(35), AllocationOrder::SmallestBalanceFirst);

        assert_eq!(plan.lines[0].transaction_id, history[1].id);
        assert_eq!(plan.lines[0].amount, dec!(30));
        assert_eq!(plan.lines[1].transaction_id, history[2].id);
        assert_eq!(plan.lines[1].amount, dec!(5));
    }

    #[test]
    fn test_largest_balance_first() {
        let history = vec![stock(dec!(50), 0), stock(dec!(80), 1)];
        let plan =
            PaymentAllocator::plan_automatic(&history, dec!(60), AllocationOrder::LargestBalanceFirst);

        assert_eq!(plan.lines.len(), 1);
        assert_eq!(plan.lines[0].transaction_id, history[1].id);
        assert_eq!(plan.lines[0].amount, dec!(60));
    }

    #[test]
    fn test_leftover_becomes_unallocated() {
        let history = vec![stock(dec!(30), 0)];
        let plan = PaymentAllocator::plan_automatic(&history, dec!(100), AllocationOrder::OldestFirst);
        assert_eq!(plan.allocated(), dec!(30));
        assert_eq!(plan.unallocated, dec!(70));
    }

    #[test]
    fn test_settled_stock_is_skipped() {
        let mut settled = stock(dec!(30), 0);
        settled.amount_paid = dec!(30);
        settled.balance = Decimal::ZERO;
        settled.payment_status = PaymentStatus::Paid;
        let history = vec![settled, stock(dec!(20), 1)];

        let plan = PaymentAllocator::plan_automatic(&history, dec!(10), AllocationOrder::OldestFirst);
        assert_eq!(plan.lines.len(), 1);
        assert_eq!(plan.lines[0].transaction_id, history[1].id);
    }

    #[test]
    fn test_manual_clamps_to_balance() {
        let history = vec![stock(dec!(30), 0), stock(dec!(50), 1)];
        let requests = vec![ManualAllocation {
            transaction_id: history[0].id,
            amount: dec!(45),
        }];
        let plan = PaymentAllocator::plan_manual(&history, dec!(60), &requests).unwrap();

        assert_eq!(plan.lines.len(), 1);
        assert_eq!(plan.lines[0].amount, dec!(30));
        assert_eq!(plan.unallocated, dec!(30));
    }

    #[test]
    fn test_manual_slices_round_to_cents() {
        let history = vec![stock(dec!(50), 0)];
        let requests = vec![ManualAllocation {
            transaction_id: history[0].id,
            amount: dec!(10.005),
        }];
        let plan = PaymentAllocator::plan_manual(&history, dec!(20), &requests).unwrap();

        assert_eq!(plan.lines[0].amount, dec!(10.00));
        assert_eq!(plan.allocated() + plan.unallocated, dec!(20));

        let dust = vec![ManualAllocation {
            transaction_id: history[0].id,
            amount: dec!(0.004),
        }];
        assert!(matches!(
            PaymentAllocator::plan_manual(&history, dec!(20), &dust),
            Err(LedgerError::NonPositiveAmount { .. })
        ));
    }

    #[test]
    fn test_manual_unknown_transaction() {
        let history = vec![stock(dec!(30), 0)];
        let missing = TransactionId::new();
        let requests = vec![ManualAllocation {
            transaction_id: missing,
            amount: dec!(10),
        }];
        assert_eq!(
            PaymentAllocator::plan_manual(&history, dec!(10), &requests),
            Err(LedgerError::TransactionNotFound(missing))
        );
    }

    #[test]
    fn test_manual_rejects_over_allocation() {
        let history = vec![stock(dec!(30), 0), stock(dec!(50), 1)];
        let requests = vec![
            ManualAllocation {
                transaction_id: history[0].id,
                amount: dec!(30),
            },
            ManualAllocation {
                transaction_id: history[1].id,
                amount: dec!(30),
            },
        ];
        assert!(matches!(
            PaymentAllocator::plan_manual(&history, dec!(50), &requests),
            Err(LedgerError::AllocationExceedsPayment { .. })
        ));
    }

    #[test]
    fn test_manual_rejects_duplicates_and_non_positive() {
        let history = vec![stock(dec!(30), 0)];
        let dup = vec![
            ManualAllocation {
                transaction_id: history[0].id,
                amount: dec!(5),
            },
            ManualAllocation {
                transaction_id: history[0].id,
                amount: dec!(5),
            },
        ];
        assert_eq!(
            PaymentAllocator::plan_manual(&history, dec!(50), &dup),
            Err(LedgerError::DuplicateAllocation(history[0].id))
        );

        let zero = vec![ManualAllocation {
            transaction_id: history[0].id,
            amount: Decimal::ZERO,
        }];
        assert!(matches!(
            PaymentAllocator::plan_manual(&history, dec!(50), &zero),
            Err(LedgerError::NonPositiveAmount { .. })
        ));
    }

    #[test]
    fn test_seed_from_advance() {
        assert_eq!(
            seed_from_advance(dec!(20), dec!(50)),
            (dec!(20), dec!(30), PaymentStatus::Partial)
        );
        assert_eq!(
            seed_from_advance(dec!(80), dec!(50)),
            (dec!(50), Decimal::ZERO, PaymentStatus::Paid)
        );
        assert_eq!(
            seed_from_advance(Decimal::ZERO, dec!(50)),
            (Decimal::ZERO, dec!(50), PaymentStatus::Pending)
        );
    }
}
