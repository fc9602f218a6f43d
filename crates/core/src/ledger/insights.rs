//! Transaction filters and payment insights.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::{PaymentMethod, Transaction, TransactionKind};

/// Filter over a transaction history. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionFilter {
    /// Only this kind.
    pub kind: Option<TransactionKind>,
    /// Only payments received this way.
    pub payment_method: Option<PaymentMethod>,
    /// Created at or after this instant.
    pub from: Option<DateTime<Utc>>,
    /// Created at or before this instant.
    pub to: Option<DateTime<Utc>>,
}

impl TransactionFilter {
    /// Returns true if the transaction passes every set criterion.
    #[must_use]
    pub fn matches(&self, tx: &Transaction) -> bool {
        self.kind.is_none_or(|kind| tx.kind() == kind)
            && self
                .payment_method
                .is_none_or(|method| tx.payment_method() == Some(method))
            && self.from.is_none_or(|from| tx.created_at >= from)
            && self.to.is_none_or(|to| tx.created_at <= to)
    }
}

/// Received payments for one method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodTotal {
    /// Payment method.
    pub method: PaymentMethod,
    /// Number of payments.
    pub count: u64,
    /// Sum of amounts.
    pub total: Decimal,
}

/// Payments received within a time window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInsights {
    /// Window start (inclusive).
    pub from: DateTime<Utc>,
    /// Window end (inclusive).
    pub to: DateTime<Utc>,
    /// Per-method totals, in method order; methods without payments are omitted.
    pub by_method: Vec<MethodTotal>,
    /// Number of payments.
    pub count: u64,
    /// Sum over all methods.
    pub total: Decimal,
}

impl PaymentInsights {
    /// Aggregates payment transactions from any number of customers.
    ///
    /// `methods` restricts the report to the listed methods; an empty slice
    /// means all methods.
    #[must_use]
    pub fn compute<'a, I>(
        transactions: I,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        methods: &[PaymentMethod],
    ) -> Self
    where
        I: IntoIterator<Item = &'a Transaction>,
    {
        let mut totals: BTreeMap<PaymentMethod, (u64, Decimal)> = BTreeMap::new();

        for tx in transactions {
            let Some(method) = tx.payment_method() else {
                continue;
            };
            if tx.created_at < from || tx.created_at > to {
                continue;
            }
            if !methods.is_empty() && !methods.contains(&method) {
                continue;
            }
            let entry = totals.entry(method).or_insert((0, Decimal::ZERO));
            entry.0 += 1;
            entry.1 += tx.amount_paid;
        }

        let by_method: Vec<MethodTotal> = totals
            .into_iter()
            .map(|(method, (count, total))| MethodTotal {
                method,
                count,
                total,
            })
            .collect();

        Self {
            from,
            to,
            count: by_method.iter().map(|m| m.count).sum(),
            total: by_method.iter().map(|m| m.total).sum(),
            by_method,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::types::{PaymentStatus, TransactionDetail};
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;
    use tally_shared::types::{CustomerId, TransactionId};

    fn day(d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, d, 12, 0, 0).unwrap()
    }

    fn payment(method: PaymentMethod, amount: Decimal, at: DateTime<Utc>) -> Transaction {
        Transaction {
            id: TransactionId::new(),
            customer_id: CustomerId::new(),
            detail: TransactionDetail::Payment {
                method,
                bank_account_id: None,
            },
            total: amount,
            amount_paid: amount,
            balance: Decimal::ZERO,
            running_balance: -amount,
            payment_status: PaymentStatus::Paid,
            notes: None,
            created_at: at,
            created_by: "tester".to_string(),
        }
    }

    fn stock(total: Decimal, at: DateTime<Utc>) -> Transaction {
        Transaction {
            id: TransactionId::new(),
            customer_id: CustomerId::new(),
            detail: TransactionDetail::Stock {
                quality_type: "A".to_string(),
                quantity: dec!(1),
                rate: total,
            },
            total,
            amount_paid: Decimal::ZERO,
            balance: total,
            running_balance: total,
            payment_status: PaymentStatus::Pending,
            notes: None,
            created_at: at,
            created_by: "tester".to_string(),
        }
    }

    #[test]
    fn test_filter_by_kind_method_and_dates() {
        let cash = payment(PaymentMethod::Cash, dec!(10), day(2));
        let upi = payment(PaymentMethod::Upi, dec!(20), day(5));
        let purchase = stock(dec!(30), day(3));

        let payments = TransactionFilter {
            kind: Some(TransactionKind::Payment),
            ..TransactionFilter::default()
        };
        assert!(payments.matches(&cash));
        assert!(!payments.matches(&purchase));

        let upi_only = TransactionFilter {
            payment_method: Some(PaymentMethod::Upi),
            ..TransactionFilter::default()
        };
        assert!(upi_only.matches(&upi));
        assert!(!upi_only.matches(&cash));
        assert!(!upi_only.matches(&purchase));

        let window = TransactionFilter {
            from: Some(day(3)),
            to: Some(day(4)),
            ..TransactionFilter::default()
        };
        assert!(window.matches(&purchase));
        assert!(!window.matches(&cash));
        assert!(!window.matches(&upi));
    }

    #[test]
    fn test_payment_insights_per_method() {
        let history = vec![
            payment(PaymentMethod::Cash, dec!(100), day(1)),
            payment(PaymentMethod::Cash, dec!(50), day(2)),
            payment(PaymentMethod::Upi, dec!(25.50), day(2)),
            payment(PaymentMethod::Bank, dec!(999), day(9)),
            stock(dec!(400), day(2)),
        ];

        let insights = PaymentInsights::compute(&history, day(1), day(3), &[]);
        assert_eq!(insights.count, 3);
        assert_eq!(insights.total, dec!(175.50));
        assert_eq!(insights.by_method.len(), 2);
        assert_eq!(insights.by_method[0].method, PaymentMethod::Cash);
        assert_eq!(insights.by_method[0].count, 2);
        assert_eq!(insights.by_method[0].total, dec!(150));

        let upi_only = PaymentInsights::compute(
            &history,
            day(1),
            day(1) + Duration::days(30),
            &[PaymentMethod::Upi],
        );
        assert_eq!(upi_only.count, 1);
        assert_eq!(upi_only.total, dec!(25.50));
    }
}
