//! Running balance and customer balance calculations.
//!
//! The running balance is a point-in-time snapshot stored on every
//! transaction: the customer's cumulative debt right after it.
//! - Stock: `running_balance = previous + total`
//! - Payment: `running_balance = previous - amount_paid`

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::TransactionId;

use super::types::{Transaction, TransactionKind};

/// Running balance calculator over a customer's chronologically ordered history.
pub struct RunningBalanceCalculator;

impl RunningBalanceCalculator {
    /// Computes the running balance for `new` against the existing history.
    ///
    /// The predecessor is the most recent transaction with `created_at`
    /// strictly before `new.created_at`; without one the balance starts at zero.
    #[must_use]
    pub fn compute(history: &[Transaction], new: &Transaction) -> Decimal {
        let previous = history
            .iter()
            .filter(|tx| tx.created_at < new.created_at)
            .max_by_key(|tx| (tx.created_at, tx.id));

        Self::next(previous.map(|tx| tx.running_balance), new)
    }

    /// Applies one transaction's delta on top of the previous running balance.
    #[must_use]
    pub fn next(previous: Option<Decimal>, tx: &Transaction) -> Decimal {
        previous.unwrap_or(Decimal::ZERO) + tx.running_balance_delta()
    }

    /// Recomputes running balances from index `start` to the end of an ordered history.
    ///
    /// Returns the ids whose stored value changed.
    pub fn cascade(history: &mut [Transaction], start: usize) -> Vec<TransactionId> {
        let mut changed = Vec::new();
        let mut previous = start
            .checked_sub(1)
            .and_then(|i| history.get(i))
            .map(|tx| tx.running_balance);

        for tx in history.iter_mut().skip(start) {
            let recomputed = Self::next(previous, tx);
            if recomputed != tx.running_balance {
                tx.running_balance = recomputed;
                changed.push(tx.id);
            }
            previous = Some(recomputed);
        }

        changed
    }
}

/// Unconsumed payment money available to offset a new stock purchase.
///
/// `advance = Σ payment.amount_paid − Σ stock.total`, floored at zero.
#[must_use]
pub fn available_advance(history: &[Transaction]) -> Decimal {
    let (paid, owed) = history.iter().fold(
        (Decimal::ZERO, Decimal::ZERO),
        |(paid, owed), tx| match tx.kind() {
            TransactionKind::Payment => (paid + tx.amount_paid, owed),
            TransactionKind::Stock => (paid, owed + tx.total),
        },
    );
    (paid - owed).max(Decimal::ZERO)
}

/// Summary of what a customer owes or has paid in advance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerBalance {
    /// Sum of outstanding stock balances.
    pub total_pending: Decimal,
    /// Sum of all payments received.
    pub total_paid: Decimal,
    /// `Σ stock.total − Σ payment.amount_paid`; negative means advance.
    pub net_balance: Decimal,
    /// True when the customer has paid more than they owe.
    pub is_advance: bool,
    /// Size of the advance (zero unless `is_advance`).
    pub advance_amount: Decimal,
}

impl CustomerBalance {
    /// Builds the summary from a customer's full history.
    #[must_use]
    pub fn from_history(history: &[Transaction]) -> Self {
        let mut total_pending = Decimal::ZERO;
        let mut total_paid = Decimal::ZERO;
        let mut total_stock = Decimal::ZERO;

        for tx in history {
            match tx.kind() {
                TransactionKind::Stock => {
                    total_stock += tx.total;
                    total_pending += tx.balance;
                }
                TransactionKind::Payment => total_paid += tx.amount_paid,
            }
        }

        let net_balance = total_stock - total_paid;
        let is_advance = net_balance < Decimal::ZERO;

        Self {
            total_pending,
            total_paid,
            net_balance,
            is_advance,
            advance_amount: if is_advance { -net_balance } else { Decimal::ZERO },
        }
    }
}
