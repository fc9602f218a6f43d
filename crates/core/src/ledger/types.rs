//! Ledger domain types for stock and payment transactions.
//!
//! A customer's ledger is an ordered history of [`Transaction`]s. Stock
//! transactions add debt; payment transactions bring money in and are
//! distributed over outstanding stock by the allocator.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::money::{round_money, round_quantity, round_unit_cost};
use tally_shared::types::{AllocationOrder, BankAccountId, CustomerId, TransactionId};

use super::error::LedgerError;

/// Transaction kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Purchase of stock, increases the customer's debt.
    Stock,
    /// Money received from the customer.
    Payment,
}

/// How a payment was received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Cash in hand.
    Cash,
    /// Bank transfer; requires a bank account reference.
    Bank,
    /// UPI transfer.
    Upi,
}

impl PaymentMethod {
    /// Returns true if the method must reference a customer bank account.
    #[must_use]
    pub fn requires_bank_account(self) -> bool {
        matches!(self, Self::Bank)
    }
}

impl std::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cash => write!(f, "cash"),
            Self::Bank => write!(f, "bank"),
            Self::Upi => write!(f, "upi"),
        }
    }
}

impl std::str::FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cash" => Ok(Self::Cash),
            "bank" => Ok(Self::Bank),
            "upi" => Ok(Self::Upi),
            _ => Err(format!("Unknown payment method: {s}")),
        }
    }
}

/// Payment status derived from `amount_paid` against `total`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Nothing paid yet.
    Pending,
    /// Partially paid.
    Partial,
    /// Fully paid.
    Paid,
    /// Paid beyond the total. Never produced for stock by the allocator.
    Overpaid,
}

impl PaymentStatus {
    /// Classifies a transaction from its total and the amount paid so far.
    #[must_use]
    pub fn classify(total: Decimal, amount_paid: Decimal) -> Self {
        if amount_paid > total {
            Self::Overpaid
        } else if amount_paid == total {
            Self::Paid
        } else if amount_paid > Decimal::ZERO {
            Self::Partial
        } else {
            Self::Pending
        }
    }

    /// Returns true if money is still owed.
    #[must_use]
    pub fn is_outstanding(self) -> bool {
        matches!(self, Self::Pending | Self::Partial)
    }
}

/// Kind-specific fields of a transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TransactionDetail {
    /// Stock purchase line.
    Stock {
        /// Quality grade of the goods.
        quality_type: String,
        /// Quantity bought.
        quantity: Decimal,
        /// Price per unit.
        rate: Decimal,
    },
    /// Incoming payment.
    Payment {
        /// How the money arrived.
        method: PaymentMethod,
        /// Bank account the transfer came from (bank payments only).
        bank_account_id: Option<BankAccountId>,
    },
}

/// A stock or payment transaction in a customer's ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique identifier.
    pub id: TransactionId,
    /// Owning customer.
    pub customer_id: CustomerId,
    /// Kind-specific fields.
    pub detail: TransactionDetail,
    /// Authoritative total.
    pub total: Decimal,
    /// Amount settled so far.
    pub amount_paid: Decimal,
    /// `total - amount_paid` for stock, always zero for payments.
    pub balance: Decimal,
    /// Cumulative customer debt after this transaction.
    pub running_balance: Decimal,
    /// Derived payment status.
    pub payment_status: PaymentStatus,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Ordering key within the customer's history.
    pub created_at: DateTime<Utc>,
    /// Actor who recorded the transaction.
    pub created_by: String,
}

impl Transaction {
    /// Returns the transaction kind.
    #[must_use]
    pub fn kind(&self) -> TransactionKind {
        match self.detail {
            TransactionDetail::Stock { .. } => TransactionKind::Stock,
            TransactionDetail::Payment { .. } => TransactionKind::Payment,
        }
    }

    /// Returns true for stock transactions.
    #[must_use]
    pub fn is_stock(&self) -> bool {
        self.kind() == TransactionKind::Stock
    }

    /// Returns true for payment transactions.
    #[must_use]
    pub fn is_payment(&self) -> bool {
        self.kind() == TransactionKind::Payment
    }

    /// Quality type of a stock transaction.
    #[must_use]
    pub fn quality_type(&self) -> Option<&str> {
        match &self.detail {
            TransactionDetail::Stock { quality_type, .. } => Some(quality_type),
            TransactionDetail::Payment { .. } => None,
        }
    }

    /// Quantity of a stock transaction.
    #[must_use]
    pub fn quantity(&self) -> Option<Decimal> {
        match &self.detail {
            TransactionDetail::Stock { quantity, .. } => Some(*quantity),
            TransactionDetail::Payment { .. } => None,
        }
    }

    /// Payment method of a payment transaction.
    #[must_use]
    pub fn payment_method(&self) -> Option<PaymentMethod> {
        match &self.detail {
            TransactionDetail::Payment { method, .. } => Some(*method),
            TransactionDetail::Stock { .. } => None,
        }
    }

    /// Returns true for stock that still has money owed on it.
    #[must_use]
    pub fn is_outstanding(&self) -> bool {
        self.is_stock() && self.payment_status.is_outstanding() && self.balance > Decimal::ZERO
    }

    /// Effect of this transaction on the customer's running balance.
    #[must_use]
    pub fn running_balance_delta(&self) -> Decimal {
        match self.kind() {
            TransactionKind::Stock => self.total,
            TransactionKind::Payment => -self.amount_paid,
        }
    }

    /// Applies part of a payment to this stock transaction.
    ///
    /// The amount is clamped to the outstanding balance; the applied amount is returned.
    ///
    /// # Errors
    ///
    /// Returns an error if this is not a stock transaction, if the amount is
    /// negative, or if the stored figures are already inconsistent.
    pub fn apply_payment(&mut self, amount: Decimal) -> Result<Decimal, LedgerError> {
        if !self.is_stock() {
            return Err(LedgerError::NotAStockTransaction(self.id));
        }
        if amount < Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount {
                field: "allocation",
                amount,
            });
        }
        if self.balance < Decimal::ZERO {
            return Err(LedgerError::NegativeBalance {
                transaction_id: self.id,
                balance: self.balance,
            });
        }

        let applied = amount.min(self.balance);
        self.amount_paid += applied;
        self.balance = self.total - self.amount_paid;
        self.payment_status = PaymentStatus::classify(self.total, self.amount_paid);
        Ok(applied)
    }
}

/// Input for recording a stock purchase.
#[derive(Debug, Clone)]
pub struct NewStockTransaction {
    /// Customer buying the stock.
    pub customer_id: CustomerId,
    /// Quality grade.
    pub quality_type: String,
    /// Quantity (>= 0).
    pub quantity: Decimal,
    /// Price per unit (>= 0).
    pub rate: Decimal,
    /// Authoritative total; defaults to `quantity * rate`.
    pub total: Option<Decimal>,
    /// Backdated creation time; `None` means now.
    pub occurred_at: Option<DateTime<Utc>>,
    /// Optional notes.
    pub notes: Option<String>,
    /// Actor recording the purchase.
    pub created_by: String,
}

/// Stock input normalized to the stored scales.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockFigures {
    /// Trimmed quality type.
    pub quality_type: String,
    /// Quantity at quantity scale.
    pub quantity: Decimal,
    /// Rate at unit-cost scale.
    pub rate: Decimal,
    /// Total at money scale.
    pub total: Decimal,
}

impl NewStockTransaction {
    /// Validates the input and returns its figures at the scales they are stored with.
    ///
    /// # Errors
    ///
    /// Returns an error for a blank quality type or negative figures.
    pub fn validate(&self) -> Result<StockFigures, LedgerError> {
        let quality_type = self.quality_type.trim();
        if quality_type.is_empty() {
            return Err(LedgerError::BlankQualityType);
        }
        if self.quantity < Decimal::ZERO {
            return Err(LedgerError::NegativeValue {
                field: "quantity",
                value: self.quantity,
            });
        }
        if self.rate < Decimal::ZERO {
            return Err(LedgerError::NegativeValue {
                field: "rate",
                value: self.rate,
            });
        }
        let quantity = round_quantity(self.quantity);
        let rate = round_unit_cost(self.rate);
        let total = match self.total {
            Some(total) if total < Decimal::ZERO => {
                return Err(LedgerError::NegativeValue {
                    field: "total",
                    value: total,
                });
            }
            Some(total) => round_money(total),
            None => round_money(quantity * rate),
        };
        Ok(StockFigures {
            quality_type: quality_type.to_string(),
            quantity,
            rate,
            total,
        })
    }
}

/// One caller-chosen slice of a payment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualAllocation {
    /// Stock transaction to settle.
    pub transaction_id: TransactionId,
    /// Requested amount; clamped to the outstanding balance.
    pub amount: Decimal,
}

/// How a payment should be distributed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocationRequest {
    /// Walk outstanding stock in the given order (configured default when `None`).
    Automatic(Option<AllocationOrder>),
    /// Apply exactly the listed slices; everything else is untouched.
    Manual(Vec<ManualAllocation>),
}

impl Default for AllocationRequest {
    fn default() -> Self {
        Self::Automatic(None)
    }
}

/// Input for recording an incoming payment.
#[derive(Debug, Clone)]
pub struct NewPaymentTransaction {
    /// Paying customer.
    pub customer_id: CustomerId,
    /// Payment method.
    pub method: PaymentMethod,
    /// Amount received (> 0).
    pub amount: Decimal,
    /// Source bank account, required iff `method` is `Bank`.
    pub bank_account_id: Option<BankAccountId>,
    /// Distribution over outstanding stock.
    pub allocation: AllocationRequest,
    /// Backdated creation time; `None` means now.
    pub occurred_at: Option<DateTime<Utc>>,
    /// Optional notes.
    pub notes: Option<String>,
    /// Actor recording the payment.
    pub created_by: String,
}

/// Result of applying part of a payment to one stock transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedAllocation {
    /// Stock transaction that received money.
    pub transaction_id: TransactionId,
    /// Its quality type, for display.
    pub quality_type: Option<String>,
    /// Amount applied.
    pub amount_applied: Decimal,
    /// Outstanding balance afterwards.
    pub new_balance: Decimal,
    /// Status afterwards.
    pub new_status: PaymentStatus,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    fn stock(total: Decimal) -> Transaction {
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
            created_at: Utc::now(),
            created_by: "tester".to_string(),
        }
    }

    #[rstest]
    #[case(dec!(50), dec!(0), PaymentStatus::Pending)]
    #[case(dec!(50), dec!(20), PaymentStatus::Partial)]
    #[case(dec!(50), dec!(50), PaymentStatus::Paid)]
    #[case(dec!(50), dec!(60), PaymentStatus::Overpaid)]
    #[case(dec!(0), dec!(0), PaymentStatus::Paid)]
    fn test_classify(#[case] total: Decimal, #[case] paid: Decimal, #[case] expected: PaymentStatus) {
        assert_eq!(PaymentStatus::classify(total, paid), expected);
    }

    #[test]
    fn test_apply_payment_clamps_to_balance() {
        let mut tx = stock(dec!(30));
        let applied = tx.apply_payment(dec!(45)).unwrap();
        assert_eq!(applied, dec!(30));
        assert_eq!(tx.balance, Decimal::ZERO);
        assert_eq!(tx.payment_status, PaymentStatus::Paid);
        assert_eq!(tx.amount_paid + tx.balance, tx.total);
    }

    #[test]
    fn test_apply_payment_partial() {
        let mut tx = stock(dec!(50));
        assert_eq!(tx.apply_payment(dec!(10)).unwrap(), dec!(10));
        assert_eq!(tx.balance, dec!(40));
        assert_eq!(tx.payment_status, PaymentStatus::Partial);
        assert!(tx.is_outstanding());
    }

    #[test]
    fn test_apply_payment_rejects_negative() {
        let mut tx = stock(dec!(50));
        assert!(matches!(
            tx.apply_payment(dec!(-1)),
            Err(LedgerError::NonPositiveAmount { .. })
        ));
        assert_eq!(tx.balance, dec!(50));
    }

    #[test]
    fn test_new_stock_total_defaults_to_quantity_times_rate() {
        let input = NewStockTransaction {
            customer_id: CustomerId::new(),
            quality_type: "  Grade A ".to_string(),
            quantity: dec!(2.5),
            rate: dec!(12.30),
            total: None,
            occurred_at: None,
            notes: None,
            created_by: "tester".to_string(),
        };
        let figures = input.validate().unwrap();
        assert_eq!(figures.quality_type, "Grade A");
        assert_eq!(figures.total, dec!(30.75));
    }

    #[test]
    fn test_new_stock_total_override_is_authoritative() {
        let input = NewStockTransaction {
            customer_id: CustomerId::new(),
            quality_type: "A".to_string(),
            quantity: dec!(10),
            rate: dec!(10),
            total: Some(dec!(95)),
            occurred_at: None,
            notes: None,
            created_by: "tester".to_string(),
        };
        assert_eq!(input.validate().unwrap().total, dec!(95));
    }

    #[test]
    fn test_new_stock_figures_are_stored_at_column_scale() {
        let input = NewStockTransaction {
            customer_id: CustomerId::new(),
            quality_type: "A".to_string(),
            quantity: dec!(2.545),
            rate: dec!(10.0005),
            total: None,
            occurred_at: None,
            notes: None,
            created_by: "tester".to_string(),
        };
        let figures = input.validate().unwrap();
        assert_eq!(figures.quantity, dec!(2.54));
        assert_eq!(figures.rate, dec!(10.000));
        assert_eq!(figures.total, round_money(figures.quantity * figures.rate));
    }

    #[test]
    fn test_new_stock_rejects_blank_quality() {
        let input = NewStockTransaction {
            customer_id: CustomerId::new(),
            quality_type: "   ".to_string(),
            quantity: dec!(1),
            rate: dec!(1),
            total: None,
            occurred_at: None,
            notes: None,
            created_by: "tester".to_string(),
        };
        assert!(matches!(input.validate(), Err(LedgerError::BlankQualityType)));
    }

    #[test]
    fn test_payment_method_parsing() {
        use std::str::FromStr;
        assert_eq!(PaymentMethod::from_str("UPI").unwrap(), PaymentMethod::Upi);
        assert!(PaymentMethod::from_str("cheque").is_err());
        assert!(PaymentMethod::Bank.requires_bank_account());
        assert!(!PaymentMethod::Cash.requires_bank_account());
    }
}
