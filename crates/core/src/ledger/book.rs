//! Customer ledger aggregate.
//!
//! [`CustomerLedger`] owns one customer's ordered transaction history and is
//! the only place where stock and payments are recorded. Every operation
//! validates first and mutates afterwards, so a rejected operation leaves the
//! ledger exactly as it was.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use rust_decimal::Decimal;
use tally_shared::types::money::round_money;
use tally_shared::types::{
    AllocationOrder, BackdatePolicy, BankAccountId, CustomerId, PageRequest, PageResponse,
    TransactionId,
};

use super::allocation::{AllocationPlan, PaymentAllocator, seed_from_advance};
use super::balance::{CustomerBalance, RunningBalanceCalculator, available_advance};
use super::error::LedgerError;
use super::insights::TransactionFilter;
use super::types::{
    AllocationRequest, AppliedAllocation, NewPaymentTransaction, NewStockTransaction,
    PaymentMethod, PaymentStatus, Transaction, TransactionDetail,
};
use crate::customer::BankAccount;

/// Rows touched by a ledger operation, for persistence.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LedgerChanges {
    /// Newly created transactions.
    pub inserted: Vec<TransactionId>,
    /// Existing transactions whose stored fields changed.
    pub updated: Vec<TransactionId>,
}

impl LedgerChanges {
    fn touch(&mut self, id: TransactionId) {
        if !self.inserted.contains(&id) && !self.updated.contains(&id) {
            self.updated.push(id);
        }
    }
}

/// Result of recording a payment.
#[derive(Debug, Clone)]
pub struct PaymentOutcome {
    /// The payment transaction for the whole amount.
    pub payment: Transaction,
    /// Per-stock effect of the payment.
    pub allocations: Vec<AppliedAllocation>,
    /// Amount kept as advance.
    pub unallocated: Decimal,
    /// Rows to persist.
    pub changes: LedgerChanges,
}

/// One customer's transaction history, ordered by `(created_at, id)`.
#[derive(Debug, Clone)]
pub struct CustomerLedger {
    customer_id: CustomerId,
    transactions: Vec<Transaction>,
    backdate_policy: BackdatePolicy,
}

impl CustomerLedger {
    /// Wraps a customer's stored transactions.
    #[must_use]
    pub fn new(
        customer_id: CustomerId,
        mut transactions: Vec<Transaction>,
        backdate_policy: BackdatePolicy,
    ) -> Self {
        transactions.sort_by_key(|tx| (tx.created_at, tx.id));
        Self {
            customer_id,
            transactions,
            backdate_policy,
        }
    }

    /// The owning customer.
    #[must_use]
    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    /// Full history, oldest first.
    #[must_use]
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Looks up a transaction.
    #[must_use]
    pub fn get(&self, id: TransactionId) -> Option<&Transaction> {
        self.transactions.iter().find(|tx| tx.id == id)
    }

    /// Balance summary.
    #[must_use]
    pub fn balance(&self) -> CustomerBalance {
        CustomerBalance::from_history(&self.transactions)
    }

    /// Stock transactions with money still owed, oldest first.
    #[must_use]
    pub fn pending(&self) -> Vec<&Transaction> {
        PaymentAllocator::outstanding(&self.transactions, AllocationOrder::OldestFirst)
    }

    /// Filtered history, newest first, one page at a time.
    #[must_use]
    pub fn history(&self, filter: &TransactionFilter, page: PageRequest) -> PageResponse<Transaction> {
        let matching: Vec<Transaction> = self
            .transactions
            .iter()
            .rev()
            .filter(|tx| filter.matches(tx))
            .cloned()
            .collect();
        page.slice(&matching)
    }

    /// Records a stock purchase.
    ///
    /// An unconsumed advance is pulled into the new transaction's
    /// `amount_paid`. A backdated entry cascades into later running balances
    /// under [`BackdatePolicy::Cascade`].
    ///
    /// # Errors
    ///
    /// Returns an error if the input is invalid or belongs to another customer.
    pub fn record_stock(
        &mut self,
        input: NewStockTransaction,
        now: DateTime<Utc>,
    ) -> Result<(Transaction, LedgerChanges), LedgerError> {
        self.ensure_customer(input.customer_id)?;
        let figures = input.validate()?;
        let total = figures.total;
        let created_at = self.place(input.occurred_at, now);

        let (amount_paid, balance, payment_status) =
            seed_from_advance(available_advance(&self.transactions), total);

        let mut tx = Transaction {
            id: TransactionId::new(),
            customer_id: self.customer_id,
            detail: TransactionDetail::Stock {
                quality_type: figures.quality_type,
                quantity: figures.quantity,
                rate: figures.rate,
            },
            total,
            amount_paid,
            balance,
            running_balance: Decimal::ZERO,
            payment_status,
            notes: input.notes,
            created_at,
            created_by: input.created_by,
        };
        tx.running_balance = RunningBalanceCalculator::compute(&self.transactions, &tx);

        let mut changes = LedgerChanges {
            inserted: vec![tx.id],
            updated: Vec::new(),
        };
        let index = self.insert(tx.clone());
        for id in self.cascade_after(index) {
            changes.touch(id);
        }

        Ok((tx, changes))
    }

    /// Records an incoming payment and distributes it over outstanding stock.
    ///
    /// `bank_accounts` are the customer's accounts, used to check bank
    /// payments. `default_order` applies when an automatic allocation names
    /// no order.
    ///
    /// # Errors
    ///
    /// Returns an error if the amount is not positive, the bank account rules
    /// are broken, or a manual allocation is invalid.
    pub fn record_payment(
        &mut self,
        input: NewPaymentTransaction,
        bank_accounts: &[BankAccount],
        default_order: AllocationOrder,
        now: DateTime<Utc>,
    ) -> Result<PaymentOutcome, LedgerError> {
        self.ensure_customer(input.customer_id)?;
        let amount = round_money(input.amount);
        if amount <= Decimal::ZERO {
            return Err(LedgerError::NonPositiveAmount {
                field: "amount",
                amount: input.amount,
            });
        }
        self.check_bank_account(input.method, input.bank_account_id, bank_accounts)?;

        let plan = match &input.allocation {
            AllocationRequest::Automatic(order) => PaymentAllocator::plan_automatic(
                &self.transactions,
                amount,
                order.unwrap_or(default_order),
            ),
            AllocationRequest::Manual(requests) => {
                PaymentAllocator::plan_manual(&self.transactions, amount, requests)?
            }
        };

        let created_at = self.place(input.occurred_at, now);
        let mut payment = Transaction {
            id: TransactionId::new(),
            customer_id: self.customer_id,
            detail: TransactionDetail::Payment {
                method: input.method,
                bank_account_id: input.bank_account_id,
            },
            total: amount,
            amount_paid: amount,
            balance: Decimal::ZERO,
            running_balance: Decimal::ZERO,
            payment_status: PaymentStatus::Paid,
            notes: input.notes,
            created_at,
            created_by: input.created_by,
        };
        payment.running_balance = RunningBalanceCalculator::compute(&self.transactions, &payment);

        // Work on a copy so a failure halfway through leaves the ledger untouched.
        let mut next = self.clone();
        let allocations = next.apply_plan(&plan)?;

        let mut changes = LedgerChanges {
            inserted: vec![payment.id],
            updated: Vec::new(),
        };
        for applied in &allocations {
            changes.touch(applied.transaction_id);
        }
        let index = next.insert(payment.clone());
        for id in next.cascade_after(index) {
            changes.touch(id);
        }

        *self = next;

        Ok(PaymentOutcome {
            payment,
            allocations,
            unallocated: plan.unallocated,
            changes,
        })
    }

    fn apply_plan(&mut self, plan: &AllocationPlan) -> Result<Vec<AppliedAllocation>, LedgerError> {
        let mut applied = Vec::with_capacity(plan.lines.len());

        for line in &plan.lines {
            let tx = self
                .transactions
                .iter_mut()
                .find(|tx| tx.id == line.transaction_id)
                .ok_or(LedgerError::TransactionNotFound(line.transaction_id))?;
            let amount_applied = tx.apply_payment(line.amount)?;
            if tx.balance < Decimal::ZERO {
                return Err(LedgerError::NegativeBalance {
                    transaction_id: tx.id,
                    balance: tx.balance,
                });
            }
            applied.push(AppliedAllocation {
                transaction_id: tx.id,
                quality_type: tx.quality_type().map(ToString::to_string),
                amount_applied,
                new_balance: tx.balance,
                new_status: tx.payment_status,
            });
        }

        Ok(applied)
    }

    fn check_bank_account(
        &self,
        method: PaymentMethod,
        bank_account_id: Option<BankAccountId>,
        bank_accounts: &[BankAccount],
    ) -> Result<(), LedgerError> {
        match (method.requires_bank_account(), bank_account_id) {
            (true, None) => Err(LedgerError::MissingBankAccount),
            (false, Some(id)) => Err(LedgerError::UnexpectedBankAccount(id)),
            (false, None) => Ok(()),
            (true, Some(id)) => {
                let account = bank_accounts
                    .iter()
                    .find(|a| a.id == id && a.customer_id == self.customer_id)
                    .ok_or(LedgerError::BankAccountNotFound(id))?;
                if account.is_active {
                    Ok(())
                } else {
                    Err(LedgerError::BankAccountInactive(id))
                }
            }
        }
    }

    fn ensure_customer(&self, given: CustomerId) -> Result<(), LedgerError> {
        if given == self.customer_id {
            Ok(())
        } else {
            Err(LedgerError::CustomerMismatch {
                expected: self.customer_id,
                given,
            })
        }
    }

    /// Picks a unique creation timestamp at database precision.
    ///
    /// Live entries always land after the latest stored one; backdated
    /// entries keep their instant unless it collides with an existing row.
    fn place(&self, occurred_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
        let tick = Duration::microseconds(1);
        let mut candidate = occurred_at.unwrap_or(now).trunc_subsecs(6);

        if occurred_at.is_none()
            && let Some(latest) = self.transactions.last().map(|tx| tx.created_at)
            && candidate <= latest
        {
            candidate = latest + tick;
        }
        while self.transactions.iter().any(|tx| tx.created_at == candidate) {
            candidate += tick;
        }

        candidate
    }

    fn insert(&mut self, tx: Transaction) -> usize {
        let index = self
            .transactions
            .partition_point(|existing| (existing.created_at, existing.id) < (tx.created_at, tx.id));
        self.transactions.insert(index, tx);
        index
    }

    fn cascade_after(&mut self, index: usize) -> Vec<TransactionId> {
        match self.backdate_policy {
            BackdatePolicy::Cascade => RunningBalanceCalculator::cascade(&mut self.transactions, index + 1),
            BackdatePolicy::Snapshot => Vec::new(),
        }
    }
}
