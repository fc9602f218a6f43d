//! Ledger repository: stock purchases, payments and balance queries.
//!
//! Each write locks the customer row, loads the customer's ledger, lets the
//! core aggregate do the work and writes back exactly the rows it touched,
//! all inside one database transaction.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DatabaseTransaction,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};
use tally_core::customer::CustomerError;
use tally_core::inventory::{InventoryPosition, RebuildScope};
use tally_core::ledger::{
    AllocationRequest, CustomerBalance, CustomerLedger, LedgerChanges, NewPaymentTransaction,
    NewStockTransaction, PaymentInsights, PaymentMethod, PaymentOutcome, Transaction,
    TransactionFilter,
};
use tally_shared::config::LedgerConfig;
use tally_shared::types::{
    AllocationOrder, BackdatePolicy, BankAccountId, CustomerId, PageRequest, PageResponse,
};
use tracing::{info, warn};

use super::customer::load_bank_accounts;
use super::error::RepositoryError;
use super::inventory::{load_book, persist_inventory};
use super::locking::{begin, lock_customer};
use super::mapping;
use crate::entities::sea_orm_active_enums::{self, TransactionKind};
use crate::entities::{customers, transactions};

/// A stored stock purchase and the inventory position it fed.
#[derive(Debug, Clone)]
pub struct RecordedStock {
    /// The stock transaction.
    pub transaction: Transaction,
    /// Position after receiving the stock.
    pub position: InventoryPosition,
}

/// One payment of a bulk settlement. Allocation is always automatic.
#[derive(Debug, Clone)]
pub struct BulkPaymentEntry {
    /// Paying customer.
    pub customer_id: CustomerId,
    /// Payment method.
    pub method: PaymentMethod,
    /// Amount received.
    pub amount: Decimal,
    /// Source bank account for bank payments.
    pub bank_account_id: Option<BankAccountId>,
    /// Backdated creation time.
    pub occurred_at: Option<DateTime<Utc>>,
    /// Optional notes.
    pub notes: Option<String>,
}

/// Outcome of one bulk entry.
#[derive(Debug)]
pub struct BulkPaymentResult {
    /// Position of the entry in the request.
    pub index: usize,
    /// Customer of the entry.
    pub customer_id: CustomerId,
    /// The recorded payment, or why it was rejected.
    pub outcome: Result<PaymentOutcome, RepositoryError>,
}

/// Ledger repository.
#[derive(Debug, Clone)]
pub struct LedgerRepository {
    db: DatabaseConnection,
    config: LedgerConfig,
}

impl LedgerRepository {
    /// Creates a new ledger repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection, config: LedgerConfig) -> Self {
        Self { db, config }
    }

    /// Records a stock purchase and adds it to the customer's inventory.
    ///
    /// An available advance is consumed first. With the cascade policy a
    /// backdated purchase also rewrites the running balance of every later
    /// transaction.
    pub async fn create_stock(
        &self,
        input: NewStockTransaction,
    ) -> Result<RecordedStock, RepositoryError> {
        let customer_id = input.customer_id;
        let txn = begin(&self.db).await?;
        lock_customer(&txn, customer_id).await?;

        let mut ledger = load_ledger(&txn, customer_id, self.config.backdate_policy).await?;
        let now = Utc::now();
        let (transaction, changes) = ledger.record_stock(input, now)?;
        persist_ledger(&txn, &ledger, &changes).await?;

        let scope = RebuildScope {
            customer_id: Some(customer_id),
            quality_type: transaction.quality_type().map(ToString::to_string),
        };
        let mut book = load_book(&txn, &scope, false).await?;
        let (position, inventory_changes) = book.receive_stock(&transaction, now)?;
        persist_inventory(&txn, &book, &inventory_changes).await?;

        txn.commit().await?;

        info!(
            customer_id = %customer_id,
            transaction_id = %transaction.id,
            amount = %transaction.total,
            amount_paid = %transaction.amount_paid,
            status = ?transaction.payment_status,
            cascaded = changes.updated.len(),
            "Stock transaction created"
        );

        Ok(RecordedStock {
            transaction,
            position,
        })
    }

    /// Records a payment and distributes it over outstanding stock.
    pub async fn create_payment(
        &self,
        input: NewPaymentTransaction,
    ) -> Result<PaymentOutcome, RepositoryError> {
        let customer_id = input.customer_id;
        let txn = begin(&self.db).await?;
        lock_customer(&txn, customer_id).await?;

        let mut ledger = load_ledger(&txn, customer_id, self.config.backdate_policy).await?;
        let accounts = load_bank_accounts(&txn, customer_id).await?;
        let outcome = ledger.record_payment(
            input,
            &accounts,
            self.config.default_allocation_order,
            Utc::now(),
        )?;
        persist_ledger(&txn, &ledger, &outcome.changes).await?;

        txn.commit().await?;

        info!(
            customer_id = %customer_id,
            transaction_id = %outcome.payment.id,
            amount = %outcome.payment.amount_paid,
            allocations = outcome.allocations.len(),
            unallocated = %outcome.unallocated,
            "Payment transaction created"
        );
        Ok(outcome)
    }

    /// Records several payments, each in its own database transaction.
    ///
    /// A rejected entry is reported and the batch continues.
    pub async fn create_bulk_payments(
        &self,
        entries: Vec<BulkPaymentEntry>,
        order: Option<AllocationOrder>,
        created_by: &str,
    ) -> Vec<BulkPaymentResult> {
        let mut results = Vec::with_capacity(entries.len());

        for (index, entry) in entries.into_iter().enumerate() {
            let customer_id = entry.customer_id;
            let input = NewPaymentTransaction {
                customer_id,
                method: entry.method,
                amount: entry.amount,
                bank_account_id: entry.bank_account_id,
                allocation: AllocationRequest::Automatic(order),
                occurred_at: entry.occurred_at,
                notes: entry.notes,
                created_by: created_by.to_string(),
            };

            let outcome = self.create_payment(input).await;
            if let Err(err) = &outcome {
                warn!(
                    index,
                    customer_id = %customer_id,
                    error_code = err.error_code(),
                    error = %err,
                    "Bulk payment entry rejected"
                );
            }
            results.push(BulkPaymentResult {
                index,
                customer_id,
                outcome,
            });
        }

        let failed = results.iter().filter(|r| r.outcome.is_err()).count();
        info!(total = results.len(), failed, "Bulk payments processed");
        results
    }

    /// Balance summary of a customer.
    pub async fn get_customer_balance(
        &self,
        customer_id: CustomerId,
    ) -> Result<CustomerBalance, RepositoryError> {
        ensure_customer(&self.db, customer_id).await?;
        let history = load_transactions(&self.db, customer_id).await?;
        Ok(CustomerBalance::from_history(&history))
    }

    /// Stock transactions with money still owed, oldest first.
    pub async fn list_pending(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<Transaction>, RepositoryError> {
        ensure_customer(&self.db, customer_id).await?;
        let models = transactions::Entity::find()
            .filter(transactions::Column::CustomerId.eq(customer_id.into_inner()))
            .filter(transactions::Column::Kind.eq(TransactionKind::Stock))
            .filter(transactions::Column::PaymentStatus.is_in([
                sea_orm_active_enums::PaymentStatus::Pending,
                sea_orm_active_enums::PaymentStatus::Partial,
            ]))
            .filter(transactions::Column::Balance.gt(Decimal::ZERO))
            .order_by_asc(transactions::Column::CreatedAt)
            .order_by_asc(transactions::Column::Id)
            .all(&self.db)
            .await?;
        mapping::transactions(models)
    }

    /// A customer's transactions, newest first, filtered and paginated.
    pub async fn list_transactions(
        &self,
        customer_id: CustomerId,
        filter: &TransactionFilter,
        page: PageRequest,
    ) -> Result<PageResponse<Transaction>, RepositoryError> {
        ensure_customer(&self.db, customer_id).await?;

        let mut query = transactions::Entity::find()
            .filter(transactions::Column::CustomerId.eq(customer_id.into_inner()));
        if let Some(kind) = filter.kind {
            query = query.filter(transactions::Column::Kind.eq(TransactionKind::from(kind)));
        }
        if let Some(method) = filter.payment_method {
            let method: sea_orm_active_enums::PaymentMethod = method.into();
            query = query.filter(transactions::Column::PaymentMethod.eq(method));
        }
        if let Some(from) = filter.from {
            query = query.filter(transactions::Column::CreatedAt.gte(from));
        }
        if let Some(to) = filter.to {
            query = query.filter(transactions::Column::CreatedAt.lte(to));
        }

        let total = query.clone().count(&self.db).await?;
        let models = query
            .order_by_desc(transactions::Column::CreatedAt)
            .order_by_desc(transactions::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        Ok(PageResponse::new(
            mapping::transactions(models)?,
            page.page,
            page.per_page,
            total,
        ))
    }

    /// Payments received in `[from, to]`, totalled per method.
    ///
    /// An empty `methods` slice means all methods.
    pub async fn payment_insights(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        methods: &[PaymentMethod],
    ) -> Result<PaymentInsights, RepositoryError> {
        let mut query = transactions::Entity::find()
            .filter(transactions::Column::Kind.eq(TransactionKind::Payment))
            .filter(transactions::Column::CreatedAt.gte(from))
            .filter(transactions::Column::CreatedAt.lte(to));
        if !methods.is_empty() {
            let stored: Vec<sea_orm_active_enums::PaymentMethod> =
                methods.iter().map(|m| (*m).into()).collect();
            query = query.filter(transactions::Column::PaymentMethod.is_in(stored));
        }
        let payments = mapping::transactions(query.all(&self.db).await?)?;

        Ok(PaymentInsights::compute(&payments, from, to, methods))
    }
}

pub(crate) async fn ensure_customer<C>(db: &C, customer_id: CustomerId) -> Result<(), RepositoryError>
where
    C: ConnectionTrait,
{
    customers::Entity::find_by_id(customer_id.into_inner())
        .one(db)
        .await?
        .ok_or(CustomerError::NotFound(customer_id))?;
    Ok(())
}

async fn load_transactions<C>(
    db: &C,
    customer_id: CustomerId,
) -> Result<Vec<Transaction>, RepositoryError>
where
    C: ConnectionTrait,
{
    let models = transactions::Entity::find()
        .filter(transactions::Column::CustomerId.eq(customer_id.into_inner()))
        .order_by_asc(transactions::Column::CreatedAt)
        .order_by_asc(transactions::Column::Id)
        .all(db)
        .await?;
    mapping::transactions(models)
}

/// Loads a customer's full history as a ledger aggregate.
pub(crate) async fn load_ledger<C>(
    db: &C,
    customer_id: CustomerId,
    policy: BackdatePolicy,
) -> Result<CustomerLedger, RepositoryError>
where
    C: ConnectionTrait,
{
    let history = load_transactions(db, customer_id).await?;
    Ok(CustomerLedger::new(customer_id, history, policy))
}

/// Loads every stock transaction inside `scope`.
pub(crate) async fn load_stock(
    txn: &DatabaseTransaction,
    scope: &RebuildScope,
) -> Result<Vec<Transaction>, RepositoryError> {
    let mut query =
        transactions::Entity::find().filter(transactions::Column::Kind.eq(TransactionKind::Stock));
    if let Some(customer_id) = scope.customer_id {
        query = query.filter(transactions::Column::CustomerId.eq(customer_id.into_inner()));
    }
    if let Some(quality_type) = &scope.quality_type {
        query = query.filter(transactions::Column::QualityType.eq(quality_type.as_str()));
    }
    let models = query
        .order_by_asc(transactions::Column::CreatedAt)
        .order_by_asc(transactions::Column::Id)
        .all(txn)
        .await?;
    mapping::transactions(models)
}

/// Inserts new transactions and rewrites the settlement figures of updated ones.
pub(crate) async fn persist_ledger(
    txn: &DatabaseTransaction,
    ledger: &CustomerLedger,
    changes: &LedgerChanges,
) -> Result<(), RepositoryError> {
    for id in &changes.inserted {
        if let Some(tx) = ledger.get(*id) {
            mapping::transaction_row(tx).insert(txn).await?;
        }
    }

    for id in &changes.updated {
        if changes.inserted.contains(id) {
            continue;
        }
        let Some(tx) = ledger.get(*id) else {
            continue;
        };
        transactions::ActiveModel {
            id: Set(tx.id.into_inner()),
            amount_paid: Set(tx.amount_paid),
            balance: Set(tx.balance),
            running_balance: Set(tx.running_balance),
            payment_status: Set(tx.payment_status.into()),
            ..Default::default()
        }
        .update(txn)
        .await?;
    }

    Ok(())
}
