//! Database transactions with per-customer row locks.
//!
//! Every write to a customer's ledger or inventory happens inside one
//! database transaction that first locks the customer row with
//! `SELECT ... FOR UPDATE`. Writers for the same customer queue behind each
//! other; different customers proceed in parallel.

use sea_orm::{
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, EntityTrait, QueryOrder,
    QuerySelect, TransactionTrait,
};
use tally_core::customer::CustomerError;
use tally_shared::types::CustomerId;

use super::error::RepositoryError;
use crate::entities::customers;

/// Waiting longer than this for a row lock fails with `55P03`.
const LOCK_TIMEOUT: &str = "SET LOCAL lock_timeout = '5s'";

/// Starts a transaction with a bounded lock wait.
pub(crate) async fn begin(db: &DatabaseConnection) -> Result<DatabaseTransaction, RepositoryError> {
    let txn = db.begin().await?;
    txn.execute_unprepared(LOCK_TIMEOUT).await?;
    Ok(txn)
}

/// Locks one customer row for the rest of the transaction.
pub(crate) async fn lock_customer(
    txn: &DatabaseTransaction,
    customer_id: CustomerId,
) -> Result<customers::Model, RepositoryError> {
    customers::Entity::find_by_id(customer_id.into_inner())
        .lock_exclusive()
        .one(txn)
        .await?
        .ok_or_else(|| CustomerError::NotFound(customer_id).into())
}

/// Locks every customer in scope, in id order so that two rebuilds cannot
/// deadlock each other.
pub(crate) async fn lock_customers(
    txn: &DatabaseTransaction,
    customer_id: Option<CustomerId>,
) -> Result<Vec<CustomerId>, RepositoryError> {
    if let Some(id) = customer_id {
        lock_customer(txn, id).await?;
        return Ok(vec![id]);
    }

    let ids = customers::Entity::find()
        .select_only()
        .column(customers::Column::Id)
        .order_by_asc(customers::Column::Id)
        .lock_exclusive()
        .into_tuple::<uuid::Uuid>()
        .all(txn)
        .await?;

    Ok(ids.into_iter().map(CustomerId::from_uuid).collect())
}
