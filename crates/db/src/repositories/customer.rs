//! Customer repository: registry and bank accounts.

use chrono::Utc;
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, DatabaseTransaction,
    EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use tally_core::customer::{
    BankAccount, BankAccountBook, BankAccountChanges, Customer, CustomerError, NewBankAccount,
    NewCustomer,
};
use tally_shared::types::{BankAccountId, CustomerId, PageRequest, PageResponse};
use tracing::info;

use super::error::RepositoryError;
use super::locking::{begin, lock_customer};
use super::mapping;
use crate::entities::{bank_accounts, customers};

/// Customer repository.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    db: DatabaseConnection,
}

impl CustomerRepository {
    /// Creates a new customer repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Registers a customer.
    pub async fn create(&self, input: NewCustomer) -> Result<Customer, RepositoryError> {
        let customer = input.into_customer(Utc::now())?;
        mapping::customer_row(&customer).insert(&self.db).await?;

        info!(customer_id = %customer.id, name = %customer.name, "Customer created");
        Ok(customer)
    }

    /// Gets a customer by id.
    pub async fn get(&self, id: CustomerId) -> Result<Customer, RepositoryError> {
        let model = customers::Entity::find_by_id(id.into_inner())
            .one(&self.db)
            .await?
            .ok_or(CustomerError::NotFound(id))?;
        mapping::customer(model)
    }

    /// Searches customers by name, phone or company name, ordered by name.
    pub async fn search(
        &self,
        query: &str,
        page: PageRequest,
    ) -> Result<PageResponse<Customer>, RepositoryError> {
        let mut select = customers::Entity::find();
        let needle = query.trim().to_lowercase();
        if !needle.is_empty() {
            let pattern = format!("%{}%", escape_like(&needle));
            select = select.filter(
                Condition::any()
                    .add(
                        Expr::expr(Func::lower(Expr::col(customers::Column::Name)))
                            .like(pattern.as_str()),
                    )
                    .add(customers::Column::PhoneNumber.like(pattern.as_str()))
                    .add(
                        Expr::expr(Func::lower(Expr::col(customers::Column::CompanyName)))
                            .like(pattern.as_str()),
                    ),
            );
        }

        let total = select.clone().count(&self.db).await?;
        let models = select
            .order_by_asc(customers::Column::Name)
            .order_by_asc(customers::Column::Id)
            .offset(page.offset())
            .limit(page.limit())
            .all(&self.db)
            .await?;

        let data = models
            .into_iter()
            .map(mapping::customer)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(PageResponse::new(data, page.page, page.per_page, total))
    }

    /// Lists a customer's bank accounts, oldest first.
    pub async fn list_bank_accounts(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<BankAccount>, RepositoryError> {
        self.get(customer_id).await?;
        Ok(load_bank_accounts(&self.db, customer_id).await?)
    }

    /// Adds a bank account. The first account of a customer becomes its default.
    pub async fn add_bank_account(
        &self,
        input: NewBankAccount,
    ) -> Result<BankAccount, RepositoryError> {
        let txn = begin(&self.db).await?;
        let customer_id = input.customer_id;
        lock_customer(&txn, customer_id).await?;

        let mut book = load_book(&txn, customer_id).await?;
        let (account, changes) = book.add(input, Utc::now())?;
        persist_accounts(&txn, &book, &changes).await?;

        txn.commit().await?;

        info!(
            customer_id = %customer_id,
            bank_account_id = %account.id,
            is_default = account.is_default,
            "Bank account added"
        );
        Ok(account)
    }

    /// Makes an account the customer's default.
    pub async fn set_default_bank_account(
        &self,
        customer_id: CustomerId,
        account_id: BankAccountId,
    ) -> Result<BankAccount, RepositoryError> {
        let txn = begin(&self.db).await?;
        lock_customer(&txn, customer_id).await?;

        let mut book = load_book(&txn, customer_id).await?;
        let changes = book.set_default(account_id, Utc::now())?;
        persist_accounts(&txn, &book, &changes).await?;

        txn.commit().await?;

        info!(customer_id = %customer_id, bank_account_id = %account_id, "Default bank account set");
        account_of(&book, account_id)
    }

    /// Deactivates an account. Payments can no longer reference it.
    pub async fn deactivate_bank_account(
        &self,
        customer_id: CustomerId,
        account_id: BankAccountId,
    ) -> Result<BankAccount, RepositoryError> {
        let txn = begin(&self.db).await?;
        lock_customer(&txn, customer_id).await?;

        let mut book = load_book(&txn, customer_id).await?;
        let changes = book.deactivate(account_id, Utc::now())?;
        persist_accounts(&txn, &book, &changes).await?;

        txn.commit().await?;

        info!(customer_id = %customer_id, bank_account_id = %account_id, "Bank account deactivated");
        account_of(&book, account_id)
    }
}

fn account_of(book: &BankAccountBook, id: BankAccountId) -> Result<BankAccount, RepositoryError> {
    book.get(id).cloned().ok_or_else(|| {
        CustomerError::BankAccountNotFound {
            customer_id: book.customer_id(),
            account_id: id,
        }
        .into()
    })
}

/// Escapes `LIKE` wildcards so the query matches literally.
fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for ch in query.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Loads a customer's accounts, oldest first.
pub(crate) async fn load_bank_accounts<C>(
    db: &C,
    customer_id: CustomerId,
) -> Result<Vec<BankAccount>, sea_orm::DbErr>
where
    C: sea_orm::ConnectionTrait,
{
    let models = bank_accounts::Entity::find()
        .filter(bank_accounts::Column::CustomerId.eq(customer_id.into_inner()))
        .order_by_asc(bank_accounts::Column::CreatedAt)
        .order_by_asc(bank_accounts::Column::Id)
        .all(db)
        .await?;
    Ok(models.into_iter().map(mapping::bank_account).collect())
}

async fn load_book(
    txn: &DatabaseTransaction,
    customer_id: CustomerId,
) -> Result<BankAccountBook, RepositoryError> {
    let accounts = load_bank_accounts(txn, customer_id).await?;
    Ok(BankAccountBook::new(customer_id, accounts))
}

/// Writes the rows an operation touched. Demotions go first so the partial
/// unique index on the default flag never sees two defaults.
async fn persist_accounts(
    txn: &DatabaseTransaction,
    book: &BankAccountBook,
    changes: &BankAccountChanges,
) -> Result<(), RepositoryError> {
    let mut updated: Vec<&BankAccount> = changes
        .updated
        .iter()
        .filter_map(|id| book.get(*id))
        .collect();
    updated.sort_by_key(|account| account.is_default);

    for account in updated {
        mapping::bank_account_row(account).update(txn).await?;
    }
    if let Some(account) = changes.inserted.and_then(|id| book.get(id)) {
        mapping::bank_account_row(account).insert(txn).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_like_wildcards() {
        assert_eq!(escape_like("ravi"), "ravi");
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("a\\b"), "a\\\\b");
    }
}
