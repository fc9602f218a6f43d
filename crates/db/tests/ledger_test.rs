//! Integration tests for the ledger repository.

mod common;

use chrono::{Duration, Utc};
use futures::future::join_all;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tally_core::customer::NewBankAccount;
use tally_core::ledger::{
    AllocationRequest, ManualAllocation, PaymentMethod, PaymentStatus, TransactionFilter,
    TransactionKind,
};
use tally_db::{BulkPaymentEntry, CustomerRepository, LedgerRepository};
use tally_shared::ErrorKind;
use tally_shared::config::LedgerConfig;
use tally_shared::types::PageRequest;

#[tokio::test]
async fn test_payment_allocates_oldest_first() {
    let Some(db) = common::setup().await else {
        return;
    };
    let customer = common::create_customer(&db).await;
    let repo = LedgerRepository::new(db, LedgerConfig::default());

    let t1 = repo
        .create_stock(common::stock(customer.id, "A", dec!(3), dec!(10)))
        .await
        .unwrap()
        .transaction;
    let t2 = repo
        .create_stock(common::stock(customer.id, "B", dec!(5), dec!(10)))
        .await
        .unwrap()
        .transaction;

    let outcome = repo
        .create_payment(common::cash(customer.id, dec!(40)))
        .await
        .unwrap();
    assert_eq!(outcome.unallocated, Decimal::ZERO);
    assert_eq!(outcome.allocations.len(), 2);

    let pending = repo.list_pending(customer.id).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, t2.id);
    assert_eq!(pending[0].balance, dec!(40));
    assert_eq!(pending[0].payment_status, PaymentStatus::Partial);

    let balance = repo.get_customer_balance(customer.id).await.unwrap();
    assert_eq!(balance.total_pending, dec!(40));
    assert_eq!(balance.net_balance, dec!(40));
    assert!(!balance.is_advance);
    assert_ne!(t1.id, t2.id);
}

#[tokio::test]
async fn test_advance_is_consumed_by_next_stock() {
    let Some(db) = common::setup().await else {
        return;
    };
    let customer = common::create_customer(&db).await;
    let repo = LedgerRepository::new(db, LedgerConfig::default());

    repo.create_payment(common::cash(customer.id, dec!(20)))
        .await
        .unwrap();
    let balance = repo.get_customer_balance(customer.id).await.unwrap();
    assert!(balance.is_advance);
    assert_eq!(balance.advance_amount, dec!(20));

    let recorded = repo
        .create_stock(common::stock(customer.id, "A", dec!(5), dec!(10)))
        .await
        .unwrap();
    assert_eq!(recorded.transaction.amount_paid, dec!(20));
    assert_eq!(recorded.transaction.balance, dec!(30));
    assert_eq!(recorded.transaction.payment_status, PaymentStatus::Partial);
    assert_eq!(recorded.position.quantity, dec!(5));
    assert_eq!(recorded.position.total_cost, dec!(50));
}

#[tokio::test]
async fn test_bank_payment_requires_active_account() {
    let Some(db) = common::setup().await else {
        return;
    };
    let customer = common::create_customer(&db).await;
    let customers = CustomerRepository::new(db.clone());
    let repo = LedgerRepository::new(db, LedgerConfig::default());

    let mut input = common::cash(customer.id, dec!(10));
    input.method = PaymentMethod::Bank;
    let err = repo.create_payment(input.clone()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidArgument);

    let account = customers
        .add_bank_account(NewBankAccount {
            customer_id: customer.id,
            account_holder_name: "Holder".to_string(),
            bank_name: "Bank".to_string(),
            account_number: "5555666677".to_string(),
            ifsc_code: "HDFC0000123".to_string(),
            is_default: false,
        })
        .await
        .unwrap();
    input.bank_account_id = Some(account.id);
    let outcome = repo.create_payment(input.clone()).await.unwrap();
    assert_eq!(outcome.payment.payment_method(), Some(PaymentMethod::Bank));

    customers
        .deactivate_bank_account(customer.id, account.id)
        .await
        .unwrap();
    assert!(repo.create_payment(input).await.is_err());
}

#[tokio::test]
async fn test_manual_allocation_targets_named_stock() {
    let Some(db) = common::setup().await else {
        return;
    };
    let customer = common::create_customer(&db).await;
    let repo = LedgerRepository::new(db, LedgerConfig::default());

    let first = repo
        .create_stock(common::stock(customer.id, "A", dec!(1), dec!(30)))
        .await
        .unwrap()
        .transaction;
    let second = repo
        .create_stock(common::stock(customer.id, "A", dec!(1), dec!(50)))
        .await
        .unwrap()
        .transaction;

    let mut input = common::cash(customer.id, dec!(50));
    input.allocation = AllocationRequest::Manual(vec![ManualAllocation {
        transaction_id: second.id,
        amount: dec!(50),
    }]);
    repo.create_payment(input).await.unwrap();

    let pending = repo.list_pending(customer.id).await.unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, first.id);
}

#[tokio::test]
async fn test_sub_cent_figures_are_stored_at_column_scale() {
    let Some(db) = common::setup().await else {
        return;
    };
    let customer = common::create_customer(&db).await;
    let repo = LedgerRepository::new(db, LedgerConfig::default());

    let stock = repo
        .create_stock(common::stock(customer.id, "A", dec!(2.545), dec!(20)))
        .await
        .unwrap()
        .transaction;
    assert_eq!(stock.quantity(), Some(dec!(2.54)));
    assert_eq!(stock.total, dec!(50.80));

    let mut input = common::cash(customer.id, dec!(20));
    input.allocation = AllocationRequest::Manual(vec![ManualAllocation {
        transaction_id: stock.id,
        amount: dec!(10.005),
    }]);
    repo.create_payment(input).await.unwrap();

    let pending = repo.list_pending(customer.id).await.unwrap();
    assert_eq!(pending[0].quantity(), Some(dec!(2.54)));
    assert_eq!(pending[0].amount_paid, dec!(10.00));
    assert_eq!(pending[0].balance, dec!(40.80));
    assert_eq!(pending[0].amount_paid + pending[0].balance, pending[0].total);
}

#[tokio::test]
async fn test_backdated_stock_cascades_running_balance() {
    let Some(db) = common::setup().await else {
        return;
    };
    let customer = common::create_customer(&db).await;
    let repo = LedgerRepository::new(db, LedgerConfig::default());

    repo.create_stock(common::stock(customer.id, "A", dec!(10), dec!(10)))
        .await
        .unwrap();
    let mut backdated = common::stock(customer.id, "A", dec!(1), dec!(5));
    backdated.occurred_at = Some(Utc::now() - Duration::days(3));
    repo.create_stock(backdated).await.unwrap();

    let history = repo
        .list_transactions(
            customer.id,
            &TransactionFilter::default(),
            PageRequest::new(1, 10),
        )
        .await
        .unwrap();
    // Newest first: the later purchase now includes the backdated one.
    assert_eq!(history.data.len(), 2);
    assert_eq!(history.data[0].running_balance, dec!(105));
    assert_eq!(history.data[1].running_balance, dec!(5));
}

#[tokio::test]
async fn test_bulk_payments_continue_after_rejection() {
    let Some(db) = common::setup().await else {
        return;
    };
    let customer = common::create_customer(&db).await;
    let repo = LedgerRepository::new(db, LedgerConfig::default());
    repo.create_stock(common::stock(customer.id, "A", dec!(10), dec!(10)))
        .await
        .unwrap();

    let entry = |amount| BulkPaymentEntry {
        customer_id: customer.id,
        method: PaymentMethod::Upi,
        amount,
        bank_account_id: None,
        occurred_at: None,
        notes: None,
    };
    let results = repo
        .create_bulk_payments(vec![entry(dec!(30)), entry(dec!(-5)), entry(dec!(20))], None, "clerk")
        .await;

    assert_eq!(results.len(), 3);
    assert!(results[0].outcome.is_ok());
    assert_eq!(results[1].outcome.as_ref().unwrap_err().kind(), ErrorKind::InvalidArgument);
    assert!(results[2].outcome.is_ok());

    let balance = repo.get_customer_balance(customer.id).await.unwrap();
    assert_eq!(balance.net_balance, dec!(50));
}

#[tokio::test]
async fn test_payment_insights_by_method() {
    let Some(db) = common::setup().await else {
        return;
    };
    let customer = common::create_customer(&db).await;
    let repo = LedgerRepository::new(db, LedgerConfig::default());
    let from = Utc::now() - Duration::seconds(1);

    repo.create_payment(common::cash(customer.id, dec!(15)))
        .await
        .unwrap();
    let mut upi = common::cash(customer.id, dec!(25));
    upi.method = PaymentMethod::Upi;
    repo.create_payment(upi).await.unwrap();

    let to = Utc::now() + Duration::seconds(1);
    let insights = repo
        .payment_insights(from, to, &[PaymentMethod::Upi])
        .await
        .unwrap();
    // Other tests may write payments concurrently; only check the filter.
    assert!(insights.by_method.iter().all(|m| m.method == PaymentMethod::Upi));
    assert!(insights.total >= dec!(25));

    let payments = repo
        .list_transactions(
            customer.id,
            &TransactionFilter {
                kind: Some(TransactionKind::Payment),
                ..Default::default()
            },
            PageRequest::new(1, 10),
        )
        .await
        .unwrap();
    assert_eq!(payments.meta.total, 2);
}

#[tokio::test]
async fn test_history_filters_and_pages_newest_first() {
    let Some(db) = common::setup().await else {
        return;
    };
    let customer = common::create_customer(&db).await;
    let repo = LedgerRepository::new(db, LedgerConfig::default());

    let mut ids = Vec::new();
    for amount in [dec!(10), dec!(20), dec!(30)] {
        let outcome = repo
            .create_payment(common::cash(customer.id, amount))
            .await
            .unwrap();
        ids.push(outcome.payment.id);
    }
    let mut upi = common::cash(customer.id, dec!(40));
    upi.method = PaymentMethod::Upi;
    repo.create_payment(upi).await.unwrap();

    let cash_only = TransactionFilter {
        payment_method: Some(PaymentMethod::Cash),
        ..Default::default()
    };
    let first = repo
        .list_transactions(customer.id, &cash_only, PageRequest::new(1, 2))
        .await
        .unwrap();
    assert_eq!(first.meta.total, 3);
    assert_eq!(first.meta.total_pages, 2);
    assert_eq!(
        first.data.iter().map(|tx| tx.id).collect::<Vec<_>>(),
        vec![ids[2], ids[1]]
    );

    let second = repo
        .list_transactions(customer.id, &cash_only, PageRequest::new(2, 2))
        .await
        .unwrap();
    assert_eq!(second.data.len(), 1);
    assert_eq!(second.data[0].id, ids[0]);

    let stock_only = TransactionFilter {
        kind: Some(TransactionKind::Stock),
        ..Default::default()
    };
    let none = repo
        .list_transactions(customer.id, &stock_only, PageRequest::new(1, 10))
        .await
        .unwrap();
    assert!(none.data.is_empty());
    assert_eq!(none.meta.total, 0);
}

#[tokio::test]
async fn test_concurrent_payments_serialize_per_customer() {
    let Some(db) = common::setup().await else {
        return;
    };
    let customer = common::create_customer(&db).await;
    let repo = LedgerRepository::new(db, LedgerConfig::default());
    repo.create_stock(common::stock(customer.id, "A", dec!(100), dec!(10)))
        .await
        .unwrap();

    const PAYMENTS: usize = 20;
    let handles: Vec<_> = (0..PAYMENTS)
        .map(|_| {
            let repo = repo.clone();
            let input = common::cash(customer.id, dec!(10));
            tokio::spawn(async move { repo.create_payment(input).await })
        })
        .collect();

    let mut succeeded = Decimal::ZERO;
    for result in join_all(handles).await {
        match result.expect("Task panicked") {
            Ok(outcome) => succeeded += outcome.payment.amount_paid,
            Err(err) => assert!(err.is_retryable(), "Unexpected error: {err}"),
        }
    }

    let balance = repo.get_customer_balance(customer.id).await.unwrap();
    assert_eq!(balance.net_balance, dec!(1000) - succeeded);

    let pending = repo.list_pending(customer.id).await.unwrap();
    let stock = &pending[0];
    assert_eq!(stock.amount_paid + stock.balance, stock.total);
    assert_eq!(stock.amount_paid, succeeded);
}
