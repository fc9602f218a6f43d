//! Conversions between stored rows and domain values.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::Set;
use sea_orm::prelude::DateTimeWithTimeZone;
use tally_core::customer::{BankAccount, Customer, TaxIdentifier};
use tally_core::inventory::{InventoryExpenseRecord, InventoryPosition};
use tally_core::ledger::{self, Transaction, TransactionDetail};
use tally_shared::types::{
    BankAccountId, CustomerId, ExpenseRecordId, InventoryPositionId, TransactionId,
};

use super::error::RepositoryError;
use crate::entities::sea_orm_active_enums::{
    PaymentMethod, PaymentStatus, TaxIdentifierKind, TransactionKind,
};
use crate::entities::{
    bank_accounts, customers, inventory_expenses, inventory_positions, transactions,
};

fn utc(value: DateTimeWithTimeZone) -> DateTime<Utc> {
    value.with_timezone(&Utc)
}

// ========== Enums ==========

impl From<ledger::PaymentMethod> for PaymentMethod {
    fn from(value: ledger::PaymentMethod) -> Self {
        match value {
            ledger::PaymentMethod::Cash => Self::Cash,
            ledger::PaymentMethod::Bank => Self::Bank,
            ledger::PaymentMethod::Upi => Self::Upi,
        }
    }
}

impl From<PaymentMethod> for ledger::PaymentMethod {
    fn from(value: PaymentMethod) -> Self {
        match value {
            PaymentMethod::Cash => Self::Cash,
            PaymentMethod::Bank => Self::Bank,
            PaymentMethod::Upi => Self::Upi,
        }
    }
}

impl From<ledger::PaymentStatus> for PaymentStatus {
    fn from(value: ledger::PaymentStatus) -> Self {
        match value {
            ledger::PaymentStatus::Pending => Self::Pending,
            ledger::PaymentStatus::Partial => Self::Partial,
            ledger::PaymentStatus::Paid => Self::Paid,
            ledger::PaymentStatus::Overpaid => Self::Overpaid,
        }
    }
}

impl From<PaymentStatus> for ledger::PaymentStatus {
    fn from(value: PaymentStatus) -> Self {
        match value {
            PaymentStatus::Pending => Self::Pending,
            PaymentStatus::Partial => Self::Partial,
            PaymentStatus::Paid => Self::Paid,
            PaymentStatus::Overpaid => Self::Overpaid,
        }
    }
}

impl From<ledger::TransactionKind> for TransactionKind {
    fn from(value: ledger::TransactionKind) -> Self {
        match value {
            ledger::TransactionKind::Stock => Self::Stock,
            ledger::TransactionKind::Payment => Self::Payment,
        }
    }
}

// ========== Customers ==========

pub(crate) fn customer(model: customers::Model) -> Result<Customer, RepositoryError> {
    let tax_identifier = match (model.tax_identifier_kind, model.tax_identifier_value) {
        (None, None) => None,
        (Some(TaxIdentifierKind::Gst), Some(v)) => Some(TaxIdentifier::Gst(v)),
        (Some(TaxIdentifierKind::Pan), Some(v)) => Some(TaxIdentifier::Pan(v)),
        (Some(TaxIdentifierKind::Aadhaar), Some(v)) => Some(TaxIdentifier::Aadhaar(v)),
        _ => {
            return Err(RepositoryError::CorruptRow {
                table: "customers",
                id: model.id,
                reason: "tax identifier kind and value must be set together",
            });
        }
    };

    Ok(Customer {
        id: CustomerId::from_uuid(model.id),
        name: model.name,
        phone_number: model.phone_number,
        email: model.email,
        address: model.address,
        company_name: model.company_name,
        tax_identifier,
        created_at: utc(model.created_at),
        updated_at: utc(model.updated_at),
    })
}

pub(crate) fn customer_row(customer: &Customer) -> customers::ActiveModel {
    let (kind, value) = match &customer.tax_identifier {
        Some(TaxIdentifier::Gst(v)) => (Some(TaxIdentifierKind::Gst), Some(v.clone())),
        Some(TaxIdentifier::Pan(v)) => (Some(TaxIdentifierKind::Pan), Some(v.clone())),
        Some(TaxIdentifier::Aadhaar(v)) => (Some(TaxIdentifierKind::Aadhaar), Some(v.clone())),
        None => (None, None),
    };

    customers::ActiveModel {
        id: Set(customer.id.into_inner()),
        name: Set(customer.name.clone()),
        phone_number: Set(customer.phone_number.clone()),
        email: Set(customer.email.clone()),
        address: Set(customer.address.clone()),
        company_name: Set(customer.company_name.clone()),
        tax_identifier_kind: Set(kind),
        tax_identifier_value: Set(value),
        created_at: Set(customer.created_at.into()),
        updated_at: Set(customer.updated_at.into()),
    }
}

// ========== Bank accounts ==========

pub(crate) fn bank_account(model: bank_accounts::Model) -> BankAccount {
    BankAccount {
        id: BankAccountId::from_uuid(model.id),
        customer_id: CustomerId::from_uuid(model.customer_id),
        account_holder_name: model.account_holder_name,
        bank_name: model.bank_name,
        account_number: model.account_number,
        ifsc_code: model.ifsc_code,
        is_active: model.is_active,
        is_default: model.is_default,
        created_at: utc(model.created_at),
        updated_at: utc(model.updated_at),
    }
}

pub(crate) fn bank_account_row(account: &BankAccount) -> bank_accounts::ActiveModel {
    bank_accounts::ActiveModel {
        id: Set(account.id.into_inner()),
        customer_id: Set(account.customer_id.into_inner()),
        account_holder_name: Set(account.account_holder_name.clone()),
        bank_name: Set(account.bank_name.clone()),
        account_number: Set(account.account_number.clone()),
        ifsc_code: Set(account.ifsc_code.clone()),
        is_active: Set(account.is_active),
        is_default: Set(account.is_default),
        created_at: Set(account.created_at.into()),
        updated_at: Set(account.updated_at.into()),
    }
}

// ========== Transactions ==========

pub(crate) fn transaction(model: transactions::Model) -> Result<Transaction, RepositoryError> {
    let corrupt = |reason| RepositoryError::CorruptRow {
        table: "transactions",
        id: model.id,
        reason,
    };

    let detail = match model.kind {
        TransactionKind::Stock => TransactionDetail::Stock {
            quality_type: model
                .quality_type
                .clone()
                .ok_or_else(|| corrupt("stock row without quality_type"))?,
            quantity: model
                .quantity
                .ok_or_else(|| corrupt("stock row without quantity"))?,
            rate: model.rate.ok_or_else(|| corrupt("stock row without rate"))?,
        },
        TransactionKind::Payment => TransactionDetail::Payment {
            method: model
                .payment_method
                .ok_or_else(|| corrupt("payment row without payment_method"))?
                .into(),
            bank_account_id: model.bank_account_id.map(BankAccountId::from_uuid),
        },
    };

    Ok(Transaction {
        id: TransactionId::from_uuid(model.id),
        customer_id: CustomerId::from_uuid(model.customer_id),
        detail,
        total: model.total,
        amount_paid: model.amount_paid,
        balance: model.balance,
        running_balance: model.running_balance,
        payment_status: model.payment_status.into(),
        notes: model.notes,
        created_at: utc(model.created_at),
        created_by: model.created_by,
    })
}

pub(crate) fn transactions(
    models: Vec<transactions::Model>,
) -> Result<Vec<Transaction>, RepositoryError> {
    models.into_iter().map(transaction).collect()
}

pub(crate) fn transaction_row(tx: &Transaction) -> transactions::ActiveModel {
    let (quality_type, quantity, rate, method, bank_account_id): (
        Option<String>,
        Option<Decimal>,
        Option<Decimal>,
        Option<PaymentMethod>,
        Option<uuid::Uuid>,
    ) = match &tx.detail {
        TransactionDetail::Stock {
            quality_type,
            quantity,
            rate,
        } => (Some(quality_type.clone()), Some(*quantity), Some(*rate), None, None),
        TransactionDetail::Payment {
            method,
            bank_account_id,
        } => (
            None,
            None,
            None,
            Some((*method).into()),
            bank_account_id.map(BankAccountId::into_inner),
        ),
    };

    transactions::ActiveModel {
        id: Set(tx.id.into_inner()),
        customer_id: Set(tx.customer_id.into_inner()),
        kind: Set(tx.kind().into()),
        quality_type: Set(quality_type),
        quantity: Set(quantity),
        rate: Set(rate),
        payment_method: Set(method),
        bank_account_id: Set(bank_account_id),
        total: Set(tx.total),
        amount_paid: Set(tx.amount_paid),
        balance: Set(tx.balance),
        running_balance: Set(tx.running_balance),
        payment_status: Set(tx.payment_status.into()),
        notes: Set(tx.notes.clone()),
        created_at: Set(tx.created_at.into()),
        created_by: Set(tx.created_by.clone()),
    }
}

// ========== Inventory ==========

pub(crate) fn position(model: inventory_positions::Model) -> InventoryPosition {
    InventoryPosition {
        id: InventoryPositionId::from_uuid(model.id),
        customer_id: CustomerId::from_uuid(model.customer_id),
        quality_type: model.quality_type,
        quantity: model.quantity,
        total_cost: model.total_cost,
        created_at: utc(model.created_at),
        updated_at: utc(model.updated_at),
    }
}

pub(crate) fn position_row(position: &InventoryPosition) -> inventory_positions::ActiveModel {
    inventory_positions::ActiveModel {
        id: Set(position.id.into_inner()),
        customer_id: Set(position.customer_id.into_inner()),
        quality_type: Set(position.quality_type.clone()),
        quantity: Set(position.quantity),
        total_cost: Set(position.total_cost),
        avg_cost: Set(position.avg_cost()),
        created_at: Set(position.created_at.into()),
        updated_at: Set(position.updated_at.into()),
    }
}

pub(crate) fn expense(model: inventory_expenses::Model) -> InventoryExpenseRecord {
    InventoryExpenseRecord {
        id: ExpenseRecordId::from_uuid(model.id),
        position_id: InventoryPositionId::from_uuid(model.position_id),
        customer_id: CustomerId::from_uuid(model.customer_id),
        quality_type: model.quality_type,
        weight_loss: model.weight_loss,
        expenditure: model.expenditure,
        is_processing: model.is_processing,
        old_quantity: model.old_quantity,
        new_quantity: model.new_quantity,
        old_avg_cost: model.old_avg_cost,
        new_avg_cost: model.new_avg_cost,
        notes: model.notes,
        created_by: model.created_by,
        created_at: utc(model.created_at),
    }
}

pub(crate) fn expense_row(record: &InventoryExpenseRecord) -> inventory_expenses::ActiveModel {
    inventory_expenses::ActiveModel {
        id: Set(record.id.into_inner()),
        position_id: Set(record.position_id.into_inner()),
        customer_id: Set(record.customer_id.into_inner()),
        quality_type: Set(record.quality_type.clone()),
        weight_loss: Set(record.weight_loss),
        expenditure: Set(record.expenditure),
        is_processing: Set(record.is_processing),
        old_quantity: Set(record.old_quantity),
        new_quantity: Set(record.new_quantity),
        old_avg_cost: Set(record.old_avg_cost),
        new_avg_cost: Set(record.new_avg_cost),
        notes: Set(record.notes.clone()),
        created_by: Set(record.created_by.clone()),
        created_at: Set(record.created_at.into()),
    }
}
