//! Initial schema: customers, bank accounts, the transaction ledger and
//! inventory positions with their expense records.
//!
//! Every money, quantity and rate column is a fixed-point `NUMERIC`.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(INITIAL_SQL).await?;
        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let db = manager.get_connection();
        db.execute_unprepared(DROP_SQL).await?;
        Ok(())
    }
}

const INITIAL_SQL: &str = r"
CREATE TYPE transaction_kind AS ENUM ('stock', 'payment');
CREATE TYPE payment_method AS ENUM ('cash', 'bank', 'upi');
CREATE TYPE payment_status AS ENUM ('pending', 'partial', 'paid', 'overpaid');
CREATE TYPE tax_identifier_kind AS ENUM ('gst', 'pan', 'aadhaar');

-- Customers
CREATE TABLE customers (
    id UUID PRIMARY KEY,
    name VARCHAR(255) NOT NULL,
    phone_number VARCHAR(32) NOT NULL,
    email VARCHAR(255),
    address TEXT,
    company_name VARCHAR(255),
    tax_identifier_kind tax_identifier_kind,
    tax_identifier_value VARCHAR(15),
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT chk_tax_identifier_pair CHECK (
        (tax_identifier_kind IS NULL) = (tax_identifier_value IS NULL)
    )
);

CREATE INDEX idx_customers_name ON customers(lower(name));
CREATE INDEX idx_customers_phone ON customers(phone_number);

-- Bank accounts
CREATE TABLE bank_accounts (
    id UUID PRIMARY KEY,
    customer_id UUID NOT NULL REFERENCES customers(id) ON DELETE CASCADE,
    account_holder_name VARCHAR(255) NOT NULL,
    bank_name VARCHAR(255) NOT NULL,
    account_number VARCHAR(34) NOT NULL,
    ifsc_code CHAR(11) NOT NULL,
    is_active BOOLEAN NOT NULL DEFAULT true,
    is_default BOOLEAN NOT NULL DEFAULT false,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_bank_accounts_number UNIQUE (customer_id, account_number),
    CONSTRAINT chk_default_is_active CHECK (NOT is_default OR is_active)
);

-- At most one default account per customer
CREATE UNIQUE INDEX uq_bank_accounts_default ON bank_accounts(customer_id) WHERE is_default;

-- Transactions
CREATE TABLE transactions (
    id UUID PRIMARY KEY,
    customer_id UUID NOT NULL REFERENCES customers(id) ON DELETE RESTRICT,
    kind transaction_kind NOT NULL,
    quality_type VARCHAR(100),
    quantity NUMERIC(14, 2),
    rate NUMERIC(14, 3),
    payment_method payment_method,
    bank_account_id UUID REFERENCES bank_accounts(id) ON DELETE RESTRICT,
    total NUMERIC(14, 2) NOT NULL,
    amount_paid NUMERIC(14, 2) NOT NULL DEFAULT 0,
    balance NUMERIC(14, 2) NOT NULL DEFAULT 0,
    running_balance NUMERIC(14, 2) NOT NULL,
    payment_status payment_status NOT NULL,
    notes TEXT,
    created_at TIMESTAMPTZ NOT NULL,
    created_by VARCHAR(255) NOT NULL,
    CONSTRAINT chk_stock_fields CHECK (
        kind <> 'stock'
        OR (quality_type IS NOT NULL AND quantity >= 0 AND rate >= 0 AND payment_method IS NULL)
    ),
    CONSTRAINT chk_payment_fields CHECK (
        kind <> 'payment'
        OR (payment_method IS NOT NULL AND quality_type IS NULL AND balance = 0)
    ),
    CONSTRAINT chk_bank_payment CHECK (
        CASE WHEN payment_method = 'bank' THEN bank_account_id IS NOT NULL
             ELSE bank_account_id IS NULL
        END
    ),
    CONSTRAINT chk_stock_settlement CHECK (
        kind <> 'stock' OR (amount_paid + balance = total AND balance >= 0)
    ),
    CONSTRAINT chk_total_non_negative CHECK (total >= 0),
    CONSTRAINT uq_transactions_customer_time UNIQUE (customer_id, created_at)
);

CREATE INDEX idx_transactions_customer_time ON transactions(customer_id, created_at, id);
CREATE INDEX idx_transactions_pending ON transactions(customer_id, created_at)
    WHERE kind = 'stock' AND payment_status IN ('pending', 'partial');
CREATE INDEX idx_transactions_payments ON transactions(created_at, payment_method)
    WHERE kind = 'payment';

-- Inventory positions
CREATE TABLE inventory_positions (
    id UUID PRIMARY KEY,
    customer_id UUID NOT NULL REFERENCES customers(id) ON DELETE CASCADE,
    quality_type VARCHAR(100) NOT NULL,
    quantity NUMERIC(14, 2) NOT NULL DEFAULT 0,
    total_cost NUMERIC(14, 2) NOT NULL DEFAULT 0,
    avg_cost NUMERIC(14, 3) NOT NULL DEFAULT 0,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    updated_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    CONSTRAINT uq_inventory_positions_key UNIQUE (customer_id, quality_type)
);

-- Inventory expense records
CREATE TABLE inventory_expenses (
    id UUID PRIMARY KEY,
    position_id UUID NOT NULL REFERENCES inventory_positions(id) ON DELETE CASCADE,
    customer_id UUID NOT NULL REFERENCES customers(id) ON DELETE CASCADE,
    quality_type VARCHAR(100) NOT NULL,
    weight_loss NUMERIC(14, 2) NOT NULL DEFAULT 0,
    expenditure NUMERIC(14, 2) NOT NULL DEFAULT 0,
    is_processing BOOLEAN NOT NULL DEFAULT false,
    old_quantity NUMERIC(14, 2) NOT NULL,
    new_quantity NUMERIC(14, 2) NOT NULL,
    old_avg_cost NUMERIC(14, 3) NOT NULL,
    new_avg_cost NUMERIC(14, 3) NOT NULL,
    notes TEXT,
    created_by VARCHAR(255) NOT NULL,
    created_at TIMESTAMPTZ NOT NULL,
    CONSTRAINT chk_expense_non_negative CHECK (weight_loss >= 0 AND expenditure >= 0),
    CONSTRAINT chk_expense_not_empty CHECK (weight_loss > 0 OR expenditure > 0)
);

CREATE INDEX idx_inventory_expenses_customer ON inventory_expenses(customer_id, created_at DESC);
CREATE INDEX idx_inventory_expenses_position ON inventory_expenses(position_id);
";

const DROP_SQL: &str = r"
DROP TABLE IF EXISTS inventory_expenses CASCADE;
DROP TABLE IF EXISTS inventory_positions CASCADE;
DROP TABLE IF EXISTS transactions CASCADE;
DROP TABLE IF EXISTS bank_accounts CASCADE;
DROP TABLE IF EXISTS customers CASCADE;
DROP TYPE IF EXISTS tax_identifier_kind;
DROP TYPE IF EXISTS payment_status;
DROP TYPE IF EXISTS payment_method;
DROP TYPE IF EXISTS transaction_kind;
";
