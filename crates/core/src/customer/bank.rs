//! Customer bank accounts.
//!
//! A customer has at most one default account. The first account added
//! becomes the default, and promoting another account demotes the current
//! one in the same step.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_shared::types::{BankAccountId, CustomerId};

use super::error::CustomerError;

/// A bank account a customer pays from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BankAccount {
    /// Unique identifier.
    pub id: BankAccountId,
    /// Owning customer.
    pub customer_id: CustomerId,
    /// Name on the account.
    pub account_holder_name: String,
    /// Bank name.
    pub bank_name: String,
    /// Account number, unique per customer.
    pub account_number: String,
    /// Branch IFSC code.
    pub ifsc_code: String,
    /// Whether payments may reference this account.
    pub is_active: bool,
    /// Whether this is the customer's default account.
    pub is_default: bool,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

/// Input for adding a bank account.
#[derive(Debug, Clone, Deserialize)]
pub struct NewBankAccount {
    /// Owning customer.
    pub customer_id: CustomerId,
    /// Name on the account.
    pub account_holder_name: String,
    /// Bank name.
    pub bank_name: String,
    /// Account number.
    pub account_number: String,
    /// Branch IFSC code.
    pub ifsc_code: String,
    /// Request to make this the default account.
    #[serde(default)]
    pub is_default: bool,
}

/// Accounts whose stored row changed during a bank account operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BankAccountChanges {
    /// Newly added account.
    pub inserted: Option<BankAccountId>,
    /// Existing accounts that were modified.
    pub updated: Vec<BankAccountId>,
}

/// All bank accounts of one customer.
#[derive(Debug, Clone)]
pub struct BankAccountBook {
    customer_id: CustomerId,
    accounts: Vec<BankAccount>,
}

impl BankAccountBook {
    /// Wraps a customer's existing accounts.
    #[must_use]
    pub fn new(customer_id: CustomerId, accounts: Vec<BankAccount>) -> Self {
        Self {
            customer_id,
            accounts,
        }
    }

    /// The owning customer.
    #[must_use]
    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    /// All accounts, in insertion order.
    #[must_use]
    pub fn accounts(&self) -> &[BankAccount] {
        &self.accounts
    }

    /// Looks up an account.
    #[must_use]
    pub fn get(&self, id: BankAccountId) -> Option<&BankAccount> {
        self.accounts.iter().find(|a| a.id == id)
    }

    /// The current default account.
    #[must_use]
    pub fn default_account(&self) -> Option<&BankAccount> {
        self.accounts.iter().find(|a| a.is_default)
    }

    /// Adds an account.
    ///
    /// The first account is always made default; a later one only when requested.
    ///
    /// # Errors
    ///
    /// Returns an error for blank fields, a malformed IFSC code or a
    /// duplicate account number.
    pub fn add(
        &mut self,
        input: NewBankAccount,
        now: DateTime<Utc>,
    ) -> Result<(BankAccount, BankAccountChanges), CustomerError> {
        if input.customer_id != self.customer_id {
            return Err(CustomerError::CustomerMismatch {
                expected: self.customer_id,
                given: input.customer_id,
            });
        }

        let holder = input.account_holder_name.trim();
        if holder.is_empty() {
            return Err(CustomerError::BlankField("account_holder_name"));
        }
        let bank_name = input.bank_name.trim();
        if bank_name.is_empty() {
            return Err(CustomerError::BlankField("bank_name"));
        }
        let account_number: String = input
            .account_number
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        if account_number.is_empty() {
            return Err(CustomerError::BlankField("account_number"));
        }
        let ifsc_code = input.ifsc_code.trim().to_ascii_uppercase();
        if !is_valid_ifsc(&ifsc_code) {
            return Err(CustomerError::InvalidIfsc(input.ifsc_code));
        }
        if self.accounts.iter().any(|a| a.account_number == account_number) {
            return Err(CustomerError::DuplicateAccountNumber {
                customer_id: self.customer_id,
                account_number,
            });
        }

        let is_default = input.is_default || self.accounts.is_empty();
        let updated = if is_default {
            self.clear_default(now)
        } else {
            Vec::new()
        };

        let account = BankAccount {
            id: BankAccountId::new(),
            customer_id: self.customer_id,
            account_holder_name: holder.to_string(),
            bank_name: bank_name.to_string(),
            account_number,
            ifsc_code,
            is_active: true,
            is_default,
            created_at: now,
            updated_at: now,
        };
        let id = account.id;
        self.accounts.push(account.clone());

        Ok((
            account,
            BankAccountChanges {
                inserted: Some(id),
                updated,
            },
        ))
    }

    /// Makes `id` the default account, demoting the previous default.
    ///
    /// # Errors
    ///
    /// Returns an error if the account is unknown or inactive.
    pub fn set_default(
        &mut self,
        id: BankAccountId,
        now: DateTime<Utc>,
    ) -> Result<BankAccountChanges, CustomerError> {
        let target = self.get(id).ok_or(CustomerError::BankAccountNotFound {
            customer_id: self.customer_id,
            account_id: id,
        })?;
        if !target.is_active {
            return Err(CustomerError::BankAccountInactive(id));
        }
        if target.is_default {
            return Ok(BankAccountChanges::default());
        }

        let mut updated = self.clear_default(now);
        if let Some(account) = self.accounts.iter_mut().find(|a| a.id == id) {
            account.is_default = true;
            account.updated_at = now;
            updated.push(id);
        }

        Ok(BankAccountChanges {
            inserted: None,
            updated,
        })
    }

    /// Deactivates an account. A deactivated account loses its default flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the account is unknown.
    pub fn deactivate(
        &mut self,
        id: BankAccountId,
        now: DateTime<Utc>,
    ) -> Result<BankAccountChanges, CustomerError> {
        let customer_id = self.customer_id;
        let account = self
            .accounts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(CustomerError::BankAccountNotFound {
                customer_id,
                account_id: id,
            })?;

        if !account.is_active {
            return Ok(BankAccountChanges::default());
        }
        account.is_active = false;
        account.is_default = false;
        account.updated_at = now;

        Ok(BankAccountChanges {
            inserted: None,
            updated: vec![id],
        })
    }

    fn clear_default(&mut self, now: DateTime<Utc>) -> Vec<BankAccountId> {
        self.accounts
            .iter_mut()
            .filter(|a| a.is_default)
            .map(|a| {
                a.is_default = false;
                a.updated_at = now;
                a.id
            })
            .collect()
    }
}

/// IFSC: 4 letters, `0`, then 6 alphanumerics.
fn is_valid_ifsc(code: &str) -> bool {
    let bytes = code.as_bytes();
    bytes.len() == 11
        && bytes[..4].iter().all(u8::is_ascii_uppercase)
        && bytes[4] == b'0'
        && bytes[5..].iter().all(u8::is_ascii_alphanumeric)
}
