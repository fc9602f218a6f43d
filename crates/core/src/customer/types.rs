//! Customer records and tax identifiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tally_shared::types::CustomerId;

use super::error::CustomerError;

/// Tax identifier carried by a customer.
///
/// Exactly one identifier kind is stored; the discriminator travels with the value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum TaxIdentifier {
    /// GSTIN: 2-digit state code, embedded PAN, entity digit, `Z`, checksum.
    Gst(String),
    /// Permanent Account Number: `AAAAA9999A`.
    Pan(String),
    /// Aadhaar: 12 digits.
    Aadhaar(String),
}

impl TaxIdentifier {
    /// Short label of the identifier kind.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Gst(_) => "GST",
            Self::Pan(_) => "PAN",
            Self::Aadhaar(_) => "Aadhaar",
        }
    }

    /// The raw identifier value.
    #[must_use]
    pub fn value(&self) -> &str {
        match self {
            Self::Gst(v) | Self::Pan(v) | Self::Aadhaar(v) => v,
        }
    }

    /// Normalizes (trim, uppercase, spaces removed for Aadhaar) and validates the format.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTaxIdentifier` if the value does not match its kind.
    pub fn normalized(&self) -> Result<Self, CustomerError> {
        let normalized = match self {
            Self::Gst(v) => Self::Gst(v.trim().to_ascii_uppercase()),
            Self::Pan(v) => Self::Pan(v.trim().to_ascii_uppercase()),
            Self::Aadhaar(v) => Self::Aadhaar(v.chars().filter(|c| !c.is_whitespace()).collect()),
        };

        let valid = match &normalized {
            Self::Gst(v) => is_valid_gstin(v),
            Self::Pan(v) => is_valid_pan(v),
            Self::Aadhaar(v) => v.len() == 12 && v.bytes().all(|b| b.is_ascii_digit()),
        };

        if valid {
            Ok(normalized)
        } else {
            Err(CustomerError::InvalidTaxIdentifier {
                kind: self.label(),
                value: self.value().to_string(),
            })
        }
    }
}

fn is_valid_pan(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 10
        && bytes[..5].iter().all(u8::is_ascii_uppercase)
        && bytes[5..9].iter().all(u8::is_ascii_digit)
        && bytes[9].is_ascii_uppercase()
}

fn is_valid_gstin(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 15
        && bytes[..2].iter().all(u8::is_ascii_digit)
        && value.get(2..12).is_some_and(is_valid_pan)
        && bytes[12].is_ascii_alphanumeric()
        && bytes[13] == b'Z'
        && bytes[14].is_ascii_alphanumeric()
}

/// A customer of the business.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Unique identifier.
    pub id: CustomerId,
    /// Display name.
    pub name: String,
    /// Contact phone number.
    pub phone_number: String,
    /// Contact email.
    pub email: Option<String>,
    /// Postal address.
    pub address: Option<String>,
    /// Trading name, if any.
    pub company_name: Option<String>,
    /// Tax identifier, if recorded.
    pub tax_identifier: Option<TaxIdentifier>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Case-insensitive match against name, phone or company name.
    #[must_use]
    pub fn matches(&self, query: &str) -> bool {
        let query = query.trim().to_lowercase();
        if query.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&query)
            || self.phone_number.contains(&query)
            || self
                .company_name
                .as_deref()
                .is_some_and(|c| c.to_lowercase().contains(&query))
    }
}

/// Input for registering a customer.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewCustomer {
    /// Display name.
    pub name: String,
    /// Contact phone number.
    pub phone_number: String,
    /// Contact email.
    pub email: Option<String>,
    /// Postal address.
    pub address: Option<String>,
    /// Trading name.
    pub company_name: Option<String>,
    /// Tax identifier.
    pub tax_identifier: Option<TaxIdentifier>,
}

impl NewCustomer {
    /// Validates the input and builds the customer record.
    ///
    /// # Errors
    ///
    /// Returns an error for blank name or phone, a malformed email or tax identifier.
    pub fn into_customer(self, now: DateTime<Utc>) -> Result<Customer, CustomerError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(CustomerError::BlankField("name"));
        }
        let phone_number = self.phone_number.trim();
        if phone_number.is_empty() {
            return Err(CustomerError::BlankField("phone_number"));
        }

        let email = non_blank(self.email);
        if let Some(email) = &email {
            let well_formed = email
                .split_once('@')
                .is_some_and(|(local, domain)| !local.is_empty() && domain.contains('.'));
            if !well_formed {
                return Err(CustomerError::InvalidEmail(email.clone()));
            }
        }

        let tax_identifier = self
            .tax_identifier
            .as_ref()
            .map(TaxIdentifier::normalized)
            .transpose()?;

        Ok(Customer {
            id: CustomerId::new(),
            name: name.to_string(),
            phone_number: phone_number.to_string(),
            email,
            address: non_blank(self.address),
            company_name: non_blank(self.company_name),
            tax_identifier,
            created_at: now,
            updated_at: now,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
