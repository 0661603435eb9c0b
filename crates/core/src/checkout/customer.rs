//! Step 2: customer details.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::ValidationError;
use crate::types::Email;

/// A required customer field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CustomerField {
    Name,
    Phone,
    Email,
    Address,
    City,
}

impl CustomerField {
    /// Form label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Name => "Full Name",
            Self::Phone => "Phone Number",
            Self::Email => "Email",
            Self::Address => "Address",
            Self::City => "City",
        }
    }
}

impl fmt::Display for CustomerField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Editable fields of the customer form. Email is not editable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CustomerInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub city: String,
}

/// Customer form as entered so far.
///
/// Fields are only checked for presence; whatever the visitor typed is
/// accepted as long as it is not empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerDraft {
    name: String,
    email: String,
    phone: String,
    address: String,
    city: String,
}

impl CustomerDraft {
    /// An empty draft with the email fixed to the signed-in account.
    #[must_use]
    pub fn new(email: &Email) -> Self {
        Self {
            name: String::new(),
            email: email.as_str().to_string(),
            phone: String::new(),
            address: String::new(),
            city: String::new(),
        }
    }

    /// Replace the editable fields.
    pub fn update(&mut self, input: CustomerInput) {
        self.name = input.name;
        self.phone = input.phone;
        self.address = input.address;
        self.city = input.city;
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn email(&self) -> &str {
        &self.email
    }

    #[must_use]
    pub fn phone(&self) -> &str {
        &self.phone
    }

    #[must_use]
    pub fn address(&self) -> &str {
        &self.address
    }

    #[must_use]
    pub fn city(&self) -> &str {
        &self.city
    }

    /// Required fields that are still empty, in form order.
    #[must_use]
    pub fn missing_fields(&self) -> Vec<CustomerField> {
        [
            (CustomerField::Name, &self.name),
            (CustomerField::Phone, &self.phone),
            (CustomerField::Email, &self.email),
            (CustomerField::Address, &self.address),
            (CustomerField::City, &self.city),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(field, _)| field)
        .collect()
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }

    /// Produce validated customer details.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::MissingCustomerFields`] listing every empty field.
    pub fn validate(&self) -> Result<CustomerInfo, ValidationError> {
        let missing = self.missing_fields();
        if !missing.is_empty() {
            return Err(ValidationError::MissingCustomerFields(missing));
        }
        Ok(CustomerInfo {
            name: self.name.clone(),
            email: self.email.clone(),
            phone: self.phone.clone(),
            address: self.address.clone(),
            city: self.city.clone(),
        })
    }
}

/// Customer details that passed the presence check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub address: String,
    pub city: String,
}
