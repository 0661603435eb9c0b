//! Step 3: payment method and transaction reference.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use super::ValidationError;

/// Supported payment methods. Payments are settled outside the shop; the
/// visitor only reports a transaction reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    JazzCash,
    EasyPaisa,
    BankTransfer,
    CashOnDelivery,
}

impl PaymentMethod {
    pub const ALL: [Self; 4] = [
        Self::JazzCash,
        Self::EasyPaisa,
        Self::BankTransfer,
        Self::CashOnDelivery,
    ];

    /// Form value.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::JazzCash => "jazzcash",
            Self::EasyPaisa => "easypaisa",
            Self::BankTransfer => "bank",
            Self::CashOnDelivery => "cod",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::JazzCash => "JazzCash",
            Self::EasyPaisa => "EasyPaisa",
            Self::BankTransfer => "Bank Transfer",
            Self::CashOnDelivery => "Cash on Delivery",
        }
    }

    /// Everything except cash on delivery is paid up front.
    #[must_use]
    pub const fn requires_transaction_id(self) -> bool {
        !matches!(self, Self::CashOnDelivery)
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Unknown payment method slug.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown payment method: {0}")]
pub struct UnknownPaymentMethod(pub String);

impl FromStr for PaymentMethod {
    type Err = UnknownPaymentMethod;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.slug() == s)
            .ok_or_else(|| UnknownPaymentMethod(s.to_string()))
    }
}

/// Payment form as entered so far.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentDraft {
    pub method: Option<PaymentMethod>,
    pub transaction_id: String,
}

impl PaymentDraft {
    /// Whether the transaction reference input applies to the chosen method.
    #[must_use]
    pub fn needs_transaction_id(&self) -> bool {
        self.method
            .is_some_and(PaymentMethod::requires_transaction_id)
    }

    /// Produce a validated payment.
    ///
    /// # Errors
    ///
    /// Returns an error if no method is selected, or if the method needs a
    /// transaction reference and none was entered.
    pub fn validate(&self) -> Result<PaymentInfo, ValidationError> {
        let method = self.method.ok_or(ValidationError::MissingPaymentMethod)?;
        if !method.requires_transaction_id() {
            return Ok(PaymentInfo {
                method,
                transaction_id: None,
            });
        }
        if self.transaction_id.is_empty() {
            return Err(ValidationError::MissingTransactionId);
        }
        Ok(PaymentInfo {
            method,
            transaction_id: Some(self.transaction_id.clone()),
        })
    }
}

/// A payment that passed validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInfo {
    pub method: PaymentMethod,
    /// Absent for cash on delivery.
    pub transaction_id: Option<String>,
}
