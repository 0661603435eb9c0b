//! Type-safe price representation using decimal arithmetic.

use core::fmt;
use core::ops::Add;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price with currency information.
///
/// Amounts are in the currency's standard unit (rupees, not paisa).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit.
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Whole-rupee price, the only kind the storefront catalog uses.
    #[must_use]
    pub fn pkr(amount: i64) -> Self {
        Self::new(Decimal::from(amount), CurrencyCode::PKR)
    }

    /// Price multiplied by a quantity.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self::new(self.amount * Decimal::from(quantity), self.currency_code)
    }

    /// Format for display with thousands separators, e.g. `PKR 5,200`.
    ///
    /// Fractional amounts keep two decimal places (`PKR 1,234.50`).
    #[must_use]
    pub fn display(&self) -> String {
        let rounded = self.amount.round_dp(2);
        let negative = rounded.is_sign_negative() && !rounded.is_zero();
        let abs = rounded.abs();
        let whole = abs.trunc();
        let fraction = abs - whole;

        let mut out = String::from(self.currency_code.code());
        out.push(' ');
        if negative {
            out.push('-');
        }
        out.push_str(&group_thousands(&whole.to_string()));
        if !fraction.is_zero() {
            let cents = (fraction * Decimal::ONE_HUNDRED).trunc().to_string();
            out.push('.');
            if cents.len() < 2 {
                out.push('0');
            }
            out.push_str(&cents);
        }
        out
    }
}

impl Add for Price {
    type Output = Self;

    /// Adds two prices. Both sides are expected to share a currency; the
    /// left-hand currency wins.
    fn add(self, rhs: Self) -> Self::Output {
        debug_assert_eq!(self.currency_code, rhs.currency_code);
        Self::new(self.amount + rhs.amount, self.currency_code)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display())
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    PKR,
    USD,
}

impl CurrencyCode {
    /// The ISO code as shown next to amounts.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::PKR => "PKR",
            Self::USD => "USD",
        }
    }
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
