//! Step 1: the product line and its derived totals.

use serde::{Deserialize, Serialize};

use crate::catalog::Product;
use crate::types::{Price, ProductId};

/// Flat delivery fee in rupees.
pub const DELIVERY_FEE_PKR: i64 = 200;

/// Ordered quantity, never below 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    pub const MIN: Self = Self(1);

    /// Clamp `value` to the minimum.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        if value < Self::MIN.0 {
            Self::MIN
        } else {
            Self(value)
        }
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn incremented(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    #[must_use]
    pub const fn decremented(self) -> Self {
        Self::new(self.0.saturating_sub(1))
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::MIN
    }
}

/// The product being bought and how many.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub unit_price: Price,
    pub quantity: Quantity,
}

impl OrderLine {
    /// A single unit of `product`.
    #[must_use]
    pub fn for_product(product: &Product) -> Self {
        Self {
            product_id: product.id,
            product_name: product.name.clone(),
            unit_price: product.price,
            quantity: Quantity::default(),
        }
    }

    /// Subtotal, delivery fee and total for the current quantity.
    #[must_use]
    pub fn summary(&self) -> OrderSummary {
        let subtotal = self.unit_price.times(self.quantity.get());
        let delivery_fee = Price::pkr(DELIVERY_FEE_PKR);
        OrderSummary {
            unit_price: self.unit_price,
            quantity: self.quantity.get(),
            subtotal,
            delivery_fee,
            total: subtotal + delivery_fee,
        }
    }
}

/// Derived order amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub unit_price: Price,
    pub quantity: u32,
    pub subtotal: Price,
    pub delivery_fee: Price,
    pub total: Price,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;

    #[test]
    fn test_quantity_never_below_one() {
        assert_eq!(Quantity::new(0), Quantity::MIN);
        assert_eq!(Quantity::MIN.decremented(), Quantity::MIN);
        assert_eq!(Quantity::new(3).decremented().get(), 2);

        let mut q = Quantity::new(2);
        for _ in 0..5 {
            q = q.decremented();
            assert!(q.get() >= 1);
        }
    }

    #[test]
    fn test_no_upper_bound() {
        assert_eq!(Quantity::new(500).incremented().get(), 501);
        assert_eq!(Quantity::new(u32::MAX).incremented().get(), u32::MAX);
    }

    #[test]
    fn test_summary_totals() {
        let catalog = Catalog::builtin();
        let product = catalog.find(ProductId::new(1)).unwrap();
        let mut line = OrderLine::for_product(product);
        line.quantity = Quantity::new(2);

        let summary = line.summary();
        assert_eq!(summary.subtotal, Price::pkr(5000));
        assert_eq!(summary.delivery_fee, Price::pkr(200));
        assert_eq!(summary.total, Price::pkr(5200));
        assert_eq!(summary.total.display(), "PKR 5,200");
    }

    #[test]
    fn test_total_formula_holds_for_any_quantity() {
        let catalog = Catalog::builtin();
        for product in catalog.products() {
            let mut line = OrderLine::for_product(product);
            for q in 1..=10 {
                line.quantity = Quantity::new(q);
                let summary = line.summary();
                assert_eq!(
                    summary.total,
                    product.price.times(q) + Price::pkr(DELIVERY_FEE_PKR)
                );
            }
        }
    }
}
