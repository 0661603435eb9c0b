//! Product catalog.
//!
//! The shop sells a handful of products, so the catalog is compiled in
//! rather than fetched from a store. [`Catalog::builtin`] is the live
//! catalog; tests may build their own with [`Catalog::new`].

use core::fmt;
use core::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::types::{Price, ProductId};

/// Product category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Protein powders.
    Powder,
    /// Protein bars.
    Bars,
}

impl Category {
    /// All categories in display order.
    pub const ALL: [Self; 2] = [Self::Powder, Self::Bars];

    /// Query-string slug.
    #[must_use]
    pub const fn slug(self) -> &'static str {
        match self {
            Self::Powder => "powder",
            Self::Bars => "bars",
        }
    }

    /// Human-readable name.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Powder => "Protein Powder",
            Self::Bars => "Protein Bars",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

/// Unknown category slug.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown category: {0}")]
pub struct UnknownCategory(pub String);

impl FromStr for Category {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "powder" => Ok(Self::Powder),
            "bars" => Ok(Self::Bars),
            other => Err(UnknownCategory(other.to_string())),
        }
    }
}

/// Per-serving nutrition facts shown on the listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NutritionFacts {
    pub protein: String,
    pub calories: String,
    pub carbs: String,
    pub fat: String,
}

/// A product for sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category: Category,
    pub price: Price,
    /// Pre-discount price, shown struck through.
    pub original_price: Price,
    pub image_url: String,
    pub description: String,
    pub long_description: String,
    /// Average rating out of 5, one decimal place.
    pub rating: Decimal,
    pub reviews: u32,
    pub in_stock: bool,
    pub nutrition: NutritionFacts,
}

impl Product {
    /// Whole-percent discount against the original price (0 when not discounted).
    #[must_use]
    pub fn discount_percent(&self) -> u32 {
        let original = self.original_price.amount;
        if original <= self.price.amount || original.is_zero() {
            return 0;
        }
        ((original - self.price.amount) / original * Decimal::ONE_HUNDRED)
            .round()
            .to_u32()
            .unwrap_or(0)
    }
}

/// Listing filter: an optional category and a free-text name search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogFilter {
    /// `None` means all categories.
    pub category: Option<Category>,
    pub search: String,
}

impl CatalogFilter {
    fn matches(&self, product: &Product) -> bool {
        let category_ok = self.category.is_none_or(|c| c == product.category);
        let needle = self.search.trim().to_lowercase();
        category_ok && (needle.is_empty() || product.name.to_lowercase().contains(&needle))
    }
}

/// The set of products on sale.
#[derive(Debug, Clone)]
pub struct Catalog {
    products: Vec<Product>,
}

impl Catalog {
    /// Build a catalog from a product list.
    #[must_use]
    pub const fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// The shop's products.
    #[must_use]
    pub fn builtin() -> Self {
        Self::new(vec![
            Product {
                id: ProductId::new(1),
                name: "Premium Protein Mix".to_string(),
                category: Category::Powder,
                price: Price::pkr(2500),
                original_price: Price::pkr(3000),
                image_url: "https://images.pexels.com/photos/6287662/pexels-photo-6287662.jpeg?auto=compress&cs=tinysrgb&w=400".to_string(),
                description: "High-quality protein powder blend with essential amino acids for muscle building and recovery".to_string(),
                long_description: "Our Premium Protein Mix is formulated with a blend of whey and casein proteins to provide both fast and slow-releasing amino acids. Perfect for post-workout recovery and daily protein supplementation.".to_string(),
                rating: Decimal::new(48, 1),
                reviews: 124,
                in_stock: true,
                nutrition: NutritionFacts {
                    protein: "25g per serving".to_string(),
                    calories: "120 per serving".to_string(),
                    carbs: "3g per serving".to_string(),
                    fat: "1g per serving".to_string(),
                },
            },
            Product {
                id: ProductId::new(2),
                name: "Energy Protein Bars".to_string(),
                category: Category::Bars,
                price: Price::pkr(1800),
                original_price: Price::pkr(2200),
                image_url: "https://images.pexels.com/photos/6928074/pexels-photo-6928074.jpeg?auto=compress&cs=tinysrgb&w=400".to_string(),
                description: "Delicious protein bars packed with nutrients and natural ingredients for on-the-go nutrition".to_string(),
                long_description: "These protein bars are made with premium ingredients including nuts, seeds, and natural sweeteners. Each bar provides sustained energy and high-quality protein for your active lifestyle.".to_string(),
                rating: Decimal::new(46, 1),
                reviews: 89,
                in_stock: true,
                nutrition: NutritionFacts {
                    protein: "15g per bar".to_string(),
                    calories: "180 per bar".to_string(),
                    carbs: "12g per bar".to_string(),
                    fat: "6g per bar".to_string(),
                },
            },
        ])
    }

    /// All products in catalog order.
    #[must_use]
    pub fn products(&self) -> &[Product] {
        &self.products
    }

    /// Look up a product by id.
    #[must_use]
    pub fn find(&self, id: ProductId) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Products matching a listing filter, in catalog order.
    #[must_use]
    pub fn filter(&self, filter: &CatalogFilter) -> Vec<&Product> {
        self.products.iter().filter(|p| filter.matches(p)).collect()
    }
}
