//! View models shared by page templates.
//!
//! Every page extends `base.html`, which renders the header from [`Nav`] and
//! an optional flash banner. [`PageChrome`] gathers both for a handler.

use thrivo_core::catalog::Product;
use thrivo_core::session::{AuthSession, SessionMode};

use crate::error::AppError;
use crate::middleware::SessionContext;
use crate::models::Flash;

/// Header state: who is signed in and which link is current.
#[derive(Debug, Clone, Default)]
pub struct Nav {
    pub user_email: Option<String>,
    pub verified: bool,
    pub active: &'static str,
}

impl Nav {
    #[must_use]
    pub fn for_session(auth: &AuthSession, active: &'static str) -> Self {
        Self {
            user_email: auth.user().map(|u| u.email.as_str().to_string()),
            verified: auth.mode() == SessionMode::Verified,
            active,
        }
    }

    /// Whether `name` is the current section.
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.active == name
    }
}

/// Header plus the pending flash message, if any.
pub struct PageChrome {
    pub nav: Nav,
    pub flash: Option<Flash>,
}

impl PageChrome {
    /// Build the chrome and consume the pending flash.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be read.
    pub async fn take(ctx: &SessionContext, active: &'static str) -> Result<Self, AppError> {
        let flash = Flash::take(ctx.session()).await?;
        Ok(Self {
            nav: Nav::for_session(&ctx.current(), active),
            flash,
        })
    }
}

/// A product card.
#[derive(Debug, Clone)]
pub struct ProductView {
    pub id: u32,
    pub name: String,
    pub category: &'static str,
    pub image_url: String,
    pub description: String,
    pub long_description: String,
    pub price: String,
    pub original_price: String,
    pub discount_percent: u32,
    pub rating: String,
    pub reviews: u32,
    pub in_stock: bool,
    pub protein: String,
    pub calories: String,
    pub carbs: String,
    pub fat: String,
}

impl From<&Product> for ProductView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.get(),
            name: product.name.clone(),
            category: product.category.label(),
            image_url: product.image_url.clone(),
            description: product.description.clone(),
            long_description: product.long_description.clone(),
            price: product.price.display(),
            original_price: product.original_price.display(),
            discount_percent: product.discount_percent(),
            rating: product.rating.to_string(),
            reviews: product.reviews,
            in_stock: product.in_stock,
            protein: product.nutrition.protein.clone(),
            calories: product.nutrition.calories.clone(),
            carbs: product.nutrition.carbs.clone(),
            fat: product.nutrition.fat.clone(),
        }
    }
}
