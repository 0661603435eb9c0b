//! Core types for the Thrivo storefront.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod price;

pub use email::{Email, EmailError};
pub use id::{OrderReference, ProductId, UserId};
pub use price::{CurrencyCode, Price};
