//! Newtype identifiers.
//!
//! Use the `define_id!` macro for numeric catalog ids so ids of different
//! entity types cannot be mixed up. Identity provider user ids and order
//! references are opaque strings and get their own types.

use core::fmt;

use rand::Rng;
use rand::seq::IndexedRandom;
use serde::{Deserialize, Serialize};

/// Macro to define a type-safe numeric ID wrapper.
///
/// Creates a newtype wrapper around `u32` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `Copy`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `get()`
/// - `Display` and `FromStr` (so it can be used as a route parameter)
///
/// # Example
///
/// ```rust
/// # use thrivo_core::define_id;
/// define_id!(ProductId);
/// define_id!(CategoryId);
///
/// let product = ProductId::new(1);
/// let category = CategoryId::new(1);
///
/// // These are different types, so this won't compile:
/// // let _: ProductId = category;
/// assert_eq!("7".parse::<ProductId>().unwrap().get(), 7);
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            Copy,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Create a new ID from a u32 value.
            #[must_use]
            pub const fn new(id: u32) -> Self {
                Self(id)
            }

            /// Get the underlying u32 value.
            #[must_use]
            pub const fn get(self) -> u32 {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = ::core::num::ParseIntError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                s.trim().parse::<u32>().map(Self)
            }
        }
    };
}

define_id!(ProductId);

/// Identity provider user id (Firebase `localId`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    /// Wrap a provider-issued user id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The raw id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Display-only order reference shown after checkout, e.g. `TH4K9Z0QW2B`.
///
/// Nothing is stored under this reference; it only gives the customer
/// something to quote when they get in touch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderReference(String);

impl OrderReference {
    /// Prefix of every reference.
    pub const PREFIX: &'static str = "TH";

    /// Number of random characters after the prefix.
    pub const RANDOM_LEN: usize = 9;

    const ALPHABET: &'static [u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

    /// Generate a fresh random reference.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut reference = String::with_capacity(Self::PREFIX.len() + Self::RANDOM_LEN);
        reference.push_str(Self::PREFIX);
        reference.extend(
            (0..Self::RANDOM_LEN)
                .filter_map(|_| Self::ALPHABET.choose(&mut *rng))
                .map(|&b| char::from(b)),
        );
        Self(reference)
    }

    /// The reference text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    #[test]
    fn test_product_id_from_route_segment() {
        assert_eq!("2".parse::<ProductId>().unwrap(), ProductId::new(2));
        assert!("abc".parse::<ProductId>().is_err());
        assert!("-1".parse::<ProductId>().is_err());
    }

    #[test]
    fn test_order_reference_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        let reference = OrderReference::generate(&mut rng);
        let text = reference.as_str();

        assert!(text.starts_with("TH"));
        assert_eq!(text.len(), 2 + OrderReference::RANDOM_LEN);
        assert!(
            text.chars()
                .skip(2)
                .all(|c| c.is_ascii_digit() || c.is_ascii_uppercase())
        );
    }

    #[test]
    fn test_order_references_differ() {
        let mut rng = StdRng::seed_from_u64(42);
        let first = OrderReference::generate(&mut rng);
        let second = OrderReference::generate(&mut rng);
        assert_ne!(first, second);
    }
}
