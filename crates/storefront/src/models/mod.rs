//! Domain models for storefront.

pub mod session;

pub use session::{Flash, FlashKind, StoredAuth, keys as session_keys};
