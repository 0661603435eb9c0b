//! Thrivo Core - domain types and state machines.
//!
//! Used by the `storefront` crate. Everything here is synchronous and free
//! of I/O: no HTTP, no identity provider calls, no clock reads. Callers pass
//! in the current time and a random number generator where one is needed.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for ids, prices and email addresses
//! - [`catalog`] - The built-in product catalog and listing filters
//! - [`session`] - Authentication session and the session gate
//! - [`cooldown`] - Resend cooldown for verification emails
//! - [`checkout`] - The three-step checkout wizard

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod catalog;
pub mod checkout;
pub mod cooldown;
pub mod session;
pub mod types;

pub use types::*;
