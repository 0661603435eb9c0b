//! Identity provider port.
//!
//! Accounts, passwords and email verification live with an external
//! identity provider. The storefront only holds the provider's tokens in the
//! visitor's session and asks the provider for the current [`SessionUser`]
//! whenever it needs to.
//!
//! Two implementations:
//! - [`FirebaseIdentityProvider`] talks to Firebase Authentication over REST
//! - [`InMemoryIdentityProvider`] keeps accounts in process memory for local
//!   development and tests

mod firebase;
mod memory;

pub use firebase::FirebaseIdentityProvider;
pub use memory::InMemoryIdentityProvider;

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use thrivo_core::Email;
use thrivo_core::session::SessionUser;

use crate::config::IdentityConfig;

/// Minimum password length accepted by the provider.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// A rejected identity provider call.
///
/// The `Display` text is shown to the visitor as-is.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("An account with this email already exists")]
    EmailInUse,

    #[error("{0}")]
    WeakPassword(String),

    #[error("Too many requests. Please wait a moment and try again.")]
    RateLimited,

    #[error("No account found with this email")]
    UserNotFound,

    #[error("Please enter a valid email address")]
    InvalidEmail,

    #[error("Your session has expired. Please sign in again.")]
    SessionExpired,

    /// The provider could not be reached. The detail is for logs only.
    #[error("Could not reach the sign-in service. Please try again.")]
    Network(String),

    #[error("{0}")]
    Rejected(String),
}

/// Tokens the provider issued for a signed-in user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderTokens {
    #[serde(with = "secret_serde")]
    pub id_token: SecretString,
    #[serde(with = "secret_serde")]
    pub refresh_token: SecretString,
}

/// A signed-in user together with the tokens that prove it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSession {
    pub user: SessionUser,
    pub tokens: ProviderTokens,
}

/// Operations the storefront needs from an identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Sign in with email and password.
    async fn sign_in(&self, email: &Email, password: &str)
    -> Result<ProviderSession, ProviderError>;

    /// Create an account and sign it in. New accounts are unverified.
    async fn sign_up(&self, email: &Email, password: &str)
    -> Result<ProviderSession, ProviderError>;

    /// Revoke the session's tokens. Best effort; never fails.
    async fn sign_out(&self, tokens: &ProviderTokens);

    /// Email the signed-in user a verification link.
    ///
    /// Returns the tokens the request went through with. They differ from
    /// `tokens` when an expired ID token had to be refreshed first.
    async fn send_verification_email(
        &self,
        tokens: &ProviderTokens,
    ) -> Result<ProviderTokens, ProviderError>;

    /// Fetch the user's current state, including verification status.
    async fn reload_session(&self, tokens: &ProviderTokens)
    -> Result<ProviderSession, ProviderError>;

    /// Email a password reset link.
    async fn reset_password(&self, email: &Email) -> Result<(), ProviderError>;
}

/// Build the provider selected in configuration.
#[must_use]
pub fn from_config(config: &IdentityConfig) -> Arc<dyn IdentityProvider> {
    match config {
        IdentityConfig::Firebase(firebase) => Arc::new(FirebaseIdentityProvider::new(firebase)),
        IdentityConfig::InMemory => Arc::new(InMemoryIdentityProvider::new()),
    }
}

/// Serde adapter for secrets kept in the server-side session store.
mod secret_serde {
    use secrecy::{ExposeSecret, SecretString};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(secret: &SecretString, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(secret.expose_secret())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<SecretString, D::Error> {
        String::deserialize(deserializer).map(SecretString::from)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn test_tokens_roundtrip_through_session_store_format() {
        let tokens = ProviderTokens {
            id_token: SecretString::from("id-123"),
            refresh_token: SecretString::from("refresh-456"),
        };
        let value = serde_json::to_value(&tokens).unwrap();
        let back: ProviderTokens = serde_json::from_value(value).unwrap();
        assert_eq!(back.id_token.expose_secret(), "id-123");
        assert_eq!(back.refresh_token.expose_secret(), "refresh-456");
    }

    #[test]
    fn test_tokens_debug_is_redacted() {
        let tokens = ProviderTokens {
            id_token: SecretString::from("id-123"),
            refresh_token: SecretString::from("refresh-456"),
        };
        let debug = format!("{tokens:?}");
        assert!(!debug.contains("id-123"));
        assert!(!debug.contains("refresh-456"));
    }

    #[test]
    fn test_network_detail_not_shown() {
        let err = ProviderError::Network("connection refused".to_string());
        assert!(!err.to_string().contains("refused"));
    }
}
