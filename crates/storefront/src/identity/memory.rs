//! In-memory identity provider for local development and tests.
//!
//! Follows the same rules as Firebase where the storefront can observe them:
//! unique emails, a 6-character minimum password, new accounts unverified,
//! tokens invalidated on sign-out. Nothing is actually emailed; sends are
//! counted so tests can assert on them.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::RwLock;
use uuid::Uuid;

use thrivo_core::session::SessionUser;
use thrivo_core::{Email, UserId};

use super::{
    IdentityProvider, MIN_PASSWORD_LENGTH, ProviderError, ProviderSession, ProviderTokens,
};

#[derive(Debug, Clone)]
struct Account {
    uid: UserId,
    email: Email,
    password_hash: String,
    email_verified: bool,
    verification_emails_sent: usize,
    password_resets_sent: usize,
}

impl Account {
    fn session_user(&self) -> SessionUser {
        SessionUser {
            uid: self.uid.clone(),
            email: self.email.clone(),
            email_verified: self.email_verified,
        }
    }
}

#[derive(Debug, Default)]
struct Store {
    /// Accounts keyed by [`Email::lookup_key`].
    accounts: HashMap<String, Account>,
    /// Live ID tokens to account lookup key.
    id_tokens: HashMap<String, String>,
}

/// Identity provider that keeps accounts in process memory.
#[derive(Debug, Default)]
pub struct InMemoryIdentityProvider {
    store: RwLock<Store>,
    offline: AtomicBool,
}

impl InMemoryIdentityProvider {
    /// Create an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark an account's email as verified, as clicking the emailed link would.
    ///
    /// Returns `false` if no account has this email.
    pub async fn mark_verified(&self, email: &Email) -> bool {
        let mut store = self.store.write().await;
        store
            .accounts
            .get_mut(&email.lookup_key())
            .map(|account| account.email_verified = true)
            .is_some()
    }

    /// Number of verification emails sent to an account.
    pub async fn verification_emails_sent(&self, email: &Email) -> usize {
        let store = self.store.read().await;
        store
            .accounts
            .get(&email.lookup_key())
            .map_or(0, |a| a.verification_emails_sent)
    }

    /// Number of password reset emails sent to an account.
    pub async fn password_resets_sent(&self, email: &Email) -> usize {
        let store = self.store.read().await;
        store
            .accounts
            .get(&email.lookup_key())
            .map_or(0, |a| a.password_resets_sent)
    }

    /// Simulate the provider being unreachable.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> Result<(), ProviderError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ProviderError::Network(
                "in-memory provider is offline".to_string(),
            ));
        }
        Ok(())
    }

    fn issue_tokens(store: &mut Store, key: &str) -> ProviderTokens {
        let id_token = Uuid::new_v4().simple().to_string();
        store.id_tokens.insert(id_token.clone(), key.to_string());
        ProviderTokens {
            id_token: SecretString::from(id_token),
            refresh_token: SecretString::from(Uuid::new_v4().simple().to_string()),
        }
    }

    fn account_for_token<'a>(
        store: &'a mut Store,
        tokens: &ProviderTokens,
    ) -> Result<&'a mut Account, ProviderError> {
        let key = store
            .id_tokens
            .get(tokens.id_token.expose_secret())
            .cloned()
            .ok_or(ProviderError::SessionExpired)?;
        store
            .accounts
            .get_mut(&key)
            .ok_or(ProviderError::SessionExpired)
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn sign_in(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<ProviderSession, ProviderError> {
        self.ensure_online()?;
        let mut store = self.store.write().await;
        let key = email.lookup_key();
        let account = store
            .accounts
            .get(&key)
            .ok_or(ProviderError::InvalidCredentials)?;
        verify_password(password, &account.password_hash)?;
        let user = account.session_user();
        let tokens = Self::issue_tokens(&mut store, &key);
        Ok(ProviderSession { user, tokens })
    }

    async fn sign_up(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<ProviderSession, ProviderError> {
        self.ensure_online()?;
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ProviderError::WeakPassword(format!(
                "Password should be at least {MIN_PASSWORD_LENGTH} characters"
            )));
        }

        let mut store = self.store.write().await;
        let key = email.lookup_key();
        if store.accounts.contains_key(&key) {
            return Err(ProviderError::EmailInUse);
        }

        let account = Account {
            uid: UserId::new(Uuid::new_v4().simple().to_string()),
            email: email.clone(),
            password_hash: hash_password(password)?,
            email_verified: false,
            verification_emails_sent: 0,
            password_resets_sent: 0,
        };
        let user = account.session_user();
        store.accounts.insert(key.clone(), account);
        let tokens = Self::issue_tokens(&mut store, &key);
        tracing::debug!(uid = %user.uid, "in-memory account created");
        Ok(ProviderSession { user, tokens })
    }

    async fn sign_out(&self, tokens: &ProviderTokens) {
        let mut store = self.store.write().await;
        store.id_tokens.remove(tokens.id_token.expose_secret());
    }

    async fn send_verification_email(
        &self,
        tokens: &ProviderTokens,
    ) -> Result<ProviderTokens, ProviderError> {
        self.ensure_online()?;
        let mut store = self.store.write().await;
        let account = Self::account_for_token(&mut store, tokens)?;
        account.verification_emails_sent += 1;
        tracing::info!(email = %account.email, "verification email recorded (not delivered)");
        Ok(tokens.clone())
    }

    async fn reload_session(
        &self,
        tokens: &ProviderTokens,
    ) -> Result<ProviderSession, ProviderError> {
        self.ensure_online()?;
        let mut store = self.store.write().await;
        let user = Self::account_for_token(&mut store, tokens)?.session_user();
        Ok(ProviderSession {
            user,
            tokens: tokens.clone(),
        })
    }

    async fn reset_password(&self, email: &Email) -> Result<(), ProviderError> {
        self.ensure_online()?;
        let mut store = self.store.write().await;
        let account = store
            .accounts
            .get_mut(&email.lookup_key())
            .ok_or(ProviderError::UserNotFound)?;
        account.password_resets_sent += 1;
        tracing::info!(email = %account.email, "password reset email recorded (not delivered)");
        Ok(())
    }
}

fn hash_password(password: &str) -> Result<String, ProviderError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| ProviderError::Rejected(format!("could not hash password: {e}")))
}

fn verify_password(password: &str, hash: &str) -> Result<(), ProviderError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| ProviderError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| ProviderError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn email(s: &str) -> Email {
        Email::parse(s).unwrap()
    }

    #[tokio::test]
    async fn test_sign_up_creates_unverified_account() {
        let provider = InMemoryIdentityProvider::new();
        let session = provider
            .sign_up(&email("sana@example.com"), "hunter22")
            .await
            .unwrap();
        assert!(!session.user.email_verified);
        assert_eq!(session.user.email.as_str(), "sana@example.com");
    }

    #[tokio::test]
    async fn test_sign_up_rules() {
        let provider = InMemoryIdentityProvider::new();
        assert!(matches!(
            provider.sign_up(&email("sana@example.com"), "12345").await,
            Err(ProviderError::WeakPassword(_))
        ));

        provider
            .sign_up(&email("sana@example.com"), "hunter22")
            .await
            .unwrap();
        assert_eq!(
            provider
                .sign_up(&email("sana@EXAMPLE.com"), "another1")
                .await
                .map(|s| s.user),
            Err(ProviderError::EmailInUse)
        );
    }

    #[tokio::test]
    async fn test_sign_in_checks_password() {
        let provider = InMemoryIdentityProvider::new();
        let address = email("omar@example.com");
        provider.sign_up(&address, "correct-horse").await.unwrap();

        assert!(provider.sign_in(&address, "correct-horse").await.is_ok());
        assert_eq!(
            provider.sign_in(&address, "wrong").await.map(|s| s.user),
            Err(ProviderError::InvalidCredentials)
        );
        assert_eq!(
            provider
                .sign_in(&email("nobody@example.com"), "whatever")
                .await
                .map(|s| s.user),
            Err(ProviderError::InvalidCredentials)
        );
    }

    #[tokio::test]
    async fn test_reload_sees_verification() {
        let provider = InMemoryIdentityProvider::new();
        let address = email("zara@example.com");
        let session = provider.sign_up(&address, "hunter22").await.unwrap();

        let reloaded = provider.reload_session(&session.tokens).await.unwrap();
        assert!(!reloaded.user.email_verified);

        assert!(provider.mark_verified(&address).await);
        let reloaded = provider.reload_session(&session.tokens).await.unwrap();
        assert!(reloaded.user.email_verified);
    }

    #[tokio::test]
    async fn test_sign_out_invalidates_tokens() {
        let provider = InMemoryIdentityProvider::new();
        let session = provider
            .sign_up(&email("ali@example.com"), "hunter22")
            .await
            .unwrap();
        provider.sign_out(&session.tokens).await;
        assert_eq!(
            provider
                .reload_session(&session.tokens)
                .await
                .map(|s| s.user),
            Err(ProviderError::SessionExpired)
        );
    }

    #[tokio::test]
    async fn test_emails_are_counted() {
        let provider = InMemoryIdentityProvider::new();
        let address = email("hina@example.com");
        let session = provider.sign_up(&address, "hunter22").await.unwrap();

        provider
            .send_verification_email(&session.tokens)
            .await
            .unwrap();
        provider.reset_password(&address).await.unwrap();
        assert_eq!(provider.verification_emails_sent(&address).await, 1);
        assert_eq!(provider.password_resets_sent(&address).await, 1);

        assert_eq!(
            provider.reset_password(&email("ghost@example.com")).await,
            Err(ProviderError::UserNotFound)
        );
    }

    #[tokio::test]
    async fn test_offline_rejects_calls() {
        let provider = InMemoryIdentityProvider::new();
        provider.set_offline(true);
        assert!(matches!(
            provider.sign_in(&email("a@example.com"), "hunter22").await,
            Err(ProviderError::Network(_))
        ));
    }
}
