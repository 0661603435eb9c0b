//! Per-request view of the visitor's authentication session.
//!
//! [`SessionContext`] wraps the tower session and publishes the current
//! [`AuthSession`] on a watch channel. Handlers change the session only
//! through [`SessionContext::establish`], [`SessionContext::refresh`] and
//! [`SessionContext::end`]; the gate subscribes around each request and
//! reacts to whatever was published.

use std::sync::Arc;

use axum::{extract::FromRequestParts, http::request::Parts};
use tokio::sync::watch;
use tower_sessions::Session;

use thrivo_core::session::{AuthSession, SessionMode, SessionUser};

use crate::error::AppError;
use crate::identity::{ProviderSession, ProviderTokens};
use crate::models::{StoredAuth, session_keys};

/// The visitor's session for the duration of one request.
///
/// Cheap to clone; clones share the same channel.
#[derive(Clone)]
pub struct SessionContext {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    session: Session,
    auth: watch::Sender<AuthSession>,
}

impl SessionContext {
    /// Read the stored identity out of `session`.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store cannot be read.
    pub async fn load(session: Session) -> Result<Self, AppError> {
        let stored: Option<StoredAuth> = session.get(session_keys::AUTH).await?;
        let auth = stored.map_or_else(AuthSession::signed_out, |s| AuthSession::signed_in(s.user));
        let (auth, _) = watch::channel(auth);
        Ok(Self {
            inner: Arc::new(ContextInner { session, auth }),
        })
    }

    /// The session as last published.
    #[must_use]
    pub fn current(&self) -> AuthSession {
        self.inner.auth.borrow().clone()
    }

    #[must_use]
    pub fn mode(&self) -> SessionMode {
        self.inner.auth.borrow().mode()
    }

    /// The signed-in user, if any.
    #[must_use]
    pub fn user(&self) -> Option<SessionUser> {
        self.inner.auth.borrow().user().cloned()
    }

    /// The underlying tower session.
    #[must_use]
    pub fn session(&self) -> &Session {
        &self.inner.session
    }

    /// Provider tokens for the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns an error if the session store cannot be read.
    pub async fn tokens(&self) -> Result<Option<ProviderTokens>, AppError> {
        let stored: Option<StoredAuth> = self.inner.session.get(session_keys::AUTH).await?;
        Ok(stored.map(|s| s.tokens))
    }

    /// Provider tokens, treating their absence as a broken session.
    ///
    /// # Errors
    ///
    /// Returns an error if no tokens are stored or the store cannot be read.
    pub async fn require_tokens(&self) -> Result<ProviderTokens, AppError> {
        self.tokens()
            .await?
            .ok_or_else(|| AppError::Internal("signed-in session has no provider tokens".into()))
    }

    /// Start observing session changes.
    ///
    /// Changes published before this call are not reported.
    #[must_use]
    pub fn subscribe(&self) -> SessionSubscription {
        SessionSubscription {
            rx: self.inner.auth.subscribe(),
        }
    }

    /// Sign the visitor in with a fresh provider session.
    ///
    /// The session ID is cycled and any state left over from a previous
    /// identity (checkout draft, resend cooldown) is discarded.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn establish(&self, provider: ProviderSession) -> Result<(), AppError> {
        let session = &self.inner.session;
        session.cycle_id().await?;
        session.remove_value(session_keys::CHECKOUT).await?;
        session.remove_value(session_keys::RESEND_COOLDOWN).await?;
        self.store(provider).await
    }

    /// Replace the stored user with a newer report from the provider.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn refresh(&self, provider: ProviderSession) -> Result<(), AppError> {
        self.store(provider).await
    }

    /// Keep newer provider tokens for the same user.
    ///
    /// Nothing is published; the user and mode are unchanged.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be read or modified.
    pub async fn update_tokens(&self, tokens: ProviderTokens) -> Result<(), AppError> {
        let session = &self.inner.session;
        if let Some(mut stored) = session.get::<StoredAuth>(session_keys::AUTH).await? {
            stored.tokens = tokens;
            session.insert(session_keys::AUTH, stored).await?;
        }
        Ok(())
    }

    /// Sign the visitor out, dropping everything held in the session.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be deleted.
    pub async fn end(&self) -> Result<(), AppError> {
        self.inner.session.flush().await?;
        self.inner.auth.send_replace(AuthSession::signed_out());
        Ok(())
    }

    async fn store(&self, provider: ProviderSession) -> Result<(), AppError> {
        let stored = StoredAuth::from(provider);
        let user = stored.user.clone();
        self.inner.session.insert(session_keys::AUTH, stored).await?;
        self.inner.auth.send_replace(AuthSession::signed_in(user));
        Ok(())
    }
}

impl<S> FromRequestParts<S> for SessionContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        if let Some(ctx) = parts.extensions.get::<Self>() {
            return Ok(ctx.clone());
        }

        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer missing".into()))?;
        let ctx = Self::load(session).await?;
        parts.extensions.insert(ctx.clone());
        Ok(ctx)
    }
}

/// A registration for session change notifications.
///
/// Dropping the subscription unregisters it; [`Self::unsubscribe`] does the
/// same explicitly.
pub struct SessionSubscription {
    rx: watch::Receiver<AuthSession>,
}

impl SessionSubscription {
    /// The latest published session if it changed since the last check.
    pub fn changed(&mut self) -> Option<AuthSession> {
        if self.rx.has_changed().unwrap_or(false) {
            Some(self.rx.borrow_and_update().clone())
        } else {
            None
        }
    }

    /// Stop receiving notifications.
    pub fn unsubscribe(self) {}
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use secrecy::SecretString;
    use tower_sessions::MemoryStore;

    use thrivo_core::{Email, UserId};

    use super::*;

    fn provider_session(verified: bool) -> ProviderSession {
        ProviderSession {
            user: SessionUser {
                uid: UserId::new("uid-1"),
                email: Email::parse("sana@example.com").unwrap(),
                email_verified: verified,
            },
            tokens: ProviderTokens {
                id_token: SecretString::from("id"),
                refresh_token: SecretString::from("refresh"),
            },
        }
    }

    async fn context() -> SessionContext {
        let session = Session::new(None, Arc::new(MemoryStore::default()), None);
        SessionContext::load(session).await.unwrap()
    }

    #[tokio::test]
    async fn test_empty_session_is_signed_out() {
        let ctx = context().await;
        assert_eq!(ctx.mode(), SessionMode::SignedOut);
        assert!(ctx.tokens().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_subscriber_sees_each_transition() {
        let ctx = context().await;
        let mut sub = ctx.subscribe();
        assert!(sub.changed().is_none());

        ctx.establish(provider_session(false)).await.unwrap();
        assert_eq!(
            sub.changed().unwrap().mode(),
            SessionMode::PendingVerification
        );
        assert!(sub.changed().is_none());

        ctx.refresh(provider_session(true)).await.unwrap();
        assert_eq!(sub.changed().unwrap().mode(), SessionMode::Verified);

        ctx.end().await.unwrap();
        assert_eq!(sub.changed().unwrap().mode(), SessionMode::SignedOut);
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_earlier_changes() {
        let ctx = context().await;
        ctx.establish(provider_session(true)).await.unwrap();
        let mut sub = ctx.subscribe();
        assert!(sub.changed().is_none());
        sub.unsubscribe();
    }

    #[tokio::test]
    async fn test_establish_drops_previous_checkout() {
        let ctx = context().await;
        ctx.session()
            .insert(session_keys::CHECKOUT, "draft")
            .await
            .unwrap();
        ctx.establish(provider_session(true)).await.unwrap();
        let draft: Option<String> = ctx.session().get(session_keys::CHECKOUT).await.unwrap();
        assert!(draft.is_none());
        assert!(ctx.tokens().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_update_tokens_keeps_user_and_mode() {
        use secrecy::ExposeSecret;

        let ctx = context().await;
        ctx.establish(provider_session(false)).await.unwrap();
        let mut sub = ctx.subscribe();

        ctx.update_tokens(ProviderTokens {
            id_token: SecretString::from("id-2"),
            refresh_token: SecretString::from("refresh-2"),
        })
        .await
        .unwrap();

        let tokens = ctx.tokens().await.unwrap().unwrap();
        assert_eq!(tokens.id_token.expose_secret(), "id-2");
        assert_eq!(ctx.mode(), SessionMode::PendingVerification);
        assert!(sub.changed().is_none());
    }
}
