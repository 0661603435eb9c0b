//! Session-related types.
//!
//! Everything the storefront remembers about a visitor lives in their
//! server-side session under the keys in [`keys`].

use serde::{Deserialize, Serialize};
use tower_sessions::Session;

use thrivo_core::session::SessionUser;

use crate::identity::{ProviderSession, ProviderTokens};

/// Session-stored identity: the user as last reported by the provider plus
/// the tokens needed to ask again.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredAuth {
    pub user: SessionUser,
    pub tokens: ProviderTokens,
}

impl From<ProviderSession> for StoredAuth {
    fn from(session: ProviderSession) -> Self {
        Self {
            user: session.user,
            tokens: session.tokens,
        }
    }
}

/// Session keys.
pub mod keys {
    /// Key for the signed-in user and provider tokens.
    pub const AUTH: &str = "auth";

    /// Key for the one-shot message shown on the next page.
    pub const FLASH: &str = "flash";

    /// Key for the checkout draft.
    pub const CHECKOUT: &str = "checkout";

    /// Key for the verification email resend cooldown.
    pub const RESEND_COOLDOWN: &str = "resend_cooldown";
}

/// Flash message severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Info,
    Error,
}

/// A message carried across one redirect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub kind: FlashKind,
    pub message: String,
}

impl Flash {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Info,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: FlashKind::Error,
            message: message.into(),
        }
    }

    /// CSS modifier for the banner.
    #[must_use]
    pub const fn css_class(&self) -> &'static str {
        match self.kind {
            FlashKind::Info => "banner--info",
            FlashKind::Error => "banner--error",
        }
    }

    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.kind, FlashKind::Error)
    }

    /// Store for the next page render, replacing any pending message.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be modified.
    pub async fn push(self, session: &Session) -> Result<(), tower_sessions::session::Error> {
        session.insert(keys::FLASH, self).await
    }

    /// Take the pending message, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be read.
    pub async fn take(session: &Session) -> Result<Option<Self>, tower_sessions::session::Error> {
        session.remove(keys::FLASH).await
    }
}
