//! Authentication session and the session gate.
//!
//! The gate is a pure function of the last known [`AuthSession`] and the
//! access class of the requested route. It never talks to the identity
//! provider; callers re-run it whenever the session changes.
//!
//! | Access         | Signed out        | Unverified             | Verified        |
//! |----------------|-------------------|------------------------|-----------------|
//! | `PublicOnly`   | render            | verification pending   | redirect home   |
//! | `Protected`    | redirect sign-in  | verification pending   | render          |
//! | `Verification` | redirect sign-in  | render                 | redirect home   |
//! | `Open`         | render            | render                 | render          |

use serde::{Deserialize, Serialize};

use crate::types::{Email, UserId};

/// The signed-in user as last reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    pub uid: UserId,
    pub email: Email,
    pub email_verified: bool,
}

/// The visitor's authentication state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSession {
    user: Option<SessionUser>,
}

impl AuthSession {
    /// A visitor with no identity.
    #[must_use]
    pub const fn signed_out() -> Self {
        Self { user: None }
    }

    /// A visitor signed in as `user`.
    #[must_use]
    pub const fn signed_in(user: SessionUser) -> Self {
        Self { user: Some(user) }
    }

    /// The signed-in user, if any.
    #[must_use]
    pub const fn user(&self) -> Option<&SessionUser> {
        self.user.as_ref()
    }

    /// The mode the gate renders for this session.
    #[must_use]
    pub const fn mode(&self) -> SessionMode {
        match &self.user {
            None => SessionMode::SignedOut,
            Some(user) if !user.email_verified => SessionMode::PendingVerification,
            Some(_) => SessionMode::Verified,
        }
    }
}

/// Rendering mode derived from a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionMode {
    /// No identity: the public surface.
    SignedOut,
    /// Signed in but the email address is not verified yet.
    PendingVerification,
    /// Signed in with a verified email.
    Verified,
}

impl SessionMode {
    /// Short name for logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SignedOut => "signed_out",
            Self::PendingVerification => "pending_verification",
            Self::Verified => "verified",
        }
    }
}

/// Access class of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteAccess {
    /// Only for visitors who are not signed in (sign-in, sign-up, reset).
    PublicOnly,
    /// Requires a verified session.
    Protected,
    /// The verification-pending surface and its actions.
    Verification,
    /// Reachable in every mode (health checks, assets, sign-out).
    Open,
}

/// What the gate does with a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Render the requested route.
    Render,
    /// Send the visitor to the sign-in page.
    RedirectToSignIn,
    /// Send the visitor to the default route.
    RedirectToHome,
    /// Render the verification-pending surface instead of the route.
    ShowVerificationPending,
}

/// Decide how a request for a route with `access` is handled in `mode`.
#[must_use]
pub const fn decide(mode: SessionMode, access: RouteAccess) -> GateDecision {
    use GateDecision::{RedirectToHome, RedirectToSignIn, Render, ShowVerificationPending};

    match (mode, access) {
        (_, RouteAccess::Open)
        | (SessionMode::SignedOut, RouteAccess::PublicOnly)
        | (SessionMode::PendingVerification, RouteAccess::Verification)
        | (SessionMode::Verified, RouteAccess::Protected) => Render,
        (SessionMode::SignedOut, RouteAccess::Protected | RouteAccess::Verification) => {
            RedirectToSignIn
        }
        (SessionMode::PendingVerification, RouteAccess::PublicOnly | RouteAccess::Protected) => {
            ShowVerificationPending
        }
        (SessionMode::Verified, RouteAccess::PublicOnly | RouteAccess::Verification) => {
            RedirectToHome
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const ALL_ACCESS: [RouteAccess; 4] = [
        RouteAccess::PublicOnly,
        RouteAccess::Protected,
        RouteAccess::Verification,
        RouteAccess::Open,
    ];

    fn user(verified: bool) -> SessionUser {
        SessionUser {
            uid: UserId::new("uid-1"),
            email: Email::parse("hira@example.com").unwrap(),
            email_verified: verified,
        }
    }

    #[test]
    fn test_mode_from_session() {
        assert_eq!(AuthSession::signed_out().mode(), SessionMode::SignedOut);
        assert_eq!(
            AuthSession::signed_in(user(false)).mode(),
            SessionMode::PendingVerification
        );
        assert_eq!(
            AuthSession::signed_in(user(true)).mode(),
            SessionMode::Verified
        );
    }

    #[test]
    fn test_signed_out_sees_public_surface() {
        let mode = AuthSession::signed_out().mode();
        assert_eq!(decide(mode, RouteAccess::PublicOnly), GateDecision::Render);
        assert_eq!(
            decide(mode, RouteAccess::Protected),
            GateDecision::RedirectToSignIn
        );
        assert_eq!(
            decide(mode, RouteAccess::Verification),
            GateDecision::RedirectToSignIn
        );
    }

    #[test]
    fn test_unverified_always_sees_verification_page() {
        let mode = AuthSession::signed_in(user(false)).mode();
        for access in [RouteAccess::PublicOnly, RouteAccess::Protected] {
            assert_eq!(decide(mode, access), GateDecision::ShowVerificationPending);
        }
        assert_eq!(decide(mode, RouteAccess::Verification), GateDecision::Render);
    }

    #[test]
    fn test_verified_never_sees_verification_page() {
        let mode = AuthSession::signed_in(user(true)).mode();
        for access in ALL_ACCESS {
            assert_ne!(decide(mode, access), GateDecision::ShowVerificationPending);
        }
        assert_eq!(decide(mode, RouteAccess::Protected), GateDecision::Render);
        assert_eq!(
            decide(mode, RouteAccess::PublicOnly),
            GateDecision::RedirectToHome
        );
    }

    #[test]
    fn test_open_routes_render_in_every_mode() {
        for mode in [
            SessionMode::SignedOut,
            SessionMode::PendingVerification,
            SessionMode::Verified,
        ] {
            assert_eq!(decide(mode, RouteAccess::Open), GateDecision::Render);
        }
    }
}
