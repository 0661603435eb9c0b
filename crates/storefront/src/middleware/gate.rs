//! The session gate.
//!
//! Every page route is wrapped in one of [`public_only`], [`protected`] or
//! [`verification`]. The middleware asks [`decide`] what to do for the
//! visitor's current session and either runs the handler, redirects, or
//! renders the verification-pending page in its place.
//!
//! While the handler runs the gate holds a [`SessionSubscription`]; when the
//! handler signs the visitor in or out, or verification completes, the
//! transition is logged and the Sentry user is updated.

use axum::{
    extract::Request,
    http::{Method, Uri},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use thrivo_core::session::{AuthSession, GateDecision, RouteAccess, SessionMode, decide};

use super::auth::SessionContext;
use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::models::Flash;
use crate::routes::verification;

/// Sign-in prompt shown when a signed-out visitor tries to check out.
pub const CHECKOUT_SIGN_IN_PROMPT: &str = "Please sign in to place an order";

/// Gate for routes that need a verified session.
pub async fn protected(
    ctx: SessionContext,
    request: Request,
    next: Next,
) -> Response {
    guard(RouteAccess::Protected, ctx, request, next).await
}

/// Gate for routes only signed-out visitors may use.
pub async fn public_only(
    ctx: SessionContext,
    request: Request,
    next: Next,
) -> Response {
    guard(RouteAccess::PublicOnly, ctx, request, next).await
}

/// Gate for the verification-pending surface.
pub async fn verification(
    ctx: SessionContext,
    request: Request,
    next: Next,
) -> Response {
    guard(RouteAccess::Verification, ctx, request, next).await
}

async fn guard(
    access: RouteAccess,
    ctx: SessionContext,
    request: Request,
    next: Next,
) -> Response {
    let mode = ctx.mode();
    let decision = decide(mode, access);
    tracing::debug!(mode = mode.as_str(), ?access, ?decision, "session gate");

    let result = match decision {
        GateDecision::Render => Ok(render(ctx, request, next).await),
        GateDecision::RedirectToSignIn => {
            let target = SignInTarget::for_request(&request);
            redirect_to_sign_in(&ctx, target).await
        }
        GateDecision::RedirectToHome => Ok(Redirect::to("/").into_response()),
        GateDecision::ShowVerificationPending => verification::pending_page(&ctx).await,
    };
    result.unwrap_or_else(IntoResponse::into_response)
}

async fn render(ctx: SessionContext, request: Request, next: Next) -> Response {
    let before = ctx.current();
    if let Some(user) = before.user() {
        set_sentry_user(user);
    }

    let mut subscription = ctx.subscribe();
    let response = next.run(request).await;

    if let Some(after) = subscription.changed() {
        on_session_changed(&before, &after);
    }
    subscription.unsubscribe();

    response
}

fn on_session_changed(before: &AuthSession, after: &AuthSession) {
    let (from, to) = (before.mode(), after.mode());
    if from == to {
        return;
    }

    match after.user() {
        Some(user) => {
            tracing::info!(
                uid = %user.uid,
                from = from.as_str(),
                to = to.as_str(),
                "session changed"
            );
            set_sentry_user(user);
        }
        None => {
            tracing::info!(from = from.as_str(), to = to.as_str(), "session ended");
            clear_sentry_user();
        }
    }

    if to == SessionMode::Verified && from == SessionMode::PendingVerification {
        tracing::info!("email verification completed");
    }
}

/// Where a signed-out visitor is sent.
///
/// Built from the request before any await: `&Request` is not `Send`.
#[derive(Debug, PartialEq, Eq)]
struct SignInTarget {
    location: String,
    checkout: bool,
}

impl SignInTarget {
    fn for_request(request: &Request) -> Self {
        Self::new(request.method(), request.uri())
    }

    fn new(method: &Method, uri: &Uri) -> Self {
        let path = uri.path();
        let location = if method == Method::GET && path != "/" {
            let target = uri.path_and_query().map_or(path, |pq| pq.as_str());
            format!("/login?next={}", urlencoding::encode(target))
        } else {
            "/login".to_string()
        };

        Self {
            location,
            checkout: path.starts_with("/buy"),
        }
    }
}

async fn redirect_to_sign_in(ctx: &SessionContext, target: SignInTarget) -> Result<Response, AppError> {
    if target.checkout {
        Flash::info(CHECKOUT_SIGN_IN_PROMPT)
            .push(ctx.session())
            .await?;
    }
    Ok(Redirect::to(&target.location).into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn target(method: Method, uri: &str) -> SignInTarget {
        SignInTarget::new(&method, &uri.parse::<Uri>().unwrap())
    }

    fn assert_send<F: Future + Send>(_: &F) {}

    #[test]
    fn test_sign_in_target_keeps_requested_page() {
        assert_eq!(
            target(Method::GET, "/products?category=bars"),
            SignInTarget {
                location: "/login?next=%2Fproducts%3Fcategory%3Dbars".to_string(),
                checkout: false,
            }
        );
        assert_eq!(target(Method::GET, "/").location, "/login");
        assert_eq!(target(Method::POST, "/contact").location, "/login");
    }

    #[test]
    fn test_sign_in_target_flags_checkout() {
        let buy = target(Method::GET, "/buy/1");
        assert!(buy.checkout);
        assert_eq!(buy.location, "/login?next=%2Fbuy%2F1");
        assert!(target(Method::POST, "/buy/1/place").checkout);
    }

    #[tokio::test]
    async fn test_gate_futures_are_send() {
        let session = tower_sessions::Session::new(
            None,
            std::sync::Arc::new(tower_sessions::MemoryStore::default()),
            None,
        );
        let ctx = SessionContext::load(session).await.unwrap();
        let request = Request::new(axum::body::Body::empty());
        let target = SignInTarget::for_request(&request);
        assert_send(&redirect_to_sign_in(&ctx, target));
    }
}
