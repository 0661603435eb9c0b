//! Email verification surface.
//!
//! Signed-in visitors with an unverified email see this page in place of
//! every protected or public-only route. From here they can resend the
//! verification email (at most once per cooldown), re-check their status
//! after clicking the link, or sign out.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use tracing::instrument;

use thrivo_core::cooldown::ResendCooldown;

use super::auth::VERIFICATION_SENT;
use crate::error::Result;
use crate::filters;
use crate::middleware::SessionContext;
use crate::models::{Flash, session_keys};
use crate::state::AppState;
use crate::views::{Nav, PageChrome};

/// Shown when the provider confirms verification.
pub const VERIFIED: &str = "Email verified successfully!";

/// Shown when the visitor checks before clicking the link.
pub const NOT_YET_VERIFIED: &str = "Email not yet verified. Please check your email and try again.";

/// Verification-pending page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/verify.html")]
pub struct VerifyTemplate {
    pub nav: Nav,
    pub flash: Option<Flash>,
    pub email: String,
    pub cooldown_remaining: u64,
}

async fn load_cooldown(ctx: &SessionContext) -> Result<ResendCooldown> {
    Ok(ctx
        .session()
        .get::<ResendCooldown>(session_keys::RESEND_COOLDOWN)
        .await?
        .unwrap_or_default())
}

/// Render the verification-pending page for the current visitor.
///
/// Used both as the `/verify` handler and by the gate in place of routes an
/// unverified visitor may not see.
///
/// # Errors
///
/// Returns an error if the session cannot be read.
pub async fn pending_page(ctx: &SessionContext) -> Result<Response> {
    let PageChrome { nav, flash } = PageChrome::take(ctx, "verify").await?;
    let cooldown = load_cooldown(ctx).await?;

    Ok(VerifyTemplate {
        nav,
        flash,
        email: ctx
            .user()
            .map(|u| u.email.as_str().to_string())
            .unwrap_or_default(),
        cooldown_remaining: cooldown.remaining_secs(Utc::now()),
    }
    .into_response())
}

/// GET /verify
pub async fn show(ctx: SessionContext) -> Result<Response> {
    pending_page(&ctx).await
}

/// POST /verify/send
///
/// Refused while the cooldown is running; a failed send does not restart it.
#[instrument(skip_all)]
pub async fn resend(State(state): State<AppState>, ctx: SessionContext) -> Result<Redirect> {
    let now = Utc::now();
    let mut cooldown = load_cooldown(&ctx).await?;

    if !cooldown.is_ready(now) {
        let remaining = cooldown.remaining_secs(now);
        tracing::debug!(remaining, "resend refused during cooldown");
        Flash::error(format!(
            "Please wait {remaining}s before requesting another email"
        ))
        .push(ctx.session())
        .await?;
        return Ok(Redirect::to("/verify"));
    }

    let tokens = ctx.require_tokens().await?;
    match state.identity().send_verification_email(&tokens).await {
        Ok(fresh) => {
            ctx.update_tokens(fresh).await?;
            cooldown.record_send(now);
            ctx.session()
                .insert(session_keys::RESEND_COOLDOWN, cooldown)
                .await?;
            tracing::info!("verification email resent");
            Flash::info(VERIFICATION_SENT).push(ctx.session()).await?;
        }
        Err(e) => {
            tracing::warn!(error = ?e, "verification email resend failed");
            Flash::error(e.to_string()).push(ctx.session()).await?;
        }
    }

    Ok(Redirect::to("/verify"))
}

/// POST /verify/check
///
/// Asks the provider for the user's current state. A verified result
/// promotes the session; anything else leaves it as it was.
#[instrument(skip_all)]
pub async fn check(State(state): State<AppState>, ctx: SessionContext) -> Result<Redirect> {
    let tokens = ctx.require_tokens().await?;

    match state.identity().reload_session(&tokens).await {
        Ok(session) if session.user.email_verified => {
            ctx.refresh(session).await?;
            ctx.session()
                .remove_value(session_keys::RESEND_COOLDOWN)
                .await?;
            Flash::info(VERIFIED).push(ctx.session()).await?;
            Ok(Redirect::to("/"))
        }
        Ok(session) => {
            // Tokens may have been refreshed even though nothing else changed.
            ctx.refresh(session).await?;
            Flash::error(NOT_YET_VERIFIED).push(ctx.session()).await?;
            Ok(Redirect::to("/verify"))
        }
        Err(e) => {
            tracing::warn!(error = ?e, "verification check failed");
            Flash::error(e.to_string()).push(ctx.session()).await?;
            Ok(Redirect::to("/verify"))
        }
    }
}
