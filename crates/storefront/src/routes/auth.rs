//! Authentication route handlers.
//!
//! Sign-in, sign-up, password reset and sign-out against the configured
//! identity provider. The gate keeps signed-in visitors away from the first
//! three; sign-out is reachable in every mode.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use serde::Deserialize;
use tracing::instrument;

use thrivo_core::Email;
use thrivo_core::cooldown::ResendCooldown;

use crate::error::Result;
use crate::filters;
use crate::identity::ProviderError;
use crate::middleware::SessionContext;
use crate::models::{Flash, session_keys};
use crate::state::AppState;
use crate::views::{Nav, PageChrome};

/// Shown after a verification email goes out.
pub const VERIFICATION_SENT: &str = "Verification email sent! Check your inbox.";

/// Shown after a password reset email goes out.
pub const RESET_SENT: &str = "Check your email for password reset instructions";

// =============================================================================
// Form Types
// =============================================================================

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub next: Option<String>,
}

/// Sign-up form data.
#[derive(Debug, Deserialize)]
pub struct SignupForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub password_confirm: String,
}

/// Forgot password form data.
#[derive(Debug, Deserialize)]
pub struct ForgotPasswordForm {
    #[serde(default)]
    pub email: String,
}

/// Where to go after signing in.
#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub nav: Nav,
    pub flash: Option<Flash>,
    pub email: String,
    pub next: String,
    pub error: Option<String>,
}

/// Sign-up page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/signup.html")]
pub struct SignupTemplate {
    pub nav: Nav,
    pub flash: Option<Flash>,
    pub email: String,
    pub error: Option<String>,
}

/// Forgot password page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/forgot_password.html")]
pub struct ForgotPasswordTemplate {
    pub nav: Nav,
    pub flash: Option<Flash>,
    pub email: String,
    pub error: Option<String>,
    pub success: Option<String>,
}

/// Only same-site absolute paths are followed after sign-in.
fn safe_next(next: Option<&str>) -> &str {
    match next {
        Some(path)
            if path.starts_with('/')
                && !path.starts_with("//")
                && !path.contains('\\')
                && !path.starts_with("/login") =>
        {
            path
        }
        _ => "/",
    }
}

// =============================================================================
// Login Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    ctx: SessionContext,
    Query(query): Query<NextQuery>,
) -> Result<LoginTemplate> {
    let PageChrome { nav, flash } = PageChrome::take(&ctx, "login").await?;
    Ok(LoginTemplate {
        nav,
        flash,
        email: String::new(),
        next: safe_next(query.next.as_deref()).to_string(),
        error: None,
    })
}

/// Handle login form submission.
#[instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    ctx: SessionContext,
    Form(form): Form<LoginForm>,
) -> Result<Response> {
    let next = safe_next(form.next.as_deref()).to_string();

    if form.email.trim().is_empty() || form.password.is_empty() {
        return login_error(&ctx, &form, &next, "Please enter your email and password").await;
    }
    let Ok(email) = Email::parse(&form.email) else {
        return login_error(&ctx, &form, &next, &ProviderError::InvalidEmail.to_string()).await;
    };

    match state.identity().sign_in(&email, &form.password).await {
        Ok(session) => {
            tracing::info!(uid = %session.user.uid, "signed in");
            ctx.establish(session).await?;
            Ok(Redirect::to(&next).into_response())
        }
        Err(e) => {
            tracing::warn!(error = ?e, "sign-in failed");
            login_error(&ctx, &form, &next, &e.to_string()).await
        }
    }
}

async fn login_error(
    ctx: &SessionContext,
    form: &LoginForm,
    next: &str,
    error: &str,
) -> Result<Response> {
    let PageChrome { nav, flash } = PageChrome::take(ctx, "login").await?;
    Ok(LoginTemplate {
        nav,
        flash,
        email: form.email.trim().to_string(),
        next: next.to_string(),
        error: Some(error.to_string()),
    }
    .into_response())
}

// =============================================================================
// Sign-up Routes
// =============================================================================

/// Display the sign-up page.
pub async fn signup_page(ctx: SessionContext) -> Result<SignupTemplate> {
    let PageChrome { nav, flash } = PageChrome::take(&ctx, "signup").await?;
    Ok(SignupTemplate {
        nav,
        flash,
        email: String::new(),
        error: None,
    })
}

/// Handle sign-up form submission.
///
/// The new account is signed in straight away (unverified) and sent a
/// verification email, which starts the resend cooldown.
#[instrument(skip_all)]
pub async fn signup(
    State(state): State<AppState>,
    ctx: SessionContext,
    Form(form): Form<SignupForm>,
) -> Result<Response> {
    if form.password != form.password_confirm {
        return signup_error(&ctx, &form, "Passwords do not match").await;
    }
    let Ok(email) = Email::parse(&form.email) else {
        return signup_error(&ctx, &form, &ProviderError::InvalidEmail.to_string()).await;
    };

    let session = match state.identity().sign_up(&email, &form.password).await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(error = ?e, "sign-up failed");
            return signup_error(&ctx, &form, &e.to_string()).await;
        }
    };

    tracing::info!(uid = %session.user.uid, "account created");
    let tokens = session.tokens.clone();
    ctx.establish(session).await?;

    match state.identity().send_verification_email(&tokens).await {
        Ok(fresh) => {
            ctx.update_tokens(fresh).await?;
            let mut cooldown = ResendCooldown::default();
            cooldown.record_send(Utc::now());
            ctx.session()
                .insert(session_keys::RESEND_COOLDOWN, cooldown)
                .await?;
            Flash::info(VERIFICATION_SENT).push(ctx.session()).await?;
        }
        Err(e) => {
            tracing::warn!(error = ?e, "initial verification email failed");
            Flash::error(e.to_string()).push(ctx.session()).await?;
        }
    }

    Ok(Redirect::to("/verify").into_response())
}

async fn signup_error(ctx: &SessionContext, form: &SignupForm, error: &str) -> Result<Response> {
    let PageChrome { nav, flash } = PageChrome::take(ctx, "signup").await?;
    Ok(SignupTemplate {
        nav,
        flash,
        email: form.email.trim().to_string(),
        error: Some(error.to_string()),
    }
    .into_response())
}

// =============================================================================
// Password Reset Routes
// =============================================================================

/// Display the forgot password page.
pub async fn forgot_password_page(ctx: SessionContext) -> Result<ForgotPasswordTemplate> {
    let PageChrome { nav, flash } = PageChrome::take(&ctx, "login").await?;
    Ok(ForgotPasswordTemplate {
        nav,
        flash,
        email: String::new(),
        error: None,
        success: None,
    })
}

/// Handle forgot password form submission.
#[instrument(skip_all)]
pub async fn forgot_password(
    State(state): State<AppState>,
    ctx: SessionContext,
    Form(form): Form<ForgotPasswordForm>,
) -> Result<ForgotPasswordTemplate> {
    let PageChrome { nav, flash } = PageChrome::take(&ctx, "login").await?;
    let mut page = ForgotPasswordTemplate {
        nav,
        flash,
        email: form.email.trim().to_string(),
        error: None,
        success: None,
    };

    let result = match Email::parse(&form.email) {
        Ok(email) => state.identity().reset_password(&email).await,
        Err(_) => Err(ProviderError::InvalidEmail),
    };
    match result {
        Ok(()) => page.success = Some(RESET_SENT.to_string()),
        Err(e) => {
            tracing::warn!(error = ?e, "password reset failed");
            page.error = Some(e.to_string());
        }
    }

    Ok(page)
}

// =============================================================================
// Logout
// =============================================================================

/// Sign out and return to the sign-in page.
#[instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, ctx: SessionContext) -> Result<Redirect> {
    if let Some(tokens) = ctx.tokens().await? {
        state.identity().sign_out(&tokens).await;
    }
    ctx.end().await?;
    crate::error::clear_sentry_user();
    Ok(Redirect::to("/login"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_next() {
        assert_eq!(safe_next(Some("/buy/1")), "/buy/1");
        assert_eq!(safe_next(Some("/products?category=bars")), "/products?category=bars");
        assert_eq!(safe_next(Some("https://evil.example")), "/");
        assert_eq!(safe_next(Some("//evil.example")), "/");
        assert_eq!(safe_next(Some("/\\evil.example")), "/");
        assert_eq!(safe_next(Some("/login")), "/");
        assert_eq!(safe_next(None), "/");
    }
}
