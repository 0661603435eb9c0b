//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                   - Health check                  (open)
//!
//! # Pages (verified session; GET discards any checkout draft)
//! GET  /                         - Home page
//! GET  /about                    - About page
//! GET  /products?category=&q=    - Product listing
//! GET  /contact                  - Contact form
//! POST /contact                  - Contact form submission
//!
//! # Checkout (verified session)
//! GET  /buy                      - Redirect to /buy/1
//! GET  /buy/{id}                 - Current wizard step or confirmation
//! POST /buy/{id}/quantity        - Increment / decrement
//! POST /buy/{id}/continue        - Step 1 -> 2
//! POST /buy/{id}/customer        - Save customer info, step 2 -> 3
//! POST /buy/{id}/payment         - Choose payment method
//! POST /buy/{id}/place           - Place the order
//! POST /buy/{id}/back            - Previous step
//!
//! # Auth (signed out only; POSTs rate limited)
//! GET  /login                    - Sign-in page
//! POST /login                    - Sign in
//! GET  /signup                   - Sign-up page
//! POST /signup                   - Create account
//! GET  /forgot-password          - Reset request page
//! POST /forgot-password          - Send reset email
//!
//! # Verification (signed in, unverified)
//! GET  /verify                   - Verification pending page
//! POST /verify/send              - Resend verification email
//! POST /verify/check             - Re-check verification status
//!
//! POST /logout                   - Sign out                      (open)
//! ```

pub mod auth;
pub mod checkout;
pub mod contact;
pub mod home;
pub mod pages;
pub mod products;
pub mod verification;

use axum::{
    Router,
    middleware::from_fn,
    routing::{get, post},
};

use crate::middleware::{auth_rate_limiter, gate};
use crate::state::AppState;

/// Protected content pages.
pub fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .route("/about", get(pages::about))
        .route("/products", get(products::index))
        .route("/contact", get(contact::show).post(contact::submit))
        .route_layer(from_fn(checkout::discard_draft_on_navigation))
        .route_layer(from_fn(gate::protected))
}

/// Checkout wizard routes.
pub fn checkout_routes() -> Router<AppState> {
    Router::new()
        .route("/buy", get(checkout::start))
        .route("/buy/{id}", get(checkout::show))
        .route("/buy/{id}/quantity", post(checkout::quantity))
        .route("/buy/{id}/continue", post(checkout::continue_to_customer))
        .route("/buy/{id}/customer", post(checkout::customer))
        .route("/buy/{id}/payment", post(checkout::payment))
        .route("/buy/{id}/place", post(checkout::place))
        .route("/buy/{id}/back", post(checkout::back))
        .route_layer(from_fn(gate::protected))
}

/// Sign-in, sign-up and password reset.
///
/// The three credential POSTs share one rate limiter.
pub fn auth_routes() -> Router<AppState> {
    let limiter = auth_rate_limiter();

    Router::new()
        .route(
            "/login",
            get(auth::login_page).merge(post(auth::login).layer(limiter.clone())),
        )
        .route(
            "/signup",
            get(auth::signup_page).merge(post(auth::signup).layer(limiter.clone())),
        )
        .route(
            "/forgot-password",
            get(auth::forgot_password_page).merge(post(auth::forgot_password).layer(limiter)),
        )
        .route_layer(from_fn(gate::public_only))
}

/// The verification-pending surface.
pub fn verification_routes() -> Router<AppState> {
    Router::new()
        .route("/verify", get(verification::show))
        .route("/verify/send", post(verification::resend))
        .route("/verify/check", post(verification::check))
        .route_layer(from_fn(gate::verification))
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(page_routes())
        .merge(checkout_routes())
        .merge(auth_routes())
        .merge(verification_routes())
        .route("/logout", post(auth::logout))
}
