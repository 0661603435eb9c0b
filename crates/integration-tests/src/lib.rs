//! Integration tests for the Thrivo storefront.
//!
//! Each test boots the full storefront router on an ephemeral local port,
//! backed by the in-memory identity provider, and drives it over HTTP with a
//! cookie-keeping client that does not follow redirects.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p thrivo-integration-tests
//! ```

#![allow(clippy::missing_panics_doc)]
#![allow(clippy::expect_used)]

use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::{Client, Response, header::LOCATION};
use tokio::task::JoinHandle;

use thrivo_core::Email;
use thrivo_storefront::config::StorefrontConfig;
use thrivo_storefront::identity::InMemoryIdentityProvider;
use thrivo_storefront::state::AppState;

/// Password used for every test account.
pub const PASSWORD: &str = "hunter22";

/// A running storefront plus a client with its own cookie jar.
pub struct TestServer {
    pub base_url: String,
    pub client: Client,
    pub provider: Arc<InMemoryIdentityProvider>,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a storefront with an empty in-memory identity provider.
    pub async fn start() -> Self {
        let config = StorefrontConfig::from_lookup(|key| match key {
            "IDENTITY_PROVIDER" => Some("memory".to_string()),
            "STOREFRONT_STATIC_DIR" => {
                Some(concat!(env!("CARGO_MANIFEST_DIR"), "/../storefront/static").to_string())
            }
            _ => None,
        })
        .expect("test configuration is valid");

        let provider = Arc::new(InMemoryIdentityProvider::new());
        let state = AppState::with_identity(config, provider.clone());
        let app = thrivo_storefront::app(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind test listener");
        let addr = listener.local_addr().expect("listener has an address");
        let handle = tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .expect("test server crashed");
        });

        Self {
            base_url: format!("http://{addr}"),
            client: new_client(),
            provider,
            handle,
        }
    }

    /// A second visitor on the same server, with an empty cookie jar.
    #[must_use]
    pub fn fresh_client(&self) -> Client {
        new_client()
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    pub async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }

    pub async fn get_text(&self, path: &str) -> String {
        self.get(path)
            .await
            .text()
            .await
            .expect("Failed to read body")
    }

    pub async fn post(&self, path: &str, form: &[(&str, &str)]) -> Response {
        self.client
            .post(self.url(path))
            .form(form)
            .send()
            .await
            .expect("POST request failed")
    }

    /// Create an account through the sign-up form. The visitor ends up
    /// signed in with an unverified email.
    pub async fn sign_up(&self, email: &str) -> Response {
        self.post(
            "/signup",
            &[
                ("email", email),
                ("password", PASSWORD),
                ("password_confirm", PASSWORD),
            ],
        )
        .await
    }

    /// Sign up, verify the email and confirm it on the site. The visitor
    /// ends up signed in and verified.
    pub async fn sign_up_verified(&self, email: &str) {
        let response = self.sign_up(email).await;
        assert_eq!(location(&response).as_deref(), Some("/verify"));

        let address = Email::parse(email).expect("valid test email");
        assert!(self.provider.mark_verified(&address).await);

        let response = self.post("/verify/check", &[]).await;
        assert_eq!(location(&response).as_deref(), Some("/"));
        // Consume the success banner.
        let _ = self.get_text("/").await;
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn new_client() -> Client {
    Client::builder()
        .cookie_store(true)
        .redirect(reqwest::redirect::Policy::none())
        .build()
        .expect("Failed to create HTTP client")
}

/// The `Location` header of a redirect, if any.
#[must_use]
pub fn location(response: &Response) -> Option<String> {
    response
        .headers()
        .get(LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}
