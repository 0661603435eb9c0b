//! Firebase Authentication over the Identity Toolkit REST API.
//!
//! # Endpoints
//!
//! ```text
//! POST {toolkit}/accounts:signUp              - create account
//! POST {toolkit}/accounts:signInWithPassword  - email/password sign-in
//! POST {toolkit}/accounts:lookup              - current user (emailVerified)
//! POST {toolkit}/accounts:sendOobCode         - VERIFY_EMAIL / PASSWORD_RESET
//! POST {securetoken}/token                    - exchange refresh token
//! ```
//!
//! With `FIREBASE_AUTH_EMULATOR_HOST` set, both bases point at the emulator.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use thrivo_core::session::SessionUser;
use thrivo_core::{Email, UserId};

use super::{IdentityProvider, ProviderError, ProviderSession, ProviderTokens};
use crate::config::FirebaseConfig;

const TOOLKIT_HOST: &str = "identitytoolkit.googleapis.com";
const SECURE_TOKEN_HOST: &str = "securetoken.googleapis.com";

// ─────────────────────────────────────────────────────────────────────────────
// Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthResponse {
    id_token: String,
    refresh_token: String,
    local_id: String,
    email: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdTokenRequest<'a> {
    id_token: &'a str,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    email: String,
    #[serde(default)]
    email_verified: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OobRequest<'a> {
    request_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id_token: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<&'a str>,
}

/// The secure token endpoint answers in `snake_case`.
#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

/// Firebase Authentication client.
#[derive(Clone)]
pub struct FirebaseIdentityProvider {
    inner: Arc<FirebaseInner>,
}

struct FirebaseInner {
    client: reqwest::Client,
    api_key: SecretString,
    toolkit_base: String,
    token_url: String,
}

impl FirebaseIdentityProvider {
    /// Create a client for the configured project or emulator.
    #[must_use]
    pub fn new(config: &FirebaseConfig) -> Self {
        let (toolkit_base, token_url) = config.emulator_host.as_deref().map_or_else(
            || {
                (
                    format!("https://{TOOLKIT_HOST}/v1/"),
                    format!("https://{SECURE_TOKEN_HOST}/v1/token"),
                )
            },
            |host| {
                (
                    format!("http://{host}/{TOOLKIT_HOST}/v1/"),
                    format!("http://{host}/{SECURE_TOKEN_HOST}/v1/token"),
                )
            },
        );

        Self {
            inner: Arc::new(FirebaseInner {
                client: reqwest::Client::new(),
                api_key: config.api_key.clone(),
                toolkit_base,
                token_url,
            }),
        }
    }

    fn key_param(&self) -> String {
        format!(
            "?key={}",
            urlencoding::encode(self.inner.api_key.expose_secret())
        )
    }

    /// POST a JSON body to an Identity Toolkit method such as `accounts:signUp`.
    async fn call<B, T>(&self, method: &str, body: &B) -> Result<T, ProviderError>
    where
        B: Serialize + Sync,
        T: DeserializeOwned + Send,
    {
        // Method names contain ':', so they are appended rather than joined.
        let url = format!("{}{method}{}", self.inner.toolkit_base, self.key_param());
        let response = self
            .inner
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(network_error)?;

        read_response(response).await
    }

    async fn lookup(&self, id_token: &str) -> Result<LookupUser, ProviderError> {
        let response: LookupResponse = self
            .call("accounts:lookup", &IdTokenRequest { id_token })
            .await?;
        response
            .users
            .into_iter()
            .next()
            .ok_or(ProviderError::SessionExpired)
    }

    async fn refresh(&self, refresh_token: &str) -> Result<ProviderTokens, ProviderError> {
        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
        ];
        let url = format!("{}{}", self.inner.token_url, self.key_param());
        let response = self
            .inner
            .client
            .post(&url)
            .form(&params)
            .send()
            .await
            .map_err(network_error)?;

        let refreshed: RefreshResponse = read_response(response).await?;
        Ok(ProviderTokens {
            id_token: SecretString::from(refreshed.id_token),
            refresh_token: SecretString::from(refreshed.refresh_token),
        })
    }

    /// Run `op` with the session's ID token. If the token has expired,
    /// exchange the refresh token once and retry with the new one.
    ///
    /// Returns the tokens the call succeeded with.
    async fn with_fresh_token<T, F, Fut>(
        &self,
        tokens: &ProviderTokens,
        op: F,
    ) -> Result<(T, ProviderTokens), ProviderError>
    where
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        match op(tokens.id_token.expose_secret().to_string()).await {
            Err(ProviderError::SessionExpired) => {
                tracing::debug!("ID token expired, refreshing once");
                let refreshed = self.refresh(tokens.refresh_token.expose_secret()).await?;
                let value = op(refreshed.id_token.expose_secret().to_string()).await?;
                Ok((value, refreshed))
            }
            result => result.map(|value| (value, tokens.clone())),
        }
    }

    async fn send_verify_email(&self, id_token: &str) -> Result<(), ProviderError> {
        let request = OobRequest {
            request_type: "VERIFY_EMAIL",
            id_token: Some(id_token),
            email: None,
        };
        let _: serde_json::Value = self.call("accounts:sendOobCode", &request).await?;
        Ok(())
    }

    /// Sign-in responses lack `emailVerified`, so follow up with a lookup.
    async fn session_from_auth(&self, auth: AuthResponse) -> Result<ProviderSession, ProviderError> {
        let email_verified = self.lookup(&auth.id_token).await?.email_verified;
        Ok(ProviderSession {
            user: SessionUser {
                uid: UserId::new(auth.local_id),
                email: parse_provider_email(&auth.email)?,
                email_verified,
            },
            tokens: ProviderTokens {
                id_token: SecretString::from(auth.id_token),
                refresh_token: SecretString::from(auth.refresh_token),
            },
        })
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentityProvider {
    fn name(&self) -> &'static str {
        "firebase"
    }

    async fn sign_in(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<ProviderSession, ProviderError> {
        let request = PasswordRequest {
            email: email.as_str(),
            password,
            return_secure_token: true,
        };
        let auth: AuthResponse = self
            .call("accounts:signInWithPassword", &request)
            .await
            .map_err(|e| match e {
                ProviderError::UserNotFound => ProviderError::InvalidCredentials,
                other => other,
            })?;
        self.session_from_auth(auth).await
    }

    async fn sign_up(
        &self,
        email: &Email,
        password: &str,
    ) -> Result<ProviderSession, ProviderError> {
        let request = PasswordRequest {
            email: email.as_str(),
            password,
            return_secure_token: true,
        };
        let auth: AuthResponse = self.call("accounts:signUp", &request).await?;
        Ok(ProviderSession {
            user: SessionUser {
                uid: UserId::new(auth.local_id),
                email: parse_provider_email(&auth.email)?,
                email_verified: false,
            },
            tokens: ProviderTokens {
                id_token: SecretString::from(auth.id_token),
                refresh_token: SecretString::from(auth.refresh_token),
            },
        })
    }

    async fn sign_out(&self, _tokens: &ProviderTokens) {
        // Firebase ID tokens are stateless; dropping them from the session is
        // all a client can do.
    }

    async fn send_verification_email(
        &self,
        tokens: &ProviderTokens,
    ) -> Result<ProviderTokens, ProviderError> {
        let ((), tokens) = self
            .with_fresh_token(tokens, move |id_token| async move {
                self.send_verify_email(&id_token).await
            })
            .await?;
        Ok(tokens)
    }

    async fn reload_session(
        &self,
        tokens: &ProviderTokens,
    ) -> Result<ProviderSession, ProviderError> {
        let (user, tokens) = self
            .with_fresh_token(tokens, move |id_token| async move { self.lookup(&id_token).await })
            .await?;

        Ok(ProviderSession {
            user: SessionUser {
                uid: UserId::new(user.local_id),
                email: parse_provider_email(&user.email)?,
                email_verified: user.email_verified,
            },
            tokens,
        })
    }

    async fn reset_password(&self, email: &Email) -> Result<(), ProviderError> {
        let request = OobRequest {
            request_type: "PASSWORD_RESET",
            id_token: None,
            email: Some(email.as_str()),
        };
        let _: serde_json::Value = self.call("accounts:sendOobCode", &request).await?;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Response Handling
// ─────────────────────────────────────────────────────────────────────────────

async fn read_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return response.json().await.map_err(network_error);
    }

    let text = response.text().await.unwrap_or_default();
    let error = serde_json::from_str::<ErrorEnvelope>(&text).map_or_else(
        |_| ProviderError::Network(format!("HTTP {status}: {text}")),
        |envelope| map_error_code(&envelope.error.message),
    );
    tracing::warn!(status = %status, error = ?error, "Firebase request rejected");
    Err(error)
}

fn network_error(e: reqwest::Error) -> ProviderError {
    ProviderError::Network(e.to_string())
}

fn parse_provider_email(raw: &str) -> Result<Email, ProviderError> {
    Email::parse(raw).map_err(|_| ProviderError::InvalidEmail)
}

/// Map a Firebase error message such as `WEAK_PASSWORD : Password should be
/// at least 6 characters` onto a [`ProviderError`].
fn map_error_code(message: &str) -> ProviderError {
    let (code, detail) = message
        .split_once(" : ")
        .map_or((message.trim(), None), |(code, detail)| {
            (code.trim(), Some(detail.trim()))
        });

    match code {
        "EMAIL_EXISTS" => ProviderError::EmailInUse,
        "WEAK_PASSWORD" => ProviderError::WeakPassword(
            detail
                .unwrap_or("Password should be at least 6 characters")
                .to_string(),
        ),
        "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" | "USER_DISABLED" => {
            ProviderError::InvalidCredentials
        }
        "EMAIL_NOT_FOUND" => ProviderError::UserNotFound,
        "TOO_MANY_ATTEMPTS_TRY_LATER" => ProviderError::RateLimited,
        "INVALID_EMAIL" | "MISSING_EMAIL" => ProviderError::InvalidEmail,
        "INVALID_ID_TOKEN" | "TOKEN_EXPIRED" | "USER_NOT_FOUND" | "INVALID_REFRESH_TOKEN" => {
            ProviderError::SessionExpired
        }
        other => ProviderError::Rejected(detail.map_or_else(|| humanize(other), str::to_string)),
    }
}

/// `OPERATION_NOT_ALLOWED` -> `Operation not allowed`.
fn humanize(code: &str) -> String {
    let lower = code.replace('_', " ").to_lowercase();
    let mut chars = lower.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use axum::{Form, Json, Router, http::StatusCode, response::IntoResponse, routing::post};
    use serde_json::{Value, json};

    use super::*;

    const FRESH_ID_TOKEN: &str = "fresh-id-token";
    const REFRESH_TOKEN: &str = "refresh-1";

    fn rejected(code: &str) -> axum::response::Response {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": { "code": 400, "message": code } })),
        )
            .into_response()
    }

    /// Accepts only [`FRESH_ID_TOKEN`], like the real service once a token
    /// has expired.
    async fn lookup(Json(body): Json<Value>) -> axum::response::Response {
        if body["idToken"] != FRESH_ID_TOKEN {
            return rejected("INVALID_ID_TOKEN");
        }
        Json(json!({
            "users": [{
                "localId": "uid-1",
                "email": "sana@example.com",
                "emailVerified": true
            }]
        }))
        .into_response()
    }

    async fn send_oob_code(Json(body): Json<Value>) -> axum::response::Response {
        if body["idToken"] != FRESH_ID_TOKEN {
            return rejected("INVALID_ID_TOKEN");
        }
        Json(json!({ "email": "sana@example.com" })).into_response()
    }

    async fn token(Form(form): Form<HashMap<String, String>>) -> axum::response::Response {
        if form.get("refresh_token").map(String::as_str) != Some(REFRESH_TOKEN) {
            return rejected("INVALID_REFRESH_TOKEN");
        }
        Json(json!({
            "id_token": FRESH_ID_TOKEN,
            "refresh_token": "refresh-2"
        }))
        .into_response()
    }

    /// Serve a minimal auth emulator on an ephemeral port.
    async fn start_emulator() -> FirebaseIdentityProvider {
        let app = Router::new()
            .route("/identitytoolkit.googleapis.com/v1/accounts:lookup", post(lookup))
            .route(
                "/identitytoolkit.googleapis.com/v1/accounts:sendOobCode",
                post(send_oob_code),
            )
            .route("/securetoken.googleapis.com/v1/token", post(token));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        FirebaseIdentityProvider::new(&FirebaseConfig {
            api_key: SecretString::from("fake-api-key"),
            emulator_host: Some(addr.to_string()),
        })
    }

    fn tokens(id_token: &str, refresh_token: &str) -> ProviderTokens {
        ProviderTokens {
            id_token: SecretString::from(id_token.to_string()),
            refresh_token: SecretString::from(refresh_token.to_string()),
        }
    }

    #[tokio::test]
    async fn test_send_verification_refreshes_expired_token() {
        let provider = start_emulator().await;

        let used = provider
            .send_verification_email(&tokens("expired-id-token", REFRESH_TOKEN))
            .await
            .unwrap();
        assert_eq!(used.id_token.expose_secret(), FRESH_ID_TOKEN);
        assert_eq!(used.refresh_token.expose_secret(), "refresh-2");
    }

    #[tokio::test]
    async fn test_reload_refreshes_expired_token() {
        let provider = start_emulator().await;

        let session = provider
            .reload_session(&tokens("expired-id-token", REFRESH_TOKEN))
            .await
            .unwrap();
        assert!(session.user.email_verified);
        assert_eq!(session.tokens.id_token.expose_secret(), FRESH_ID_TOKEN);
    }

    #[tokio::test]
    async fn test_valid_token_is_used_as_is() {
        let provider = start_emulator().await;

        let used = provider
            .send_verification_email(&tokens(FRESH_ID_TOKEN, REFRESH_TOKEN))
            .await
            .unwrap();
        assert_eq!(used.refresh_token.expose_secret(), REFRESH_TOKEN);
    }

    #[tokio::test]
    async fn test_revoked_refresh_token_expires_session() {
        let provider = start_emulator().await;

        let result = provider
            .send_verification_email(&tokens("expired-id-token", "revoked"))
            .await;
        assert_eq!(result.map(|_| ()), Err(ProviderError::SessionExpired));
    }

    #[test]
    fn test_map_error_codes() {
        assert_eq!(map_error_code("EMAIL_EXISTS"), ProviderError::EmailInUse);
        assert_eq!(
            map_error_code("INVALID_LOGIN_CREDENTIALS"),
            ProviderError::InvalidCredentials
        );
        assert_eq!(
            map_error_code("TOO_MANY_ATTEMPTS_TRY_LATER : Too many unsuccessful login attempts."),
            ProviderError::RateLimited
        );
        assert_eq!(map_error_code("EMAIL_NOT_FOUND"), ProviderError::UserNotFound);
        assert_eq!(map_error_code("TOKEN_EXPIRED"), ProviderError::SessionExpired);
    }

    #[test]
    fn test_weak_password_keeps_provider_detail() {
        assert_eq!(
            map_error_code("WEAK_PASSWORD : Password should be at least 6 characters"),
            ProviderError::WeakPassword("Password should be at least 6 characters".to_string())
        );
    }

    #[test]
    fn test_unknown_codes_are_humanized() {
        assert_eq!(
            map_error_code("OPERATION_NOT_ALLOWED"),
            ProviderError::Rejected("Operation not allowed".to_string())
        );
        assert_eq!(
            map_error_code("QUOTA_EXCEEDED : Exceeded quota for email lookup."),
            ProviderError::Rejected("Exceeded quota for email lookup.".to_string())
        );
    }

    #[test]
    fn test_emulator_urls() {
        let provider = FirebaseIdentityProvider::new(&FirebaseConfig {
            api_key: SecretString::from("fake-api-key"),
            emulator_host: Some("localhost:9099".to_string()),
        });
        assert_eq!(
            provider.inner.toolkit_base,
            "http://localhost:9099/identitytoolkit.googleapis.com/v1/"
        );
        assert_eq!(
            provider.inner.token_url,
            "http://localhost:9099/securetoken.googleapis.com/v1/token"
        );
    }

    #[test]
    fn test_oob_request_shape() {
        let request = OobRequest {
            request_type: "PASSWORD_RESET",
            id_token: None,
            email: Some("a@example.com"),
        };
        let json = serde_json::to_value(&request).unwrap_or_default();
        assert_eq!(json["requestType"], "PASSWORD_RESET");
        assert_eq!(json["email"], "a@example.com");
        assert!(json.get("idToken").is_none());
    }
}
