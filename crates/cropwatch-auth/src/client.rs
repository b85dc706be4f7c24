//! Login, registration and logout against the telemetry server.

use std::sync::Arc;

use reqwest::Method;
use serde::Deserialize;
use tracing::instrument;

use crate::error::{AuthError, HttpError};
use crate::http::AuthorizedHttpClient;
use crate::session::{SessionToken, SessionTokenStore};

fn credentials(email: &str, password: &str) -> serde_json::Value {
    serde_json::json!({ "email": email, "password": password })
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: String,
}

/// Drives the authentication endpoints and owns the session lifecycle.
///
/// Credential validation is the server's job; inputs are passed through as-is.
#[derive(Debug, Clone)]
pub struct AuthClient {
    http: AuthorizedHttpClient,
}

impl AuthClient {
    pub fn new(http: AuthorizedHttpClient) -> Self {
        Self { http }
    }

    pub fn session(&self) -> &Arc<SessionTokenStore> {
        self.http.session()
    }

    /// Sign in and store the returned token.
    #[instrument(skip(self, password), level = "info")]
    pub async fn login(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let body = credentials(email, password);

        let response: LoginResponse = match self.http.post_json("/auth/login", &body).await {
            Ok(r) => r,
            // A 401 here means bad credentials, not an expired session
            Err(HttpError::Unauthorized) => {
                return Err(AuthError::InvalidCredentials("Invalid credentials".to_string()))
            }
            Err(HttpError::ServerError { status, message }) if (400..500).contains(&status) => {
                return Err(AuthError::Rejected(message))
            }
            Err(e) => return Err(e.into()),
        };

        self.session().set(SessionToken::new(response.token));
        tracing::info!("Signed in");
        Ok(())
    }

    /// Create an account. Does not sign in.
    #[instrument(skip(self, password), level = "info")]
    pub async fn register(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let body = credentials(email, password);

        match self
            .http
            .request(Method::POST, "/auth/register", Some(&body))
            .await
        {
            Ok(_) => {
                tracing::info!("Registered account");
                Ok(())
            }
            Err(HttpError::ServerError { status, message }) if (400..500).contains(&status) => {
                Err(AuthError::Rejected(message))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Drop the local session.
    pub fn logout(&self) {
        if self.session().clear() {
            tracing::info!("Signed out");
        }
    }
}
