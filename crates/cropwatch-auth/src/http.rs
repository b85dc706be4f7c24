//! HTTP client for the telemetry server that attaches the session token.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use cropwatch_core::{NetworkError, ReqwestErrorExt};
use reqwest::{header, Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::instrument;
use url::Url;

use crate::error::HttpError;
use crate::session::SessionTokenStore;

/// Error body shape used by the server (`{"message": "..."}`)
#[derive(Debug, Deserialize)]
struct ServerMessage {
    message: String,
}

/// Wraps outbound requests to the telemetry server.
///
/// The bearer token is read from the session store on every request and the
/// header is omitted when no session exists. Nothing is retried here; the
/// poll cadence takes care of that.
#[derive(Debug, Clone)]
pub struct AuthorizedHttpClient {
    base_url: Url,
    client: Arc<Client>,
    session: Arc<SessionTokenStore>,
}

impl AuthorizedHttpClient {
    pub fn new(base_url: &str, timeout: Duration, session: Arc<SessionTokenStore>) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        // A trailing slash keeps any base path when joining relative paths
        let mut base = base_url.trim_end_matches('/').to_string();
        base.push('/');
        let base_url = Url::parse(&base).context("Invalid server base URL")?;

        Ok(Self {
            base_url,
            client: Arc::new(client),
            session,
        })
    }

    pub fn session(&self) -> &Arc<SessionTokenStore> {
        &self.session
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Issue a request and classify the response status.
    #[instrument(skip(self, body), level = "debug")]
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Response, HttpError> {
        let url = self
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| {
                HttpError::NetworkFailure(NetworkError::ConnectionFailed(format!(
                    "Invalid request path {}: {}",
                    path, e
                )))
            })?;

        let mut request = self.client.request(method, url);
        if let Some(token) = self.session.get() {
            request = request.header(header::AUTHORIZATION, token.bearer());
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(|e| {
            tracing::debug!("Request to {} failed: {}", path, e);
            HttpError::NetworkFailure(e.into_network_error())
        })?;

        Self::classify(response).await
    }

    /// GET `path` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, HttpError> {
        let response = self.request(Method::GET, path, None).await?;
        Self::decode(response).await
    }

    /// POST a JSON body to `path` and decode the JSON reply.
    pub async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &serde_json::Value,
    ) -> Result<T, HttpError> {
        let response = self.request(Method::POST, path, Some(body)).await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, HttpError> {
        response
            .json()
            .await
            .map_err(|e| HttpError::InvalidResponse(format!("JSON parse error: {}", e)))
    }

    async fn classify(response: Response) -> Result<Response, HttpError> {
        let status = response.status();

        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            tracing::warn!("Server rejected session token");
            return Err(HttpError::Unauthorized);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ServerMessage>(&text)
            .map(|m| m.message)
            .unwrap_or(text);

        tracing::warn!("Server returned {}: {}", status, message);
        Err(HttpError::ServerError {
            status: status.as_u16(),
            message,
        })
    }
}
