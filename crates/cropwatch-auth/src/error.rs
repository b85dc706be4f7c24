//! Error types for the session and HTTP layer.

use cropwatch_core::NetworkError;
use thiserror::Error;

/// Classified outcome of a failed request to the telemetry server.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum HttpError {
    /// 401 from the server. The session is no longer valid.
    #[error("Unauthorized")]
    Unauthorized,

    /// Connection refused, DNS failure, timeout.
    #[error("Network failure: {0}")]
    NetworkFailure(NetworkError),

    /// Any other non-2xx status.
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// 2xx with a body that does not decode into the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl HttpError {
    /// Status code for `ServerError`, `None` otherwise.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ServerError { status, .. } => Some(*status),
            Self::Unauthorized => Some(401),
            _ => None,
        }
    }

    /// Transient failures clear up on their own; the next poll tick retries.
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Unauthorized)
    }

    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthorized => "Your session has expired. Please sign in again.".to_string(),
            Self::NetworkFailure(e) => e.user_message().to_string(),
            Self::ServerError { status, .. } if *status >= 500 => {
                "The sensor server is experiencing issues.".to_string()
            }
            Self::ServerError { message, .. } if !message.is_empty() => message.clone(),
            Self::ServerError { status, .. } => format!("Request failed ({})", status),
            Self::InvalidResponse(_) => "Received unexpected data from the server.".to_string(),
        }
    }
}

/// Failure reading or writing the persisted session.
#[derive(Debug, Error)]
pub enum TokenStorageError {
    #[error("Token storage IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Token storage format error: {0}")]
    Format(#[from] serde_json::Error),
}

/// Errors from the login/register flow.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    #[error("Rejected by server: {0}")]
    Rejected(String),

    #[error(transparent)]
    Http(#[from] HttpError),
}

impl AuthError {
    pub fn user_message(&self) -> String {
        match self {
            Self::InvalidCredentials(msg) | Self::Rejected(msg) if !msg.is_empty() => msg.clone(),
            Self::InvalidCredentials(_) => "Login failed".to_string(),
            Self::Rejected(_) => "Request was rejected".to_string(),
            Self::Http(e) => e.user_message(),
        }
    }
}
