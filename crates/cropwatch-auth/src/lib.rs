//! Session handling for the CropWatch client.
//!
//! Holds the bearer token, persists it between runs, and provides the
//! HTTP client that attaches it to telemetry requests.

pub mod client;
pub mod error;
pub mod http;
pub mod session;
pub mod storage;

pub use client::AuthClient;
pub use error::{AuthError, HttpError, TokenStorageError};
pub use http::AuthorizedHttpClient;
pub use session::{SessionToken, SessionTokenStore, TokenBackend};
pub use storage::FileTokenBackend;
