//! Session token and the shared store that holds it.
//!
//! The store is passed explicitly (`Arc<SessionTokenStore>`) to every
//! component that reads or clears the session. All reads go through the
//! store at request time, so a `clear()` issued by one poll tick is seen by
//! any later request from another tick.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::TokenStorageError;

/// Opaque bearer credential returned by `/auth/login`.
///
/// The value is never inspected. `Debug` redacts it so it cannot leak into logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionToken(String);

impl SessionToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for the `Authorization` header
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionToken(<redacted>)")
    }
}

/// Persistent medium behind the store.
pub trait TokenBackend: Send + Sync {
    fn load(&self) -> Result<Option<SessionToken>, TokenStorageError>;
    fn save(&self, token: &SessionToken) -> Result<(), TokenStorageError>;
    fn remove(&self) -> Result<(), TokenStorageError>;
}

/// Holds at most one live session token.
///
/// Backend failures are logged and never surface to callers: the in-memory
/// value is authoritative for the running process.
pub struct SessionTokenStore {
    current: RwLock<Option<SessionToken>>,
    backend: Option<Arc<dyn TokenBackend>>,
}

impl SessionTokenStore {
    /// Store with no persistence
    pub fn in_memory() -> Self {
        Self {
            current: RwLock::new(None),
            backend: None,
        }
    }

    /// Store backed by `backend`, seeded with whatever it holds.
    pub fn with_backend(backend: Arc<dyn TokenBackend>) -> Self {
        let initial = match backend.load() {
            Ok(token) => {
                if token.is_some() {
                    tracing::info!("Restored persisted session");
                }
                token
            }
            Err(e) => {
                tracing::warn!("Failed to load persisted session: {}", e);
                None
            }
        };

        Self {
            current: RwLock::new(initial),
            backend: Some(backend),
        }
    }

    /// Replace the current token.
    pub fn set(&self, token: SessionToken) {
        let mut current = self.current.write();
        if let Some(backend) = &self.backend {
            if let Err(e) = backend.save(&token) {
                tracing::warn!("Failed to persist session: {}", e);
            }
        }
        *current = Some(token);
        tracing::debug!("Session token stored");
    }

    pub fn get(&self) -> Option<SessionToken> {
        self.current.read().clone()
    }

    pub fn is_signed_in(&self) -> bool {
        self.current.read().is_some()
    }

    /// Drop the current token. Idempotent.
    ///
    /// Returns `true` only for the call that actually removed a token, so
    /// concurrent clears after an expired session produce one removal.
    pub fn clear(&self) -> bool {
        // Backend IO happens under the write lock so a racing `set` cannot be
        // undone by a late removal.
        let mut current = self.current.write();
        if current.take().is_none() {
            return false;
        }
        if let Some(backend) = &self.backend {
            if let Err(e) = backend.remove() {
                tracing::warn!("Failed to remove persisted session: {}", e);
            }
        }
        tracing::info!("Session cleared");
        true
    }
}

impl Default for SessionTokenStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl fmt::Debug for SessionTokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTokenStore")
            .field("signed_in", &self.is_signed_in())
            .field("persistent", &self.backend.is_some())
            .finish()
    }
}
