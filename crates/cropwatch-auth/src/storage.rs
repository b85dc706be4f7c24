use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::TokenStorageError;
use crate::session::{SessionToken, TokenBackend};

/// On-disk session record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSession {
    /// Bearer token for API requests
    pub token: SessionToken,

    /// When the token was stored (Unix timestamp)
    pub stored_at: i64,
}

/// File-based session persistence.
/// The session is stored as JSON in the user's config directory.
#[derive(Debug, Clone)]
pub struct FileTokenBackend {
    path: PathBuf,
}

impl FileTokenBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl TokenBackend for FileTokenBackend {
    fn load(&self) -> Result<Option<SessionToken>, TokenStorageError> {
        if !self.path.exists() {
            return Ok(None);
        }

        let json = fs::read_to_string(&self.path)?;
        let stored: StoredSession = serde_json::from_str(&json)?;

        tracing::debug!("Loaded session stored at {}", stored.stored_at);
        Ok(Some(stored.token))
    }

    fn save(&self, token: &SessionToken) -> Result<(), TokenStorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let stored = StoredSession {
            token: token.clone(),
            stored_at: chrono::Utc::now().timestamp(),
        };
        let json = serde_json::to_string_pretty(&stored)?;
        fs::write(&self.path, json)?;

        tracing::info!("Stored session at {:?}", self.path);
        Ok(())
    }

    fn remove(&self) -> Result<(), TokenStorageError> {
        if self.path.exists() {
            fs::remove_file(&self.path)?;
            tracing::info!("Deleted session file {:?}", self.path);
        }
        Ok(())
    }
}
