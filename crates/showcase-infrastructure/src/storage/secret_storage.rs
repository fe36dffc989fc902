//! Secret configuration file storage.
//!
//! Loads `secret.json` from the showcase config directory. The backend key
//! falls back to the `SHOWCASE_BACKEND_KEY` environment variable.

use crate::paths::ShowcasePaths;
use showcase_core::ShowcaseError;
use showcase_core::config::SecretConfig;
use std::fs;
use std::path::PathBuf;

/// Environment variable consulted when `secret.json` has no backend key.
pub const BACKEND_KEY_ENV: &str = "SHOWCASE_BACKEND_KEY";

#[derive(Debug, thiserror::Error)]
pub enum SecretStorageError {
    #[error("Secret file not found at: {}", .0.display())]
    NotFound(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Could not determine the config directory")]
    ConfigDirNotFound,
    #[error("No backend key in {} or ${}", .0.display(), BACKEND_KEY_ENV)]
    MissingBackendKey(PathBuf),
}

impl From<SecretStorageError> for ShowcaseError {
    fn from(err: SecretStorageError) -> Self {
        ShowcaseError::config(err.to_string())
    }
}

/// Read-only access to `secret.json`.
///
/// The file is plaintext JSON; keep it at mode 600.
pub struct SecretStorage {
    path: PathBuf,
}

impl SecretStorage {
    /// Uses the default location (`<config_dir>/secret.json`).
    pub fn new() -> Result<Self, SecretStorageError> {
        let path = ShowcasePaths::secret_file().map_err(|_| SecretStorageError::ConfigDirNotFound)?;
        Ok(Self { path })
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn load(&self) -> Result<SecretConfig, SecretStorageError> {
        if !self.path.exists() {
            return Err(SecretStorageError::NotFound(self.path.clone()));
        }

        let content = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Resolves the backend publishable key.
    ///
    /// Priority:
    /// 1. `backend.publishable_key` in secret.json (when non-empty)
    /// 2. `SHOWCASE_BACKEND_KEY`
    pub fn backend_key(&self) -> Result<String, SecretStorageError> {
        self.backend_key_with(|name| std::env::var(name).ok())
    }

    /// Same as [`backend_key`](Self::backend_key) with an injectable
    /// environment lookup.
    pub fn backend_key_with<F>(&self, env: F) -> Result<String, SecretStorageError>
    where
        F: Fn(&str) -> Option<String>,
    {
        match self.load() {
            Ok(config) => {
                if let Some(key) = config
                    .backend
                    .map(|backend| backend.publishable_key)
                    .filter(|key| !key.trim().is_empty())
                {
                    return Ok(key);
                }
            }
            Err(SecretStorageError::NotFound(_)) => {}
            Err(err) => {
                tracing::warn!("[SecretStorage] Ignoring unreadable secret file: {}", err);
            }
        }

        env(BACKEND_KEY_ENV)
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| SecretStorageError::MissingBackendKey(self.path.clone()))
    }
}
