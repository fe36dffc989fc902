//! Unified path management for showcase configuration and data files.
//!
//! Directories are resolved through the `dirs` crate so each platform gets
//! its native location (XDG on Linux, Application Support on macOS, AppData
//! on Windows).

use showcase_core::config::{BackendSecret, SecretConfig};
use std::path::PathBuf;

const APP_DIR_NAME: &str = "showcase";

/// Errors that can occur during path resolution.
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// The platform reports no config directory.
    #[error("Cannot determine the platform config directory")]
    ConfigDirNotFound,
    /// The platform reports no data directory.
    #[error("Cannot determine the platform data directory")]
    DataDirNotFound,
}

impl From<PathError> for showcase_core::ShowcaseError {
    fn from(err: PathError) -> Self {
        showcase_core::ShowcaseError::config(err.to_string())
    }
}

/// Unified path management for showcase.
///
/// # Directory Structure
///
/// ```text
/// ~/.config/showcase/           # Config directory
/// ├── config.toml               # Application configuration
/// ├── secret.json               # Backend key
/// └── logs/                     # Daily rolling logs
///     └── showcase.log.YYYY-MM-DD
///
/// ~/.local/share/showcase/      # Data directory
/// └── messages/                 # One conversation file per identity
///     └── <identity>.toml
/// ```
pub struct ShowcasePaths;

impl ShowcasePaths {
    /// Returns the showcase configuration directory (e.g. `~/.config/showcase/`).
    pub fn config_dir() -> Result<PathBuf, PathError> {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .ok_or(PathError::ConfigDirNotFound)
    }

    /// Returns the showcase data directory (e.g. `~/.local/share/showcase/`).
    pub fn data_dir() -> Result<PathBuf, PathError> {
        dirs::data_dir()
            .map(|dir| dir.join(APP_DIR_NAME))
            .ok_or(PathError::DataDirNotFound)
    }

    pub fn config_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Returns the path to the secrets file.
    ///
    /// # Security Note
    ///
    /// Ensure this file has appropriate permissions (e.g., 600) to prevent
    /// unauthorized access.
    pub fn secret_file() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("secret.json"))
    }

    /// Ensures the secret file exists, creating a template if it doesn't.
    ///
    /// The template carries an empty `backend.publishable_key`. On Unix the
    /// file is created with mode 600.
    pub fn ensure_secret_file() -> Result<PathBuf, std::io::Error> {
        let secret_path = Self::secret_file()
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::NotFound, e.to_string()))?;

        if secret_path.exists() {
            return Ok(secret_path);
        }

        if let Some(parent) = secret_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let template = SecretConfig {
            backend: Some(BackendSecret {
                publishable_key: String::new(),
            }),
        };
        let template_json = serde_json::to_string_pretty(&template).map_err(std::io::Error::other)?;
        std::fs::write(&secret_path, template_json)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let permissions = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&secret_path, permissions)?;
        }

        Ok(secret_path)
    }

    /// Directory holding the per-identity conversation files.
    pub fn messages_dir() -> Result<PathBuf, PathError> {
        Ok(Self::data_dir()?.join("messages"))
    }

    pub fn logs_dir() -> Result<PathBuf, PathError> {
        Ok(Self::config_dir()?.join("logs"))
    }
}
