//! Configuration service implementation.
//!
//! Loads the root configuration from `config.toml` in the showcase config
//! directory and applies environment overrides.

use crate::paths::ShowcasePaths;
use showcase_core::config::ConfigRoot;
use showcase_core::error::Result;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};

/// Overrides `[backend] base_url`.
pub const BACKEND_URL_ENV: &str = "SHOWCASE_BACKEND_URL";

/// Loads and caches the root configuration.
///
/// A missing file is not an error: every section has defaults.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
    config: Arc<RwLock<Option<ConfigRoot>>>,
}

impl ConfigService {
    /// Uses the default location (`<config_dir>/config.toml`).
    pub fn new() -> Result<Self> {
        Ok(Self::with_path(ShowcasePaths::config_file()?))
    }

    pub fn with_path(path: PathBuf) -> Self {
        Self {
            path,
            config: Arc::new(RwLock::new(None)),
        }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    /// Returns the configuration, reading the file on first access.
    ///
    /// # Errors
    ///
    /// Fails when the file exists but cannot be read or parsed.
    pub fn get_config(&self) -> Result<ConfigRoot> {
        if let Some(cached) = self
            .config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return Ok(cached.clone());
        }

        let loaded = self.load_with(|name| std::env::var(name).ok())?;
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = Some(loaded.clone());
        Ok(loaded)
    }

    /// Forces a reload on next access.
    pub fn invalidate_cache(&self) {
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Reads the file and applies overrides from `env`, bypassing the cache.
    pub fn load_with<F>(&self, env: F) -> Result<ConfigRoot>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = if self.path.exists() {
            let content = std::fs::read_to_string(&self.path)?;
            toml::from_str::<ConfigRoot>(&content)?
        } else {
            tracing::debug!(
                "[ConfigService] No config at {}, using defaults",
                self.path.display()
            );
            ConfigRoot::default()
        };

        if let Some(base_url) = env(BACKEND_URL_ENV).filter(|url| !url.trim().is_empty()) {
            config.backend.base_url = base_url;
        }

        Ok(config)
    }
}
