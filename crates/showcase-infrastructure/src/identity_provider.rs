//! Configuration-based identity provider.
//!
//! The identity comes from the `[identity]` section of config.toml or, when
//! that is absent, from `SHOWCASE_USER_ID` / `SHOWCASE_USER_EMAIL`.

use async_trait::async_trait;
use showcase_core::config::ConfigRoot;
use showcase_core::error::Result;
use showcase_core::identity::{Identity, IdentityProvider};
use std::sync::{PoisonError, RwLock};

pub const USER_ID_ENV: &str = "SHOWCASE_USER_ID";
pub const USER_EMAIL_ENV: &str = "SHOWCASE_USER_EMAIL";

/// Identity provider holding a single, locally configured identity.
///
/// `sign_out` forgets the identity for the lifetime of this provider; the
/// configuration file is left untouched.
#[derive(Debug, Default)]
pub struct ConfiguredIdentityProvider {
    identity: RwLock<Option<Identity>>,
}

impl ConfiguredIdentityProvider {
    pub fn new(identity: Option<Identity>) -> Self {
        Self {
            identity: RwLock::new(identity),
        }
    }

    /// A provider in the signed-out state.
    pub fn signed_out() -> Self {
        Self::default()
    }

    pub fn from_config(config: &ConfigRoot) -> Self {
        Self::from_config_with(config, |name| std::env::var(name).ok())
    }

    /// Same as [`from_config`](Self::from_config) with an injectable
    /// environment lookup.
    pub fn from_config_with<F>(config: &ConfigRoot, env: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let from_config = config
            .identity
            .as_ref()
            .filter(|settings| !settings.user_id.trim().is_empty())
            .map(|settings| Identity {
                id: settings.user_id.clone(),
                email: settings.email.clone(),
            });

        let identity = from_config.or_else(|| {
            env(USER_ID_ENV)
                .filter(|id| !id.trim().is_empty())
                .map(|id| Identity {
                    id,
                    email: env(USER_EMAIL_ENV),
                })
        });

        match &identity {
            Some(identity) => tracing::info!(
                "[ConfiguredIdentityProvider] Signed in as {}",
                identity.display_name()
            ),
            None => tracing::info!("[ConfiguredIdentityProvider] No identity configured"),
        }

        Self::new(identity)
    }
}

#[async_trait]
impl IdentityProvider for ConfiguredIdentityProvider {
    fn current_identity(&self) -> Option<Identity> {
        self.identity
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn sign_out(&self) -> Result<()> {
        let previous = self
            .identity
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(identity) = previous {
            tracing::info!(
                "[ConfiguredIdentityProvider] Signed out {}",
                identity.display_name()
            );
        }
        Ok(())
    }
}
