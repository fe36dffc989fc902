//! Wiring of adapters from configuration.
//!
//! `AppContext` owns the shared, long-lived services (identity provider,
//! message repository, chat transport, text and image generators) and opens
//! [`ChatSession`]s on top of them.

use crate::chat::ChatSession;
use showcase_core::chat::{ChatTransport, MessageRepository};
use showcase_core::config::{ConfigRoot, StorageKind};
use showcase_core::error::{Result, ShowcaseError};
use showcase_core::identity::IdentityProvider;
use showcase_infrastructure::{
    ConfiguredIdentityProvider, RestMessageRepository, TomlMessageRepository,
};
use showcase_interaction::{FunctionsChatTransport, ImageGenerator, TextGenerator};
use std::path::PathBuf;
use std::sync::Arc;

pub struct AppContext {
    config: ConfigRoot,
    identity_provider: Arc<dyn IdentityProvider>,
    repository: Arc<dyn MessageRepository>,
    transport: Arc<dyn ChatTransport>,
    text_generator: TextGenerator,
    image_generator: ImageGenerator,
}

impl AppContext {
    /// Builds every adapter from `config` and the backend publishable key.
    ///
    /// Local storage lives under the platform data directory unless
    /// `messages_dir` is given.
    pub fn from_config(
        config: ConfigRoot,
        backend_key: &str,
        messages_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let repository: Arc<dyn MessageRepository> = match config.storage.kind {
            StorageKind::Local => {
                let repo = match messages_dir {
                    Some(dir) => TomlMessageRepository::new(dir),
                    None => TomlMessageRepository::default_location()?,
                };
                tracing::info!(
                    "[AppContext] Using local message storage at {}",
                    repo.root_dir().display()
                );
                Arc::new(repo)
            }
            StorageKind::Remote => {
                let repo = RestMessageRepository::from_settings(&config.backend, backend_key);
                tracing::info!(
                    "[AppContext] Using remote message storage at {}",
                    repo.endpoint()
                );
                Arc::new(repo)
            }
        };

        let transport =
            FunctionsChatTransport::from_settings(&config.backend, &config.chat, backend_key)?;
        let text_generator =
            TextGenerator::from_settings(&config.backend, &config.chat, backend_key)?;
        let image_generator =
            ImageGenerator::from_settings(&config.backend, &config.chat, backend_key)?;
        let identity_provider = ConfiguredIdentityProvider::from_config(&config);

        Ok(Self {
            config,
            identity_provider: Arc::new(identity_provider),
            repository,
            transport: Arc::new(transport),
            text_generator,
            image_generator,
        })
    }

    /// Assembles a context from ready-made parts.
    pub fn from_parts(
        config: ConfigRoot,
        identity_provider: Arc<dyn IdentityProvider>,
        repository: Arc<dyn MessageRepository>,
        transport: Arc<dyn ChatTransport>,
        text_generator: TextGenerator,
        image_generator: ImageGenerator,
    ) -> Self {
        Self {
            config,
            identity_provider,
            repository,
            transport,
            text_generator,
            image_generator,
        }
    }

    pub fn config(&self) -> &ConfigRoot {
        &self.config
    }

    pub fn identity_provider(&self) -> &Arc<dyn IdentityProvider> {
        &self.identity_provider
    }

    pub fn text_generator(&self) -> &TextGenerator {
        &self.text_generator
    }

    pub fn image_generator(&self) -> &ImageGenerator {
        &self.image_generator
    }

    /// Opens a chat session for the current identity and loads its history.
    ///
    /// A failed history load is logged and yields an empty session; the
    /// error is handed back alongside so the caller can tell the user.
    ///
    /// # Errors
    ///
    /// `Unauthenticated` when nobody is signed in.
    pub async fn open_session(&self) -> Result<(ChatSession, Option<ShowcaseError>)> {
        let session = ChatSession::open(
            Arc::clone(&self.identity_provider),
            Arc::clone(&self.transport),
            Arc::clone(&self.repository),
        )?;

        let load_error = session.load_history().await.err();
        Ok((session, load_error))
    }
}
