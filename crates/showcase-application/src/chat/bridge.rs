//! Persistence bridge between the in-memory conversation and durable storage.
//!
//! `PersistenceBridge` wraps a `MessageRepository` and applies the storage
//! failure policy:
//!
//! - `persist` is best-effort: a failure is logged and swallowed, never
//!   retried, and never rolls back memory
//! - `fetch_all` failures surface as `Load`
//! - `delete_all` failures surface as `Clear`

use showcase_core::chat::{ChatMessage, MessageRepository};
use showcase_core::error::{Result, ShowcaseError};
use showcase_core::identity::Identity;
use std::sync::Arc;

#[derive(Clone)]
pub struct PersistenceBridge {
    repository: Arc<dyn MessageRepository>,
}

impl PersistenceBridge {
    pub fn new(repository: Arc<dyn MessageRepository>) -> Self {
        Self { repository }
    }

    /// Writes one message for `identity`.
    ///
    /// Returns the stored message (with `id` and `created_at`), or `None`
    /// when the write failed. The failure is only logged.
    pub async fn persist(&self, identity: &Identity, message: &ChatMessage) -> Option<ChatMessage> {
        match self.repository.insert(identity, message).await {
            Ok(stored) => {
                tracing::debug!(
                    "[PersistenceBridge] Persisted {} message ({} chars)",
                    stored.role,
                    stored.content.len()
                );
                Some(stored)
            }
            Err(err) => {
                let failure = ShowcaseError::persist(err.to_string());
                tracing::warn!("[PersistenceBridge] {}", failure);
                None
            }
        }
    }

    /// Returns the identity's messages, oldest first.
    pub async fn fetch_all(&self, identity: &Identity) -> Result<Vec<ChatMessage>> {
        self.repository
            .fetch_all(identity)
            .await
            .map_err(|err| ShowcaseError::load(err.to_string()))
    }

    /// Deletes every message of `identity`, all or nothing.
    pub async fn delete_all(&self, identity: &Identity) -> Result<()> {
        self.repository
            .delete_all(identity)
            .await
            .map_err(|err| ShowcaseError::clear(err.to_string()))
    }
}
