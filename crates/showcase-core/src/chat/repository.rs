//! Message repository trait.
//!
//! Defines the interface for durable conversation storage.

use super::message::ChatMessage;
use crate::error::Result;
use crate::identity::Identity;
use async_trait::async_trait;

/// An abstract repository for persisting chat messages per identity.
///
/// This trait decouples the conversation logic from the concrete store
/// (local TOML files, the backend's REST data API, an in-memory fake).
///
/// # Implementation Notes
///
/// Implementations must:
/// - Scope every operation to the given identity (no cross-identity reads)
/// - Return messages in creation order, oldest first
/// - Make `delete_all` all-or-nothing
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Returns every message stored for `identity`, ordered by creation
    /// timestamp ascending.
    async fn fetch_all(&self, identity: &Identity) -> Result<Vec<ChatMessage>>;

    /// Stores a message for `identity`.
    ///
    /// # Returns
    ///
    /// - `Ok(ChatMessage)`: The stored message with `id` and `created_at` set
    /// - `Err(_)`: Error occurred during the write
    async fn insert(&self, identity: &Identity, message: &ChatMessage) -> Result<ChatMessage>;

    /// Removes every message stored for `identity`.
    ///
    /// Either all messages are removed or none are.
    async fn delete_all(&self, identity: &Identity) -> Result<()>;
}
