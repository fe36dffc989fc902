//! TOML-based MessageRepository implementation.
//!
//! Each identity owns one file, `<root>/<identity>.toml`, holding its whole
//! conversation. Inserts are read-modify-write under an exclusive lock;
//! deleting a conversation removes the file in one operation.

use crate::dto::{ConversationFileV1, StoredMessageV1};
use crate::paths::ShowcasePaths;
use crate::storage::AtomicTomlFile;
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use showcase_core::chat::{ChatMessage, MessageRepository};
use showcase_core::error::{Result, ShowcaseError};
use showcase_core::identity::Identity;
use std::path::PathBuf;
use tokio::task;

/// File-backed message store.
///
/// # Features
///
/// - **Identity scoping**: an identity's messages live in its own file; no
///   operation opens another identity's file
/// - **Atomic writes**: tmp file + fsync + rename
/// - **Async-safe**: all file I/O runs in `tokio::task::spawn_blocking`
#[derive(Debug, Clone)]
pub struct TomlMessageRepository {
    root_dir: PathBuf,
}

impl TomlMessageRepository {
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: root_dir.into(),
        }
    }

    /// Repository under the platform data directory (`<data_dir>/messages`).
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(ShowcasePaths::messages_dir()?))
    }

    pub fn root_dir(&self) -> &PathBuf {
        &self.root_dir
    }

    fn conversation_file(&self, identity: &Identity) -> Result<AtomicTomlFile<ConversationFileV1>> {
        if identity.id.is_empty() {
            return Err(ShowcaseError::InvalidInput(
                "Identity id must not be empty".to_string(),
            ));
        }
        let path = self
            .root_dir
            .join(format!("{}.toml", encode_file_stem(&identity.id)));
        Ok(AtomicTomlFile::new(path))
    }

    fn fetch_all_sync(file: AtomicTomlFile<ConversationFileV1>) -> Result<Vec<ChatMessage>> {
        let Some(conversation) = file.load()? else {
            return Ok(Vec::new());
        };

        let mut messages = conversation.messages;
        // Stable: equal timestamps keep insertion order
        messages.sort_by_key(|message| DateTime::parse_from_rfc3339(&message.created_at).ok());

        Ok(messages.into_iter().map(ChatMessage::from).collect())
    }

    fn insert_sync(
        file: AtomicTomlFile<ConversationFileV1>,
        user_id: String,
        message: ChatMessage,
    ) -> Result<ChatMessage> {
        let stored = file.update(ConversationFileV1::empty(user_id), |conversation| {
            let stored = StoredMessageV1 {
                id: uuid::Uuid::new_v4().to_string(),
                role: message.role,
                content: message.content,
                created_at: next_timestamp(conversation.messages.last()),
            };
            conversation.messages.push(stored.clone());
            Ok(stored)
        })?;

        Ok(stored.into())
    }
}

#[async_trait]
impl MessageRepository for TomlMessageRepository {
    async fn fetch_all(&self, identity: &Identity) -> Result<Vec<ChatMessage>> {
        let file = self.conversation_file(identity)?;

        task::spawn_blocking(move || Self::fetch_all_sync(file))
            .await
            .map_err(|e| ShowcaseError::io(format!("Failed to spawn blocking task: {}", e)))?
    }

    async fn insert(&self, identity: &Identity, message: &ChatMessage) -> Result<ChatMessage> {
        let file = self.conversation_file(identity)?;
        let user_id = identity.id.clone();
        let message = message.clone();

        task::spawn_blocking(move || Self::insert_sync(file, user_id, message))
            .await
            .map_err(|e| ShowcaseError::io(format!("Failed to spawn blocking task: {}", e)))?
    }

    async fn delete_all(&self, identity: &Identity) -> Result<()> {
        let file = self.conversation_file(identity)?;

        task::spawn_blocking(move || file.remove().map_err(ShowcaseError::from))
            .await
            .map_err(|e| ShowcaseError::io(format!("Failed to spawn blocking task: {}", e)))?
    }
}

/// Timestamp for a new message, never earlier than the previous one.
fn next_timestamp(previous: Option<&StoredMessageV1>) -> String {
    let now = Utc::now();
    let floor = previous
        .and_then(|message| DateTime::parse_from_rfc3339(&message.created_at).ok())
        .map(|time| time.with_timezone(&Utc));

    let created_at = match floor {
        Some(floor) if floor > now => floor,
        _ => now,
    };
    created_at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Maps an identity id to a file stem.
///
/// ASCII alphanumerics, `-` and `_` pass through; every other byte becomes
/// `%XX`. The mapping is injective, so distinct identities never share a file.
fn encode_file_stem(id: &str) -> String {
    let mut stem = String::with_capacity(id.len());
    for byte in id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'_' {
            stem.push(byte as char);
        } else {
            stem.push_str(&format!("%{:02X}", byte));
        }
    }
    stem
}

#[cfg(test)]
mod tests {
    use super::*;
    use showcase_core::chat::MessageRole;
    use tempfile::TempDir;

    #[test]
    fn test_file_stem_encoding() {
        assert_eq!(encode_file_stem("alice-01_x"), "alice-01_x");
        assert_eq!(encode_file_stem("a.b"), "a%2Eb");
        assert_eq!(encode_file_stem("../etc"), "%2E%2E%2Fetc");
        assert_ne!(encode_file_stem("a.b"), encode_file_stem("a_b"));
    }

    #[test]
    fn test_timestamps_never_go_backwards() {
        let future = StoredMessageV1 {
            id: "1".to_string(),
            role: MessageRole::User,
            content: "from the future".to_string(),
            created_at: "2999-01-01T00:00:00.000000Z".to_string(),
        };

        assert_eq!(next_timestamp(Some(&future)), future.created_at);
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_timestamp() {
        let temp_dir = TempDir::new().unwrap();
        let repo = TomlMessageRepository::new(temp_dir.path());
        let alice = Identity::new("alice");

        let stored = repo.insert(&alice, &ChatMessage::user("hi")).await.unwrap();

        assert!(stored.id.is_some());
        assert!(stored.created_at.is_some());
        assert_eq!(stored.content, "hi");
        assert!(temp_dir.path().join("alice.toml").exists());
    }

    #[tokio::test]
    async fn test_empty_identity_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let repo = TomlMessageRepository::new(temp_dir.path());

        let err = repo.fetch_all(&Identity::new("")).await.unwrap_err();
        assert!(matches!(err, ShowcaseError::InvalidInput(_)));
    }
}
