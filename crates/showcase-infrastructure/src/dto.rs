//! Data Transfer Objects for persisted conversations.
//!
//! The on-disk shape is private to this crate; domain code only sees
//! `ChatMessage`.

use serde::{Deserialize, Serialize};
use showcase_core::chat::{ChatMessage, MessageRole};

/// Current schema version of a conversation file.
pub const CONVERSATION_FILE_VERSION: &str = "1.0.0";

/// One identity's conversation file.
///
/// ```toml
/// schema_version = "1.0.0"
/// user_id = "alice"
///
/// [[messages]]
/// id = "..."
/// role = "user"
/// content = "hi"
/// created_at = "2025-01-01T00:00:00.000000Z"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationFileV1 {
    pub schema_version: String,
    pub user_id: String,
    #[serde(default)]
    pub messages: Vec<StoredMessageV1>,
}

impl ConversationFileV1 {
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            schema_version: CONVERSATION_FILE_VERSION.to_string(),
            user_id: user_id.into(),
            messages: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessageV1 {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    /// RFC 3339, UTC, microsecond precision.
    pub created_at: String,
}

impl From<StoredMessageV1> for ChatMessage {
    fn from(stored: StoredMessageV1) -> Self {
        ChatMessage {
            id: Some(stored.id),
            role: stored.role,
            content: stored.content,
            created_at: Some(stored.created_at),
        }
    }
}
