//! Conversation message types.
//!
//! This module contains types for representing messages in a conversation,
//! including roles and message content.

use serde::{Deserialize, Serialize};

/// Represents the role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    /// Message from the user.
    User,
    /// Message from the AI assistant.
    Assistant,
}

impl MessageRole {
    /// Returns the wire name of the role (`"user"` / `"assistant"`).
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("Unknown message role: {}", other)),
        }
    }
}

/// A single message in a conversation history.
///
/// `id` and `created_at` are assigned by the durable store; a message that
/// has not been persisted yet carries neither. The role never changes after
/// construction, only `content` grows while an assistant reply streams in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Durable identifier, absent until persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The role of the message sender.
    pub role: MessageRole,
    /// The content of the message.
    pub content: String,
    /// Timestamp assigned by the store on insert (RFC 3339).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

impl ChatMessage {
    /// Creates an unpersisted user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(MessageRole::User, content)
    }

    /// Creates an unpersisted assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(MessageRole::Assistant, content)
    }

    /// Creates an unpersisted message with the given role.
    pub fn new(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            id: None,
            role,
            content: content.into(),
            created_at: None,
        }
    }

    /// Returns true when the message has no content yet.
    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}
