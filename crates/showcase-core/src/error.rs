//! Error types for the Showcase application.

use thiserror::Error;

/// User-facing text for a rate-limited chat request (HTTP 429).
pub const RATE_LIMITED_MESSAGE: &str = "Rate limit exceeded. Please try again later.";

/// User-facing text for an exhausted usage quota (HTTP 402).
pub const QUOTA_EXHAUSTED_MESSAGE: &str = "Usage limit reached. Please add credits.";

/// User-facing text for any other failed chat request.
pub const GENERIC_FAILURE_MESSAGE: &str = "Failed to get response";

/// A shared error type for the entire Showcase application.
///
/// Transport-level variants (`Transport`, `RateLimited`, `QuotaExhausted`,
/// `Http`, `BufferOverflow`) are fatal to the current send but never to the
/// session: the caller can simply retry. Storage-level variants (`Load`,
/// `Clear`, `Persist`) carry the backend's message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShowcaseError {
    /// Network or stream-level failure (connection error, aborted body).
    #[error("Transport error: {0}")]
    Transport(String),

    /// The chat backend answered 429.
    #[error("Rate limit exceeded")]
    RateLimited,

    /// The chat backend answered 402.
    #[error("Usage quota exhausted")]
    QuotaExhausted,

    /// Any other non-success HTTP status.
    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    /// The stream decoder accumulated more unparsed text than allowed.
    #[error("Stream buffer exceeded {limit} bytes without a parseable frame")]
    BufferOverflow { limit: usize },

    /// The in-flight operation was cancelled (session ended or cleared).
    #[error("Operation cancelled")]
    Cancelled,

    /// Loading the conversation history failed.
    #[error("Failed to load history: {0}")]
    Load(String),

    /// Deleting the conversation history failed.
    #[error("Failed to clear history: {0}")]
    Clear(String),

    /// Persisting a single message failed.
    #[error("Failed to persist message: {0}")]
    Persist(String),

    /// User input rejected before any request was made.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// No identity is available; the chat feature is gated.
    #[error("Not signed in")]
    Unauthenticated,

    /// Entity not found error with type information
    #[error("Entity not found: {entity_type} '{id}'")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },

    /// IO error (file system operations)
    #[error("IO error: {message}")]
    Io { message: String },

    /// Serialization/deserialization error
    #[error("Serialization error: {format} - {message}")]
    Serialization {
        format: String, // "TOML", "JSON", etc.
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (should not happen in normal operation)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ShowcaseError {
    // ============================================================================
    // Constructor helpers
    // ============================================================================

    /// Creates a Transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport(message.into())
    }

    /// Creates a Load error
    pub fn load(message: impl Into<String>) -> Self {
        Self::Load(message.into())
    }

    /// Creates a Clear error
    pub fn clear(message: impl Into<String>) -> Self {
        Self::Clear(message.into())
    }

    /// Creates a Persist error
    pub fn persist(message: impl Into<String>) -> Self {
        Self::Persist(message.into())
    }

    /// Creates a NotFound error
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    /// Creates an IO error
    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    /// Creates a Config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Creates an Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Maps a non-success HTTP status to the matching variant.
    ///
    /// 429 and 402 get dedicated variants because they map to distinct
    /// user-facing messages; everything else is a generic `Http` failure.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            429 => Self::RateLimited,
            402 => Self::QuotaExhausted,
            _ => Self::Http {
                status,
                message: message.into(),
            },
        }
    }

    // ============================================================================
    // Type checking methods
    // ============================================================================

    /// Check if this error ended a send at the transport level.
    ///
    /// Returns true for network failures, non-success HTTP statuses and
    /// decoder buffer overflows. All of them are recoverable by retrying.
    pub fn is_transport_failure(&self) -> bool {
        matches!(
            self,
            Self::Transport(_)
                | Self::RateLimited
                | Self::QuotaExhausted
                | Self::Http { .. }
                | Self::BufferOverflow { .. }
        )
    }

    /// Check if this is a Cancelled error
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Check if this is a NotFound error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Check if this is an IO error
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Check if this is a config error
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns the notification text shown to the user for this error.
    ///
    /// Transport failures collapse to three distinct messages (rate limit,
    /// quota, generic). Storage failures keep their own wording.
    pub fn user_message(&self) -> String {
        match self {
            Self::RateLimited => RATE_LIMITED_MESSAGE.to_string(),
            Self::QuotaExhausted => QUOTA_EXHAUSTED_MESSAGE.to_string(),
            Self::Transport(_) | Self::Http { .. } | Self::BufferOverflow { .. } => {
                GENERIC_FAILURE_MESSAGE.to_string()
            }
            Self::Cancelled => "Request cancelled".to_string(),
            Self::Load(_) => "Failed to load chat history".to_string(),
            Self::Clear(_) => "Failed to clear chat".to_string(),
            Self::Persist(_) => "Failed to save message".to_string(),
            Self::Unauthenticated => "Please sign in to use chat".to_string(),
            Self::InvalidInput(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

// ============================================================================
// From implementations for automatic conversion
// ============================================================================

impl From<std::io::Error> for ShowcaseError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            message: format!("{} (kind: {:?})", err, err.kind()),
        }
    }
}

impl From<serde_json::Error> for ShowcaseError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization {
            format: "JSON".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for ShowcaseError {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<toml::ser::Error> for ShowcaseError {
    fn from(err: toml::ser::Error) -> Self {
        Self::Serialization {
            format: "TOML".to_string(),
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for ShowcaseError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => Self::from_status(status.as_u16(), err.to_string()),
            None => Self::Transport(err.to_string()),
        }
    }
}

/// Conversion from anyhow::Error (binaries and adapters that still use anyhow)
impl From<anyhow::Error> for ShowcaseError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// A type alias for `Result<T, ShowcaseError>`.
pub type Result<T> = std::result::Result<T, ShowcaseError>;
