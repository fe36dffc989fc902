//! Chat domain module.
//!
//! This module contains the conversation model, the in-memory store that
//! drives a streaming reply, and the traits for its two collaborators.
//!
//! # Module Structure
//!
//! - `message`: Conversation message types (`MessageRole`, `ChatMessage`)
//! - `store`: Ordered message sequence and single-flight guard (`ConversationStore`)
//! - `repository`: Durable storage trait (`MessageRepository`)
//! - `transport`: Streaming completion trait (`ChatTransport`)
//!
//! # Usage
//!
//! ```ignore
//! use showcase_core::chat::{ChatMessage, ConversationStore, MessageRole};
//! use showcase_core::chat::{ChatTransport, MessageRepository};
//! ```

mod message;
mod repository;
mod store;
mod transport;

// Re-export public API
pub use message::{ChatMessage, MessageRole};
pub use repository::MessageRepository;
pub use store::{ConversationStore, PendingSend, SendPhase};
pub use transport::{ChatTransport, FragmentStream};
