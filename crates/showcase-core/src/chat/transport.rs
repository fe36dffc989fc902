//! Chat transport trait.
//!
//! The transport turns a conversation context into a live stream of text
//! fragments. The concrete HTTP implementation lives in
//! `showcase-interaction`.

use super::message::ChatMessage;
use crate::error::Result;
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Ordered stream of incremental text fragments.
///
/// An `Err` item is a transport failure and terminates the stream; the
/// stream ending without error is a completed reply.
pub type FragmentStream = BoxStream<'static, Result<String>>;

/// Opens streaming completions for a conversation.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Starts a streaming reply for `context`.
    ///
    /// `context` is the full conversation up to and including the newest
    /// user message. Errors returned here (connection refused, non-success
    /// status) happen before any fragment arrives.
    async fn open_stream(&self, context: &[ChatMessage]) -> Result<FragmentStream>;
}
