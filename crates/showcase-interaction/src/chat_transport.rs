//! FunctionsChatTransport - streaming chat over the backend's `chat` function.
//!
//! Posts the conversation as `{ "messages": [{role, content}, ...] }` and
//! decodes the event-stream body into fragments.

use crate::sse::{DecoderLimits, StreamDecoder, fragment_stream};
use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use showcase_core::chat::{ChatMessage, ChatTransport, FragmentStream, MessageRole};
use showcase_core::config::{BackendSettings, ChatSettings};
use showcase_core::error::{Result, ShowcaseError};
use std::time::Duration;

/// Name of the serverless function that streams chat replies.
pub const CHAT_FUNCTION: &str = "chat";

/// Chat transport that talks to the backend's streaming chat function.
#[derive(Clone)]
pub struct FunctionsChatTransport {
    client: Client,
    endpoint: String,
    api_key: String,
    limits: DecoderLimits,
}

impl FunctionsChatTransport {
    /// Creates a transport for the given function URL and publishable key.
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            limits: DecoderLimits::default(),
        }
    }

    /// Builds a transport from configuration.
    ///
    /// See [`streaming_client_builder`] for the timeouts; decoder limits come from
    /// the `[chat]` section.
    pub fn from_settings(
        backend: &BackendSettings,
        chat: &ChatSettings,
        api_key: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self::new(backend.functions_url(CHAT_FUNCTION), api_key)
            .with_client(build_client(streaming_client_builder(chat))?)
            .with_limits(DecoderLimits::from(chat)))
    }

    /// Replaces the HTTP client (timeouts, proxies, test setups).
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Overrides the decoder limits.
    pub fn with_limits(mut self, limits: DecoderLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Returns the function URL this transport posts to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ChatTransport for FunctionsChatTransport {
    async fn open_stream(&self, context: &[ChatMessage]) -> Result<FragmentStream> {
        let request = ChatRequest {
            messages: context.iter().map(WireMessage::from).collect(),
        };

        tracing::debug!(
            "[FunctionsChatTransport] Opening stream with {} context messages",
            request.messages.len()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|err| ShowcaseError::transport(format!("Chat request failed: {err}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read chat error body".to_string());
            tracing::warn!(
                "[FunctionsChatTransport] Chat function returned {}: {}",
                status,
                body_text
            );
            return Err(map_http_error(status, body_text));
        }

        Ok(fragment_stream(
            response.bytes_stream(),
            StreamDecoder::with_limits(self.limits),
        ))
    }
}

/// HTTP client settings for streamed replies.
///
/// Only connecting and the gap between two reads are bounded; a reply that
/// keeps streaming is never cut off by an overall deadline.
pub fn streaming_client_builder(chat: &ChatSettings) -> ClientBuilder {
    Client::builder()
        .connect_timeout(Duration::from_secs(chat.connect_timeout_secs))
        .read_timeout(Duration::from_secs(chat.stream_idle_timeout_secs))
}

pub(crate) fn build_client(builder: ClientBuilder) -> Result<Client> {
    builder
        .build()
        .map_err(|err| ShowcaseError::config(format!("Failed to build HTTP client: {err}")))
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    messages: Vec<WireMessage<'a>>,
}

#[derive(Serialize)]
struct WireMessage<'a> {
    role: MessageRole,
    content: &'a str,
}

impl<'a> From<&'a ChatMessage> for WireMessage<'a> {
    fn from(message: &'a ChatMessage) -> Self {
        Self {
            role: message.role,
            content: &message.content,
        }
    }
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

/// Maps a non-success status to the error taxonomy.
///
/// The body's `error` field is used as message when the function returned
/// JSON, the raw body otherwise.
pub(crate) fn map_http_error(status: StatusCode, body: String) -> ShowcaseError {
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|wrapper| wrapper.error)
        .unwrap_or(body);

    ShowcaseError::from_status(status.as_u16(), message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let context = vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")];
        let request = ChatRequest {
            messages: context.iter().map(WireMessage::from).collect(),
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "messages": [
                    { "role": "user", "content": "hi" },
                    { "role": "assistant", "content": "hello" }
                ]
            })
        );
    }

    #[test]
    fn test_map_http_error_statuses() {
        assert_eq!(
            map_http_error(StatusCode::TOO_MANY_REQUESTS, String::new()),
            ShowcaseError::RateLimited
        );
        assert_eq!(
            map_http_error(StatusCode::PAYMENT_REQUIRED, String::new()),
            ShowcaseError::QuotaExhausted
        );
        assert_eq!(
            map_http_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                r#"{"error":"AI gateway error"}"#.to_string()
            ),
            ShowcaseError::Http {
                status: 500,
                message: "AI gateway error".to_string()
            }
        );
    }

    #[test]
    fn test_from_settings_uses_functions_url() {
        let backend = BackendSettings {
            base_url: "https://project.example.co".to_string(),
        };
        let transport =
            FunctionsChatTransport::from_settings(&backend, &ChatSettings::default(), "key")
                .unwrap();

        assert_eq!(
            transport.endpoint(),
            "https://project.example.co/functions/v1/chat"
        );
    }
}
