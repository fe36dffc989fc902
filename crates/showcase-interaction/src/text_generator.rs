//! TextGenerator - one-shot generation through the backend's `generate-text`
//! function.
//!
//! The input is wrapped in a prompt template before it is sent; the function
//! answers with `{ "text": "..." }`.

use crate::chat_transport::{build_client, map_http_error};
use reqwest::{Client, ClientBuilder};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use showcase_core::config::{BackendSettings, ChatSettings};
use showcase_core::error::{Result, ShowcaseError};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Name of the serverless function that generates text.
pub const GENERATE_TEXT_FUNCTION: &str = "generate-text";

/// Prompt templates offered to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PromptTemplate {
    #[default]
    Story,
    Poem,
    Email,
    Summary,
    /// The input is sent verbatim.
    Custom,
}

impl PromptTemplate {
    /// All templates in menu order.
    pub fn all() -> &'static [PromptTemplate] {
        &[
            PromptTemplate::Story,
            PromptTemplate::Poem,
            PromptTemplate::Email,
            PromptTemplate::Summary,
            PromptTemplate::Custom,
        ]
    }

    /// Identifier used on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            PromptTemplate::Story => "story",
            PromptTemplate::Poem => "poem",
            PromptTemplate::Email => "email",
            PromptTemplate::Summary => "summary",
            PromptTemplate::Custom => "custom",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PromptTemplate::Story => "Short Story",
            PromptTemplate::Poem => "Poem",
            PromptTemplate::Email => "Professional Email",
            PromptTemplate::Summary => "Summary",
            PromptTemplate::Custom => "Custom Prompt",
        }
    }

    /// Instruction placed in front of the user's input.
    pub fn prefix(&self) -> &'static str {
        match self {
            PromptTemplate::Story => "Write a short creative story about",
            PromptTemplate::Poem => "Write a beautiful poem about",
            PromptTemplate::Email => "Write a professional email about",
            PromptTemplate::Summary => "Summarize the following text:",
            PromptTemplate::Custom => "",
        }
    }

    /// Builds the full prompt for `input`.
    pub fn render(&self, input: &str) -> String {
        match self {
            PromptTemplate::Custom => input.to_string(),
            other => format!("{} {}", other.prefix(), input),
        }
    }
}

impl fmt::Display for PromptTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PromptTemplate {
    type Err = ShowcaseError;

    fn from_str(s: &str) -> Result<Self> {
        PromptTemplate::all()
            .iter()
            .copied()
            .find(|template| template.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                ShowcaseError::InvalidInput(format!(
                    "Unknown template '{}'. Available: story, poem, email, summary, custom",
                    s
                ))
            })
    }
}

/// Client for the `generate-text` function.
#[derive(Clone)]
pub struct TextGenerator {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl TextGenerator {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    /// Builds a generator from configuration (see [`oneshot_client_builder`]).
    pub fn from_settings(
        backend: &BackendSettings,
        chat: &ChatSettings,
        api_key: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self::new(backend.functions_url(GENERATE_TEXT_FUNCTION), api_key)
            .with_client(build_client(oneshot_client_builder(chat))?))
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Generates text for `input` using `template`.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for blank input (no request is made); transport and
    /// HTTP failures as for chat.
    pub async fn generate(&self, template: PromptTemplate, input: &str) -> Result<String> {
        if input.trim().is_empty() {
            return Err(ShowcaseError::InvalidInput(
                "Please enter some text".to_string(),
            ));
        }

        let request = GenerateRequest {
            prompt: template.render(input),
        };
        tracing::debug!(
            "[TextGenerator] Generating with template '{}' ({} chars)",
            template,
            request.prompt.len()
        );

        let parsed: GenerateResponse = invoke_function(
            &self.client,
            &self.endpoint,
            &self.api_key,
            GENERATE_TEXT_FUNCTION,
            &request,
        )
        .await?;
        Ok(parsed.text)
    }
}

/// Posts `body` to a serverless function and decodes its JSON answer.
///
/// Non-success statuses go through the chat error taxonomy.
pub(crate) async fn invoke_function<B, T>(
    client: &Client,
    endpoint: &str,
    api_key: &str,
    function: &str,
    body: &B,
) -> Result<T>
where
    B: Serialize + ?Sized,
    T: DeserializeOwned,
{
    let response = client
        .post(endpoint)
        .header("Authorization", format!("Bearer {}", api_key))
        .json(body)
        .send()
        .await
        .map_err(|err| ShowcaseError::transport(format!("{function} request failed: {err}")))?;

    let status = response.status();
    let body_text = response
        .text()
        .await
        .map_err(|err| ShowcaseError::transport(format!("Failed to read response: {err}")))?;

    if !status.is_success() {
        tracing::warn!("[{}] returned {}: {}", function, status, body_text);
        return Err(map_http_error(status, body_text));
    }

    Ok(serde_json::from_str(&body_text)?)
}

/// HTTP client settings for single request/response calls, bounded by
/// `request_timeout_secs` end to end.
pub fn oneshot_client_builder(chat: &ChatSettings) -> ClientBuilder {
    Client::builder()
        .connect_timeout(Duration::from_secs(chat.connect_timeout_secs))
        .timeout(Duration::from_secs(chat.request_timeout_secs))
}

#[derive(Serialize)]
struct GenerateRequest {
    prompt: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    text: String,
}
