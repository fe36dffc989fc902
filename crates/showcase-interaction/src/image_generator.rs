//! ImageGenerator - image generation through the backend's `generate-image`
//! function.
//!
//! The description is sent as `{ "prompt": "..." }`; the function answers with
//! `{ "imageUrl": "..." }` pointing at the rendered image.

use crate::chat_transport::build_client;
use crate::text_generator::{invoke_function, oneshot_client_builder};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use showcase_core::config::{BackendSettings, ChatSettings};
use showcase_core::error::{Result, ShowcaseError};

/// Name of the serverless function that renders images.
pub const GENERATE_IMAGE_FUNCTION: &str = "generate-image";

#[derive(Clone)]
pub struct ImageGenerator {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl ImageGenerator {
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    pub fn from_settings(
        backend: &BackendSettings,
        chat: &ChatSettings,
        api_key: impl Into<String>,
    ) -> Result<Self> {
        Ok(Self::new(backend.functions_url(GENERATE_IMAGE_FUNCTION), api_key)
            .with_client(build_client(oneshot_client_builder(chat))?))
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Renders an image for `prompt` and returns its URL.
    ///
    /// # Errors
    ///
    /// `InvalidInput` for a blank prompt (no request is made); transport and
    /// HTTP failures as for chat.
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        if prompt.trim().is_empty() {
            return Err(ShowcaseError::InvalidInput(
                "Please enter a description".to_string(),
            ));
        }

        tracing::debug!("[ImageGenerator] Generating image ({} chars)", prompt.len());

        let response: ImageResponse = invoke_function(
            &self.client,
            &self.endpoint,
            &self.api_key,
            GENERATE_IMAGE_FUNCTION,
            &ImageRequest { prompt },
        )
        .await?;

        if response.image_url.is_empty() {
            return Err(ShowcaseError::transport("generate-image returned no image"));
        }
        Ok(response.image_url)
    }
}

#[derive(Serialize)]
struct ImageRequest<'a> {
    prompt: &'a str,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageResponse {
    #[serde(default)]
    image_url: String,
}
