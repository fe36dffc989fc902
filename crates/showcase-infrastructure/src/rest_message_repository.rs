//! RestMessageRepository - message storage on the backend's REST data API.
//!
//! Rows live in the `chat_messages` table, filtered with PostgREST operators
//! (`user_id=eq.<id>`, `order=created_at.asc`). Every request carries the
//! publishable key both as `apikey` and as bearer token.

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use showcase_core::chat::{ChatMessage, MessageRepository, MessageRole};
use showcase_core::config::BackendSettings;
use showcase_core::error::{Result, ShowcaseError};
use showcase_core::identity::Identity;

pub const MESSAGES_TABLE: &str = "chat_messages";

const SELECT_COLUMNS: &str = "id,role,content,created_at";

#[derive(Clone)]
pub struct RestMessageRepository {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl RestMessageRepository {
    /// Creates a repository for the table URL (`.../rest/v1/chat_messages`).
    pub fn new(endpoint: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: endpoint.into(),
            api_key: api_key.into(),
        }
    }

    pub fn from_settings(backend: &BackendSettings, api_key: impl Into<String>) -> Self {
        Self::new(backend.rest_url(MESSAGES_TABLE), api_key)
    }

    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn request(&self, method: reqwest::Method) -> reqwest::RequestBuilder {
        self.client
            .request(method, &self.endpoint)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }
}

#[async_trait]
impl MessageRepository for RestMessageRepository {
    async fn fetch_all(&self, identity: &Identity) -> Result<Vec<ChatMessage>> {
        let response = self
            .request(reqwest::Method::GET)
            .query(&[
                ("select", SELECT_COLUMNS.to_string()),
                ("user_id", user_filter(identity)),
                ("order", "created_at.asc".to_string()),
            ])
            .send()
            .await?;

        let rows: Vec<MessageRow> = ensure_success(response).await?.json().await?;
        Ok(rows.into_iter().map(ChatMessage::from).collect())
    }

    async fn insert(&self, identity: &Identity, message: &ChatMessage) -> Result<ChatMessage> {
        let row = NewMessageRow {
            user_id: &identity.id,
            role: message.role,
            content: &message.content,
        };

        let response = self
            .request(reqwest::Method::POST)
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;

        let mut rows: Vec<MessageRow> = ensure_success(response).await?.json().await?;
        if rows.is_empty() {
            return Err(ShowcaseError::internal(
                "Insert returned no representation",
            ));
        }
        Ok(rows.swap_remove(0).into())
    }

    async fn delete_all(&self, identity: &Identity) -> Result<()> {
        let response = self
            .request(reqwest::Method::DELETE)
            .query(&[("user_id", user_filter(identity))])
            .send()
            .await?;

        ensure_success(response).await?;
        Ok(())
    }
}

fn user_filter(identity: &Identity) -> String {
    format!("eq.{}", identity.id)
}

async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error body".to_string());
    tracing::warn!("[RestMessageRepository] {} returned {}: {}", MESSAGES_TABLE, status, body);
    Err(ShowcaseError::from_status(status.as_u16(), body))
}

#[derive(Serialize)]
struct NewMessageRow<'a> {
    user_id: &'a str,
    role: MessageRole,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessageRow {
    id: String,
    role: MessageRole,
    content: String,
    created_at: String,
}

impl From<MessageRow> for ChatMessage {
    fn from(row: MessageRow) -> Self {
        ChatMessage {
            id: Some(row.id),
            role: row.role,
            content: row.content,
            created_at: Some(row.created_at),
        }
    }
}
