//! Configuration model.
//!
//! These types mirror `config.toml` and `secret.json`. Loading them from
//! disk is the job of `showcase-infrastructure`.

use serde::{Deserialize, Serialize};

/// Default backend base URL (a locally running backend).
pub const DEFAULT_BASE_URL: &str = "http://localhost:54321";
/// Default cap on buffered-but-unparsed stream text.
pub const DEFAULT_MAX_BUFFER_BYTES: usize = 1024 * 1024;
/// Default number of chunk arrivals a malformed frame may be retried on.
pub const DEFAULT_MAX_FRAME_RETRIES: u32 = 4;
/// Default time allowed to establish a connection to the backend.
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// Default longest gap between two reads of a streaming reply.
pub const DEFAULT_STREAM_IDLE_TIMEOUT_SECS: u64 = 60;
/// Default whole-request timeout for one-shot generation calls.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct ConfigRoot {
    #[serde(default)]
    pub backend: BackendSettings,
    #[serde(default)]
    pub chat: ChatSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub identity: Option<IdentitySettings>,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Where the backend-as-a-service lives.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct BackendSettings {
    pub base_url: String,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl BackendSettings {
    /// URL of a serverless function, e.g. `functions_url("chat")`.
    pub fn functions_url(&self, function: &str) -> String {
        format!("{}/functions/v1/{}", self.base_url.trim_end_matches('/'), function)
    }

    /// URL of a table in the REST data API.
    pub fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url.trim_end_matches('/'), table)
    }
}

/// Limits applied to the function clients.
///
/// A streaming reply has no overall deadline: it may run as long as chunks
/// keep arriving within `stream_idle_timeout_secs`. `request_timeout_secs`
/// bounds the one-shot generation calls only.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct ChatSettings {
    pub max_buffer_bytes: usize,
    pub max_frame_retries: u32,
    pub connect_timeout_secs: u64,
    pub stream_idle_timeout_secs: u64,
    pub request_timeout_secs: u64,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            max_buffer_bytes: DEFAULT_MAX_BUFFER_BYTES,
            max_frame_retries: DEFAULT_MAX_FRAME_RETRIES,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            stream_idle_timeout_secs: DEFAULT_STREAM_IDLE_TIMEOUT_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
        }
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// TOML files under the local data directory.
    #[default]
    Local,
    /// The backend's REST data API.
    Remote,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct StorageSettings {
    #[serde(default)]
    pub kind: StorageKind,
}

/// Identity configured for this installation.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct IdentitySettings {
    pub user_id: String,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Contents of `secret.json`.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
pub struct SecretConfig {
    #[serde(default)]
    pub backend: Option<BackendSecret>,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct BackendSecret {
    /// Publishable (anon) key sent as bearer token and `apikey` header.
    pub publishable_key: String,
}
