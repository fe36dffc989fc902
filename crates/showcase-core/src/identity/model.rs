use serde::{Deserialize, Serialize};

/// An authenticated user as seen by the chat feature.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// Stable user identifier; every stored message is keyed by it.
    pub id: String,
    /// Optional contact address, used for display only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl Identity {
    /// Creates an identity with no email.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
        }
    }

    /// Attaches an email address.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Returns the email if present, the id otherwise.
    pub fn display_name(&self) -> &str {
        self.email.as_deref().unwrap_or(&self.id)
    }
}
