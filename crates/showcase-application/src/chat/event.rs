use showcase_core::chat::ChatMessage;
use showcase_core::error::ShowcaseError;

/// Notifications published by a `ChatSession` while it works.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    /// A fragment was appended to the streaming reply.
    Fragment(String),
    /// The reply finished. `None` when it carried no content and the
    /// placeholder was discarded.
    Completed(Option<ChatMessage>),
    /// The send failed and was rolled back. `notice` is the user-facing text.
    Failed { error: ShowcaseError, notice: String },
    /// The conversation was deleted.
    Cleared,
}

impl ChatEvent {
    pub(crate) fn failed(error: ShowcaseError) -> Self {
        let notice = error.user_message();
        ChatEvent::Failed { error, notice }
    }
}
