//! In-memory conversation state.
//!
//! `ConversationStore` owns the ordered message sequence of the active
//! session and the single-flight send guard. It performs no I/O: the
//! application layer feeds it history, fragments and stream outcomes, and
//! mirrors what it hands back to durable storage.

use super::message::{ChatMessage, MessageRole};

/// Send state of a conversation.
///
/// Valid transitions are `Idle -> Sending` (accepted send) and
/// `Sending -> Idle` (stream ended, failed or was cancelled).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SendPhase {
    /// No reply is streaming; a send may start.
    #[default]
    Idle,
    /// A reply is streaming into the placeholder message.
    Sending,
}

/// An accepted send, ready to be handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSend {
    /// The user message appended to the conversation.
    pub user_message: ChatMessage,
    /// Everything before the placeholder, oldest first.
    pub context: Vec<ChatMessage>,
}

/// Ordered messages of one session plus the single-flight guard.
#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    messages: Vec<ChatMessage>,
    phase: SendPhase,
}

impl ConversationStore {
    /// Creates an empty, idle store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the messages in insertion order.
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Returns the current send phase.
    pub fn phase(&self) -> SendPhase {
        self.phase
    }

    pub fn is_sending(&self) -> bool {
        self.phase == SendPhase::Sending
    }

    /// Replaces the whole sequence with a freshly loaded history.
    ///
    /// The history is expected in creation order; it is taken as-is.
    /// Refused (returns false, nothing changes) while a send is in flight,
    /// since the placeholder would be lost.
    pub fn replace_history(&mut self, history: Vec<ChatMessage>) -> bool {
        if self.is_sending() {
            return false;
        }
        self.messages = history;
        true
    }

    /// Copies the durable `id` and `created_at` of a stored message onto the
    /// matching in-memory entry.
    ///
    /// The match is the most recent message without an id that has the same
    /// role and content. Returns false when there is none (e.g. the
    /// conversation was cleared meanwhile).
    pub fn record_stored(&mut self, stored: &ChatMessage) -> bool {
        let entry = self.messages.iter_mut().rev().find(|message| {
            message.id.is_none() && message.role == stored.role && message.content == stored.content
        });
        match entry {
            Some(entry) => {
                entry.id = stored.id.clone();
                entry.created_at = stored.created_at.clone();
                true
            }
            None => false,
        }
    }

    /// Accepts a user send, if allowed.
    ///
    /// Returns `None` (and changes nothing) when `text` is blank or a send
    /// is already in flight. Otherwise appends the user message and an empty
    /// assistant placeholder, switches to `Sending`, and returns the context
    /// for the transport.
    pub fn begin_send(&mut self, text: &str) -> Option<PendingSend> {
        if text.trim().is_empty() || self.is_sending() {
            return None;
        }

        let user_message = ChatMessage::user(text);
        self.messages.push(user_message.clone());
        let context = self.messages.clone();
        self.messages.push(ChatMessage::assistant(""));
        self.phase = SendPhase::Sending;

        Some(PendingSend {
            user_message,
            context,
        })
    }

    /// Appends a streamed fragment to the in-flight placeholder.
    ///
    /// Returns false when there is no placeholder to append to (no send in
    /// flight), in which case the fragment is dropped.
    pub fn on_fragment(&mut self, fragment: &str) -> bool {
        if !self.is_sending() {
            return false;
        }
        match self.messages.last_mut() {
            Some(last) if last.role == MessageRole::Assistant => {
                last.content.push_str(fragment);
                true
            }
            _ => false,
        }
    }

    /// Completes the in-flight send.
    ///
    /// Releases the single-flight guard. Returns the finalized assistant
    /// message to persist when it has content; an empty placeholder is
    /// removed instead and `None` is returned.
    pub fn on_stream_end(&mut self) -> Option<ChatMessage> {
        if !self.is_sending() {
            return None;
        }
        self.phase = SendPhase::Idle;

        match self.messages.last() {
            Some(last) if last.role == MessageRole::Assistant && !last.is_empty() => {
                Some(last.clone())
            }
            Some(last) if last.role == MessageRole::Assistant => {
                self.messages.pop();
                None
            }
            _ => None,
        }
    }

    /// Rolls back the in-flight send after a failure.
    ///
    /// Removes the placeholder together with every other empty message and
    /// releases the single-flight guard. Partial content that already
    /// streamed in is kept.
    pub fn on_stream_error(&mut self) {
        self.messages.retain(|message| !message.is_empty());
        self.phase = SendPhase::Idle;
    }

    /// Empties the in-memory sequence.
    ///
    /// Called only after the durable store confirmed the deletion.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.phase = SendPhase::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn contents(store: &ConversationStore) -> Vec<&str> {
        store.messages().iter().map(|m| m.content.as_str()).collect()
    }

    #[test]
    fn test_begin_send_appends_user_and_placeholder() {
        let mut store = ConversationStore::new();
        store.replace_history(vec![ChatMessage::user("hi"), ChatMessage::assistant("hello")]);

        let pending = store.begin_send("how are you?").expect("send accepted");

        assert_eq!(store.len(), 4);
        assert_eq!(store.phase(), SendPhase::Sending);
        assert_eq!(pending.context.len(), 3);
        assert_eq!(pending.context.last().unwrap().content, "how are you?");
        let last = store.messages().last().unwrap();
        assert_eq!(last.role, MessageRole::Assistant);
        assert!(last.is_empty());
    }

    #[test]
    fn test_blank_send_is_rejected() {
        let mut store = ConversationStore::new();
        assert!(store.begin_send("").is_none());
        assert!(store.begin_send("   \n\t").is_none());
        assert!(store.is_empty());
        assert_eq!(store.phase(), SendPhase::Idle);
    }

    #[test]
    fn test_send_while_sending_is_noop() {
        let mut store = ConversationStore::new();
        store.begin_send("first").unwrap();
        let len = store.len();

        assert!(store.begin_send("second").is_none());
        assert_eq!(store.len(), len);
        assert!(store.is_sending());
    }

    #[test]
    fn test_fragments_fill_placeholder_in_order() {
        let mut store = ConversationStore::new();
        store.begin_send("greet me").unwrap();

        assert!(store.on_fragment("Hel"));
        assert!(store.on_fragment("lo"));
        let finalized = store.on_stream_end().expect("non-empty reply");

        assert_eq!(finalized.content, "Hello");
        assert_eq!(finalized.role, MessageRole::Assistant);
        assert_eq!(contents(&store), vec!["greet me", "Hello"]);
        assert_eq!(store.phase(), SendPhase::Idle);
    }

    #[test]
    fn test_empty_completion_discards_placeholder() {
        let mut store = ConversationStore::new();
        store.begin_send("anyone?").unwrap();

        assert!(store.on_stream_end().is_none());
        assert_eq!(contents(&store), vec!["anyone?"]);
        assert!(!store.is_sending());
    }

    #[test]
    fn test_stream_error_rolls_back_placeholder() {
        let mut store = ConversationStore::new();
        store.begin_send("will fail").unwrap();

        store.on_stream_error();

        assert_eq!(contents(&store), vec!["will fail"]);
        assert_eq!(store.phase(), SendPhase::Idle);
        assert!(store.begin_send("retry").is_some());
    }

    #[test]
    fn test_stream_error_keeps_partial_reply() {
        let mut store = ConversationStore::new();
        store.begin_send("tell me").unwrap();
        store.on_fragment("partial");

        store.on_stream_error();

        assert_eq!(contents(&store), vec!["tell me", "partial"]);
    }

    #[test]
    fn test_fragment_without_send_is_dropped() {
        let mut store = ConversationStore::new();
        store.replace_history(vec![ChatMessage::assistant("old")]);

        assert!(!store.on_fragment("stray"));
        assert_eq!(contents(&store), vec!["old"]);
    }

    #[test]
    fn test_history_is_not_replaced_while_sending() {
        let mut store = ConversationStore::new();
        store.begin_send("hello").unwrap();

        assert!(!store.replace_history(vec![ChatMessage::assistant("old reply")]));
        assert!(store.on_fragment("Hi there"));

        let finalized = store.on_stream_end().expect("reply kept");
        assert_eq!(finalized.content, "Hi there");
        assert_eq!(contents(&store), vec!["hello", "Hi there"]);
    }

    #[test]
    fn test_record_stored_assigns_durable_identity() {
        let mut store = ConversationStore::new();
        store.replace_history(vec![ChatMessage::user("again")]);
        store.begin_send("again").unwrap();
        let stored = ChatMessage {
            id: Some("m7".to_string()),
            created_at: Some("2025-01-01T00:00:00.000000Z".to_string()),
            ..ChatMessage::user("again")
        };

        assert!(store.record_stored(&stored));

        // The newest unpersisted match is updated, the older one untouched
        assert_eq!(store.messages()[0].id, None);
        assert_eq!(store.messages()[1].id.as_deref(), Some("m7"));
        assert_eq!(
            store.messages()[1].created_at.as_deref(),
            Some("2025-01-01T00:00:00.000000Z")
        );
        assert!(!store.record_stored(&ChatMessage::user("never sent")));
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut store = ConversationStore::new();
        store.begin_send("bye").unwrap();
        store.clear();

        assert!(store.is_empty());
        assert_eq!(store.phase(), SendPhase::Idle);
    }
}
