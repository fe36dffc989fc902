//! ChatSession - one identity's live conversation.
//!
//! Drives the `ConversationStore` with history loads, streamed replies and
//! clears, and mirrors the results to durable storage through the
//! `PersistenceBridge`.
//!
//! # Concurrency
//!
//! - The store sits behind a `std::sync::Mutex` that is never held across
//!   an await.
//! - `send_lock` serializes send, history loads and clear: `send` only
//!   `try_lock`s (a busy session makes it a no-op), `load_history` and
//!   `clear` cancel the in-flight send and then wait for the lock.
//! - Ending the session drops the conversation from memory.
//! - Every send runs under a child of the session's `CancellationToken`.
//!   Dropping the session cancels the token through a `DropGuard`.

use super::bridge::PersistenceBridge;
use super::event::ChatEvent;
use futures::StreamExt;
use showcase_core::chat::{
    ChatMessage, ChatTransport, ConversationStore, MessageRepository, SendPhase,
};
use showcase_core::error::{Result, ShowcaseError};
use showcase_core::identity::{Identity, IdentityProvider};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::{CancellationToken, DropGuard};

pub struct ChatSession {
    identity: Identity,
    identity_provider: Arc<dyn IdentityProvider>,
    transport: Arc<dyn ChatTransport>,
    bridge: PersistenceBridge,
    store: Mutex<ConversationStore>,
    send_lock: tokio::sync::Mutex<()>,
    session_token: CancellationToken,
    current_send: Mutex<Option<CancellationToken>>,
    events: Option<UnboundedSender<ChatEvent>>,
    _cancel_on_drop: DropGuard,
}

impl ChatSession {
    /// Opens a session for the provider's current identity.
    ///
    /// History is not loaded yet; call [`load_history`](Self::load_history).
    ///
    /// # Errors
    ///
    /// `Unauthenticated` when nobody is signed in.
    pub fn open(
        identity_provider: Arc<dyn IdentityProvider>,
        transport: Arc<dyn ChatTransport>,
        repository: Arc<dyn MessageRepository>,
    ) -> Result<Self> {
        let identity = identity_provider
            .current_identity()
            .ok_or(ShowcaseError::Unauthenticated)?;
        let session_token = CancellationToken::new();

        tracing::info!(
            "[ChatSession] Opened session for {}",
            identity.display_name()
        );

        Ok(Self {
            identity,
            identity_provider,
            transport,
            bridge: PersistenceBridge::new(repository),
            store: Mutex::new(ConversationStore::new()),
            send_lock: tokio::sync::Mutex::new(()),
            _cancel_on_drop: session_token.clone().drop_guard(),
            session_token,
            current_send: Mutex::new(None),
            events: None,
        })
    }

    /// Publishes [`ChatEvent`]s to `sender` from now on.
    pub fn with_event_sender(mut self, sender: UnboundedSender<ChatEvent>) -> Self {
        self.events = Some(sender);
        self
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    /// Snapshot of the conversation, oldest first.
    pub fn messages(&self) -> Vec<ChatMessage> {
        self.lock_store().messages().to_vec()
    }

    pub fn phase(&self) -> SendPhase {
        self.lock_store().phase()
    }

    pub fn is_sending(&self) -> bool {
        self.lock_store().is_sending()
    }

    /// Whether [`end`](Self::end) was called (or the identity went away).
    pub fn is_ended(&self) -> bool {
        self.session_token.is_cancelled()
    }

    /// A token cancelled when this session ends or is dropped.
    pub fn child_token(&self) -> CancellationToken {
        self.session_token.child_token()
    }

    /// Replaces the conversation with the durable history.
    ///
    /// Like [`clear`](Self::clear), an in-flight send is cancelled and rolled
    /// back first. Returns the number of loaded messages.
    ///
    /// # Errors
    ///
    /// `Load` when storage fails; the session stays usable with an empty
    /// conversation.
    pub async fn load_history(&self) -> Result<usize> {
        self.ensure_active()?;

        if self.cancel_current() {
            tracing::debug!("[ChatSession] Cancelled in-flight send before reloading");
        }
        let _send_guard = self.send_lock.lock().await;

        let (history, outcome) = match self.bridge.fetch_all(&self.identity).await {
            Ok(history) => {
                let count = history.len();
                tracing::info!("[ChatSession] Loaded {} messages", count);
                (history, Ok(count))
            }
            Err(err) => {
                tracing::error!("[ChatSession] {}", err);
                (Vec::new(), Err(err))
            }
        };

        // The session may have ended while the fetch was pending
        self.ensure_active()?;
        self.lock_store().replace_history(history);
        outcome
    }

    /// Sends `text` and streams the reply into the conversation.
    ///
    /// Returns `Ok(None)` without doing anything when `text` is blank or a
    /// send is already in flight. On success returns the finalized assistant
    /// message, or `None` for an empty reply. Persisted messages carry their
    /// durable `id` and `created_at`, in memory as well.
    ///
    /// # Errors
    ///
    /// Transport failures and `Cancelled` roll the send back (placeholder
    /// and any empty messages removed) and are returned. `Unauthenticated`
    /// or `Cancelled` are returned up front when the session is over.
    pub async fn send(&self, text: &str) -> Result<Option<ChatMessage>> {
        self.ensure_active()?;

        let Ok(_send_guard) = self.send_lock.try_lock() else {
            tracing::debug!("[ChatSession] Send ignored: another operation is in flight");
            return Ok(None);
        };

        // Token is visible before the store reports Sending
        let token = self.session_token.child_token();
        *self.lock_current_send() = Some(token.clone());

        let Some(pending) = self.lock_store().begin_send(text) else {
            self.lock_current_send().take();
            tracing::debug!("[ChatSession] Send ignored: blank input or already sending");
            return Ok(None);
        };

        self.persist_and_record(&pending.user_message).await;

        let outcome = self.stream_reply(&pending.context, &token).await;
        self.lock_current_send().take();

        match outcome {
            Ok(()) => {
                let finalized = self.lock_store().on_stream_end();
                self.emit(ChatEvent::Completed(finalized.clone()));
                match finalized {
                    Some(message) => Ok(Some(
                        self.persist_and_record(&message).await.unwrap_or(message),
                    )),
                    None => Ok(None),
                }
            }
            Err(err) => {
                self.lock_store().on_stream_error();
                if err.is_cancelled() {
                    tracing::info!("[ChatSession] Send cancelled");
                } else {
                    tracing::warn!("[ChatSession] Send failed: {}", err);
                }
                self.emit(ChatEvent::failed(err.clone()));
                Err(err)
            }
        }
    }

    /// Persists `message` and copies its durable id onto the in-memory entry.
    async fn persist_and_record(&self, message: &ChatMessage) -> Option<ChatMessage> {
        let stored = self.bridge.persist(&self.identity, message).await?;
        self.lock_store().record_stored(&stored);
        Some(stored)
    }

    async fn stream_reply(&self, context: &[ChatMessage], token: &CancellationToken) -> Result<()> {
        let mut stream = tokio::select! {
            biased;
            _ = token.cancelled() => return Err(ShowcaseError::Cancelled),
            opened = self.transport.open_stream(context) => opened?,
        };

        loop {
            let next = tokio::select! {
                biased;
                _ = token.cancelled() => return Err(ShowcaseError::Cancelled),
                next = stream.next() => next,
            };

            match next {
                Some(Ok(fragment)) => {
                    if self.lock_store().on_fragment(&fragment) {
                        self.emit(ChatEvent::Fragment(fragment));
                    }
                }
                Some(Err(err)) => return Err(err),
                None => return Ok(()),
            }
        }
    }

    /// Cancels the in-flight send, if any. Returns whether one was running.
    pub fn cancel_current(&self) -> bool {
        match self.lock_current_send().as_ref() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Deletes the whole conversation, durably first.
    ///
    /// An in-flight send is cancelled and rolled back before the deletion.
    ///
    /// # Errors
    ///
    /// `Clear` when storage fails; the in-memory conversation is then left
    /// untouched.
    pub async fn clear(&self) -> Result<()> {
        self.ensure_active()?;

        if self.cancel_current() {
            tracing::debug!("[ChatSession] Cancelled in-flight send before clearing");
        }
        let _send_guard = self.send_lock.lock().await;

        if let Err(err) = self.bridge.delete_all(&self.identity).await {
            tracing::error!("[ChatSession] {}", err);
            return Err(err);
        }

        self.lock_store().clear();
        self.emit(ChatEvent::Cleared);
        tracing::info!("[ChatSession] Conversation cleared");
        Ok(())
    }

    /// Ends the session: cancels everything in flight, drops the
    /// conversation from memory and refuses further operations.
    ///
    /// Durable storage is left untouched.
    pub fn end(&self) {
        if !self.session_token.is_cancelled() {
            tracing::info!(
                "[ChatSession] Ending session for {}",
                self.identity.display_name()
            );
        }
        self.session_token.cancel();
        self.lock_store().clear();
    }

    /// Checks the session is still bound to the current identity.
    ///
    /// A missing or different identity ends the session.
    fn ensure_active(&self) -> Result<()> {
        if self.session_token.is_cancelled() {
            return Err(ShowcaseError::Cancelled);
        }

        match self.identity_provider.current_identity() {
            Some(current) if current == self.identity => Ok(()),
            _ => {
                tracing::warn!("[ChatSession] Identity no longer available");
                self.end();
                Err(ShowcaseError::Unauthenticated)
            }
        }
    }

    fn emit(&self, event: ChatEvent) {
        if let Some(sender) = &self.events {
            // A closed receiver only means nobody is listening
            let _ = sender.send(event);
        }
    }

    fn lock_store(&self) -> MutexGuard<'_, ConversationStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_current_send(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.current_send
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatSession")
            .field("identity", &self.identity)
            .field("phase", &self.phase())
            .field("ended", &self.is_ended())
            .finish_non_exhaustive()
    }
}
