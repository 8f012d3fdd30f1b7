//! Conversation orchestration: turn sequencing, the loading latch, and
//! rollback on failure
//!
//! A turn is one user input (typed or spoken) paired with the resulting
//! assistant reply. The orchestrator owns the message list and the latch as
//! explicit fields; nothing here is ambient state.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use crate::chat::{ChatClient, ChatResponse, HISTORY_WINDOW};
use crate::conversation::{Conversation, Message};
use crate::transcription::{TranscriptionClient, TranscriptionResult};
use crate::{Error, Result};

/// Speech-to-text seam, implemented by [`TranscriptionClient`]
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe the audio artifact at `locator`
    async fn transcribe(&self, locator: &Path) -> Result<TranscriptionResult>;

    /// True iff the client holds a plausible credential
    fn is_configured(&self) -> bool;
}

/// Chat completion seam, implemented by [`ChatClient`]
#[async_trait]
pub trait ChatCompleter: Send + Sync {
    /// Complete `user_text` given the trailing conversation history
    async fn complete(&self, user_text: &str, history: &[Message]) -> Result<ChatResponse>;

    /// True iff the client holds a plausible credential
    fn is_configured(&self) -> bool;
}

#[async_trait]
impl Transcriber for TranscriptionClient {
    async fn transcribe(&self, locator: &Path) -> Result<TranscriptionResult> {
        Self::transcribe(self, locator).await
    }

    fn is_configured(&self) -> bool {
        Self::is_configured(self)
    }
}

#[async_trait]
impl ChatCompleter for ChatClient {
    async fn complete(&self, user_text: &str, history: &[Message]) -> Result<ChatResponse> {
        Self::complete(self, user_text, history).await
    }

    fn is_configured(&self) -> bool {
        Self::is_configured(self)
    }
}

/// Which input surface a turn came from, for user-facing error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnKind {
    Voice,
    Text,
}

/// Fixed-prefix, human-readable failure message for the presentation layer.
///
/// Every turn-internal failure surfaces exactly once through this; nothing is
/// retried automatically.
#[must_use]
pub fn user_facing_message(kind: TurnKind, error: &Error) -> String {
    match kind {
        TurnKind::Voice => format!("Failed to process voice message: {error}"),
        TurnKind::Text => format!("Failed to process text message: {error}"),
    }
}

/// Conversation state guarded by one short-lived lock.
///
/// The lock is never held across a suspension point; it exists so the latch
/// can gate re-entrant submissions from a shared handle, which is how the
/// presentation layer drives this type.
struct Inner {
    conversation: Conversation,
    loading: bool,
}

/// Sequences recording/typing → transcription → chat completion → message-list
/// update, with rollback on failure.
pub struct Orchestrator<T, C> {
    transcriber: T,
    chat: C,
    inner: Mutex<Inner>,
}

impl<T: Transcriber, C: ChatCompleter> Orchestrator<T, C> {
    /// Create an orchestrator with an empty conversation
    pub fn new(transcriber: T, chat: C) -> Self {
        Self::with_history(transcriber, chat, Vec::new())
    }

    /// Create an orchestrator resuming a prior session's messages
    pub fn with_history(transcriber: T, chat: C, messages: Vec<Message>) -> Self {
        Self {
            transcriber,
            chat,
            inner: Mutex::new(Inner {
                conversation: Conversation::from_messages(messages),
                loading: false,
            }),
        }
    }

    /// The speech-to-text client
    #[must_use]
    pub fn transcriber(&self) -> &T {
        &self.transcriber
    }

    /// The chat completion client
    #[must_use]
    pub fn chat(&self) -> &C {
        &self.chat
    }

    /// Snapshot of the current message list, in append order
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.inner().conversation.messages().to_vec()
    }

    /// Number of messages in the conversation
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner().conversation.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner().conversation.is_empty()
    }

    /// True while a turn is in flight; gates new submissions and should
    /// disable the input surface
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner().loading
    }

    /// Submit a voice turn for the recording at `locator`.
    ///
    /// Appends a pending user message, transcribes, resolves the message in
    /// place, then requests the assistant reply. On any failure the pending
    /// message is removed: the conversation never settles with an unresolved
    /// pending entry.
    ///
    /// # Errors
    ///
    /// `Error::TurnInProgress` when the latch is held, `Error::Config` when
    /// the credential is missing or malformed, `Error::EmptyTranscription`
    /// when speech produced no usable text, and any transcription/chat/
    /// transport error from the stage that failed.
    pub async fn submit_voice_turn(&self, locator: &Path) -> Result<()> {
        self.begin_turn()?;
        let result = self.run_voice_turn(locator).await;
        self.settle_turn(TurnKind::Voice, &result);
        result
    }

    /// Submit a typed turn. Same contract as [`Self::submit_voice_turn`]
    /// minus the transcription stage; `text` is taken verbatim (the caller
    /// disables send on blank input).
    ///
    /// # Errors
    ///
    /// `Error::TurnInProgress`, `Error::Config`, and any chat/transport error.
    pub async fn submit_text_turn(&self, text: &str) -> Result<()> {
        self.begin_turn()?;
        let result = self.run_text_turn(text).await;
        self.settle_turn(TurnKind::Text, &result);
        result
    }

    async fn run_voice_turn(&self, locator: &Path) -> Result<()> {
        // History is snapshotted as of turn start; the pending message itself
        // is never part of what the chat call sees.
        let (history, pending_id) = {
            let mut inner = self.inner();
            let history = inner.conversation.recent(HISTORY_WINDOW).to_vec();
            let pending = Message::pending_voice(locator);
            let id = pending.id;
            inner.conversation.push(pending);
            (history, id)
        };

        // Transcription strictly precedes the chat call within a turn
        let text = match self.transcriber.transcribe(locator).await {
            Ok(result) => {
                let text = result.text.trim().to_string();
                if text.is_empty() {
                    self.rollback(pending_id);
                    return Err(Error::EmptyTranscription);
                }
                text
            }
            Err(e) => {
                self.rollback(pending_id);
                return Err(e);
            }
        };

        if !self.inner().conversation.resolve_transcription(pending_id, &text) {
            tracing::warn!(id = %pending_id, "pending message missing at transcription resolution");
        }

        match self.chat.complete(&text, &history).await {
            Ok(response) => {
                self.inner().conversation.push(Message::assistant(response.message));
                Ok(())
            }
            Err(e) => {
                // The transcribed user message rolls back too
                self.rollback(pending_id);
                Err(e)
            }
        }
    }

    async fn run_text_turn(&self, text: &str) -> Result<()> {
        let (history, user_id) = {
            let mut inner = self.inner();
            let history = inner.conversation.recent(HISTORY_WINDOW).to_vec();
            let user = Message::user(text);
            let id = user.id;
            inner.conversation.push(user);
            (history, id)
        };

        match self.chat.complete(text, &history).await {
            Ok(response) => {
                self.inner().conversation.push(Message::assistant(response.message));
                Ok(())
            }
            Err(e) => {
                self.rollback(user_id);
                Err(e)
            }
        }
    }

    /// Gate a new turn: latch first, then the configuration check, both
    /// before any network call.
    fn begin_turn(&self) -> Result<()> {
        let mut inner = self.inner();
        if inner.loading {
            return Err(Error::TurnInProgress);
        }
        if !self.transcriber.is_configured() || !self.chat.is_configured() {
            return Err(Error::Config(
                "API credential is missing or malformed; set OPENAI_API_KEY".to_string(),
            ));
        }
        inner.loading = true;
        Ok(())
    }

    /// Release the latch on every settle path, success or failure
    fn settle_turn(&self, kind: TurnKind, result: &Result<()>) {
        self.inner().loading = false;
        match result {
            Ok(()) => tracing::debug!(kind = ?kind, "turn complete"),
            Err(e) => tracing::warn!(kind = ?kind, error = %e, "turn failed"),
        }
    }

    fn rollback(&self, id: uuid::Uuid) {
        if self.inner().conversation.remove(id).is_some() {
            tracing::debug!(id = %id, "rolled back pending message");
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
