//! Conversation data model: messages and the ordered message list

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Author of a message, serialized to the wire role names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Wire name for the role
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// One entry in a conversation.
///
/// Created on user input or assistant reply, mutated at most once (a pending
/// voice message is resolved when its transcription arrives), and removed
/// entirely if the turn fails before completion. Never edited after settling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier, generated at creation
    pub id: Uuid,

    /// Author role
    pub role: Role,

    /// Textual content; empty only while a transcription is pending
    pub content: String,

    /// Creation timestamp
    pub timestamp: DateTime<Utc>,

    /// Locator of the audio artifact this message was spoken from, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<PathBuf>,

    /// True while the message is waiting for its transcription
    #[serde(default)]
    pub transcribing: bool,
}

impl Message {
    /// Create a settled user message from typed text
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::User,
            content: content.into(),
            timestamp: Utc::now(),
            audio: None,
            transcribing: false,
        }
    }

    /// Create a settled assistant message
    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
            audio: None,
            transcribing: false,
        }
    }

    /// Create a pending user message for a voice recording awaiting transcription
    #[must_use]
    pub fn pending_voice(audio: &Path) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::User,
            content: String::new(),
            timestamp: Utc::now(),
            audio: Some(audio.to_path_buf()),
            transcribing: true,
        }
    }

    /// True once the message will no longer change
    #[must_use]
    pub const fn is_settled(&self) -> bool {
        !self.transcribing
    }
}

/// Ordered sequence of messages for the active session.
///
/// Append-only, except for the single in-place transcription resolution and
/// the error-path removal of a pending message. Not persisted.
#[derive(Debug, Default)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resume a session from previously exchanged messages
    #[must_use]
    pub fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    #[must_use]
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Window of the most recent `n` messages, in original order
    #[must_use]
    pub fn recent(&self, n: usize) -> &[Message] {
        let start = self.messages.len().saturating_sub(n);
        &self.messages[start..]
    }

    /// Append a message to the end of the conversation
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Remove a message by id, returning it if it was present
    pub fn remove(&mut self, id: Uuid) -> Option<Message> {
        let index = self.messages.iter().position(|m| m.id == id)?;
        Some(self.messages.remove(index))
    }

    /// Fill in a pending message's transcription and clear its flag.
    ///
    /// The one permitted in-place mutation. Returns false when the message is
    /// missing or already settled, in which case nothing changes.
    pub fn resolve_transcription(&mut self, id: Uuid, text: &str) -> bool {
        match self.messages.iter_mut().find(|m| m.id == id) {
            Some(message) if message.transcribing => {
                message.content = text.to_string();
                message.transcribing = false;
                true
            }
            _ => false,
        }
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_preserves_order() {
        let mut conversation = Conversation::new();
        conversation.push(Message::user("first"));
        conversation.push(Message::assistant("second"));

        assert_eq!(conversation.len(), 2);
        assert_eq!(conversation.messages()[0].content, "first");
        assert_eq!(conversation.last().unwrap().content, "second");
    }

    #[test]
    fn remove_by_id() {
        let mut conversation = Conversation::new();
        let message = Message::user("hello");
        let id = message.id;
        conversation.push(message);

        let removed = conversation.remove(id).unwrap();
        assert_eq!(removed.content, "hello");
        assert!(conversation.is_empty());
        assert!(conversation.remove(id).is_none());
    }

    #[test]
    fn resolve_transcription_settles_pending() {
        let mut conversation = Conversation::new();
        let pending = Message::pending_voice(Path::new("/tmp/clip.wav"));
        let id = pending.id;
        assert!(!pending.is_settled());
        conversation.push(pending);

        assert!(conversation.resolve_transcription(id, "hello world"));
        let message = &conversation.messages()[0];
        assert_eq!(message.content, "hello world");
        assert!(message.is_settled());
        assert_eq!(message.audio.as_deref(), Some(Path::new("/tmp/clip.wav")));
    }

    #[test]
    fn resolve_transcription_rejects_settled() {
        let mut conversation = Conversation::new();
        let message = Message::user("typed");
        let id = message.id;
        conversation.push(message);

        assert!(!conversation.resolve_transcription(id, "overwrite"));
        assert_eq!(conversation.messages()[0].content, "typed");
    }

    #[test]
    fn recent_windows_from_the_end() {
        let mut conversation = Conversation::new();
        for i in 0..15 {
            conversation.push(Message::user(format!("m{i}")));
        }

        let window = conversation.recent(10);
        assert_eq!(window.len(), 10);
        assert_eq!(window[0].content, "m5");
        assert_eq!(window[9].content, "m14");

        // Window larger than the conversation returns everything
        assert_eq!(conversation.recent(100).len(), 15);
    }
}
