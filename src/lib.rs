//! Parley - Voice and text conversation client for AI assistants
//!
//! This library owns the conversation orchestration flow for a voice chat
//! client: recording, transcription, chat completion, message-list updates,
//! and rollback on failure. Rendering, navigation, and permission prompting
//! are presentation concerns and stay outside.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                Presentation Layer                    │
//! │        message list │ input surface │ mode switch    │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │                    VoiceChat                         │
//! │   Orchestrator │ RecordingController │ Playback     │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │              Upstream HTTP endpoints                 │
//! │     audio/transcriptions │ chat/completions          │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod app;
pub mod audio;
pub mod chat;
pub mod config;
pub mod conversation;
pub mod error;
pub mod orchestrator;
pub mod transcription;

pub use app::VoiceChat;
pub use audio::{AudioClip, PlaybackController, RecordingArtifact, RecordingController};
pub use chat::{ChatClient, ChatResponse, CostEstimate, HISTORY_WINDOW, Usage};
pub use config::Config;
pub use conversation::{Conversation, Message, Role};
pub use error::{Error, Result};
pub use orchestrator::{ChatCompleter, Orchestrator, Transcriber, TurnKind, user_facing_message};
pub use transcription::{TranscriptionClient, TranscriptionResult};
