//! Top-level session wiring: one owner for the orchestrator and both audio
//! controllers
//!
//! Recording and playback share the device's audio route, so starting one
//! side tears down or rejects the other. All handles live in explicit fields
//! with construction and teardown tied to this struct's lifetime.

use std::time::Duration;

use uuid::Uuid;

use crate::audio::{PlaybackController, RecordingController};
use crate::chat::ChatClient;
use crate::config::Config;
use crate::conversation::Message;
use crate::orchestrator::Orchestrator;
use crate::transcription::TranscriptionClient;
use crate::{Error, Result};

/// A complete voice chat session: HTTP clients, conversation state, and the
/// local audio controllers.
pub struct VoiceChat {
    orchestrator: Orchestrator<TranscriptionClient, ChatClient>,
    recorder: RecordingController,
    player: PlaybackController,
}

impl VoiceChat {
    /// Build a session from configuration.
    ///
    /// A missing or malformed credential does not fail construction; every
    /// turn is gated on it instead, so the presentation layer can surface the
    /// configuration error in place.
    ///
    /// # Errors
    ///
    /// Returns error if the recording artifact directory cannot be created.
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            orchestrator: Orchestrator::new(
                TranscriptionClient::new(config),
                ChatClient::new(config),
            ),
            recorder: RecordingController::new()?,
            player: PlaybackController::new(),
        })
    }

    /// Start a microphone recording, tearing down any active playback
    /// session first (one active audio session at a time).
    ///
    /// # Errors
    ///
    /// Returns `Error::Recording` if a recording is already active and
    /// `Error::PermissionDenied` if the microphone is unavailable.
    pub fn start_recording(&mut self) -> Result<()> {
        self.player.stop();
        self.recorder.start()
    }

    /// Stop the recording and submit the artifact as a voice turn.
    ///
    /// A stop with no active recording is a no-op.
    ///
    /// # Errors
    ///
    /// Local encode failures surface as `Error::Recording` without touching
    /// the conversation; turn failures carry the failing stage's error.
    pub async fn finish_recording(&mut self) -> Result<()> {
        let Some(artifact) = self.recorder.stop()? else {
            return Ok(());
        };
        self.orchestrator.submit_voice_turn(&artifact.locator).await
    }

    /// Stop the recording and discard the captured audio
    pub fn cancel_recording(&mut self) {
        self.recorder.cancel();
    }

    /// Submit a typed turn.
    ///
    /// # Errors
    ///
    /// See [`Orchestrator::submit_text_turn`].
    pub async fn submit_text(&mut self, text: &str) -> Result<()> {
        self.orchestrator.submit_text_turn(text).await
    }

    /// Replay the audio artifact attached to a message.
    ///
    /// Rejected while a recording is active; the capture session owns the
    /// audio route.
    ///
    /// # Errors
    ///
    /// Returns `Error::Playback` if recording is active, the message is
    /// unknown, or it carries no audio.
    pub fn play_message_audio(&mut self, message_id: Uuid) -> Result<()> {
        if self.recorder.is_recording() {
            return Err(Error::Playback(
                "cannot start playback while recording".to_string(),
            ));
        }

        let locator = self
            .orchestrator
            .messages()
            .into_iter()
            .find(|m| m.id == message_id)
            .and_then(|m| m.audio)
            .ok_or_else(|| Error::Playback("message has no audio".to_string()))?;

        self.player.play(&locator)
    }

    /// Stop any active playback session
    pub fn stop_playback(&mut self) {
        self.player.stop();
    }

    /// Snapshot of the conversation, in append order
    #[must_use]
    pub fn messages(&self) -> Vec<Message> {
        self.orchestrator.messages()
    }

    /// True while a turn is in flight
    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.orchestrator.is_loading()
    }

    /// True while a capture session is active
    #[must_use]
    pub fn is_recording(&self) -> bool {
        self.recorder.is_recording()
    }

    /// Elapsed capture time of the active recording, for display
    #[must_use]
    pub fn recording_elapsed(&self) -> Option<Duration> {
        self.recorder.elapsed()
    }

    /// Access the recording controller, e.g. to attach lifecycle handlers
    pub fn recorder_mut(&mut self) -> &mut RecordingController {
        &mut self.recorder
    }
}
