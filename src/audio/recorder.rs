//! Microphone recording controller

use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};
use uuid::Uuid;

use super::{SAMPLE_RATE, write_wav};
use crate::{Error, Result};

/// Optional lifecycle notification hook
type Handler = Box<dyn Fn() + Send>;

/// Artifact produced when a recording stops
#[derive(Debug, Clone)]
pub struct RecordingArtifact {
    /// Locator of the encoded WAV file, owned by the controller's temp
    /// directory and valid for the controller's lifetime
    pub locator: PathBuf,

    /// Elapsed capture time
    pub duration: Duration,
}

/// Guard for the Idle -> Recording -> Idle state machine.
///
/// Kept free of device handles so the single-active-session rule is testable
/// without audio hardware.
#[derive(Debug, Default)]
struct RecordingGate {
    active: bool,
}

impl RecordingGate {
    /// Claim the recording slot; a second concurrent capture session is
    /// rejected rather than silently discarding the first.
    fn try_begin(&mut self) -> Result<()> {
        if self.active {
            return Err(Error::Recording("recording already in progress".to_string()));
        }
        self.active = true;
        Ok(())
    }

    /// Release the slot; returns whether it was held
    fn finish(&mut self) -> bool {
        std::mem::take(&mut self.active)
    }

    const fn is_active(&self) -> bool {
        self.active
    }
}

/// Records from the default input device into a WAV artifact.
///
/// State machine: `Idle -> Recording -> Idle`, with the artifact produced on
/// the stop transition. Exactly one capture session may exist at a time.
pub struct RecordingController {
    gate: RecordingGate,
    buffer: Arc<Mutex<Vec<f32>>>,
    stream: Option<Stream>,
    sample_rate: u32,
    started_at: Option<Instant>,
    out_dir: tempfile::TempDir,
    on_start: Option<Handler>,
    on_stop: Option<Handler>,
}

impl RecordingController {
    /// Create a new recording controller.
    ///
    /// The capture device is opened lazily on [`Self::start`]; construction
    /// only claims a temp directory for artifacts.
    ///
    /// # Errors
    ///
    /// Returns error if the artifact directory cannot be created.
    pub fn new() -> Result<Self> {
        let out_dir = tempfile::Builder::new().prefix("parley-rec-").tempdir()?;

        Ok(Self {
            gate: RecordingGate::default(),
            buffer: Arc::new(Mutex::new(Vec::new())),
            stream: None,
            sample_rate: SAMPLE_RATE,
            started_at: None,
            out_dir,
            on_start: None,
            on_stop: None,
        })
    }

    /// Handler invoked when capture starts
    pub fn set_on_start(&mut self, handler: impl Fn() + Send + 'static) {
        self.on_start = Some(Box::new(handler));
    }

    /// Handler invoked when capture stops
    pub fn set_on_stop(&mut self, handler: impl Fn() + Send + 'static) {
        self.on_stop = Some(Box::new(handler));
    }

    /// Start capturing from the default input device.
    ///
    /// # Errors
    ///
    /// Returns `Error::Recording` if a capture session is already active,
    /// `Error::PermissionDenied` if the microphone is unavailable or access
    /// was refused, and `Error::Recording` for other device failures.
    pub fn start(&mut self) -> Result<()> {
        self.gate.try_begin()?;

        let stream = match self.open_stream() {
            Ok(stream) => stream,
            Err(e) => {
                self.gate.finish();
                return Err(e);
            }
        };

        if let Ok(mut buffer) = self.buffer.lock() {
            buffer.clear();
        }
        self.stream = Some(stream);
        self.started_at = Some(Instant::now());
        tracing::debug!(sample_rate = self.sample_rate, "recording started");

        if let Some(handler) = &self.on_start {
            handler();
        }
        Ok(())
    }

    /// Stop capturing and encode the artifact.
    ///
    /// No-op returning `Ok(None)` while idle.
    ///
    /// # Errors
    ///
    /// Returns `Error::Recording` if the artifact cannot be encoded.
    pub fn stop(&mut self) -> Result<Option<RecordingArtifact>> {
        if !self.gate.is_active() {
            return Ok(None);
        }

        let duration = self.teardown_session();
        let samples = self
            .buffer
            .lock()
            .map(|mut buffer| std::mem::take(&mut *buffer))
            .unwrap_or_default();

        let locator = self
            .out_dir
            .path()
            .join(format!("recording-{}.wav", Uuid::new_v4()));
        write_wav(&locator, &samples, self.sample_rate)?;

        tracing::info!(
            path = %locator.display(),
            samples = samples.len(),
            duration_ms = duration.as_millis(),
            "recording stopped"
        );

        if let Some(handler) = &self.on_stop {
            handler();
        }
        Ok(Some(RecordingArtifact { locator, duration }))
    }

    /// Stop capturing and discard the buffered audio without producing an
    /// artifact
    pub fn cancel(&mut self) {
        if !self.gate.is_active() {
            return;
        }
        self.teardown_session();
        if let Ok(mut buffer) = self.buffer.lock() {
            buffer.clear();
        }
        tracing::debug!("recording cancelled");
    }

    /// True while a capture session is active
    #[must_use]
    pub const fn is_recording(&self) -> bool {
        self.gate.is_active()
    }

    /// Elapsed capture time, for display only
    #[must_use]
    pub fn elapsed(&self) -> Option<Duration> {
        self.started_at.map(|t| t.elapsed())
    }

    /// Release the stream and the gate, returning the elapsed capture time
    fn teardown_session(&mut self) -> Duration {
        if let Some(stream) = self.stream.take() {
            drop(stream);
        }
        self.gate.finish();
        self.started_at.take().map(|t| t.elapsed()).unwrap_or_default()
    }

    /// Open the default input device and start the capture stream
    fn open_stream(&mut self) -> Result<Stream> {
        let host = cpal::default_host();

        let device = host.default_input_device().ok_or_else(|| {
            Error::PermissionDenied("microphone unavailable or access refused".to_string())
        })?;

        let supported_config = device
            .supported_input_configs()
            .map_err(|e| Error::Recording(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(SAMPLE_RATE)
            })
            .ok_or_else(|| Error::Recording("no suitable input config found".to_string()))?;

        let config: StreamConfig = supported_config
            .with_sample_rate(SampleRate(SAMPLE_RATE))
            .config();
        self.sample_rate = config.sample_rate.0;

        let buffer = Arc::clone(&self.buffer);
        let stream = device
            .build_input_stream(
                &config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut buf) = buffer.lock() {
                        buf.extend_from_slice(data);
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| match e {
                cpal::BuildStreamError::DeviceNotAvailable => Error::PermissionDenied(
                    "microphone unavailable or access refused".to_string(),
                ),
                other => Error::Recording(other.to_string()),
            })?;

        stream
            .play()
            .map_err(|e| Error::Recording(e.to_string()))?;

        Ok(stream)
    }
}
