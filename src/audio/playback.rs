//! Audio artifact playback controller

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};

use super::{AudioClip, read_wav};
use crate::{Error, Result};

/// One playback session: the native handle plus its completion flag.
///
/// Generic over the handle so replacement semantics stay testable without
/// audio hardware.
struct SessionSlot<H> {
    #[allow(dead_code)]
    handle: H,
    finished: Arc<AtomicBool>,
}

impl<H> SessionSlot<H> {
    fn new(handle: H, finished: Arc<AtomicBool>) -> Self {
        Self { handle, finished }
    }

    /// True once the output callback has exhausted the clip
    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }
}

/// Plays WAV artifacts on the default output device.
///
/// At most one playback session exists system-wide: starting a new one
/// releases the previous session first. The output callback marks natural
/// completion; the finished handle is reclaimed at the next interaction and
/// unconditionally on [`Self::stop`] and drop.
pub struct PlaybackController {
    session: Option<SessionSlot<Stream>>,
}

impl Default for PlaybackController {
    fn default() -> Self {
        Self::new()
    }
}

impl PlaybackController {
    /// Create a playback controller; the output device is opened per session
    #[must_use]
    pub const fn new() -> Self {
        Self { session: None }
    }

    /// Play the WAV artifact at `locator`, tearing down any active session
    /// first.
    ///
    /// # Errors
    ///
    /// Returns `Error::Playback` if the artifact cannot be decoded or the
    /// output device cannot be opened.
    pub fn play(&mut self, locator: &Path) -> Result<()> {
        // At most one concurrent playback session
        self.stop();

        let clip = read_wav(locator)?;
        tracing::debug!(
            path = %locator.display(),
            samples = clip.samples.len(),
            sample_rate = clip.sample_rate,
            "starting playback"
        );

        if clip.is_empty() {
            return Ok(());
        }

        let (stream, finished) = open_output_stream(clip)?;
        self.session = Some(SessionSlot::new(stream, finished));
        Ok(())
    }

    /// Stop and release the current session, if any
    pub fn stop(&mut self) {
        if let Some(session) = self.session.take() {
            drop(session);
            tracing::debug!("playback session released");
        }
    }

    /// True while a session is active.
    ///
    /// Reclaims a naturally-finished session's handle before reporting.
    pub fn is_playing(&mut self) -> bool {
        if self
            .session
            .as_ref()
            .is_some_and(SessionSlot::is_finished)
        {
            self.session = None;
            tracing::debug!("playback finished, session released");
        }
        self.session.is_some()
    }
}

// A still-open native handle must not outlive the owning scope.
impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Open the default output device and start a stream feeding `clip`.
///
/// Returns the stream handle and the completion flag the output callback
/// flips once the clip is exhausted.
fn open_output_stream(clip: AudioClip) -> Result<(Stream, Arc<AtomicBool>)> {
    let host = cpal::default_host();

    let device = host
        .default_output_device()
        .ok_or_else(|| Error::Playback("no output device available".to_string()))?;

    let wants_channels = clip.channels;
    let rate = SampleRate(clip.sample_rate);

    let supported_config = device
        .supported_output_configs()
        .map_err(|e| Error::Playback(e.to_string()))?
        .find(|c| {
            c.channels() == wants_channels && c.min_sample_rate() <= rate && c.max_sample_rate() >= rate
        })
        .or_else(|| {
            // Fallback: spread a mono clip across a stereo device
            if wants_channels == 1 {
                device.supported_output_configs().ok()?.find(|c| {
                    c.channels() == 2 && c.min_sample_rate() <= rate && c.max_sample_rate() >= rate
                })
            } else {
                None
            }
        })
        .ok_or_else(|| Error::Playback("no suitable output config found".to_string()))?;

    let config: StreamConfig = supported_config.with_sample_rate(rate).config();
    let out_channels = config.channels as usize;
    let src_channels = clip.channels as usize;

    let finished = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&finished);
    let samples = clip.samples;
    let mut pos = 0usize;

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                for frame in data.chunks_mut(out_channels) {
                    if pos >= samples.len() {
                        flag.store(true, Ordering::Relaxed);
                        frame.fill(0.0);
                        continue;
                    }
                    if src_channels == out_channels {
                        for out in frame.iter_mut() {
                            if pos < samples.len() {
                                *out = samples[pos];
                                pos += 1;
                            } else {
                                flag.store(true, Ordering::Relaxed);
                                *out = 0.0;
                            }
                        }
                    } else {
                        // Mono source on a multi-channel device
                        let sample = samples[pos];
                        pos += 1;
                        frame.fill(sample);
                    }
                }
            },
            |err| {
                tracing::error!(error = %err, "audio playback error");
            },
            None,
        )
        .map_err(|e| Error::Playback(e.to_string()))?;

    stream.play().map_err(|e| Error::Playback(e.to_string()))?;

    Ok((stream, finished))
}
