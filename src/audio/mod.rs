//! Local audio: microphone recording and artifact playback
//!
//! Recording produces a WAV artifact in a controller-owned temp directory;
//! playback consumes artifacts by locator. The two sides never hold native
//! sessions concurrently; the owning scope serializes them.

mod playback;
mod recorder;

pub use playback::PlaybackController;
pub use recorder::{RecordingArtifact, RecordingController};

use std::path::Path;
use std::time::Duration;

use crate::{Error, Result};

/// Sample rate for microphone capture (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16_000;

/// Decoded audio artifact
#[derive(Debug, Clone)]
pub struct AudioClip {
    /// Interleaved f32 samples
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioClip {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Playback duration of the clip
    #[must_use]
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 || self.channels == 0 {
            return Duration::ZERO;
        }
        let frames = self.samples.len() as u64 / u64::from(self.channels);
        Duration::from_secs_f64(frames as f64 / f64::from(self.sample_rate))
    }
}

/// Encode mono f32 samples as a 16-bit WAV file at `path`.
///
/// # Errors
///
/// Returns `Error::Recording` if encoding fails.
pub fn write_wav(path: &Path, samples: &[f32], sample_rate: u32) -> Result<()> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .map_err(|e| Error::Recording(format!("WAV encode error: {e}")))?;

    for &sample in samples {
        // Convert f32 [-1.0, 1.0] to i16
        #[allow(clippy::cast_possible_truncation)]
        let sample_i16 = (sample * 32767.0).clamp(-32768.0, 32767.0) as i16;
        writer
            .write_sample(sample_i16)
            .map_err(|e| Error::Recording(format!("WAV encode error: {e}")))?;
    }

    writer
        .finalize()
        .map_err(|e| Error::Recording(format!("WAV encode error: {e}")))?;

    Ok(())
}

/// Decode the WAV file at `path` into f32 samples.
///
/// # Errors
///
/// Returns `Error::Playback` if the file cannot be read or the format is
/// unsupported.
pub fn read_wav(path: &Path) -> Result<AudioClip> {
    let reader = hound::WavReader::open(path)
        .map_err(|e| Error::Playback(format!("WAV decode error: {e}")))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Int, 16) => reader
            .into_samples::<i16>()
            .map(|s| s.map(|v| f32::from(v) / 32768.0))
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::Playback(format!("WAV decode error: {e}")))?,
        (hound::SampleFormat::Float, 32) => reader
            .into_samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::Playback(format!("WAV decode error: {e}")))?,
        (format, bits) => {
            return Err(Error::Playback(format!(
                "unsupported WAV format: {format:?} {bits}-bit"
            )));
        }
    };

    Ok(AudioClip {
        samples,
        sample_rate: spec.sample_rate,
        channels: spec.channels,
    })
}
