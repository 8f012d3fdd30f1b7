//! Speech-to-text client for the transcription endpoint

use std::path::Path;
use std::time::Duration;

use reqwest::multipart::{Form, Part};

use crate::config::{Config, credential_shape_ok};
use crate::error::api_error_message;
use crate::{Error, Result};

/// Upload ceiling enforced by the upstream transcription endpoint
const MAX_UPLOAD_BYTES: u64 = 25 * 1024 * 1024;

/// Fixed file name declared on the multipart upload
const UPLOAD_FILE_NAME: &str = "recording.m4a";

/// Fixed content type declared on the multipart upload
const UPLOAD_MIME: &str = "audio/m4a";

/// Upstream provides no confidence signal; every result carries this sentinel
const CONFIDENCE_SENTINEL: f32 = 1.0;

/// Transcription rate in dollars per minute, for the non-authoritative estimate
const RATE_PER_MINUTE: f64 = 0.006;

/// Response from the transcription API
#[derive(serde::Deserialize)]
struct TranscriptionResponse {
    text: String,
}

/// Result of a transcription call.
///
/// `confidence` is a fixed sentinel (the upstream model reports none) and
/// must not be used for decision-making.
#[derive(Debug, Clone)]
pub struct TranscriptionResult {
    /// Transcribed text, trimmed
    pub text: String,

    /// Always the fixed sentinel 1.0; documentation only
    pub confidence: f32,
}

/// Client for the speech-to-text HTTP endpoint
pub struct TranscriptionClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    language: String,
    base_url: String,
}

impl TranscriptionClient {
    /// Create a new transcription client from the shared configuration
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            model: config.stt_model.clone(),
            language: config.language.clone(),
            base_url: config.base_url.clone(),
        }
    }

    /// Transcribe the audio artifact at `locator`.
    ///
    /// # Errors
    ///
    /// Returns `Error::Io` if the artifact cannot be read,
    /// `Error::Transcription` on a non-2xx upstream response, and
    /// `Error::Network` on transport failure.
    pub async fn transcribe(&self, locator: &Path) -> Result<TranscriptionResult> {
        let audio = tokio::fs::read(locator).await?;
        tracing::debug!(
            audio_bytes = audio.len(),
            path = %locator.display(),
            "starting transcription"
        );

        let part = Part::bytes(audio)
            .file_name(UPLOAD_FILE_NAME)
            .mime_str(UPLOAD_MIME)?;

        let form = Form::new()
            .part("file", part)
            .text("model", self.model.clone())
            .text("language", self.language.clone())
            .text("response_format", "json");

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "transcription request failed");
                e
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let message = api_error_message(response).await;
            tracing::error!(status = %status, message = %message, "transcription API error");
            return Err(Error::Transcription {
                status: status.as_u16(),
                message,
            });
        }

        let result: TranscriptionResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse transcription response");
            e
        })?;

        let text = result.text.trim().to_string();
        tracing::info!(transcript = %text, "transcription complete");

        Ok(TranscriptionResult {
            text,
            confidence: CONFIDENCE_SENTINEL,
        })
    }

    /// True iff an API credential is present and matches the expected shape
    #[must_use]
    pub fn is_configured(&self) -> bool {
        credential_shape_ok(&self.api_key)
    }

    /// Pre-flight size check against the upstream upload ceiling.
    ///
    /// Fail-open: when the size cannot be determined the artifact is treated
    /// as valid and the upstream is left to enforce its own limit.
    pub async fn validate_size(&self, locator: &Path) -> bool {
        match tokio::fs::metadata(locator).await {
            Ok(metadata) => metadata.len() <= MAX_UPLOAD_BYTES,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    path = %locator.display(),
                    "could not determine audio size, assuming valid"
                );
                true
            }
        }
    }

    /// Approximate transcription cost for a recording of the given duration.
    ///
    /// Billed per started minute upstream; an estimate, not billable truth.
    #[must_use]
    pub fn estimate_cost(&self, duration: Duration) -> f64 {
        let minutes = duration.as_secs_f64() / 60.0;
        minutes.ceil() * RATE_PER_MINUTE
    }
}
