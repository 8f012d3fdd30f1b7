//! Error types for the parley client

use thiserror::Error;

/// Result type alias for parley operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the parley client
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or malformed configuration (checked before every turn)
    #[error("configuration error: {0}")]
    Config(String),

    /// Microphone capability refused or unavailable
    #[error("microphone permission denied: {0}")]
    PermissionDenied(String),

    /// Speech produced no usable text
    #[error("no speech detected in the recording")]
    EmptyTranscription,

    /// Transcription endpoint returned a non-2xx response
    #[error("transcription failed: {status} - {message}")]
    Transcription {
        /// HTTP status code from the upstream
        status: u16,
        /// Error message extracted from the response body
        message: String,
    },

    /// Chat completion endpoint returned a non-2xx response
    #[error("chat API error: {status} - {message}")]
    ChatApi {
        /// HTTP status code from the upstream
        status: u16,
        /// Error message extracted from the response body
        message: String,
    },

    /// Chat completion endpoint returned zero choices
    #[error("no response from the chat API")]
    EmptyResponse,

    /// Transport-level HTTP failure
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Local recording-session failure
    #[error("recording error: {0}")]
    Recording(String),

    /// Local playback-session failure
    #[error("playback error: {0}")]
    Playback(String),

    /// A turn was submitted while another is still in flight
    #[error("a turn is already in progress")]
    TurnInProgress,

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Error payload carried by upstream non-2xx responses: `{"error": {"message": ...}}`
#[derive(serde::Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(serde::Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Extract a human-readable message from an upstream error response.
///
/// Falls back to the raw body when it does not match the documented error
/// shape, and to a fixed placeholder when the body is empty or unreadable.
pub(crate) async fn api_error_message(response: reqwest::Response) -> String {
    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ApiErrorBody>(&body) {
        Ok(parsed) => parsed.error.message,
        Err(_) if body.is_empty() => "unknown error".to_string(),
        Err(_) => body,
    }
}
