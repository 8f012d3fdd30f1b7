//! Configuration for the parley client

use std::fmt;
use std::path::Path;

use serde::Deserialize;

use crate::Result;

/// Default upstream API base URL
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Expected credential prefix; keys with any other shape are rejected
/// before a network call is attempted
pub const CREDENTIAL_PREFIX: &str = "sk-";

/// Default chat completion model
const DEFAULT_CHAT_MODEL: &str = "gpt-5";

/// Default speech-to-text model
const DEFAULT_STT_MODEL: &str = "whisper-1";

/// Default transcription language hint
const DEFAULT_LANGUAGE: &str = "en";

/// Response length cap for chat completions
const DEFAULT_MAX_COMPLETION_TOKENS: u32 = 500;

/// Client configuration: credential, model selectors, and endpoint base
#[derive(Clone)]
pub struct Config {
    /// API credential (bearer token)
    pub api_key: String,

    /// Chat completion model identifier
    pub chat_model: String,

    /// Speech-to-text model identifier
    pub stt_model: String,

    /// Upstream API base URL (override for self-hosted gateways and tests)
    pub base_url: String,

    /// Transcription language hint
    pub language: String,

    /// Response length cap for chat completions
    pub max_completion_tokens: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            chat_model: DEFAULT_CHAT_MODEL.to_string(),
            stt_model: DEFAULT_STT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            language: DEFAULT_LANGUAGE.to_string(),
            max_completion_tokens: DEFAULT_MAX_COMPLETION_TOKENS,
        }
    }
}

// Credentials must never appear in logs or panics.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("api_key", &"[REDACTED]")
            .field("chat_model", &self.chat_model)
            .field("stt_model", &self.stt_model)
            .field("base_url", &self.base_url)
            .field("language", &self.language)
            .field("max_completion_tokens", &self.max_completion_tokens)
            .finish()
    }
}

/// On-disk configuration file shape; every field optional, defaults fill the rest
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    api_key: Option<String>,
    chat_model: Option<String>,
    stt_model: Option<String>,
    base_url: Option<String>,
    language: Option<String>,
    max_completion_tokens: Option<u32>,
}

impl Config {
    /// Create a configuration with the given credential and default models
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Self::default()
        }
    }

    /// Load configuration from the environment.
    ///
    /// Reads `OPENAI_API_KEY`, `PARLEY_CHAT_MODEL`, `PARLEY_STT_MODEL`,
    /// and `PARLEY_BASE_URL` on top of the defaults.
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_env();
        config
    }

    /// Load configuration from a TOML file, with environment overrides.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let file: FileConfig = toml::from_str(&raw)?;

        let defaults = Self::default();
        let mut config = Self {
            api_key: file.api_key.unwrap_or(defaults.api_key),
            chat_model: file.chat_model.unwrap_or(defaults.chat_model),
            stt_model: file.stt_model.unwrap_or(defaults.stt_model),
            base_url: file.base_url.unwrap_or(defaults.base_url),
            language: file.language.unwrap_or(defaults.language),
            max_completion_tokens: file
                .max_completion_tokens
                .unwrap_or(defaults.max_completion_tokens),
        };
        config.apply_env();

        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Override the chat model
    #[must_use]
    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }

    /// Override the speech-to-text model
    #[must_use]
    pub fn with_stt_model(mut self, model: impl Into<String>) -> Self {
        self.stt_model = model.into();
        self
    }

    /// Override the upstream base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Validate the configuration.
    ///
    /// Checked before every turn: an invalid credential blocks the turn with a
    /// descriptive error instead of letting the network call fail upstream.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the credential is missing or malformed.
    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(crate::Error::Config(
                "API key is not configured; set OPENAI_API_KEY".to_string(),
            ));
        }
        if !credential_shape_ok(&self.api_key) {
            return Err(crate::Error::Config(format!(
                "API key format is invalid (expected `{CREDENTIAL_PREFIX}` prefix)"
            )));
        }
        Ok(())
    }

    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            self.api_key = key;
        }
        if let Ok(model) = std::env::var("PARLEY_CHAT_MODEL") {
            self.chat_model = model;
        }
        if let Ok(model) = std::env::var("PARLEY_STT_MODEL") {
            self.stt_model = model;
        }
        if let Ok(url) = std::env::var("PARLEY_BASE_URL") {
            self.base_url = url;
        }
    }
}

/// Credential-shape check shared by both API clients
pub(crate) fn credential_shape_ok(api_key: &str) -> bool {
    !api_key.is_empty() && api_key.starts_with(CREDENTIAL_PREFIX)
}
