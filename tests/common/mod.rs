//! Shared test utilities: tracing init, stub clients, and audio fixtures

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use parley::{
    ChatCompleter, ChatResponse, Error, Message, Result, Transcriber, TranscriptionResult, Usage,
};

/// Initialize tracing once for the test binary
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Stub speech-to-text client.
///
/// `reply` is either the transcript to return or the message of a
/// `Transcription` error; `delay` simulates an in-flight upstream call.
pub struct StubTranscriber {
    pub reply: std::result::Result<String, String>,
    pub configured: bool,
    pub delay: Option<Duration>,
}

impl StubTranscriber {
    pub fn text(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            configured: true,
            delay: None,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            configured: true,
            delay: None,
        }
    }
}

#[async_trait]
impl Transcriber for StubTranscriber {
    async fn transcribe(&self, _locator: &Path) -> Result<TranscriptionResult> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        match &self.reply {
            Ok(text) => Ok(TranscriptionResult {
                text: text.clone(),
                confidence: 1.0,
            }),
            Err(message) => Err(Error::Transcription {
                status: 500,
                message: message.clone(),
            }),
        }
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}

/// One recorded chat call: the user text and the forwarded history
pub struct SeenCall {
    pub user_text: String,
    pub history: Vec<Message>,
}

/// Stub chat completion client that records every call it receives
pub struct StubChat {
    pub reply: std::result::Result<String, String>,
    pub configured: bool,
    pub calls: Mutex<Vec<SeenCall>>,
}

impl StubChat {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            configured: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            configured: true,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ChatCompleter for StubChat {
    async fn complete(&self, user_text: &str, history: &[Message]) -> Result<ChatResponse> {
        self.calls.lock().unwrap().push(SeenCall {
            user_text: user_text.to_string(),
            history: history.to_vec(),
        });
        match &self.reply {
            Ok(text) => Ok(ChatResponse {
                message: text.clone(),
                usage: Some(Usage {
                    prompt_tokens: 5,
                    completion_tokens: 2,
                    total_tokens: 7,
                }),
            }),
            Err(message) => Err(Error::ChatApi {
                status: 502,
                message: message.clone(),
            }),
        }
    }

    fn is_configured(&self) -> bool {
        self.configured
    }
}

/// Write a short sine-wave WAV fixture and return its locator
pub fn sine_fixture(dir: &Path, frequency: f32, duration_secs: f32) -> PathBuf {
    const SAMPLE_RATE: u32 = 16_000;

    #[allow(clippy::cast_precision_loss, clippy::cast_sign_loss, clippy::cast_possible_truncation)]
    let num_samples = (SAMPLE_RATE as f32 * duration_secs) as usize;
    let samples: Vec<f32> = (0..num_samples)
        .map(|i| {
            #[allow(clippy::cast_precision_loss)]
            let t = i as f32 / SAMPLE_RATE as f32;
            0.5 * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect();

    let path = dir.join("fixture.wav");
    parley::audio::write_wav(&path, &samples, SAMPLE_RATE).expect("failed to write fixture");
    path
}
