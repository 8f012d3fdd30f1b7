//! Chat completion client for the conversation endpoint

use serde::{Deserialize, Serialize};

use crate::config::{Config, credential_shape_ok};
use crate::conversation::{Message, Role};
use crate::error::api_error_message;
use crate::{Error, Result};

/// Maximum number of trailing history messages forwarded with a turn
pub const HISTORY_WINDOW: usize = 10;

/// Fixed system instruction prepended to every prompt
const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful voice assistant. \
    Keep replies concise enough to read comfortably on a phone screen.";

/// Per-1k-token rate for gpt-4-class models, for the non-authoritative estimate
const RATE_GPT4_PER_1K: f64 = 0.03;

/// Per-1k-token rate for everything else
const RATE_DEFAULT_PER_1K: f64 = 0.002;

/// Characters per token, the usual rough approximation
const CHARS_PER_TOKEN: usize = 4;

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    max_completion_tokens: u32,
    temperature: f32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
    #[serde(default)]
    #[allow(dead_code)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

/// Token accounting reported by the upstream
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Result of a chat completion call
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Assistant reply, trimmed
    pub message: String,

    /// Token accounting, when the upstream reports it
    pub usage: Option<Usage>,
}

/// Non-authoritative cost approximation for a prompt
#[derive(Debug, Clone, Copy)]
pub struct CostEstimate {
    /// Token count approximated as characters / 4
    pub input_tokens: usize,

    /// Dollars, from a fixed per-model rate table; an estimate, not billable truth
    pub estimated_cost: f64,
}

/// Client for the chat completion HTTP endpoint
pub struct ChatClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    system_prompt: String,
    max_completion_tokens: u32,
}

impl ChatClient {
    /// Create a new chat client from the shared configuration
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            model: config.chat_model.clone(),
            base_url: config.base_url.clone(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_completion_tokens: config.max_completion_tokens,
        }
    }

    /// Replace the fixed system instruction
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Current model identifier
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Switch the model used for subsequent calls
    pub fn set_model(&mut self, model: impl Into<String>) {
        self.model = model.into();
    }

    /// Request a completion for `user_text` given the trailing conversation
    /// history.
    ///
    /// The prompt is ordered: one system instruction, then up to the last
    /// [`HISTORY_WINDOW`] history messages role-for-role, then the new user
    /// turn. Sampling parameters are fixed.
    ///
    /// # Errors
    ///
    /// Returns `Error::ChatApi` on a non-2xx upstream response,
    /// `Error::EmptyResponse` if the upstream returns zero choices, and
    /// `Error::Network` on transport failure.
    pub async fn complete(&self, user_text: &str, history: &[Message]) -> Result<ChatResponse> {
        let messages = self.build_messages(user_text, history);
        tracing::debug!(prompt_messages = messages.len(), model = %self.model, "requesting completion");

        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            max_completion_tokens: self.max_completion_tokens,
            temperature: 1.0,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "chat request failed");
                e
            })?;

        let status = response.status();
        tracing::debug!(status = %status, "received response");

        if !status.is_success() {
            let message = api_error_message(response).await;
            tracing::error!(status = %status, message = %message, "chat API error");
            return Err(Error::ChatApi {
                status: status.as_u16(),
                message,
            });
        }

        let result: ChatCompletionResponse = response.json().await.map_err(|e| {
            tracing::error!(error = %e, "failed to parse chat response");
            e
        })?;

        let Some(choice) = result.choices.into_iter().next() else {
            return Err(Error::EmptyResponse);
        };

        let message = choice.message.content.unwrap_or_default().trim().to_string();
        tracing::info!(
            reply_chars = message.len(),
            total_tokens = result.usage.map_or(0, |u| u.total_tokens),
            "completion received"
        );

        Ok(ChatResponse {
            message,
            usage: result.usage,
        })
    }

    /// True iff an API credential is present and matches the expected shape
    #[must_use]
    pub fn is_configured(&self) -> bool {
        credential_shape_ok(&self.api_key)
    }

    /// Approximate the cost of sending `messages` as a prompt.
    ///
    /// Token count is characters / 4, rounded up; the rate comes from a fixed
    /// per-model table.
    #[must_use]
    pub fn estimate_cost(&self, messages: &[Message]) -> CostEstimate {
        let chars: usize = messages.iter().map(|m| m.content.chars().count()).sum();
        let input_tokens = chars.div_ceil(CHARS_PER_TOKEN);

        let rate = if self.model.contains("gpt-4") {
            RATE_GPT4_PER_1K
        } else {
            RATE_DEFAULT_PER_1K
        };

        #[allow(clippy::cast_precision_loss)]
        let estimated_cost = (input_tokens as f64 / 1000.0) * rate;

        CostEstimate {
            input_tokens,
            estimated_cost,
        }
    }

    /// Build the ordered prompt for the API call
    fn build_messages(&self, user_text: &str, history: &[Message]) -> Vec<ChatMessage> {
        let start = history.len().saturating_sub(HISTORY_WINDOW);
        let recent = &history[start..];

        let mut messages = Vec::with_capacity(recent.len() + 2);
        messages.push(ChatMessage {
            role: "system",
            content: self.system_prompt.clone(),
        });
        for message in recent {
            messages.push(ChatMessage {
                role: message.role.as_str(),
                content: message.content.clone(),
            });
        }
        messages.push(ChatMessage {
            role: Role::User.as_str(),
            content: user_text.to_string(),
        });

        messages
    }
}
