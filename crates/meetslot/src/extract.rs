//! Language-model adapter: free-text meeting request → [`MeetingDraft`].
//!
//! The model is asked for `key: value` lines, which
//! [`MeetingDraft::parse_kv`] turns into typed, explicitly unset-able fields.
//! Transport failures are retried according to the configured
//! [`RetryPolicy`]; nothing downstream of the draft is retried.

use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use crate::config::ExtractionConfig;
use crate::error::{Result, SchedulerError};
use crate::request::MeetingDraft;
use crate::retry::RetryPolicy;

/// Turns a natural-language request into a draft.
#[async_trait]
pub trait MeetingExtractor: Send + Sync {
    async fn extract(&self, text: &str, today: NaiveDate) -> Result<MeetingDraft>;
}

/// Failures of a single chat-completion call.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Response contained no message")]
    Empty,
}

impl ExtractionError {
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect(),
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// OpenAI-compatible chat-completions client.
#[derive(Clone)]
pub struct ChatCompletionExtractor {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    temperature: f32,
    api_key: String,
    retry: RetryPolicy,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionExtractor {
    /// Build from configuration, reading the API key from the configured
    /// environment variable.
    ///
    /// # Errors
    /// `SchedulerError::Config` when the variable is unset or empty.
    pub fn from_config(config: &ExtractionConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                SchedulerError::Config(format!(
                    "environment variable {} is not set",
                    config.api_key_env
                ))
            })?;
        Self::new(config, api_key)
    }

    pub fn new(config: &ExtractionConfig, api_key: impl Into<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| SchedulerError::Config(format!("HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            api_key: api_key.into(),
            retry: config.retry,
        })
    }

    /// One completion call, no retry.
    async fn complete(&self, prompt: &str) -> std::result::Result<String, ExtractionError> {
        let request = ChatRequest {
            model: &self.model,
            temperature: self.temperature,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ExtractionError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let text = response.text().await?;
        let parsed: ChatResponse =
            serde_json::from_str(&text).map_err(|e| ExtractionError::Decode(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(ExtractionError::Empty)
    }
}

#[async_trait]
impl MeetingExtractor for ChatCompletionExtractor {
    #[instrument(skip(self, text), level = "info")]
    async fn extract(&self, text: &str, today: NaiveDate) -> Result<MeetingDraft> {
        let prompt = build_prompt(text, today);
        let content = self
            .retry
            .run(ExtractionError::is_retryable, || self.complete(&prompt))
            .await
            .map_err(|e| SchedulerError::Extraction(e.to_string()))?;

        tracing::debug!("Extraction response:\n{}", content);
        Ok(MeetingDraft::parse_kv(&content))
    }
}

/// The instruction sent to the model.
pub fn build_prompt(text: &str, today: NaiveDate) -> String {
    format!(
        "Extract the meeting details from this request: '{text}'.\n\
         \n\
         Today is {today} ({weekday}). Resolve relative dates such as \"tomorrow\" \
         or \"next Monday\" against it.\n\
         \n\
         Reply with exactly these lines and nothing else. Write \"none\" for \
         anything the request does not say; do not invent values.\n\
         summary: <short title>\n\
         location: <location>\n\
         description: <description>\n\
         start_date: <YYYY-MM-DD>\n\
         start_time: <HH:MM, 24-hour>\n\
         end_date: <YYYY-MM-DD>\n\
         end_time: <HH:MM, 24-hour>\n\
         time_zone: <IANA zone name or IST>\n\
         recurrence: <RRULE:... or none>\n\
         attendees: <comma-separated email addresses>\n\
         conference_data: <yes or no>\n",
        text = text,
        today = today.format("%Y-%m-%d"),
        weekday = today.format("%A"),
    )
}
