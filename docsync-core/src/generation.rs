//! Text generation client: bounded retry, JSON extraction and the Messages API transport.
//!
//! This is the single place where the pipeline issues generation calls.
//! It knows nothing about documents or dialects.
//!
//! Retry strategy (see [`SyncError::is_retryable`]):
//! - network error, HTTP 429, HTTP 5xx (including 529) → retry with exponential backoff
//! - any other status → fail immediately
//! - retries exhausted → the last transport error is returned unchanged

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::contract::{GenerationRequest, TextGenerator, TextTransport};
use crate::error::{Result, SyncError};

/// Backoff schedule for retryable transport failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry; doubled for each one after.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `retry` (0-based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.base_delay.saturating_mul(1u32 << retry.min(16))
    }
}

/// Retrying [`TextGenerator`] over any [`TextTransport`].
pub struct GenerationClient<T> {
    transport: T,
    retry: RetryPolicy,
}

impl<T: TextTransport> GenerationClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[async_trait]
impl<T: TextTransport> TextGenerator for GenerationClient<T> {
    async fn complete(&self, request: GenerationRequest) -> Result<String> {
        let mut retry = 0;
        loop {
            match self.transport.send(request.clone()).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && retry < self.retry.max_retries => {
                    let delay = self.retry.delay_for(retry);
                    warn!(
                        model = %request.model,
                        status = ?e.status(),
                        retry = retry + 1,
                        delay_ms = delay.as_millis() as u64,
                        "[GENERATION] Retryable failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(e) => {
                    warn!(model = %request.model, error = %e, "[GENERATION] Request failed");
                    return Err(e);
                }
            }
        }
    }
}

/// Run a request and parse the first balanced top-level JSON object in the reply.
pub async fn complete_json<G, T>(generator: &G, request: GenerationRequest) -> Result<T>
where
    G: TextGenerator + ?Sized,
    T: DeserializeOwned,
{
    let text = generator.complete(request).await?;
    let object = extract_json_object(&text).ok_or_else(|| {
        SyncError::Parse(format!("No JSON found in response: {}", head(&text, 200)))
    })?;
    debug!(json = %object, "[GENERATION] Extracted JSON object");
    serde_json::from_str(object).map_err(|e| SyncError::Parse(format!("Invalid JSON object: {e}")))
}

/// Locate the first balanced `{...}` in `text`.
///
/// Braces inside JSON string literals are ignored, including escaped
/// quotes within those strings. Returns `None` if no object closes.
pub fn extract_json_object(text: &str) -> Option<&str> {
    let mut search_from = 0;
    while let Some(offset) = text[search_from..].find('{') {
        let start = search_from + offset;
        if let Some(end) = balanced_end(&text[start..]) {
            return Some(&text[start..start + end]);
        }
        search_from = start + 1;
    }
    None
}

/// Byte length of the balanced object at the start of `text`, if it closes.
fn balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (idx, ch) in text.char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(idx + 1);
                }
            }
            _ => {}
        }
    }
    None
}

fn head(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Connection settings for the Messages API.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_key: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl AnthropicConfig {
    pub const DEFAULT_BASE_URL: &'static str = "https://api.anthropic.com";

    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(300),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

/// [`TextTransport`] speaking the Anthropic Messages API over HTTPS.
pub struct AnthropicTransport {
    config: AnthropicConfig,
    http: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [Message<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicTransport {
    const API_VERSION: &'static str = "2023-06-01";
    const SERVICE: &'static str = "anthropic";

    pub fn new(config: AnthropicConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SyncError::FatalConfig(format!("Failed to build HTTP client: {e}")))?;
        Ok(Self { config, http })
    }
}

#[async_trait]
impl TextTransport for AnthropicTransport {
    async fn send(&self, request: GenerationRequest) -> Result<String> {
        let body = MessagesRequest {
            model: &request.model,
            max_tokens: request.max_tokens,
            system: &request.system,
            messages: [Message {
                role: "user",
                content: &request.user,
            }],
        };
        let url = format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'));
        debug!(model = %request.model, max_tokens = request.max_tokens, "[GENERATION] POST {url}");

        let response = self
            .http
            .post(&url)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", Self::API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| SyncError::transport(Self::SERVICE, None, e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| SyncError::transport(Self::SERVICE, Some(status.as_u16()), e.to_string()))?;

        if !status.is_success() {
            return Err(SyncError::transport(Self::SERVICE, Some(status.as_u16()), text));
        }

        let parsed: MessagesResponse = serde_json::from_str(&text)
            .map_err(|e| SyncError::Parse(format!("Unexpected Messages API response: {e}")))?;
        let content: String = parsed.content.into_iter().filter_map(|block| block.text).collect();
        if content.is_empty() {
            return Err(SyncError::Parse("Messages API response had no text content".into()));
        }
        Ok(content)
    }
}
