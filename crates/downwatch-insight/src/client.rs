//! Chat-completions client for the OpenRouter gateway.

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::error::InsightError;

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

// Models asked for bare JSON still wrap it in markdown fences often enough
// that stripping them unconditionally is cheaper than re-prompting.
static FENCE_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```(?:json)?\s*\n?").unwrap());
static FENCE_CLOSE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n?```\s*$").unwrap());

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Minimal OpenRouter chat-completions client: one user message in, the
/// first choice's content out, markdown fences stripped.
pub struct OpenRouterClient {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenRouterClient {
    /// Creates a client pointed at the production gateway.
    ///
    /// # Errors
    ///
    /// Returns [`InsightError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(api_key: &str, model: &str, timeout_secs: u64) -> Result<Self, InsightError> {
        Self::with_base_url(api_key, model, timeout_secs, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`InsightError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`InsightError::InvalidBaseUrl`] if
    /// `base_url` does not parse.
    pub fn with_base_url(
        api_key: &str,
        model: &str,
        timeout_secs: u64,
        base_url: &str,
    ) -> Result<Self, InsightError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let trimmed = base_url.trim_end_matches('/');
        reqwest::Url::parse(trimmed).map_err(|e| InsightError::InvalidBaseUrl {
            base_url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url: trimmed.to_owned(),
            api_key: api_key.to_owned(),
            model: model.to_owned(),
        })
    }

    /// The configured model identifier.
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Sends `prompt` as a single user message and returns the first
    /// choice's content with any surrounding markdown fences removed.
    ///
    /// # Errors
    ///
    /// - [`InsightError::ApiError`] — any non-2xx response, with the body
    ///   carried in the message.
    /// - [`InsightError::EmptyResponse`] — 2xx with no choices.
    /// - [`InsightError::Http`] — network or TLS failure, or a body that is
    ///   not the chat-completions shape.
    pub async fn chat(&self, prompt: &str) -> Result<String, InsightError> {
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": [{"role": "user", "content": prompt}],
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(InsightError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or(InsightError::EmptyResponse)?;
        Ok(strip_fences(&content))
    }
}

/// Removes a leading ```` ```json ```` fence and trailing ```` ``` ```` if
/// present, then trims.
#[must_use]
pub fn strip_fences(content: &str) -> String {
    let trimmed = content.trim();
    let opened = FENCE_OPEN.replace(trimmed, "");
    FENCE_CLOSE.replace(&opened, "").trim().to_owned()
}
