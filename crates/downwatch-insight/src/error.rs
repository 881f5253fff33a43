use thiserror::Error;

/// Errors from the external summarization call.
///
/// Placeholder scores are never fabricated on failure; every variant
/// propagates to the caller.
#[derive(Debug, Error)]
pub enum InsightError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenRouter API key is not configured")]
    MissingApiKey,

    #[error("invalid base URL '{base_url}': {reason}")]
    InvalidBaseUrl { base_url: String, reason: String },

    #[error("OpenRouter API error (status {status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("model response has no choices")]
    EmptyResponse,

    #[error("model output is not a valid insight payload for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },
}
