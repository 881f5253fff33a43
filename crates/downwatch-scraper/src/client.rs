//! HTTP client for outage-aggregator problem pages.

use std::time::Duration;

use reqwest::Client;

use crate::error::ScrapeError;
use crate::retry::retry_with_backoff;

const DEFAULT_BASE_URL: &str = "https://istheservicedown.com";

/// The aggregator sits behind bot protection that rejects obviously
/// programmatic user agents, so requests go out with browser-shaped headers.
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// HTTP client for a provider's problems page and outage map.
///
/// Handles rate limiting (429), not-found (404), and other non-2xx responses
/// as typed errors. Transient errors (429, network failures, 5xx) are
/// automatically retried with exponential backoff up to `max_retries`
/// additional attempts.
pub struct PageClient {
    client: Client,
    base_url: String,
    max_retries: u32,
    backoff_base_secs: u64,
}

impl PageClient {
    /// Creates a `PageClient` pointed at the production aggregator.
    ///
    /// `max_retries` is the number of additional attempts after the first
    /// failure for retriable errors. Set to `0` to disable retries.
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_secs: u64,
    ) -> Result<Self, ScrapeError> {
        Self::with_base_url(
            timeout_secs,
            user_agent,
            max_retries,
            backoff_base_secs,
            DEFAULT_BASE_URL,
        )
    }

    /// Creates a `PageClient` with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`ScrapeError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`ScrapeError::InvalidBaseUrl`] if
    /// `base_url` does not parse.
    pub fn with_base_url(
        timeout_secs: u64,
        user_agent: &str,
        max_retries: u32,
        backoff_base_secs: u64,
        base_url: &str,
    ) -> Result<Self, ScrapeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(if user_agent.is_empty() {
                BROWSER_USER_AGENT
            } else {
                user_agent
            })
            .build()?;

        let trimmed = base_url.trim_end_matches('/');
        reqwest::Url::parse(trimmed).map_err(|e| ScrapeError::InvalidBaseUrl {
            base_url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url: trimmed.to_owned(),
            max_retries,
            backoff_base_secs,
        })
    }

    /// Fetches the raw HTML of `{base}/problems/{slug}`.
    ///
    /// # Errors
    ///
    /// - [`ScrapeError::RateLimited`] — HTTP 429 after all retries exhausted.
    /// - [`ScrapeError::PageNotFound`] — HTTP 404 (not retried).
    /// - [`ScrapeError::UnexpectedStatus`] — any other non-2xx status
    ///   (5xx retried, 4xx not).
    /// - [`ScrapeError::Http`] — network or TLS failure after all retries.
    pub async fn fetch_problems_page(&self, slug: &str) -> Result<String, ScrapeError> {
        self.fetch_html(&format!("{}/problems/{slug}", self.base_url))
            .await
    }

    /// Fetches the raw HTML of `{base}/problems/{slug}/map`.
    ///
    /// # Errors
    ///
    /// Same as [`PageClient::fetch_problems_page`].
    pub async fn fetch_map_page(&self, slug: &str) -> Result<String, ScrapeError> {
        self.fetch_html(&format!("{}/problems/{slug}/map", self.base_url))
            .await
    }

    async fn fetch_html(&self, url: &str) -> Result<String, ScrapeError> {
        retry_with_backoff(self.max_retries, self.backoff_base_secs, || {
            let url = url.to_owned();
            async move {
                let response = self
                    .client
                    .get(&url)
                    .header(
                        reqwest::header::ACCEPT,
                        "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8",
                    )
                    .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
                    .header(reqwest::header::CACHE_CONTROL, "no-cache")
                    .send()
                    .await?;
                let status = response.status();

                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    let retry_after_secs = response
                        .headers()
                        .get(reqwest::header::RETRY_AFTER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|s| s.parse::<u64>().ok())
                        .unwrap_or(60);
                    return Err(ScrapeError::RateLimited {
                        domain: extract_domain(&url),
                        retry_after_secs,
                    });
                }

                if status == reqwest::StatusCode::NOT_FOUND {
                    return Err(ScrapeError::PageNotFound { url });
                }

                if !status.is_success() {
                    return Err(ScrapeError::UnexpectedStatus {
                        status: status.as_u16(),
                        url,
                    });
                }

                Ok(response.text().await?)
            }
        })
        .await
    }
}

/// Best-effort host extraction for error messages.
fn extract_domain(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_owned))
        .unwrap_or_else(|| url.to_owned())
}
