//! Retry with exponential backoff for transient fetch errors.
//!
//! [`retry_with_backoff`] wraps any fallible async operation and retries on
//! transient conditions (429, network failures, 5xx). Other errors are
//! returned immediately; retrying a 404 or a malformed-URL error would only
//! repeat the same outcome.

use std::future::Future;
use std::time::Duration;

use crate::error::ScrapeError;

/// Returns `true` for errors worth retrying after a backoff delay.
///
/// **Retriable:**
/// - [`ScrapeError::RateLimited`] — the server asked us to back off.
/// - [`ScrapeError::Http`] — network-level failure (timeout, reset).
/// - [`ScrapeError::UnexpectedStatus`] with a 5xx status.
///
/// **Not retriable:**
/// - [`ScrapeError::PageNotFound`] — the provider slug has no page.
/// - [`ScrapeError::UnexpectedStatus`] with a 4xx status.
/// - [`ScrapeError::InvalidBaseUrl`] — configuration problem.
pub(crate) fn is_retriable(err: &ScrapeError) -> bool {
    match err {
        ScrapeError::RateLimited { .. } | ScrapeError::Http(_) => true,
        ScrapeError::UnexpectedStatus { status, .. } => (500..600).contains(status),
        ScrapeError::PageNotFound { .. } | ScrapeError::InvalidBaseUrl { .. } => false,
    }
}

/// Executes `operation` with up to `max_retries` additional attempts on
/// transient errors.
///
/// The wait before the n-th retry is `backoff_base_secs * 2^(n-1)` seconds
/// with ±25% jitter, capped at 60 seconds. Non-retriable errors are
/// returned immediately.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    max_retries: u32,
    backoff_base_secs: u64,
    mut operation: F,
) -> Result<T, ScrapeError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScrapeError>>,
{
    const MAX_DELAY_MS: u64 = 60_000;
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !is_retriable(&err) || attempt >= max_retries {
                    return Err(err);
                }
                attempt += 1;
                let computed = backoff_base_secs
                    .saturating_mul(1_000)
                    .saturating_mul(1u64 << (attempt - 1).min(10));
                let capped = computed.min(MAX_DELAY_MS);
                #[allow(
                    clippy::cast_possible_truncation,
                    clippy::cast_sign_loss,
                    clippy::cast_precision_loss
                )]
                let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
                tracing::warn!(
                    attempt,
                    max_retries,
                    delay_ms,
                    error = %err,
                    "transient fetch error — retrying after backoff"
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            }
        }
    }
}
