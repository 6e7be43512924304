//! Resilient HTTP request utilities.
//!
//! Wraps GET requests with bounded exponential-backoff retries so transient
//! network failures are masked automatically. Retries cover connection
//! errors, 5xx responses, and 429 responses (honoring `Retry-After`);
//! anything else is returned to the caller for classification.

use crate::Result;
use core::time::Duration;

/// Timeout applied to each individual request attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Maximum retry attempts on top of the original request.
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff between retries.
const RETRY_BASE_DELAY: Duration = Duration::from_secs(1);

/// Default delay for a 429 response without a usable `Retry-After` header.
const DEFAULT_RATE_LIMIT_DELAY: Duration = Duration::from_secs(5);

const LOG_TARGET: &str = " resilient";

/// Parse the `Retry-After` header value as seconds.
fn parse_retry_after(headers: &reqwest::header::HeaderMap) -> Option<u64> {
    let s = headers.get(reqwest::header::RETRY_AFTER).and_then(|h| h.to_str().ok())?;
    s.parse::<u64>().ok()
}

/// Delay before retrying, or `None` when the outcome should not be retried.
fn retry_delay(result: &Result<reqwest::Response, reqwest::Error>, attempt: u32) -> Option<Duration> {
    let backoff = RETRY_BASE_DELAY * 2u32.saturating_pow(attempt);

    match result {
        // Network / connection errors are always transient.
        Err(_) => Some(backoff),

        // Server errors (5xx) are transient.
        Ok(resp) if resp.status().is_server_error() => Some(backoff),

        // Rate-limited; honor Retry-After if present.
        Ok(resp) if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS => Some(
            parse_retry_after(resp.headers()).map_or(DEFAULT_RATE_LIMIT_DELAY, Duration::from_secs),
        ),

        // Everything else (success, 4xx client errors) is not retried here.
        _ => None,
    }
}

/// Send an HTTP request with automatic retry.
///
/// The final response (or error) after retries are exhausted is handed back
/// unchanged so callers can classify the status themselves.
async fn send_resilient(build: impl Fn() -> reqwest::RequestBuilder) -> Result<reqwest::Response> {
    let mut attempt = 0;
    loop {
        let result = build().timeout(REQUEST_TIMEOUT).send().await;

        if attempt < MAX_RETRY_ATTEMPTS
            && let Some(delay) = retry_delay(&result, attempt)
        {
            log::debug!(
                target: LOG_TARGET,
                "retrying HTTP request (attempt {}, delay {}ms)",
                attempt + 1,
                delay.as_millis(),
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
            continue;
        }

        return result.map_err(ohno::AppError::from);
    }
}

/// Send an HTTP GET request with automatic retry and per-attempt timeout.
pub async fn get(client: &reqwest::Client, url: &str) -> Result<reqwest::Response> {
    send_resilient(|| client.get(url)).await
}

/// Like [`get`], with an explicit `Accept` header (some endpoints gate
/// response fields behind a media type).
pub async fn get_with_accept(client: &reqwest::Client, url: &str, accept: &str) -> Result<reqwest::Response> {
    send_resilient(|| client.get(url).header(reqwest::header::ACCEPT, accept)).await
}

/// Send an HTTP HEAD request with automatic retry.
pub async fn head(client: &reqwest::Client, url: &str) -> Result<reqwest::Response> {
    send_resilient(|| client.head(url)).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};

    #[test]
    fn parses_retry_after_seconds() {
        let mut headers = HeaderMap::new();
        let _ = headers.insert(RETRY_AFTER, HeaderValue::from_static("30"));
        assert_eq!(parse_retry_after(&headers), Some(30));
    }

    #[test]
    fn ignores_non_numeric_retry_after() {
        let mut headers = HeaderMap::new();
        let _ = headers.insert(RETRY_AFTER, HeaderValue::from_static("Wed, 21 Oct 2026 07:28:00 GMT"));
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn missing_retry_after() {
        assert_eq!(parse_retry_after(&HeaderMap::new()), None);
    }
}
