//! Minimal authenticated client for REST APIs that report rate limits via
//! `x-ratelimit-*` headers (GitHub and compatible hosts).

use crate::Result;
use crate::net::resilient;
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;

/// Rate limit information from response headers.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitInfo {
    pub remaining: usize,
    pub reset_at: DateTime<Utc>,
}

/// Result of an API call, classified by response status.
#[derive(Debug)]
pub enum ApiResult<T> {
    /// Request succeeded; contains data and optional rate limit info.
    Success(T, Option<RateLimitInfo>),

    /// Rate limited; retry after the reported reset time.
    RateLimited(RateLimitInfo),

    /// The requested resource was not found (404).
    NotFound(Option<RateLimitInfo>),

    /// Request failed permanently; should not be retried.
    Failed(ohno::AppError, Option<RateLimitInfo>),
}

/// Hosting API client with optional token authentication.
#[derive(Debug, Clone)]
pub struct Client {
    client: reqwest::Client,
    base_url: String,
}

impl Client {
    /// Create a new API client with optional authentication token.
    pub fn new(token: Option<&str>, base_url: impl Into<String>) -> Result<Self> {
        use reqwest::header::{AUTHORIZATION, HeaderValue};

        let mut client_builder = reqwest::Client::builder().user_agent("esm-inventory");

        if let Some(t) = token {
            let mut auth_val = HeaderValue::from_str(&format!("token {t}"))?;
            auth_val.set_sensitive(true);

            let mut headers = HeaderMap::new();
            let _ = headers.insert(AUTHORIZATION, auth_val);

            client_builder = client_builder.default_headers(headers);
        }

        Ok(Self {
            client: client_builder.build()?,
            base_url: base_url.into(),
        })
    }

    /// Get the base URL for this client.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Make an API call and classify the result.
    pub async fn api_call(&self, url: &str) -> ApiResult<reqwest::Response> {
        self.call(resilient::get(&self.client, url).await)
    }

    /// Make an API call with an explicit `Accept` media type.
    pub async fn api_call_with_accept(&self, url: &str, accept: &str) -> ApiResult<reqwest::Response> {
        self.call(resilient::get_with_accept(&self.client, url, accept).await)
    }

    fn call(&self, sent: Result<reqwest::Response>) -> ApiResult<reqwest::Response> {
        let resp = match sent {
            Ok(r) => r,
            Err(e) => return ApiResult::Failed(e, None),
        };

        // Extract rate limit info before consuming the response.
        let rate_limit = rate_limit_from_headers(resp.headers());

        let status = resp.status();
        if status.is_success() {
            return ApiResult::Success(resp, rate_limit);
        }

        // Primary (429) and secondary (403 with exhausted quota) rate limits.
        let status_code = status.as_u16();
        if status_code == 429 || (status_code == 403 && rate_limit.is_some_and(|rl| rl.remaining == 0)) {
            let rate_limit = rate_limit.unwrap_or_else(|| RateLimitInfo {
                remaining: 0,
                reset_at: Utc::now() + chrono::Duration::hours(1),
            });
            return ApiResult::RateLimited(rate_limit);
        }

        if status_code == 404 {
            return ApiResult::NotFound(rate_limit);
        }

        let error = resp.error_for_status().expect_err("status is not successful at this point");
        ApiResult::Failed(error.into(), rate_limit)
    }
}

/// Extract rate limit information from API response headers.
fn rate_limit_from_headers(headers: &HeaderMap) -> Option<RateLimitInfo> {
    let remaining = headers.get("x-ratelimit-remaining")?.to_str().ok()?.parse::<usize>().ok()?;

    let reset_timestamp = headers.get("x-ratelimit-reset")?.to_str().ok()?.parse::<i64>().ok()?;

    let reset_at = DateTime::from_timestamp(reset_timestamp, 0)?;

    Some(RateLimitInfo { remaining, reset_at })
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn extracts_rate_limit_from_headers() {
        let mut headers = HeaderMap::new();
        let _ = headers.insert("x-ratelimit-remaining", HeaderValue::from_static("4999"));
        let _ = headers.insert("x-ratelimit-reset", HeaderValue::from_static("1704067200"));

        let rate_limit = rate_limit_from_headers(&headers).unwrap();

        assert_eq!(rate_limit.remaining, 4999);
        assert_eq!(rate_limit.reset_at.timestamp(), 1_704_067_200);
    }

    #[test]
    fn missing_headers_mean_no_info() {
        assert!(rate_limit_from_headers(&HeaderMap::new()).is_none());
    }

    #[test]
    fn invalid_remaining_means_no_info() {
        let mut headers = HeaderMap::new();
        let _ = headers.insert("x-ratelimit-remaining", HeaderValue::from_static("lots"));
        let _ = headers.insert("x-ratelimit-reset", HeaderValue::from_static("1704067200"));

        assert!(rate_limit_from_headers(&headers).is_none());
    }

    #[test]
    fn invalid_reset_means_no_info() {
        let mut headers = HeaderMap::new();
        let _ = headers.insert("x-ratelimit-remaining", HeaderValue::from_static("10"));
        let _ = headers.insert("x-ratelimit-reset", HeaderValue::from_static("soon"));

        assert!(rate_limit_from_headers(&headers).is_none());
    }

    #[test]
    fn client_without_token() {
        let client = Client::new(None, "https://api.github.com").unwrap();
        assert_eq!(client.base_url(), "https://api.github.com");
    }

    #[test]
    fn client_with_token() {
        let client = Client::new(Some("test_token"), "https://api.github.com").unwrap();
        assert_eq!(client.base_url(), "https://api.github.com");
    }
}
