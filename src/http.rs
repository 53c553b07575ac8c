//! Outbound HTTP with a per-attempt timeout and retry of transient failures.
//!
//! A response with status 429 or 5xx, a timeout, or a connection failure is
//! retried up to [`RetryPolicy::max_retries`] times. The wait before a retry
//! is the server's `Retry-After` value when it sent a valid one, otherwise
//! exponential backoff (1s, 2s, 4s with the default policy) capped at
//! [`RetryPolicy::max_delay`]. Any other non-2xx status fails immediately.

use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, warn};

const USER_AGENT: &str = concat!("lifedash/", env!("CARGO_PKG_VERSION"));

/// Longest slice of an error body kept in error messages
const BODY_EXCERPT_CHARS: usize = 200;

/// How many times, and how long between, transient failures are retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Wait before the first retry; doubled for each following one
    pub base_delay: Duration,
    /// Ceiling for a single backoff wait
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// The default policy with a different retry count
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self { max_retries, ..Self::default() }
    }
}

/// Error type for outbound requests
#[derive(Debug, Error)]
pub enum FetchError {
    /// A single attempt exceeded its timeout
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    /// The request could not be built or sent
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The server answered with a status that is not worth retrying
    #[error("HTTP {}: {body}", status.as_u16())]
    Status { status: StatusCode, body: String },

    /// Every attempt failed with a transient error
    #[error("gave up after {attempts} attempts, last response: {last}")]
    RetriesExhausted {
        attempts: u32,
        last_status: Option<StatusCode>,
        last: String,
    },

    /// The response body did not have the expected shape
    #[error("could not decode response: {0}")]
    Decode(String),

    /// The response body is larger than the caller accepts
    #[error("response body exceeds {limit} bytes")]
    TooLarge { limit: usize },
}

impl FetchError {
    /// The HTTP status behind the error, if the server answered at all
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            FetchError::RetriesExhausted { last_status, .. } => *last_status,
            _ => None,
        }
    }
}

/// Whether a status is transient: 429 or any 5xx
pub fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Exponential backoff for the zero-based retry `attempt`, capped at `max_delay`
pub fn backoff_delay(policy: &RetryPolicy, attempt: u32) -> Duration {
    let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
    policy
        .base_delay
        .checked_mul(factor)
        .unwrap_or(policy.max_delay)
        .min(policy.max_delay)
}

/// Parses a `Retry-After` header value
///
/// Accepts a non-negative number of seconds or an HTTP-date. A date in the
/// past means "retry now". Anything else is invalid and yields `None`.
pub fn parse_retry_after(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<u64>() {
        return Some(Duration::from_secs(secs));
    }
    let date = DateTime::parse_from_rfc2822(value).ok()?;
    let wait = date.with_timezone(&Utc) - now;
    Some(wait.to_std().unwrap_or(Duration::ZERO))
}

/// The wait before retry number `attempt` (zero-based)
///
/// A valid `Retry-After` value wins; otherwise exponential backoff.
pub fn retry_delay(policy: &RetryPolicy, attempt: u32, retry_after: Option<&str>, now: DateTime<Utc>) -> Duration {
    retry_after
        .and_then(|value| parse_retry_after(value, now))
        .unwrap_or_else(|| backoff_delay(policy, attempt))
}

fn excerpt(body: &str) -> String {
    let trimmed = body.trim();
    match trimmed.char_indices().nth(BODY_EXCERPT_CHARS) {
        Some((idx, _)) => format!("{}...", &trimmed[..idx]),
        None => trimmed.to_string(),
    }
}

/// Sends a request once, bounded by `timeout`
pub async fn fetch_with_timeout(request: RequestBuilder, timeout: Duration) -> Result<Response, FetchError> {
    match request.timeout(timeout).send().await {
        Ok(response) => Ok(response),
        Err(e) if e.is_timeout() => Err(FetchError::Timeout(timeout)),
        Err(e) => Err(FetchError::Request(e)),
    }
}

/// Sends a request, retrying transient failures according to `policy`
///
/// `build` is called once per attempt so every attempt sends a fresh request.
///
/// ### Errors
///
/// * `FetchError::Status` for a non-retryable, non-2xx response (first attempt it occurs)
/// * `FetchError::RetriesExhausted` after `max_retries + 1` transient failures,
///   describing the last one
/// * `FetchError::Request` when the request cannot be built
pub async fn send_with_retry<F>(build: F, policy: &RetryPolicy, timeout: Duration) -> Result<Response, FetchError>
where
    F: Fn() -> RequestBuilder,
{
    let mut attempt = 0u32;

    loop {
        let (last_status, last, wait) = match fetch_with_timeout(build(), timeout).await {
            Ok(response) if response.status().is_success() => {
                if attempt > 0 {
                    debug!(attempt = attempt + 1, "Request succeeded after retries");
                }
                return Ok(response);
            }
            Ok(response) if is_retryable(response.status()) => {
                let status = response.status();
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_owned);
                let body = response.text().await.unwrap_or_default();
                let wait = retry_delay(policy, attempt, retry_after.as_deref(), Utc::now());
                (Some(status), format!("HTTP {}: {}", status.as_u16(), excerpt(&body)), wait)
            }
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                return Err(FetchError::Status { status, body: excerpt(&body) });
            }
            Err(FetchError::Request(e)) if e.is_builder() => return Err(FetchError::Request(e)),
            Err(e @ (FetchError::Timeout(_) | FetchError::Request(_))) => {
                (None, e.to_string(), backoff_delay(policy, attempt))
            }
            Err(e) => return Err(e),
        };

        if attempt >= policy.max_retries {
            warn!(attempts = attempt + 1, last = %last, "Giving up on request");
            return Err(FetchError::RetriesExhausted { attempts: attempt + 1, last_status, last });
        }

        warn!(attempt = attempt + 1, wait_ms = wait.as_millis() as u64, last = %last, "Transient failure, retrying");
        tokio::time::sleep(wait).await;
        attempt += 1;
    }
}

/// A shared reqwest client bundled with its retry policy and timeout
///
/// Cloning is cheap; all clones share one connection pool.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    policy: RetryPolicy,
    timeout: Duration,
}

impl HttpClient {
    pub fn new(policy: RetryPolicy, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self { client, policy, timeout })
    }

    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Sends with retry; `build` receives the underlying client
    pub async fn send<F>(&self, build: F) -> Result<Response, FetchError>
    where
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        send_with_retry(|| build(&self.client), &self.policy, self.timeout).await
    }

    /// Sends a single attempt without retrying
    pub async fn send_once<F>(&self, build: F) -> Result<Response, FetchError>
    where
        F: FnOnce(&reqwest::Client) -> RequestBuilder,
    {
        fetch_with_timeout(build(&self.client), self.timeout).await
    }

    /// Sends with retry and decodes a JSON body
    pub async fn fetch_json<T, F>(&self, build: F) -> Result<T, FetchError>
    where
        T: DeserializeOwned,
        F: Fn(&reqwest::Client) -> RequestBuilder,
    {
        let response = self.send(build).await?;
        decode_json(response).await
    }
}

/// Reads a body of at most `limit` bytes
///
/// A declared `Content-Length` over the limit is refused before reading;
/// otherwise the body is read chunk by chunk and abandoned once it passes the limit.
pub async fn read_body_capped(mut response: Response, limit: usize) -> Result<Vec<u8>, FetchError> {
    if response.content_length().is_some_and(|len| len > limit as u64) {
        return Err(FetchError::TooLarge { limit });
    }

    let mut body = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        if body.len() + chunk.len() > limit {
            return Err(FetchError::TooLarge { limit });
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body)
}

/// Decodes a JSON body, keeping decode failures distinct from transport ones
pub async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T, FetchError> {
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|e| FetchError::Decode(e.to_string()))
}

#[cfg(test)]
mod prop_tests;
