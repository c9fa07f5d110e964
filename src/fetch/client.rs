//! Resilient HTTP client
//!
//! This module is the single path every outbound request takes:
//! - Building the HTTP client with the site's Referer, browser user agent and
//!   session cookie
//! - Waiting on the shared [`RateLimiter`] before each attempt
//! - Retrying 429/5xx responses with exponential backoff
//! - Honoring `Retry-After` on 429 responses
//! - Classifying failures into [`FetchError`]

use crate::config::{Config, NetworkConfig};
use crate::fetch::RateLimiter;
use reqwest::header::{HeaderMap, HeaderValue, COOKIE, REFERER, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Status codes retried automatically
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Failure of a single logical GET (after automatic retries)
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure: connect, timeout, reset
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Non-success status after the retry budget was spent
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The body could not be read to the end
    #[error("failed to read body of {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// No response head, or no body bytes, within the read timeout
    #[error("{url} timed out after {elapsed:?} without data")]
    Timeout { url: String, elapsed: Duration },

    /// The body was read but is not the expected JSON
    #[error("invalid JSON from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl FetchError {
    /// HTTP status, when the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Automatic retry behavior for retryable statuses
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub status_retries: u32,

    /// Delay before the first retry; doubles on each further retry
    pub backoff_base: Duration,

    /// Pause after a 429 without a usable `Retry-After` header
    pub rate_limited_fallback: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &NetworkConfig) -> Self {
        Self {
            status_retries: config.status_retries,
            backoff_base: Duration::from_millis(config.backoff_base_ms),
            rate_limited_fallback: Duration::from_millis(config.rate_limited_fallback_ms),
        }
    }

    /// Backoff before retry number `retry` (1-based): base, 2x base, 4x base...
    pub fn backoff(&self, retry: u32) -> Duration {
        let exponent = retry.saturating_sub(1).min(16);
        self.backoff_base.saturating_mul(1u32 << exponent)
    }
}

/// Connect and read limits of every request
///
/// The read limit bounds each wait for data, not the whole transfer, so a
/// slow download that keeps making progress is never cut off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    pub connect: Duration,
    pub read: Duration,
}

impl Timeouts {
    pub fn from_config(config: &NetworkConfig) -> Self {
        Self {
            connect: config.connect_timeout(),
            read: config.read_timeout(),
        }
    }

    /// Limit on waiting for the status line and headers: connect plus one read
    fn response_head(&self) -> Duration {
        self.connect.saturating_add(self.read)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&NetworkConfig::default())
    }
}

/// Whether a status is retried automatically
pub fn is_retryable(status: StatusCode) -> bool {
    RETRYABLE_STATUSES.contains(&status.as_u16())
}

/// Parses a `Retry-After` value given in whole seconds
///
/// HTTP-date values are not supported and yield `None`.
pub fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}

/// Builds an HTTP client carrying the site headers and session cookie
///
/// # Arguments
///
/// * `config` - The network configuration
/// * `phpsessid` - Session cookie value
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use pixiv_dl::config::NetworkConfig;
/// use pixiv_dl::fetch::build_http_client;
///
/// let client = build_http_client(&NetworkConfig::default(), "12345_abcdef").unwrap();
/// ```
pub fn build_http_client(config: &NetworkConfig, phpsessid: &str) -> Result<Client, reqwest::Error> {
    let mut headers = HeaderMap::new();
    if let Ok(referer) = HeaderValue::from_str(&config.referer) {
        headers.insert(REFERER, referer);
    }
    if let Ok(mut cookie) = HeaderValue::from_str(&format!("PHPSESSID={}", phpsessid.trim())) {
        cookie.set_sensitive(true);
        headers.insert(COOKIE, cookie);
    }

    Client::builder()
        .user_agent(config.user_agent.clone())
        .default_headers(headers)
        .connect_timeout(config.connect_timeout())
        .gzip(true)
        .brotli(true)
        .build()
}

/// Rate-limited, retrying GET client shared by every fetcher and download task
///
/// Cloning is cheap; clones share the connection pool and the rate limiter.
#[derive(Debug, Clone)]
pub struct FetchClient {
    http: Client,
    limiter: Arc<RateLimiter>,
    policy: RetryPolicy,
    timeouts: Timeouts,
}

impl FetchClient {
    /// Builds the client, limiter and retry policy described by `config`
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let network = &config.network;
        let http = build_http_client(network, &config.auth.phpsessid)?;
        let limiter = RateLimiter::new(
            network.min_requests_per_second,
            network.max_requests_per_second,
        );
        Ok(Self::new(
            http,
            Arc::new(limiter),
            RetryPolicy::from_config(network),
            Timeouts::from_config(network),
        ))
    }

    pub fn new(
        http: Client,
        limiter: Arc<RateLimiter>,
        policy: RetryPolicy,
        timeouts: Timeouts,
    ) -> Self {
        Self {
            http,
            limiter,
            policy,
            timeouts,
        }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Issues a GET, retrying retryable statuses per the policy
    ///
    /// # Retry Logic
    ///
    /// | Condition | Action |
    /// |-----------|--------|
    /// | 2xx | Return the response |
    /// | 429 | Sleep `Retry-After` (or the fallback), then back off and retry |
    /// | 500/502/503/504 | Back off and retry |
    /// | Other status | Immediate → `FetchError::Status` |
    /// | Transport error or timeout | Immediate → `FetchError::Request` / `FetchError::Timeout` |
    ///
    /// Every attempt, retries included, waits on the rate limiter first.
    pub async fn get(&self, url: &str) -> Result<Response, FetchError> {
        let mut retry = 0;

        loop {
            self.limiter.wait().await;

            let head_timeout = self.timeouts.response_head();
            let response = tokio::time::timeout(head_timeout, self.http.get(url).send())
                .await
                .map_err(|_| FetchError::Timeout {
                    url: url.to_string(),
                    elapsed: head_timeout,
                })?
                .map_err(|source| FetchError::Request {
                    url: url.to_string(),
                    source,
                })?;

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            if !is_retryable(status) || retry >= self.policy.status_retries {
                return Err(FetchError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }

            if status == StatusCode::TOO_MANY_REQUESTS {
                let pause = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(parse_retry_after)
                    .unwrap_or(self.policy.rate_limited_fallback);
                tracing::warn!("Too many requests for {}, waiting {:?}", url, pause);
                tokio::time::sleep(pause).await;
            }

            retry += 1;
            let delay = self.policy.backoff(retry);
            tracing::debug!(
                "HTTP {} from {}, retry {}/{} in {:?}",
                status.as_u16(),
                url,
                retry,
                self.policy.status_retries,
                delay
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// GETs `url` and reads the whole body
    ///
    /// Each chunk must arrive within the read timeout; the transfer as a
    /// whole has no limit.
    pub async fn get_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut response = self.get(url).await?;
        let read_timeout = self.timeouts.read;

        let mut body = Vec::new();
        loop {
            let chunk = tokio::time::timeout(read_timeout, response.chunk())
                .await
                .map_err(|_| FetchError::Timeout {
                    url: url.to_string(),
                    elapsed: read_timeout,
                })?
                .map_err(|source| FetchError::Body {
                    url: url.to_string(),
                    source,
                })?;
            match chunk {
                Some(bytes) => body.extend_from_slice(&bytes),
                None => return Ok(body),
            }
        }
    }

    /// GETs `url` and decodes the body as JSON
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let body = self.get_bytes(url).await?;
        serde_json::from_slice(&body).map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })
    }
}
