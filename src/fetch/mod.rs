//! Outbound HTTP for pixiv-dl
//!
//! This module contains:
//! - The process-wide rate limiter
//! - The resilient fetch client every API call and image download goes through

mod client;
mod rate_limiter;

pub use client::{
    build_http_client, is_retryable, parse_retry_after, FetchClient, FetchError, RetryPolicy,
    Timeouts, RETRYABLE_STATUSES,
};
pub use rate_limiter::RateLimiter;
