//! HTTP client abstraction for metadata providers

pub mod native;

pub use native::HttpClient;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HttpError {
    #[error("request failed: {message}")]
    RequestFailed { message: String },
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },
    #[error("timeout")]
    Timeout,
    #[error("rate limited")]
    RateLimited,
    #[error("server error: status {code}")]
    ServerError { code: u16 },
    #[error("parse error: {message}")]
    ParseError { message: String },
}

impl HttpError {
    /// Whether a retry could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            HttpError::Timeout
                | HttpError::RateLimited
                | HttpError::ServerError { .. }
                | HttpError::RequestFailed { .. }
        )
    }
}

#[derive(Clone, Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
    pub headers: std::collections::HashMap<String, String>,
}

/// Retry schedule for transient provider failures. Attempts beyond the first
/// back off exponentially from `base_delay_ms`, capped at `max_delay_ms`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl RetryPolicy {
    pub fn delay_ms(&self, attempt: u32) -> u64 {
        let exp = attempt.saturating_sub(1).min(16);
        self.base_delay_ms
            .saturating_mul(1u64 << exp)
            .min(self.max_delay_ms)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
        }
    }
}
