//! Common traits for metadata providers

use async_trait::async_trait;
use thiserror::Error;

use crate::csl::CslItem;
use crate::http::HttpError;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error(transparent)]
    Http(HttpError),
    #[error("could not parse provider response: {0}")]
    Parse(String),
    #[error("provider rate limit hit")]
    RateLimit,
    #[error("no metadata found for this identifier")]
    NotFound,
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
}

impl From<HttpError> for SourceError {
    fn from(e: HttpError) -> Self {
        match e {
            HttpError::RateLimited => SourceError::RateLimit,
            other => SourceError::Http(other),
        }
    }
}

impl SourceError {
    /// Whether retrying the fetch on a later run could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            SourceError::Http(e) => e.is_transient(),
            SourceError::RateLimit => true,
            SourceError::Parse(_) => true,
            SourceError::NotFound | SourceError::InvalidIdentifier(_) => false,
        }
    }
}

/// Metadata about a provider
pub struct SourceMetadata {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub base_url: &'static str,
    pub rate_limit_per_second: f32,
}

/// The shared provider contract: given an identifier, return a CSL item or
/// a typed failure. Fetches are idempotent and safe to retry.
#[async_trait]
pub trait FetchMetadata: Send + Sync {
    fn info(&self) -> SourceMetadata;

    async fn fetch(&self, identifier: &str) -> Result<CslItem, SourceError>;
}
