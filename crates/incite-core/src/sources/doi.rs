//! DOI provider using doi.org content negotiation
//!
//! https://citation.crosscite.org/docs.html
//! Requesting a DOI with `Accept: application/vnd.citationstyles.csl+json`
//! returns the registration agency's CSL JSON for the work, so no
//! per-agency normalization is needed.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use super::traits::{FetchMetadata, SourceError, SourceMetadata};
use crate::csl::CslItem;
use crate::http::HttpClient;

const CSL_JSON_ACCEPT: &str = "application/vnd.citationstyles.csl+json";

pub struct DoiSource {
    client: Arc<HttpClient>,
}

impl DoiSource {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self { client }
    }

    /// Expand a shortDOI (`10/abc`) to its full form via the doi.org handle
    /// API. The expanded DOI is returned as registered, case included.
    async fn expand_short_doi(&self, short_doi: &str) -> Result<String, SourceError> {
        let suffix = short_doi.trim_start_matches("10/");
        let url = format!("https://doi.org/api/handles/10/{suffix}?type=HS_ALIAS");
        let response = self.client.get_with_retry(&url, &[]).await?;
        if response.status == 404 {
            return Err(SourceError::NotFound);
        }
        parse_handle_response(&response.body)
    }
}

#[derive(Debug, Deserialize)]
struct HandleResponse {
    values: Option<Vec<HandleValue>>,
}

#[derive(Debug, Deserialize)]
struct HandleValue {
    #[serde(rename = "type")]
    value_type: String,
    data: HandleData,
}

#[derive(Debug, Deserialize)]
struct HandleData {
    value: String,
}

fn parse_handle_response(json: &str) -> Result<String, SourceError> {
    let response: HandleResponse = serde_json::from_str(json)
        .map_err(|e| SourceError::Parse(format!("invalid handle JSON: {e}")))?;
    response
        .values
        .unwrap_or_default()
        .into_iter()
        .find(|value| value.value_type == "HS_ALIAS")
        .map(|value| value.data.value)
        .ok_or(SourceError::NotFound)
}

pub(crate) fn parse_csl_response(json: &str) -> Result<CslItem, SourceError> {
    serde_json::from_str(json).map_err(|e| SourceError::Parse(format!("invalid CSL JSON: {e}")))
}

#[async_trait]
impl FetchMetadata for DoiSource {
    fn info(&self) -> SourceMetadata {
        SourceMetadata {
            id: "doi",
            name: "DOI content negotiation",
            description: "CSL JSON via doi.org content negotiation, any registration agency",
            base_url: "https://doi.org",
            rate_limit_per_second: 10.0,
        }
    }

    async fn fetch(&self, identifier: &str) -> Result<CslItem, SourceError> {
        let doi = if identifier.starts_with("10/") {
            let expanded = self.expand_short_doi(identifier).await?;
            tracing::debug!(short = identifier, doi = %expanded, "expanded shortDOI");
            expanded
        } else {
            identifier.to_string()
        };

        let url = format!("https://doi.org/{doi}");
        let response = self
            .client
            .get_with_retry(&url, &[("Accept", CSL_JSON_ACCEPT)])
            .await?;
        match response.status {
            404 | 204 => Err(SourceError::NotFound),
            200 => parse_csl_response(&response.body),
            status => Err(SourceError::Parse(format!(
                "unexpected status {status} from doi.org"
            ))),
        }
    }
}
