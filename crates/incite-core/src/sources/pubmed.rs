//! PubMed and PubMed Central providers
//!
//! Both use the NCBI Literature Citation Exporter, which serves CSL JSON
//! directly: https://api.ncbi.nlm.nih.gov/lit/ctxp
//! Rate limit: 3 requests/second without an API key

use std::sync::Arc;

use async_trait::async_trait;

use super::traits::{FetchMetadata, SourceError, SourceMetadata};
use crate::csl::CslItem;
use crate::http::HttpClient;

const CTXP_BASE: &str = "https://api.ncbi.nlm.nih.gov/lit/ctxp/v1";

async fn fetch_ctxp(
    client: &HttpClient,
    database: &str,
    identifier: &str,
) -> Result<CslItem, SourceError> {
    let url = format!(
        "{CTXP_BASE}/{database}/?format=csl&id={}",
        urlencoding::encode(identifier)
    );
    let response = client.get_with_retry(&url, &[]).await?;
    match response.status {
        404 => Err(SourceError::NotFound),
        200 => parse_ctxp_response(&response.body),
        status => Err(SourceError::Parse(format!(
            "unexpected status {status} from NCBI citation exporter"
        ))),
    }
}

pub(crate) fn parse_ctxp_response(json: &str) -> Result<CslItem, SourceError> {
    let item: CslItem = serde_json::from_str(json)
        .map_err(|e| SourceError::Parse(format!("invalid CSL JSON: {e}")))?;
    // The exporter reports unknown identifiers inside a 200 response
    if item.get("error").is_some() || item.0.is_empty() {
        return Err(SourceError::NotFound);
    }
    Ok(item)
}

pub struct PubmedSource {
    client: Arc<HttpClient>,
}

impl PubmedSource {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FetchMetadata for PubmedSource {
    fn info(&self) -> SourceMetadata {
        SourceMetadata {
            id: "pubmed",
            name: "PubMed",
            description: "Biomedical literature from MEDLINE and life science journals",
            base_url: "https://pubmed.ncbi.nlm.nih.gov",
            rate_limit_per_second: 3.0,
        }
    }

    async fn fetch(&self, identifier: &str) -> Result<CslItem, SourceError> {
        fetch_ctxp(&self.client, "pubmed", identifier).await
    }
}

pub struct PmcSource {
    client: Arc<HttpClient>,
}

impl PmcSource {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl FetchMetadata for PmcSource {
    fn info(&self) -> SourceMetadata {
        SourceMetadata {
            id: "pmc",
            name: "PubMed Central",
            description: "Free full-text archive of biomedical literature",
            base_url: "https://www.ncbi.nlm.nih.gov/pmc",
            rate_limit_per_second: 3.0,
        }
    }

    async fn fetch(&self, identifier: &str) -> Result<CslItem, SourceError> {
        fetch_ctxp(&self.client, "pmc", identifier).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_CTXP: &str = r#"{
        "type": "article-journal",
        "PMID": "29424689",
        "title": "Sci-Hub provides access to nearly all scholarly literature",
        "container-title": "eLife",
        "author": [{"family": "Himmelstein", "given": "Daniel S"}],
        "issued": {"date-parts": [[2018, 3, 1]]}
    }"#;

    #[test]
    fn test_parse_ctxp_response() {
        let item = parse_ctxp_response(SAMPLE_CTXP).unwrap();
        assert_eq!(item.item_type(), Some("article-journal"));
        assert_eq!(item.get("PMID").and_then(|v| v.as_str()), Some("29424689"));
    }

    #[test]
    fn test_parse_ctxp_error_body_is_not_found() {
        let json = r#"{"error": "The query id is invalid"}"#;
        assert!(matches!(
            parse_ctxp_response(json),
            Err(SourceError::NotFound)
        ));
    }
}
