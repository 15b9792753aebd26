//! ISBN provider using the Open Library books API
//!
//! https://openlibrary.org/dev/docs/api/books

use std::sync::Arc;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use serde::Deserialize;
use serde_json::json;

use super::traits::{FetchMetadata, SourceError, SourceMetadata};
use crate::csl::CslItem;
use crate::http::HttpClient;

lazy_static! {
    static ref YEAR_PATTERN: Regex = Regex::new(r"\d{4}").unwrap();
}

pub struct IsbnSource {
    client: Arc<HttpClient>,
}

impl IsbnSource {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct OpenLibraryEdition {
    title: String,
    subtitle: Option<String>,
    publish_date: Option<String>,
    publishers: Option<Vec<String>>,
    number_of_pages: Option<i64>,
}

pub(crate) fn parse_edition_response(json_body: &str, isbn: &str) -> Result<CslItem, SourceError> {
    let edition: OpenLibraryEdition = serde_json::from_str(json_body)
        .map_err(|e| SourceError::Parse(format!("invalid Open Library JSON: {e}")))?;

    let title = match edition.subtitle {
        Some(subtitle) => format!("{}: {}", edition.title, subtitle),
        None => edition.title,
    };

    let mut item = CslItem::new();
    item.insert("type", json!("book"));
    item.insert("title", json!(title));
    item.insert("ISBN", json!(isbn));
    if let Some(publisher) = edition.publishers.and_then(|p| p.into_iter().next()) {
        item.insert("publisher", json!(publisher));
    }
    if let Some(pages) = edition.number_of_pages {
        item.insert("number-of-pages", json!(pages.to_string()));
    }
    // Publish dates are free text ("March 2004", "2004"); keep the year
    if let Some(year) = edition
        .publish_date
        .as_deref()
        .and_then(|date| YEAR_PATTERN.find(date))
        .and_then(|m| m.as_str().parse::<i64>().ok())
    {
        item.insert("issued", json!({ "date-parts": [[year]] }));
    }
    Ok(item)
}

#[async_trait]
impl FetchMetadata for IsbnSource {
    fn info(&self) -> SourceMetadata {
        SourceMetadata {
            id: "isbn",
            name: "Open Library",
            description: "Book metadata from the Internet Archive's Open Library",
            base_url: "https://openlibrary.org",
            rate_limit_per_second: 1.0,
        }
    }

    async fn fetch(&self, identifier: &str) -> Result<CslItem, SourceError> {
        let url = format!(
            "https://openlibrary.org/isbn/{}.json",
            urlencoding::encode(identifier)
        );
        let response = self.client.get_with_retry(&url, &[]).await?;
        match response.status {
            404 => Err(SourceError::NotFound),
            200 => parse_edition_response(&response.body, identifier),
            status => Err(SourceError::Parse(format!(
                "unexpected status {status} from Open Library"
            ))),
        }
    }
}
