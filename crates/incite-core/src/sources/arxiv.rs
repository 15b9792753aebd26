//! arXiv provider with XML Atom feed parsing
//!
//! API docs: https://arxiv.org/help/api/user-manual
//! Rate limit: 1 request per 3 seconds

use std::sync::Arc;

use async_trait::async_trait;
use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::{json, Value};

use super::traits::{FetchMetadata, SourceError, SourceMetadata};
use crate::csl::CslItem;
use crate::http::HttpClient;

pub struct ArxivSource {
    client: Arc<HttpClient>,
    base_url: String,
}

impl ArxivSource {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self {
            client,
            base_url: "https://export.arxiv.org/api/query".to_string(),
        }
    }
}

#[async_trait]
impl FetchMetadata for ArxivSource {
    fn info(&self) -> SourceMetadata {
        SourceMetadata {
            id: "arxiv",
            name: "arXiv",
            description: "Open-access preprint server for physics, math, CS, and more",
            base_url: "https://arxiv.org",
            rate_limit_per_second: 0.33, // 1 per 3 seconds
        }
    }

    async fn fetch(&self, identifier: &str) -> Result<CslItem, SourceError> {
        let clean_id = identifier
            .trim_start_matches("arXiv:")
            .trim_start_matches("arxiv:");
        let url = format!(
            "{}?id_list={}",
            self.base_url,
            urlencoding::encode(clean_id)
        );
        let response = self.client.get_with_retry(&url, &[]).await?;
        if response.status != 200 {
            return Err(SourceError::Parse(format!(
                "unexpected status {} from arXiv API",
                response.status
            )));
        }
        parse_atom_response(&response.body, clean_id)
    }
}

/// Parse the first entry of an arXiv Atom feed into a CSL item.
///
/// Unknown identifiers produce either an empty feed or an error entry whose
/// id points at `api/errors`; both surface as `NotFound`.
pub(crate) fn parse_atom_response(xml: &str, arxiv_id: &str) -> Result<CslItem, SourceError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buf = Vec::new();
    let mut path: Vec<String> = Vec::new();

    let mut in_entry = false;
    let mut entry_id = String::new();
    let mut title = String::new();
    let mut summary = String::new();
    let mut published = String::new();
    let mut doi = String::new();
    let mut authors: Vec<String> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "entry" {
                    in_entry = true;
                }
                path.push(name);
            }
            Ok(Event::End(ref e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "entry" && in_entry {
                    // Only the first entry is used; id_list queries return one
                    break;
                }
                path.pop();
            }
            Ok(Event::Text(e)) => {
                if !in_entry {
                    buf.clear();
                    continue;
                }
                let text = e.unescape().unwrap_or_default().to_string();
                match path.last().map(String::as_str) {
                    Some("id") if entry_id.is_empty() => entry_id = text,
                    Some("title") => title = normalize_whitespace(&text),
                    Some("summary") => summary = normalize_whitespace(&text),
                    Some("published") if published.is_empty() => published = text,
                    Some("arxiv:doi") => doi = text,
                    Some("name") if path.iter().any(|p| p == "author") => {
                        authors.push(text);
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(SourceError::Parse(format!("XML parse error: {e}"))),
            _ => {}
        }
        buf.clear();
    }

    if !in_entry || title.is_empty() || entry_id.contains("api/errors") {
        return Err(SourceError::NotFound);
    }

    let mut item = CslItem::new();
    item.insert("type", json!("article"));
    item.insert("title", json!(title));
    item.insert("container-title", json!("arXiv"));
    item.insert("URL", json!(format!("https://arxiv.org/abs/{arxiv_id}")));
    item.insert("number", json!(format!("arXiv:{arxiv_id}")));
    if !summary.is_empty() {
        item.insert("abstract", json!(summary));
    }
    if !doi.is_empty() {
        item.insert("DOI", json!(doi));
    }
    if let Some(date_parts) = parse_date_parts(&published) {
        item.insert("issued", json!({ "date-parts": [date_parts] }));
    }
    if !authors.is_empty() {
        let names: Vec<Value> = authors.iter().map(|name| split_name(name)).collect();
        item.insert("author", Value::Array(names));
    }
    Ok(item)
}

/// Atom feeds wrap long titles; collapse internal whitespace runs.
fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `2018-04-01T17:46:20Z` -> `[2018, 4, 1]`
fn parse_date_parts(timestamp: &str) -> Option<Vec<i64>> {
    let date = timestamp.split('T').next()?;
    let parts: Vec<i64> = date
        .splitn(3, '-')
        .filter_map(|part| part.parse().ok())
        .collect();
    if parts.is_empty() {
        None
    } else {
        Some(parts)
    }
}

/// arXiv reports display names; the last whitespace-separated word becomes
/// the family name.
fn split_name(name: &str) -> Value {
    match name.rsplit_once(' ') {
        Some((given, family)) => json!({ "given": given, "family": family }),
        None => json!({ "literal": name }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <title type="html">ArXiv Query: search_query=&amp;id_list=1706.03762</title>
  <entry>
    <id>http://arxiv.org/abs/1706.03762v7</id>
    <updated>2023-08-02T00:41:18Z</updated>
    <published>2017-06-12T17:57:34Z</published>
    <title>Attention Is All
  You Need</title>
    <summary>The dominant sequence transduction models are based on complex
  recurrent or convolutional neural networks.</summary>
    <author>
      <name>Ashish Vaswani</name>
    </author>
    <author>
      <name>Noam Shazeer</name>
    </author>
    <arxiv:doi xmlns:arxiv="http://arxiv.org/schemas/atom">10.48550/arXiv.1706.03762</arxiv:doi>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_atom_response() {
        let item = parse_atom_response(SAMPLE_FEED, "1706.03762").unwrap();
        assert_eq!(item.item_type(), Some("article"));
        assert_eq!(
            item.get("title").and_then(|v| v.as_str()),
            Some("Attention Is All You Need")
        );
        assert_eq!(
            item.get("issued"),
            Some(&json!({"date-parts": [[2017, 6, 12]]}))
        );
        assert_eq!(
            item.get("author"),
            Some(&json!([
                {"given": "Ashish", "family": "Vaswani"},
                {"given": "Noam", "family": "Shazeer"}
            ]))
        );
        assert_eq!(
            item.get("DOI").and_then(|v| v.as_str()),
            Some("10.48550/arXiv.1706.03762")
        );
        assert_eq!(
            item.get("URL").and_then(|v| v.as_str()),
            Some("https://arxiv.org/abs/1706.03762")
        );
    }

    const EMPTY_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title type="html">ArXiv Query: search_query=&amp;id_list=</title>
</feed>"#;

    #[test]
    fn test_empty_feed_is_not_found() {
        assert!(matches!(
            parse_atom_response(EMPTY_FEED, "0000.00000"),
            Err(SourceError::NotFound)
        ));
    }

    #[test]
    fn test_split_name_single_word() {
        assert_eq!(split_name("Collaboration"), json!({"literal": "Collaboration"}));
    }
}
