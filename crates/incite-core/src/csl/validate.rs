//! CSL item validation and pruning
//!
//! In strict mode, fields that violate the CSL JSON item schema are removed
//! until the item conforms; items that cannot be made to conform (missing
//! `id`, missing or unknown `type`) are rejected. In lenient mode items pass
//! through unchanged.

use serde_json::Value;
use thiserror::Error;

use super::CslItem;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("CSL schema violation: {message}")]
pub struct SchemaError {
    pub message: String,
}

impl SchemaError {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// CSL 1.0.1 item types
const CSL_TYPES: &[&str] = &[
    "article",
    "article-journal",
    "article-magazine",
    "article-newspaper",
    "bill",
    "book",
    "broadcast",
    "chapter",
    "dataset",
    "entry",
    "entry-dictionary",
    "entry-encyclopedia",
    "figure",
    "graphic",
    "interview",
    "legal_case",
    "legislation",
    "manuscript",
    "map",
    "motion_picture",
    "musical_score",
    "pamphlet",
    "paper-conference",
    "patent",
    "personal_communication",
    "post",
    "post-weblog",
    "report",
    "review",
    "review-book",
    "song",
    "speech",
    "thesis",
    "treaty",
    "webpage",
];

/// CSL name variables: arrays of name objects
const NAME_FIELDS: &[&str] = &[
    "author",
    "collection-editor",
    "composer",
    "container-author",
    "director",
    "editor",
    "editorial-director",
    "illustrator",
    "interviewer",
    "original-author",
    "recipient",
    "reviewed-author",
    "translator",
];

const NAME_SUBFIELDS: &[&str] = &[
    "family",
    "given",
    "dropping-particle",
    "non-dropping-particle",
    "suffix",
    "comma-suffix",
    "static-ordering",
    "literal",
    "parse-names",
];

/// CSL date variables: objects with date-parts or literal/raw forms
const DATE_FIELDS: &[&str] = &[
    "accessed",
    "container",
    "event-date",
    "issued",
    "original-date",
    "submitted",
];

const DATE_SUBFIELDS: &[&str] = &["date-parts", "season", "circa", "literal", "raw"];

/// CSL ordinary variables: strings or numbers
const STANDARD_FIELDS: &[&str] = &[
    "id",
    "type",
    "abstract",
    "annote",
    "archive",
    "archive_location",
    "archive-place",
    "authority",
    "call-number",
    "chapter-number",
    "citation-label",
    "citation-number",
    "collection-number",
    "collection-title",
    "container-title",
    "container-title-short",
    "dimensions",
    "DOI",
    "edition",
    "event",
    "event-place",
    "first-reference-note-number",
    "genre",
    "ISBN",
    "ISSN",
    "issue",
    "journalAbbreviation",
    "jurisdiction",
    "keyword",
    "language",
    "locator",
    "medium",
    "note",
    "number",
    "number-of-pages",
    "number-of-volumes",
    "original-publisher",
    "original-publisher-place",
    "original-title",
    "page",
    "page-first",
    "PMCID",
    "PMID",
    "publisher",
    "publisher-place",
    "references",
    "reviewed-title",
    "scale",
    "section",
    "shortTitle",
    "source",
    "status",
    "title",
    "title-short",
    "URL",
    "version",
    "volume",
    "year-suffix",
];

/// Validate an item against the CSL item schema.
///
/// Strict mode returns a pruned copy conforming to the schema, or a
/// `SchemaError` if no conforming item can be produced. Lenient mode
/// returns the item unchanged.
pub fn validate_and_prune(item: &CslItem, strict: bool) -> Result<CslItem, SchemaError> {
    if !strict {
        return Ok(item.clone());
    }

    let mut pruned = CslItem::new();
    for (field, value) in &item.0 {
        if NAME_FIELDS.contains(&field.as_str()) {
            match prune_name_list(value) {
                Some(names) => pruned.insert(field, names),
                None => {
                    tracing::debug!(field, "pruning malformed CSL name variable");
                }
            }
        } else if DATE_FIELDS.contains(&field.as_str()) {
            match prune_date(value) {
                Some(date) => pruned.insert(field, date),
                None => {
                    tracing::debug!(field, "pruning malformed CSL date variable");
                }
            }
        } else if field == "categories" {
            // Array of strings
            match value {
                Value::Array(items) if items.iter().all(Value::is_string) => {
                    pruned.insert(field, value.clone());
                }
                _ => tracing::debug!(field, "pruning malformed CSL categories"),
            }
        } else if STANDARD_FIELDS.contains(&field.as_str()) {
            if value.is_string() || value.is_number() || value.is_boolean() {
                pruned.insert(field, value.clone());
            } else {
                tracing::debug!(field, "pruning CSL field with invalid value shape");
            }
        } else {
            tracing::debug!(field, "pruning field not in the CSL item schema");
        }
    }

    match pruned.id() {
        Some(id) if !id.is_empty() => {}
        _ => return Err(SchemaError::new("item is missing the mandatory `id` field")),
    }
    match pruned.item_type() {
        Some(item_type) if CSL_TYPES.contains(&item_type) => {}
        Some(item_type) => {
            return Err(SchemaError::new(format!(
                "item type {item_type:?} is not a CSL item type"
            )))
        }
        None => {
            return Err(SchemaError::new(
                "item is missing the mandatory `type` field",
            ))
        }
    }

    Ok(pruned)
}

/// Keep well-formed name objects (with their known subfields) and drop the
/// rest. A name list with no valid entries is dropped entirely.
fn prune_name_list(value: &Value) -> Option<Value> {
    let entries = value.as_array()?;
    let mut names = Vec::new();
    for entry in entries {
        let Some(object) = entry.as_object() else {
            continue;
        };
        let kept: serde_json::Map<String, Value> = object
            .iter()
            .filter(|(key, value)| {
                NAME_SUBFIELDS.contains(&key.as_str())
                    && (value.is_string() || value.is_boolean())
            })
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        if !kept.is_empty() {
            names.push(Value::Object(kept));
        }
    }
    if names.is_empty() {
        None
    } else {
        Some(Value::Array(names))
    }
}

fn prune_date(value: &Value) -> Option<Value> {
    let object = value.as_object()?;
    let mut kept = serde_json::Map::new();
    for (key, value) in object {
        if !DATE_SUBFIELDS.contains(&key.as_str()) {
            continue;
        }
        if key == "date-parts" {
            if valid_date_parts(value) {
                kept.insert(key.clone(), value.clone());
            }
        } else {
            kept.insert(key.clone(), value.clone());
        }
    }
    if kept.is_empty() {
        None
    } else {
        Some(Value::Object(kept))
    }
}

/// date-parts is an array of 1-3 element [year, month, day] arrays
fn valid_date_parts(value: &Value) -> bool {
    let Some(parts) = value.as_array() else {
        return false;
    };
    !parts.is_empty()
        && parts.iter().all(|part| {
            part.as_array().is_some_and(|fields| {
                (1..=3).contains(&fields.len())
                    && fields
                        .iter()
                        .all(|field| field.is_number() || field.is_string())
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(value: serde_json::Value) -> CslItem {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_strict_strips_unknown_field() {
        let input = item(json!({
            "id": "doi:10.1234/test",
            "type": "article-journal",
            "title": "A Test Paper",
            "citation-count": 42
        }));
        let pruned = validate_and_prune(&input, true).unwrap();
        assert!(pruned.get("citation-count").is_none());
        assert_eq!(pruned.get("title"), Some(&json!("A Test Paper")));
    }

    #[test]
    fn test_lenient_passes_through_unchanged() {
        let input = item(json!({
            "id": "doi:10.1234/test",
            "type": "article-journal",
            "citation-count": 42
        }));
        let output = validate_and_prune(&input, false).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn test_missing_id_rejected() {
        let input = item(json!({"type": "book", "title": "No Id"}));
        assert!(validate_and_prune(&input, true).is_err());
    }

    #[test]
    fn test_missing_type_rejected() {
        let input = item(json!({"id": "raw:thing", "title": "No Type"}));
        assert!(validate_and_prune(&input, true).is_err());
    }

    #[test]
    fn test_unknown_type_rejected() {
        let input = item(json!({"id": "raw:thing", "type": "preprint"}));
        assert!(validate_and_prune(&input, true).is_err());
    }

    #[test]
    fn test_name_entries_pruned_of_extra_subfields() {
        let input = item(json!({
            "id": "doi:10.1234/test",
            "type": "article-journal",
            "author": [
                {"family": "Smith", "given": "John", "affiliation": "Somewhere"},
                "not-a-name"
            ]
        }));
        let pruned = validate_and_prune(&input, true).unwrap();
        assert_eq!(
            pruned.get("author"),
            Some(&json!([{"family": "Smith", "given": "John"}]))
        );
    }

    #[test]
    fn test_malformed_date_dropped() {
        let input = item(json!({
            "id": "doi:10.1234/test",
            "type": "article-journal",
            "issued": {"date-parts": "2023"},
            "accessed": {"date-parts": [[2023, 1, 15]]}
        }));
        let pruned = validate_and_prune(&input, true).unwrap();
        assert!(pruned.get("issued").is_none());
        assert_eq!(
            pruned.get("accessed"),
            Some(&json!({"date-parts": [[2023, 1, 15]]}))
        );
    }

    #[test]
    fn test_field_with_wrong_shape_pruned() {
        let input = item(json!({
            "id": "doi:10.1234/test",
            "type": "article-journal",
            "title": {"value": "nested"}
        }));
        let pruned = validate_and_prune(&input, true).unwrap();
        assert!(pruned.get("title").is_none());
    }
}
