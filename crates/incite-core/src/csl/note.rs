//! Key-value pairs encoded in a CSL `note` field
//!
//! The note field carries values not defined by the CSL JSON schema using
//! citeproc-js "cheater syntax": either one `key: value` pair per line, or
//! braced `{:key: value}` entries. Variable names are restricted to
//! `[A-Z]+` or `[-_a-z]+`.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref NOTE_KEY: Regex = Regex::new(r"^([A-Z]+|[-_a-z]+)$").unwrap();
    static ref LINE_ENTRY: Regex =
        Regex::new(r"(?m)^(?P<key>[A-Z]+|[-_a-z]+): *(?P<value>.+?) *$").unwrap();
    static ref BRACED_ENTRY: Regex =
        Regex::new(r"\{:(?P<key>[A-Z]+|[-_a-z]+): *(?P<value>.+?) *\}").unwrap();
}

/// Append free text to a note, starting a new line if needed.
pub fn append_note_text(note: &mut String, text: &str) {
    if text.is_empty() {
        return;
    }
    if !note.is_empty() && !note.ends_with('\n') {
        note.push('\n');
    }
    note.push_str(text);
}

/// Append `key: value` line entries to a note. Keys that do not conform to
/// the variable-name syntax, and values containing newlines, are skipped.
pub fn append_note_dict(note: &mut String, pairs: &[(&str, &str)]) {
    for (key, value) in pairs {
        if !NOTE_KEY.is_match(key) {
            tracing::warn!(key, "skipping note entry: invalid variable name");
            continue;
        }
        if value.contains('\n') {
            tracing::warn!(key, "skipping note entry: value contains a newline");
            continue;
        }
        append_note_text(note, &format!("{key}: {value}"));
    }
}

/// Extract both entry forms (line and braced) from a note.
pub fn parse_note(note: &str) -> HashMap<String, String> {
    let mut entries = HashMap::new();
    for capture in LINE_ENTRY.captures_iter(note) {
        entries.insert(capture["key"].to_string(), capture["value"].to_string());
    }
    for capture in BRACED_ENTRY.captures_iter(note) {
        entries.insert(capture["key"].to_string(), capture["value"].to_string());
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_text_inserts_newline() {
        let mut note = "first line".to_string();
        append_note_text(&mut note, "second line");
        assert_eq!(note, "first line\nsecond line");
    }

    #[test]
    fn test_append_dict_and_parse_roundtrip() {
        let mut note = String::new();
        append_note_dict(
            &mut note,
            &[
                ("standard_id", "doi:10.1038/nature12373"),
                ("manual_reference_filename", "manual-references.json"),
            ],
        );
        let parsed = parse_note(&note);
        assert_eq!(
            parsed.get("standard_id").map(String::as_str),
            Some("doi:10.1038/nature12373")
        );
        assert_eq!(
            parsed.get("manual_reference_filename").map(String::as_str),
            Some("manual-references.json")
        );
    }

    #[test]
    fn test_append_dict_skips_invalid_keys() {
        let mut note = String::new();
        append_note_dict(&mut note, &[("Bad Key", "value"), ("multi", "a\nb")]);
        assert!(note.is_empty());
    }

    #[test]
    fn test_parse_braced_entries() {
        let parsed = parse_note("Generated note.\n{:standard_id: pmid:29424689}");
        assert_eq!(
            parsed.get("standard_id").map(String::as_str),
            Some("pmid:29424689")
        );
    }

    #[test]
    fn test_parse_ignores_prose() {
        let parsed = parse_note("This item was fetched automatically.\nSee also: nothing");
        // "See also" contains a space so it is not a variable name
        assert!(parsed.is_empty());
    }
}
