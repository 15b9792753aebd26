//! CSL JSON item wrapper

use incite_identifiers::{Citekey, CitekeyError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::note;

/// One CSL JSON item: a mapping of CSL field names to values, with a
/// mandatory `id` once resolved. Kept schemaless so provider responses and
/// manual references survive untouched until validation prunes them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CslItem(pub Map<String, Value>);

impl CslItem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&self) -> Option<&str> {
        self.0.get("id").and_then(Value::as_str)
    }

    pub fn set_id(&mut self, id: &str) {
        self.0
            .insert("id".to_string(), Value::String(id.to_string()));
    }

    pub fn item_type(&self) -> Option<&str> {
        self.0.get("type").and_then(Value::as_str)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: &str, value: Value) {
        self.0.insert(field.to_string(), value);
    }

    fn note(&self) -> String {
        match self.0.get("note") {
            Some(Value::String(note)) => note.clone(),
            _ => String::new(),
        }
    }

    fn set_note(&mut self, note: String) {
        if note.is_empty() {
            self.0.remove("note");
        } else {
            self.0.insert("note".to_string(), Value::String(note));
        }
    }

    /// Append free text to the `note` field.
    pub fn note_append_text(&mut self, text: &str) {
        let mut note = self.note();
        note::append_note_text(&mut note, text);
        self.set_note(note);
    }

    /// Append `key: value` entries to the `note` field.
    pub fn note_append_dict(&mut self, pairs: &[(&str, &str)]) {
        let mut note = self.note();
        note::append_note_dict(&mut note, pairs);
        self.set_note(note);
    }

    /// Key-value pairs encoded in the `note` field.
    pub fn note_dict(&self) -> std::collections::HashMap<String, String> {
        note::parse_note(&self.note())
    }

    /// Derive the standard citekey for this item and set its `id` field to
    /// the standardized `source:identifier` string.
    ///
    /// The citekey is taken from a `standard_citation` field, a
    /// `standard_id` note entry, or the `id` field, in that order of
    /// precedence. An `id` without a recognized source prefix is assumed raw
    /// and given the `raw:` prefix. The original id is preserved in the note
    /// when it differs from the standard one.
    pub fn standardize_id(&mut self) -> Result<Citekey, CitekeyError> {
        let note_dict = self.note_dict();

        let original_id = self.id().map(str::to_string);
        let mut original_standard = original_id.clone();
        if let Some(hint) = note_dict.get("standard_id") {
            original_standard = Some(hint.clone());
        }
        if let Some(Value::String(existing)) = self.0.remove("standard_citation") {
            original_standard = Some(existing);
        }

        let original_standard =
            original_standard.ok_or_else(|| CitekeyError::Malformed {
                citekey: String::new(),
                reason: "item has no id, standard_id note entry, or standard_citation field"
                    .to_string(),
            })?;

        let citekey = Citekey::infer(&original_standard)?;
        let standard = citekey.standard();

        let mut additions: Vec<(&str, &str)> = Vec::new();
        if let Some(ref original) = original_id {
            if *original != standard && note_dict.get("original_id") != Some(original) {
                additions.push(("original_id", original));
            }
        }
        if original_standard != standard
            && note_dict.get("original_standard_id") != Some(&original_standard)
        {
            additions.push(("original_standard_id", &original_standard));
        }
        if note_dict.get("standard_id") != Some(&standard) {
            additions.push(("standard_id", &standard));
        }
        self.note_append_dict(&additions);

        self.set_id(&standard);
        Ok(citekey)
    }
}

impl From<Map<String, Value>> for CslItem {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
