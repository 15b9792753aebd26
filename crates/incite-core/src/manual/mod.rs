//! Manual reference files
//!
//! Hand-maintained bibliography entries that override anything a provider
//! would fetch. Any file in the content directory whose name starts with
//! `manual-references` is loaded. JSON and YAML are read directly; every
//! other extension is converted through pandoc.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::csl::CslItem;
use crate::error::{FailureKind, PipelineError, ResolveFailure};

/// Manually curated CSL items, keyed by their standard citekey.
#[derive(Debug, Default)]
pub struct ManualReferences {
    items: BTreeMap<String, CslItem>,
}

impl ManualReferences {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn get(&self, standard_citekey: &str) -> Option<&CslItem> {
        self.items.get(standard_citekey)
    }

    pub fn contains(&self, standard_citekey: &str) -> bool {
        self.items.contains_key(standard_citekey)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CslItem)> {
        self.items.iter()
    }
}

/// Load every `manual-references*` file under `content_dir`.
///
/// Files are processed in descending lexicographic filename order and the
/// first item seen for a citekey wins, so `manual-references.json` overrides
/// `manual-references-2020.json`. A file that cannot be parsed is reported
/// as a failure without sinking the rest. A missing or unreadable content
/// directory aborts the run.
pub fn load_manual_references(
    content_dir: &Path,
) -> Result<(ManualReferences, Vec<ResolveFailure>), PipelineError> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(content_dir)
        .map_err(|e| {
            PipelineError::ContentScope(format!(
                "cannot read content directory {}: {e}",
                content_dir.display()
            ))
        })?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|name| name.to_str())
                    .map(|name| name.starts_with("manual-references"))
                    .unwrap_or(false)
        })
        .collect();
    paths.sort_by(|a, b| b.file_name().cmp(&a.file_name()));

    let mut references = ManualReferences::empty();
    let mut failures = Vec::new();

    for path in &paths {
        let file_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("manual-references")
            .to_string();
        let items = match load_reference_file(path) {
            Ok(items) => items,
            Err(message) => {
                tracing::warn!(file = %file_name, %message, "skipping manual reference file");
                failures.push(ResolveFailure::new(
                    file_name,
                    FailureKind::InvalidManualReference,
                    message,
                ));
                continue;
            }
        };
        for mut item in items {
            item.note_append_dict(&[("manual_reference_filename", &file_name)]);
            let citekey = match item.standardize_id() {
                Ok(citekey) => citekey,
                Err(e) => {
                    tracing::warn!(file = %file_name, error = %e, "skipping manual reference item");
                    failures.push(ResolveFailure::new(
                        item.id().unwrap_or(""),
                        FailureKind::InvalidManualReference,
                        e.to_string(),
                    ));
                    continue;
                }
            };
            references.items.entry(citekey.standard()).or_insert(item);
        }
    }

    Ok((references, failures))
}

fn load_reference_file(path: &Path) -> Result<Vec<CslItem>, String> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match extension.as_str() {
        "json" => {
            let text = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
            serde_json::from_str(&text).map_err(|e| format!("invalid CSL JSON: {e}"))
        }
        "yaml" | "yml" => {
            let text = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
            serde_yaml::from_str(&text).map_err(|e| format!("invalid CSL YAML: {e}"))
        }
        _ => convert_with_pandoc(path),
    }
}

/// Other bibliography formats (BibTeX and friends) are delegated to pandoc,
/// which knows how to read them all and emit CSL JSON.
fn convert_with_pandoc(path: &Path) -> Result<Vec<CslItem>, String> {
    let output = Command::new("pandoc")
        .arg(path)
        .args(["--to", "csljson"])
        .output()
        .map_err(|e| format!("failed to run pandoc: {e}"))?;
    if !output.status.success() {
        return Err(format!(
            "pandoc exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }
    serde_json::from_slice(&output.stdout).map_err(|e| format!("invalid pandoc CSL JSON: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) {
        fs::write(dir.path().join(name), content).unwrap();
    }

    #[test]
    fn test_missing_directory_is_fatal() {
        let result = load_manual_references(Path::new("/nonexistent/content"));
        assert!(matches!(result, Err(PipelineError::ContentScope(_))));
    }

    #[test]
    fn test_load_json_references() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "manual-references.json",
            r#"[{"id": "doi:10.1234/test", "type": "article-journal", "title": "Manual"}]"#,
        );
        let (refs, failures) = load_manual_references(dir.path()).unwrap();
        assert!(failures.is_empty());
        let item = refs.get("doi:10.1234/test").unwrap();
        assert_eq!(item.get("title").unwrap(), "Manual");
        assert_eq!(
            item.note_dict()
                .get("manual_reference_filename")
                .map(String::as_str),
            Some("manual-references.json")
        );
    }

    #[test]
    fn test_earlier_file_in_descending_order_wins() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "manual-references-a.json",
            r#"[{"id": "raw:key", "type": "report", "title": "From A"}]"#,
        );
        write(
            &dir,
            "manual-references-b.json",
            r#"[{"id": "raw:key", "type": "report", "title": "From B"}]"#,
        );
        let (refs, _) = load_manual_references(dir.path()).unwrap();
        assert_eq!(refs.get("raw:key").unwrap().get("title").unwrap(), "From B");
    }

    #[test]
    fn test_sort_is_lexicographic_not_numeric() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "manual-references-10.json",
            r#"[{"id": "raw:key", "type": "report", "title": "Ten"}]"#,
        );
        write(
            &dir,
            "manual-references-2.json",
            r#"[{"id": "raw:key", "type": "report", "title": "Two"}]"#,
        );
        let (refs, _) = load_manual_references(dir.path()).unwrap();
        // "-2" sorts after "-10", so it is processed first and wins.
        assert_eq!(refs.get("raw:key").unwrap().get("title").unwrap(), "Two");
    }

    #[test]
    fn test_invalid_file_reported_not_fatal() {
        let dir = TempDir::new().unwrap();
        write(&dir, "manual-references-bad.json", "not json");
        write(
            &dir,
            "manual-references.json",
            r#"[{"id": "raw:good", "type": "report"}]"#,
        );
        let (refs, failures) = load_manual_references(dir.path()).unwrap();
        assert!(refs.contains("raw:good"));
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].kind, FailureKind::InvalidManualReference);
        assert_eq!(failures[0].citekey, "manual-references-bad.json");
    }

    #[test]
    fn test_item_without_id_reported() {
        let dir = TempDir::new().unwrap();
        write(
            &dir,
            "manual-references.yaml",
            "- type: book\n  title: No Id\n",
        );
        let (refs, failures) = load_manual_references(dir.path()).unwrap();
        assert!(refs.is_empty());
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].kind, FailureKind::InvalidManualReference);
    }

    #[test]
    fn test_other_files_ignored() {
        let dir = TempDir::new().unwrap();
        write(&dir, "references.json", r#"[{"id": "raw:x", "type": "report"}]"#);
        write(&dir, "01.main-text.md", "Some prose with @doi:10.1/x\n");
        let (refs, failures) = load_manual_references(dir.path()).unwrap();
        assert!(refs.is_empty());
        assert!(failures.is_empty());
    }
}
