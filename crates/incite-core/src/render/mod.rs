//! Bibliography rendering through pandoc
//!
//! Resolved CSL items are handed to `pandoc --citeproc` as a metadata block
//! with a wildcard nocite, so the bibliography lists every item without any
//! in-text citations.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use thiserror::Error;

use crate::csl::CslItem;

/// Supported bibliography output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Plain,
    Markdown,
    Html,
    Jats,
    Docx,
}

impl OutputFormat {
    /// Map a file extension to a format.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "txt" => Some(OutputFormat::Plain),
            "md" => Some(OutputFormat::Markdown),
            "html" | "htm" => Some(OutputFormat::Html),
            "xml" => Some(OutputFormat::Jats),
            "docx" => Some(OutputFormat::Docx),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// The pandoc writer name for this format.
    pub fn pandoc_to(self) -> &'static str {
        match self {
            OutputFormat::Plain => "plain",
            OutputFormat::Markdown => "markdown_strict",
            OutputFormat::Html => "html",
            OutputFormat::Jats => "jats",
            OutputFormat::Docx => "docx",
        }
    }

    /// Binary formats must go to a file, not a terminal.
    pub fn is_binary(self) -> bool {
        matches!(self, OutputFormat::Docx)
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "plain" | "txt" => Ok(OutputFormat::Plain),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "html" => Ok(OutputFormat::Html),
            "jats" => Ok(OutputFormat::Jats),
            "docx" => Ok(OutputFormat::Docx),
            other => Err(format!(
                "unknown output format {other:?}, expected plain, markdown, html, jats, or docx"
            )),
        }
    }
}

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("pandoc not found on PATH; install pandoc to render bibliographies")]
    PandocMissing,
    #[error("pandoc failed with {status}: {stderr}")]
    Pandoc { status: String, stderr: String },
    #[error("render I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("could not serialize references: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Render `items` as a formatted bibliography.
///
/// `csl_style` is a path or URL to a CSL style file, passed through to
/// pandoc. With `output` set the result lands in that file; otherwise pandoc
/// writes to stdout.
pub fn render(
    items: &[CslItem],
    csl_style: Option<&str>,
    format: OutputFormat,
    output: Option<&Path>,
) -> Result<(), RenderError> {
    let document = pandoc_input(items, csl_style)?;

    let mut command = Command::new("pandoc");
    command
        .args(["--from", "markdown", "--citeproc", "--to", format.pandoc_to()])
        .stdin(Stdio::piped());
    if let Some(path) = output {
        command.arg("--output").arg(path);
    } else {
        command.arg("--standalone");
    }

    let mut child = command.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            RenderError::PandocMissing
        } else {
            RenderError::Io {
                path: PathBuf::from("pandoc"),
                source: e,
            }
        }
    })?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(document.as_bytes())
            .map_err(|source| RenderError::Io {
                path: PathBuf::from("pandoc stdin"),
                source,
            })?;
    }

    let result = child.wait_with_output().map_err(|source| RenderError::Io {
        path: PathBuf::from("pandoc"),
        source,
    })?;
    if !result.status.success() {
        return Err(RenderError::Pandoc {
            status: result.status.to_string(),
            stderr: String::from_utf8_lossy(&result.stderr).trim().to_string(),
        });
    }
    Ok(())
}

/// The markdown document fed to pandoc: a YAML-compatible JSON metadata
/// block carrying the references and a wildcard nocite, with no body.
fn pandoc_input(items: &[CslItem], csl_style: Option<&str>) -> Result<String, RenderError> {
    let mut metadata = serde_json::Map::new();
    metadata.insert(
        "nocite".to_string(),
        serde_json::Value::String("@*".to_string()),
    );
    metadata.insert("references".to_string(), serde_json::to_value(items)?);
    if let Some(style) = csl_style {
        metadata.insert(
            "csl".to_string(),
            serde_json::Value::String(style.to_string()),
        );
    }
    let block = serde_json::to_string(&serde_json::Value::Object(metadata))?;
    Ok(format!("---\n{block}\n...\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(OutputFormat::from_extension("txt"), Some(OutputFormat::Plain));
        assert_eq!(OutputFormat::from_extension("MD"), Some(OutputFormat::Markdown));
        assert_eq!(OutputFormat::from_extension("xml"), Some(OutputFormat::Jats));
        assert_eq!(OutputFormat::from_extension("docx"), Some(OutputFormat::Docx));
        assert_eq!(OutputFormat::from_extension("pdf"), None);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            OutputFormat::from_path(Path::new("out/references.html")),
            Some(OutputFormat::Html)
        );
        assert_eq!(OutputFormat::from_path(Path::new("no-extension")), None);
    }

    #[test]
    fn test_format_parse() {
        assert_eq!("markdown".parse(), Ok(OutputFormat::Markdown));
        assert_eq!("PLAIN".parse(), Ok(OutputFormat::Plain));
        assert!("latex".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_pandoc_input_contains_wildcard_nocite() {
        let items: Vec<CslItem> = vec![serde_json::from_value(
            json!({"id": "doi:10.1234/test", "type": "article-journal"}),
        )
        .unwrap()];
        let document = pandoc_input(&items, Some("style.csl")).unwrap();
        assert!(document.starts_with("---\n"));
        assert!(document.ends_with("\n...\n"));
        assert!(document.contains(r#""nocite":"@*""#));
        assert!(document.contains(r#""csl":"style.csl""#));
        assert!(document.contains("doi:10.1234/test"));
    }
}
