//! Pipeline error taxonomy
//!
//! Two tiers: per-citekey failures that the pipeline records and carries on
//! past, and pipeline-level errors that abort the whole run. A provider
//! outage never aborts a run. A cache directory that cannot be read does.

use serde::Serialize;
use thiserror::Error;

use incite_identifiers::CitekeyError;

use crate::cache::CacheError;

/// Why one citekey failed to resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The citekey does not match the `source:identifier` syntax.
    MalformedCitekey,
    /// The source prefix is not a registered provider tag.
    UnrecognizedSource,
    /// The provider failed in a way that may clear up on a later run.
    TransientProviderFailure,
    /// The provider answered definitively that no record exists.
    MetadataNotFound,
    /// A manual reference file could not be loaded or lacked a usable id.
    InvalidManualReference,
    /// Strict validation rejected the retrieved item outright.
    SchemaViolation,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FailureKind::MalformedCitekey => "malformed citekey",
            FailureKind::UnrecognizedSource => "unrecognized source",
            FailureKind::TransientProviderFailure => "transient provider failure",
            FailureKind::MetadataNotFound => "metadata not found",
            FailureKind::InvalidManualReference => "invalid manual reference",
            FailureKind::SchemaViolation => "schema violation",
        };
        f.write_str(label)
    }
}

impl From<&CitekeyError> for FailureKind {
    fn from(e: &CitekeyError) -> Self {
        match e {
            CitekeyError::Malformed { .. } => FailureKind::MalformedCitekey,
            CitekeyError::UnrecognizedSource { .. } => FailureKind::UnrecognizedSource,
        }
    }
}

/// One citekey that did not make it into the output, with enough context to
/// report to the user.
#[derive(Debug, Clone, Serialize)]
pub struct ResolveFailure {
    pub citekey: String,
    pub kind: FailureKind,
    pub message: String,
}

impl ResolveFailure {
    pub fn new(citekey: impl Into<String>, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            citekey: citekey.into(),
            kind,
            message: message.into(),
        }
    }
}

/// Overall outcome of a resolution run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every requested citekey resolved.
    Success,
    /// Some citekeys resolved, some failed.
    Partial,
    /// Nothing resolved.
    Failed,
}

/// Run-aborting errors. Anything recoverable per citekey belongs in
/// [`ResolveFailure`] instead.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("content directory error: {0}")]
    ContentScope(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_kind_from_citekey_error() {
        let e = CitekeyError::Malformed {
            citekey: "doi:".to_string(),
            reason: "empty identifier".to_string(),
        };
        assert_eq!(FailureKind::from(&e), FailureKind::MalformedCitekey);
        let e = CitekeyError::UnrecognizedSource {
            citekey: "wosid:123".to_string(),
            prefix: "wosid".to_string(),
        };
        assert_eq!(FailureKind::from(&e), FailureKind::UnrecognizedSource);
    }

    #[test]
    fn test_failure_serializes_snake_case() {
        let failure = ResolveFailure::new(
            "doi:10.1234/x",
            FailureKind::MetadataNotFound,
            "no record",
        );
        let json = serde_json::to_value(&failure).unwrap();
        assert_eq!(json["kind"], "metadata_not_found");
        assert_eq!(json["citekey"], "doi:10.1234/x");
    }
}
