//! Citekey parsing and standardization
//!
//! A citekey names one bibliographic work as `source:identifier`, where the
//! source tag selects the metadata provider (doi, pmid, pmcid, arxiv, isbn,
//! url) or marks the key as raw (resolved from manual references only).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::validators;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CitekeyError {
    #[error("malformed citekey {citekey:?}: {reason}")]
    Malformed { citekey: String, reason: String },
    #[error("unrecognized citekey source {prefix:?} in {citekey:?}")]
    UnrecognizedSource { citekey: String, prefix: String },
}

/// Identifier source tags, each mapped to one metadata provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Digital Object Identifier
    Doi,
    /// PubMed identifier
    Pmid,
    /// PubMed Central identifier
    Pmcid,
    /// arXiv preprint identifier
    Arxiv,
    /// International Standard Book Number
    Isbn,
    /// Web page address
    Url,
    /// No external provider; satisfied by manual references or a placeholder
    Raw,
}

impl Source {
    pub fn all() -> &'static [Source] {
        &[
            Source::Doi,
            Source::Pmid,
            Source::Pmcid,
            Source::Arxiv,
            Source::Isbn,
            Source::Url,
            Source::Raw,
        ]
    }

    pub fn tag(&self) -> &'static str {
        match self {
            Source::Doi => "doi",
            Source::Pmid => "pmid",
            Source::Pmcid => "pmcid",
            Source::Arxiv => "arxiv",
            Source::Isbn => "isbn",
            Source::Url => "url",
            Source::Raw => "raw",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Source {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Source::all()
            .iter()
            .copied()
            .find(|source| source.tag() == s)
            .ok_or(())
    }
}

/// A parsed `source:identifier` pair. Immutable once parsed; the join key
/// for cache entries, manual references, and the resolved collection.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Citekey {
    pub source: Source,
    pub identifier: String,
}

impl Citekey {
    /// Parse a citekey that must carry a recognized `source:` prefix.
    ///
    /// Fails with `UnrecognizedSource` when the prefix is missing or unknown,
    /// and with `Malformed` when the identifier is empty or violates the
    /// syntax rules of its source.
    pub fn parse(raw: &str) -> Result<Citekey, CitekeyError> {
        let (prefix, identifier) = split_citekey(raw)?;
        let source = match Source::from_str(&prefix.to_lowercase()) {
            Ok(source) => source,
            Err(()) => {
                return Err(CitekeyError::UnrecognizedSource {
                    citekey: raw.to_string(),
                    prefix: prefix.to_string(),
                })
            }
        };
        Citekey::standardize(source, identifier, raw)
    }

    /// Parse a citekey, inferring the source when the prefix is missing or
    /// unrecognized.
    ///
    /// Recognized prefixes are matched case-insensitively and lowercased.
    /// Any other input becomes a `raw:` citekey whose identifier is the whole
    /// original string.
    pub fn infer(raw: &str) -> Result<Citekey, CitekeyError> {
        if raw.is_empty() {
            return Err(CitekeyError::Malformed {
                citekey: raw.to_string(),
                reason: "empty citekey".to_string(),
            });
        }
        if let Some((prefix, identifier)) = raw.split_once(':') {
            if let Ok(source) = Source::from_str(&prefix.to_lowercase()) {
                return Citekey::standardize(source, identifier, raw);
            }
        }
        Ok(Citekey {
            source: Source::Raw,
            identifier: raw.to_string(),
        })
    }

    /// Normalize and validate an identifier for its source.
    fn standardize(source: Source, identifier: &str, raw: &str) -> Result<Citekey, CitekeyError> {
        if identifier.is_empty() {
            return Err(CitekeyError::Malformed {
                citekey: raw.to_string(),
                reason: "blank identifier".to_string(),
            });
        }
        let identifier = match source {
            // DOIs are case-preserved; only URL prefixes and trailing
            // punctuation are stripped.
            Source::Doi => validators::normalize_doi(identifier),
            Source::Isbn => match validators::to_isbn13(identifier) {
                Some(isbn13) => isbn13,
                None => {
                    return Err(CitekeyError::Malformed {
                        citekey: raw.to_string(),
                        reason: "identifier violates the ISBN syntax".to_string(),
                    })
                }
            },
            _ => identifier.to_string(),
        };
        let citekey = Citekey {
            source,
            identifier,
        };
        if let Some(issue) = citekey.inspect() {
            return Err(CitekeyError::Malformed {
                citekey: raw.to_string(),
                reason: issue,
            });
        }
        Ok(citekey)
    }

    /// Check the identifier against the expected format of its source.
    /// Returns a string describing the issue, or None if no issue is detected.
    pub fn inspect(&self) -> Option<String> {
        let id = self.identifier.as_str();
        match self.source {
            Source::Pmid => {
                if id.starts_with("PMC") {
                    Some(
                        "PubMed identifiers should start with digits rather than PMC. \
                         Should the citation source switch to `pmcid`?"
                            .to_string(),
                    )
                } else if !validators::is_valid_pmid(id) {
                    Some("PubMed identifiers should be 1-8 digits with no leading zeros".to_string())
                } else {
                    None
                }
            }
            Source::Pmcid => {
                if !id.starts_with("PMC") {
                    Some("PubMed Central identifiers must start with `PMC`".to_string())
                } else if !validators::is_valid_pmcid(id) {
                    Some("identifier does not conform to the PMCID format".to_string())
                } else {
                    None
                }
            }
            Source::Doi => {
                if id.starts_with("10.") {
                    if !validators::is_valid_doi(id) {
                        Some("identifier does not conform to the DOI format".to_string())
                    } else {
                        None
                    }
                } else if id.starts_with("10/") {
                    if !validators::is_valid_short_doi(id) {
                        Some("identifier does not conform to the shortDOI format".to_string())
                    } else {
                        None
                    }
                } else {
                    Some("DOIs must start with `10.` (or `10/` for shortDOIs)".to_string())
                }
            }
            Source::Arxiv => {
                if !validators::is_valid_arxiv_id(id) {
                    Some("identifier does not conform to the arXiv ID format".to_string())
                } else {
                    None
                }
            }
            Source::Isbn => {
                if !validators::is_valid_isbn(id) {
                    Some("identifier violates the ISBN syntax".to_string())
                } else {
                    None
                }
            }
            Source::Url | Source::Raw => None,
        }
    }

    /// The standardized `source:identifier` string.
    pub fn standard(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Citekey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.source, self.identifier)
    }
}

fn split_citekey(raw: &str) -> Result<(&str, &str), CitekeyError> {
    if raw.starts_with('@') {
        return Err(CitekeyError::Malformed {
            citekey: raw.to_string(),
            reason: "citekeys must not start with `@`".to_string(),
        });
    }
    raw.split_once(':').ok_or_else(|| CitekeyError::Malformed {
        citekey: raw.to_string(),
        reason: "citekeys must be in the format `source:identifier`".to_string(),
    })
}
