//! incite-core: Citation metadata resolution library
//!
//! This library turns citekeys (`doi:…`, `pmid:…`, `arxiv:…`, …) into
//! validated CSL JSON bibliography items:
//! - Metadata providers for DOI, PubMed, PubMed Central, arXiv, ISBN, and
//!   plain URLs
//! - A read-through, write-back on-disk response cache
//! - Manual reference files that override provider fetches
//! - CSL JSON schema validation and pruning
//! - A concurrent resolution pipeline with per-citekey failure isolation
//! - Bibliography rendering through pandoc
//!
//! Citekey parsing and identifier validation live in the companion
//! `incite-identifiers` crate and are re-exported here.

pub mod cache;
pub mod csl;
pub mod error;
pub mod http;
pub mod manual;
pub mod pipeline;
pub mod render;
pub mod sources;

// Re-export the main types for convenience
pub use cache::{CacheEntry, CacheError, CacheKey, DiskCache, MemoryCache, MetadataCache};
pub use csl::{validate_and_prune, CslItem, SchemaError};
pub use error::{FailureKind, PipelineError, ResolveFailure, RunStatus};
pub use http::{HttpClient, HttpError, RetryPolicy};
pub use manual::{load_manual_references, ManualReferences};
pub use pipeline::{Pipeline, PipelineConfig, Resolution};
pub use render::{render, OutputFormat, RenderError};
pub use sources::{FetchMetadata, ProviderRegistry, SourceError, SourceMetadata};

pub use incite_identifiers::{scan_citekeys, Citekey, CitekeyError, Source};
