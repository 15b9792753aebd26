//! Citekey parsing and identifier validation for scholarly works
//!
//! A citekey is a `source:identifier` string naming one bibliographic work,
//! e.g. `doi:10.1038/nature12373` or `pmid:29424689`. This crate provides:
//! - Citekey parsing with source prefix inference
//! - Per-source identifier validation (DOI, PMID, PMCID, arXiv, ISBN)
//! - Identifier normalization (ISBN-13 conversion, DOI prefix stripping)
//! - Citekey scanning in manuscript text

pub mod citekey;
pub mod scan;
pub mod validators;

pub use citekey::{Citekey, CitekeyError, Source};
pub use scan::scan_citekeys;
pub use validators::{
    is_valid_arxiv_id, is_valid_doi, is_valid_isbn, is_valid_pmcid, is_valid_pmid,
    is_valid_short_doi, normalize_doi, to_isbn13,
};
