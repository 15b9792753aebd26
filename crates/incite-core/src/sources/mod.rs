//! Metadata providers, one per citekey source tag
//!
//! Each provider turns an identifier of its source type into a CSL item,
//! either by calling an external metadata service (DOI content negotiation,
//! NCBI citation exporter, arXiv API, Open Library) or by a local rule
//! (url, raw). Providers share the `FetchMetadata` contract and are
//! dispatched through the `ProviderRegistry`.

pub mod arxiv;
pub mod doi;
pub mod isbn;
pub mod pubmed;
pub mod raw;
pub mod registry;
pub mod traits;
pub mod webpage;

pub use arxiv::ArxivSource;
pub use doi::DoiSource;
pub use isbn::IsbnSource;
pub use pubmed::{PmcSource, PubmedSource};
pub use raw::RawSource;
pub use registry::ProviderRegistry;
pub use traits::{FetchMetadata, SourceError, SourceMetadata};
pub use webpage::UrlSource;
