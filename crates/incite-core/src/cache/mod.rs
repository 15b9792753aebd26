//! On-disk response cache for provider fetches
//!
//! The cache is an explicit handle passed into the pipeline at construction.
//! Read-through: the pipeline checks the cache before any provider fetch.
//! Write-back: every successful fetch is persisted before being handed to
//! the merger, with no cross-key transaction. `clear()` is explicit and
//! user-triggered, never automatic.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::csl::CslItem;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("corrupt cache entry at {path}: {message}")]
    Corrupt { path: PathBuf, message: String },
}

/// Cache key: the standardized citekey plus the provider request signature.
/// Both parts are percent-encoded into the entry file name, which is
/// injective, so two distinct identifiers never alias to the same entry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub citekey: String,
    pub request: String,
}

impl CacheKey {
    pub fn new(citekey: &str, request: &str) -> Self {
        Self {
            citekey: citekey.to_string(),
            request: request.to_string(),
        }
    }

    pub fn file_name(&self) -> String {
        format!(
            "{}&{}.json",
            urlencoding::encode(&self.request),
            urlencoding::encode(&self.citekey)
        )
    }
}

/// One cached provider response, tagged with provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub citekey: String,
    pub request: String,
    pub retrieved_at: DateTime<Utc>,
    pub item: CslItem,
}

impl CacheEntry {
    pub fn new(key: &CacheKey, item: CslItem) -> Self {
        Self {
            citekey: key.citekey.clone(),
            request: key.request.clone(),
            retrieved_at: Utc::now(),
            item,
        }
    }
}

pub trait MetadataCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError>;
    fn put(&self, key: &CacheKey, entry: &CacheEntry) -> Result<(), CacheError>;
    fn clear(&self) -> Result<(), CacheError>;
}

/// Filesystem-backed cache: one JSON file per entry.
///
/// Writes land in a temp file in the cache directory and are renamed over
/// the target, so a write is atomic with respect to concurrent reads of the
/// same key and the last successful write for a key wins.
pub struct DiskCache {
    dir: PathBuf,
    ttl: Option<Duration>,
}

impl DiskCache {
    /// Open (creating if needed) a cache directory. Failure here is fatal to
    /// the run: an unusable cache scope cannot honor write-back semantics.
    pub fn open(dir: &Path) -> Result<Self, CacheError> {
        std::fs::create_dir_all(dir).map_err(|source| CacheError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        Ok(Self {
            dir: dir.to_path_buf(),
            ttl: None,
        })
    }

    /// Entries older than `ttl` are treated as misses on read.
    pub fn with_ttl(mut self, ttl: std::time::Duration) -> Self {
        self.ttl = Duration::from_std(ttl).ok();
        self
    }

    fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(key.file_name())
    }
}

impl MetadataCache for DiskCache {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        let path = self.entry_path(key);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(CacheError::Io { path, source }),
        };
        let entry: CacheEntry =
            serde_json::from_slice(&bytes).map_err(|error| CacheError::Corrupt {
                path: path.clone(),
                message: error.to_string(),
            })?;
        if let Some(ttl) = self.ttl {
            if Utc::now() - entry.retrieved_at >= ttl {
                tracing::debug!(citekey = %key.citekey, "cache entry expired by TTL");
                return Ok(None);
            }
        }
        Ok(Some(entry))
    }

    fn put(&self, key: &CacheKey, entry: &CacheEntry) -> Result<(), CacheError> {
        let path = self.entry_path(key);
        let bytes = serde_json::to_vec_pretty(entry).map_err(|error| CacheError::Corrupt {
            path: path.clone(),
            message: error.to_string(),
        })?;
        let tmp = self.dir.join(format!(
            ".{}.tmp-{}-{}",
            key.file_name(),
            std::process::id(),
            Utc::now().timestamp_nanos_opt().unwrap_or_default()
        ));
        std::fs::write(&tmp, &bytes).map_err(|source| CacheError::Io {
            path: tmp.clone(),
            source,
        })?;
        std::fs::rename(&tmp, &path).map_err(|source| CacheError::Io { path, source })
    }

    fn clear(&self) -> Result<(), CacheError> {
        let entries = std::fs::read_dir(&self.dir).map_err(|source| CacheError::Io {
            path: self.dir.clone(),
            source,
        })?;
        for entry in entries {
            let entry = entry.map_err(|source| CacheError::Io {
                path: self.dir.clone(),
                source,
            })?;
            let path = entry.path();
            if path.is_file() {
                std::fs::remove_file(&path)
                    .map_err(|source| CacheError::Io { path, source })?;
            }
        }
        tracing::info!(dir = %self.dir.display(), "cleared metadata cache");
        Ok(())
    }
}

/// In-memory cache substitute for isolated tests and one-shot runs.
#[derive(Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MetadataCache for MemoryCache {
    fn get(&self, key: &CacheKey) -> Result<Option<CacheEntry>, CacheError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(&key.file_name()).cloned())
    }

    fn put(&self, key: &CacheKey, entry: &CacheEntry) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.file_name(), entry.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_entry(key: &CacheKey) -> CacheEntry {
        let item: CslItem = serde_json::from_value(json!({
            "id": key.citekey,
            "type": "article-journal",
            "title": "Cached Title"
        }))
        .unwrap();
        CacheEntry::new(key, item)
    }

    #[test]
    fn test_disk_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::open(dir.path()).unwrap();
        let key = CacheKey::new("doi:10.1038/nature12373", "doi");

        assert!(cache.get(&key).unwrap().is_none());
        let entry = sample_entry(&key);
        cache.put(&key, &entry).unwrap();
        let read = cache.get(&key).unwrap().unwrap();
        assert_eq!(read.item, entry.item);
        assert_eq!(read.citekey, "doi:10.1038/nature12373");
    }

    #[test]
    fn test_clear_removes_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::open(dir.path()).unwrap();
        let key = CacheKey::new("pmid:29424689", "pubmed");
        cache.put(&key, &sample_entry(&key)).unwrap();

        cache.clear().unwrap();
        assert!(cache.get(&key).unwrap().is_none());
    }

    #[test]
    fn test_keys_with_special_characters_do_not_alias() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::open(dir.path()).unwrap();
        let first = CacheKey::new("url:https://example.com/a&b", "url");
        let second = CacheKey::new("url:https://example.com/a", "url");

        cache.put(&first, &sample_entry(&first)).unwrap();
        cache.put(&second, &sample_entry(&second)).unwrap();

        assert_eq!(
            cache.get(&first).unwrap().unwrap().citekey,
            "url:https://example.com/a&b"
        );
        assert_eq!(
            cache.get(&second).unwrap().unwrap().citekey,
            "url:https://example.com/a"
        );
    }

    #[test]
    fn test_ttl_expires_entries() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::open(dir.path())
            .unwrap()
            .with_ttl(std::time::Duration::from_secs(0));
        let key = CacheKey::new("doi:10.1234/test", "doi");
        cache.put(&key, &sample_entry(&key)).unwrap();
        // Zero TTL: everything is already expired
        assert!(cache.get(&key).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_entry_reported() {
        let dir = tempfile::tempdir().unwrap();
        let cache = DiskCache::open(dir.path()).unwrap();
        let key = CacheKey::new("doi:10.1234/test", "doi");
        std::fs::write(dir.path().join(key.file_name()), b"not json").unwrap();
        assert!(matches!(
            cache.get(&key),
            Err(CacheError::Corrupt { .. })
        ));
    }

    #[test]
    fn test_memory_cache_roundtrip() {
        let cache = MemoryCache::new();
        let key = CacheKey::new("arxiv:1806.05726", "arxiv");
        cache.put(&key, &sample_entry(&key)).unwrap();
        assert!(cache.get(&key).unwrap().is_some());
        cache.clear().unwrap();
        assert!(cache.get(&key).unwrap().is_none());
    }
}
