//! Citekey resolution pipeline
//!
//! Parses, deduplicates, and resolves a batch of citekeys into validated CSL
//! items. Manual references short-circuit provider fetches, the cache is
//! consulted before the network, and fetches run concurrently under a
//! semaphore. Output order follows the standard citekey, never arrival
//! order, so two runs over the same inputs produce byte-identical output.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::Instant;

use incite_identifiers::Citekey;

use crate::cache::{CacheEntry, CacheError, CacheKey, MetadataCache};
use crate::csl::{validate_and_prune, CslItem};
use crate::error::{FailureKind, PipelineError, ResolveFailure, RunStatus};
use crate::http::{HttpClient, RetryPolicy};
use crate::manual::ManualReferences;
use crate::sources::{ProviderRegistry, SourceError};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub user_agent: String,
    /// Concurrent provider fetches across all sources.
    pub max_in_flight: usize,
    pub retry: RetryPolicy,
    /// Strict CSL validation prunes unknown fields and rejects items with a
    /// missing id or type. Lenient passes items through untouched.
    pub strict: bool,
    /// Soft deadline for the whole run. Once it passes, no new fetches start;
    /// in-flight fetches complete and unstarted citekeys are reported as
    /// transient failures.
    pub run_timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("incite/", env!("CARGO_PKG_VERSION")).to_string(),
            max_in_flight: 4,
            retry: RetryPolicy::default(),
            strict: true,
            run_timeout: None,
        }
    }
}

/// The resolved batch: items sorted by standard citekey, plus every citekey
/// that fell out along the way.
#[derive(Debug)]
pub struct Resolution {
    pub items: Vec<CslItem>,
    pub failures: Vec<ResolveFailure>,
}

impl Resolution {
    pub fn status(&self) -> RunStatus {
        if self.failures.is_empty() {
            RunStatus::Success
        } else if self.items.is_empty() {
            RunStatus::Failed
        } else {
            RunStatus::Partial
        }
    }
}

enum FetchOutcome {
    Item(Box<CslItem>),
    Failure(ResolveFailure),
    Fatal(PipelineError),
}

pub struct Pipeline {
    registry: Arc<ProviderRegistry>,
    cache: Arc<dyn MetadataCache>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        cache: Arc<dyn MetadataCache>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            registry,
            cache,
            config,
        }
    }

    /// Pipeline with the standard provider set, sharing one HTTP client
    /// built from the config's user agent and retry policy.
    pub fn standard(cache: Arc<dyn MetadataCache>, config: PipelineConfig) -> Self {
        let client = Arc::new(HttpClient::new(&config.user_agent, config.retry.clone()));
        Self::new(Arc::new(ProviderRegistry::standard(client)), cache, config)
    }

    /// Resolve a batch of citekeys into CSL items.
    ///
    /// Per-citekey failures are collected, never propagated: a dead provider
    /// or a malformed citekey costs that one entry. The `Err` arm is
    /// reserved for resource-level faults like an unusable cache directory.
    pub async fn resolve(
        &self,
        citekeys: &[String],
        manual: &ManualReferences,
    ) -> Result<Resolution, PipelineError> {
        let mut failures = Vec::new();

        // Parse and deduplicate. Keying by standard citekey makes the run
        // independent of input order and of aliased spellings.
        let mut targets: BTreeMap<String, Citekey> = BTreeMap::new();
        for raw in citekeys {
            match Citekey::infer(raw) {
                Ok(citekey) => {
                    targets.entry(citekey.standard()).or_insert(citekey);
                }
                Err(e) => {
                    failures.push(ResolveFailure::new(raw, FailureKind::from(&e), e.to_string()));
                }
            }
        }

        let mut resolved: BTreeMap<String, CslItem> = BTreeMap::new();

        let deadline = self.config.run_timeout.map(|t| Instant::now() + t);
        let semaphore = Arc::new(Semaphore::new(self.config.max_in_flight.max(1)));
        let mut fetches: JoinSet<(String, FetchOutcome)> = JoinSet::new();

        for (standard, citekey) in targets {
            if let Some(item) = manual.get(&standard) {
                tracing::debug!(citekey = %standard, "using manual reference");
                resolved.insert(standard, item.clone());
                continue;
            }

            let registry = self.registry.clone();
            let cache = self.cache.clone();
            let semaphore = semaphore.clone();
            fetches.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        return (
                            standard.clone(),
                            FetchOutcome::Failure(ResolveFailure::new(
                                standard,
                                FailureKind::TransientProviderFailure,
                                "fetch pool closed before this citekey was attempted",
                            )),
                        );
                    }
                };
                if let Some(deadline) = deadline {
                    if Instant::now() >= deadline {
                        return (
                            standard.clone(),
                            FetchOutcome::Failure(ResolveFailure::new(
                                standard,
                                FailureKind::TransientProviderFailure,
                                "run timeout reached before this citekey was fetched",
                            )),
                        );
                    }
                }
                let outcome = fetch_one(&registry, cache.as_ref(), &citekey, &standard).await;
                (standard, outcome)
            });
        }

        while let Some(joined) = fetches.join_next().await {
            let (standard, outcome) = match joined {
                Ok(result) => result,
                Err(e) => {
                    tracing::error!(error = %e, "fetch task aborted");
                    continue;
                }
            };
            match outcome {
                FetchOutcome::Item(item) => {
                    resolved.insert(standard, *item);
                }
                FetchOutcome::Failure(failure) => {
                    tracing::warn!(citekey = %standard, kind = %failure.kind, "{}", failure.message);
                    failures.push(failure);
                }
                FetchOutcome::Fatal(e) => return Err(e),
            }
        }

        // Validation runs over manual and fetched items alike.
        let mut items = Vec::with_capacity(resolved.len());
        for (standard, item) in resolved {
            match validate_and_prune(&item, self.config.strict) {
                Ok(pruned) => items.push(pruned),
                Err(e) => {
                    tracing::warn!(citekey = %standard, "dropping item: {e}");
                    failures.push(ResolveFailure::new(
                        standard,
                        FailureKind::SchemaViolation,
                        e.to_string(),
                    ));
                }
            }
        }

        // Fetch completions arrive in timing order; sort so the failure
        // report is as reproducible as the item list.
        failures.sort_by(|a, b| a.citekey.cmp(&b.citekey));

        Ok(Resolution { items, failures })
    }
}

async fn fetch_one(
    registry: &ProviderRegistry,
    cache: &dyn MetadataCache,
    citekey: &Citekey,
    standard: &str,
) -> FetchOutcome {
    let key = CacheKey::new(standard, &registry.request_signature(citekey.source));
    match cache.get(&key) {
        Ok(Some(entry)) => {
            tracing::debug!(citekey = %standard, "cache hit");
            return FetchOutcome::Item(Box::new(entry.item));
        }
        Ok(None) => {}
        Err(CacheError::Corrupt { path, message }) => {
            tracing::warn!(path = %path.display(), %message, "corrupt cache entry, refetching");
        }
        Err(fatal) => return FetchOutcome::Fatal(fatal.into()),
    }

    match registry.resolve(citekey).await {
        Ok(item) => {
            if let Err(e) = cache.put(&key, &CacheEntry::new(&key, item.clone())) {
                return FetchOutcome::Fatal(e.into());
            }
            FetchOutcome::Item(Box::new(item))
        }
        Err(e) => FetchOutcome::Failure(ResolveFailure::new(
            standard,
            failure_kind(&e),
            e.to_string(),
        )),
    }
}

fn failure_kind(e: &SourceError) -> FailureKind {
    match e {
        SourceError::NotFound => FailureKind::MetadataNotFound,
        SourceError::InvalidIdentifier(_) => FailureKind::MalformedCitekey,
        _ => FailureKind::TransientProviderFailure,
    }
}
