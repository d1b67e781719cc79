//! Cache-aside query aggregation.
//!
//! [`QueryAggregator::search`] normalizes the query, serves live cache hits
//! directly, and on a miss fans out to every provider concurrently. Only a
//! complete aggregate (every provider succeeded) is cached or returned.

use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::domain::{AggregateResult, ProviderName, Query, ResultItem};
use crate::services::cache::{CacheError, CacheStore};
use crate::services::combiner::combine;
use crate::services::provider::{ProviderError, SearchProvider};

/// Default deadline for the upstream fan-out.
pub const DEFAULT_SEARCH_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Error)]
pub enum SearchError {
    /// The query was empty or whitespace only.
    #[error("search query cannot be empty")]
    InvalidQuery,

    /// At least one provider failed; nothing was cached.
    #[error("upstream failure: {}", describe_failures(.failures))]
    UpstreamFailure { failures: Vec<ProviderError> },

    #[error(transparent)]
    StoreUnavailable(#[from] CacheError),

    /// Providers did not all answer before the deadline.
    #[error("search timed out after {0:?}")]
    TimedOut(Duration),
}

fn describe_failures(failures: &[ProviderError]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl SearchError {
    /// True when the caller supplied bad input, false when the system failed.
    #[must_use]
    pub const fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidQuery)
    }

    /// Providers whose fetch failed, in provider order.
    #[must_use]
    pub fn failed_providers(&self) -> Vec<ProviderName> {
        match self {
            Self::UpstreamFailure { failures } => failures.iter().map(|f| f.provider).collect(),
            _ => Vec::new(),
        }
    }
}

/// Orchestrates cache lookup, provider fan-out and cache write.
pub struct QueryAggregator {
    providers: Vec<Arc<dyn SearchProvider>>,
    cache: Arc<dyn CacheStore>,
    ttl: chrono::Duration,
    timeout: Duration,
}

impl QueryAggregator {
    /// Creates an aggregator over `providers`, each of which must have a
    /// distinct [`ProviderName`].
    pub fn new(
        providers: Vec<Arc<dyn SearchProvider>>,
        cache: Arc<dyn CacheStore>,
        ttl: chrono::Duration,
    ) -> anyhow::Result<Self> {
        if providers.is_empty() {
            anyhow::bail!("At least one search provider is required");
        }

        let mut seen = HashSet::new();
        for provider in &providers {
            if !seen.insert(provider.name()) {
                anyhow::bail!("Provider '{}' is configured more than once", provider.name());
            }
        }

        if ttl <= chrono::Duration::zero() {
            anyhow::bail!("Cache TTL must be positive");
        }

        Ok(Self {
            providers,
            cache,
            ttl,
            timeout: DEFAULT_SEARCH_TIMEOUT,
        })
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<dyn CacheStore> {
        &self.cache
    }

    #[must_use]
    pub fn providers(&self) -> Vec<ProviderName> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Returns the aggregate for `raw_query`, from cache when a live entry
    /// exists.
    ///
    /// Dropping the returned future abandons in-flight provider calls and
    /// skips the cache write.
    ///
    /// # Errors
    ///
    /// - [`SearchError::InvalidQuery`] for blank input, before any I/O
    /// - [`SearchError::UpstreamFailure`] when any provider fails
    /// - [`SearchError::StoreUnavailable`] when the cache backend fails
    /// - [`SearchError::TimedOut`] when the fan-out exceeds the deadline
    pub async fn search(&self, raw_query: &str) -> Result<AggregateResult, SearchError> {
        let Some(query) = Query::parse(raw_query) else {
            metrics::counter!("search_requests_total", "outcome" => "invalid").increment(1);
            return Err(SearchError::InvalidQuery);
        };

        let result = self.search_normalized(&query).await;

        let outcome = if result.is_ok() { "success" } else { "error" };
        metrics::counter!("search_requests_total", "outcome" => outcome).increment(1);

        result
    }

    async fn search_normalized(&self, query: &Query) -> Result<AggregateResult, SearchError> {
        let cached = self.cache.get(query).await.inspect_err(|e| {
            error!(query = %query, error = %e, "Cache lookup failed");
        })?;

        if let Some(entry) = cached {
            metrics::counter!("search_cache_hits_total").increment(1);
            info!(query = %query, "Cache hit");
            return Ok(entry.value);
        }

        metrics::counter!("search_cache_misses_total").increment(1);
        info!(query = %query, "Cache miss, fetching from providers");

        let per_provider = tokio::time::timeout(self.timeout, self.fetch_all(query))
            .await
            .map_err(|_| {
                warn!(query = %query, timeout = ?self.timeout, "Provider fan-out timed out");
                SearchError::TimedOut(self.timeout)
            })??;

        let aggregate = combine(per_provider);

        self.cache
            .put(query, &aggregate, self.ttl)
            .await
            .inspect_err(|e| {
                error!(query = %query, error = %e, "Cache write failed");
            })?;

        Ok(aggregate)
    }

    /// Queries every provider concurrently and waits for all of them.
    async fn fetch_all(
        &self,
        query: &Query,
    ) -> Result<Vec<(ProviderName, Vec<ResultItem>)>, SearchError> {
        let fetches = self.providers.iter().map(|provider| {
            let provider = Arc::clone(provider);
            async move {
                let name = provider.name();
                let start = Instant::now();
                let result = provider.fetch(query).await;

                let outcome = if result.is_ok() { "success" } else { "error" };
                metrics::counter!(
                    "provider_requests_total",
                    "provider" => name.as_str(),
                    "outcome" => outcome
                )
                .increment(1);
                metrics::histogram!("provider_request_duration_seconds", "provider" => name.as_str())
                    .record(start.elapsed().as_secs_f64());

                (name, result)
            }
        });

        let outcomes = join_all(fetches).await;

        let mut results = Vec::with_capacity(outcomes.len());
        let mut failures = Vec::new();

        for (provider, outcome) in outcomes {
            match outcome {
                Ok(items) => results.push((provider, items)),
                Err(err) => {
                    warn!(provider = %provider, error = %err, "Provider fetch failed");
                    failures.push(err);
                }
            }
        }

        if failures.is_empty() {
            Ok(results)
        } else {
            Err(SearchError::UpstreamFailure { failures })
        }
    }
}
