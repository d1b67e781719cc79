//! Cache store abstraction for aggregated search results.
//!
//! A store maps a normalized [`Query`] to a [`CacheEntry`] with a fixed
//! lifetime. Expired entries are never returned; whether they are deleted
//! eagerly or by [`CacheStore::purge_expired`] is up to the caller.

use crate::clock::Clock;
use crate::domain::{AggregateResult, CacheEntry, Query};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Error)]
pub enum CacheError {
    /// The backing store could not be reached or rejected the operation.
    #[error("cache store unavailable: {0}")]
    StoreUnavailable(String),

    /// A stored row could not be decoded back into an aggregate.
    #[error("corrupt cache entry for '{key}': {message}")]
    Corrupt { key: String, message: String },

    /// `now + ttl` overflowed the timestamp range.
    #[error("cache TTL out of range for '{key}'")]
    TtlOutOfRange { key: String },
}

impl From<sea_orm::DbErr> for CacheError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}

/// Key-value store with per-entry expiry.
///
/// Implementations must tolerate concurrent `get`/`put` calls from
/// independent searches.
#[async_trait::async_trait]
pub trait CacheStore: Send + Sync {
    /// Returns the live entry for `key`, or `None` when it was never written
    /// or has expired.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::StoreUnavailable`] when the backend fails.
    async fn get(&self, key: &Query) -> Result<Option<CacheEntry>, CacheError>;

    /// Upserts `value` under `key`, expiring `ttl` after the call.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::StoreUnavailable`] when the backend fails.
    async fn put(
        &self,
        key: &Query,
        value: &AggregateResult,
        ttl: chrono::Duration,
    ) -> Result<CacheEntry, CacheError>;

    /// Physically removes expired entries, returning how many were dropped.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::StoreUnavailable`] when the backend fails.
    async fn purge_expired(&self) -> Result<u64, CacheError>;

    /// Checks that the backend is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::StoreUnavailable`] when the backend fails.
    async fn ping(&self) -> Result<(), CacheError> {
        Ok(())
    }

    /// Short backend label for status output.
    fn backend(&self) -> &'static str;
}

/// Process-local store backed by a map.
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<Query, CacheEntry>>,
    clock: Arc<dyn Clock>,
}

impl MemoryCacheStore {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }

    /// Number of stored entries, live or not.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &Query) -> Result<Option<CacheEntry>, CacheError> {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        Ok(entries.get(key).filter(|e| e.is_live(now)).cloned())
    }

    async fn put(
        &self,
        key: &Query,
        value: &AggregateResult,
        ttl: chrono::Duration,
    ) -> Result<CacheEntry, CacheError> {
        let entry = CacheEntry::new(key.clone(), value.clone(), self.clock.now(), ttl)
            .ok_or_else(|| CacheError::TtlOutOfRange {
                key: key.to_string(),
            })?;
        self.entries
            .write()
            .await
            .insert(key.clone(), entry.clone());
        Ok(entry)
    }

    async fn purge_expired(&self) -> Result<u64, CacheError> {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, e| e.is_live(now));
        Ok((before - entries.len()) as u64)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::domain::{ProviderName, ResultItem};
    use chrono::{Duration, Utc};

    fn aggregate(title: &str) -> AggregateResult {
        let mut agg = AggregateResult::new();
        agg.insert(
            ProviderName::StackOverflow,
            vec![ResultItem {
                title: title.to_string(),
                link: "https://stackoverflow.com/q/1".to_string(),
                score: 5,
                body: None,
                created_at: None,
                author: None,
                tags: vec![],
                responses: None,
            }],
        );
        agg.insert(ProviderName::Reddit, vec![]);
        agg
    }

    #[tokio::test]
    async fn test_entry_expires_after_ttl() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = MemoryCacheStore::new(clock.clone());
        let key = Query::parse("python").unwrap();

        store.put(&key, &aggregate("a"), Duration::hours(1)).await.unwrap();

        clock.advance(Duration::minutes(59));
        let hit = store.get(&key).await.unwrap().expect("live at T+59m");
        assert_eq!(hit.value, aggregate("a"));

        clock.advance(Duration::minutes(2));
        assert!(store.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_is_upsert_and_resets_expiry() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = MemoryCacheStore::new(clock.clone());
        let key = Query::parse("rust").unwrap();

        store.put(&key, &aggregate("old"), Duration::hours(1)).await.unwrap();
        clock.advance(Duration::minutes(50));
        let entry = store.put(&key, &aggregate("new"), Duration::hours(1)).await.unwrap();
        assert_eq!(entry.expires_at, clock.now() + Duration::hours(1));

        clock.advance(Duration::minutes(30));
        let hit = store.get(&key).await.unwrap().unwrap();
        assert_eq!(hit.value, aggregate("new"));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_put_with_overflowing_ttl_fails_without_storing() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = MemoryCacheStore::new(clock);
        let key = Query::parse("rust").unwrap();

        let err = store
            .put(&key, &aggregate("a"), Duration::seconds(9_000_000_000_000))
            .await
            .unwrap_err();

        assert!(matches!(err, CacheError::TtlOutOfRange { .. }));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_purge_drops_only_expired() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let store = MemoryCacheStore::new(clock.clone());

        store
            .put(&Query::parse("old").unwrap(), &aggregate("o"), Duration::minutes(10))
            .await
            .unwrap();
        store
            .put(&Query::parse("fresh").unwrap(), &aggregate("f"), Duration::hours(2))
            .await
            .unwrap();

        clock.advance(Duration::minutes(30));
        assert_eq!(store.purge_expired().await.unwrap(), 1);
        assert_eq!(store.len().await, 1);
        assert!(store.get(&Query::parse("fresh").unwrap()).await.unwrap().is_some());
    }
}
