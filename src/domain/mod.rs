//! Domain types for query aggregation with strong typing.
//!
//! This module provides the normalized [`Query`] used as the cache key, the
//! closed set of upstream providers, and the provider-keyed aggregate that
//! flows through caching and email formatting unchanged.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A normalized search string.
///
/// Construction trims surrounding whitespace and lowercases the input, so two
/// raw strings that differ only in case or padding map to the same cache entry.
/// Normalization is idempotent.
///
/// # Examples
///
/// ```rust
/// use knowbase::domain::Query;
///
/// let q = Query::parse("  Foo Bar ").unwrap();
/// assert_eq!(q.as_str(), "foo bar");
/// assert_eq!(Query::parse(q.as_str()).unwrap(), q);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Query(String);

impl Query {
    /// Normalizes `raw`, returning `None` when nothing is left after trimming.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = normalize(raw);
        if normalized.is_empty() {
            None
        } else {
            Some(Self(normalized))
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Query {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Trims and lowercases a raw query string.
#[must_use]
pub fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Upstream knowledge sources.
///
/// The lowercase names double as the keys of the serialized aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderName {
    StackOverflow,
    Reddit,
}

impl ProviderName {
    pub const ALL: [Self; 2] = [Self::StackOverflow, Self::Reddit];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::StackOverflow => "stackoverflow",
            Self::Reddit => "reddit",
        }
    }

    /// Heading used when the provider is shown to people.
    #[must_use]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::StackOverflow => "Stack Overflow",
            Self::Reddit => "Reddit",
        }
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single result returned by a provider.
///
/// Providers fill in what they have; everything except `title` and `link`
/// is optional and defaults when the upstream payload omits it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultItem {
    pub title: String,
    pub link: String,
    #[serde(default)]
    pub score: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    /// Answer count for questions, comment count for posts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responses: Option<u32>,
}

/// Provider-keyed search results.
///
/// Each list keeps the order the provider returned it in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateResult(BTreeMap<ProviderName, Vec<ResultItem>>);

impl AggregateResult {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the list for `provider`, replacing any previous one.
    pub fn insert(&mut self, provider: ProviderName, items: Vec<ResultItem>) {
        self.0.insert(provider, items);
    }

    #[must_use]
    pub fn get(&self, provider: ProviderName) -> Option<&[ResultItem]> {
        self.0.get(&provider).map(Vec::as_slice)
    }

    #[must_use]
    pub fn contains(&self, provider: ProviderName) -> bool {
        self.0.contains_key(&provider)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ProviderName, &[ResultItem])> {
        self.0.iter().map(|(name, items)| (*name, items.as_slice()))
    }

    #[must_use]
    pub fn providers(&self) -> Vec<ProviderName> {
        self.0.keys().copied().collect()
    }

    /// Number of items across all providers.
    #[must_use]
    pub fn total(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A stored aggregate together with its lifetime.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub key: Query,
    pub value: AggregateResult,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Builds an entry expiring `ttl` after `created_at`, or `None` when the
    /// expiry instant is not representable.
    #[must_use]
    pub fn new(
        key: Query,
        value: AggregateResult,
        created_at: DateTime<Utc>,
        ttl: chrono::Duration,
    ) -> Option<Self> {
        let expires_at = created_at.checked_add_signed(ttl)?;
        Some(Self {
            key,
            value,
            created_at,
            expires_at,
        })
    }

    /// An entry is live strictly before its expiry instant.
    #[must_use]
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}
