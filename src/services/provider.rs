//! Provider client abstraction.
//!
//! Each upstream knowledge source implements [`SearchProvider`]. The
//! aggregator only sees this trait, which keeps HTTP details in `clients`
//! and lets tests substitute stub providers.

use crate::domain::{ProviderName, Query, ResultItem};
use thiserror::Error;

/// Why a provider fetch failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderErrorKind {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("unexpected status {status}")]
    Status { status: u16 },

    #[error("unparseable payload: {0}")]
    Payload(String),
}

/// A single upstream failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{provider} request failed: {cause}")]
pub struct ProviderError {
    pub provider: ProviderName,
    pub cause: ProviderErrorKind,
}

impl ProviderError {
    #[must_use]
    pub const fn new(provider: ProviderName, cause: ProviderErrorKind) -> Self {
        Self { provider, cause }
    }

    pub fn transport(provider: ProviderName, msg: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorKind::Transport(msg.into()))
    }

    #[must_use]
    pub const fn status(provider: ProviderName, status: u16) -> Self {
        Self::new(provider, ProviderErrorKind::Status { status })
    }

    pub fn payload(provider: ProviderName, msg: impl Into<String>) -> Self {
        Self::new(provider, ProviderErrorKind::Payload(msg.into()))
    }
}

/// An upstream source of result items.
///
/// Implementations send the already-normalized query unchanged and return
/// items in the order the upstream ranked them.
#[async_trait::async_trait]
pub trait SearchProvider: Send + Sync {
    /// Which provider this client talks to.
    fn name(&self) -> ProviderName;

    /// Fetches result items for `query`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError`] on transport failures, non-2xx responses or
    /// payloads that cannot be decoded.
    async fn fetch(&self, query: &Query) -> Result<Vec<ResultItem>, ProviderError>;
}
