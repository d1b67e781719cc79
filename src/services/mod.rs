pub mod aggregator;
pub use aggregator::{QueryAggregator, SearchError};

pub mod cache;
pub use cache::{CacheError, CacheStore, MemoryCacheStore};

pub mod combiner;
pub use combiner::combine;

pub mod provider;
pub use provider::{ProviderError, ProviderErrorKind, SearchProvider};

pub mod scheduler;
pub use scheduler::Scheduler;
