use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::info;

use crate::clients::{RedditClient, StackExchangeClient};
use crate::clock::{Clock, SystemClock};
use crate::config::{CacheBackend, Config};
use crate::db::Store;
use crate::email::{HttpMailer, Mailer};
use crate::services::{CacheStore, MemoryCacheStore, QueryAggregator, SearchProvider};

/// Everything a request handler, CLI command or background job needs.
#[derive(Clone)]
pub struct SharedState {
    pub config: Arc<Config>,

    /// Present only for the SQLite cache backend.
    pub store: Option<Store>,

    pub clock: Arc<dyn Clock>,

    pub cache: Arc<dyn CacheStore>,

    pub aggregator: Arc<QueryAggregator>,

    pub mailer: Arc<dyn Mailer>,
}

impl SharedState {
    /// Opens the cache backend and builds the real provider clients.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let (store, cache) = open_cache(&config, Arc::clone(&clock)).await?;

        let providers: Vec<Arc<dyn SearchProvider>> = vec![
            Arc::new(StackExchangeClient::new(
                config.providers.stackexchange.clone(),
            )?),
            Arc::new(RedditClient::new(config.providers.reddit.clone())?),
        ];

        let mailer: Arc<dyn Mailer> = Arc::new(HttpMailer::new(config.email.clone())?);

        let mut state = Self::from_parts(config, clock, cache, providers, mailer)?;
        state.store = store;
        Ok(state)
    }

    /// Assembles state from already-built collaborators.
    pub fn from_parts(
        config: Config,
        clock: Arc<dyn Clock>,
        cache: Arc<dyn CacheStore>,
        providers: Vec<Arc<dyn SearchProvider>>,
        mailer: Arc<dyn Mailer>,
    ) -> anyhow::Result<Self> {
        let aggregator = QueryAggregator::new(providers, Arc::clone(&cache), config.cache.ttl()?)?
            .with_timeout(Duration::from_secs(config.cache.search_timeout_seconds));

        Ok(Self {
            config: Arc::new(config),
            store: None,
            clock,
            cache,
            aggregator: Arc::new(aggregator),
            mailer,
        })
    }

    /// Closes the database pool, if any. Clones of the store share the pool.
    pub async fn shutdown(&self) -> anyhow::Result<()> {
        if let Some(store) = self.store.clone() {
            store.close().await?;
        }
        Ok(())
    }
}

async fn open_cache(
    config: &Config,
    clock: Arc<dyn Clock>,
) -> anyhow::Result<(Option<Store>, Arc<dyn CacheStore>)> {
    match config.cache.backend {
        CacheBackend::Sqlite => {
            let store = Store::with_pool_options(
                &config.general.database_path,
                config.general.max_db_connections,
                config.general.min_db_connections,
            )
            .await
            .with_context(|| {
                format!("Failed to open cache database {}", config.general.database_path)
            })?;

            let cache: Arc<dyn CacheStore> = Arc::new(store.cache_store(clock));
            Ok((Some(store), cache))
        }
        CacheBackend::Memory => {
            info!("Using in-memory cache; entries are lost on restart");
            Ok((None, Arc::new(MemoryCacheStore::new(clock))))
        }
    }
}
