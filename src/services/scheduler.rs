use anyhow::Result;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{Duration, interval};
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use crate::config::CacheConfig;
use crate::services::cache::CacheStore;

/// Background job that physically removes expired cache entries.
pub struct Scheduler {
    cache: Arc<dyn CacheStore>,
    config: CacheConfig,
    running: Arc<RwLock<bool>>,
}

impl Scheduler {
    pub fn new(cache: Arc<dyn CacheStore>, config: CacheConfig) -> Self {
        Self {
            cache,
            config,
            running: Arc::new(RwLock::new(false)),
        }
    }

    pub async fn start(&self) -> Result<()> {
        if self.config.purge_cron.is_none() && self.config.purge_interval_minutes == 0 {
            info!("Cache purge job is disabled in config");
            return Ok(());
        }

        *self.running.write().await = true;
        info!("Starting cache purge scheduler");

        if let Some(cron_expr) = &self.config.purge_cron {
            self.run_with_cron(cron_expr).await
        } else {
            self.run_with_interval().await
        }
    }

    async fn run_with_cron(&self, cron_expr: &str) -> Result<()> {
        let mut sched = JobScheduler::new().await?;

        let cache = Arc::clone(&self.cache);
        let running = Arc::clone(&self.running);

        let job = Job::new_async(cron_expr, move |_uuid, _lock| {
            let cache = Arc::clone(&cache);
            let running = Arc::clone(&running);
            Box::pin(async move {
                if !*running.read().await {
                    return;
                }
                run_purge(cache.as_ref()).await;
            })
        })?;

        sched.add(job).await?;
        sched.start().await?;

        info!("Cache purge scheduled with cron: {}", cron_expr);

        loop {
            if !*self.running.read().await {
                break;
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        sched.shutdown().await?;
        Ok(())
    }

    async fn run_with_interval(&self) -> Result<()> {
        let interval_mins = self.config.purge_interval_minutes.max(1);

        info!("Cache purge running every {}m", interval_mins);

        let mut purge_interval = interval(Duration::from_secs(u64::from(interval_mins) * 60));
        // The first tick completes immediately; skip it so startup stays quiet.
        purge_interval.tick().await;

        loop {
            purge_interval.tick().await;
            if !*self.running.read().await {
                break;
            }
            run_purge(self.cache.as_ref()).await;
        }

        Ok(())
    }

    pub async fn stop(&self) {
        info!("Stopping scheduler...");
        *self.running.write().await = false;
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Purges once, outside the schedule.
    pub async fn run_once(&self) -> Result<u64> {
        info!("Running manual cache purge...");
        let removed = self.cache.purge_expired().await?;
        Ok(removed)
    }
}

async fn run_purge(cache: &dyn CacheStore) {
    let start = std::time::Instant::now();
    info!(event = "job_started", job_name = "purge_cache", "Starting scheduled cache purge");

    match cache.purge_expired().await {
        Ok(removed) => {
            metrics::counter!("cache_entries_purged_total").increment(removed);
            info!(
                event = "job_finished",
                job_name = "purge_cache",
                removed,
                duration_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
                "Scheduled cache purge finished"
            );
        }
        Err(e) => {
            error!(event = "job_failed", job_name = "purge_cache", error = %e, "Scheduled cache purge failed");
        }
    }
}
