use crate::config::Config;
use crate::services::Scheduler;
use crate::state::SharedState;

pub async fn cmd_cache_purge(config: Config) -> anyhow::Result<()> {
    let cache_config = config.cache.clone();
    let state = SharedState::new(config).await?;

    let scheduler = Scheduler::new(state.cache.clone(), cache_config);
    let outcome = scheduler.run_once().await;
    state.shutdown().await?;

    let removed = outcome?;
    println!("✓ Removed {removed} expired cache entries");
    Ok(())
}
