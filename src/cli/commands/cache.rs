//! Cache maintenance command handler

use crate::config::Config;
use crate::state::SharedState;

pub async fn cmd_cache_purge(config: &Config) -> anyhow::Result<()> {
    let state = SharedState::new(config.clone()).await?;
    let removed = state.cache.purge_expired().await?;
    println!("✓ Removed {removed} expired cache entries");
    Ok(())
}
