//! Result cache backends: the `search_cache` table, or process memory.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use crate::db::Store;
use crate::models::ResultRecord;
use crate::services::result_cache::{CacheKey, CachedResultSet, Clock, ResultCache};
use crate::services::stores::StoreError;

pub struct SeaOrmResultCache {
    store: Store,
    clock: Arc<dyn Clock>,
}

impl SeaOrmResultCache {
    #[must_use]
    pub fn new(store: Store, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }
}

#[async_trait]
impl ResultCache for SeaOrmResultCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedResultSet>, StoreError> {
        Ok(self
            .store
            .get_cached_search(key.as_str(), self.clock.now())
            .await?)
    }

    async fn put(
        &self,
        key: &CacheKey,
        records: &[ResultRecord],
        ttl: chrono::Duration,
    ) -> Result<(), StoreError> {
        self.store
            .cache_search_results(key.as_str(), records, self.clock.now(), ttl)
            .await?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let removed = self.store.purge_expired_cache(self.clock.now()).await?;
        debug!(removed, "Purged expired search cache rows");
        Ok(removed)
    }
}

/// Volatile cache; entries vanish on restart.
pub struct MemoryResultCache {
    entries: RwLock<HashMap<CacheKey, CachedResultSet>>,
    clock: Arc<dyn Clock>,
}

impl MemoryResultCache {
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
        }
    }
}

#[async_trait]
impl ResultCache for MemoryResultCache {
    async fn get(&self, key: &CacheKey) -> Result<Option<CachedResultSet>, StoreError> {
        let now = self.clock.now();
        let entries = self.entries.read().await;
        Ok(entries
            .get(key)
            .filter(|entry| entry.is_fresh_at(now))
            .cloned())
    }

    async fn put(
        &self,
        key: &CacheKey,
        records: &[ResultRecord],
        ttl: chrono::Duration,
    ) -> Result<(), StoreError> {
        let now = self.clock.now();
        let entry = CachedResultSet {
            records: records.to_vec(),
            stored_at: now,
            expires_at: now + ttl,
        };
        let mut entries = self.entries.write().await;
        entries.retain(|_, existing| existing.is_fresh_at(now));
        entries.insert(key.clone(), entry);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, StoreError> {
        let now = self.clock.now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| entry.is_fresh_at(now));
        Ok((before - entries.len()) as u64)
    }
}
