//! Cache Query Handlers

use std::sync::Arc;

use crate::application::error::ApplicationError;
use crate::application::ports::{AudioCachePort, CacheStats};
use crate::application::queries::cache_queries::GetCacheStatsQuery;

/// GetCacheStats Handler
pub struct GetCacheStatsHandler {
    cache: Arc<dyn AudioCachePort>,
}

impl GetCacheStatsHandler {
    pub fn new(cache: Arc<dyn AudioCachePort>) -> Self {
        Self { cache }
    }

    pub async fn handle(&self, _query: GetCacheStatsQuery) -> Result<CacheStats, ApplicationError> {
        Ok(self.cache.stats().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::audio::AudioArtifact;
    use crate::infrastructure::memory::InMemoryKeyValueStore;
    use crate::infrastructure::persistence::TieredAudioCache;

    #[tokio::test]
    async fn test_stats_reflect_cache_activity() {
        let cache = TieredAudioCache::new(InMemoryKeyValueStore::unbounded().arc(), 5).arc();
        cache.put("one", AudioArtifact::wav(vec![1])).await;
        cache.get("one").await;
        cache.get("two").await;

        let stats = GetCacheStatsHandler::new(cache)
            .handle(GetCacheStatsQuery)
            .await
            .unwrap();

        assert_eq!(stats.memory_entries, 1);
        assert_eq!(stats.persistent_entries, 1);
        assert_eq!(stats.max_entries, 5);
        assert_eq!(stats.memory_hits, 1);
        assert_eq!(stats.misses, 1);
    }
}
