//! Tiered Audio Cache - 内存 + 持久化两级 TTS 缓存
//!
//! - 内存层: 以规范化文本为 key，进程生命周期内有效
//! - 持久层: 键值存储 + 索引，按条数上限从最旧开始淘汰
//!
//! 持久层写入失败（如超出容量）只记录日志，内存层仍然可用。

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::Utc;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use crate::application::ports::{AudioCachePort, CacheStats, KeyValueStorePort, StorageError};
use crate::domain::audio::AudioArtifact;
use crate::domain::tts_cache::{normalize_text, CacheIndex, CacheKey, IndexEntry, CACHE_INDEX_KEY};

/// 默认持久化条目上限
pub const DEFAULT_MAX_ENTRIES: usize = 20;

/// 持久化条目
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredEntry {
    base64: String,
    mime_type: String,
    timestamp: i64,
    /// 规范化原文，读取时校验，防止 key 碰撞返回其他文本的音频
    text: String,
}

/// 两级音频缓存
pub struct TieredAudioCache {
    memory: DashMap<String, AudioArtifact>,
    store: Arc<dyn KeyValueStorePort>,
    max_entries: usize,
    /// 串行化索引的读-改-写
    index_lock: Mutex<()>,
    memory_hits: AtomicU64,
    persistent_hits: AtomicU64,
    misses: AtomicU64,
}

impl TieredAudioCache {
    pub fn new(store: Arc<dyn KeyValueStorePort>, max_entries: usize) -> Self {
        tracing::info!(max_entries = max_entries, "TieredAudioCache initialized");

        Self {
            memory: DashMap::new(),
            store,
            max_entries,
            index_lock: Mutex::new(()),
            memory_hits: AtomicU64::new(0),
            persistent_hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 读取索引，缺失或损坏时视为空
    fn load_index(&self) -> CacheIndex {
        match self.store.get_item(CACHE_INDEX_KEY) {
            Ok(Some(json)) => serde_json::from_str(&json).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "Corrupted TTS cache index, starting empty");
                CacheIndex::new()
            }),
            Ok(None) => CacheIndex::new(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read TTS cache index");
                CacheIndex::new()
            }
        }
    }

    fn save_index(&self, index: &CacheIndex) -> Result<(), StorageError> {
        let json = serde_json::to_string(index)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        self.store.set_item(CACHE_INDEX_KEY, &json)
    }

    fn read_persistent(&self, text: &str) -> Result<Option<AudioArtifact>, StorageError> {
        let key = CacheKey::derive(text);

        let Some(json) = self.store.get_item(key.as_str())? else {
            return Ok(None);
        };

        let entry: StoredEntry = serde_json::from_str(&json)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        if entry.text != text {
            tracing::debug!(
                cache_key = %key,
                "Cache key collision, stored entry belongs to another text"
            );
            return Ok(None);
        }

        let data = BASE64
            .decode(entry.base64.as_bytes())
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        Ok(Some(AudioArtifact::new(data, entry.mime_type)))
    }

    fn write_persistent(&self, text: &str, artifact: &AudioArtifact) -> Result<(), StorageError> {
        let key = CacheKey::derive(text);
        let timestamp = Utc::now().timestamp_millis();

        let entry = StoredEntry {
            base64: BASE64.encode(artifact.data()),
            mime_type: artifact.mime_type().to_string(),
            timestamp,
            text: text.to_string(),
        };
        let entry_json = serde_json::to_string(&entry)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        let _guard = self.index_lock.lock().unwrap_or_else(|p| p.into_inner());
        let mut index = self.load_index();

        let superseded = index.supersede(text, key.as_str());
        if superseded.iter().any(|e| e.text != text) {
            tracing::debug!(cache_key = %key, "Superseding colliding cache entry");
        }

        for evicted in index.evict_to_admit(self.max_entries) {
            self.remove_record(&evicted.key, "evicted");
            self.memory.remove(&evicted.text);
            tracing::debug!(cache_key = %evicted.key, "Evicted oldest TTS cache entry");
        }

        if let Err(e) = self.store.set_item(key.as_str(), &entry_json) {
            // 被替换行的旧条目已无索引，删除以免成为孤儿
            if !superseded.is_empty() {
                self.remove_record(key.as_str(), "superseded");
            }
            if let Err(index_err) = self.save_index(&index) {
                tracing::warn!(error = %index_err, "Failed to save TTS cache index");
            }
            return Err(e);
        }

        index.push(IndexEntry {
            key: key.to_string(),
            text: text.to_string(),
            timestamp,
        });

        if let Err(e) = self.save_index(&index) {
            // 淘汰与替换已生效，回退为不含新行的索引
            self.remove_record(key.as_str(), "unindexed");
            index.supersede(text, key.as_str());
            if let Err(index_err) = self.save_index(&index) {
                tracing::warn!(error = %index_err, "Failed to save TTS cache index after rollback");
            }
            return Err(e);
        }

        Ok(())
    }

    /// 删除存储条目，失败只记录日志
    fn remove_record(&self, key: &str, reason: &str) {
        if let Err(e) = self.store.remove_item(key) {
            tracing::warn!(cache_key = %key, reason = reason, error = %e, "Failed to remove TTS cache entry");
        }
    }
}

#[async_trait]
impl AudioCachePort for TieredAudioCache {
    async fn get(&self, text: &str) -> Option<AudioArtifact> {
        let text = normalize_text(text);

        if let Some(artifact) = self.memory.get(text) {
            self.memory_hits.fetch_add(1, Ordering::Relaxed);
            return Some(artifact.clone());
        }

        match self.read_persistent(text) {
            Ok(Some(artifact)) => {
                self.memory.insert(text.to_string(), artifact.clone());
                self.persistent_hits.fetch_add(1, Ordering::Relaxed);
                Some(artifact)
            }
            Ok(None) => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read TTS audio from persistent cache");
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    async fn put(&self, text: &str, artifact: AudioArtifact) {
        let text = normalize_text(text);
        self.memory.insert(text.to_string(), artifact.clone());

        match self.write_persistent(text, &artifact) {
            Ok(()) => {
                tracing::debug!(
                    text = %text.chars().take(30).collect::<String>(),
                    size_bytes = artifact.len(),
                    "TTS audio cached"
                );
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Failed to persist TTS audio (quota exceeded?), kept in memory only"
                );
            }
        }
    }

    async fn clear(&self) {
        self.memory.clear();

        let _guard = self.index_lock.lock().unwrap_or_else(|p| p.into_inner());
        let index = self.load_index();

        for entry in index.entries() {
            if let Err(e) = self.store.remove_item(&entry.key) {
                tracing::warn!(cache_key = %entry.key, error = %e, "Failed to remove TTS cache entry");
            }
        }
        if let Err(e) = self.store.remove_item(CACHE_INDEX_KEY) {
            tracing::warn!(error = %e, "Failed to remove TTS cache index");
        }

        tracing::info!(entries = index.len(), "TTS cache cleared (memory + persistent)");
    }

    async fn stats(&self) -> CacheStats {
        CacheStats {
            memory_entries: self.memory.len(),
            persistent_entries: self.load_index().len(),
            max_entries: self.max_entries,
            memory_hits: self.memory_hits.load(Ordering::Relaxed),
            persistent_hits: self.persistent_hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::memory::InMemoryKeyValueStore;
    use crate::infrastructure::persistence::sled::SledKeyValueStore;
    use tempfile::tempdir;

    fn artifact(seed: u8) -> AudioArtifact {
        AudioArtifact::new(vec![seed; 64], "audio/wav")
    }

    fn cache_with_store(store: Arc<InMemoryKeyValueStore>) -> TieredAudioCache {
        TieredAudioCache::new(store, DEFAULT_MAX_ENTRIES)
    }

    fn stored_index(store: &InMemoryKeyValueStore) -> CacheIndex {
        store
            .get_item(CACHE_INDEX_KEY)
            .unwrap()
            .map(|json| serde_json::from_str(&json).unwrap())
            .unwrap_or_default()
    }

    /// 删除指定 key 时失败的存储
    struct FailingRemoveStore {
        inner: InMemoryKeyValueStore,
        failing_key: String,
    }

    impl KeyValueStorePort for FailingRemoveStore {
        fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get_item(key)
        }

        fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
            self.inner.set_item(key, value)
        }

        fn remove_item(&self, key: &str) -> Result<(), StorageError> {
            if key == self.failing_key {
                return Err(StorageError::WriteError("disk on fire".to_string()));
            }
            self.inner.remove_item(key)
        }

        fn used_bytes(&self) -> u64 {
            self.inner.used_bytes()
        }
    }

    /// 索引写入按计数失败的存储
    struct FailingIndexStore {
        inner: InMemoryKeyValueStore,
        index_failures: AtomicU64,
    }

    impl FailingIndexStore {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                inner: InMemoryKeyValueStore::unbounded(),
                index_failures: AtomicU64::new(0),
            })
        }

        fn fail_next_index_writes(&self, count: u64) {
            self.index_failures.store(count, Ordering::SeqCst);
        }
    }

    impl KeyValueStorePort for FailingIndexStore {
        fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
            self.inner.get_item(key)
        }

        fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
            if key == CACHE_INDEX_KEY
                && self
                    .index_failures
                    .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                    .is_ok()
            {
                return Err(StorageError::WriteError("index write refused".to_string()));
            }
            self.inner.set_item(key, value)
        }

        fn remove_item(&self, key: &str) -> Result<(), StorageError> {
            self.inner.remove_item(key)
        }

        fn used_bytes(&self) -> u64 {
            self.inner.used_bytes()
        }
    }

    /// 每行索引都有记录，每条记录都有索引行
    fn assert_index_matches_records(store: &InMemoryKeyValueStore) {
        let index = stored_index(store);
        for entry in index.entries() {
            assert!(
                store.get_item(&entry.key).unwrap().is_some(),
                "index row without record: {}",
                entry.key
            );
        }
        for key in store.keys() {
            if key != CACHE_INDEX_KEY {
                assert!(
                    index.entries().iter().any(|e| e.key == key),
                    "record without index row: {key}"
                );
            }
        }
    }

    #[tokio::test]
    async fn test_put_then_get_round_trip() {
        let store = InMemoryKeyValueStore::unbounded().arc();
        let cache = cache_with_store(store.clone());
        let original = AudioArtifact::new(vec![0u8, 1, 2, 255, 128], "audio/mpeg");

        cache.put("  Hello there. ", original.clone()).await;

        let hit = cache.get("Hello there.").await.unwrap();
        assert_eq!(hit.data(), original.data());
        assert_eq!(hit.mime_type(), "audio/mpeg");

        // 冷内存：新实例只能从持久层读取
        let cold = cache_with_store(store);
        let hit = cold.get("Hello there.").await.unwrap();
        assert_eq!(hit, original);
        assert_eq!(cold.stats().await.persistent_hits, 1);

        // 读穿透后内存命中
        cold.get("Hello there.").await.unwrap();
        assert_eq!(cold.stats().await.memory_hits, 1);
    }

    #[tokio::test]
    async fn test_resave_keeps_single_index_entry() {
        let store = InMemoryKeyValueStore::unbounded().arc();
        let cache = cache_with_store(store.clone());

        cache.put("same text", artifact(1)).await;
        cache.put("other text", artifact(2)).await;
        let len_before = stored_index(&store).len();

        cache.put("same text", artifact(3)).await;

        let index = stored_index(&store);
        assert_eq!(index.len(), len_before);
        assert_eq!(
            index.entries().iter().filter(|e| e.text == "same text").count(),
            1
        );
        // 重写后移到最新位置
        assert_eq!(index.entries().last().unwrap().text, "same text");
        assert_eq!(cache.get("same text").await.unwrap(), artifact(3));
    }

    #[tokio::test]
    async fn test_bounded_growth_evicts_oldest() {
        let store = InMemoryKeyValueStore::unbounded().arc();
        let cache = cache_with_store(store.clone());

        for i in 0..25u8 {
            cache.put(&format!("sentence number {i}"), artifact(i)).await;
        }

        assert_eq!(stored_index(&store).len(), 20);
        for i in 0..5u8 {
            assert!(cache.get(&format!("sentence number {i}")).await.is_none());
        }
        for i in 5..25u8 {
            assert_eq!(
                cache.get(&format!("sentence number {i}")).await.unwrap(),
                artifact(i)
            );
        }
        // 索引 + 20 条记录
        assert_eq!(store.len(), 21);
    }

    #[tokio::test]
    async fn test_clear_removes_everything() {
        let store = InMemoryKeyValueStore::unbounded().arc();
        let cache = cache_with_store(store.clone());

        for text in ["one", "two", "three"] {
            cache.put(text, artifact(7)).await;
        }

        cache.clear().await;

        for text in ["one", "two", "three"] {
            assert!(cache.get(text).await.is_none());
        }
        assert!(stored_index(&store).is_empty());
        assert!(store.is_empty());
        assert_eq!(cache.stats().await.memory_entries, 0);
    }

    #[tokio::test]
    async fn test_clear_tolerates_partial_failures() {
        let store = Arc::new(FailingRemoveStore {
            inner: InMemoryKeyValueStore::unbounded(),
            failing_key: CacheKey::derive("two").into_string(),
        });
        let cache = TieredAudioCache::new(store.clone(), DEFAULT_MAX_ENTRIES);

        for text in ["one", "two", "three"] {
            cache.put(text, artifact(1)).await;
        }

        cache.clear().await;

        assert!(store.inner.get_item(CacheKey::derive("one").as_str()).unwrap().is_none());
        assert!(store.inner.get_item(CacheKey::derive("three").as_str()).unwrap().is_none());
        assert!(store.inner.get_item(CACHE_INDEX_KEY).unwrap().is_none());
    }

    #[tokio::test]
    async fn test_key_collision_never_returns_foreign_audio() {
        let store = InMemoryKeyValueStore::unbounded().arc();
        let cache = cache_with_store(store.clone());

        cache.put("Aa", artifact(1)).await;
        cache.put("BB", artifact(2)).await;

        let cold = cache_with_store(store.clone());
        assert!(cold.get("Aa").await.is_none());
        assert_eq!(cold.get("BB").await.unwrap(), artifact(2));

        // 一条记录只对应一行索引
        let index = stored_index(&store);
        assert_eq!(index.len(), 1);
        assert_eq!(index.entries()[0].text, "BB");

        // 原实例内存层仍然正确
        assert_eq!(cache.get("Aa").await.unwrap(), artifact(1));
    }

    #[tokio::test]
    async fn test_quota_failure_degrades_to_memory() {
        let store = InMemoryKeyValueStore::new(64).arc();
        let cache = cache_with_store(store.clone());
        let big = AudioArtifact::new(vec![9u8; 4096], "audio/wav");

        cache.put("too big to persist", big.clone()).await;

        assert_eq!(cache.get("too big to persist").await.unwrap(), big);
        assert!(stored_index(&store).is_empty());
        assert!(store
            .get_item(CacheKey::derive("too big to persist").as_str())
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_eviction_drops_memory_counterpart() {
        let store = InMemoryKeyValueStore::unbounded().arc();
        let cache = TieredAudioCache::new(store, 2);

        cache.put("first", artifact(1)).await;
        cache.put("second", artifact(2)).await;
        cache.put("third", artifact(3)).await;

        assert!(cache.get("first").await.is_none());
        let stats = cache.stats().await;
        assert_eq!(stats.persistent_entries, 2);
        assert_eq!(stats.memory_entries, 2);
    }

    #[tokio::test]
    async fn test_sled_backed_cache_survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cache.sled");

        {
            let store = SledKeyValueStore::open(&path, 1024 * 1024).unwrap().arc();
            let cache = TieredAudioCache::new(store.clone(), DEFAULT_MAX_ENTRIES);
            cache.put("persist me", artifact(42)).await;
            store.flush().unwrap();
        }

        let store = SledKeyValueStore::open(&path, 1024 * 1024).unwrap().arc();
        let cache = TieredAudioCache::new(store, DEFAULT_MAX_ENTRIES);
        assert_eq!(cache.get("persist me").await.unwrap(), artifact(42));
    }

    #[tokio::test]
    async fn test_index_write_failure_rolls_back_to_consistent_index() {
        let store = FailingIndexStore::new();
        let cache = TieredAudioCache::new(store.clone(), 1);

        cache.put("first", artifact(1)).await;
        assert_index_matches_records(&store.inner);

        // 写入 "second" 时淘汰 "first"，随后索引写入失败一次
        store.fail_next_index_writes(1);
        cache.put("second", artifact(2)).await;

        assert_index_matches_records(&store.inner);
        assert!(stored_index(&store.inner).is_empty());
        assert!(store
            .inner
            .get_item(CacheKey::derive("second").as_str())
            .unwrap()
            .is_none());
        // 内存层不受影响
        assert_eq!(cache.get("second").await.unwrap(), artifact(2));
    }

    #[tokio::test]
    async fn test_record_write_failure_keeps_index_consistent() {
        let store = InMemoryKeyValueStore::new(512).arc();
        let cache = TieredAudioCache::new(store.clone(), 1);

        cache.put("small", artifact(1)).await;
        assert_eq!(stored_index(&store).len(), 1);

        // 新记录超出容量，"small" 已被淘汰
        cache
            .put("large", AudioArtifact::new(vec![3u8; 1024], "audio/wav"))
            .await;

        assert_index_matches_records(&store);
        assert!(stored_index(&store).is_empty());
    }
}
