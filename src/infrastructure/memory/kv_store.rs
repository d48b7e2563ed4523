//! In-Memory Key-Value Store
//!
//! 非持久化实现，用于测试和 `cache.persistent = false` 模式

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::application::ports::{KeyValueStorePort, StorageError};

/// 内存键值存储
pub struct InMemoryKeyValueStore {
    items: DashMap<String, String>,
    used_bytes: AtomicU64,
    /// 容量上限（字节），按 key + value 长度计
    quota_bytes: u64,
}

impl InMemoryKeyValueStore {
    pub fn new(quota_bytes: u64) -> Self {
        Self {
            items: DashMap::new(),
            used_bytes: AtomicU64::new(0),
            quota_bytes,
        }
    }

    /// 不限容量
    pub fn unbounded() -> Self {
        Self::new(u64::MAX)
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn keys(&self) -> Vec<String> {
        self.items.iter().map(|e| e.key().clone()).collect()
    }
}

impl Default for InMemoryKeyValueStore {
    fn default() -> Self {
        Self::unbounded()
    }
}

fn item_size(key: &str, value: &str) -> u64 {
    (key.len() + value.len()) as u64
}

impl KeyValueStorePort for InMemoryKeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.items.get(key).map(|v| v.clone()))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let requested = item_size(key, value);
        let previous = self
            .items
            .get(key)
            .map(|v| item_size(key, &v))
            .unwrap_or(0);
        let used = self.used_bytes.load(Ordering::Relaxed).saturating_sub(previous);

        if used.saturating_add(requested) > self.quota_bytes {
            return Err(StorageError::QuotaExceeded {
                used,
                requested,
                quota: self.quota_bytes,
            });
        }

        self.items.insert(key.to_string(), value.to_string());
        self.used_bytes.fetch_sub(previous, Ordering::Relaxed);
        self.used_bytes.fetch_add(requested, Ordering::Relaxed);
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        if let Some((key, value)) = self.items.remove(key) {
            self.used_bytes
                .fetch_sub(item_size(&key, &value), Ordering::Relaxed);
        }
        Ok(())
    }

    fn used_bytes(&self) -> u64 {
        self.used_bytes.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let store = InMemoryKeyValueStore::unbounded();
        store.set_item("a", "123").unwrap();
        assert_eq!(store.get_item("a").unwrap().as_deref(), Some("123"));
        assert_eq!(store.used_bytes(), 4);

        store.remove_item("a").unwrap();
        assert_eq!(store.get_item("a").unwrap(), None);
        assert_eq!(store.used_bytes(), 0);
    }

    #[test]
    fn test_overwrite_accounts_previous_size() {
        let store = InMemoryKeyValueStore::new(10);
        store.set_item("k", "123456789").unwrap();
        // 覆盖同一 key 不应把旧值重复计入
        store.set_item("k", "abcdefghi").unwrap();
        assert_eq!(store.used_bytes(), 10);
    }

    #[test]
    fn test_quota_exceeded() {
        let store = InMemoryKeyValueStore::new(8);
        store.set_item("a", "1234").unwrap();
        let err = store.set_item("b", "1234").unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { quota: 8, .. }));
        assert_eq!(store.get_item("b").unwrap(), None);
    }
}
