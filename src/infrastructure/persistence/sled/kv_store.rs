//! Sled-based Key-Value Store Implementation
//!
//! 持久化的键值存储，按 key + value 字节数计算容量，超出 quota 时拒绝写入

use sled::Db;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::application::ports::{KeyValueStorePort, StorageError};

/// Sled 存储配置
#[derive(Debug, Clone)]
pub struct SledStoreConfig {
    /// 数据库路径
    pub db_path: String,
    /// 最大容量（字节）
    pub quota_bytes: u64,
}

impl Default for SledStoreConfig {
    fn default() -> Self {
        Self {
            db_path: "data/tts_cache.sled".to_string(),
            quota_bytes: 5 * 1024 * 1024, // 5MB
        }
    }
}

/// Sled 键值存储
pub struct SledKeyValueStore {
    db: Db,
    quota_bytes: u64,
    used_bytes: AtomicU64,
}

impl SledKeyValueStore {
    /// 打开（或创建）存储
    pub fn new(config: &SledStoreConfig) -> Result<Self, StorageError> {
        let db = sled::open(&config.db_path).map_err(|e| StorageError::ReadError(e.to_string()))?;

        let used_bytes = Self::calculate_total_size(&db)?;

        tracing::info!(
            db_path = %config.db_path,
            quota_bytes = config.quota_bytes,
            used_bytes = used_bytes,
            "SledKeyValueStore initialized"
        );

        Ok(Self {
            db,
            quota_bytes: config.quota_bytes,
            used_bytes: AtomicU64::new(used_bytes),
        })
    }

    /// 打开现有存储
    pub fn open<P: AsRef<Path>>(path: P, quota_bytes: u64) -> Result<Self, StorageError> {
        let config = SledStoreConfig {
            db_path: path.as_ref().to_string_lossy().to_string(),
            quota_bytes,
        };
        Self::new(&config)
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 计算数据库中所有条目的总大小
    fn calculate_total_size(db: &Db) -> Result<u64, StorageError> {
        let mut total = 0u64;
        for item in db.iter() {
            let (key, value) = item.map_err(|e| StorageError::ReadError(e.to_string()))?;
            total += (key.len() + value.len()) as u64;
        }
        Ok(total)
    }

    /// 刷新数据库
    pub fn flush(&self) -> Result<(), StorageError> {
        self.db
            .flush()
            .map_err(|e| StorageError::WriteError(e.to_string()))?;
        Ok(())
    }
}

impl KeyValueStorePort for SledKeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError> {
        match self.db.get(key) {
            Ok(Some(data)) => String::from_utf8(data.to_vec())
                .map(Some)
                .map_err(|e| StorageError::SerializationError(e.to_string())),
            Ok(None) => Ok(None),
            Err(e) => Err(StorageError::ReadError(e.to_string())),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let requested = (key.len() + value.len()) as u64;
        let previous = self
            .db
            .get(key)
            .map_err(|e| StorageError::ReadError(e.to_string()))?
            .map(|v| (key.len() + v.len()) as u64)
            .unwrap_or(0);
        let used = self.used_bytes.load(Ordering::Relaxed).saturating_sub(previous);

        if used.saturating_add(requested) > self.quota_bytes {
            return Err(StorageError::QuotaExceeded {
                used,
                requested,
                quota: self.quota_bytes,
            });
        }

        self.db
            .insert(key, value.as_bytes())
            .map_err(|e| StorageError::WriteError(e.to_string()))?;

        self.used_bytes.fetch_sub(previous, Ordering::Relaxed);
        self.used_bytes.fetch_add(requested, Ordering::Relaxed);

        tracing::trace!(key = %key, size_bytes = requested, "Item stored");
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StorageError> {
        if let Some(data) = self
            .db
            .remove(key)
            .map_err(|e| StorageError::WriteError(e.to_string()))?
        {
            self.used_bytes
                .fetch_sub((key.len() + data.len()) as u64, Ordering::Relaxed);
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
    use tempfile::tempdir;

    #[test]
    fn test_store_set_get_remove() {
        let dir = tempdir().unwrap();
        let store = SledKeyValueStore::open(dir.path().join("kv.sled"), 1024 * 1024).unwrap();

        store.set_item("greeting", "hello").unwrap();
        assert_eq!(store.get_item("greeting").unwrap().as_deref(), Some("hello"));
        assert_eq!(store.used_bytes(), 13);

        store.remove_item("greeting").unwrap();
        assert_eq!(store.get_item("greeting").unwrap(), None);
        assert_eq!(store.used_bytes(), 0);

        // 删除不存在的 key 不报错
        store.remove_item("missing").unwrap();
    }

    #[test]
    fn test_store_quota_exceeded() {
        let dir = tempdir().unwrap();
        let store = SledKeyValueStore::open(dir.path().join("kv.sled"), 16).unwrap();

        store.set_item("a", "0123456789").unwrap();
        let err = store.set_item("b", "0123456789").unwrap_err();
        assert!(matches!(err, StorageError::QuotaExceeded { .. }));
        assert_eq!(store.get_item("b").unwrap(), None);
    }

    #[test]
    fn test_store_reopen_restores_usage() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("kv.sled");

        {
            let store = SledKeyValueStore::open(&path, 1024).unwrap();
            store.set_item("key", "value").unwrap();
            store.flush().unwrap();
        }

        let store = SledKeyValueStore::open(&path, 1024).unwrap();
        assert_eq!(store.get_item("key").unwrap().as_deref(), Some("value"));
        assert_eq!(store.used_bytes(), 8);
    }
}
