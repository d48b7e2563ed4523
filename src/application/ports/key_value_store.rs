//! Key-Value Store Port - 持久化键值存储
//!
//! 字符串 key / 文本 value 的简单存储，容量有限（quota）

use thiserror::Error;

/// 存储错误
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    #[error("Storage quota exceeded: {used} + {requested} > {quota} bytes")]
    QuotaExceeded {
        used: u64,
        requested: u64,
        quota: u64,
    },

    #[error("Storage read error: {0}")]
    ReadError(String),

    #[error("Storage write error: {0}")]
    WriteError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Key-Value Store Port
pub trait KeyValueStorePort: Send + Sync {
    /// 读取 value，不存在返回 None
    fn get_item(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// 写入 value（覆盖同名 key）
    fn set_item(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// 删除 key（不存在时视为成功）
    fn remove_item(&self, key: &str) -> Result<(), StorageError>;

    /// 当前已用字节数
    fn used_bytes(&self) -> u64;
}
