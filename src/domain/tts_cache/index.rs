//! TTS Cache - 持久化索引
//!
//! 索引按插入顺序排列（最旧在前），整体序列化为一条 JSON 记录。
//!
//! 不变量:
//! - 每个存储条目恰好对应一行索引，反之亦然
//! - 同一文本最多一行；同一 key 最多一行

use serde::{Deserialize, Serialize};

/// 索引行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    /// 存储 key
    pub key: String,
    /// 规范化后的原文
    pub text: String,
    /// 创建时间 (Unix 毫秒)
    pub timestamp: i64,
}

/// 缓存索引
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheIndex {
    entries: Vec<IndexEntry>,
}

impl CacheIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_entries(entries: Vec<IndexEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_text(&self, text: &str) -> bool {
        self.entries.iter().any(|e| e.text == text)
    }

    /// 移除即将被新写入覆盖的行
    ///
    /// 同文本的旧行，以及映射到同一 key 的其他文本（其存储条目将被覆盖）。
    /// 返回被移除的行。
    pub fn supersede(&mut self, text: &str, key: &str) -> Vec<IndexEntry> {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.entries)
            .into_iter()
            .partition(|e| e.text == text || e.key == key);
        self.entries = kept;
        removed
    }

    /// 逐条淘汰最旧的行，直到长度小于 `max_entries`
    pub fn evict_to_admit(&mut self, max_entries: usize) -> Vec<IndexEntry> {
        let mut evicted = Vec::new();
        while !self.entries.is_empty() && self.entries.len() >= max_entries {
            evicted.push(self.entries.remove(0));
        }
        evicted
    }

    /// 追加新行（最新）
    pub fn push(&mut self, entry: IndexEntry) {
        self.entries.push(entry);
    }

    pub fn into_entries(self) -> Vec<IndexEntry> {
        self.entries
    }
}
