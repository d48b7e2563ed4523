//! Audio Cache Port - TTS 音频缓存
//!
//! 两级缓存（内存 + 持久化）的抽象接口，具体实现见
//! infrastructure/persistence/tiered_audio_cache.rs

use async_trait::async_trait;
use serde::Serialize;

use crate::domain::audio::AudioArtifact;

/// 缓存统计信息
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// 内存缓存条目数
    pub memory_entries: usize,
    /// 持久化索引条目数
    pub persistent_entries: usize,
    /// 持久化条目上限
    pub max_entries: usize,
    /// 内存命中次数
    pub memory_hits: u64,
    /// 持久化命中次数
    pub persistent_hits: u64,
    /// 未命中次数
    pub misses: u64,
}

/// Audio Cache Port
///
/// 以规范化文本为身份的音频缓存。
/// 持久化失败只记录日志不向上传播：缓存是性能优化，不影响当前会话的正确性。
#[async_trait]
pub trait AudioCachePort: Send + Sync {
    /// 读取缓存，未命中返回 None
    async fn get(&self, text: &str) -> Option<AudioArtifact>;

    /// 写入缓存（先内存，再尽力持久化）
    async fn put(&self, text: &str, artifact: AudioArtifact);

    /// 清空内存缓存、持久化条目和索引
    async fn clear(&self);

    /// 获取缓存统计信息
    async fn stats(&self) -> CacheStats;
}
