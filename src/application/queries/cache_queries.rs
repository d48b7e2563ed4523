//! Cache Queries - TTS 缓存查询

/// 获取缓存统计
#[derive(Debug, Clone, Default)]
pub struct GetCacheStatsQuery;
