//! TTS Cache Context - 语音缓存限界上下文
//!
//! 职责:
//! - 文本规范化与缓存 key 派生
//! - 持久化索引（插入顺序、按条数淘汰）

mod index;
mod key;

pub use index::{CacheIndex, IndexEntry};
pub use key::{normalize_text, CacheKey, CACHE_INDEX_KEY, CACHE_KEY_PREFIX};
