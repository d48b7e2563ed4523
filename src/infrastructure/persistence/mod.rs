//! Persistence Layer - 数据持久化
//!
//! Sled 键值存储与两级 TTS 音频缓存

pub mod sled;
mod tiered_audio_cache;

pub use self::sled::{SledKeyValueStore, SledStoreConfig};
pub use tiered_audio_cache::{TieredAudioCache, DEFAULT_MAX_ENTRIES};
