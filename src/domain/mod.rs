//! Domain Layer - 领域层
//!
//! 包含三个限界上下文:
//! - Audio Context: 音频产物与格式
//! - TTS Cache Context: 缓存 key 与索引
//! - Capture Context: VAD 与录音状态机

pub mod audio;
pub mod capture;
pub mod tts_cache;
