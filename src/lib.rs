//! VocabFlow - 词汇学习语音服务
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Audio Context: 音频产物、PCM 格式与 WAV 封装
//! - TTS Cache Context: 缓存 key 派生与索引淘汰
//! - Capture Context: VAD 判定、录音状态机与提示音
//!
//! 应用层 (application/):
//! - Ports: 端口定义（GenerativeProvider, AudioCache, KeyValueStore, Microphone, AudioOutput）
//! - Capture: 录音会话编排
//! - Commands: CQRS 命令处理器
//! - Queries: CQRS 查询处理器
//!
//! 基础设施层 (infrastructure/):
//! - HTTP: RESTful API + WebSocket
//! - Persistence: 两级 TTS 缓存 + Sled 键值存储
//! - Memory: 内存键值存储
//! - Adapters: Gemini Client, cpal 音频设备, 编解码
//! - Events: WebSocket 事件发布

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
