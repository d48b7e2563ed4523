//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（Provider、音频缓存、键值存储、音频设备等）
//! - capture: VAD 录音会话与活动会话登记
//! - commands: CQRS 命令及处理器
//! - queries: CQRS 查询及处理器
//! - error: 应用层错误定义

pub mod capture;
pub mod commands;
pub mod error;
pub mod ports;
pub mod queries;

// Re-exports
pub use capture::{CaptureRegistry, CaptureSession, CaptureSettings, RecordingResult};

pub use commands::{
    // TTS commands
    ClearCacheCommand,
    FetchAudioCommand,
    FetchAudioResponse,
    SpeakCommand,
    SpeakResponse,
    // Capture commands
    BeepCommand,
    RecordCommand,
    RecordResponse,
    StopRecordingCommand,
    StopRecordingResponse,
    // Feedback commands
    AnnotateWordCommand,
    PronunciationResult,
    ScorePronunciationCommand,
    // Handlers
    handlers::{
        AnnotateWordHandler, BeepHandler, ClearCacheHandler, FetchAudioHandler, RecordHandler,
        ScorePronunciationHandler, SpeakHandler, SpeechProfile, StopRecordingHandler,
        DEFAULT_TARGET_LANGUAGE,
    },
};

pub use error::ApplicationError;

pub use ports::{
    AudioCachePort, AudioOutputPort, CacheStats, ClipEncoderPort, ClockPort, Credentials,
    GenerativeProviderPort, KeyValueStorePort, MicrophonePort, ProviderError, StorageError,
};

pub use queries::{handlers::GetCacheStatsHandler, GetCacheStatsQuery};
