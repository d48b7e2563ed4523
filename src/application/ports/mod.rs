//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod audio_cache;
mod audio_device;
mod clip_encoder;
mod generative_provider;
mod key_value_store;

pub use audio_cache::{AudioCachePort, CacheStats};
pub use audio_device::{
    AcquiredInput, AudioOutputPort, ChunkRecorder, ClockPort, FrequencyAnalyser,
    InputConstraints, InputStreamHandle, MicrophonePort, PlaybackError, SystemClock,
};
pub use clip_encoder::ClipEncoderPort;
pub use generative_provider::{
    Annotation, AnnotationRequest, Credentials, GenerativeProviderPort, PronunciationRequest,
    PronunciationScore, ProviderError, SpeechPayload, SpeechRequest, WordError,
};
pub use key_value_store::{KeyValueStorePort, StorageError};
