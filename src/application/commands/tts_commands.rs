//! TTS Commands - 语音合成相关命令

use crate::application::ports::Credentials;
use crate::domain::audio::AudioArtifact;

/// 获取音频命令 - 先查缓存，未命中再调用 Provider
#[derive(Debug, Clone)]
pub struct FetchAudioCommand {
    pub text: String,
    /// 请求携带的凭证，优先于配置中的默认凭证
    pub credentials: Option<Credentials>,
}

/// 获取音频响应
#[derive(Debug, Clone)]
pub struct FetchAudioResponse {
    pub artifact: AudioArtifact,
    pub cache_hit: bool,
    /// WAV 产物的时长，其他格式为 None
    pub duration_ms: Option<u64>,
}

/// 本地播放命令
#[derive(Debug, Clone)]
pub struct SpeakCommand {
    pub text: String,
    pub credentials: Option<Credentials>,
}

/// 本地播放响应
#[derive(Debug, Clone)]
pub struct SpeakResponse {
    pub duration_ms: u64,
    pub mime_type: String,
    pub cache_hit: bool,
}

/// 清空缓存命令
#[derive(Debug, Clone, Default)]
pub struct ClearCacheCommand;
