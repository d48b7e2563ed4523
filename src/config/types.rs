//! Configuration Types
//!
//! 定义所有配置结构体

use serde::Deserialize;
use std::time::Duration;

use crate::application::capture::CaptureSettings;
use crate::application::ports::{Credentials, InputConstraints};
use crate::domain::capture::{BeepTone, VadConfig};

/// 应用主配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,

    /// 生成式 AI Provider 配置
    #[serde(default)]
    pub provider: ProviderConfig,

    /// TTS 缓存配置
    #[serde(default)]
    pub cache: CacheConfig,

    /// 录音配置
    #[serde(default)]
    pub capture: CaptureConfig,

    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
}

/// 服务器配置
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,

    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5070
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl ServerConfig {
    /// 获取服务器地址
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Provider 实现
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Gemini,
    /// 离线假实现，不访问网络
    Fake,
}

/// Provider 配置
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub kind: ProviderKind,

    #[serde(default = "default_provider_url")]
    pub base_url: String,

    /// 默认 API Key，请求头 X-Api-Key 优先
    #[serde(default)]
    pub api_key: Option<String>,

    #[serde(default = "default_tts_model")]
    pub tts_model: String,

    #[serde(default = "default_text_model")]
    pub text_model: String,

    #[serde(default = "default_voice_name")]
    pub voice_name: String,

    /// 请求超时（秒），不设置则不限时
    #[serde(default)]
    pub timeout_secs: Option<u64>,

    /// 释义和点评使用的语言
    #[serde(default = "default_target_language")]
    pub target_language: String,
}

fn default_provider_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_tts_model() -> String {
    "gemini-2.5-flash-preview-tts".to_string()
}

fn default_text_model() -> String {
    "gemini-2.5-flash".to_string()
}

fn default_voice_name() -> String {
    "Puck".to_string()
}

fn default_target_language() -> String {
    "Chinese".to_string()
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            kind: ProviderKind::default(),
            base_url: default_provider_url(),
            api_key: None,
            tts_model: default_tts_model(),
            text_model: default_text_model(),
            voice_name: default_voice_name(),
            timeout_secs: None,
            target_language: default_target_language(),
        }
    }
}

impl ProviderConfig {
    /// 配置中的默认凭证，空白视为未配置
    pub fn credentials(&self) -> Option<Credentials> {
        self.api_key.as_deref().and_then(Credentials::new)
    }
}

/// TTS 缓存配置
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// false 时使用内存键值存储，重启后丢失
    #[serde(default = "default_true")]
    pub persistent: bool,

    /// sled 数据库路径
    #[serde(default = "default_cache_path")]
    pub db_path: String,

    /// 持久化条目上限
    #[serde(default = "default_max_entries")]
    pub max_entries: usize,

    /// 持久化容量上限（字节）
    #[serde(default = "default_quota_bytes")]
    pub quota_bytes: u64,
}

fn default_true() -> bool {
    true
}

fn default_cache_path() -> String {
    "data/tts_cache.sled".to_string()
}

fn default_max_entries() -> usize {
    20
}

fn default_quota_bytes() -> u64 {
    5 * 1024 * 1024 // 5MB
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            persistent: default_true(),
            db_path: default_cache_path(),
            max_entries: default_max_entries(),
            quota_bytes: default_quota_bytes(),
        }
    }
}

/// 录音配置
#[derive(Debug, Clone, Deserialize)]
pub struct CaptureConfig {
    /// 归一化音量阈值 (0-1)
    #[serde(default = "default_silence_threshold")]
    pub silence_threshold: f32,

    #[serde(default = "default_silence_duration")]
    pub silence_duration_ms: u64,

    #[serde(default = "default_max_recording")]
    pub max_recording_ms: u64,

    #[serde(default = "default_min_recording")]
    pub min_recording_ms: u64,

    /// 录音器分块时间片
    #[serde(default = "default_chunk_interval")]
    pub chunk_interval_ms: u64,

    /// 音量监控间隔
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,

    /// 优先编码为 Ogg/Opus，不可用时回落 WAV
    #[serde(default = "default_true")]
    pub prefer_opus: bool,

    #[serde(default = "default_opus_bitrate")]
    pub opus_bitrate: u32,

    /// FFT 窗口大小（2 的幂）
    #[serde(default = "default_fft_size")]
    pub fft_size: usize,

    #[serde(default = "default_true")]
    pub echo_cancellation: bool,

    #[serde(default = "default_true")]
    pub noise_suppression: bool,

    #[serde(default = "default_true")]
    pub auto_gain_control: bool,

    /// 开始录音提示音
    #[serde(default)]
    pub beep: BeepTone,
}

fn default_silence_threshold() -> f32 {
    0.02
}

fn default_silence_duration() -> u64 {
    1500
}

fn default_max_recording() -> u64 {
    30_000
}

fn default_min_recording() -> u64 {
    500
}

fn default_chunk_interval() -> u64 {
    100
}

fn default_tick_interval() -> u64 {
    16
}

fn default_opus_bitrate() -> u32 {
    32000 // 32kbps，语音足够
}

fn default_fft_size() -> usize {
    2048
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            silence_threshold: default_silence_threshold(),
            silence_duration_ms: default_silence_duration(),
            max_recording_ms: default_max_recording(),
            min_recording_ms: default_min_recording(),
            chunk_interval_ms: default_chunk_interval(),
            tick_interval_ms: default_tick_interval(),
            prefer_opus: default_true(),
            opus_bitrate: default_opus_bitrate(),
            fft_size: default_fft_size(),
            echo_cancellation: default_true(),
            noise_suppression: default_true(),
            auto_gain_control: default_true(),
            beep: BeepTone::default(),
        }
    }
}

impl CaptureConfig {
    pub fn vad(&self) -> VadConfig {
        VadConfig {
            silence_threshold: self.silence_threshold,
            silence_duration_ms: self.silence_duration_ms,
            max_recording_ms: self.max_recording_ms,
            min_recording_ms: self.min_recording_ms,
        }
    }

    pub fn constraints(&self) -> InputConstraints {
        InputConstraints {
            echo_cancellation: self.echo_cancellation,
            noise_suppression: self.noise_suppression,
            auto_gain_control: self.auto_gain_control,
        }
    }

    pub fn settings(&self) -> CaptureSettings {
        CaptureSettings {
            vad: self.vad(),
            constraints: self.constraints(),
            chunk_interval: Duration::from_millis(self.chunk_interval_ms),
            tick_interval: Duration::from_millis(self.tick_interval_ms),
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, Deserialize)]
pub struct LogConfig {
    /// 日志级别，RUST_LOG 优先
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 是否启用 JSON 格式
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.addr(), "127.0.0.1:5070");
        assert_eq!(config.provider.kind, ProviderKind::Gemini);
        assert_eq!(config.provider.voice_name, "Puck");
        assert!(config.provider.timeout_secs.is_none());
        assert_eq!(config.cache.max_entries, 20);
        assert!(config.cache.persistent);
    }

    #[test]
    fn test_capture_settings_match_domain_defaults() {
        let settings = CaptureConfig::default().settings();
        assert_eq!(settings, CaptureSettings::default());
    }

    #[test]
    fn test_blank_api_key_is_not_a_credential() {
        let mut provider = ProviderConfig::default();
        assert!(provider.credentials().is_none());

        provider.api_key = Some("  ".to_string());
        assert!(provider.credentials().is_none());

        provider.api_key = Some("key".to_string());
        assert_eq!(provider.credentials().unwrap().expose(), "key");
    }
}
