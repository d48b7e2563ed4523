//! Configuration Loader
//!
//! 实现多源配置加载与合并逻辑
//!
//! 优先级（从高到低）：
//! 1. 环境变量
//! 2. 配置文件（config.toml）
//! 3. 默认值

use config::{Config, ConfigError as ConfigCrateError, Environment, File};
use std::path::Path;
use thiserror::Error;

use super::types::{AppConfig, ProviderKind};

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

impl From<ConfigCrateError> for ConfigError {
    fn from(err: ConfigCrateError) -> Self {
        ConfigError::LoadError(err.to_string())
    }
}

/// 配置文件搜索路径
const CONFIG_FILE_NAMES: &[&str] = &["config", "config.local"];

/// 加载应用配置
///
/// 按优先级从高到低合并配置：
/// 1. 环境变量（前缀 `VOCABFLOW_`，层级分隔符 `__`）
/// 2. 配置文件（config.toml 或 config.local.toml）
/// 3. 默认值
///
/// # 环境变量示例
/// - `VOCABFLOW_SERVER__PORT=8080`
/// - `VOCABFLOW_PROVIDER__API_KEY=...`
/// - `VOCABFLOW_PROVIDER__KIND=fake`
/// - `VOCABFLOW_CACHE__PERSISTENT=false`
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from_path(None)
}

/// 从指定路径加载配置
///
/// # 参数
/// - `config_path` - 可选的配置文件路径，如果为 None 则使用默认搜索路径
pub fn load_config_from_path(config_path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. 默认值（最低优先级），Option 字段不设默认
    builder = builder
        .set_default("server.host", "127.0.0.1")?
        .set_default("server.port", 5070)?
        .set_default("provider.kind", "gemini")?
        .set_default("provider.base_url", "https://generativelanguage.googleapis.com")?
        .set_default("provider.tts_model", "gemini-2.5-flash-preview-tts")?
        .set_default("provider.text_model", "gemini-2.5-flash")?
        .set_default("provider.voice_name", "Puck")?
        .set_default("provider.target_language", "Chinese")?
        .set_default("cache.persistent", true)?
        .set_default("cache.db_path", "data/tts_cache.sled")?
        .set_default("cache.max_entries", 20)?
        .set_default("cache.quota_bytes", 5 * 1024 * 1024)?
        .set_default("capture.silence_threshold", 0.02)?
        .set_default("capture.silence_duration_ms", 1500)?
        .set_default("capture.max_recording_ms", 30_000)?
        .set_default("capture.min_recording_ms", 500)?
        .set_default("capture.chunk_interval_ms", 100)?
        .set_default("capture.tick_interval_ms", 16)?
        .set_default("capture.prefer_opus", true)?
        .set_default("capture.opus_bitrate", 32000)?
        .set_default("capture.fft_size", 2048)?
        .set_default("log.level", "info")?
        .set_default("log.json", false)?;

    // 2. 配置文件（如果存在）
    if let Some(path) = config_path {
        builder = builder.add_source(File::from(path).required(true));
    } else {
        for name in CONFIG_FILE_NAMES {
            builder = builder.add_source(File::with_name(name).required(false));
        }
    }

    // 3. 环境变量（最高优先级）
    // 例如: VOCABFLOW_PROVIDER__API_KEY=...
    builder = builder.add_source(
        Environment::with_prefix("VOCABFLOW")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    );

    let config = builder.build()?;

    let app_config: AppConfig = config.try_deserialize().map_err(|e| {
        ConfigError::ParseError(format!("Failed to deserialize config: {}", e))
    })?;

    validate_config(&app_config)?;

    Ok(app_config)
}

fn invalid(message: impl Into<String>) -> Result<(), ConfigError> {
    Err(ConfigError::ValidationError(message.into()))
}

/// 验证配置有效性
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    if config.server.port == 0 {
        return invalid("Server port cannot be 0");
    }

    if config.provider.kind == ProviderKind::Gemini && config.provider.base_url.trim().is_empty() {
        return invalid("Provider base_url cannot be empty");
    }

    if config.provider.timeout_secs == Some(0) {
        return invalid("Provider timeout cannot be 0, omit it to disable the timeout");
    }

    if config.cache.max_entries == 0 {
        return invalid("Cache max_entries cannot be 0");
    }

    if config.cache.persistent && config.cache.db_path.trim().is_empty() {
        return invalid("Cache db_path cannot be empty when persistent");
    }

    let capture = &config.capture;
    if !(capture.silence_threshold > 0.0 && capture.silence_threshold < 1.0) {
        return invalid(format!(
            "Capture silence_threshold must be within (0, 1), got {}",
            capture.silence_threshold
        ));
    }

    if capture.min_recording_ms >= capture.max_recording_ms {
        return invalid("Capture min_recording_ms must be less than max_recording_ms");
    }

    if capture.tick_interval_ms == 0 || capture.chunk_interval_ms == 0 {
        return invalid("Capture tick and chunk intervals cannot be 0");
    }

    if !capture.fft_size.is_power_of_two() || capture.fft_size < 32 {
        return invalid(format!(
            "Capture fft_size must be a power of two >= 32, got {}",
            capture.fft_size
        ));
    }

    Ok(())
}

/// 打印配置信息（用于启动时日志）
pub fn print_config(config: &AppConfig) {
    tracing::info!("=== Application Configuration ===");
    tracing::info!("Server: {}", config.server.addr());
    tracing::info!("Provider: {:?} ({})", config.provider.kind, config.provider.base_url);
    tracing::info!(
        "Provider API Key: {}",
        if config.provider.credentials().is_some() { "configured" } else { "not set" }
    );
    tracing::info!("TTS Model: {} / {}", config.provider.tts_model, config.provider.voice_name);
    match config.provider.timeout_secs {
        Some(secs) => tracing::info!("Provider Timeout: {}s", secs),
        None => tracing::info!("Provider Timeout: none"),
    }
    if config.cache.persistent {
        tracing::info!("Cache: {} (max {} entries)", config.cache.db_path, config.cache.max_entries);
    } else {
        tracing::info!("Cache: in-memory (max {} entries)", config.cache.max_entries);
    }
    tracing::info!(
        "Capture: threshold={} silence={}ms max={}ms",
        config.capture.silence_threshold,
        config.capture.silence_duration_ms,
        config.capture.max_recording_ms
    );
    tracing::info!("Log Level: {}", config.log.level);
    tracing::info!("=================================");
}
