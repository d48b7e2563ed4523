//! VocabFlow - 词汇学习语音服务
//!
//! - Domain: audio/, tts_cache/, capture/ (Bounded Contexts)
//! - Application: capture, commands, queries, ports
//! - Infrastructure: http, persistence, memory, adapters, events

use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use vocabflow::application::ports::{GenerativeProviderPort, KeyValueStorePort, SystemClock};
use vocabflow::application::SpeechProfile;
use vocabflow::config::{load_config, print_config, AppConfig, ProviderKind};
use vocabflow::infrastructure::adapters::{
    negotiate_clip_encoder, CpalMicrophone, CpalOutput, FakeProvider, GeminiClient,
    GeminiClientConfig,
};
use vocabflow::infrastructure::events::EventPublisher;
use vocabflow::infrastructure::http::{AppPorts, AppSettings, AppState, HttpServer, ServerConfig};
use vocabflow::infrastructure::memory::InMemoryKeyValueStore;
use vocabflow::infrastructure::persistence::{SledKeyValueStore, SledStoreConfig, TieredAudioCache};

fn init_tracing(config: &AppConfig) {
    let log_filter = format!(
        "{},vocabflow={},tower_http=debug",
        config.log.level, config.log.level
    );
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_filter));

    if config.log.json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn build_provider(config: &AppConfig) -> anyhow::Result<Arc<dyn GenerativeProviderPort>> {
    Ok(match config.provider.kind {
        ProviderKind::Gemini => {
            let client_config = GeminiClientConfig::new(&config.provider.base_url)
                .with_text_model(&config.provider.text_model)
                .with_timeout(config.provider.timeout_secs);
            Arc::new(GeminiClient::new(client_config)?)
        }
        ProviderKind::Fake => Arc::new(FakeProvider::new()),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    init_tracing(&config);

    tracing::info!("VocabFlow - 词汇学习语音服务");
    print_config(&config);

    // 键值存储：sled 持久化或纯内存
    let mut sled_store: Option<Arc<SledKeyValueStore>> = None;
    let store: Arc<dyn KeyValueStorePort> = if config.cache.persistent {
        if let Some(parent) = std::path::Path::new(&config.cache.db_path).parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let sled = SledKeyValueStore::new(&SledStoreConfig {
            db_path: config.cache.db_path.clone(),
            quota_bytes: config.cache.quota_bytes,
        })?
        .arc();
        sled_store = Some(sled.clone());
        sled
    } else {
        InMemoryKeyValueStore::new(config.cache.quota_bytes).arc()
    };

    let audio_cache = TieredAudioCache::new(store, config.cache.max_entries).arc();
    let provider = build_provider(&config)?;

    // 音频设备
    let encoder = negotiate_clip_encoder(config.capture.prefer_opus, config.capture.opus_bitrate);
    tracing::info!(mime_type = %encoder.mime_type(), "Clip encoder selected");

    let ports = AppPorts {
        audio_cache,
        provider,
        microphone: Arc::new(CpalMicrophone::new(config.capture.fft_size)),
        output: Arc::new(CpalOutput::new()),
        clock: Arc::new(SystemClock::new()),
        encoder,
        event_publisher: EventPublisher::new().arc(),
    };

    let settings = AppSettings {
        speech: SpeechProfile {
            model: config.provider.tts_model.clone(),
            voice_name: config.provider.voice_name.clone(),
        },
        default_credentials: config.provider.credentials(),
        target_language: config.provider.target_language.clone(),
        capture: config.capture.settings(),
        beep: config.capture.beep,
    };

    let server_config = ServerConfig::new(&config.server.host, config.server.port);
    let server = HttpServer::new(server_config, AppState::new(ports, settings));

    tracing::info!("Starting HTTP server...");

    // 启动服务器（带优雅关闭）
    server
        .run_with_shutdown(async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to listen for ctrl-c");
            tracing::info!("Received shutdown signal");
        })
        .await?;

    if let Some(sled_store) = sled_store {
        if let Err(e) = sled_store.flush() {
            tracing::warn!(error = %e, "Failed to flush TTS cache store");
        }
    }

    tracing::info!("Server shutdown complete");

    Ok(())
}
