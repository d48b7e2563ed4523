//! TTS Command Handlers
//!
//! FetchAudio 是语音合成的编排入口：
//! 凭证检查 → 缓存 → Provider → PCM 转 WAV → 写缓存

use std::sync::Arc;

use super::credentials::resolve_credentials;
use crate::application::commands::tts_commands::*;
use crate::application::error::ApplicationError;
use crate::application::ports::{
    AudioCachePort, AudioOutputPort, Credentials, GenerativeProviderPort, ProviderError,
    SpeechPayload, SpeechRequest,
};
use crate::domain::audio::{is_raw_pcm, pcm_format_of, pcm_to_wav, wav_info, AudioArtifact};
use crate::domain::tts_cache::normalize_text;
use crate::infrastructure::events::EventPublisher;

/// 固定的合成参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeechProfile {
    pub model: String,
    pub voice_name: String,
}

impl Default for SpeechProfile {
    fn default() -> Self {
        Self {
            model: "gemini-2.5-flash-preview-tts".to_string(),
            voice_name: "Puck".to_string(),
        }
    }
}

/// 读取 WAV 头得到时长，非 WAV 或头部损坏时为 None
fn wav_duration_ms(artifact: &AudioArtifact) -> Option<u64> {
    if !artifact.mime_type().to_ascii_lowercase().contains("wav") {
        return None;
    }
    match wav_info(artifact.data()) {
        Ok(info) => Some(info.duration_ms),
        Err(e) => {
            tracing::debug!(error = %e, "Unreadable WAV header");
            None
        }
    }
}

/// FetchAudio Handler
pub struct FetchAudioHandler {
    cache: Arc<dyn AudioCachePort>,
    provider: Arc<dyn GenerativeProviderPort>,
    profile: SpeechProfile,
    default_credentials: Option<Credentials>,
}

impl FetchAudioHandler {
    pub fn new(
        cache: Arc<dyn AudioCachePort>,
        provider: Arc<dyn GenerativeProviderPort>,
        profile: SpeechProfile,
    ) -> Self {
        Self {
            cache,
            provider,
            profile,
            default_credentials: None,
        }
    }

    pub fn with_default_credentials(mut self, credentials: Option<Credentials>) -> Self {
        self.default_credentials = credentials;
        self
    }

    pub async fn handle(
        &self,
        cmd: FetchAudioCommand,
    ) -> Result<FetchAudioResponse, ApplicationError> {
        let credentials =
            resolve_credentials(cmd.credentials, self.default_credentials.as_ref())?;

        let text = normalize_text(&cmd.text);
        if text.is_empty() {
            return Err(ApplicationError::validation("Text must not be empty"));
        }

        if let Some(artifact) = self.cache.get(text).await {
            tracing::debug!(
                text = %text.chars().take(30).collect::<String>(),
                "TTS cache hit"
            );
            return Ok(FetchAudioResponse {
                duration_ms: wav_duration_ms(&artifact),
                artifact,
                cache_hit: true,
            });
        }

        let request = SpeechRequest {
            text: text.to_string(),
            model: self.profile.model.clone(),
            voice_name: self.profile.voice_name.clone(),
        };

        let (data, mime_type) = match self.provider.synthesize_speech(request, &credentials).await? {
            SpeechPayload::InlineAudio { data, mime_type } => (data, mime_type),
            SpeechPayload::Absent => return Err(ProviderError::NoAudio.into()),
        };

        tracing::debug!(mime_type = %mime_type, "TTS audio received");

        let artifact = if is_raw_pcm(&mime_type) {
            let format = pcm_format_of(&mime_type);
            tracing::debug!(sample_rate = format.sample_rate, "Converting PCM to WAV");
            AudioArtifact::wav(pcm_to_wav(&data, format))
        } else {
            AudioArtifact::new(data, mime_type)
        };

        self.cache.put(text, artifact.clone()).await;

        Ok(FetchAudioResponse {
            duration_ms: wav_duration_ms(&artifact),
            artifact,
            cache_hit: false,
        })
    }
}

/// Speak Handler - 获取音频并在本机扬声器播放
pub struct SpeakHandler {
    fetch: Arc<FetchAudioHandler>,
    output: Arc<dyn AudioOutputPort>,
}

impl SpeakHandler {
    pub fn new(fetch: Arc<FetchAudioHandler>, output: Arc<dyn AudioOutputPort>) -> Self {
        Self { fetch, output }
    }

    pub async fn handle(&self, cmd: SpeakCommand) -> Result<SpeakResponse, ApplicationError> {
        let fetched = self
            .fetch
            .handle(FetchAudioCommand {
                text: cmd.text,
                credentials: cmd.credentials,
            })
            .await?;

        let output = Arc::clone(&self.output);
        let artifact = fetched.artifact.clone();
        let duration_ms = tokio::task::spawn_blocking(move || output.play_artifact(&artifact))
            .await
            .map_err(|e| ApplicationError::internal(e.to_string()))??;

        Ok(SpeakResponse {
            duration_ms,
            mime_type: fetched.artifact.mime_type().to_string(),
            cache_hit: fetched.cache_hit,
        })
    }
}

/// ClearCache Handler
pub struct ClearCacheHandler {
    cache: Arc<dyn AudioCachePort>,
    event_publisher: Arc<EventPublisher>,
}

impl ClearCacheHandler {
    pub fn new(cache: Arc<dyn AudioCachePort>, event_publisher: Arc<EventPublisher>) -> Self {
        Self {
            cache,
            event_publisher,
        }
    }

    pub async fn handle(&self, _cmd: ClearCacheCommand) -> Result<(), ApplicationError> {
        self.cache.clear().await;
        self.event_publisher.publish_cache_cleared();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::adapters::FakeProvider;
    use crate::infrastructure::memory::InMemoryKeyValueStore;
    use crate::infrastructure::persistence::{TieredAudioCache, DEFAULT_MAX_ENTRIES};

    fn cache() -> Arc<TieredAudioCache> {
        TieredAudioCache::new(InMemoryKeyValueStore::unbounded().arc(), DEFAULT_MAX_ENTRIES).arc()
    }

    fn key() -> Option<Credentials> {
        Credentials::new("test-key")
    }

    fn fetch(text: &str, credentials: Option<Credentials>) -> FetchAudioCommand {
        FetchAudioCommand {
            text: text.to_string(),
            credentials,
        }
    }

    #[tokio::test]
    async fn test_cache_hit_skips_provider() {
        let provider = FakeProvider::new().arc();
        let handler = FetchAudioHandler::new(cache(), provider.clone(), SpeechProfile::default());

        let first = handler.handle(fetch("Hello world", key())).await.unwrap();
        let second = handler.handle(fetch("  Hello world  ", key())).await.unwrap();

        assert!(!first.cache_hit);
        assert!(second.cache_hit);
        assert_eq!(first.artifact, second.artifact);
        assert_eq!(provider.speech_calls(), 1);
    }

    #[tokio::test]
    async fn test_pcm_is_wrapped_as_wav_at_parsed_rate() {
        let provider = FakeProvider::with_speech(SpeechPayload::InlineAudio {
            data: vec![0u8; 3_200],
            mime_type: "audio/L16;codec=pcm;rate=16000".to_string(),
        })
        .arc();
        let handler = FetchAudioHandler::new(cache(), provider.clone(), SpeechProfile::default());

        let response = handler.handle(fetch("convert me", key())).await.unwrap();

        assert_eq!(response.artifact.mime_type(), "audio/wav");
        let info = wav_info(response.artifact.data()).unwrap();
        assert_eq!(info.format.sample_rate, 16_000);
        assert_eq!(info.data_size, 3_200);
        assert_eq!(response.duration_ms, Some(100));

        let request = provider.last_speech_request().unwrap();
        assert_eq!(request.model, "gemini-2.5-flash-preview-tts");
        assert_eq!(request.voice_name, "Puck");
        assert_eq!(request.text, "convert me");
    }

    #[tokio::test]
    async fn test_non_pcm_passes_through() {
        let provider = FakeProvider::with_speech(SpeechPayload::InlineAudio {
            data: vec![0xFF, 0xFB, 0x90],
            mime_type: "audio/mpeg".to_string(),
        })
        .arc();
        let handler = FetchAudioHandler::new(cache(), provider, SpeechProfile::default());

        let response = handler.handle(fetch("mp3 please", key())).await.unwrap();

        assert_eq!(response.artifact.mime_type(), "audio/mpeg");
        assert_eq!(response.artifact.data(), &[0xFF, 0xFB, 0x90]);
        assert_eq!(response.duration_ms, None);
    }

    #[tokio::test]
    async fn test_implausible_pcm_rate_uses_default() {
        let provider = FakeProvider::with_speech(SpeechPayload::InlineAudio {
            data: vec![0u8; 4_800],
            mime_type: "audio/L16;codec=pcm;rate=300000000".to_string(),
        })
        .arc();
        let handler = FetchAudioHandler::new(cache(), provider, SpeechProfile::default());

        let response = handler.handle(fetch("odd rate", key())).await.unwrap();

        let info = wav_info(response.artifact.data()).unwrap();
        assert_eq!(info.format.sample_rate, 24_000);
        assert_eq!(info.format.byte_rate(), 48_000);
        assert_eq!(response.duration_ms, Some(100));
    }

    #[tokio::test]
    async fn test_missing_credentials_rejected_before_any_call() {
        let provider = FakeProvider::new().arc();
        let cache = cache();
        let handler = FetchAudioHandler::new(cache.clone(), provider.clone(), SpeechProfile::default());

        let err = handler.handle(fetch("Hello", None)).await.unwrap_err();

        assert!(matches!(err, ApplicationError::MissingCredentials));
        assert_eq!(provider.speech_calls(), 0);
        let stats = cache.stats().await;
        assert_eq!(stats.misses + stats.memory_hits + stats.persistent_hits, 0);
    }

    #[tokio::test]
    async fn test_default_credentials_are_used() {
        let provider = FakeProvider::new().arc();
        let handler = FetchAudioHandler::new(cache(), provider.clone(), SpeechProfile::default())
            .with_default_credentials(Credentials::new("configured"));

        handler.handle(fetch("Hello", None)).await.unwrap();
        assert_eq!(provider.speech_calls(), 1);
    }

    #[tokio::test]
    async fn test_absent_audio_is_provider_error() {
        let provider = FakeProvider::with_speech(SpeechPayload::Absent).arc();
        let cache = cache();
        let handler = FetchAudioHandler::new(cache.clone(), provider, SpeechProfile::default());

        let err = handler.handle(fetch("Hello", key())).await.unwrap_err();

        assert!(matches!(
            err,
            ApplicationError::ProviderError(ProviderError::NoAudio)
        ));
        assert!(cache.get("Hello").await.is_none());
    }

    #[tokio::test]
    async fn test_provider_failure_is_not_retried() {
        let provider = FakeProvider::failing("HTTP 500").arc();
        let handler = FetchAudioHandler::new(cache(), provider.clone(), SpeechProfile::default());

        let err = handler.handle(fetch("Hello", key())).await.unwrap_err();

        assert!(matches!(err, ApplicationError::ProviderError(_)));
        assert_eq!(provider.speech_calls(), 1);
    }

    #[tokio::test]
    async fn test_clear_cache_publishes_event() {
        let cache = cache();
        let publisher = EventPublisher::new().arc();
        let mut rx = publisher.subscribe();
        cache
            .put("cached", AudioArtifact::wav(vec![1, 2, 3]))
            .await;

        ClearCacheHandler::new(cache.clone(), publisher)
            .handle(ClearCacheCommand)
            .await
            .unwrap();

        assert!(cache.get("cached").await.is_none());
        assert_eq!(
            rx.recv().await.unwrap(),
            crate::infrastructure::events::WsEvent::TtsCacheCleared
        );
    }
}
