//! Application State
//!
//! 包含所有 Command/Query Handlers 的应用状态

use std::sync::Arc;

use crate::application::{
    // Command handlers
    AnnotateWordHandler, BeepHandler, ClearCacheHandler, FetchAudioHandler, RecordHandler,
    ScorePronunciationHandler, SpeakHandler, StopRecordingHandler,
    // Query handlers
    GetCacheStatsHandler,
    // Ports
    AudioCachePort, AudioOutputPort, ClipEncoderPort, ClockPort, Credentials,
    GenerativeProviderPort, MicrophonePort,
    // Capture
    CaptureRegistry, CaptureSettings, SpeechProfile, DEFAULT_TARGET_LANGUAGE,
};
use crate::domain::capture::BeepTone;
use crate::infrastructure::events::EventPublisher;

/// 端口实现集合
pub struct AppPorts {
    pub audio_cache: Arc<dyn AudioCachePort>,
    pub provider: Arc<dyn GenerativeProviderPort>,
    pub microphone: Arc<dyn MicrophonePort>,
    pub output: Arc<dyn AudioOutputPort>,
    pub clock: Arc<dyn ClockPort>,
    pub encoder: Arc<dyn ClipEncoderPort>,
    pub event_publisher: Arc<EventPublisher>,
}

/// 来自配置的用例参数
#[derive(Debug, Clone)]
pub struct AppSettings {
    pub speech: SpeechProfile,
    /// 请求未携带 X-Api-Key 时使用
    pub default_credentials: Option<Credentials>,
    pub target_language: String,
    pub capture: CaptureSettings,
    pub beep: BeepTone,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            speech: SpeechProfile::default(),
            default_credentials: None,
            target_language: DEFAULT_TARGET_LANGUAGE.to_string(),
            capture: CaptureSettings::default(),
            beep: BeepTone::default(),
        }
    }
}

/// 应用状态
pub struct AppState {
    pub event_publisher: Arc<EventPublisher>,
    pub capture_registry: Arc<CaptureRegistry>,

    // ========== Command Handlers ==========
    pub fetch_audio_handler: Arc<FetchAudioHandler>,
    pub speak_handler: SpeakHandler,
    pub clear_cache_handler: ClearCacheHandler,
    pub record_handler: RecordHandler,
    pub stop_recording_handler: StopRecordingHandler,
    pub beep_handler: BeepHandler,
    pub annotate_word_handler: AnnotateWordHandler,
    pub score_pronunciation_handler: ScorePronunciationHandler,

    // ========== Query Handlers ==========
    pub get_cache_stats_handler: GetCacheStatsHandler,
}

impl AppState {
    /// 创建应用状态
    pub fn new(ports: AppPorts, settings: AppSettings) -> Self {
        let capture_registry = CaptureRegistry::new().arc();

        let fetch_audio_handler = Arc::new(
            FetchAudioHandler::new(
                ports.audio_cache.clone(),
                ports.provider.clone(),
                settings.speech.clone(),
            )
            .with_default_credentials(settings.default_credentials.clone()),
        );

        Self {
            event_publisher: ports.event_publisher.clone(),
            capture_registry: capture_registry.clone(),

            // Command handlers
            speak_handler: SpeakHandler::new(fetch_audio_handler.clone(), ports.output.clone()),
            fetch_audio_handler,
            clear_cache_handler: ClearCacheHandler::new(
                ports.audio_cache.clone(),
                ports.event_publisher.clone(),
            ),
            record_handler: RecordHandler::new(
                ports.microphone.clone(),
                ports.clock.clone(),
                ports.encoder.clone(),
                ports.output.clone(),
                settings.capture,
                settings.beep,
                capture_registry.clone(),
                ports.event_publisher.clone(),
            ),
            stop_recording_handler: StopRecordingHandler::new(capture_registry),
            beep_handler: BeepHandler::new(ports.output.clone(), settings.beep),
            annotate_word_handler: AnnotateWordHandler::new(
                ports.provider.clone(),
                settings.default_credentials.clone(),
                settings.target_language.clone(),
            ),
            score_pronunciation_handler: ScorePronunciationHandler::new(
                ports.provider.clone(),
                settings.default_credentials,
                settings.target_language,
            ),

            // Query handlers
            get_cache_stats_handler: GetCacheStatsHandler::new(ports.audio_cache),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::application::ports::{
        AcquiredInput, InputConstraints, PlaybackError, SystemClock,
    };
    use crate::domain::audio::AudioArtifact;
    use crate::domain::capture::CaptureError;
    use crate::infrastructure::adapters::{FakeProvider, WavClipEncoder};
    use crate::infrastructure::memory::InMemoryKeyValueStore;
    use crate::infrastructure::persistence::{TieredAudioCache, DEFAULT_MAX_ENTRIES};

    /// 没有输入设备的麦克风
    pub struct UnpluggedMicrophone;

    impl MicrophonePort for UnpluggedMicrophone {
        fn acquire(&self, _constraints: &InputConstraints) -> Result<AcquiredInput, CaptureError> {
            Err(CaptureError::DeviceAcquisition("no input device".to_string()))
        }
    }

    /// 什么都不播放的输出
    pub struct SilentOutput;

    impl AudioOutputPort for SilentOutput {
        fn play_samples(&self, _samples: &[f32], _sample_rate: u32) -> Result<(), PlaybackError> {
            Ok(())
        }

        fn play_artifact(&self, _artifact: &AudioArtifact) -> Result<u64, PlaybackError> {
            Ok(100)
        }
    }

    /// FakeProvider + 内存存储的应用状态
    pub fn app_state() -> AppState {
        let ports = AppPorts {
            audio_cache: TieredAudioCache::new(
                InMemoryKeyValueStore::unbounded().arc(),
                DEFAULT_MAX_ENTRIES,
            )
            .arc(),
            provider: FakeProvider::new().arc(),
            microphone: Arc::new(UnpluggedMicrophone),
            output: Arc::new(SilentOutput),
            clock: Arc::new(SystemClock::new()),
            encoder: Arc::new(WavClipEncoder),
            event_publisher: EventPublisher::new().arc(),
        };
        AppState::new(ports, AppSettings::default())
    }
}
