//! Fake Provider - 用于测试和离线运行的 Provider
//!
//! 不访问网络：语音合成返回配置好的固定负载，注释和评分返回固定结果。
//! 记录调用次数，便于断言缓存命中时没有发起请求。

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::application::ports::{
    Annotation, AnnotationRequest, Credentials, GenerativeProviderPort, PronunciationRequest,
    PronunciationScore, ProviderError, SpeechPayload, SpeechRequest,
};

/// 默认负载：0.1 秒 24kHz 静音 PCM
fn default_speech() -> SpeechPayload {
    SpeechPayload::InlineAudio {
        data: vec![0u8; 4_800],
        mime_type: "audio/L16;codec=pcm;rate=24000".to_string(),
    }
}

/// Fake Provider
pub struct FakeProvider {
    speech: Mutex<Result<SpeechPayload, String>>,
    speech_calls: AtomicUsize,
    annotation_calls: AtomicUsize,
    scoring_calls: AtomicUsize,
    last_speech_request: Mutex<Option<SpeechRequest>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        tracing::info!("FakeProvider initialized");
        Self::with_speech(default_speech())
    }

    /// 固定的语音合成负载
    pub fn with_speech(payload: SpeechPayload) -> Self {
        Self {
            speech: Mutex::new(Ok(payload)),
            speech_calls: AtomicUsize::new(0),
            annotation_calls: AtomicUsize::new(0),
            scoring_calls: AtomicUsize::new(0),
            last_speech_request: Mutex::new(None),
        }
    }

    /// 语音合成总是失败
    pub fn failing(message: impl Into<String>) -> Self {
        let provider = Self::with_speech(SpeechPayload::Absent);
        provider.set_speech_result(Err(message.into()));
        provider
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn set_speech_result(&self, result: Result<SpeechPayload, String>) {
        *self.speech.lock().unwrap_or_else(|p| p.into_inner()) = result;
    }

    pub fn speech_calls(&self) -> usize {
        self.speech_calls.load(Ordering::SeqCst)
    }

    pub fn annotation_calls(&self) -> usize {
        self.annotation_calls.load(Ordering::SeqCst)
    }

    pub fn scoring_calls(&self) -> usize {
        self.scoring_calls.load(Ordering::SeqCst)
    }

    pub fn last_speech_request(&self) -> Option<SpeechRequest> {
        self.last_speech_request
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
    }
}

impl Default for FakeProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GenerativeProviderPort for FakeProvider {
    async fn synthesize_speech(
        &self,
        request: SpeechRequest,
        _credentials: &Credentials,
    ) -> Result<SpeechPayload, ProviderError> {
        self.speech_calls.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(
            text_len = request.text.len(),
            "FakeProvider: returning fixed speech payload"
        );
        *self
            .last_speech_request
            .lock()
            .unwrap_or_else(|p| p.into_inner()) = Some(request);

        self.speech
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .clone()
            .map_err(ProviderError::ServiceError)
    }

    async fn annotate_word(
        &self,
        request: AnnotationRequest,
        _credentials: &Credentials,
    ) -> Result<Annotation, ProviderError> {
        self.annotation_calls.fetch_add(1, Ordering::SeqCst);
        Ok(Annotation {
            ipa: format!("/{}/", request.word.to_lowercase()),
            definition: format!("{} ({})", request.word, request.target_language),
        })
    }

    async fn score_pronunciation(
        &self,
        request: PronunciationRequest,
        _credentials: &Credentials,
    ) -> Result<PronunciationScore, ProviderError> {
        self.scoring_calls.fetch_add(1, Ordering::SeqCst);
        let score = if request.audio.is_empty() { 0.0 } else { 80.0 };
        Ok(PronunciationScore {
            score,
            feedback: format!("Fake feedback in {}", request.target_language),
            errors: Vec::new(),
        })
    }
}
