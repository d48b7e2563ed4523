//! Generative Provider Port - 生成式 AI 服务抽象
//!
//! 三类能力：语音合成、单词注释、发音评分。所有调用都需要调用方提供凭证。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Provider 错误
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Service error: {0}")]
    ServiceError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("No audio data in response")]
    NoAudio,
}

/// API 凭证
///
/// Debug 输出不包含明文
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials(String);

impl Credentials {
    /// 空白凭证视为缺失
    pub fn new(api_key: impl Into<String>) -> Option<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            None
        } else {
            Some(Self(api_key.trim().to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credentials(***)")
    }
}

/// 语音合成请求
#[derive(Debug, Clone)]
pub struct SpeechRequest {
    /// 要合成的文本
    pub text: String,
    /// 模型名称
    pub model: String,
    /// 预置音色名称
    pub voice_name: String,
}

/// 语音合成结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechPayload {
    /// 响应中包含内联音频
    InlineAudio { data: Vec<u8>, mime_type: String },
    /// 响应中没有音频
    Absent,
}

/// 单词注释请求
#[derive(Debug, Clone)]
pub struct AnnotationRequest {
    pub word: String,
    pub context_sentence: String,
    /// 释义使用的语言，如 "Chinese"
    pub target_language: String,
}

/// 单词注释
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// IPA 音标
    pub ipa: String,
    /// 简短释义
    pub definition: String,
}

/// 发音评分请求
#[derive(Debug, Clone)]
pub struct PronunciationRequest {
    /// 录音数据
    pub audio: Vec<u8>,
    /// 录音 MIME 类型
    pub mime_type: String,
    /// 朗读的原文
    pub reference_text: String,
    /// 点评使用的语言
    pub target_language: String,
}

/// 单词发音问题
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordError {
    pub word: String,
    pub issue: String,
}

/// 发音评分结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PronunciationScore {
    /// 0-100
    pub score: f32,
    /// 总体点评
    pub feedback: String,
    #[serde(default)]
    pub errors: Vec<WordError>,
}

/// Generative Provider Port
#[async_trait]
pub trait GenerativeProviderPort: Send + Sync {
    /// 语音合成
    async fn synthesize_speech(
        &self,
        request: SpeechRequest,
        credentials: &Credentials,
    ) -> Result<SpeechPayload, ProviderError>;

    /// 单词注释（音标 + 释义）
    async fn annotate_word(
        &self,
        request: AnnotationRequest,
        credentials: &Credentials,
    ) -> Result<Annotation, ProviderError>;

    /// 发音评分
    async fn score_pronunciation(
        &self,
        request: PronunciationRequest,
        credentials: &Credentials,
    ) -> Result<PronunciationScore, ProviderError>;
}
