//! Data Transfer Objects

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ============================================================================
// 统一响应结构
// ============================================================================

/// 统一 API 响应格式
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub errno: i32,
    pub error: String,
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// 成功响应
    pub fn success(data: T) -> Self {
        Self {
            errno: 0,
            error: String::new(),
            data: Some(data),
        }
    }
}

/// 空数据响应
#[derive(Debug, Serialize)]
pub struct Empty {}

impl ApiResponse<Empty> {
    /// 成功但无数据
    pub fn ok() -> Self {
        Self::success(Empty {})
    }
}

// ============================================================================
// TTS DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct TextRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SpeakResponseDto {
    pub duration_ms: u64,
    pub mime_type: String,
    pub cache_hit: bool,
}

// ============================================================================
// Capture DTOs
// ============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct RecordRequest {
    #[serde(default)]
    pub beep: bool,
}

#[derive(Debug, Serialize)]
pub struct StopRecordingResponseDto {
    pub session_id: Uuid,
}

// ============================================================================
// Feedback DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct AnnotateRequest {
    pub word: String,
    #[serde(default)]
    pub context: String,
    #[serde(default)]
    pub target_language: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PronunciationRequestDto {
    pub text: String,
    /// Base64 编码的录音
    pub audio_base64: String,
    pub mime_type: String,
    #[serde(default)]
    pub target_language: Option<String>,
}
