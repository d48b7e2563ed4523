//! 应用层错误定义
//!
//! 统一的命令/查询错误类型

use thiserror::Error;

use crate::application::ports::{PlaybackError, ProviderError};
use crate::domain::audio::CodecError;
use crate::domain::capture::CaptureError;

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 未提供 API 凭证
    #[error("API Key is missing. Please configure it in settings.")]
    MissingCredentials,

    /// 验证错误
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// 状态无效
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Provider 调用失败
    #[error("Provider error: {0}")]
    ProviderError(#[from] ProviderError),

    /// 录音失败
    #[error("Capture error: {0}")]
    CaptureError(#[from] CaptureError),

    /// 播放失败
    #[error("Playback error: {0}")]
    PlaybackError(#[from] PlaybackError),

    /// 编解码失败
    #[error("Codec error: {0}")]
    CodecError(#[from] CodecError),

    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApplicationError {
    /// 创建验证错误
    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError(message.into())
    }

    /// 创建状态无效错误
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }
}
