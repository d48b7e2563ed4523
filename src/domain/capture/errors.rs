//! Capture Context - Errors

use thiserror::Error;

use super::CaptureState;

#[derive(Debug, Clone, Error)]
pub enum CaptureError {
    #[error("麦克风获取失败: {0}")]
    DeviceAcquisition(String),

    #[error("录音器错误: {0}")]
    Recorder(String),

    #[error("音量分析错误: {0}")]
    Analysis(String),

    #[error("录音编码失败: {0}")]
    Encoding(String),

    #[error("非法状态迁移: {from} -> {to}")]
    InvalidTransition { from: CaptureState, to: CaptureState },
}
