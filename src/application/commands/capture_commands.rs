//! Capture Commands - 录音相关命令

use uuid::Uuid;

use crate::domain::audio::AudioArtifact;
use crate::domain::capture::StopReason;

/// 录音命令 - 运行一次 VAD 录音会话
#[derive(Debug, Clone, Default)]
pub struct RecordCommand {
    /// 开始前是否播放提示音
    pub beep: bool,
}

/// 录音响应
#[derive(Debug, Clone)]
pub struct RecordResponse {
    pub session_id: Uuid,
    pub artifact: AudioArtifact,
    pub duration_ms: u64,
    pub stop_reason: StopReason,
}

/// 手动停止命令
#[derive(Debug, Clone, Default)]
pub struct StopRecordingCommand;

/// 手动停止响应
#[derive(Debug, Clone)]
pub struct StopRecordingResponse {
    pub session_id: Uuid,
}

/// 提示音命令
#[derive(Debug, Clone, Default)]
pub struct BeepCommand;
