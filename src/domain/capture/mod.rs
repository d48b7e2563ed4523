//! Capture Context - 录音限界上下文
//!
//! 职责:
//! - 音量阈值 VAD（纯逻辑，可脱离真实时钟测试）
//! - 录音会话状态机
//! - 开始提示音

mod beep;
mod errors;
mod state;
mod vad;

pub use beep::BeepTone;
pub use errors::CaptureError;
pub use state::CaptureState;
pub use vad::{normalized_volume, StopReason, VadConfig, VadDecision, VoiceActivityDetector};
