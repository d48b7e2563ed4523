//! Capture - 录音会话编排
//!
//! 会话本身（状态机 + VAD 监控循环）与当前会话登记表

mod registry;
mod session;

pub use registry::{CaptureGuard, CaptureRegistry};
pub use session::{
    CaptureObserver, CaptureSession, CaptureSettings, NoopObserver, RecordingResult,
};
