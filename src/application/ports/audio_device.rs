//! Audio Device Port - 麦克风与扬声器抽象
//!
//! 录音侧拆为三个句柄：输入流、频域分析、分块录音器。
//! 输出侧用于提示音和本地播放。

use std::time::Duration;

use thiserror::Error;

use crate::domain::audio::{AudioArtifact, PcmFormat};
use crate::domain::capture::CaptureError;

/// 输入流处理约束
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputConstraints {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl Default for InputConstraints {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
        }
    }
}

/// 麦克风输入流句柄（独占）
pub trait InputStreamHandle: Send {
    /// 停止所有输入轨道，可重复调用
    fn stop_tracks(&mut self);
}

/// 频域分析句柄
pub trait FrequencyAnalyser: Send {
    /// 频率 bin 数量
    fn frequency_bin_count(&self) -> usize;

    /// 当前各 bin 的幅值 (0-255)
    fn byte_frequency_data(&mut self) -> Result<Vec<u8>, CaptureError>;

    /// 关闭分析上下文，可重复调用
    fn close(&mut self);
}

/// 分块录音器
///
/// 以固定时间片缓冲 PCM 分块，最终由会话拼接并编码
pub trait ChunkRecorder: Send {
    /// 分块的 PCM 格式
    fn format(&self) -> PcmFormat;

    /// 开始录音
    fn start(&mut self, timeslice: Duration) -> Result<(), CaptureError>;

    /// 取出已完成的分块
    fn take_chunks(&mut self) -> Result<Vec<Vec<u8>>, CaptureError>;

    /// 结束录音，返回剩余分块
    fn stop(&mut self) -> Result<Vec<Vec<u8>>, CaptureError>;
}

/// 一次获取到的输入资源
pub struct AcquiredInput {
    pub stream: Box<dyn InputStreamHandle>,
    pub analyser: Box<dyn FrequencyAnalyser>,
    pub recorder: Box<dyn ChunkRecorder>,
}

/// Microphone Port
pub trait MicrophonePort: Send + Sync {
    /// 获取独占的麦克风输入流及其分析、录音句柄
    fn acquire(&self, constraints: &InputConstraints) -> Result<AcquiredInput, CaptureError>;
}

/// 播放错误
#[derive(Debug, Clone, Error)]
pub enum PlaybackError {
    #[error("No output device: {0}")]
    NoDevice(String),

    #[error("Output stream error: {0}")]
    Stream(String),

    #[error("Decode error: {0}")]
    Decode(String),
}

/// Audio Output Port
///
/// 方法都是阻塞的，异步上下文中放到 spawn_blocking 里调用
pub trait AudioOutputPort: Send + Sync {
    /// 播放单声道 f32 样本，阻塞直到播放完毕或超时
    fn play_samples(&self, samples: &[f32], sample_rate: u32) -> Result<(), PlaybackError>;

    /// 解码并播放音频产物，返回播放时长（毫秒）
    fn play_artifact(&self, artifact: &AudioArtifact) -> Result<u64, PlaybackError>;
}

/// 单调时钟
pub trait ClockPort: Send + Sync {
    /// 某个固定起点以来的毫秒数
    fn now_ms(&self) -> u64;
}

/// 基于 `Instant` 的系统时钟
#[derive(Debug, Clone)]
pub struct SystemClock {
    origin: std::time::Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        Self {
            origin: std::time::Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ClockPort for SystemClock {
    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }
}
