//! Clip Encoder Port - 录音编码
//!
//! 将拼接好的 PCM 编码为容器格式（Ogg/Opus 优先，WAV 兜底）

use crate::domain::audio::PcmFormat;
use crate::domain::capture::CaptureError;

/// Clip Encoder Port
pub trait ClipEncoderPort: Send + Sync {
    /// 输出的 MIME 类型
    fn mime_type(&self) -> &str;

    /// 编码 16 位交错 PCM
    fn encode(&self, pcm: &[u8], format: PcmFormat) -> Result<Vec<u8>, CaptureError>;
}
