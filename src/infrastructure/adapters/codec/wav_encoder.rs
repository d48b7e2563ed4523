//! WAV Clip Encoder - 录音兜底编码

use crate::application::ports::ClipEncoderPort;
use crate::domain::audio::{pcm_to_wav, PcmFormat, MIME_WAV};
use crate::domain::capture::CaptureError;

/// 直接封装为 WAV，不做压缩
#[derive(Debug, Clone, Default)]
pub struct WavClipEncoder;

impl WavClipEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl ClipEncoderPort for WavClipEncoder {
    fn mime_type(&self) -> &str {
        MIME_WAV
    }

    fn encode(&self, pcm: &[u8], format: PcmFormat) -> Result<Vec<u8>, CaptureError> {
        Ok(pcm_to_wav(pcm, format))
    }
}
