//! Audio Context - Value Objects

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// WAV 容器的 MIME 类型
pub const MIME_WAV: &str = "audio/wav";

/// Ogg/Opus 容器的 MIME 类型
pub const MIME_OGG_OPUS: &str = "audio/ogg;codecs=opus";

/// 音频产物 - 不可变的音频数据 + MIME 类型
///
/// 不变量:
/// - 构造后数据不可修改（共享底层 buffer，clone 开销为 O(1)）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioArtifact {
    data: Arc<[u8]>,
    mime_type: String,
}

impl AudioArtifact {
    pub fn new(data: impl Into<Arc<[u8]>>, mime_type: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            mime_type: mime_type.into(),
        }
    }

    /// 创建 WAV 产物
    pub fn wav(data: Vec<u8>) -> Self {
        Self::new(data, MIME_WAV)
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 复制出一份拥有所有权的字节（用于 HTTP body 等需要 Vec 的场景）
    pub fn to_vec(&self) -> Vec<u8> {
        self.data.to_vec()
    }
}

/// 线性 PCM 格式参数
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PcmFormat {
    /// 采样率 (Hz)
    pub sample_rate: u32,
    /// 声道数
    pub channels: u16,
    /// 位深度
    pub bits_per_sample: u16,
}

impl PcmFormat {
    /// 默认 TTS 输出: 24kHz / 单声道 / 16 位
    pub const DEFAULT_SAMPLE_RATE: u32 = 24000;

    pub fn new(sample_rate: u32, channels: u16, bits_per_sample: u16) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample,
        }
    }

    /// 16 位单声道
    pub fn mono_16(sample_rate: u32) -> Self {
        Self::new(sample_rate, 1, 16)
    }

    fn byte_rate_u64(&self) -> u64 {
        u64::from(self.sample_rate)
            .saturating_mul(u64::from(self.channels))
            .saturating_mul(u64::from(self.bits_per_sample))
            / 8
    }

    /// 每秒字节数，超出 u32 时饱和
    pub fn byte_rate(&self) -> u32 {
        u32::try_from(self.byte_rate_u64()).unwrap_or(u32::MAX)
    }

    /// 每帧字节数，超出 u16 时饱和
    pub fn block_align(&self) -> u16 {
        let align = u32::from(self.channels) * u32::from(self.bits_per_sample) / 8;
        u16::try_from(align).unwrap_or(u16::MAX)
    }

    /// 计算给定字节数对应的时长（毫秒）
    pub fn duration_ms(&self, data_size: usize) -> u64 {
        let byte_rate = self.byte_rate_u64();
        if byte_rate == 0 {
            return 0;
        }
        data_size as u64 * 1000 / byte_rate
    }
}

impl Default for PcmFormat {
    fn default() -> Self {
        Self::mono_16(Self::DEFAULT_SAMPLE_RATE)
    }
}
