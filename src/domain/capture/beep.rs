//! Capture Context - 开始录音提示音
//!
//! 880 Hz 正弦波，增益从 0.3 指数衰减到 0.01，时长 200ms；
//! 输出流在约 250ms 后关闭，尾部补静音。

use serde::{Deserialize, Serialize};

/// 提示音参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BeepTone {
    pub frequency_hz: f32,
    pub start_gain: f32,
    pub end_gain: f32,
    /// 发声时长
    pub tone_ms: u32,
    /// 输出流总时长（含尾部静音）
    pub total_ms: u32,
}

impl Default for BeepTone {
    fn default() -> Self {
        Self {
            frequency_hz: 880.0,
            start_gain: 0.3,
            end_gain: 0.01,
            tone_ms: 200,
            total_ms: 250,
        }
    }
}

impl BeepTone {
    /// 按指定采样率渲染单声道样本
    pub fn render(&self, sample_rate: u32) -> Vec<f32> {
        let rate = sample_rate as f32;
        let tone_len = (u64::from(sample_rate) * u64::from(self.tone_ms) / 1000) as usize;
        let total_len = (u64::from(sample_rate) * u64::from(self.total_ms.max(self.tone_ms)) / 1000) as usize;
        let tone_secs = self.tone_ms as f32 / 1000.0;

        let ratio = if self.start_gain > 0.0 {
            self.end_gain / self.start_gain
        } else {
            0.0
        };

        let mut samples = Vec::with_capacity(total_len);
        for i in 0..tone_len {
            let t = i as f32 / rate;
            let gain = self.start_gain * ratio.powf(t / tone_secs);
            samples.push((std::f32::consts::TAU * self.frequency_hz * t).sin() * gain);
        }
        samples.resize(total_len, 0.0);
        samples
    }
}
