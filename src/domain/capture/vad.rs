//! Voice Activity Detection - 基于音量阈值的端点检测
//!
//! 纯逻辑，不依赖真实时钟：调用方传入自录音开始以来的毫秒数和当前音量。

use serde::{Deserialize, Serialize};

/// VAD 参数
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VadConfig {
    /// 归一化音量 (0-1) 高于此值视为说话
    pub silence_threshold: f32,
    /// 说话后持续静音多久停止 (ms)
    pub silence_duration_ms: u64,
    /// 最长录音时间 (ms)
    pub max_recording_ms: u64,
    /// 静音检测开始前的最短录音时间 (ms)
    pub min_recording_ms: u64,
}

impl Default for VadConfig {
    fn default() -> Self {
        Self {
            silence_threshold: 0.02,
            silence_duration_ms: 1500,
            max_recording_ms: 30_000,
            min_recording_ms: 500,
        }
    }
}

/// 停止原因
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// 说话后检测到足够长的静音
    Silence,
    /// 达到最长录音时间
    MaxDuration,
    /// 调用方手动停止
    Manual,
}

impl StopReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            StopReason::Silence => "silence",
            StopReason::MaxDuration => "max_duration",
            StopReason::Manual => "manual",
        }
    }
}

impl std::fmt::Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单次采样的判定结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VadDecision {
    Continue,
    Stop(StopReason),
}

/// 计算频域幅值数组的平均归一化音量 (0-1)
pub fn normalized_volume(bins: &[u8]) -> f32 {
    if bins.is_empty() {
        return 0.0;
    }
    let sum: u64 = bins.iter().map(|&b| u64::from(b)).sum();
    (sum as f64 / bins.len() as f64 / 255.0) as f32
}

/// 音量阈值 VAD
#[derive(Debug, Clone)]
pub struct VoiceActivityDetector {
    config: VadConfig,
    has_speech_started: bool,
    silence_started_at: Option<u64>,
}

impl VoiceActivityDetector {
    pub fn new(config: VadConfig) -> Self {
        Self {
            config,
            has_speech_started: false,
            silence_started_at: None,
        }
    }

    pub fn config(&self) -> &VadConfig {
        &self.config
    }

    pub fn has_speech_started(&self) -> bool {
        self.has_speech_started
    }

    /// 处理一次采样
    ///
    /// 规则依次为：最长时间硬上限；最短录音宽限期；
    /// 高于阈值标记说话并重置静音计时；说话后静音累计达到阈值则停止。
    pub fn observe(&mut self, elapsed_ms: u64, volume: f32) -> VadDecision {
        if elapsed_ms >= self.config.max_recording_ms {
            return VadDecision::Stop(StopReason::MaxDuration);
        }

        if elapsed_ms < self.config.min_recording_ms {
            return VadDecision::Continue;
        }

        if volume > self.config.silence_threshold {
            self.has_speech_started = true;
            self.silence_started_at = None;
        } else if self.has_speech_started {
            match self.silence_started_at {
                None => self.silence_started_at = Some(elapsed_ms),
                Some(start) if elapsed_ms - start >= self.config.silence_duration_ms => {
                    return VadDecision::Stop(StopReason::Silence);
                }
                Some(_) => {}
            }
        }

        VadDecision::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOUD: f32 = 0.3;
    const QUIET: f32 = 0.005;

    /// 以固定步长驱动检测器，返回停止时刻和原因
    fn run_until_stop(
        detector: &mut VoiceActivityDetector,
        step_ms: u64,
        limit_ms: u64,
        volume_at: impl Fn(u64) -> f32,
    ) -> Option<(u64, StopReason)> {
        let mut t = 0;
        while t <= limit_ms {
            if let VadDecision::Stop(reason) = detector.observe(t, volume_at(t)) {
                return Some((t, reason));
            }
            t += step_ms;
        }
        None
    }

    #[test]
    fn test_normalized_volume() {
        assert_eq!(normalized_volume(&[]), 0.0);
        assert_eq!(normalized_volume(&[0, 0, 0]), 0.0);
        assert!((normalized_volume(&[255, 255]) - 1.0).abs() < f32::EPSILON);
        assert!((normalized_volume(&[51, 0]) - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_max_duration_cutoff_with_continuous_speech() {
        let mut detector = VoiceActivityDetector::new(VadConfig::default());
        let stop = run_until_stop(&mut detector, 10, 40_000, |_| LOUD);
        assert_eq!(stop, Some((30_000, StopReason::MaxDuration)));
    }

    #[test]
    fn test_silence_cutoff_after_speech() {
        let mut detector = VoiceActivityDetector::new(VadConfig::default());
        let stop = run_until_stop(&mut detector, 10, 40_000, |t| {
            if t < 2000 {
                LOUD
            } else {
                QUIET
            }
        });
        assert_eq!(stop, Some((3500, StopReason::Silence)));
    }

    #[test]
    fn test_grace_period_ignores_early_silence() {
        let mut detector = VoiceActivityDetector::new(VadConfig::default());
        for t in (0..500).step_by(10) {
            assert_eq!(detector.observe(t, QUIET), VadDecision::Continue);
        }
        assert!(!detector.has_speech_started());
    }

    #[test]
    fn test_loudness_during_grace_period_is_not_speech() {
        let mut detector = VoiceActivityDetector::new(VadConfig::default());
        detector.observe(100, LOUD);
        assert!(!detector.has_speech_started());
    }

    #[test]
    fn test_silence_without_speech_never_stops_early() {
        let mut detector = VoiceActivityDetector::new(VadConfig::default());
        let stop = run_until_stop(&mut detector, 50, 40_000, |_| QUIET);
        assert_eq!(stop, Some((30_000, StopReason::MaxDuration)));
    }

    #[test]
    fn test_speech_resets_silence_timer() {
        let mut detector = VoiceActivityDetector::new(VadConfig::default());
        // 说话 -> 静音 1s -> 再说话 -> 静音
        let stop = run_until_stop(&mut detector, 10, 40_000, |t| match t {
            0..=999 => LOUD,
            1000..=1999 => QUIET,
            2000..=2499 => LOUD,
            _ => QUIET,
        });
        assert_eq!(stop, Some((4000, StopReason::Silence)));
    }

    #[test]
    fn test_volume_equal_to_threshold_is_silence() {
        let config = VadConfig::default();
        let mut detector = VoiceActivityDetector::new(config);
        detector.observe(600, LOUD);
        detector.observe(700, config.silence_threshold);
        assert_eq!(
            detector.observe(2200, config.silence_threshold),
            VadDecision::Stop(StopReason::Silence)
        );
    }
}
