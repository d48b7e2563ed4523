//! Spectrum Analyser - 频域幅值分析
//!
//! 行为对齐浏览器 AnalyserNode 的 getByteFrequencyData:
//! 1. 取最近 fft_size 个样本，施加 Blackman 窗
//! 2. FFT 后取幅值并除以 N
//! 3. 与上一帧做指数平滑
//! 4. 转 dB，把 [min_db, max_db] 线性映射到 0..=255

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

pub const DEFAULT_FFT_SIZE: usize = 2048;
pub const DEFAULT_SMOOTHING: f32 = 0.8;
pub const DEFAULT_MIN_DB: f32 = -100.0;
pub const DEFAULT_MAX_DB: f32 = -30.0;

/// 频谱分析器
pub struct SpectrumAnalyser {
    fft: Arc<dyn Fft<f32>>,
    fft_size: usize,
    window: Vec<f32>,
    smoothed: Vec<f32>,
    smoothing: f32,
    min_db: f32,
    max_db: f32,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl SpectrumAnalyser {
    pub fn new(fft_size: usize) -> Self {
        let fft_size = fft_size.max(32);
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];

        Self {
            fft,
            fft_size,
            window: blackman_window(fft_size),
            smoothed: vec![0.0; fft_size / 2],
            smoothing: DEFAULT_SMOOTHING,
            min_db: DEFAULT_MIN_DB,
            max_db: DEFAULT_MAX_DB,
            buffer: vec![Complex::new(0.0, 0.0); fft_size],
            scratch,
        }
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// 频率 bin 数量 = fft_size / 2
    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    /// 计算字节频谱
    ///
    /// `recent` 为最近的单声道样本，不足 fft_size 时前端补零
    pub fn byte_frequency_data(&mut self, recent: &[f32]) -> Vec<u8> {
        let n = self.fft_size;
        let take = recent.len().min(n);
        let offset = n - take;
        let source = &recent[recent.len() - take..];

        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let sample = if i < offset { 0.0 } else { source[i - offset] };
            *slot = Complex::new(sample * self.window[i], 0.0);
        }

        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);

        let scale = 255.0 / (self.max_db - self.min_db);
        let mut bytes = Vec::with_capacity(self.frequency_bin_count());

        for (bin, smoothed) in self.smoothed.iter_mut().enumerate() {
            let magnitude = self.buffer[bin].norm() / n as f32;
            *smoothed = self.smoothing * *smoothed + (1.0 - self.smoothing) * magnitude;

            let db = if *smoothed > 0.0 {
                20.0 * smoothed.log10()
            } else {
                f32::NEG_INFINITY
            };
            bytes.push((scale * (db - self.min_db)).clamp(0.0, 255.0) as u8);
        }

        bytes
    }
}

fn blackman_window(n: usize) -> Vec<f32> {
    let alpha = 0.16f32;
    let a0 = 0.5 * (1.0 - alpha);
    let a1 = 0.5;
    let a2 = 0.5 * alpha;

    (0..n)
        .map(|i| {
            let x = i as f32 / n as f32;
            a0 - a1 * (std::f32::consts::TAU * x).cos() + a2 * (2.0 * std::f32::consts::TAU * x).cos()
        })
        .collect()
}
