//! Cpal Output - 扬声器输出
//!
//! 每次播放创建一个临时输出流，播放完毕（或超时）后销毁。
//! 调用是阻塞的，异步上下文中应放到 spawn_blocking 里执行。

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::application::ports::{AudioOutputPort, PlaybackError};
use crate::domain::audio::AudioArtifact;
use crate::infrastructure::adapters::codec::decode_to_mono_f32;

/// 播放结束后的额外等待
const TAIL_MS: u64 = 50;
/// 超时余量
const TIMEOUT_SLACK_MS: u64 = 500;

struct PlaybackState {
    samples: Vec<f32>,
    position: AtomicUsize,
    finished: AtomicBool,
}

/// Cpal 扬声器输出
#[derive(Debug, Clone, Default)]
pub struct CpalOutput;

impl CpalOutput {
    pub fn new() -> Self {
        Self
    }
}

fn build_output<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    state: Arc<PlaybackState>,
) -> Result<Stream, cpal::BuildStreamError>
where
    T: SizedSample + FromSample<f32>,
{
    let channels = usize::from(config.channels.max(1));

    device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            for frame in data.chunks_mut(channels) {
                let pos = state.position.load(Ordering::Relaxed);
                let sample = match state.samples.get(pos) {
                    Some(&s) => {
                        state.position.store(pos + 1, Ordering::Relaxed);
                        s
                    }
                    None => {
                        state.finished.store(true, Ordering::Release);
                        0.0
                    }
                };
                for out in frame.iter_mut() {
                    *out = T::from_sample(sample);
                }
            }
        },
        |err| {
            tracing::error!(error = %err, "Audio playback error");
        },
        None,
    )
}

/// 线性插值重采样（单声道）
pub fn resample_linear(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() || from_rate == 0 {
        return samples.to_vec();
    }

    let new_len = (samples.len() as u64 * u64::from(to_rate) / u64::from(from_rate)) as usize;
    let step = f64::from(from_rate) / f64::from(to_rate);
    let last = samples.len() - 1;

    (0..new_len)
        .map(|i| {
            let src = i as f64 * step;
            let idx = (src as usize).min(last);
            let frac = (src - idx as f64) as f32;
            let s0 = samples[idx];
            let s1 = samples[(idx + 1).min(last)];
            s0 + (s1 - s0) * frac
        })
        .collect()
}

impl AudioOutputPort for CpalOutput {
    fn play_samples(&self, samples: &[f32], sample_rate: u32) -> Result<(), PlaybackError> {
        if samples.is_empty() {
            return Ok(());
        }

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| PlaybackError::NoDevice("no output device available".to_string()))?;
        let supported = device
            .default_output_config()
            .map_err(|e| PlaybackError::NoDevice(e.to_string()))?;
        let config = supported.config();
        let device_rate = config.sample_rate.0;

        let state = Arc::new(PlaybackState {
            samples: resample_linear(samples, sample_rate, device_rate),
            position: AtomicUsize::new(0),
            finished: AtomicBool::new(false),
        });
        let sample_count = state.samples.len();

        let stream = match supported.sample_format() {
            SampleFormat::F32 => build_output::<f32>(&device, &config, Arc::clone(&state)),
            SampleFormat::I16 => build_output::<i16>(&device, &config, Arc::clone(&state)),
            SampleFormat::U16 => build_output::<u16>(&device, &config, Arc::clone(&state)),
            other => {
                return Err(PlaybackError::Stream(format!(
                    "unsupported sample format: {other:?}"
                )))
            }
        }
        .map_err(|e| PlaybackError::Stream(e.to_string()))?;

        stream
            .play()
            .map_err(|e| PlaybackError::Stream(e.to_string()))?;

        let duration_ms = sample_count as u64 * 1000 / u64::from(device_rate.max(1));
        let timeout = Duration::from_millis(duration_ms + TIMEOUT_SLACK_MS);
        let start = Instant::now();

        while !state.finished.load(Ordering::Acquire) {
            if start.elapsed() > timeout {
                tracing::warn!(duration_ms = duration_ms, "Playback timed out");
                break;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        std::thread::sleep(Duration::from_millis(TAIL_MS));

        drop(stream);
        tracing::debug!(samples = sample_count, sample_rate = device_rate, "Playback complete");

        Ok(())
    }

    fn play_artifact(&self, artifact: &AudioArtifact) -> Result<u64, PlaybackError> {
        let decoded =
            decode_to_mono_f32(artifact).map_err(|e| PlaybackError::Decode(e.to_string()))?;
        self.play_samples(&decoded.samples, decoded.sample_rate)?;
        Ok(decoded.duration_ms())
    }
}
