//! Cpal Microphone - 基于 cpal 的麦克风适配器
//!
//! cpal 的 Stream 不是 Send，输入流放在专用线程上运行，
//! 通过停止通道控制其生命周期。音频回调把样本混缩为单声道后:
//! - 写入最近样本环形缓冲（供频谱分析）
//! - 录音期间追加 16 位 PCM（供分块录音器）

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use super::spectrum::{SpectrumAnalyser, DEFAULT_FFT_SIZE};
use crate::application::ports::{
    AcquiredInput, ChunkRecorder, FrequencyAnalyser, InputConstraints, InputStreamHandle,
    MicrophonePort,
};
use crate::domain::audio::PcmFormat;
use crate::domain::capture::CaptureError;

/// 回调线程与各句柄共享的状态
struct SharedCapture {
    recent: Mutex<VecDeque<f32>>,
    recent_capacity: usize,
    pcm: Mutex<Vec<u8>>,
    recording: AtomicBool,
    error: Mutex<Option<String>>,
}

impl SharedCapture {
    fn new(recent_capacity: usize) -> Self {
        Self {
            recent: Mutex::new(VecDeque::with_capacity(recent_capacity)),
            recent_capacity,
            pcm: Mutex::new(Vec::new()),
            recording: AtomicBool::new(false),
            error: Mutex::new(None),
        }
    }

    fn push_frames(&self, mono: &[f32]) {
        if let Ok(mut recent) = self.recent.lock() {
            for &sample in mono {
                if recent.len() == self.recent_capacity {
                    recent.pop_front();
                }
                recent.push_back(sample);
            }
        }

        if self.recording.load(Ordering::Acquire) {
            if let Ok(mut pcm) = self.pcm.lock() {
                for &sample in mono {
                    let value = (sample.clamp(-1.0, 1.0) * 32767.0) as i16;
                    pcm.extend_from_slice(&value.to_le_bytes());
                }
            }
        }
    }

    fn record_error(&self, message: String) {
        if let Ok(mut error) = self.error.lock() {
            error.get_or_insert(message);
        }
    }

    fn take_error(&self) -> Option<String> {
        self.error.lock().ok().and_then(|mut e| e.take())
    }
}

/// Cpal 麦克风
#[derive(Debug, Clone)]
pub struct CpalMicrophone {
    fft_size: usize,
}

impl CpalMicrophone {
    pub fn new(fft_size: usize) -> Self {
        Self { fft_size }
    }
}

impl Default for CpalMicrophone {
    fn default() -> Self {
        Self::new(DEFAULT_FFT_SIZE)
    }
}

fn build_input<T>(
    device: &cpal::Device,
    config: &StreamConfig,
    shared: Arc<SharedCapture>,
) -> Result<Stream, cpal::BuildStreamError>
where
    T: SizedSample,
    f32: FromSample<T>,
{
    let channels = usize::from(config.channels.max(1));
    let error_shared = Arc::clone(&shared);
    let mut mono = Vec::new();

    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            mono.clear();
            mono.extend(data.chunks(channels).map(|frame| {
                frame.iter().map(|&s| f32::from_sample(s)).sum::<f32>() / frame.len() as f32
            }));
            shared.push_frames(&mono);
        },
        move |err| {
            tracing::error!(error = %err, "Audio capture error");
            error_shared.record_error(err.to_string());
        },
        None,
    )
}

/// 在当前线程上打开默认输入设备，返回流与采样率
fn open_input_stream(shared: Arc<SharedCapture>) -> Result<(Stream, u32), String> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| "no input device available".to_string())?;
    let supported = device.default_input_config().map_err(|e| e.to_string())?;
    let config = supported.config();

    let stream = match supported.sample_format() {
        SampleFormat::F32 => build_input::<f32>(&device, &config, shared),
        SampleFormat::I16 => build_input::<i16>(&device, &config, shared),
        SampleFormat::U16 => build_input::<u16>(&device, &config, shared),
        other => return Err(format!("unsupported sample format: {other:?}")),
    }
    .map_err(|e| e.to_string())?;

    stream.play().map_err(|e| e.to_string())?;

    tracing::debug!(
        device = device.name().unwrap_or_default(),
        sample_rate = config.sample_rate.0,
        channels = config.channels,
        "Audio capture stream opened"
    );

    Ok((stream, config.sample_rate.0))
}

impl MicrophonePort for CpalMicrophone {
    fn acquire(&self, constraints: &InputConstraints) -> Result<AcquiredInput, CaptureError> {
        // cpal 不暴露回声消除等处理开关，由系统音频栈决定
        tracing::debug!(
            echo_cancellation = constraints.echo_cancellation,
            noise_suppression = constraints.noise_suppression,
            auto_gain_control = constraints.auto_gain_control,
            "Acquiring microphone"
        );

        let shared = Arc::new(SharedCapture::new(self.fft_size));
        let (ready_tx, ready_rx) = mpsc::channel::<Result<u32, String>>();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let thread_shared = Arc::clone(&shared);
        let thread = std::thread::Builder::new()
            .name("vocabflow-mic".to_string())
            .spawn(move || match open_input_stream(thread_shared) {
                Ok((stream, sample_rate)) => {
                    let _ = ready_tx.send(Ok(sample_rate));
                    // 停止信号或发送端被丢弃都会结束等待
                    let _ = stop_rx.recv();
                    drop(stream);
                    tracing::debug!("Audio capture stream closed");
                }
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                }
            })
            .map_err(|e| CaptureError::DeviceAcquisition(e.to_string()))?;

        let sample_rate = match ready_rx.recv() {
            Ok(Ok(rate)) => rate,
            Ok(Err(e)) => {
                let _ = thread.join();
                return Err(CaptureError::DeviceAcquisition(e));
            }
            Err(_) => {
                let _ = thread.join();
                return Err(CaptureError::DeviceAcquisition(
                    "capture thread exited before opening the stream".to_string(),
                ));
            }
        };

        tracing::info!(sample_rate = sample_rate, "Microphone acquired");

        Ok(AcquiredInput {
            stream: Box::new(CpalInputStream {
                stop_tx: Some(stop_tx),
                thread: Some(thread),
            }),
            analyser: Box::new(CpalAnalyser {
                shared: Arc::clone(&shared),
                spectrum: SpectrumAnalyser::new(self.fft_size),
                closed: false,
            }),
            recorder: Box::new(CpalChunkRecorder::new(shared, PcmFormat::mono_16(sample_rate))),
        })
    }
}

/// 输入流句柄
struct CpalInputStream {
    stop_tx: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl InputStreamHandle for CpalInputStream {
    fn stop_tracks(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                tracing::warn!("Audio capture thread panicked");
            }
        }
    }
}

impl Drop for CpalInputStream {
    fn drop(&mut self) {
        self.stop_tracks();
    }
}

/// 频谱分析句柄
struct CpalAnalyser {
    shared: Arc<SharedCapture>,
    spectrum: SpectrumAnalyser,
    closed: bool,
}

impl FrequencyAnalyser for CpalAnalyser {
    fn frequency_bin_count(&self) -> usize {
        self.spectrum.frequency_bin_count()
    }

    fn byte_frequency_data(&mut self) -> Result<Vec<u8>, CaptureError> {
        if self.closed {
            return Err(CaptureError::Analysis("analyser closed".to_string()));
        }

        let recent: Vec<f32> = self
            .shared
            .recent
            .lock()
            .map_err(|_| CaptureError::Analysis("sample buffer poisoned".to_string()))?
            .iter()
            .copied()
            .collect();

        Ok(self.spectrum.byte_frequency_data(&recent))
    }

    fn close(&mut self) {
        self.closed = true;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecorderState {
    Inactive,
    Recording,
    Stopped,
}

/// 分块录音器
///
/// 回调线程持续追加 PCM，按时间片切分为完整分块
struct CpalChunkRecorder {
    shared: Arc<SharedCapture>,
    format: PcmFormat,
    chunk_bytes: usize,
    pending: Vec<u8>,
    state: RecorderState,
}

impl CpalChunkRecorder {
    fn new(shared: Arc<SharedCapture>, format: PcmFormat) -> Self {
        Self {
            shared,
            format,
            chunk_bytes: usize::from(format.block_align().max(1)),
            pending: Vec::new(),
            state: RecorderState::Inactive,
        }
    }

    fn drain_shared(&mut self) -> Result<(), CaptureError> {
        if let Some(error) = self.shared.take_error() {
            return Err(CaptureError::Recorder(error));
        }
        let mut pcm = self
            .shared
            .pcm
            .lock()
            .map_err(|_| CaptureError::Recorder("pcm buffer poisoned".to_string()))?;
        self.pending.append(&mut pcm);
        Ok(())
    }

    fn split_full_chunks(&mut self) -> Vec<Vec<u8>> {
        let full = self.pending.len() / self.chunk_bytes * self.chunk_bytes;
        let rest = self.pending.split_off(full);
        let done = std::mem::replace(&mut self.pending, rest);
        done.chunks(self.chunk_bytes).map(<[u8]>::to_vec).collect()
    }
}

impl ChunkRecorder for CpalChunkRecorder {
    fn format(&self) -> PcmFormat {
        self.format
    }

    fn start(&mut self, timeslice: Duration) -> Result<(), CaptureError> {
        if self.state != RecorderState::Inactive {
            return Err(CaptureError::Recorder("recorder already started".to_string()));
        }

        let block = u64::from(self.format.block_align().max(1));
        let bytes = u64::from(self.format.byte_rate()) * timeslice.as_millis() as u64 / 1000;
        self.chunk_bytes = (bytes / block * block).max(block) as usize;

        if let Ok(mut pcm) = self.shared.pcm.lock() {
            pcm.clear();
        }
        self.shared.recording.store(true, Ordering::Release);
        self.state = RecorderState::Recording;
        Ok(())
    }

    fn take_chunks(&mut self) -> Result<Vec<Vec<u8>>, CaptureError> {
        if self.state != RecorderState::Recording {
            return Ok(Vec::new());
        }
        self.drain_shared()?;
        Ok(self.split_full_chunks())
    }

    fn stop(&mut self) -> Result<Vec<Vec<u8>>, CaptureError> {
        if self.state != RecorderState::Recording {
            return Ok(Vec::new());
        }
        self.shared.recording.store(false, Ordering::Release);
        self.state = RecorderState::Stopped;

        self.drain_shared()?;
        let mut chunks = self.split_full_chunks();
        if !self.pending.is_empty() {
            chunks.push(std::mem::take(&mut self.pending));
        }
        Ok(chunks)
    }
}
