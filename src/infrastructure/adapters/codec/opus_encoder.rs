//! Ogg/Opus Clip Encoder - 录音优先编码
//!
//! 16 位 PCM → Opus (OGG 容器, RFC 7845)。
//! Opus 只接受 8/12/16/24/48 kHz，其余采样率先线性重采样。

use ogg::writing::PacketWriter;
use opus::{Application, Channels, Encoder};
use std::sync::Arc;

use super::wav_encoder::WavClipEncoder;
use crate::application::ports::ClipEncoderPort;
use crate::domain::audio::{PcmFormat, MIME_OGG_OPUS};
use crate::domain::capture::CaptureError;

/// 默认比特率
pub const DEFAULT_OPUS_BITRATE: u32 = 32_000;

/// Opus 单包最大字节数
const MAX_PACKET_SIZE: usize = 4000;

/// Ogg/Opus 编码器
#[derive(Debug, Clone)]
pub struct OggOpusEncoder {
    bitrate: u32,
}

impl OggOpusEncoder {
    pub fn new(bitrate: u32) -> Self {
        Self { bitrate }
    }

    /// 运行时是否能创建 Opus 编码器
    pub fn is_available() -> bool {
        Encoder::new(48_000, Channels::Mono, Application::Voip).is_ok()
    }

    fn encode_samples(
        &self,
        samples: &[i16],
        sample_rate: u32,
        channel_count: usize,
    ) -> Result<Vec<u8>, CaptureError> {
        let channels = if channel_count == 1 {
            Channels::Mono
        } else {
            Channels::Stereo
        };

        let mut encoder = Encoder::new(sample_rate, channels, Application::Voip)
            .map_err(|e| encoding_error("Failed to create Opus encoder", e))?;
        encoder
            .set_bitrate(opus::Bitrate::Bits(self.bitrate as i32))
            .map_err(|e| encoding_error("Failed to set bitrate", e))?;

        // 编码器延迟作为 pre-skip
        let pre_skip = encoder.get_lookahead().map(|l| l as u16).unwrap_or(312);

        // 20ms 一帧
        let frame_size = (sample_rate as usize * 20) / 1000;
        let samples_per_frame = frame_size * channel_count;

        // granule position 以 48kHz 计
        let granule_scale = 48_000.0 / f64::from(sample_rate);
        let frame_granule = (frame_size as f64 * granule_scale) as u64;
        let mut granule_pos = (f64::from(pre_skip) * granule_scale) as u64;

        // 额外的静音帧用于冲刷编码器缓冲
        let flush_frames = (pre_skip as usize).div_ceil(samples_per_frame).max(1);

        let mut ogg_data = Vec::new();
        {
            let mut writer = PacketWriter::new(&mut ogg_data);

            writer
                .write_packet(
                    opus_head(channel_count as u8, sample_rate, pre_skip),
                    0,
                    ogg::PacketWriteEndInfo::EndPage,
                    0,
                )
                .map_err(|e| encoding_error("Failed to write Opus head", e))?;
            writer
                .write_packet(opus_tags(), 0, ogg::PacketWriteEndInfo::EndPage, 0)
                .map_err(|e| encoding_error("Failed to write Opus tags", e))?;

            let mut output = vec![0u8; MAX_PACKET_SIZE];
            let silence = vec![0i16; samples_per_frame];

            let frames = samples
                .chunks(samples_per_frame)
                .map(|chunk| {
                    let mut frame = chunk.to_vec();
                    frame.resize(samples_per_frame, 0);
                    frame
                })
                .chain(std::iter::repeat(silence).take(flush_frames));
            let total_frames = samples.len().div_ceil(samples_per_frame) + flush_frames;

            for (idx, frame) in frames.enumerate() {
                let len = encoder
                    .encode(&frame, &mut output)
                    .map_err(|e| encoding_error("Opus encode failed", e))?;

                granule_pos += frame_granule;

                let end_info = if idx + 1 == total_frames {
                    ogg::PacketWriteEndInfo::EndStream
                } else {
                    ogg::PacketWriteEndInfo::NormalPacket
                };

                writer
                    .write_packet(output[..len].to_vec(), 0, end_info, granule_pos)
                    .map_err(|e| encoding_error("Failed to write Opus packet", e))?;
            }
        }

        Ok(ogg_data)
    }
}

impl Default for OggOpusEncoder {
    fn default() -> Self {
        Self::new(DEFAULT_OPUS_BITRATE)
    }
}

impl ClipEncoderPort for OggOpusEncoder {
    fn mime_type(&self) -> &str {
        MIME_OGG_OPUS
    }

    fn encode(&self, pcm: &[u8], format: PcmFormat) -> Result<Vec<u8>, CaptureError> {
        if format.bits_per_sample != 16 {
            return Err(CaptureError::Encoding(format!(
                "Opus requires 16-bit PCM, got {} bits",
                format.bits_per_sample
            )));
        }

        let channel_count = usize::from(format.channels.clamp(1, 2));
        let samples: Vec<i16> = pcm
            .chunks_exact(2)
            .map(|b| i16::from_le_bytes([b[0], b[1]]))
            .collect();

        let target_rate = opus_compatible_sample_rate(format.sample_rate);
        let samples = if target_rate != format.sample_rate {
            resample(&samples, format.sample_rate, target_rate, channel_count)
        } else {
            samples
        };

        let encoded = self.encode_samples(&samples, target_rate, channel_count)?;

        tracing::debug!(
            pcm_size = pcm.len(),
            opus_size = encoded.len(),
            bitrate = self.bitrate,
            "Encoded clip to Opus"
        );

        Ok(encoded)
    }
}

/// 选择录音编码：优先 Ogg/Opus，不可用时回退 WAV
pub fn negotiate_clip_encoder(prefer_opus: bool, bitrate: u32) -> Arc<dyn ClipEncoderPort> {
    if prefer_opus && OggOpusEncoder::is_available() {
        tracing::info!(bitrate = bitrate, "Recording encoding: {}", MIME_OGG_OPUS);
        Arc::new(OggOpusEncoder::new(bitrate))
    } else {
        tracing::info!("Recording encoding: audio/wav");
        Arc::new(WavClipEncoder::new())
    }
}

fn encoding_error(context: &str, err: impl std::fmt::Display) -> CaptureError {
    CaptureError::Encoding(format!("{}: {}", context, err))
}

fn opus_compatible_sample_rate(sample_rate: u32) -> u32 {
    match sample_rate {
        8000 | 12000 | 16000 | 24000 | 48000 => sample_rate,
        r if r <= 8000 => 8000,
        r if r <= 12000 => 12000,
        r if r <= 16000 => 16000,
        r if r <= 24000 => 24000,
        _ => 48000,
    }
}

/// 线性插值重采样（交错样本）
fn resample(samples: &[i16], from_rate: u32, to_rate: u32, channel_count: usize) -> Vec<i16> {
    let frame_count = samples.len() / channel_count;
    if frame_count == 0 || from_rate == 0 {
        return Vec::new();
    }

    let ratio = f64::from(to_rate) / f64::from(from_rate);
    let new_frame_count = (frame_count as u64 * u64::from(to_rate) / u64::from(from_rate)) as usize;
    let mut resampled = Vec::with_capacity(new_frame_count * channel_count);

    for i in 0..new_frame_count {
        let src_pos = i as f64 / ratio;
        let src_idx = src_pos as usize;
        let frac = src_pos - src_idx as f64;

        for ch in 0..channel_count {
            let s0 = f64::from(samples[src_idx.min(frame_count - 1) * channel_count + ch]);
            let s1 = f64::from(samples[(src_idx + 1).min(frame_count - 1) * channel_count + ch]);
            resampled.push((s0 + (s1 - s0) * frac).round() as i16);
        }
    }

    resampled
}

/// Opus Head 包
fn opus_head(channels: u8, sample_rate: u32, pre_skip: u16) -> Vec<u8> {
    let mut head = Vec::with_capacity(19);
    head.extend_from_slice(b"OpusHead");
    head.push(1); // version
    head.push(channels);
    head.extend_from_slice(&pre_skip.to_le_bytes());
    head.extend_from_slice(&sample_rate.to_le_bytes());
    head.extend_from_slice(&0i16.to_le_bytes()); // output gain
    head.push(0); // channel mapping family
    head
}

/// Opus Tags 包
fn opus_tags() -> Vec<u8> {
    let vendor = "vocabflow";
    let mut tags = Vec::new();
    tags.extend_from_slice(b"OpusTags");
    tags.extend_from_slice(&(vendor.len() as u32).to_le_bytes());
    tags.extend_from_slice(vendor.as_bytes());
    tags.extend_from_slice(&0u32.to_le_bytes());
    tags
}
