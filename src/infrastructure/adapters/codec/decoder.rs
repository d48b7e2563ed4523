//! Artifact Decoder - 基于 symphonia 解码音频产物
//!
//! 本地播放用：任意支持的容器 → 单声道 f32 样本

use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::domain::audio::{AudioArtifact, CodecError};

/// 解码结果
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    /// 单声道样本 (-1.0..=1.0)
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl DecodedAudio {
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / u64::from(self.sample_rate)
    }
}

fn hint_for(mime_type: &str) -> Hint {
    let mut hint = Hint::new();
    hint.mime_type(mime_type.split(';').next().unwrap_or(mime_type).trim());

    let lower = mime_type.to_ascii_lowercase();
    if lower.contains("wav") {
        hint.with_extension("wav");
    } else if lower.contains("mpeg") || lower.contains("mp3") {
        hint.with_extension("mp3");
    } else if lower.contains("ogg") {
        hint.with_extension("ogg");
    }
    hint
}

/// 解码音频产物并混缩为单声道
pub fn decode_to_mono_f32(artifact: &AudioArtifact) -> Result<DecodedAudio, CodecError> {
    let cursor = Cursor::new(artifact.to_vec());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let probed = symphonia::default::get_probe()
        .format(
            &hint_for(artifact.mime_type()),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| CodecError::Decoding(format!("Probe failed: {}", e)))?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| CodecError::Decoding("No audio track found".to_string()))?;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| CodecError::Decoding("Unknown sample rate".to_string()))?;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| CodecError::Decoding(format!("Decoder creation failed: {}", e)))?;

    let track_id = track.id;
    let mut samples: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(p) => p,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => {
                return Err(CodecError::Decoding(format!("Packet read error: {}", e)));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(d) => d,
            Err(e) => {
                tracing::warn!("Decode error (skipping packet): {}", e);
                continue;
            }
        };

        let spec = *decoded.spec();
        let frames = decoded.frames();
        let channel_count = spec.channels.count().max(1);
        let mut sample_buf = SampleBuffer::<f32>::new(frames as u64, spec);
        sample_buf.copy_interleaved_ref(decoded);

        samples.extend(
            sample_buf.samples()[..frames * channel_count]
                .chunks(channel_count)
                .map(|frame| frame.iter().sum::<f32>() / channel_count as f32),
        );
    }

    Ok(DecodedAudio {
        samples,
        sample_rate,
    })
}
