//! Audio Context - WAV 容器
//!
//! 规范 44 字节头 + 原样 PCM 负载，全部小端序。
//! 写入端不做重采样也不校验负载长度。

use thiserror::Error;

use super::value_objects::PcmFormat;

/// 规范 WAV 头长度
pub const WAV_HEADER_LEN: usize = 44;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CodecError {
    #[error("Invalid WAV: {0}")]
    InvalidWav(String),

    #[error("Decoding error: {0}")]
    Decoding(String),

    #[error("Encoding error: {0}")]
    Encoding(String),
}

/// 为原始线性 PCM 加上 WAV 头
pub fn pcm_to_wav(pcm: &[u8], format: PcmFormat) -> Vec<u8> {
    let data_size = pcm.len() as u32;

    let mut wav = Vec::with_capacity(WAV_HEADER_LEN + pcm.len());

    // RIFF header
    wav.extend_from_slice(b"RIFF");
    wav.extend_from_slice(&(36 + data_size).to_le_bytes());
    wav.extend_from_slice(b"WAVE");

    // fmt chunk
    wav.extend_from_slice(b"fmt ");
    wav.extend_from_slice(&16u32.to_le_bytes()); // chunk size
    wav.extend_from_slice(&1u16.to_le_bytes()); // PCM format
    wav.extend_from_slice(&format.channels.to_le_bytes());
    wav.extend_from_slice(&format.sample_rate.to_le_bytes());
    wav.extend_from_slice(&format.byte_rate().to_le_bytes());
    wav.extend_from_slice(&format.block_align().to_le_bytes());
    wav.extend_from_slice(&format.bits_per_sample.to_le_bytes());

    // data chunk
    wav.extend_from_slice(b"data");
    wav.extend_from_slice(&data_size.to_le_bytes());
    wav.extend_from_slice(pcm);

    wav
}

/// WAV 头信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavInfo {
    pub format: PcmFormat,
    /// 负载起始偏移
    pub data_start: usize,
    pub data_size: usize,
    pub duration_ms: u64,
}

fn read_u16(data: &[u8], pos: usize) -> u16 {
    u16::from_le_bytes([data[pos], data[pos + 1]])
}

fn read_u32(data: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes([data[pos], data[pos + 1], data[pos + 2], data[pos + 3]])
}

/// 解析 WAV 头（逐 chunk 查找 `fmt ` 与 `data`）
pub fn wav_info(data: &[u8]) -> Result<WavInfo, CodecError> {
    if data.len() < WAV_HEADER_LEN {
        return Err(CodecError::InvalidWav("data too short".to_string()));
    }
    if &data[0..4] != b"RIFF" {
        return Err(CodecError::InvalidWav("missing RIFF header".to_string()));
    }
    if &data[8..12] != b"WAVE" {
        return Err(CodecError::InvalidWav("missing WAVE identifier".to_string()));
    }

    let mut pos = 12;
    let mut format: Option<PcmFormat> = None;

    while pos + 8 <= data.len() {
        let chunk_id = &data[pos..pos + 4];
        let chunk_size = read_u32(data, pos + 4) as usize;
        let body = pos + 8;

        match chunk_id {
            b"fmt " => {
                if chunk_size < 16 || body + 16 > data.len() {
                    return Err(CodecError::InvalidWav("invalid fmt chunk size".to_string()));
                }
                format = Some(PcmFormat::new(
                    read_u32(data, body + 4),
                    read_u16(data, body + 2),
                    read_u16(data, body + 14),
                ));
            }
            b"data" => {
                let format =
                    format.ok_or_else(|| CodecError::InvalidWav("missing fmt chunk".to_string()))?;
                // 截断的文件按实际长度计
                let data_size = chunk_size.min(data.len() - body);
                return Ok(WavInfo {
                    format,
                    data_start: body,
                    data_size,
                    duration_ms: format.duration_ms(data_size),
                });
            }
            _ => {}
        }

        pos = body.saturating_add(chunk_size).saturating_add(chunk_size % 2);
    }

    Err(CodecError::InvalidWav("missing data chunk".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcm_to_wav_header_layout() {
        let pcm: Vec<u8> = (0..96_000u32).map(|i| (i % 251) as u8).collect();
        let wav = pcm_to_wav(&pcm, PcmFormat::default());

        assert_eq!(wav.len(), 96_044);
        assert_eq!(&wav[0..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
        assert_eq!(&wav[12..16], b"fmt ");
        assert_eq!(&wav[36..40], b"data");
        assert_eq!(read_u32(&wav, 4), 96_036);
        assert_eq!(read_u32(&wav, 16), 16);
        assert_eq!(read_u16(&wav, 20), 1);
        assert_eq!(read_u16(&wav, 22), 1);
        assert_eq!(read_u32(&wav, 24), 24_000);
        assert_eq!(read_u32(&wav, 28), 48_000);
        assert_eq!(read_u16(&wav, 32), 2);
        assert_eq!(read_u16(&wav, 34), 16);
        assert_eq!(read_u32(&wav, 40), 96_000);
        assert_eq!(&wav[44..], &pcm[..]);
    }

    #[test]
    fn test_odd_length_payload_is_not_validated() {
        let wav = pcm_to_wav(&[1, 2, 3], PcmFormat::mono_16(8000));
        assert_eq!(wav.len(), 47);
        assert_eq!(read_u32(&wav, 40), 3);
    }

    #[test]
    fn test_wav_info_reads_canonical_header() {
        let wav = pcm_to_wav(&vec![0u8; 32_000], PcmFormat::mono_16(16_000));
        let info = wav_info(&wav).unwrap();

        assert_eq!(info.format, PcmFormat::mono_16(16_000));
        assert_eq!(info.data_start, 44);
        assert_eq!(info.data_size, 32_000);
        assert_eq!(info.duration_ms, 1000);
    }

    #[test]
    fn test_wav_info_rejects_garbage() {
        assert!(matches!(wav_info(b"RIFF"), Err(CodecError::InvalidWav(_))));

        let mut wav = pcm_to_wav(&[0u8; 16], PcmFormat::default());
        wav[8..12].copy_from_slice(b"AVI ");
        assert!(wav_info(&wav).is_err());
    }

    #[test]
    fn test_wav_info_survives_crafted_header() {
        let mut wav = pcm_to_wav(&[0u8; 64], PcmFormat::mono_16(16_000));
        // 采样率、声道数、位深全部拉满
        wav[24..28].copy_from_slice(&u32::MAX.to_le_bytes());
        wav[22..24].copy_from_slice(&u16::MAX.to_le_bytes());
        wav[34..36].copy_from_slice(&u16::MAX.to_le_bytes());

        let info = wav_info(&wav).unwrap();
        assert_eq!(info.format.sample_rate, u32::MAX);
        assert_eq!(info.data_size, 64);
        assert_eq!(info.duration_ms, 0);
    }

    #[test]
    fn test_wav_info_stops_on_oversized_chunk() {
        let mut wav = pcm_to_wav(&[0u8; 16], PcmFormat::default());
        // 在 fmt 之前插入一个声明超大长度的未知 chunk
        let mut crafted = wav[..12].to_vec();
        crafted.extend_from_slice(b"JUNK");
        crafted.extend_from_slice(&u32::MAX.to_le_bytes());
        crafted.extend_from_slice(&wav.split_off(12));

        assert!(matches!(wav_info(&crafted), Err(CodecError::InvalidWav(_))));
    }
}
