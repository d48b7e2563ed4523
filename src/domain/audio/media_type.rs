//! Audio Context - MIME 类型解析
//!
//! Provider 返回的音频类型字符串形如 `audio/L16;codec=pcm;rate=24000`

use super::value_objects::PcmFormat;

/// 判断 MIME 类型是否为原始线性 PCM
pub fn is_raw_pcm(mime_type: &str) -> bool {
    let lower = mime_type.to_ascii_lowercase();
    lower.contains("pcm") || lower.contains("l16")
}

/// 可接受的最高采样率 (Hz)
pub const MAX_SAMPLE_RATE: u32 = 384_000;

/// 从 MIME 类型参数中解析采样率（`rate=<n>`），0 或高于 384 kHz 视为无效
pub fn parse_sample_rate(mime_type: &str) -> Option<u32> {
    mime_type
        .split(';')
        .skip(1)
        .filter_map(|param| param.split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("rate"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .filter(|rate| (1..=MAX_SAMPLE_RATE).contains(rate))
}

/// 解析原始 PCM 的格式，采样率缺省为 24000 Hz
pub fn pcm_format_of(mime_type: &str) -> PcmFormat {
    let sample_rate = parse_sample_rate(mime_type).unwrap_or(PcmFormat::DEFAULT_SAMPLE_RATE);
    PcmFormat::mono_16(sample_rate)
}
