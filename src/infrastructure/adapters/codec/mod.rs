//! Codec Adapters - 音频编解码
//!
//! - 录音编码: Ogg/Opus（优先）与 WAV
//! - 产物解码: symphonia → 单声道 f32（本地播放）

mod decoder;
mod opus_encoder;
mod wav_encoder;

pub use decoder::{decode_to_mono_f32, DecodedAudio};
pub use opus_encoder::{negotiate_clip_encoder, OggOpusEncoder, DEFAULT_OPUS_BITRATE};
pub use wav_encoder::WavClipEncoder;
