//! Audio Context - 音频产物限界上下文
//!
//! 职责:
//! - 不可变音频产物 (AudioArtifact)
//! - PCM 格式参数
//! - MIME 类型识别
//! - PCM → WAV 封装

mod media_type;
mod value_objects;
mod wav;

pub use media_type::{is_raw_pcm, parse_sample_rate, pcm_format_of};
pub use value_objects::{AudioArtifact, PcmFormat, MIME_OGG_OPUS, MIME_WAV};
pub use wav::{pcm_to_wav, wav_info, CodecError, WavInfo, WAV_HEADER_LEN};
