//! Audio Device Adapters - 麦克风、频谱分析与扬声器

mod cpal_microphone;
mod output;
mod spectrum;

pub use cpal_microphone::CpalMicrophone;
pub use output::{resample_linear, CpalOutput};
pub use spectrum::{SpectrumAnalyser, DEFAULT_FFT_SIZE};
