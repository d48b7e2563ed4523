//! Infrastructure Adapters
//!
//! 六边形架构的适配器实现

pub mod audio;
pub mod codec;
pub mod provider;

pub use audio::*;
pub use codec::*;
pub use provider::*;
