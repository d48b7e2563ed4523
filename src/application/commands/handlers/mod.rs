//! Command Handlers 实现
//!
//! 所有 CommandHandler 的具体实现

mod capture_handlers;
mod credentials;
mod feedback_handlers;
mod tts_handlers;

pub use capture_handlers::*;
pub use feedback_handlers::*;
pub use tts_handlers::*;
