//! 应用层 - 命令（写操作）
//!
//! CQRS 命令侧：处理所有写操作

mod capture_commands;
mod feedback_commands;
mod tts_commands;

pub mod handlers;

pub use capture_commands::*;
pub use feedback_commands::*;
pub use tts_commands::*;
