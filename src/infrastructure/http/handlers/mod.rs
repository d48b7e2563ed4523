//! HTTP Handlers

mod capture;
mod feedback;
mod ping;
mod tts;
mod websocket;

pub use capture::*;
pub use feedback::*;
pub use ping::*;
pub use tts::*;
pub use websocket::*;
