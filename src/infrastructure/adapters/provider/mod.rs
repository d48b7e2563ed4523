//! Provider Adapters - 生成式 AI 服务适配器

mod fake_provider;
mod gemini_client;

pub use fake_provider::FakeProvider;
pub use gemini_client::{GeminiClient, GeminiClientConfig};
