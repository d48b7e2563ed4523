//! Memory Layer - In-Memory State Management
//!
//! 非持久化的键值存储实现

mod kv_store;

pub use kv_store::InMemoryKeyValueStore;
