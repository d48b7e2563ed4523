//! Event Publisher Implementation
//!
//! WebSocket 事件推送实现，所有事件走同一个全局广播通道

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

/// 广播通道容量
const CHANNEL_CAPACITY: usize = 100;

/// WebSocket 事件类型
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum WsEvent {
    /// 录音开始
    RecordingStarted { recording_id: Uuid },
    /// 录音结束
    RecordingStopped {
        recording_id: Uuid,
        duration_ms: u64,
        reason: String,
        mime_type: String,
        size_bytes: usize,
    },
    /// 录音失败
    RecordingFailed { recording_id: Uuid, error: String },
    /// TTS 缓存已清空
    TtsCacheCleared,
}

/// 事件发布器
pub struct EventPublisher {
    global_channel: broadcast::Sender<WsEvent>,
}

impl EventPublisher {
    pub fn new() -> Self {
        let (global_tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            global_channel: global_tx,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 订阅全局事件
    pub fn subscribe(&self) -> broadcast::Receiver<WsEvent> {
        self.global_channel.subscribe()
    }

    pub fn publish_recording_started(&self, recording_id: Uuid) {
        self.publish(WsEvent::RecordingStarted { recording_id });
    }

    pub fn publish_recording_stopped(
        &self,
        recording_id: Uuid,
        duration_ms: u64,
        reason: &str,
        mime_type: &str,
        size_bytes: usize,
    ) {
        self.publish(WsEvent::RecordingStopped {
            recording_id,
            duration_ms,
            reason: reason.to_string(),
            mime_type: mime_type.to_string(),
            size_bytes,
        });
    }

    pub fn publish_recording_failed(&self, recording_id: Uuid, error: &str) {
        self.publish(WsEvent::RecordingFailed {
            recording_id,
            error: error.to_string(),
        });
    }

    pub fn publish_cache_cleared(&self) {
        self.publish(WsEvent::TtsCacheCleared);
    }

    fn publish(&self, event: WsEvent) {
        if let Err(e) = self.global_channel.send(event) {
            tracing::debug!(error = %e, "Failed to publish event (no receivers)");
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}
