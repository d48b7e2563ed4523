//! Active Capture Registry - 当前录音会话登记
//!
//! 麦克风是独占资源，同一时间只允许一个会话。
//! 登记返回的守卫在 Drop 时自动注销。

use std::sync::{Arc, Mutex};

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

#[derive(Debug)]
struct ActiveCapture {
    session_id: Uuid,
    stop_token: CancellationToken,
}

/// 当前会话登记表
#[derive(Debug, Default)]
pub struct CaptureRegistry {
    active: Mutex<Option<ActiveCapture>>,
}

impl CaptureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 登记会话，已有活动会话时返回其 ID
    pub fn try_register(
        self: &Arc<Self>,
        session_id: Uuid,
        stop_token: CancellationToken,
    ) -> Result<CaptureGuard, Uuid> {
        let mut active = self.active.lock().unwrap_or_else(|p| p.into_inner());
        if let Some(current) = active.as_ref() {
            return Err(current.session_id);
        }
        *active = Some(ActiveCapture {
            session_id,
            stop_token,
        });

        Ok(CaptureGuard {
            registry: Arc::clone(self),
            session_id,
        })
    }

    /// 手动停止当前会话，返回被停止的会话 ID
    pub fn stop_active(&self) -> Option<Uuid> {
        let active = self.active.lock().unwrap_or_else(|p| p.into_inner());
        active.as_ref().map(|current| {
            current.stop_token.cancel();
            current.session_id
        })
    }

    pub fn active_session(&self) -> Option<Uuid> {
        self.active
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .as_ref()
            .map(|current| current.session_id)
    }

    fn unregister(&self, session_id: Uuid) {
        let mut active = self.active.lock().unwrap_or_else(|p| p.into_inner());
        if active.as_ref().is_some_and(|c| c.session_id == session_id) {
            *active = None;
        }
    }
}

/// 登记守卫
#[derive(Debug)]
pub struct CaptureGuard {
    registry: Arc<CaptureRegistry>,
    session_id: Uuid,
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        self.registry.unregister(self.session_id);
    }
}
