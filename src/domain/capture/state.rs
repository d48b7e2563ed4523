//! Capture Session - 状态机
//!
//! Idle → Acquiring → Recording → Stopping → Stopped
//! Acquiring | Recording | Stopping → Failed

use serde::{Deserialize, Serialize};

/// 录音会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureState {
    Idle,
    Acquiring,
    Recording,
    Stopping,
    Stopped,
    Failed,
}

impl CaptureState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaptureState::Idle => "idle",
            CaptureState::Acquiring => "acquiring",
            CaptureState::Recording => "recording",
            CaptureState::Stopping => "stopping",
            CaptureState::Stopped => "stopped",
            CaptureState::Failed => "failed",
        }
    }

    /// 终态不可再迁移，会话对象不复用
    pub fn is_terminal(&self) -> bool {
        matches!(self, CaptureState::Stopped | CaptureState::Failed)
    }

    pub fn can_transition_to(&self, next: CaptureState) -> bool {
        use CaptureState::*;
        matches!(
            (self, next),
            (Idle, Acquiring)
                | (Acquiring, Recording)
                | (Acquiring, Failed)
                | (Recording, Stopping)
                | (Recording, Failed)
                | (Stopping, Stopped)
                | (Stopping, Failed)
        )
    }
}

impl std::fmt::Display for CaptureState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::CaptureState::*;

    #[test]
    fn test_happy_path_transitions() {
        assert!(Idle.can_transition_to(Acquiring));
        assert!(Acquiring.can_transition_to(Recording));
        assert!(Recording.can_transition_to(Stopping));
        assert!(Stopping.can_transition_to(Stopped));
    }

    #[test]
    fn test_failure_transitions() {
        assert!(Acquiring.can_transition_to(Failed));
        assert!(Recording.can_transition_to(Failed));
        assert!(!Idle.can_transition_to(Failed));
    }

    #[test]
    fn test_terminal_states_are_final() {
        for next in [Idle, Acquiring, Recording, Stopping, Stopped, Failed] {
            assert!(!Stopped.can_transition_to(next));
            assert!(!Failed.can_transition_to(next));
        }
        assert!(Stopped.is_terminal());
        assert!(Failed.is_terminal());
        assert!(!Recording.is_terminal());
    }

    #[test]
    fn test_cannot_skip_states() {
        assert!(!Idle.can_transition_to(Recording));
        assert!(!Recording.can_transition_to(Stopped));
    }
}
