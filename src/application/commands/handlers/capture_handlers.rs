//! Capture Command Handlers
//!
//! 录音会话的登记、提示音和事件推送

use std::sync::Arc;

use uuid::Uuid;

use crate::application::capture::{
    CaptureObserver, CaptureRegistry, CaptureSession, CaptureSettings, RecordingResult,
};
use crate::application::commands::capture_commands::*;
use crate::application::error::ApplicationError;
use crate::application::ports::{AudioOutputPort, ClipEncoderPort, ClockPort, MicrophonePort};
use crate::domain::capture::{BeepTone, CaptureError};
use crate::infrastructure::events::EventPublisher;

/// 提示音渲染采样率
const BEEP_SAMPLE_RATE: u32 = 48_000;

/// 把会话回调转成 WebSocket 事件
struct EventObserver {
    publisher: Arc<EventPublisher>,
}

impl CaptureObserver for EventObserver {
    fn on_started(&self, session_id: Uuid) {
        self.publisher.publish_recording_started(session_id);
    }

    fn on_stopped(&self, session_id: Uuid, result: &RecordingResult) {
        self.publisher.publish_recording_stopped(
            session_id,
            result.duration_ms,
            result.stop_reason.as_str(),
            result.artifact.mime_type(),
            result.artifact.len(),
        );
    }

    fn on_failed(&self, session_id: Uuid, error: &CaptureError) {
        self.publisher
            .publish_recording_failed(session_id, &error.to_string());
    }
}

async fn play_tone(output: &Arc<dyn AudioOutputPort>, tone: &BeepTone) -> Result<(), ApplicationError> {
    let samples = tone.render(BEEP_SAMPLE_RATE);
    let output = Arc::clone(output);
    tokio::task::spawn_blocking(move || output.play_samples(&samples, BEEP_SAMPLE_RATE))
        .await
        .map_err(|e| ApplicationError::internal(e.to_string()))??;
    Ok(())
}

/// Record Handler
pub struct RecordHandler {
    microphone: Arc<dyn MicrophonePort>,
    clock: Arc<dyn ClockPort>,
    encoder: Arc<dyn ClipEncoderPort>,
    output: Arc<dyn AudioOutputPort>,
    settings: CaptureSettings,
    beep: BeepTone,
    registry: Arc<CaptureRegistry>,
    event_publisher: Arc<EventPublisher>,
}

impl RecordHandler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        microphone: Arc<dyn MicrophonePort>,
        clock: Arc<dyn ClockPort>,
        encoder: Arc<dyn ClipEncoderPort>,
        output: Arc<dyn AudioOutputPort>,
        settings: CaptureSettings,
        beep: BeepTone,
        registry: Arc<CaptureRegistry>,
        event_publisher: Arc<EventPublisher>,
    ) -> Self {
        Self {
            microphone,
            clock,
            encoder,
            output,
            settings,
            beep,
            registry,
            event_publisher,
        }
    }

    pub async fn handle(&self, cmd: RecordCommand) -> Result<RecordResponse, ApplicationError> {
        let mut session = CaptureSession::new(
            self.settings,
            Arc::clone(&self.microphone),
            Arc::clone(&self.clock),
            Arc::clone(&self.encoder),
        );
        let session_id = session.id();

        let _guard = self
            .registry
            .try_register(session_id, session.stop_token())
            .map_err(|active| {
                ApplicationError::invalid_state(format!(
                    "Recording already in progress: {}",
                    active
                ))
            })?;

        if cmd.beep {
            if let Err(e) = play_tone(&self.output, &self.beep).await {
                tracing::warn!(error = %e, "Beep playback failed, recording anyway");
            }
        }

        let observer = EventObserver {
            publisher: Arc::clone(&self.event_publisher),
        };
        let result = session.run(&observer).await?;

        Ok(RecordResponse {
            session_id,
            artifact: result.artifact,
            duration_ms: result.duration_ms,
            stop_reason: result.stop_reason,
        })
    }
}

/// StopRecording Handler
pub struct StopRecordingHandler {
    registry: Arc<CaptureRegistry>,
}

impl StopRecordingHandler {
    pub fn new(registry: Arc<CaptureRegistry>) -> Self {
        Self { registry }
    }

    pub async fn handle(
        &self,
        _cmd: StopRecordingCommand,
    ) -> Result<StopRecordingResponse, ApplicationError> {
        let session_id = self
            .registry
            .stop_active()
            .ok_or_else(|| ApplicationError::invalid_state("No recording in progress"))?;

        tracing::info!(session_id = %session_id, "Manual stop requested");
        Ok(StopRecordingResponse { session_id })
    }
}

/// Beep Handler
pub struct BeepHandler {
    output: Arc<dyn AudioOutputPort>,
    tone: BeepTone,
}

impl BeepHandler {
    pub fn new(output: Arc<dyn AudioOutputPort>, tone: BeepTone) -> Self {
        Self { output, tone }
    }

    pub async fn handle(&self, _cmd: BeepCommand) -> Result<(), ApplicationError> {
        play_tone(&self.output, &self.tone).await
    }
}
