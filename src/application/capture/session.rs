//! Capture Session - 基于 VAD 的录音会话
//!
//! 一次会话走完 Idle → Acquiring → Recording → Stopping → Stopped，
//! 任一步失败进入 Failed。会话不复用。
//!
//! 监控循环在 tokio interval 上运行，时间取自注入的 ClockPort，
//! 手动停止通过 CancellationToken 传入。

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::application::ports::{
    AcquiredInput, ChunkRecorder, ClipEncoderPort, ClockPort, FrequencyAnalyser,
    InputConstraints, InputStreamHandle, MicrophonePort,
};
use crate::domain::audio::AudioArtifact;
use crate::domain::capture::{
    normalized_volume, CaptureError, CaptureState, StopReason, VadConfig, VadDecision,
    VoiceActivityDetector,
};

/// 录音会话参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureSettings {
    pub vad: VadConfig,
    pub constraints: InputConstraints,
    /// 录音器分块时间片
    pub chunk_interval: Duration,
    /// 音量监控间隔
    pub tick_interval: Duration,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            vad: VadConfig::default(),
            constraints: InputConstraints::default(),
            chunk_interval: Duration::from_millis(100),
            tick_interval: Duration::from_millis(16),
        }
    }
}

/// 录音结果
#[derive(Debug, Clone)]
pub struct RecordingResult {
    pub artifact: AudioArtifact,
    pub duration_ms: u64,
    pub stop_reason: StopReason,
}

impl RecordingResult {
    pub fn duration_secs(&self) -> f64 {
        self.duration_ms as f64 / 1000.0
    }
}

/// 会话生命周期回调
pub trait CaptureObserver: Send + Sync {
    fn on_started(&self, _session_id: Uuid) {}

    fn on_stopped(&self, _session_id: Uuid, _result: &RecordingResult) {}

    fn on_failed(&self, _session_id: Uuid, _error: &CaptureError) {}
}

/// 不关心回调时使用
pub struct NoopObserver;

impl CaptureObserver for NoopObserver {}

/// 已获取的设备资源
///
/// `release` 可重复调用，Drop 时兜底释放
struct CaptureResources {
    stream: Option<Box<dyn InputStreamHandle>>,
    analyser: Option<Box<dyn FrequencyAnalyser>>,
    recorder: Option<Box<dyn ChunkRecorder>>,
}

impl CaptureResources {
    fn new(input: AcquiredInput) -> Self {
        Self {
            stream: Some(input.stream),
            analyser: Some(input.analyser),
            recorder: Some(input.recorder),
        }
    }

    fn handles(
        &mut self,
    ) -> Result<(&mut Box<dyn FrequencyAnalyser>, &mut Box<dyn ChunkRecorder>), CaptureError> {
        match (self.analyser.as_mut(), self.recorder.as_mut()) {
            (Some(analyser), Some(recorder)) => Ok((analyser, recorder)),
            _ => Err(CaptureError::Recorder("capture resources already released".to_string())),
        }
    }

    fn release(&mut self) {
        if let Some(mut recorder) = self.recorder.take() {
            if let Err(e) = recorder.stop() {
                tracing::debug!(error = %e, "Recorder stop during release failed");
            }
        }
        if let Some(mut stream) = self.stream.take() {
            stream.stop_tracks();
        }
        if let Some(mut analyser) = self.analyser.take() {
            analyser.close();
        }
    }
}

impl Drop for CaptureResources {
    fn drop(&mut self) {
        self.release();
    }
}

/// 录音会话
pub struct CaptureSession {
    id: Uuid,
    state: CaptureState,
    settings: CaptureSettings,
    microphone: Arc<dyn MicrophonePort>,
    clock: Arc<dyn ClockPort>,
    encoder: Arc<dyn ClipEncoderPort>,
    cancel: CancellationToken,
}

impl CaptureSession {
    pub fn new(
        settings: CaptureSettings,
        microphone: Arc<dyn MicrophonePort>,
        clock: Arc<dyn ClockPort>,
        encoder: Arc<dyn ClipEncoderPort>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: CaptureState::Idle,
            settings,
            microphone,
            clock,
            encoder,
            cancel: CancellationToken::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// 手动停止句柄，cancel 后会话以 Manual 原因结束
    pub fn stop_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    fn transition(&mut self, next: CaptureState) -> Result<(), CaptureError> {
        if !self.state.can_transition_to(next) {
            return Err(CaptureError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        tracing::debug!(session_id = %self.id, from = %self.state, to = %next, "Capture state changed");
        self.state = next;
        Ok(())
    }

    fn fail(&mut self, error: CaptureError, observer: &dyn CaptureObserver) -> CaptureError {
        if let Err(e) = self.transition(CaptureState::Failed) {
            tracing::debug!(error = %e, "Capture already terminal");
        }
        tracing::warn!(session_id = %self.id, error = %error, "Capture session failed");
        observer.on_failed(self.id, &error);
        error
    }

    /// 运行会话直到停止
    pub async fn run(
        &mut self,
        observer: &dyn CaptureObserver,
    ) -> Result<RecordingResult, CaptureError> {
        self.transition(CaptureState::Acquiring)?;

        let microphone = Arc::clone(&self.microphone);
        let constraints = self.settings.constraints;
        let acquired = tokio::task::spawn_blocking(move || microphone.acquire(&constraints))
            .await
            .map_err(|e| CaptureError::DeviceAcquisition(e.to_string()))
            .and_then(|r| r);

        let mut resources = match acquired {
            Ok(input) => CaptureResources::new(input),
            Err(e) => return Err(self.fail(e, observer)),
        };

        match self.record(&mut resources, observer).await {
            Ok(result) => Ok(result),
            Err(e) => {
                resources.release();
                Err(self.fail(e, observer))
            }
        }
    }

    async fn record(
        &mut self,
        resources: &mut CaptureResources,
        observer: &dyn CaptureObserver,
    ) -> Result<RecordingResult, CaptureError> {
        let (analyser, recorder) = resources.handles()?;
        let format = recorder.format();

        recorder.start(self.settings.chunk_interval)?;
        self.transition(CaptureState::Recording)?;

        let start_ms = self.clock.now_ms();
        tracing::info!(
            session_id = %self.id,
            sample_rate = format.sample_rate,
            bins = analyser.frequency_bin_count(),
            "Recording started"
        );
        observer.on_started(self.id);

        let mut detector = VoiceActivityDetector::new(self.settings.vad);
        let mut chunks: Vec<Vec<u8>> = Vec::new();
        let mut ticker = tokio::time::interval(self.settings.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let reason = loop {
            tokio::select! {
                _ = self.cancel.cancelled() => break StopReason::Manual,
                _ = ticker.tick() => {
                    chunks.extend(recorder.take_chunks()?);
                    let bins = analyser.byte_frequency_data()?;
                    let elapsed_ms = self.clock.now_ms().saturating_sub(start_ms);

                    if let VadDecision::Stop(reason) =
                        detector.observe(elapsed_ms, normalized_volume(&bins))
                    {
                        break reason;
                    }
                }
            }
        };

        self.transition(CaptureState::Stopping)?;

        chunks.extend(recorder.stop()?);
        let duration_ms = self.clock.now_ms().saturating_sub(start_ms);

        let pcm = chunks.concat();
        let encoded = self.encoder.encode(&pcm, format)?;
        let artifact = AudioArtifact::new(encoded, self.encoder.mime_type());

        resources.release();
        self.transition(CaptureState::Stopped)?;

        let result = RecordingResult {
            artifact,
            duration_ms,
            stop_reason: reason,
        };

        tracing::info!(
            session_id = %self.id,
            duration_ms = duration_ms,
            reason = %reason,
            mime_type = %result.artifact.mime_type(),
            size_bytes = result.artifact.len(),
            "Recording stopped"
        );
        observer.on_stopped(self.id, &result);

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::audio::PcmFormat;
    use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// 每次读取前进固定步长的时钟
    struct SteppingClock {
        now: AtomicU64,
        step: u64,
    }

    impl SteppingClock {
        fn new(step: u64) -> Arc<Self> {
            Arc::new(Self {
                now: AtomicU64::new(0),
                step,
            })
        }
    }

    impl ClockPort for SteppingClock {
        fn now_ms(&self) -> u64 {
            self.now.fetch_add(self.step, Ordering::SeqCst)
        }
    }

    #[derive(Default)]
    struct Counters {
        stop_tracks: AtomicUsize,
        close: AtomicUsize,
        recorder_stop: AtomicUsize,
    }

    struct ScriptedStream(Arc<Counters>);

    impl InputStreamHandle for ScriptedStream {
        fn stop_tracks(&mut self) {
            self.0.stop_tracks.fetch_add(1, Ordering::SeqCst);
        }
    }

    /// 第 k 次读取（从 1 开始）返回 level(k) 填充的 bins
    struct ScriptedAnalyser {
        counters: Arc<Counters>,
        reads: usize,
        level: fn(usize) -> u8,
    }

    impl FrequencyAnalyser for ScriptedAnalyser {
        fn frequency_bin_count(&self) -> usize {
            8
        }

        fn byte_frequency_data(&mut self) -> Result<Vec<u8>, CaptureError> {
            self.reads += 1;
            Ok(vec![(self.level)(self.reads); 8])
        }

        fn close(&mut self) {
            self.counters.close.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct ScriptedRecorder {
        counters: Arc<Counters>,
        takes: usize,
        fail_after: Option<usize>,
        stopped: bool,
    }

    impl ChunkRecorder for ScriptedRecorder {
        fn format(&self) -> PcmFormat {
            PcmFormat::mono_16(16_000)
        }

        fn start(&mut self, _timeslice: Duration) -> Result<(), CaptureError> {
            Ok(())
        }

        fn take_chunks(&mut self) -> Result<Vec<Vec<u8>>, CaptureError> {
            self.takes += 1;
            if self.fail_after.is_some_and(|n| self.takes > n) {
                return Err(CaptureError::Recorder("encoder crashed".to_string()));
            }
            Ok(vec![vec![self.takes as u8; 2]])
        }

        fn stop(&mut self) -> Result<Vec<Vec<u8>>, CaptureError> {
            self.counters.recorder_stop.fetch_add(1, Ordering::SeqCst);
            if self.stopped {
                return Ok(Vec::new());
            }
            self.stopped = true;
            Ok(vec![vec![0xFF; 2]])
        }
    }

    struct ScriptedMicrophone {
        counters: Arc<Counters>,
        level: fn(usize) -> u8,
        fail_after: Option<usize>,
        deny: bool,
    }

    impl ScriptedMicrophone {
        fn new(level: fn(usize) -> u8) -> Self {
            Self {
                counters: Arc::new(Counters::default()),
                level,
                fail_after: None,
                deny: false,
            }
        }
    }

    impl MicrophonePort for ScriptedMicrophone {
        fn acquire(&self, _constraints: &InputConstraints) -> Result<AcquiredInput, CaptureError> {
            if self.deny {
                return Err(CaptureError::DeviceAcquisition("permission denied".to_string()));
            }
            Ok(AcquiredInput {
                stream: Box::new(ScriptedStream(Arc::clone(&self.counters))),
                analyser: Box::new(ScriptedAnalyser {
                    counters: Arc::clone(&self.counters),
                    reads: 0,
                    level: self.level,
                }),
                recorder: Box::new(ScriptedRecorder {
                    counters: Arc::clone(&self.counters),
                    takes: 0,
                    fail_after: self.fail_after,
                    stopped: false,
                }),
            })
        }
    }

    /// 原样输出 PCM
    struct RawEncoder;

    impl ClipEncoderPort for RawEncoder {
        fn mime_type(&self) -> &str {
            "audio/x-raw"
        }

        fn encode(&self, pcm: &[u8], _format: PcmFormat) -> Result<Vec<u8>, CaptureError> {
            Ok(pcm.to_vec())
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        events: Mutex<Vec<String>>,
    }

    impl CaptureObserver for RecordingObserver {
        fn on_started(&self, _session_id: Uuid) {
            self.events.lock().unwrap().push("started".to_string());
        }

        fn on_stopped(&self, _session_id: Uuid, result: &RecordingResult) {
            self.events
                .lock()
                .unwrap()
                .push(format!("stopped:{}", result.stop_reason));
        }

        fn on_failed(&self, _session_id: Uuid, _error: &CaptureError) {
            self.events.lock().unwrap().push("failed".to_string());
        }
    }

    fn fast_settings() -> CaptureSettings {
        CaptureSettings {
            tick_interval: Duration::from_millis(1),
            ..Default::default()
        }
    }

    fn session(microphone: Arc<ScriptedMicrophone>, clock_step: u64) -> CaptureSession {
        CaptureSession::new(
            fast_settings(),
            microphone,
            SteppingClock::new(clock_step),
            Arc::new(RawEncoder),
        )
    }

    fn assert_released_once(counters: &Counters) {
        assert_eq!(counters.stop_tracks.load(Ordering::SeqCst), 1);
        assert_eq!(counters.close.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_stops_after_speech_then_silence() {
        // 第 k 次采样对应 100k ms；2000ms 之前大声，之后安静
        let microphone = Arc::new(ScriptedMicrophone::new(|k| if k < 20 { 255 } else { 0 }));
        let mut session = session(Arc::clone(&microphone), 100);
        let observer = RecordingObserver::default();

        let result = session.run(&observer).await.unwrap();

        assert_eq!(result.stop_reason, StopReason::Silence);
        // 3500ms 判定停止，结束时再读一次时钟
        assert_eq!(result.duration_ms, 3600);
        assert_eq!(session.state(), CaptureState::Stopped);
        assert_eq!(
            *observer.events.lock().unwrap(),
            vec!["started".to_string(), "stopped:silence".to_string()]
        );
        assert_released_once(&microphone.counters);
    }

    #[tokio::test]
    async fn test_stops_at_max_duration() {
        let microphone = Arc::new(ScriptedMicrophone::new(|_| 255));
        let mut session = session(Arc::clone(&microphone), 100);

        let result = session.run(&NoopObserver).await.unwrap();

        assert_eq!(result.stop_reason, StopReason::MaxDuration);
        assert_eq!(result.duration_ms, 30_100);
        assert_released_once(&microphone.counters);
    }

    #[tokio::test]
    async fn test_assembles_chunks_in_order() {
        let microphone = Arc::new(ScriptedMicrophone::new(|k| if k < 20 { 255 } else { 0 }));
        let mut session = session(Arc::clone(&microphone), 100);

        let result = session.run(&NoopObserver).await.unwrap();

        // 35 次采样各一个分块，加上 stop 返回的尾块
        let data = result.artifact.data();
        assert_eq!(data.len(), 36 * 2);
        assert_eq!(&data[..4], &[1, 1, 2, 2]);
        assert_eq!(&data[data.len() - 2..], &[0xFF, 0xFF]);
        assert_eq!(result.artifact.mime_type(), "audio/x-raw");
    }

    #[tokio::test]
    async fn test_manual_stop() {
        let microphone = Arc::new(ScriptedMicrophone::new(|_| 0));
        let mut session = session(Arc::clone(&microphone), 1);
        let token = session.stop_token();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let result = session.run(&NoopObserver).await.unwrap();

        assert_eq!(result.stop_reason, StopReason::Manual);
        assert_eq!(session.state(), CaptureState::Stopped);
        assert_released_once(&microphone.counters);
    }

    #[tokio::test]
    async fn test_acquisition_failure() {
        let microphone = Arc::new(ScriptedMicrophone {
            deny: true,
            ..ScriptedMicrophone::new(|_| 0)
        });
        let mut session = session(Arc::clone(&microphone), 100);
        let observer = RecordingObserver::default();

        let err = session.run(&observer).await.unwrap_err();

        assert!(matches!(err, CaptureError::DeviceAcquisition(_)));
        assert_eq!(session.state(), CaptureState::Failed);
        assert_eq!(*observer.events.lock().unwrap(), vec!["failed".to_string()]);
        assert_eq!(microphone.counters.stop_tracks.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_recorder_failure_releases_resources() {
        let microphone = Arc::new(ScriptedMicrophone {
            fail_after: Some(3),
            ..ScriptedMicrophone::new(|_| 255)
        });
        let mut session = session(Arc::clone(&microphone), 100);
        let observer = RecordingObserver::default();

        let err = session.run(&observer).await.unwrap_err();

        assert!(matches!(err, CaptureError::Recorder(_)));
        assert_eq!(session.state(), CaptureState::Failed);
        assert_eq!(
            *observer.events.lock().unwrap(),
            vec!["started".to_string(), "failed".to_string()]
        );
        assert_released_once(&microphone.counters);
        assert_eq!(microphone.counters.recorder_stop.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_session_is_not_reusable() {
        let microphone = Arc::new(ScriptedMicrophone::new(|_| 255));
        let mut session = session(Arc::clone(&microphone), 1_000);

        session.run(&NoopObserver).await.unwrap();
        let err = session.run(&NoopObserver).await.unwrap_err();

        assert!(matches!(
            err,
            CaptureError::InvalidTransition {
                from: CaptureState::Stopped,
                to: CaptureState::Acquiring
            }
        ));
    }
}
