use crate::constants::{DEFAULT_PARAMETERS, GENERIC_ERROR_TEXT, PARAMETERS_KEY};
use crate::engine::{
    cancel_pair, CancelHandle, CancelToken, CompressionConfig, EngineError, EngineJob,
    EngineOutcome, ProgressCallback, TranscodeEngine, TranscodeRequest,
};
use crate::events::{create_event_channel, AppEvent, EventReceiver, EventSender, ExecutionId};
use crate::services::file_service::{FileError, FileStatProvider};
use crate::services::ServiceManager;
use crate::state::{
    derive_output_uri, progress_fraction, ExecutionMode, ExecutionPhase, ExecutionResult,
    SelectedAsset,
};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tokio::runtime::Handle;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("Could not read output file: {0}")]
    OutputStat(#[from] FileError),
}

/// Owns the screen state and drives one execution at a time from
/// "asset selected" to "result known".
///
/// All state changes happen on the thread that calls [`apply_event`](Self::apply_event);
/// asynchronous work reports back through the event channel.
pub struct ExecutionCoordinator {
    services: ServiceManager,
    runtime: Handle,
    event_sender: EventSender,
    event_receiver: EventReceiver,
    asset: Option<SelectedAsset>,
    parameters: String,
    mode: ExecutionMode,
    phase: ExecutionPhase,
    result: Option<ExecutionResult>,
    // belongs to the execution in `phase`, if one is running
    cancel_handle: Option<CancelHandle>,
    picking: bool,
    notice: Option<String>,
}

impl ExecutionCoordinator {
    pub fn new(services: ServiceManager, runtime: Handle) -> Self {
        let (event_sender, event_receiver) = create_event_channel();
        Self {
            services,
            runtime,
            event_sender,
            event_receiver,
            asset: None,
            parameters: DEFAULT_PARAMETERS.to_string(),
            mode: ExecutionMode::default(),
            phase: ExecutionPhase::default(),
            result: None,
            cancel_handle: None,
            picking: false,
            notice: None,
        }
    }

    /// Replaces the default parameters with the stored ones, if any were saved.
    pub async fn restore_parameters(&mut self) {
        match self.services.preferences.get(PARAMETERS_KEY).await {
            Ok(Some(value)) if !value.is_empty() => {
                tracing::info!("Restored parameters: {}", value);
                self.parameters = value;
            }
            Ok(_) => tracing::debug!("No stored parameters, keeping defaults"),
            Err(e) => tracing::warn!("Failed to load parameters, keeping defaults: {}", e),
        }
    }

    pub fn asset(&self) -> Option<&SelectedAsset> {
        self.asset.as_ref()
    }

    #[cfg(test)]
    pub fn parameters(&self) -> &str {
        &self.parameters
    }

    pub fn parameters_mut(&mut self) -> &mut String {
        &mut self.parameters
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn mode_mut(&mut self) -> &mut ExecutionMode {
        &mut self.mode
    }

    pub fn phase(&self) -> &ExecutionPhase {
        &self.phase
    }

    pub fn is_executing(&self) -> bool {
        self.phase.is_executing()
    }

    pub fn progress(&self) -> f64 {
        self.phase.get_progress().unwrap_or(0.0)
    }

    pub fn result(&self) -> Option<&ExecutionResult> {
        self.result.as_ref()
    }

    pub fn is_picking(&self) -> bool {
        self.picking
    }

    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }

    pub fn pick_asset(&mut self) {
        if self.phase.is_executing() || self.picking {
            return;
        }
        self.picking = true;
        self.notice = None;

        let picker = self.services.picker.clone();
        let events = self.event_sender.clone();
        self.runtime.spawn(async move {
            let event = match picker.pick().await {
                Ok(outcome) => AppEvent::AssetPicked(outcome),
                Err(e) => AppEvent::PickerFailed(e.to_string()),
            };
            if let Err(e) = events.send(event) {
                tracing::error!("Failed to send picker event: {}", e);
            }
        });
    }

    /// Starts an execution for the selected asset. Without an asset this does nothing.
    pub fn start(&mut self) -> Option<ExecutionId> {
        let asset = match &self.asset {
            Some(asset) if asset.has_uri() => asset.clone(),
            _ => {
                tracing::debug!("Start ignored, no asset selected");
                return None;
            }
        };

        if let Some(previous) = self.phase.active_execution() {
            tracing::warn!("Execution {} superseded by a new start", previous);
            if let Some(handle) = self.cancel_handle.take() {
                handle.cancel();
            }
        }

        let execution_id = Uuid::new_v4();
        let started_at = Instant::now();
        self.save_parameters();
        self.phase = ExecutionPhase::transition_to_executing(execution_id);
        self.result = None;
        let (cancel_handle, cancel_token) = cancel_pair();
        self.cancel_handle = Some(cancel_handle);

        let job = match self.mode {
            ExecutionMode::Command => EngineJob::Command(self.parameters.clone()),
            ExecutionMode::Compress => EngineJob::Compress(CompressionConfig::default()),
        };
        let request = TranscodeRequest {
            output_uri: derive_output_uri(&asset.uri),
            source_uri: asset.uri,
            job,
        };
        tracing::info!(
            "Starting execution {}: {} -> {}",
            execution_id,
            request.source_uri,
            request.output_uri
        );

        let on_progress = self.progress_callback(execution_id, asset.duration);
        let run = ExecutionRun {
            execution_id,
            started_at,
            engine: self.services.engine.clone(),
            files: self.services.files.clone(),
            events: self.event_sender.clone(),
        };
        self.runtime.spawn(run.execute(request, on_progress, cancel_token));

        Some(execution_id)
    }

    /// Requests engine cancellation and ends the execution right away, without
    /// waiting for the engine to confirm. Returns `false` when nothing was running.
    pub fn cancel(&mut self) -> bool {
        let Some(execution_id) = self.phase.active_execution() else {
            return false;
        };

        tracing::info!("Cancelling execution {}", execution_id);
        if let Some(handle) = self.cancel_handle.take() {
            handle.cancel();
        }
        self.result = Some(ExecutionResult::failure(GENERIC_ERROR_TEXT));
        self.phase = std::mem::take(&mut self.phase).transition_to_cancelled();
        true
    }

    pub fn open(&self, uri: &str) {
        if let Err(e) = self.services.viewer.open(uri) {
            tracing::warn!("{}", e);
        }
    }

    /// Applies every event that has already arrived. Returns how many there were.
    pub fn pump(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(event) = self.event_receiver.try_recv() {
            self.apply_event(event);
            applied += 1;
        }
        applied
    }

    #[cfg(test)]
    pub async fn next_event(&mut self) -> Option<AppEvent> {
        self.event_receiver.recv().await
    }

    pub fn apply_event(&mut self, event: AppEvent) {
        if let Some(execution_id) = event.execution_id() {
            if self.phase.active_execution() != Some(execution_id) {
                // cancelled or superseded executions may still report in
                if !matches!(event, AppEvent::ExecutionFinished(_)) {
                    tracing::debug!(
                        "Discarding late event from execution {}: {:?}",
                        execution_id,
                        event
                    );
                }
                return;
            }
        }

        match event {
            AppEvent::AssetPicked(outcome) => {
                self.picking = false;
                if let Some(asset) = outcome.into_selection() {
                    self.asset = Some(asset);
                }
            }
            AppEvent::PickerFailed(message) => {
                self.picking = false;
                tracing::warn!("Picker failed: {}", message);
                self.notice = Some(message);
            }
            AppEvent::ExecutionProgress { progress, .. } => {
                self.phase.update_progress(progress);
            }
            AppEvent::ExecutionCompleted {
                execution_id,
                result,
            } => {
                self.cancel_handle = None;
                let phase = std::mem::take(&mut self.phase);
                self.phase = if result.is_success() {
                    tracing::info!("Execution {} succeeded", execution_id);
                    phase.transition_to_succeeded()
                } else {
                    tracing::info!("Execution {} failed", execution_id);
                    phase.transition_to_failed()
                };
                self.result = Some(result);
            }
            AppEvent::ExecutionFinished(execution_id) => {
                // no result was produced: the engine cancelled itself or the run was rejected
                tracing::debug!("Execution {} ended without a result", execution_id);
                self.cancel_handle = None;
                self.phase.reset_to_idle();
            }
            AppEvent::ParametersSaved => {
                tracing::debug!("Parameters saved");
            }
        }
    }

    fn save_parameters(&self) {
        let preferences = self.services.preferences.clone();
        let parameters = self.parameters.clone();
        let events = self.event_sender.clone();
        self.runtime.spawn(async move {
            match preferences.set(PARAMETERS_KEY, &parameters).await {
                Ok(()) => {
                    let _ = events.send(AppEvent::ParametersSaved);
                }
                Err(e) => tracing::warn!("Failed to save parameters: {}", e),
            }
        });
    }

    fn progress_callback(&self, execution_id: ExecutionId, duration: Option<f64>) -> ProgressCallback {
        let events = self.event_sender.clone();
        Arc::new(move |elapsed| {
            let Some(progress) = duration.and_then(|duration| progress_fraction(elapsed, duration))
            else {
                return;
            };
            let _ = events.send(AppEvent::ExecutionProgress {
                execution_id,
                progress,
            });
        })
    }
}

/// Everything one spawned execution needs, detached from the coordinator.
struct ExecutionRun {
    execution_id: ExecutionId,
    started_at: Instant,
    engine: Arc<dyn TranscodeEngine>,
    files: Arc<dyn FileStatProvider>,
    events: EventSender,
}

impl ExecutionRun {
    async fn execute(
        self,
        request: TranscodeRequest,
        on_progress: ProgressCallback,
        cancel: CancelToken,
    ) {
        let _finished = FinishGuard {
            execution_id: self.execution_id,
            events: self.events.clone(),
        };

        match self.run(request, on_progress, cancel).await {
            Ok(Some(result)) => {
                let event = AppEvent::ExecutionCompleted {
                    execution_id: self.execution_id,
                    result,
                };
                if let Err(e) = self.events.send(event) {
                    tracing::error!("Failed to send execution result: {}", e);
                }
            }
            Ok(None) => {}
            Err(e) => {
                tracing::error!("Execution {} failed unexpectedly: {}", self.execution_id, e);
            }
        }
    }

    async fn run(
        &self,
        request: TranscodeRequest,
        on_progress: ProgressCallback,
        cancel: CancelToken,
    ) -> Result<Option<ExecutionResult>, ExecutionError> {
        match self.engine.transcode(request, on_progress, cancel).await? {
            EngineOutcome::Completed { output_uri } => {
                let stat = self.files.stat(&output_uri).await?;
                let elapsed_ms = self.started_at.elapsed().as_millis() as u64;
                tracing::info!(
                    "Execution {} wrote {} ({} bytes) in {} ms",
                    self.execution_id,
                    output_uri,
                    stat.size,
                    elapsed_ms
                );
                Ok(Some(ExecutionResult::Success {
                    output_uri,
                    file_size_bytes: stat.size,
                    elapsed_ms,
                }))
            }
            EngineOutcome::Cancelled => {
                tracing::info!("Execution {} cancelled by the engine", self.execution_id);
                Ok(None)
            }
            EngineOutcome::Failed { return_code } => {
                tracing::warn!(
                    "Execution {} failed with return code {}",
                    self.execution_id,
                    return_code
                );
                Ok(Some(ExecutionResult::failure(GENERIC_ERROR_TEXT)))
            }
        }
    }
}

/// Reports the end of an execution however it ends, panics included.
struct FinishGuard {
    execution_id: ExecutionId,
    events: EventSender,
}

impl Drop for FinishGuard {
    fn drop(&mut self) {
        let _ = self
            .events
            .send(AppEvent::ExecutionFinished(self.execution_id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::file_service::FileStat;
    use crate::services::picker_service::{AssetPicker, PickOutcome, PickerError};
    use crate::services::preference_service::{MemoryPreferenceStore, PreferenceStore};
    use crate::services::viewer_service::{Viewer, ViewerError};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio::sync::Semaphore;

    #[derive(Clone, Copy)]
    enum Script {
        Complete,
        Fail(i32),
        EngineCancel,
        Reject,
        /// Blocks until the test adds a permit to the gate.
        WaitThenComplete,
        /// Runs until its cancel token is tripped.
        UntilCancelled,
    }

    struct ScriptedEngine {
        script: Script,
        progress: Vec<Duration>,
        delay: Duration,
        gate: Semaphore,
        tokens: Mutex<Vec<CancelToken>>,
        requests: Mutex<Vec<TranscodeRequest>>,
    }

    impl ScriptedEngine {
        fn new(script: Script) -> Self {
            Self {
                script,
                progress: Vec::new(),
                delay: Duration::ZERO,
                gate: Semaphore::new(0),
                tokens: Mutex::new(Vec::new()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn with_progress(mut self, progress: Vec<Duration>) -> Self {
            self.progress = progress;
            self
        }

        fn with_delay(mut self, delay: Duration) -> Self {
            self.delay = delay;
            self
        }

        /// Whether each run the engine received has been cancelled, in call order.
        fn cancelled(&self) -> Vec<bool> {
            self.tokens
                .lock()
                .unwrap()
                .iter()
                .map(CancelToken::is_cancelled)
                .collect()
        }
    }

    #[async_trait::async_trait]
    impl TranscodeEngine for ScriptedEngine {
        async fn transcode(
            &self,
            request: TranscodeRequest,
            on_progress: ProgressCallback,
            mut cancel: CancelToken,
        ) -> Result<EngineOutcome, EngineError> {
            self.requests.lock().unwrap().push(request.clone());
            self.tokens.lock().unwrap().push(cancel.clone());
            for elapsed in &self.progress {
                on_progress(*elapsed);
            }
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let completed = EngineOutcome::Completed {
                output_uri: request.output_uri,
            };
            match self.script {
                Script::Complete => Ok(completed),
                Script::Fail(code) => Ok(EngineOutcome::Failed { return_code: code }),
                Script::EngineCancel => Ok(EngineOutcome::Cancelled),
                Script::Reject => Err(EngineError::ProcessError("boom".to_string())),
                Script::WaitThenComplete => {
                    self.gate.acquire().await.unwrap().forget();
                    Ok(completed)
                }
                Script::UntilCancelled => {
                    cancel.cancelled().await;
                    Ok(EngineOutcome::Cancelled)
                }
            }
        }
    }

    struct FixedStat(Option<u64>);

    #[async_trait::async_trait]
    impl FileStatProvider for FixedStat {
        async fn stat(&self, uri: &str) -> Result<FileStat, FileError> {
            match self.0 {
                Some(size) => Ok(FileStat { size }),
                None => Err(FileError::NotFound {
                    path: uri.to_string(),
                }),
            }
        }
    }

    struct FixedPicker(PickOutcome);

    #[async_trait::async_trait]
    impl AssetPicker for FixedPicker {
        async fn pick(&self) -> Result<PickOutcome, PickerError> {
            Ok(self.0.clone())
        }
    }

    struct NullViewer;

    impl Viewer for NullViewer {
        fn open(&self, _uri: &str) -> Result<(), ViewerError> {
            Ok(())
        }
    }

    struct Harness {
        coordinator: ExecutionCoordinator,
        engine: Arc<ScriptedEngine>,
        preferences: Arc<MemoryPreferenceStore>,
    }

    fn harness_with(engine: ScriptedEngine, stat: FixedStat, picked: PickOutcome) -> Harness {
        let engine = Arc::new(engine);
        let preferences = Arc::new(MemoryPreferenceStore::new());
        let services = ServiceManager::new(
            engine.clone(),
            preferences.clone(),
            Arc::new(FixedPicker(picked)),
            Arc::new(stat),
            Arc::new(NullViewer),
        );
        Harness {
            coordinator: ExecutionCoordinator::new(services, Handle::current()),
            engine,
            preferences,
        }
    }

    fn harness(engine: ScriptedEngine) -> Harness {
        harness_with(engine, FixedStat(Some(4242)), PickOutcome::Cancelled)
    }

    fn clip(duration: Option<f64>) -> SelectedAsset {
        SelectedAsset {
            uri: "/videos/clip.mp4".to_string(),
            file_size: Some(10_000_000),
            duration,
            bitrate: Some(8_000_000),
            width: Some(1920),
            height: Some(1080),
        }
    }

    fn select(coordinator: &mut ExecutionCoordinator, asset: SelectedAsset) {
        coordinator.apply_event(AppEvent::AssetPicked(PickOutcome::Selected(vec![asset])));
    }

    /// Applies events until `execution_id` reports its end, returning the
    /// progress values seen along the way.
    async fn run_to_end(coordinator: &mut ExecutionCoordinator, execution_id: ExecutionId) -> Vec<f64> {
        let mut progress = Vec::new();
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let event = coordinator.next_event().await.expect("channel open");
                let finished = matches!(event, AppEvent::ExecutionFinished(id) if id == execution_id);
                let is_progress = matches!(event, AppEvent::ExecutionProgress { .. });
                coordinator.apply_event(event);
                if is_progress {
                    progress.push(coordinator.progress());
                }
                if finished {
                    break;
                }
            }
        })
        .await
        .expect("execution did not finish in time");
        progress
    }

    #[tokio::test]
    async fn test_start_without_asset_is_noop() {
        let mut h = harness(ScriptedEngine::new(Script::Complete));

        assert_eq!(h.coordinator.start(), None);
        assert!(!h.coordinator.is_executing());
        assert_eq!(h.coordinator.result(), None);
        assert!(h.engine.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_start_with_empty_uri_keeps_previous_result() {
        let mut h = harness(ScriptedEngine::new(Script::Fail(1)));
        select(&mut h.coordinator, clip(Some(10.0)));
        let id = h.coordinator.start().unwrap();
        run_to_end(&mut h.coordinator, id).await;
        let previous = h.coordinator.result().cloned();
        assert!(previous.is_some());

        select(&mut h.coordinator, SelectedAsset::new(""));
        assert_eq!(h.coordinator.start(), None);
        assert!(!h.coordinator.is_executing());
        assert_eq!(h.coordinator.result().cloned(), previous);
        assert_eq!(h.engine.requests.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_progress_follows_elapsed_time_and_clamps() {
        let engine = ScriptedEngine::new(Script::Complete).with_progress(vec![
            Duration::from_millis(5000),
            Duration::from_millis(12000),
        ]);
        let mut h = harness(engine);
        select(&mut h.coordinator, clip(Some(10.0)));

        let id = h.coordinator.start().unwrap();
        assert!(h.coordinator.is_executing());
        assert_eq!(h.coordinator.progress(), 0.0);

        let progress = run_to_end(&mut h.coordinator, id).await;
        assert_eq!(progress, vec![0.5, 1.0]);
    }

    #[tokio::test]
    async fn test_progress_without_duration_stays_put() {
        let engine = ScriptedEngine::new(Script::Complete)
            .with_progress(vec![Duration::from_millis(5000)]);
        let mut h = harness(engine);
        select(&mut h.coordinator, clip(None));

        let id = h.coordinator.start().unwrap();
        let progress = run_to_end(&mut h.coordinator, id).await;
        assert!(progress.is_empty());
    }

    #[tokio::test]
    async fn test_success_records_size_and_elapsed_time() {
        let engine = ScriptedEngine::new(Script::Complete).with_delay(Duration::from_millis(50));
        let mut h = harness(engine);
        select(&mut h.coordinator, clip(Some(10.0)));

        let id = h.coordinator.start().unwrap();
        run_to_end(&mut h.coordinator, id).await;

        assert!(!h.coordinator.is_executing());
        assert_eq!(
            h.coordinator.phase(),
            &ExecutionPhase::Succeeded { execution_id: id }
        );
        match h.coordinator.result() {
            Some(ExecutionResult::Success {
                output_uri,
                file_size_bytes,
                elapsed_ms,
            }) => {
                assert_eq!(output_uri, "/videos/clip_compressed.mp4");
                assert_eq!(*file_size_bytes, 4242);
                assert!(*elapsed_ms >= 50, "elapsed {} ms", elapsed_ms);
                assert!(*elapsed_ms < 5000, "elapsed {} ms", elapsed_ms);
            }
            other => panic!("unexpected result {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_start_persists_parameters_and_uses_compression() {
        let mut h = harness(ScriptedEngine::new(Script::Complete));
        select(&mut h.coordinator, clip(Some(10.0)));
        *h.coordinator.parameters_mut() = "-c:v libx265".to_string();

        let id = h.coordinator.start().unwrap();
        run_to_end(&mut h.coordinator, id).await;

        assert_eq!(
            h.preferences.get(PARAMETERS_KEY).await.unwrap().as_deref(),
            Some("-c:v libx265")
        );
        let requests = h.engine.requests.lock().unwrap();
        assert_eq!(
            requests[0],
            TranscodeRequest {
                source_uri: "/videos/clip.mp4".to_string(),
                output_uri: "/videos/clip_compressed.mp4".to_string(),
                job: EngineJob::Compress(CompressionConfig::default()),
            }
        );
    }

    #[tokio::test]
    async fn test_command_mode_passes_parameters() {
        let mut h = harness(ScriptedEngine::new(Script::Complete));
        select(&mut h.coordinator, clip(Some(10.0)));
        *h.coordinator.mode_mut() = ExecutionMode::Command;
        *h.coordinator.parameters_mut() = "-an -vcodec mpeg4".to_string();

        let id = h.coordinator.start().unwrap();
        run_to_end(&mut h.coordinator, id).await;

        let requests = h.engine.requests.lock().unwrap();
        assert_eq!(
            requests[0].job,
            EngineJob::Command("-an -vcodec mpeg4".to_string())
        );
    }

    #[tokio::test]
    async fn test_engine_failure_shows_generic_message() {
        let mut h = harness(ScriptedEngine::new(Script::Fail(1)));
        select(&mut h.coordinator, clip(Some(10.0)));

        let id = h.coordinator.start().unwrap();
        run_to_end(&mut h.coordinator, id).await;

        assert!(!h.coordinator.is_executing());
        assert_eq!(h.coordinator.phase(), &ExecutionPhase::Failed { execution_id: id });
        assert_eq!(
            h.coordinator.result(),
            Some(&ExecutionResult::failure(GENERIC_ERROR_TEXT))
        );
    }

    #[tokio::test]
    async fn test_rejection_clears_flag_without_result() {
        let mut h = harness(ScriptedEngine::new(Script::Reject));
        select(&mut h.coordinator, clip(Some(10.0)));

        let id = h.coordinator.start().unwrap();
        run_to_end(&mut h.coordinator, id).await;

        assert!(!h.coordinator.is_executing());
        assert_eq!(h.coordinator.phase(), &ExecutionPhase::Idle);
        assert_eq!(h.coordinator.result(), None);
    }

    #[tokio::test]
    async fn test_stat_failure_is_a_rejection() {
        let mut h = harness_with(
            ScriptedEngine::new(Script::Complete),
            FixedStat(None),
            PickOutcome::Cancelled,
        );
        select(&mut h.coordinator, clip(Some(10.0)));

        let id = h.coordinator.start().unwrap();
        run_to_end(&mut h.coordinator, id).await;

        assert!(!h.coordinator.is_executing());
        assert_eq!(h.coordinator.result(), None);
    }

    #[tokio::test]
    async fn test_engine_side_cancel_leaves_no_result() {
        let mut h = harness(ScriptedEngine::new(Script::EngineCancel));
        select(&mut h.coordinator, clip(Some(10.0)));

        let id = h.coordinator.start().unwrap();
        run_to_end(&mut h.coordinator, id).await;

        assert!(!h.coordinator.is_executing());
        assert_eq!(h.coordinator.result(), None);
    }

    #[tokio::test]
    async fn test_cancel_while_executing() {
        let mut h = harness(ScriptedEngine::new(Script::UntilCancelled));
        select(&mut h.coordinator, clip(Some(10.0)));

        let id = h.coordinator.start().unwrap();
        assert!(h.coordinator.cancel());

        assert!(!h.coordinator.is_executing());
        assert_eq!(
            h.coordinator.phase(),
            &ExecutionPhase::Cancelled { execution_id: id }
        );
        assert_eq!(
            h.coordinator.result(),
            Some(&ExecutionResult::failure(
                "Error while executing command, check logs for details."
            ))
        );

        // the run had not started yet; it still sees the cancellation and stops
        run_to_end(&mut h.coordinator, id).await;
        assert_eq!(h.engine.cancelled(), vec![true]);
        assert_eq!(
            h.coordinator.phase(),
            &ExecutionPhase::Cancelled { execution_id: id }
        );
    }

    #[tokio::test]
    async fn test_cancel_while_idle_is_noop() {
        let mut h = harness(ScriptedEngine::new(Script::Complete));
        assert!(!h.coordinator.cancel());
        assert_eq!(h.coordinator.result(), None);

        select(&mut h.coordinator, clip(Some(10.0)));
        let id = h.coordinator.start().unwrap();
        run_to_end(&mut h.coordinator, id).await;
        let finished = h.coordinator.result().cloned();

        assert!(!h.coordinator.cancel());
        assert_eq!(h.coordinator.result().cloned(), finished);
        assert_eq!(h.engine.cancelled(), vec![false]);
    }

    #[tokio::test]
    async fn test_late_completion_after_cancel_is_discarded() {
        let mut h = harness(ScriptedEngine::new(Script::WaitThenComplete));
        select(&mut h.coordinator, clip(Some(10.0)));

        let id = h.coordinator.start().unwrap();
        assert!(h.coordinator.cancel());

        // the engine ignores the cancel request and finishes anyway
        h.engine.gate.add_permits(1);
        run_to_end(&mut h.coordinator, id).await;

        assert_eq!(
            h.coordinator.phase(),
            &ExecutionPhase::Cancelled { execution_id: id }
        );
        assert_eq!(
            h.coordinator.result(),
            Some(&ExecutionResult::failure(GENERIC_ERROR_TEXT))
        );
    }

    #[tokio::test]
    async fn test_second_start_supersedes_first() {
        let mut h = harness(ScriptedEngine::new(Script::WaitThenComplete));
        select(&mut h.coordinator, clip(Some(10.0)));

        let first = h.coordinator.start().unwrap();
        let second = h.coordinator.start().unwrap();
        assert_ne!(first, second);

        h.engine.gate.add_permits(2);
        run_to_end(&mut h.coordinator, second).await;
        // drain whatever the first execution still has to say
        while let Ok(Some(event)) =
            tokio::time::timeout(Duration::from_millis(200), h.coordinator.next_event()).await
        {
            h.coordinator.apply_event(event);
        }

        assert_eq!(
            h.coordinator.phase(),
            &ExecutionPhase::Succeeded { execution_id: second }
        );
        let cancelled = h.engine.cancelled();
        assert_eq!(cancelled.len(), 2);
        assert_eq!(cancelled.iter().filter(|c| **c).count(), 1);
    }

    #[tokio::test]
    async fn test_restore_parameters() {
        let mut h = harness(ScriptedEngine::new(Script::Complete));
        h.coordinator.restore_parameters().await;
        assert_eq!(h.coordinator.parameters(), DEFAULT_PARAMETERS);

        h.preferences.set(PARAMETERS_KEY, "").await.unwrap();
        h.coordinator.restore_parameters().await;
        assert_eq!(h.coordinator.parameters(), DEFAULT_PARAMETERS);

        h.preferences
            .set(PARAMETERS_KEY, "-c:v libx264 -crf 23")
            .await
            .unwrap();
        h.coordinator.restore_parameters().await;
        assert_eq!(h.coordinator.parameters(), "-c:v libx264 -crf 23");
    }

    #[tokio::test]
    async fn test_pick_replaces_asset_wholesale() {
        let mut h = harness(ScriptedEngine::new(Script::Complete));
        select(&mut h.coordinator, clip(Some(10.0)));

        h.coordinator
            .apply_event(AppEvent::AssetPicked(PickOutcome::Cancelled));
        assert_eq!(h.coordinator.asset(), Some(&clip(Some(10.0))));

        h.coordinator.apply_event(AppEvent::AssetPicked(PickOutcome::Selected(vec![
            SelectedAsset::new("/videos/other.mov"),
            SelectedAsset::new("/videos/ignored.mov"),
        ])));
        assert_eq!(
            h.coordinator.asset(),
            Some(&SelectedAsset::new("/videos/other.mov"))
        );
    }

    #[tokio::test]
    async fn test_pick_asset_through_picker() {
        let mut h = harness_with(
            ScriptedEngine::new(Script::Complete),
            FixedStat(Some(1)),
            PickOutcome::Selected(vec![clip(Some(3.0))]),
        );

        h.coordinator.pick_asset();
        assert!(h.coordinator.is_picking());

        let event = h.coordinator.next_event().await.unwrap();
        h.coordinator.apply_event(event);
        assert!(!h.coordinator.is_picking());
        assert_eq!(h.coordinator.asset(), Some(&clip(Some(3.0))));
    }

    #[tokio::test]
    async fn test_picker_failure_sets_notice() {
        let mut h = harness(ScriptedEngine::new(Script::Complete));
        h.coordinator
            .apply_event(AppEvent::PickerFailed("not a video".to_string()));
        assert_eq!(h.coordinator.notice(), Some("not a video"));
        assert_eq!(h.coordinator.asset(), None);

        h.coordinator.clear_notice();
        assert_eq!(h.coordinator.notice(), None);
    }
}
