use std::{
    collections::VecDeque,
    path::PathBuf,
    sync::Arc,
    time::{Duration, Instant},
};

use serde::Serialize;
use tokio::{
    sync::{broadcast, watch, Mutex},
    time,
};
use tokio_util::sync::CancellationToken;

use crate::{
    acquisition::{self, AcquisitionController, AcquisitionMode, CameraDevice, ImagePayload},
    error::{AcquisitionError, AnalysisError, InferenceError, SessionError, SessionResult},
    inference::InferenceClient,
    models::{DetectionResult, Mood, Track},
    playback::{PlaybackController, PlaybackState, PreviewAction},
    recommendations::RecommendationIndex,
};
use crate::{log_debug, log_error, log_info, log_warn};

use super::{
    events::SessionEvent,
    state::{transition, AnalysisSource, AnalysisTicket, Effect, SessionInput, SessionPhase, SessionState},
};

const ENABLE_LOGS: bool = true;

const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub phase: SessionPhase,
    pub playback: PlaybackState,
    pub recommendations: Vec<Track>,
}

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub inference_timeout: Duration,
    pub reload_settle: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inference_timeout: Duration::from_secs(10),
            reload_settle: Duration::from_millis(100),
        }
    }
}

/// What the analysis task reads its image from.
#[derive(Debug)]
enum AnalysisJob {
    CameraFrame,
    Image(ImagePayload),
    File(PathBuf),
}

#[derive(Clone)]
pub struct SessionController {
    state: Arc<Mutex<SessionState>>,
    acquisition: Arc<Mutex<AcquisitionController>>,
    inference: Arc<dyn InferenceClient>,
    recommendations: Arc<RecommendationIndex>,
    playback: PlaybackController,
    state_tx: Arc<watch::Sender<SessionState>>,
    events: broadcast::Sender<SessionEvent>,
    inference_timeout: Duration,
    shutdown: CancellationToken,
}

impl SessionController {
    pub fn new(
        camera: Arc<dyn CameraDevice>,
        inference: Arc<dyn InferenceClient>,
        recommendations: Arc<RecommendationIndex>,
        playback: PlaybackController,
        config: SessionConfig,
    ) -> Self {
        let initial = SessionState::new();
        let (state_tx, _) = watch::channel(initial.clone());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        log_info!(
            "session {} created (inference: {}, timeout {:?})",
            initial.session_id,
            inference.name(),
            config.inference_timeout
        );

        Self {
            state: Arc::new(Mutex::new(initial)),
            acquisition: Arc::new(Mutex::new(AcquisitionController::new(
                camera,
                config.reload_settle,
            ))),
            inference,
            recommendations,
            playback,
            state_tx: Arc::new(state_tx),
            events,
            inference_timeout: config.inference_timeout,
            shutdown: CancellationToken::new(),
        }
    }

    pub async fn get_state(&self) -> SessionState {
        self.state.lock().await.clone()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let state = self.get_state().await;
        let mood = state.last_result.as_ref().map(|r| r.mood);
        SessionSnapshot {
            phase: state.phase(),
            playback: self.playback.state().await,
            recommendations: self.recommendations.lookup(mood).to_vec(),
            state,
        }
    }

    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn playback(&self) -> &PlaybackController {
        &self.playback
    }

    pub async fn select_mode(&self, mode: AcquisitionMode) -> SessionResult<SessionState> {
        self.dispatch(SessionInput::SelectMode(mode), None).await
    }

    pub async fn deselect_mode(&self) -> SessionResult<SessionState> {
        self.dispatch(SessionInput::DeselectMode, None).await
    }

    pub async fn start_camera(&self) -> SessionResult<SessionState> {
        self.dispatch(SessionInput::RequestStream, None).await
    }

    pub async fn stop_camera(&self) -> SessionResult<SessionState> {
        self.dispatch(SessionInput::ReleaseStream, None).await
    }

    pub async fn reload_camera(&self) -> SessionResult<SessionState> {
        self.dispatch(SessionInput::ReloadStream, None).await
    }

    /// Grabs the current camera frame and starts analysing it. Returns as
    /// soon as the analysis is in flight; the outcome arrives as an event.
    pub async fn capture_and_analyze(&self) -> SessionResult<SessionState> {
        self.dispatch(
            SessionInput::BeginAnalysis {
                source: AnalysisSource::CameraFrame,
            },
            Some(AnalysisJob::CameraFrame),
        )
        .await
    }

    pub async fn submit_image(&self, image: ImagePayload) -> SessionResult<SessionState> {
        self.dispatch(
            SessionInput::BeginAnalysis {
                source: AnalysisSource::Upload,
            },
            Some(AnalysisJob::Image(image)),
        )
        .await
    }

    /// Like `submit_image`, but the file is read on the analysis task so a
    /// read failure settles the analysis instead of failing the call.
    pub async fn submit_file(&self, path: impl Into<PathBuf>) -> SessionResult<SessionState> {
        self.dispatch(
            SessionInput::BeginAnalysis {
                source: AnalysisSource::Upload,
            },
            Some(AnalysisJob::File(path.into())),
        )
        .await
    }

    /// Playlist for the current result, or the neutral list when there is none.
    pub async fn recommendations(&self) -> Vec<Track> {
        let mood = self.current_mood().await;
        self.recommendations.lookup(mood).to_vec()
    }

    pub async fn select_preview(&self, track_id: &str) -> SessionResult<PreviewAction> {
        let track = self.resolve_track(track_id).await?;
        Ok(self.playback.select_preview(&track).await)
    }

    pub async fn open_external(&self, track_id: &str) -> SessionResult<()> {
        let track = self.resolve_track(track_id).await?;
        self.playback.open_external(&track);
        Ok(())
    }

    pub fn set_volume(&self, volume: f32) {
        self.playback.set_volume(volume);
    }

    /// Aborts any in-flight analysis, releases the camera and silences playback.
    /// Every later operation fails with `SessionError::ShutDown`.
    pub async fn shutdown(&self) {
        if self.shutdown.is_cancelled() {
            return;
        }
        self.shutdown.cancel();

        // Taking the state lock waits out any dispatch still running effects.
        let state = self.state.lock().await;
        self.acquisition.lock().await.stop();
        self.playback.stop().await;
        log_info!("session {} shut down", state.session_id);
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    async fn current_mood(&self) -> Option<Mood> {
        self.state
            .lock()
            .await
            .last_result
            .as_ref()
            .map(|result| result.mood)
    }

    async fn resolve_track(&self, track_id: &str) -> SessionResult<Track> {
        let mood = self.current_mood().await;
        self.recommendations
            .find(mood, track_id)
            .cloned()
            .ok_or_else(|| SessionError::UnknownTrack(track_id.to_string()))
    }

    /// Feeds `input` through the state machine, then runs the resulting
    /// effects. Effects may produce follow-up inputs (stream opened or failed)
    /// which are applied under the same lock, in order.
    async fn dispatch(
        &self,
        input: SessionInput,
        mut job: Option<AnalysisJob>,
    ) -> SessionResult<SessionState> {
        if self.shutdown.is_cancelled() {
            return Err(SessionError::ShutDown);
        }

        let mut state = self.state.lock().await;
        let mut pending = VecDeque::from([input]);
        let mut changed = false;
        let mut first = true;

        while let Some(input) = pending.pop_front() {
            let label = describe(&input);
            let step = match transition(&state, input) {
                Ok(step) => step,
                Err(rejection) if first => {
                    log_warn!("{} rejected: {}", label, rejection);
                    return Err(rejection.into());
                }
                Err(rejection) => {
                    log_warn!("follow-up {} rejected: {}", label, rejection);
                    continue;
                }
            };
            first = false;

            if step.changed {
                log_debug!("{} -> {:?}", label, step.state.phase());
                *state = step.state;
                changed = true;
            }

            for effect in step.effects {
                if let Some(follow_up) = self.run_effect(effect, &mut job).await {
                    pending.push_back(follow_up);
                }
            }
        }

        if changed {
            self.publish(&state);
        }
        Ok(state.clone())
    }

    async fn run_effect(
        &self,
        effect: Effect,
        job: &mut Option<AnalysisJob>,
    ) -> Option<SessionInput> {
        match effect {
            Effect::StartCamera { epoch } => {
                let opened = self.acquisition.lock().await.start();
                Some(stream_outcome(epoch, opened))
            }
            Effect::ReloadCamera { epoch } => {
                let reopened = self.acquisition.lock().await.reload().await;
                Some(stream_outcome(epoch, reopened))
            }
            Effect::StopCamera => {
                self.acquisition.lock().await.stop();
                None
            }
            Effect::RunInference { ticket } => match job.take() {
                Some(job) => {
                    self.spawn_analysis(ticket, job);
                    None
                }
                None => {
                    log_error!("analysis {} started without an image", ticket.id);
                    Some(SessionInput::AnalysisSettled {
                        ticket,
                        outcome: Err(InferenceError::Failed("no image to analyze".into()).into()),
                    })
                }
            },
            Effect::StopPlayback => {
                self.playback.stop().await;
                None
            }
            Effect::Emit(event) => {
                let _ = self.events.send(event);
                None
            }
        }
    }

    fn spawn_analysis(&self, ticket: AnalysisTicket, job: AnalysisJob) {
        let controller = self.clone();
        let from_camera = matches!(job, AnalysisJob::CameraFrame);
        log_info!("analysis {} started ({:?})", ticket.id, job_kind(&job));

        tokio::spawn(async move {
            let outcome = tokio::select! {
                _ = controller.shutdown.cancelled() => {
                    log_debug!("analysis {} aborted by shutdown", ticket.id);
                    return;
                }
                outcome = controller.analyze(job) => outcome,
            };

            match &outcome {
                Ok(result) => log_info!("analysis {} settled: {}", ticket.id, result.summary()),
                Err(err) => log_warn!("analysis {} failed: {}", ticket.id, err),
            }

            let stream_died = from_camera
                && matches!(
                    outcome,
                    Err(AnalysisError::Acquisition(AcquisitionError::DeviceUnavailable(_)))
                );
            // A reload may have replaced the dead stream while the frame was captured.
            if stream_died && !controller.acquisition.lock().await.is_live() {
                if let Err(err) = controller
                    .dispatch(SessionInput::StreamClosed { epoch: ticket.epoch }, None)
                    .await
                {
                    log_debug!("stream-closed for analysis {} dropped: {}", ticket.id, err);
                }
            }

            if let Err(err) = controller
                .dispatch(SessionInput::AnalysisSettled { ticket, outcome }, None)
                .await
            {
                log_debug!("analysis {} settlement dropped: {}", ticket.id, err);
            }
        });
    }

    async fn analyze(&self, job: AnalysisJob) -> Result<DetectionResult, AnalysisError> {
        let image = match job {
            AnalysisJob::CameraFrame => self.acquisition.lock().await.capture_frame()?,
            AnalysisJob::Image(image) => image,
            AnalysisJob::File(path) => acquisition::read_file(&path).await?,
        };

        let started = Instant::now();
        let detection = time::timeout(self.inference_timeout, self.inference.infer(&image))
            .await
            .map_err(|_| InferenceError::Timeout)??;
        log_debug!(
            "{} labelled {} bytes in {:?}",
            self.inference.name(),
            image.len(),
            started.elapsed()
        );

        Ok(detection.into_result()?)
    }

    fn publish(&self, state: &SessionState) {
        self.state_tx.send_replace(state.clone());
        let _ = self.events.send(SessionEvent::StateChanged {
            state: state.clone(),
        });
    }
}

fn stream_outcome(
    epoch: u64,
    result: Result<u64, AcquisitionError>,
) -> SessionInput {
    match result {
        Ok(_) => SessionInput::StreamOpened { epoch },
        Err(error) => SessionInput::StreamFailed { epoch, error },
    }
}

fn describe(input: &SessionInput) -> &'static str {
    match input {
        SessionInput::SelectMode(_) => "select-mode",
        SessionInput::DeselectMode => "deselect-mode",
        SessionInput::RequestStream => "request-stream",
        SessionInput::ReleaseStream => "release-stream",
        SessionInput::ReloadStream => "reload-stream",
        SessionInput::StreamOpened { .. } => "stream-opened",
        SessionInput::StreamFailed { .. } => "stream-failed",
        SessionInput::StreamClosed { .. } => "stream-closed",
        SessionInput::BeginAnalysis { .. } => "begin-analysis",
        SessionInput::AnalysisSettled { .. } => "analysis-settled",
    }
}

fn job_kind(job: &AnalysisJob) -> &'static str {
    match job {
        AnalysisJob::CameraFrame => "camera frame",
        AnalysisJob::Image(_) => "image",
        AnalysisJob::File(_) => "file",
    }
}
