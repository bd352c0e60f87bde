#![allow(dead_code)]

use std::{
    sync::{
        atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use moodtunes_lib::{
    acquisition::{CameraDevice, ImagePayload, StreamHandle},
    error::{AcquisitionError, InferenceError, PlaybackError},
    inference::{Detection, InferenceClient},
    playback::{AudioOutput, LinkOpener, PlaybackController},
    recommendations::RecommendationIndex,
    session::{SessionConfig, SessionController, SessionEvent, SessionState},
};
use tokio::sync::{broadcast, watch, Semaphore};

pub const WAIT: Duration = Duration::from_secs(5);

/// Camera that counts opens and closes and can be told to deny access or to
/// lose its stream.
#[derive(Default)]
pub struct CountingCamera {
    next_id: AtomicU64,
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub deny: AtomicBool,
    pub unplugged: AtomicBool,
}

impl CountingCamera {
    pub fn live_streams(&self) -> usize {
        self.opened.load(Ordering::SeqCst) - self.closed.load(Ordering::SeqCst)
    }
}

impl CameraDevice for CountingCamera {
    fn open(&self) -> Result<StreamHandle, AcquisitionError> {
        if self.deny.load(Ordering::SeqCst) {
            return Err(AcquisitionError::PermissionDenied);
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(StreamHandle::new(self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    fn close(&self, _handle: StreamHandle) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }

    fn snapshot(&self, _handle: &StreamHandle) -> Result<ImagePayload, AcquisitionError> {
        if self.unplugged.load(Ordering::SeqCst) {
            return Err(AcquisitionError::DeviceUnavailable("camera unplugged".into()));
        }
        Ok(ImagePayload::new(vec![0; 16], 2, 2, "png"))
    }
}

/// Labeler that holds every call until the test releases it.
pub struct GatedInference {
    label: String,
    confidence: f32,
    gate: Semaphore,
    pub calls: AtomicUsize,
    active: AtomicUsize,
    pub max_active: AtomicUsize,
}

impl GatedInference {
    pub fn new(label: &str, confidence: f32) -> Self {
        Self {
            label: label.to_string(),
            confidence,
            gate: Semaphore::new(0),
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
        }
    }

    pub fn release(&self) {
        self.gate.add_permits(1);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceClient for GatedInference {
    fn name(&self) -> &str {
        "gated"
    }

    async fn infer(&self, _image: &ImagePayload) -> Result<Detection, InferenceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);

        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| InferenceError::Failed(e.to_string()))?;
        permit.forget();

        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(Detection {
            label: self.label.clone(),
            confidence: self.confidence,
        })
    }
}

/// Output that records calls in order and sounds whatever is loaded.
#[derive(Default)]
pub struct ScriptedOutput {
    log: Mutex<Vec<String>>,
    loaded: Mutex<Option<String>>,
}

impl ScriptedOutput {
    pub fn calls(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }
}

#[async_trait]
impl AudioOutput for ScriptedOutput {
    fn load(&self, track_id: &str, _uri: &str) -> Result<(), PlaybackError> {
        self.log.lock().unwrap().push(format!("load:{track_id}"));
        *self.loaded.lock().unwrap() = Some(track_id.to_string());
        Ok(())
    }

    async fn play(&self, track_id: &str, _generation: u64) -> Result<(), PlaybackError> {
        self.log.lock().unwrap().push(format!("play:{track_id}"));
        match self.loaded.lock().unwrap().as_deref() {
            Some(id) if id == track_id => Ok(()),
            _ => Err(PlaybackError::SourceUnavailable("not loaded".into())),
        }
    }

    fn pause(&self) {
        self.log.lock().unwrap().push("pause".into());
    }

    fn stop(&self) {
        self.log.lock().unwrap().push("stop".into());
        *self.loaded.lock().unwrap() = None;
    }

    fn set_volume(&self, _volume: f32) {}
}

#[derive(Default)]
pub struct RecordingOpener {
    pub opened: Mutex<Vec<String>>,
}

impl LinkOpener for RecordingOpener {
    fn open(&self, uri: &str) -> anyhow::Result<()> {
        self.opened.lock().unwrap().push(uri.to_string());
        Ok(())
    }
}

pub struct Harness {
    pub session: SessionController,
    pub camera: Arc<CountingCamera>,
    pub inference: Arc<GatedInference>,
    pub output: Arc<ScriptedOutput>,
    pub opener: Arc<RecordingOpener>,
}

impl Harness {
    pub fn new(label: &str, confidence: f32) -> Self {
        let camera = Arc::new(CountingCamera::default());
        let inference = Arc::new(GatedInference::new(label, confidence));
        let output = Arc::new(ScriptedOutput::default());
        let opener = Arc::new(RecordingOpener::default());
        let playback = PlaybackController::new(output.clone(), opener.clone());

        let session = SessionController::new(
            camera.clone(),
            inference.clone(),
            Arc::new(RecommendationIndex::reference()),
            playback,
            SessionConfig {
                inference_timeout: Duration::from_secs(30),
                reload_settle: Duration::from_millis(5),
            },
        );

        Self {
            session,
            camera,
            inference,
            output,
            opener,
        }
    }
}

pub async fn wait_state<F>(rx: &mut watch::Receiver<SessionState>, mut predicate: F) -> SessionState
where
    F: FnMut(&SessionState) -> bool,
{
    tokio::time::timeout(WAIT, rx.wait_for(|state| predicate(state)))
        .await
        .expect("timed out waiting for session state")
        .expect("state channel closed")
        .clone()
}

/// Next event that is not a plain state change.
pub async fn next_notice(rx: &mut broadcast::Receiver<SessionEvent>) -> SessionEvent {
    loop {
        let event = tokio::time::timeout(WAIT, rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed");
        if !matches!(event, SessionEvent::StateChanged { .. }) {
            return event;
        }
    }
}

/// Collects whatever notices are already queued without waiting.
pub fn drain_notices(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut out = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if !matches!(event, SessionEvent::StateChanged { .. }) {
            out.push(event);
        }
    }
    out
}

pub async fn wait_until<F: Fn() -> bool>(check: F) {
    tokio::time::timeout(WAIT, async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
