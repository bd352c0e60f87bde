use std::sync::Arc;

use log::{debug, info, warn};
use serde::Serialize;
use tokio::sync::{broadcast, mpsc, watch, Mutex};
use tokio::task::JoinHandle;

use crate::error::PlaybackError;
use crate::models::Track;

use super::{AudioOutput, LinkOpener, PlaybackEvent, PlaybackState, PlayerEvent};

const EVENT_CAPACITY: usize = 64;

/// What `select_preview` did synchronously. Whether the sound actually
/// started is reported later through `PlaybackEvent`s.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PreviewAction {
    Paused,
    Starting,
    Unavailable,
}

struct PlaybackInner {
    active: Option<Track>,
    is_sounding: bool,
    /// Bumped on every transition that invalidates an outstanding start.
    generation: u64,
}

impl PlaybackInner {
    fn snapshot(&self) -> PlaybackState {
        PlaybackState {
            active_track_id: self.active.as_ref().map(|t| t.id.clone()),
            is_sounding: self.is_sounding,
        }
    }
}

#[derive(Clone)]
pub struct PlaybackController {
    inner: Arc<Mutex<PlaybackInner>>,
    output: Arc<dyn AudioOutput>,
    opener: Arc<dyn LinkOpener>,
    state_tx: Arc<watch::Sender<PlaybackState>>,
    events: broadcast::Sender<PlaybackEvent>,
}

impl PlaybackController {
    pub fn new(output: Arc<dyn AudioOutput>, opener: Arc<dyn LinkOpener>) -> Self {
        let (state_tx, _) = watch::channel(PlaybackState::default());
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Mutex::new(PlaybackInner {
                active: None,
                is_sounding: false,
                generation: 0,
            })),
            output,
            opener,
            state_tx: Arc::new(state_tx),
            events,
        }
    }

    pub async fn state(&self) -> PlaybackState {
        self.inner.lock().await.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackState> {
        self.state_tx.subscribe()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.events.subscribe()
    }

    /// Toggle semantics: re-selecting the sounding track pauses it in place;
    /// anything else unloads the previous track and starts `track`.
    pub async fn select_preview(&self, track: &Track) -> PreviewAction {
        let mut inner = self.inner.lock().await;
        let same = inner
            .active
            .as_ref()
            .map(|active| active.id == track.id)
            .unwrap_or(false);

        if same && inner.is_sounding {
            self.output.pause();
            inner.is_sounding = false;
            inner.generation += 1;
            debug!("paused preview {}", track.id);
            self.publish(&inner);
            return PreviewAction::Paused;
        }

        if !same {
            if let Some(previous) = inner.active.take() {
                self.output.stop();
                debug!("unloaded preview {}", previous.id);
            }
            inner.is_sounding = false;
            inner.active = Some(track.clone());
            inner.generation += 1;

            let loaded = match track.preview_uri.as_deref() {
                Some(uri) if track.has_preview() => self.output.load(&track.id, uri),
                _ => Err(PlaybackError::SourceUnavailable("no preview for this track".into())),
            };
            if let Err(err) = loaded {
                self.publish(&inner);
                drop(inner);
                self.report_unavailable(track, &err);
                return PreviewAction::Unavailable;
            }
        } else {
            inner.generation += 1;
        }

        let generation = inner.generation;
        self.publish(&inner);
        drop(inner);

        let controller = self.clone();
        let track = track.clone();
        tokio::spawn(async move {
            let result = controller.output.play(&track.id, generation).await;
            controller.settle_start(&track, generation, result).await;
        });

        PreviewAction::Starting
    }

    async fn settle_start(&self, track: &Track, generation: u64, result: Result<(), PlaybackError>) {
        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            debug!("discarding stale start for {}", track.id);
            return;
        }

        match result {
            Ok(()) => {
                inner.is_sounding = true;
                info!("preview {} sounding", track.id);
                self.publish(&inner);
            }
            Err(err) => {
                inner.is_sounding = false;
                self.publish(&inner);
                drop(inner);
                self.report_unavailable(track, &err);
            }
        }
    }

    /// Natural completion from the player. Ignored unless `track_id` is active
    /// and `generation` is the one its sound was started with; an end queued
    /// behind a pause, resume or reload is stale.
    pub async fn on_ended(&self, track_id: &str, generation: u64) {
        let mut inner = self.inner.lock().await;
        let is_active = inner
            .active
            .as_ref()
            .map(|t| t.id == track_id)
            .unwrap_or(false);
        if !is_active {
            debug!("ignoring end for inactive track {}", track_id);
            return;
        }
        if inner.generation != generation {
            debug!("ignoring stale end for {} (generation {})", track_id, generation);
            return;
        }
        inner.active = None;
        inner.is_sounding = false;
        inner.generation += 1;
        self.publish(&inner);
    }

    /// Any player error degrades to "preview unavailable" for the active track.
    pub async fn on_player_error(&self, reason: &str) {
        let mut inner = self.inner.lock().await;
        let Some(track) = inner.active.clone() else {
            warn!("player error with nothing loaded: {}", reason);
            return;
        };
        inner.is_sounding = false;
        inner.generation += 1;
        self.publish(&inner);
        drop(inner);
        self.report_unavailable(&track, &PlaybackError::SourceUnavailable(reason.to_string()));
    }

    /// Unloads everything and returns to idle.
    pub async fn stop(&self) {
        let mut inner = self.inner.lock().await;
        if inner.active.is_none() {
            return;
        }
        self.output.stop();
        inner.active = None;
        inner.is_sounding = false;
        inner.generation += 1;
        self.publish(&inner);
    }

    pub fn set_volume(&self, volume: f32) {
        self.output.set_volume(volume.clamp(0.0, 1.0));
    }

    /// Opens the track's external link. Leaves playback state untouched.
    pub fn open_external(&self, track: &Track) {
        match self.opener.open(&track.external_uri) {
            Ok(()) => {
                let _ = self.events.send(PlaybackEvent::ExternalOpened {
                    track_id: track.id.clone(),
                    uri: track.external_uri.clone(),
                });
            }
            Err(err) => warn!("failed to open {}: {:#}", track.external_uri, err),
        }
    }

    /// Feeds player callbacks into the controller until the sender side closes.
    pub fn listen(&self, mut rx: mpsc::UnboundedReceiver<PlayerEvent>) -> JoinHandle<()> {
        let controller = self.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                match event {
                    PlayerEvent::Ended {
                        track_id,
                        generation,
                    } => controller.on_ended(&track_id, generation).await,
                    PlayerEvent::Error { reason } => controller.on_player_error(&reason).await,
                }
            }
            debug!("player event channel closed");
        })
    }

    fn publish(&self, inner: &PlaybackInner) {
        let state = inner.snapshot();
        self.state_tx.send_replace(state.clone());
        let _ = self.events.send(PlaybackEvent::StateChanged { state });
    }

    fn report_unavailable(&self, track: &Track, err: &PlaybackError) {
        warn!("preview {} unavailable: {}", track.id, err);
        let _ = self.events.send(PlaybackEvent::PreviewUnavailable {
            track_id: track.id.clone(),
            external_uri: track.external_uri.clone(),
            reason: err.to_string(),
        });
    }
}
