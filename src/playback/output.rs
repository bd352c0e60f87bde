use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc::UnboundedSender;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::error::PlaybackError;

use super::PlayerEvent;

/// The single audio sink a session plays previews through.
#[async_trait]
pub trait AudioOutput: Send + Sync {
    /// Replaces whatever is loaded. Must not leave the previous source audible.
    fn load(&self, track_id: &str, uri: &str) -> Result<(), PlaybackError>;

    /// Starts (or resumes) the loaded source. Fails if `track_id` is no longer
    /// the loaded one, so a late start can never sound a newer load. The
    /// matching `Ended` event carries `generation` back.
    async fn play(&self, track_id: &str, generation: u64) -> Result<(), PlaybackError>;

    fn pause(&self);

    /// Stops and unloads.
    fn stop(&self);

    fn set_volume(&self, volume: f32);
}

fn is_playable_uri(uri: &str) -> bool {
    ["https://", "http://", "file://"]
        .iter()
        .any(|scheme| uri.starts_with(scheme))
}

struct SimulatedTrack {
    track_id: String,
    remaining: Duration,
    resumed_at: Option<Instant>,
    timer: Option<JoinHandle<()>>,
}

/// Output that pretends to play: a preview "sounds" for a fixed length and
/// then reports `Ended`. Used by the console host when no audio backend is
/// compiled in.
pub struct SimulatedOutput {
    preview_len: Duration,
    events: UnboundedSender<PlayerEvent>,
    current: Arc<Mutex<Option<SimulatedTrack>>>,
}

impl SimulatedOutput {
    pub fn new(preview_len: Duration, events: UnboundedSender<PlayerEvent>) -> Self {
        Self {
            preview_len,
            events,
            current: Arc::new(Mutex::new(None)),
        }
    }

    fn with_current<R>(&self, f: impl FnOnce(&mut Option<SimulatedTrack>) -> R) -> R {
        match self.current.lock() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}

#[async_trait]
impl AudioOutput for SimulatedOutput {
    fn load(&self, track_id: &str, uri: &str) -> Result<(), PlaybackError> {
        self.stop();
        if !is_playable_uri(uri) {
            return Err(PlaybackError::SourceUnavailable(format!(
                "unsupported preview uri {uri}"
            )));
        }
        let preview_len = self.preview_len;
        self.with_current(|current| {
            *current = Some(SimulatedTrack {
                track_id: track_id.to_string(),
                remaining: preview_len,
                resumed_at: None,
                timer: None,
            });
        });
        Ok(())
    }

    async fn play(&self, track_id: &str, generation: u64) -> Result<(), PlaybackError> {
        let events = self.events.clone();
        let slot = Arc::clone(&self.current);
        self.with_current(|current| {
            let track = current
                .as_mut()
                .filter(|t| t.track_id == track_id)
                .ok_or_else(|| PlaybackError::SourceUnavailable(format!("{track_id} is not loaded")))?;

            if track.timer.is_some() {
                return Ok(());
            }

            let remaining = track.remaining;
            let ended_id = track.track_id.clone();
            track.resumed_at = Some(Instant::now());
            track.timer = Some(tokio::spawn(async move {
                tokio::time::sleep(remaining).await;
                let finished = match slot.lock() {
                    Ok(mut guard) => {
                        let still_loaded = guard
                            .as_ref()
                            .map(|t| t.track_id == ended_id)
                            .unwrap_or(false);
                        if still_loaded {
                            *guard = None;
                        }
                        still_loaded
                    }
                    Err(_) => false,
                };
                if finished {
                    let _ = events.send(PlayerEvent::Ended {
                        track_id: ended_id,
                        generation,
                    });
                }
            }));
            Ok(())
        })
    }

    fn pause(&self) {
        self.with_current(|current| {
            if let Some(track) = current.as_mut() {
                if let Some(timer) = track.timer.take() {
                    timer.abort();
                }
                if let Some(resumed_at) = track.resumed_at.take() {
                    track.remaining = track.remaining.saturating_sub(resumed_at.elapsed());
                }
            }
        });
    }

    fn stop(&self) {
        self.with_current(|current| {
            if let Some(track) = current.take() {
                if let Some(timer) = track.timer {
                    timer.abort();
                }
            }
        });
    }

    fn set_volume(&self, _volume: f32) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    #[tokio::test]
    async fn test_preview_reports_end_once() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let output = SimulatedOutput::new(Duration::from_millis(20), tx);

        output.load("7", "https://example.com/a.wav").unwrap();
        output.play("7", 3).await.unwrap();

        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            event,
            PlayerEvent::Ended {
                track_id: "7".into(),
                generation: 3
            }
        );
        assert!(output.play("7", 4).await.is_err(), "ended track is unloaded");
    }

    #[tokio::test]
    async fn test_stopped_preview_never_reports_end() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let output = SimulatedOutput::new(Duration::from_millis(20), tx);

        output.load("7", "https://example.com/a.wav").unwrap();
        output.play("7", 1).await.unwrap();
        output.stop();

        let waited = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_play_for_superseded_load_fails() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let output = SimulatedOutput::new(Duration::from_secs(30), tx);

        output.load("a", "https://example.com/a.wav").unwrap();
        output.load("b", "https://example.com/b.wav").unwrap();
        assert!(output.play("a", 1).await.is_err());
        assert!(output.play("b", 2).await.is_ok());
    }

    #[test]
    fn test_unsupported_uri_is_unavailable() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let output = SimulatedOutput::new(Duration::from_secs(1), tx);
        assert!(matches!(
            output.load("a", "ftp://example.com/a.wav"),
            Err(PlaybackError::SourceUnavailable(_))
        ));
    }
}
