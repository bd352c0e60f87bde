use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use std::sync::{mpsc as std_mpsc, Arc, Mutex};
use std::thread;
use std::time::Duration;

use async_trait::async_trait;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use tokio::sync::{mpsc::UnboundedSender, oneshot};

use crate::error::PlaybackError;

use super::{AudioOutput, PlayerEvent};

const END_POLL_INTERVAL: Duration = Duration::from_millis(200);

enum AudioCommand {
    Load { track_id: String, path: PathBuf },
    Play {
        track_id: String,
        generation: u64,
        reply: oneshot::Sender<Result<(), PlaybackError>>,
    },
    Pause,
    Stop,
    SetVolume(f32),
}

/// Plays local preview files through the default output device.
///
/// Audio objects are not `Send`, so they live on a dedicated thread that is
/// driven by `AudioCommand`s. Remote previews need a streaming backend and are
/// reported as unavailable.
pub struct RodioOutput {
    tx: Arc<Mutex<Option<std_mpsc::Sender<AudioCommand>>>>,
    events: UnboundedSender<PlayerEvent>,
}

struct Loaded {
    track_id: String,
    generation: u64,
    sink: Sink,
    paused: bool,
}

impl RodioOutput {
    pub fn new(events: UnboundedSender<PlayerEvent>) -> Self {
        Self {
            tx: Arc::new(Mutex::new(None)),
            events,
        }
    }

    fn ensure_thread(&self) -> Result<std_mpsc::Sender<AudioCommand>, PlaybackError> {
        let unavailable = |e: String| PlaybackError::SourceUnavailable(e);
        let mut guard = self.tx.lock().map_err(|e| unavailable(e.to_string()))?;
        if let Some(tx) = guard.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = std_mpsc::channel::<AudioCommand>();
        let events = self.events.clone();

        thread::Builder::new()
            .name("preview-audio".to_string())
            .spawn(move || audio_thread(rx, events))
            .map_err(|e| unavailable(e.to_string()))?;

        *guard = Some(tx.clone());
        Ok(tx)
    }

    fn send(&self, cmd: AudioCommand) -> Result<(), PlaybackError> {
        let tx = self.ensure_thread()?;
        tx.send(cmd)
            .map_err(|e| PlaybackError::SourceUnavailable(e.to_string()))
    }
}

fn local_path(uri: &str) -> Option<PathBuf> {
    if uri.starts_with("http://") || uri.starts_with("https://") {
        return None;
    }
    Some(PathBuf::from(uri.strip_prefix("file://").unwrap_or(uri)))
}

fn audio_thread(rx: std_mpsc::Receiver<AudioCommand>, events: UnboundedSender<PlayerEvent>) {
    let mut stream: Option<(OutputStream, OutputStreamHandle)> = None;
    let mut current: Option<Loaded> = None;
    let mut load_error: Option<String> = None;
    let mut volume = 1.0f32;

    loop {
        let cmd = match rx.recv_timeout(END_POLL_INTERVAL) {
            Ok(cmd) => cmd,
            Err(std_mpsc::RecvTimeoutError::Timeout) => {
                let finished = current
                    .as_ref()
                    .map(|c| !c.paused && c.sink.empty())
                    .unwrap_or(false);
                if finished {
                    if let Some(done) = current.take() {
                        let _ = events.send(PlayerEvent::Ended {
                            track_id: done.track_id,
                            generation: done.generation,
                        });
                    }
                }
                continue;
            }
            Err(std_mpsc::RecvTimeoutError::Disconnected) => break,
        };

        match cmd {
            AudioCommand::Load { track_id, path } => {
                if let Some(old) = current.take() {
                    old.sink.stop();
                }
                load_error = None;
                match open_sink(&mut stream, &path) {
                    Ok(sink) => {
                        sink.set_volume(volume);
                        sink.pause();
                        current = Some(Loaded {
                            track_id,
                            generation: 0,
                            sink,
                            paused: true,
                        });
                    }
                    Err(err) => {
                        log::warn!("failed to load {}: {}", path.display(), err);
                        load_error = Some(err);
                    }
                }
            }
            AudioCommand::Play {
                track_id,
                generation,
                reply,
            } => {
                let result = match current.as_mut() {
                    Some(loaded) if loaded.track_id == track_id => {
                        loaded.generation = generation;
                        loaded.sink.play();
                        loaded.paused = false;
                        Ok(())
                    }
                    _ => Err(PlaybackError::SourceUnavailable(
                        load_error
                            .clone()
                            .unwrap_or_else(|| format!("{track_id} is not loaded")),
                    )),
                };
                let _ = reply.send(result);
            }
            AudioCommand::Pause => {
                if let Some(loaded) = current.as_mut() {
                    loaded.sink.pause();
                    loaded.paused = true;
                }
            }
            AudioCommand::Stop => {
                if let Some(old) = current.take() {
                    old.sink.stop();
                }
                load_error = None;
            }
            AudioCommand::SetVolume(v) => {
                volume = v.clamp(0.0, 1.0);
                if let Some(loaded) = current.as_ref() {
                    loaded.sink.set_volume(volume);
                }
            }
        }
    }
}

fn open_sink(
    stream: &mut Option<(OutputStream, OutputStreamHandle)>,
    path: &PathBuf,
) -> Result<Sink, String> {
    let file = File::open(path).map_err(|e| format!("Failed to open preview: {}", e))?;
    let source =
        Decoder::new(BufReader::new(file)).map_err(|e| format!("Failed to decode preview: {}", e))?;

    if stream.is_none() {
        let opened = OutputStream::try_default()
            .map_err(|e| format!("Failed to create audio output stream: {}", e))?;
        *stream = Some(opened);
    }
    let handle = match stream.as_ref() {
        Some((_, handle)) => handle,
        None => return Err("audio output stream missing".to_string()),
    };
    let sink = Sink::try_new(handle).map_err(|e| format!("Failed to create audio sink: {}", e))?;
    sink.append(source);
    Ok(sink)
}

#[async_trait]
impl AudioOutput for RodioOutput {
    fn load(&self, track_id: &str, uri: &str) -> Result<(), PlaybackError> {
        let path = local_path(uri).ok_or_else(|| {
            PlaybackError::SourceUnavailable(format!("remote preview {uri} cannot be streamed"))
        })?;
        self.send(AudioCommand::Load {
            track_id: track_id.to_string(),
            path,
        })
    }

    async fn play(&self, track_id: &str, generation: u64) -> Result<(), PlaybackError> {
        let (reply, rx) = oneshot::channel();
        self.send(AudioCommand::Play {
            track_id: track_id.to_string(),
            generation,
            reply,
        })?;
        rx.await
            .map_err(|_| PlaybackError::SourceUnavailable("audio thread stopped".into()))?
    }

    fn pause(&self) {
        let _ = self.send(AudioCommand::Pause);
    }

    fn stop(&self) {
        if let Ok(Some(tx)) = self.tx.lock().map(|g| g.clone()) {
            let _ = tx.send(AudioCommand::Stop);
        }
    }

    fn set_volume(&self, volume: f32) {
        let _ = self.send(AudioCommand::SetVolume(volume));
    }
}
