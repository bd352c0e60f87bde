pub mod acquisition;
pub mod console;
pub mod error;
pub mod inference;
pub mod models;
pub mod playback;
pub mod recommendations;
pub mod session;
pub mod settings;
mod utils;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::Context;
use tokio::{sync::mpsc, task::JoinHandle};

use acquisition::{CameraDevice, SyntheticCamera};
use inference::{InferenceClient, SimulatedInference};
use playback::{AudioOutput, LinkOpener, PlaybackController, PlayerEvent, SystemOpener};
use recommendations::RecommendationIndex;
use session::{SessionConfig, SessionController};
use settings::{AppSettings, SettingsStore};

const DATA_DIR_ENV: &str = "MOODTUNES_DATA_DIR";
const DEFAULT_DATA_DIR: &str = ".moodtunes";

pub struct AppState {
    pub session: SessionController,
    pub settings: SettingsStore,
    player_listener: JoinHandle<()>,
}

impl AppState {
    /// Wires the session from the settings in `data_dir`. Must run inside a
    /// tokio runtime.
    pub fn build(data_dir: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data dir {}", data_dir.display()))?;

        let settings_store = SettingsStore::new(data_dir.join("settings.json"))?;
        let settings = settings_store.current();

        let recommendations = match &settings.recommendations_path {
            Some(path) => RecommendationIndex::from_json_file(path)?,
            None => RecommendationIndex::reference(),
        };

        let (player_tx, player_rx) = mpsc::unbounded_channel();
        let playback = PlaybackController::new(audio_output(&settings, player_tx), Arc::new(SystemOpener));
        playback.set_volume(settings.playback.volume);
        let player_listener = playback.listen(player_rx);

        let camera: Arc<dyn CameraDevice> = Arc::new(SyntheticCamera::default());
        let inference: Arc<dyn InferenceClient> = Arc::new(SimulatedInference::new(
            settings.inference.latency(),
            settings.inference.min_confidence,
            settings.inference.seed,
        ));

        let session = SessionController::new(
            camera,
            inference,
            Arc::new(recommendations),
            playback,
            SessionConfig {
                inference_timeout: settings.inference.timeout(),
                reload_settle: Duration::from_millis(settings.camera.reload_settle_ms),
            },
        );

        Ok(Self {
            session,
            settings: settings_store,
            player_listener,
        })
    }

    pub async fn shutdown(self) {
        self.session.shutdown().await;
        self.player_listener.abort();
    }
}

#[cfg(feature = "audio-output")]
fn audio_output(_settings: &AppSettings, events: mpsc::UnboundedSender<PlayerEvent>) -> Arc<dyn AudioOutput> {
    Arc::new(playback::RodioOutput::new(events))
}

#[cfg(not(feature = "audio-output"))]
fn audio_output(settings: &AppSettings, events: mpsc::UnboundedSender<PlayerEvent>) -> Arc<dyn AudioOutput> {
    Arc::new(playback::SimulatedOutput::new(
        Duration::from_secs(settings.playback.preview_secs),
        events,
    ))
}

pub fn data_dir() -> PathBuf {
    std::env::var_os(DATA_DIR_ENV)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR))
}

fn debug_mode() -> bool {
    std::env::var("MOODTUNES_DEBUG")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

pub fn run() -> anyhow::Result<()> {
    // Initialize logging (reads RUST_LOG env var)
    let level = if debug_mode() {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();

    log::info!("MoodTunes starting up...");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(async {
        let state = AppState::build(&data_dir())?;
        let result = console::run_console(
            &state,
            tokio::io::BufReader::new(tokio::io::stdin()),
            tokio::io::stdout(),
        )
        .await;
        state.shutdown().await;
        result
    })
}
