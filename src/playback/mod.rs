//! Single-flight preview playback.
//!
//! One `AudioOutput` per session; `PlaybackController` is the only thing
//! allowed to start or stop it.

pub mod controller;
pub mod opener;
pub mod output;
#[cfg(feature = "audio-output")]
pub mod rodio_output;

pub use controller::{PlaybackController, PreviewAction};
pub use opener::{LinkOpener, SystemOpener};
pub use output::{AudioOutput, SimulatedOutput};
#[cfg(feature = "audio-output")]
pub use rodio_output::RodioOutput;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum PlaybackStatus {
    Idle,
    Loaded,
    Sounding,
}

/// `is_sounding` implies `active_track_id.is_some()`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub active_track_id: Option<String>,
    pub is_sounding: bool,
}

impl PlaybackState {
    pub fn status(&self) -> PlaybackStatus {
        match (&self.active_track_id, self.is_sounding) {
            (None, _) => PlaybackStatus::Idle,
            (Some(_), false) => PlaybackStatus::Loaded,
            (Some(_), true) => PlaybackStatus::Sounding,
        }
    }
}

/// Callbacks from the player backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    /// Natural completion; sent once per finished preview. `generation` is
    /// the one passed to the `play` call that started the sound.
    Ended { track_id: String, generation: u64 },
    Error { reason: String },
}

/// Notifications for the host.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PlaybackEvent {
    #[serde(rename_all = "camelCase")]
    StateChanged { state: PlaybackState },
    /// The preview could not be played; the host should offer `external_uri`.
    #[serde(rename_all = "camelCase")]
    PreviewUnavailable {
        track_id: String,
        external_uri: String,
        reason: String,
    },
    #[serde(rename_all = "camelCase")]
    ExternalOpened { track_id: String, uri: String },
}
