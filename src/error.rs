//! Error taxonomy for the session core.
//!
//! Acquisition and inference errors are recovered by the session controller
//! and shown to the user; playback errors stop at the playback controller and
//! degrade to the external-link fallback. Nothing here is fatal to the process.

use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AcquisitionError {
    #[error("camera permission denied")]
    PermissionDenied,

    #[error("camera unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("failed to read image: {0}")]
    ReadFailed(String),
}

impl AcquisitionError {
    /// Message surfaced to the user.
    pub fn user_message(&self) -> String {
        match self {
            AcquisitionError::PermissionDenied => {
                "Camera access denied. Please allow camera permissions.".to_string()
            }
            AcquisitionError::DeviceUnavailable(_) => {
                "No camera available. Check that a camera is connected and not in use.".to_string()
            }
            AcquisitionError::ReadFailed(_) => {
                "Could not read that image. Please try a different file.".to_string()
            }
        }
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InferenceError {
    #[error("inference failed: {0}")]
    Failed(String),

    #[error("inference timed out")]
    Timeout,
}

impl InferenceError {
    pub fn user_message(&self) -> String {
        "Failed to analyze emotion. Please try again.".to_string()
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("preview source unavailable: {0}")]
    SourceUnavailable(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RecommendationError {
    #[error("recommendation table has no neutral list")]
    MissingNeutral,

    #[error("duplicate track id {track_id} in {mood} list")]
    DuplicateTrackId { mood: String, track_id: String },
}

/// Why an analysis settled without a result.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),

    #[error(transparent)]
    Inference(#[from] InferenceError),
}

impl AnalysisError {
    pub fn user_message(&self) -> String {
        match self {
            AnalysisError::Acquisition(err) => err.user_message(),
            AnalysisError::Inference(err) => err.user_message(),
        }
    }
}

/// Why the session state machine refused an input.
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Rejection {
    #[error("an analysis is already in progress")]
    AnalysisInFlight,

    #[error("no acquisition mode selected")]
    NoActiveMode,

    #[error("operation not available in the current mode")]
    WrongMode,

    #[error("camera stream is not live")]
    StreamNotLive,
}

/// Errors returned by `SessionController` operations to the host.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Rejected(#[from] Rejection),

    #[error("unknown track: {0}")]
    UnknownTrack(String),

    #[error("session has been shut down")]
    ShutDown,
}

pub type SessionResult<T> = std::result::Result<T, SessionError>;
