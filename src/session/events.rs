use serde::Serialize;

use crate::models::DetectionResult;

use super::state::SessionState;

/// Notifications published to the host on the session's broadcast channel.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SessionEvent {
    #[serde(rename_all = "camelCase")]
    StateChanged { state: SessionState },

    #[serde(rename_all = "camelCase")]
    EmotionDetected {
        result: DetectionResult,
        summary: String,
    },

    /// Analysis finished without a result; the host should offer a retry.
    #[serde(rename_all = "camelCase")]
    AnalysisFailed { message: String, reason: String },

    #[serde(rename_all = "camelCase")]
    AcquisitionFailed { message: String, reason: String },
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::StateChanged { .. } => "session-state-changed",
            SessionEvent::EmotionDetected { .. } => "emotion-detected",
            SessionEvent::AnalysisFailed { .. } => "analysis-failed",
            SessionEvent::AcquisitionFailed { .. } => "acquisition-failed",
        }
    }
}
