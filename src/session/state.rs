//! Pure session state machine.
//!
//! `transition` takes the current state and an input and returns the next
//! state plus the effects the controller must run. It never touches devices,
//! clocks or channels, so every rule here is testable without a runtime.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::acquisition::AcquisitionMode;
use crate::error::{AcquisitionError, AnalysisError, Rejection};
use crate::models::DetectionResult;

use super::events::SessionEvent;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum StreamStatus {
    /// Not in camera mode.
    #[default]
    NotApplicable,
    Starting,
    Live,
    /// In camera mode without a stream: start failed or the user turned it off.
    Inactive,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub enum SessionPhase {
    Idle,
    ModeSelected,
    Analyzing,
    Resulted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisSource {
    CameraFrame,
    Upload,
}

/// Identifies one analysis. `epoch` is the mode epoch it was started in; a
/// settlement whose epoch no longer matches is stale.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisTicket {
    pub id: u64,
    pub epoch: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub session_id: String,
    pub mode: AcquisitionMode,
    pub stream: StreamStatus,
    pub is_analyzing: bool,
    pub last_result: Option<DetectionResult>,
    /// User-visible message from the last failure, cleared on the next attempt.
    pub last_error: Option<String>,
    #[serde(skip)]
    pub in_flight: Option<AnalysisTicket>,
    /// Bumped on every mode change; stales outstanding analyses and stream opens.
    #[serde(skip)]
    pub epoch: u64,
    #[serde(skip)]
    tickets_issued: u64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            mode: AcquisitionMode::None,
            stream: StreamStatus::NotApplicable,
            is_analyzing: false,
            last_result: None,
            last_error: None,
            in_flight: None,
            epoch: 0,
            tickets_issued: 0,
        }
    }
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> SessionPhase {
        if !self.mode.is_active() {
            return SessionPhase::Idle;
        }
        let analyzing_here = self
            .in_flight
            .map(|ticket| ticket.epoch == self.epoch)
            .unwrap_or(false);
        if analyzing_here {
            SessionPhase::Analyzing
        } else if self.last_result.is_some() {
            SessionPhase::Resulted
        } else {
            SessionPhase::ModeSelected
        }
    }

    /// Same checks `BeginAnalysis` applies, without issuing a ticket.
    pub fn check_can_analyze(&self, source: AnalysisSource) -> Result<(), Rejection> {
        if self.is_analyzing {
            return Err(Rejection::AnalysisInFlight);
        }
        match (self.mode, source) {
            (AcquisitionMode::None, _) => Err(Rejection::NoActiveMode),
            (AcquisitionMode::Camera, AnalysisSource::CameraFrame) => {
                if self.stream == StreamStatus::Live {
                    Ok(())
                } else {
                    Err(Rejection::StreamNotLive)
                }
            }
            (AcquisitionMode::Upload, AnalysisSource::Upload) => Ok(()),
            _ => Err(Rejection::WrongMode),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionInput {
    SelectMode(AcquisitionMode),
    DeselectMode,
    RequestStream,
    ReleaseStream,
    ReloadStream,
    StreamOpened { epoch: u64 },
    StreamFailed { epoch: u64, error: AcquisitionError },
    /// The device dropped a live stream on its own.
    StreamClosed { epoch: u64 },
    BeginAnalysis { source: AnalysisSource },
    AnalysisSettled {
        ticket: AnalysisTicket,
        outcome: Result<DetectionResult, AnalysisError>,
    },
}

#[derive(Debug, Clone)]
pub enum Effect {
    StartCamera { epoch: u64 },
    ReloadCamera { epoch: u64 },
    StopCamera,
    RunInference { ticket: AnalysisTicket },
    StopPlayback,
    Emit(SessionEvent),
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub state: SessionState,
    pub effects: Vec<Effect>,
    pub changed: bool,
}

impl Transition {
    fn unchanged(state: &SessionState) -> Self {
        Self {
            state: state.clone(),
            effects: Vec::new(),
            changed: false,
        }
    }

    fn to(state: SessionState, effects: Vec<Effect>) -> Self {
        Self {
            state,
            effects,
            changed: true,
        }
    }
}

pub fn transition(state: &SessionState, input: SessionInput) -> Result<Transition, Rejection> {
    match input {
        SessionInput::SelectMode(AcquisitionMode::None) | SessionInput::DeselectMode => {
            Ok(enter_mode(state, AcquisitionMode::None))
        }
        SessionInput::SelectMode(mode) => Ok(enter_mode(state, mode)),

        SessionInput::RequestStream => {
            require_camera(state)?;
            if matches!(state.stream, StreamStatus::Live | StreamStatus::Starting) {
                return Ok(Transition::unchanged(state));
            }
            let mut next = state.clone();
            next.stream = StreamStatus::Starting;
            next.last_error = None;
            let epoch = next.epoch;
            Ok(Transition::to(next, vec![Effect::StartCamera { epoch }]))
        }

        SessionInput::ReleaseStream => {
            require_camera(state)?;
            let mut next = state.clone();
            next.stream = StreamStatus::Inactive;
            Ok(Transition::to(next, vec![Effect::StopCamera]))
        }

        SessionInput::ReloadStream => {
            require_camera(state)?;
            let mut next = state.clone();
            next.stream = StreamStatus::Starting;
            next.last_error = None;
            let epoch = next.epoch;
            Ok(Transition::to(next, vec![Effect::ReloadCamera { epoch }]))
        }

        SessionInput::StreamOpened { epoch } => {
            if epoch != state.epoch || state.mode != AcquisitionMode::Camera {
                return Ok(Transition::unchanged(state));
            }
            let mut next = state.clone();
            next.stream = StreamStatus::Live;
            Ok(Transition::to(next, Vec::new()))
        }

        SessionInput::StreamFailed { epoch, error } => {
            if epoch != state.epoch || state.mode != AcquisitionMode::Camera {
                return Ok(Transition::unchanged(state));
            }
            let mut next = state.clone();
            let message = error.user_message();
            next.stream = StreamStatus::Inactive;
            next.last_error = Some(message.clone());
            Ok(Transition::to(
                next,
                vec![Effect::Emit(SessionEvent::AcquisitionFailed {
                    message,
                    reason: error.to_string(),
                })],
            ))
        }

        SessionInput::StreamClosed { epoch } => {
            if epoch != state.epoch || state.stream != StreamStatus::Live {
                return Ok(Transition::unchanged(state));
            }
            let mut next = state.clone();
            next.stream = StreamStatus::Inactive;
            Ok(Transition::to(next, Vec::new()))
        }

        SessionInput::BeginAnalysis { source } => {
            state.check_can_analyze(source)?;
            let mut next = state.clone();
            next.tickets_issued += 1;
            let ticket = AnalysisTicket {
                id: next.tickets_issued,
                epoch: next.epoch,
            };
            next.in_flight = Some(ticket);
            next.is_analyzing = true;
            next.last_result = None;
            next.last_error = None;
            Ok(Transition::to(
                next,
                vec![Effect::StopPlayback, Effect::RunInference { ticket }],
            ))
        }

        SessionInput::AnalysisSettled { ticket, outcome } => {
            if state.in_flight != Some(ticket) {
                return Ok(Transition::unchanged(state));
            }
            let mut next = state.clone();
            next.in_flight = None;
            next.is_analyzing = false;

            if ticket.epoch != state.epoch {
                return Ok(Transition::to(next, Vec::new()));
            }

            let effects = match outcome {
                Ok(result) => {
                    let summary = result.summary();
                    next.last_result = Some(result.clone());
                    next.last_error = None;
                    vec![Effect::Emit(SessionEvent::EmotionDetected { result, summary })]
                }
                Err(err) => {
                    let message = err.user_message();
                    next.last_result = None;
                    next.last_error = Some(message.clone());
                    vec![Effect::Emit(SessionEvent::AnalysisFailed {
                        message,
                        reason: err.to_string(),
                    })]
                }
            };
            Ok(Transition::to(next, effects))
        }
    }
}

fn require_camera(state: &SessionState) -> Result<(), Rejection> {
    match state.mode {
        AcquisitionMode::Camera => Ok(()),
        AcquisitionMode::None => Err(Rejection::NoActiveMode),
        AcquisitionMode::Upload => Err(Rejection::WrongMode),
    }
}

/// Mode entry and exit. Camera teardown always precedes acquisition; the
/// in-flight analysis (if any) keeps running but is stale from here on.
fn enter_mode(state: &SessionState, mode: AcquisitionMode) -> Transition {
    let mut effects = Vec::new();
    if state.mode == AcquisitionMode::Camera {
        effects.push(Effect::StopCamera);
    }

    let mut next = state.clone();
    next.epoch += 1;
    next.mode = mode;
    next.last_result = None;
    next.last_error = None;
    next.stream = if mode == AcquisitionMode::Camera {
        StreamStatus::Starting
    } else {
        StreamStatus::NotApplicable
    };

    if mode == AcquisitionMode::Camera {
        effects.push(Effect::StartCamera { epoch: next.epoch });
    }
    effects.push(Effect::StopPlayback);

    Transition::to(next, effects)
}
