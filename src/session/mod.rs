//! The session orchestrator: acquisition mode, single-flight analysis and
//! the playlist that follows a result.

pub mod commands;
pub mod controller;
pub mod events;
pub mod state;

pub use controller::{SessionConfig, SessionController, SessionSnapshot};
pub use events::SessionEvent;
pub use state::{AnalysisSource, SessionPhase, SessionState, StreamStatus};
