pub mod mood;
pub mod track;

pub use mood::{DetectionResult, Mood};
pub use track::Track;
