//! Labeling client seam.
//!
//! The session only depends on the contract: given an image, asynchronously
//! produce a label and a confidence, or fail. Labels are free-form strings and
//! may fall outside the known mood set.

pub mod simulated;

pub use simulated::SimulatedInference;

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::acquisition::ImagePayload;
use crate::error::InferenceError;
use crate::models::{DetectionResult, Mood};

/// Raw classifier output, before normalisation into a `DetectionResult`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Detection {
    pub label: String,
    pub confidence: f32,
}

#[async_trait]
pub trait InferenceClient: Send + Sync {
    /// Short identifier used in logs.
    fn name(&self) -> &str;

    /// Label the image. Never called concurrently for the same session.
    async fn infer(&self, image: &ImagePayload) -> Result<Detection, InferenceError>;
}

impl Detection {
    /// Normalises raw output: unknown labels become `Neutral`, confidence is
    /// clamped to `[0, 1]`, non-finite confidence is a failure.
    pub fn into_result(self) -> Result<DetectionResult, InferenceError> {
        if !self.confidence.is_finite() {
            return Err(InferenceError::Failed(format!(
                "non-finite confidence for label '{}'",
                self.label
            )));
        }
        let mood = match Mood::parse(&self.label) {
            Some(mood) => mood,
            None => {
                log::warn!("unknown mood label '{}', treating as neutral", self.label);
                Mood::Neutral
            }
        };
        Ok(DetectionResult::new(mood, self.confidence, Utc::now()))
    }
}
