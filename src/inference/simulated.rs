use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::acquisition::ImagePayload;
use crate::error::InferenceError;
use crate::models::Mood;

use super::{Detection, InferenceClient};

/// Placeholder classifier: waits a fixed latency, then returns a uniformly
/// random primary mood with confidence drawn from `[min_confidence, 1.0]`.
pub struct SimulatedInference {
    latency: Duration,
    min_confidence: f32,
    rng: Mutex<StdRng>,
}

impl SimulatedInference {
    pub fn new(latency: Duration, min_confidence: f32, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            latency,
            min_confidence: min_confidence.clamp(0.0, 1.0),
            rng: Mutex::new(rng),
        }
    }

    fn draw(&self) -> Result<Detection, InferenceError> {
        let mut rng = self
            .rng
            .lock()
            .map_err(|_| InferenceError::Failed("rng poisoned".into()))?;
        let mood = Mood::PRIMARY
            .choose(&mut *rng)
            .copied()
            .unwrap_or(Mood::Neutral);
        let confidence = if self.min_confidence >= 1.0 {
            1.0
        } else {
            rng.gen_range(self.min_confidence..=1.0)
        };
        Ok(Detection {
            label: mood.as_str().to_string(),
            confidence,
        })
    }
}

impl Default for SimulatedInference {
    fn default() -> Self {
        Self::new(Duration::from_millis(2000), 0.7, None)
    }
}

#[async_trait]
impl InferenceClient for SimulatedInference {
    fn name(&self) -> &str {
        "simulated"
    }

    async fn infer(&self, image: &ImagePayload) -> Result<Detection, InferenceError> {
        if image.is_empty() {
            return Err(InferenceError::Failed("empty image payload".into()));
        }
        tokio::time::sleep(self.latency).await;
        self.draw()
    }
}
