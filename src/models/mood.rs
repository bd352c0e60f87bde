//! Mood labels and detection results.
//!
//! - `Mood`: the closed label set shared by inference and recommendations
//! - `DetectionResult`: one finished analysis, replaced wholesale on the next one

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Mood {
    Happy,
    Sad,
    Angry,
    Surprised,
    Fear,
    Disgusted,
    Neutral,
}

impl Default for Mood {
    fn default() -> Self {
        Mood::Neutral
    }
}

impl Mood {
    pub const ALL: [Mood; 7] = [
        Mood::Happy,
        Mood::Sad,
        Mood::Angry,
        Mood::Surprised,
        Mood::Fear,
        Mood::Disgusted,
        Mood::Neutral,
    ];

    /// Moods the simulated classifier draws from. `Disgusted` is recognised
    /// but never produced by it.
    pub const PRIMARY: [Mood; 6] = [
        Mood::Happy,
        Mood::Sad,
        Mood::Angry,
        Mood::Surprised,
        Mood::Fear,
        Mood::Neutral,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Mood::Happy => "happy",
            Mood::Sad => "sad",
            Mood::Angry => "angry",
            Mood::Surprised => "surprised",
            Mood::Fear => "fear",
            Mood::Disgusted => "disgusted",
            Mood::Neutral => "neutral",
        }
    }

    pub fn glyph(&self) -> &'static str {
        match self {
            Mood::Happy => "😊",
            Mood::Sad => "😢",
            Mood::Angry => "😠",
            Mood::Surprised => "😲",
            Mood::Fear => "😨",
            Mood::Disgusted => "🤢",
            Mood::Neutral => "😐",
        }
    }

    /// Strict parse of a label; `None` for anything outside the known set.
    pub fn parse(label: &str) -> Option<Mood> {
        let normalized = label.trim().to_ascii_lowercase();
        Mood::ALL
            .iter()
            .copied()
            .find(|mood| mood.as_str() == normalized)
    }

    /// Lenient parse used at the recommendation boundary: unknown labels become `Neutral`.
    pub fn from_label(label: &str) -> Mood {
        Mood::parse(label).unwrap_or(Mood::Neutral)
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResult {
    pub mood: Mood,
    /// Always within `[0, 1]`.
    pub confidence: f32,
    pub glyph: String,
    pub detected_at: DateTime<Utc>,
}

impl DetectionResult {
    pub fn new(mood: Mood, confidence: f32, detected_at: DateTime<Utc>) -> Self {
        Self {
            mood,
            confidence: confidence.clamp(0.0, 1.0),
            glyph: mood.glyph().to_string(),
            detected_at,
        }
    }

    pub fn confidence_percent(&self) -> f32 {
        self.confidence * 100.0
    }

    /// Toast text shown when an analysis lands.
    pub fn summary(&self) -> String {
        format!(
            "We detected {} with {:.1}% confidence",
            self.mood,
            self.confidence_percent()
        )
    }
}
