//! Mood → ordered track list lookup.
//!
//! `lookup` is total: unknown or absent moods resolve to the neutral list,
//! which construction guarantees is present and non-empty.

pub mod catalog;

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::RecommendationError;
use crate::models::{Mood, Track};

#[derive(Debug, Clone)]
pub struct RecommendationIndex {
    lists: HashMap<Mood, Vec<Track>>,
}

/// On-disk form of an override table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationTable {
    pub moods: HashMap<String, Vec<Track>>,
}

impl RecommendationIndex {
    pub fn new<I>(entries: I) -> Result<Self, RecommendationError>
    where
        I: IntoIterator<Item = (Mood, Vec<Track>)>,
    {
        let mut lists = HashMap::new();
        for (mood, tracks) in entries {
            let mut seen = HashSet::new();
            for track in &tracks {
                if !seen.insert(track.id.as_str()) {
                    return Err(RecommendationError::DuplicateTrackId {
                        mood: mood.to_string(),
                        track_id: track.id.clone(),
                    });
                }
            }
            if !tracks.is_empty() {
                lists.insert(mood, tracks);
            }
        }

        if !lists.contains_key(&Mood::Neutral) {
            return Err(RecommendationError::MissingNeutral);
        }

        Ok(Self { lists })
    }

    /// Index over the built-in reference catalog.
    pub fn reference() -> Self {
        Self {
            lists: catalog::reference_table().into_iter().collect(),
        }
    }

    /// Loads a JSON table. Keys are mood labels; unknown keys are skipped.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read recommendations from {}", path.display()))?;
        let table: RecommendationTable = serde_json::from_str(&contents)
            .with_context(|| format!("Invalid recommendation table in {}", path.display()))?;

        let mut entries = Vec::new();
        for (label, tracks) in table.moods {
            match Mood::parse(&label) {
                Some(mood) => entries.push((mood, tracks)),
                None => log::warn!("skipping recommendations for unknown mood '{}'", label),
            }
        }
        Ok(Self::new(entries)?)
    }

    pub fn lookup(&self, mood: Option<Mood>) -> &[Track] {
        mood.and_then(|m| self.lists.get(&m))
            .or_else(|| self.lists.get(&Mood::Neutral))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn lookup_label(&self, label: &str) -> &[Track] {
        self.lookup(Mood::parse(label))
    }

    /// Resolves a track id within the list shown for `mood`.
    pub fn find(&self, mood: Option<Mood>, track_id: &str) -> Option<&Track> {
        self.lookup(mood).iter().find(|track| track.id == track_id)
    }
}

impl Default for RecommendationIndex {
    fn default() -> Self {
        Self::reference()
    }
}
