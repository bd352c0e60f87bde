use serde::{Deserialize, Serialize};

/// A recommended song. `id` must be unique within the list it belongs to;
/// playback identity is keyed on it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Track {
    pub id: String,
    pub title: String,
    pub artist: String,
    pub genre: String,
    pub year: String,
    pub duration_label: String,
    #[serde(default)]
    pub preview_uri: Option<String>,
    pub external_uri: String,
}

impl Track {
    pub fn has_preview(&self) -> bool {
        self.preview_uri
            .as_deref()
            .map(|uri| !uri.trim().is_empty())
            .unwrap_or(false)
    }
}
