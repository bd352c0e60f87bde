use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::PathBuf,
    sync::{RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::Duration,
};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct InferenceSettings {
    pub latency_ms: u64,
    pub timeout_ms: u64,
    pub min_confidence: f32,
    /// Fixed RNG seed for the simulated labeler; random when absent.
    pub seed: Option<u64>,
}

impl Default for InferenceSettings {
    fn default() -> Self {
        Self {
            latency_ms: 2000,
            timeout_ms: 10_000,
            min_confidence: 0.7,
            seed: None,
        }
    }
}

impl InferenceSettings {
    pub fn latency(&self) -> Duration {
        Duration::from_millis(self.latency_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct CameraSettings {
    pub reload_settle_ms: u64,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            reload_settle_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct PlaybackSettings {
    pub volume: f32,
    pub preview_secs: u64,
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            volume: 1.0,
            preview_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AppSettings {
    pub inference: InferenceSettings,
    pub camera: CameraSettings,
    pub playback: PlaybackSettings,
    /// JSON recommendation table replacing the built-in catalog.
    pub recommendations_path: Option<PathBuf>,
}

pub struct SettingsStore {
    path: PathBuf,
    data: RwLock<AppSettings>,
}

impl SettingsStore {
    pub fn new(path: PathBuf) -> Result<Self> {
        let data = if path.exists() {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read settings from {}", path.display()))?;
            serde_json::from_str(&contents).unwrap_or_else(|err| {
                log::warn!(
                    "Ignoring unreadable settings in {}: {}",
                    path.display(),
                    err
                );
                AppSettings::default()
            })
        } else {
            AppSettings::default()
        };

        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    pub fn current(&self) -> AppSettings {
        self.read().clone()
    }

    /// Applies `change` and writes the result to disk.
    pub fn update<F>(&self, change: F) -> Result<AppSettings>
    where
        F: FnOnce(&mut AppSettings),
    {
        let mut guard = self.write();
        change(&mut guard);
        self.persist(&guard)?;
        Ok(guard.clone())
    }

    pub fn reload(&self) -> Result<()> {
        let contents = fs::read_to_string(&self.path)?;
        let data: AppSettings = serde_json::from_str(&contents)
            .map_err(|err| anyhow!("invalid settings in {}: {}", self.path.display(), err))?;
        *self.write() = data;
        Ok(())
    }

    fn persist(&self, data: &AppSettings) -> Result<()> {
        let serialized = serde_json::to_string_pretty(data)?;
        fs::write(&self.path, serialized)
            .with_context(|| format!("Failed to write settings to {}", self.path.display()))
    }

    // A panic while holding the lock cannot leave AppSettings half-written,
    // so a poisoned lock still holds usable data.
    fn read(&self) -> RwLockReadGuard<'_, AppSettings> {
        self.data.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, AppSettings> {
        self.data.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json")).unwrap();
        let settings = store.current();
        assert_eq!(settings.inference.latency_ms, 2000);
        assert_eq!(settings.inference.timeout_ms, 10_000);
        assert_eq!(settings.camera.reload_settle_ms, 100);
        assert!(settings.recommendations_path.is_none());
    }

    #[test]
    fn test_update_persists_and_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let store = SettingsStore::new(path.clone()).unwrap();
        store.update(|s| s.playback.volume = 0.25).unwrap();

        let reopened = SettingsStore::new(path).unwrap();
        assert_eq!(reopened.current().playback.volume, 0.25);
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, r#"{ "inference": { "seed": 42 } }"#).unwrap();

        let settings = SettingsStore::new(path).unwrap().current();
        assert_eq!(settings.inference.seed, Some(42));
        assert_eq!(settings.inference.min_confidence, 0.7);
        assert_eq!(settings.playback.preview_secs, 30);
    }

    #[test]
    fn test_corrupt_file_falls_back_but_reload_reports() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "not json").unwrap();

        let store = SettingsStore::new(path).unwrap();
        assert_eq!(store.current(), AppSettings::default());
        assert!(store.reload().is_err());
    }
}
