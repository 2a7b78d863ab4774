//! Game settings and preferences
//!
//! Persisted separately from progress: LocalStorage in the browser, a JSON
//! file natively.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::MAX_SUBSTEPS;
use crate::error::StorageError;

/// Game settings/preferences
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Play sound cues
    pub sound_enabled: bool,
    /// Play the door and elevator animations between levels
    pub animate_transitions: bool,
    /// Cap on simulation ticks per rendered frame
    pub max_substeps: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            sound_enabled: true,
            animate_transitions: true,
            max_substeps: MAX_SUBSTEPS,
        }
    }
}

impl Settings {
    /// LocalStorage key
    const STORAGE_KEY: &'static str = "trustIssuesSettings";

    /// Read settings from a JSON file. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, StorageError> {
        let json = match std::fs::read_to_string(path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("No settings at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(StorageError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let settings: Self = serde_json::from_str(&json)?;
        log::info!("Loaded settings from {}", path.display());
        Ok(settings.sanitized())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json).map_err(|source| StorageError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("Settings saved to {}", path.display());
        Ok(())
    }

    /// At least one tick per frame
    fn sanitized(mut self) -> Self {
        self.max_substeps = self.max_substeps.max(1);
        self
    }

    /// Load settings from LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn load() -> Self {
        let stored = crate::platform::local_storage()
            .and_then(|storage| storage.get_item(Self::STORAGE_KEY).ok().flatten());

        if let Some(json) = stored {
            match serde_json::from_str::<Self>(&json) {
                Ok(settings) => {
                    log::info!("Loaded settings from LocalStorage");
                    return settings.sanitized();
                }
                Err(e) => log::warn!("Ignoring stored settings: {}", e),
            }
        }

        log::info!("Using default settings");
        Self::default()
    }

    /// Save settings to LocalStorage (WASM only)
    #[cfg(target_arch = "wasm32")]
    pub fn save(&self) -> Result<(), StorageError> {
        let storage = crate::platform::local_storage().ok_or(StorageError::Unavailable)?;
        let json = serde_json::to_string(self)?;
        storage
            .set_item(Self::STORAGE_KEY, &json)
            .map_err(|_| StorageError::Unavailable)?;
        log::info!("Settings saved");
        Ok(())
    }
}
