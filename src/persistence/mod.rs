//! Unlocked-level progress
//!
//! Progress is a single integer: the highest level the player may start.
//! Persistence is best-effort. Reads that fail or return garbage fall back
//! to level 1, and failed writes are logged and otherwise ignored by the
//! driver.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::consts::FINAL_LEVEL;
use crate::error::StorageError;

/// LocalStorage key for the unlocked level
pub const STORAGE_KEY: &str = "trustIssuesLevel";

/// Clamp a stored value into the playable range
pub fn clamp_level(level: u32) -> u32 {
    level.clamp(1, FINAL_LEVEL)
}

/// Where the unlocked level lives
pub trait ProgressStore {
    /// Highest unlocked level in 1..=10. Absent or unreadable progress is 1.
    fn load(&self) -> u32;

    fn save(&mut self, level: u32) -> Result<(), StorageError>;
}

/// In-process progress (tests, `--progress` omitted)
#[derive(Debug, Clone, Default)]
pub struct MemoryProgress {
    level: Option<u32>,
}

impl MemoryProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(level: u32) -> Self {
        Self { level: Some(level) }
    }
}

impl ProgressStore for MemoryProgress {
    fn load(&self) -> u32 {
        self.level.map(clamp_level).unwrap_or(1)
    }

    fn save(&mut self, level: u32) -> Result<(), StorageError> {
        self.level = Some(level);
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct ProgressFile {
    level: u32,
}

/// JSON file on disk
#[derive(Debug, Clone)]
pub struct FileProgress {
    path: PathBuf,
}

impl FileProgress {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Option<u32>, StorageError> {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(StorageError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };
        let file: ProgressFile = serde_json::from_str(&json)?;
        Ok(Some(file.level))
    }
}

impl ProgressStore for FileProgress {
    fn load(&self) -> u32 {
        match self.read() {
            Ok(level) => level.map(clamp_level).unwrap_or(1),
            Err(e) => {
                log::warn!("Ignoring unreadable progress: {}", e);
                1
            }
        }
    }

    fn save(&mut self, level: u32) -> Result<(), StorageError> {
        let json = serde_json::to_string(&ProgressFile { level })?;
        std::fs::write(&self.path, json).map_err(|source| StorageError::Io {
            path: self.path.clone(),
            source,
        })?;
        log::info!("Saved progress: level {} unlocked", level);
        Ok(())
    }
}

/// Browser LocalStorage under [`STORAGE_KEY`], stored as a bare integer
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default)]
pub struct LocalStorageProgress;

#[cfg(target_arch = "wasm32")]
impl ProgressStore for LocalStorageProgress {
    fn load(&self) -> u32 {
        crate::platform::local_storage()
            .and_then(|storage| storage.get_item(STORAGE_KEY).ok().flatten())
            .and_then(|value| value.trim().parse::<u32>().ok())
            .map(clamp_level)
            .unwrap_or(1)
    }

    fn save(&mut self, level: u32) -> Result<(), StorageError> {
        let storage = crate::platform::local_storage().ok_or(StorageError::Unavailable)?;
        storage
            .set_item(STORAGE_KEY, &level.to_string())
            .map_err(|_| StorageError::Unavailable)?;
        log::info!("Saved progress: level {} unlocked", level);
        Ok(())
    }
}
