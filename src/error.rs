//! Error types
//!
//! Level loading is the only failure that can stop the simulation. Storage
//! errors are best-effort: callers log them and fall back to defaults.

use std::path::PathBuf;

use thiserror::Error;

/// Failure to fetch, parse or validate a level descriptor
#[derive(Debug, Error)]
pub enum LevelError {
    #[error("level {0} is out of range (levels are 1..={max})", max = crate::consts::FINAL_LEVEL)]
    OutOfRange(u32),
    #[error("level {level} is not available from this source")]
    NotFound { level: u32 },
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("level {level} is not valid JSON: {source}")]
    Parse {
        level: u32,
        #[source]
        source: serde_json::Error,
    },
    #[error("level {level} is invalid: {reason}")]
    Invalid { level: u32, reason: String },
}

impl LevelError {
    pub(crate) fn invalid(level: u32, reason: impl Into<String>) -> Self {
        LevelError::Invalid {
            level,
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by the game driver
#[derive(Debug, Error)]
pub enum GameError {
    #[error(transparent)]
    Level(#[from] LevelError),
    #[error("level {level} is locked (highest unlocked is {unlocked})")]
    Locked { level: u32, unlocked: u32 },
    #[error("no level has been started")]
    NotStarted,
}

/// Settings/progress persistence failures
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O failed for {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("stored value is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("browser storage is unavailable")]
    Unavailable,
}
