//! Level descriptors and loading
//!
//! A level arrives as loosely-shaped JSON. It is parsed into a raw form where
//! every section is optional, then validated into a [`LevelDescriptor`] whose
//! required sections are guaranteed present. The simulation only ever sees
//! validated descriptors.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_PLAYER_SIZE, FINAL_LEVEL};
use crate::error::LevelError;
use crate::sim::geometry::Rect;
use crate::sim::hazards::HazardRule;

/// Horizontal direction for moving traps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Left,
    Right,
}

impl Direction {
    /// Signed unit step along x
    pub fn sign(self) -> f32 {
        match self {
            Direction::Left => -1.0,
            Direction::Right => 1.0,
        }
    }
}

/// Trap types understood by the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TrapKind {
    #[serde(rename = "spikes")]
    Spikes,
    #[serde(rename = "moving_spikes")]
    MovingSpikes,
    #[serde(rename = "moving_hole")]
    MovingHole,
    #[serde(rename = "movingDot")]
    MovingDot,
    /// Anything else: drawn, never lethal
    #[default]
    #[serde(rename = "generic", other)]
    Generic,
}

/// Movement parameters attached to a trap
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movement {
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub speed: f32,
    /// Horizontal player distance that activates the trap (0 = always)
    #[serde(default)]
    pub trigger_distance: f32,
    /// Reveal delay for traps that appear after the first move (ms)
    #[serde(default)]
    pub trigger_delay: Option<u64>,
}

/// Player spawn point and size
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSpawn {
    pub start_x: f32,
    pub start_y: f32,
    #[serde(default = "default_player_size")]
    pub width: f32,
    #[serde(default = "default_player_size")]
    pub height: f32,
    #[serde(default)]
    pub color: Option<String>,
}

fn default_player_size() -> f32 {
    DEFAULT_PLAYER_SIZE
}

/// Static platform as authored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformDef {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub disappearing: bool,
    /// Delay before a disappearing platform vanishes (ms)
    #[serde(default)]
    pub disappear_delay: Option<u64>,
}

impl PlatformDef {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Trap as authored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrapDef {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(rename = "type", default)]
    pub kind: TrapKind,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub movement: Option<Movement>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub appear_after_move: bool,
    /// movingDot activation flag
    #[serde(default)]
    pub moving: bool,
    /// movingDot direction (dots carry their motion on the trap itself)
    #[serde(default)]
    pub direction: Option<Direction>,
    /// movingDot speed (px/tick)
    #[serde(default)]
    pub speed: Option<f32>,
}

impl TrapDef {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

/// Goal door
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalDef {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub color: Option<String>,
}

impl GoalDef {
    pub fn rect(&self) -> Rect {
        Rect::new(self.x, self.y, self.width, self.height)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Background {
    #[serde(default)]
    pub color: Option<String>,
}

/// Raw JSON shape: every section optional so that missing sections are
/// reported as validation failures instead of opaque parse errors
#[derive(Debug, Deserialize)]
struct RawLevel {
    #[serde(default)]
    level: Option<u32>,
    player: Option<PlayerSpawn>,
    platforms: Option<Vec<PlatformDef>>,
    #[serde(default)]
    traps: Vec<TrapDef>,
    goal: Option<GoalDef>,
    #[serde(default)]
    background: Background,
    #[serde(default)]
    hazards: Option<Vec<HazardRule>>,
}

/// A validated, immutable level description
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelDescriptor {
    pub player: PlayerSpawn,
    pub platforms: Vec<PlatformDef>,
    pub traps: Vec<TrapDef>,
    pub goal: GoalDef,
    pub background: Background,
    /// Explicit hazard rules; `None` means the built-in table for the level
    pub hazards: Option<Vec<HazardRule>>,
}

impl LevelDescriptor {
    /// Parse and validate a descriptor for `level` from JSON text
    pub fn from_json(level: u32, json: &str) -> Result<Self, LevelError> {
        check_range(level)?;
        let raw: RawLevel =
            serde_json::from_str(json).map_err(|source| LevelError::Parse { level, source })?;
        Self::validate(level, raw)
    }

    fn validate(level: u32, raw: RawLevel) -> Result<Self, LevelError> {
        if let Some(declared) = raw.level {
            if declared != level {
                log::warn!("Level file for {} declares itself as level {}", level, declared);
            }
        }

        let player = raw
            .player
            .ok_or_else(|| LevelError::invalid(level, "missing player spawn"))?;
        let platforms = raw
            .platforms
            .ok_or_else(|| LevelError::invalid(level, "missing platforms"))?;
        if platforms.is_empty() {
            return Err(LevelError::invalid(level, "no platforms"));
        }
        let goal = raw
            .goal
            .ok_or_else(|| LevelError::invalid(level, "missing goal"))?;

        check_finite(level, "player spawn", &[player.start_x, player.start_y])?;
        check_size(level, "player", player.width, player.height)?;
        check_rect(level, "goal", &goal.rect())?;
        for (i, p) in platforms.iter().enumerate() {
            check_rect(level, &format!("platform {}", i), &p.rect())?;
        }
        for (i, t) in raw.traps.iter().enumerate() {
            check_rect(level, &format!("trap {}", i), &t.rect())?;
        }

        Ok(Self {
            player,
            platforms,
            traps: raw.traps,
            goal,
            background: raw.background,
            hazards: raw.hazards,
        })
    }
}

fn check_range(level: u32) -> Result<(), LevelError> {
    if (1..=FINAL_LEVEL).contains(&level) {
        Ok(())
    } else {
        Err(LevelError::OutOfRange(level))
    }
}

fn check_finite(level: u32, what: &str, values: &[f32]) -> Result<(), LevelError> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(LevelError::invalid(level, format!("{} has non-finite coordinates", what)))
    }
}

fn check_size(level: u32, what: &str, width: f32, height: f32) -> Result<(), LevelError> {
    check_finite(level, what, &[width, height])?;
    if width > 0.0 && height > 0.0 {
        Ok(())
    } else {
        Err(LevelError::invalid(level, format!("{} has non-positive size", what)))
    }
}

fn check_rect(level: u32, what: &str, rect: &Rect) -> Result<(), LevelError> {
    check_finite(level, what, &[rect.x, rect.y])?;
    check_size(level, what, rect.width, rect.height)
}

/// Where level descriptors come from
pub trait LevelSource {
    /// Fetch and validate the descriptor for `level` (1-based)
    fn fetch(&self, level: u32) -> Result<LevelDescriptor, LevelError>;
}

/// Reads `level{N}.json` files from a directory
#[derive(Debug, Clone)]
pub struct DirectoryLevels {
    root: PathBuf,
}

impl DirectoryLevels {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path_for(&self, level: u32) -> PathBuf {
        self.root.join(format!("level{}.json", level))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl LevelSource for DirectoryLevels {
    fn fetch(&self, level: u32) -> Result<LevelDescriptor, LevelError> {
        check_range(level)?;
        let path = self.path_for(level);
        let json = std::fs::read_to_string(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                LevelError::NotFound { level }
            } else {
                LevelError::Io { path, source }
            }
        })?;
        LevelDescriptor::from_json(level, &json)
    }
}

/// The ten shipped levels, compiled into the binary
#[derive(Debug, Clone, Copy, Default)]
pub struct BundledLevels;

const BUNDLED: [&str; FINAL_LEVEL as usize] = [
    include_str!("../levels/level1.json"),
    include_str!("../levels/level2.json"),
    include_str!("../levels/level3.json"),
    include_str!("../levels/level4.json"),
    include_str!("../levels/level5.json"),
    include_str!("../levels/level6.json"),
    include_str!("../levels/level7.json"),
    include_str!("../levels/level8.json"),
    include_str!("../levels/level9.json"),
    include_str!("../levels/level10.json"),
];

impl LevelSource for BundledLevels {
    fn fetch(&self, level: u32) -> Result<LevelDescriptor, LevelError> {
        check_range(level)?;
        let json = BUNDLED
            .get(level as usize - 1)
            .ok_or(LevelError::NotFound { level })?;
        LevelDescriptor::from_json(level, json)
    }
}
