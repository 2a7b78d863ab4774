//! Trust Issues - a platformer where the level itself is out to get you
//!
//! Core modules:
//! - `sim`: Deterministic simulation (physics, hazards, life cycle, transitions)
//! - `level`: Level descriptors, validation and loading
//! - `game`: Driver that connects the simulation to its collaborators
//! - `renderer`: Per-frame snapshot handed to an external renderer
//! - `audio`: Sound cues and sinks
//! - `persistence`: Unlocked-level progress
//! - `platform`: Browser/native bootstrap

pub mod audio;
pub mod error;
pub mod game;
pub mod level;
pub mod persistence;
pub mod platform;
pub mod renderer;
pub mod settings;
pub mod sim;

pub use error::{GameError, LevelError, StorageError};
pub use game::Game;
pub use settings::Settings;

/// Game configuration constants
pub mod consts {
    /// Simulation rate (ticks per second)
    pub const TICK_RATE: u32 = 60;
    /// Fixed simulation timestep in seconds
    pub const SIM_DT: f32 = 1.0 / TICK_RATE as f32;
    /// Maximum substeps per frame to prevent spiral of death
    pub const MAX_SUBSTEPS: u32 = 8;

    /// Playfield dimensions
    pub const CANVAS_WIDTH: f32 = 910.0;
    pub const CANVAS_HEIGHT: f32 = 550.0;

    /// Player kinematics (pixels per tick)
    pub const GRAVITY: f32 = 0.5;
    pub const MOVE_SPEED: f32 = 3.0;
    pub const JUMP_VELOCITY: f32 = -10.0;
    pub const DEFAULT_PLAYER_SIZE: f32 = 30.0;

    /// Lives per run
    pub const MAX_LIVES: u8 = 5;
    /// Levels are numbered 1..=FINAL_LEVEL
    pub const FINAL_LEVEL: u32 = 10;

    /// Death animation length before the restart prompt (~1s)
    pub const EXPLOSION_TICKS: u32 = 60;
    /// How long the fall-out notice stays up
    pub const FALL_OUT_POPUP_TICKS: u32 = 60;
    /// Control lock after a respawn
    pub const RESPAWN_LOCK_MS: u64 = 1000;

    /// Goal door closing animation
    pub const DOOR_CLOSE_MS: u64 = 1000;
    /// Pause after the door shuts and after the elevator ride
    pub const POST_ANIMATION_DELAY_MS: u64 = 300;
    /// Elevator transition scroll speed (pixels per tick)
    pub const ELEVATOR_SPEED: f32 = 20.0;
    /// Number of colored layers the elevator passes
    pub const ELEVATOR_LAYERS: u32 = 3;
}

/// Convert a wall-clock delay to a whole number of simulation ticks (rounded
/// up). Absurd delays saturate instead of overflowing.
#[inline]
pub fn ms_to_ticks(ms: u64) -> u64 {
    ms.saturating_mul(consts::TICK_RATE as u64).div_ceil(1000)
}

/// Convert elapsed ticks to whole seconds for display
#[inline]
pub fn ticks_to_seconds(ticks: u64) -> u64 {
    ticks / consts::TICK_RATE as u64
}
