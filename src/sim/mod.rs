//! Deterministic simulation module
//!
//! All gameplay logic lives here. This module must be pure and deterministic:
//! - Fixed timestep only, time measured in ticks
//! - Timers run on the tick scheduler, never a wall clock
//! - Side effects leave as [`GameEvent`]s for the driver to perform
//! - No rendering, audio or storage dependencies

pub mod geometry;
pub mod hazards;
pub mod lifecycle;
pub mod physics;
pub mod scheduler;
pub mod state;
pub mod tick;
pub mod transition;

pub use geometry::Rect;
pub use hazards::{Effect, HazardRule, HazardState, Trigger, default_rules};
pub use lifecycle::{Command, apply_command};
pub use scheduler::{Scheduler, TimerAction};
pub use state::{DeathCause, GameEvent, GameState, Goal, LifeState, Platform, Player, Trap};
pub use tick::{TickInput, tick};
pub use transition::Transition;
