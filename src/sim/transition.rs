//! Level transition orchestration
//!
//! After the goal: the door closes over the player, the elevator carries
//! them up, then the driver is asked for the next level. The animations are
//! cosmetic; they only gate *when* the next level is requested, and can be
//! skipped entirely with `animate_transitions = false`.

use serde::{Deserialize, Serialize};

use super::state::{GameEvent, GameState};
use crate::audio::SoundCue;
use crate::consts::{
    CANVAS_HEIGHT, DOOR_CLOSE_MS, ELEVATOR_LAYERS, ELEVATOR_SPEED, FINAL_LEVEL,
    POST_ANIMATION_DELAY_MS,
};
use crate::ms_to_ticks;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Transition {
    /// Door panels sliding shut (ticks elapsed)
    DoorClosing { ticks: u64 },
    /// Short hold after the door shuts
    DoorClosed { ticks: u64 },
    /// Elevator ride plus its trailing delay
    InterLevelAnimating { ticks: u64 },
    /// Waiting for the driver to load `level`. `new_run` restores lives and
    /// the timer when it arrives.
    LevelLoading { level: u32, new_run: bool },
    /// Final level done; nothing advances until the player starts over
    GameComplete,
}

impl Transition {
    /// True while the session is waiting on the driver for a level
    pub fn is_loading(&self) -> bool {
        matches!(self, Transition::LevelLoading { .. })
    }

    /// Door closing progress in 0..=1 (1 once shut)
    pub fn door_progress(&self) -> Option<f32> {
        match *self {
            Transition::DoorClosing { ticks } => {
                Some((ticks as f32 / door_ticks() as f32).min(1.0))
            }
            Transition::DoorClosed { .. } => Some(1.0),
            _ => None,
        }
    }

    /// Elevator ride progress in 0..=1
    pub fn elevator_progress(&self) -> Option<f32> {
        match *self {
            Transition::InterLevelAnimating { ticks } => {
                Some((ticks as f32 / elevator_ride_ticks() as f32).min(1.0))
            }
            _ => None,
        }
    }
}

fn door_ticks() -> u64 {
    ms_to_ticks(DOOR_CLOSE_MS)
}

fn post_delay_ticks() -> u64 {
    ms_to_ticks(POST_ANIMATION_DELAY_MS)
}

/// Frames for the elevator to scroll from the bottom of the canvas until
/// the last layer has left the top
pub fn elevator_ride_ticks() -> u64 {
    let layer_height = CANVAS_HEIGHT / ELEVATOR_LAYERS as f32;
    ((CANVAS_HEIGHT + layer_height) / ELEVATOR_SPEED).ceil() as u64
}

/// Take over after the goal was reached
pub fn begin(state: &mut GameState) {
    if state.level >= FINAL_LEVEL {
        log::info!("Final level cleared, game complete");
        state.transition = Some(Transition::GameComplete);
        state.emit(GameEvent::Sound(SoundCue::Victory));
        state.emit(GameEvent::GameCompleted);
        return;
    }

    if state.animate_transitions {
        state.transition = Some(Transition::DoorClosing { ticks: 0 });
    } else {
        request_level(state, state.level + 1, false);
    }
}

/// Enter `LevelLoading` and ask the driver for a level
pub fn request_level(state: &mut GameState, level: u32, new_run: bool) {
    log::info!("Requesting level {}", level);
    state.transition = Some(Transition::LevelLoading { level, new_run });
    state.emit(GameEvent::LevelRequested { level });
}

/// One tick of the orchestrator
pub fn advance(state: &mut GameState) {
    let Some(current) = state.transition else {
        return;
    };

    let next = match current {
        Transition::DoorClosing { ticks } => {
            let ticks = ticks + 1;
            if ticks >= door_ticks() {
                state.emit(GameEvent::DoorClosed);
                Transition::DoorClosed { ticks: 0 }
            } else {
                Transition::DoorClosing { ticks }
            }
        }
        Transition::DoorClosed { ticks } => {
            let ticks = ticks + 1;
            if ticks >= post_delay_ticks() {
                Transition::InterLevelAnimating { ticks: 0 }
            } else {
                Transition::DoorClosed { ticks }
            }
        }
        Transition::InterLevelAnimating { ticks } => {
            let ticks = ticks + 1;
            if ticks >= elevator_ride_ticks() + post_delay_ticks() {
                request_level(state, state.level + 1, false);
                return;
            }
            Transition::InterLevelAnimating { ticks }
        }
        Transition::LevelLoading { .. } | Transition::GameComplete => return,
    };
    state.transition = Some(next);
}
