//! Life cycle: death, restart prompts, respawn, goal and player commands

use serde::{Deserialize, Serialize};

use super::scheduler::TimerAction;
use super::state::{DeathCause, GameEvent, GameState, LifeState};
use super::transition;
use crate::audio::SoundCue;
use crate::consts::{EXPLOSION_TICKS, FALL_OUT_POPUP_TICKS, FINAL_LEVEL, MAX_LIVES, RESPAWN_LOCK_MS};

/// Discrete player commands (menus, popups, pause button)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    Pause,
    Resume,
    TogglePause,
    /// Replay the current level, keeping lives
    RestartLevel,
    /// Restore all lives and replay the current level
    ResetRun,
    /// Any key/tap while the restart prompt is up
    AdvanceFromRestartPrompt,
    /// Start over from level 1 after finishing the game
    PlayAgain,
}

/// Kill the player. A no-op unless the player is currently alive, so any
/// number of overlapping hazards cost exactly one life.
pub fn kill(state: &mut GameState, cause: DeathCause) {
    if !state.life.is_alive() {
        return;
    }
    state.life = LifeState::Dead { cause };
    state.lives = state.lives.saturating_sub(1);
    state.player.vel = glam::Vec2::ZERO;
    state.explosion_ticks = 0;
    state.deaths += 1;
    if cause == DeathCause::FellOut {
        state.fall_out_popup_ticks = FALL_OUT_POPUP_TICKS;
    }

    log::info!(
        "Player died on level {} ({:?}), {} lives left",
        state.level,
        cause,
        state.lives
    );
    state.emit(GameEvent::Sound(cause.sound()));
    state.emit(GameEvent::PlayerDied {
        cause,
        lives: state.lives,
    });
}

/// Advance the death animation and open the restart prompt or the reset
/// popup once it finishes
pub fn advance_death(state: &mut GameState) {
    if !state.life.is_dead() {
        return;
    }
    state.explosion_ticks = state.explosion_ticks.saturating_add(1);

    if let LifeState::Dead { cause } = state.life {
        if state.explosion_ticks > EXPLOSION_TICKS {
            if state.lives > 0 {
                state.life = LifeState::AwaitingRestart { cause };
                state.emit(GameEvent::RestartPrompt);
            } else {
                log::info!("Out of lives on level {}", state.level);
                state.life = LifeState::Exhausted { cause };
                state.emit(GameEvent::RunExhausted);
            }
        }
    }
}

/// Count down cosmetic popups
pub fn tick_popups(state: &mut GameState) {
    state.fall_out_popup_ticks = state.fall_out_popup_ticks.saturating_sub(1);
}

/// Reload the level after a death and lock controls for a moment
fn respawn(state: &mut GameState) {
    state.reload();
    state.life = LifeState::Respawning;
    state.input_locked = true;
    state
        .scheduler
        .after_ms(RESPAWN_LOCK_MS, TimerAction::ReleaseInputLock);
    log::info!("Respawning on level {}", state.level);
}

/// End of the post-respawn lock
pub fn release_input_lock(state: &mut GameState) {
    state.input_locked = false;
    state.player.vel = glam::Vec2::ZERO;
    if state.life == LifeState::Respawning {
        state.life = LifeState::Alive;
    }
}

/// Goal overlap: at most once per level instance
pub fn reach_goal(state: &mut GameState) {
    if state.goal_reached {
        return;
    }
    state.goal_reached = true;
    state.life = LifeState::GoalReached;
    state.player.pos = state.goal.rect.centered(state.player.size);
    state.player.vel = glam::Vec2::ZERO;

    log::info!(
        "Goal reached on level {} after {}s",
        state.level,
        state.elapsed_seconds()
    );
    state.emit(GameEvent::Sound(SoundCue::GoalReached));
    state.emit(GameEvent::GoalReached { level: state.level });
    if state.level < FINAL_LEVEL {
        state.emit(GameEvent::ProgressUnlocked {
            level: state.level + 1,
        });
    }
    transition::begin(state);
}

/// Apply a discrete command
pub fn apply_command(state: &mut GameState, command: Command) {
    match command {
        Command::Pause => state.paused = true,
        Command::Resume => state.paused = false,
        Command::TogglePause => state.paused = !state.paused,
        Command::RestartLevel => {
            if state.transition.is_some() || matches!(state.life, LifeState::Exhausted { .. }) {
                log::debug!("Ignoring restart in {:?}", state.life);
                return;
            }
            state.reload();
        }
        Command::ResetRun => {
            if state.transition.is_some() {
                log::debug!("Ignoring reset during a level transition");
                return;
            }
            state.lives = MAX_LIVES;
            state.reload();
            log::info!("Run reset on level {}", state.level);
        }
        Command::AdvanceFromRestartPrompt => {
            if matches!(state.life, LifeState::AwaitingRestart { .. }) {
                respawn(state);
            }
        }
        Command::PlayAgain => {
            if !state.is_complete() {
                return;
            }
            log::info!("Starting over from level 1");
            state.emit(GameEvent::ProgressReset);
            transition::request_level(state, 1, true);
        }
    }
}
