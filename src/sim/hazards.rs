//! Hazard behavior system
//!
//! Two kinds of behavior live here:
//!
//! - **Rules**: declarative `{trigger, delay, effect}` entries that fire at
//!   most once per level load. They come from the level file's `hazards` list
//!   or, when absent, from the built-in table keyed by level number.
//! - **Continuous motion**: per-trap-type behavior evaluated every tick on
//!   every level (hole proximity reveal, gated spikes, drifting dots).

use serde::{Deserialize, Serialize};

use super::scheduler::TimerAction;
use super::state::{GameState, Trap};
use crate::level::{Direction, LevelDescriptor, TrapKind};

/// Moving holes without their own trigger distance reveal at this range
pub const DEFAULT_HOLE_TRIGGER_DISTANCE: f32 = 120.0;

/// What arms a rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// As soon as the level loads
    LevelStart,
    /// The first tick the player carries nonzero velocity
    FirstMove,
}

/// What a rule does once its delay elapses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Effect {
    /// Unhide every `appearAfterMove` trap; traps moving right can be
    /// scheduled to turn around after a further delay
    RevealHidden {
        #[serde(default)]
        reverse_after_ms: Option<u64>,
    },
    /// Remove every `disappearing` platform
    DisappearFloors,
    /// Clear existing spikes, then drop one on each of the first `steps`
    /// platforms, one every `interval_ms`
    SpawnSpikes { interval_ms: u64, steps: usize },
    /// Start every movingDot trap drifting
    ActivateDots,
}

/// One-shot hazard activation rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HazardRule {
    pub trigger: Trigger,
    /// Default delay; per-trap `triggerDelay` and per-platform
    /// `disappearDelay` override it where they apply
    pub delay_ms: u64,
    pub effect: Effect,
}

impl HazardRule {
    pub const fn new(trigger: Trigger, delay_ms: u64, effect: Effect) -> Self {
        Self {
            trigger,
            delay_ms,
            effect,
        }
    }
}

const LEVEL_5: &[HazardRule] = &[HazardRule::new(
    Trigger::LevelStart,
    3000,
    Effect::SpawnSpikes {
        interval_ms: 1000,
        steps: 11,
    },
)];

const LEVEL_7: &[HazardRule] = &[HazardRule::new(
    Trigger::FirstMove,
    3000,
    Effect::RevealHidden {
        reverse_after_ms: Some(6000),
    },
)];

const LEVEL_8: &[HazardRule] = &[HazardRule::new(
    Trigger::FirstMove,
    1500,
    Effect::RevealHidden {
        reverse_after_ms: None,
    },
)];

const LEVEL_9: &[HazardRule] = &[HazardRule::new(Trigger::FirstMove, 3000, Effect::DisappearFloors)];

const LEVEL_10: &[HazardRule] = &[HazardRule::new(Trigger::LevelStart, 4000, Effect::ActivateDots)];

/// Built-in rules for levels whose file does not declare any
pub fn default_rules(level: u32) -> &'static [HazardRule] {
    match level {
        5 => LEVEL_5,
        7 => LEVEL_7,
        8 => LEVEL_8,
        9 => LEVEL_9,
        10 => LEVEL_10,
        _ => &[],
    }
}

/// Per-load rule bookkeeping
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HazardState {
    pub rules: Vec<HazardRule>,
    /// Parallel to `rules`: already armed this load
    started: Vec<bool>,
}

impl HazardState {
    pub fn for_level(level: u32, desc: &LevelDescriptor) -> Self {
        let rules = match &desc.hazards {
            Some(rules) => rules.clone(),
            None => default_rules(level).to_vec(),
        };
        let started = vec![false; rules.len()];
        Self { rules, started }
    }

    pub fn is_started(&self, index: usize) -> bool {
        self.started.get(index).copied().unwrap_or(false)
    }

    fn pending(&self, trigger: Trigger) -> Vec<(usize, HazardRule)> {
        self.rules
            .iter()
            .copied()
            .enumerate()
            .filter(|(i, rule)| rule.trigger == trigger && !self.started[*i])
            .collect()
    }
}

/// Arm every level-start rule. Called from each (re)load after the new
/// generation has begun.
pub fn arm_level_start(state: &mut GameState) {
    for (index, rule) in state.hazards.pending(Trigger::LevelStart) {
        if schedule(state, &rule) {
            state.hazards.started[index] = true;
        }
    }
}

/// Arm first-move rules once the player has moved. A rule with nothing to
/// act on stays unarmed.
pub fn update_triggers(state: &mut GameState) {
    if state.player.vel == glam::Vec2::ZERO {
        return;
    }
    for (index, rule) in state.hazards.pending(Trigger::FirstMove) {
        if schedule(state, &rule) {
            state.hazards.started[index] = true;
        }
    }
}

/// Schedule a rule's timers; false when it had no targets
fn schedule(state: &mut GameState, rule: &HazardRule) -> bool {
    match rule.effect {
        Effect::RevealHidden { reverse_after_ms } => {
            let targets: Vec<(u32, u64)> = state
                .traps
                .iter()
                .filter(|t| t.appear_after_move && t.hidden)
                .map(|t| {
                    let delay = t
                        .movement
                        .and_then(|m| m.trigger_delay)
                        .unwrap_or(rule.delay_ms);
                    (t.id, delay)
                })
                .collect();
            for &(trap, delay) in &targets {
                state.scheduler.after_ms(
                    delay,
                    TimerAction::RevealTrap {
                        trap,
                        reverse_after_ms,
                    },
                );
            }
            log::debug!("Armed reveal of {} hidden traps", targets.len());
            !targets.is_empty()
        }
        Effect::DisappearFloors => {
            let targets: Vec<(usize, u64)> = state
                .platforms
                .iter()
                .enumerate()
                .filter(|(_, p)| p.disappearing && !p.disappeared)
                .map(|(i, p)| (i, p.disappear_delay_ms.unwrap_or(rule.delay_ms)))
                .collect();
            for &(platform, delay) in &targets {
                state
                    .scheduler
                    .after_ms(delay, TimerAction::DisappearPlatform { platform });
            }
            log::debug!("Armed {} disappearing platforms", targets.len());
            !targets.is_empty()
        }
        Effect::SpawnSpikes { interval_ms, steps } => {
            state.traps.retain(|t| t.kind != TrapKind::Spikes);
            let steps = steps.min(state.platforms.len());
            for platform in 0..steps {
                let delay = rule
                    .delay_ms
                    .saturating_add(interval_ms.saturating_mul(platform as u64 + 1));
                state
                    .scheduler
                    .after_ms(delay, TimerAction::SpawnSpike { platform });
            }
            log::debug!("Armed spike spawning over {} platforms", steps);
            true
        }
        Effect::ActivateDots => {
            state
                .scheduler
                .after_ms(rule.delay_ms, TimerAction::ActivateDots);
            log::debug!("Armed dot activation in {} ms", rule.delay_ms);
            true
        }
    }
}

/// Apply a hazard timer that came due
pub fn apply_timer(state: &mut GameState, action: TimerAction) {
    match action {
        TimerAction::RevealTrap {
            trap,
            reverse_after_ms,
        } => {
            let Some(t) = state.traps.iter_mut().find(|t| t.id == trap) else {
                return;
            };
            t.hidden = false;
            log::debug!("Revealed trap {} ({:?})", trap, t.kind);
            if let Some(delay) = reverse_after_ms {
                if t.direction() == Direction::Right {
                    state
                        .scheduler
                        .after_ms(delay, TimerAction::ReverseTrap { trap });
                }
            }
        }
        TimerAction::ReverseTrap { trap } => {
            if let Some(movement) = state
                .traps
                .iter_mut()
                .find(|t| t.id == trap)
                .and_then(|t| t.movement.as_mut())
            {
                movement.direction = Direction::Left;
                log::debug!("Trap {} reversed", trap);
            }
        }
        TimerAction::DisappearPlatform { platform } => {
            if let Some(p) = state.platforms.get_mut(platform) {
                p.disappeared = true;
                log::debug!("Platform {} disappeared", platform);
            }
        }
        TimerAction::SpawnSpike { platform } => {
            if let Some(p) = state.platforms.get(platform) {
                let rect = p.rect;
                let id = state.allocate_trap_id();
                state.traps.push(Trap::spawned_spike(id, &rect));
            }
        }
        TimerAction::ActivateDots => {
            for t in state.traps.iter_mut().filter(|t| t.kind == TrapKind::MovingDot) {
                t.moving = true;
            }
            log::debug!("Moving dots activated");
        }
        TimerAction::ReleaseInputLock => {}
    }
}

/// Continuous per-tick trap motion; runs before physics so that anything
/// revealed here is collidable this same tick
pub fn update_traps(state: &mut GameState) {
    let player_x = state.player.pos.x;
    for trap in &mut state.traps {
        match trap.kind {
            TrapKind::MovingHole => update_hole(trap, player_x),
            TrapKind::MovingSpikes => update_moving_spikes(trap, player_x),
            TrapKind::MovingDot => {
                if trap.moving {
                    trap.rect.x += trap.direction().sign() * trap.speed();
                }
            }
            TrapKind::Spikes | TrapKind::Generic => {}
        }
    }
}

/// Reveal when the player comes within range, then creep toward them
fn update_hole(trap: &mut Trap, player_x: f32) {
    let range = trap
        .movement
        .map(|m| m.trigger_distance)
        .filter(|d| *d > 0.0)
        .unwrap_or(DEFAULT_HOLE_TRIGGER_DISTANCE);
    let offset = player_x - trap.rect.x;
    if offset.abs() >= range {
        return;
    }
    trap.hidden = false;
    let speed = trap.speed().abs();
    if speed != 0.0 && offset != 0.0 {
        trap.rect.x += offset.signum() * speed;
    }
}

/// Revealed moving spikes travel every tick, or only while the player is
/// within `triggerDistance` when one is set
fn update_moving_spikes(trap: &mut Trap, player_x: f32) {
    if trap.hidden {
        return;
    }
    let Some(movement) = trap.movement else {
        return;
    };
    if movement.trigger_distance > 0.0 && (player_x - trap.rect.x).abs() >= movement.trigger_distance {
        return;
    }
    trap.rect.x += movement.direction.sign() * movement.speed;
}
