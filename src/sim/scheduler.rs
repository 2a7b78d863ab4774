//! Tick-driven one-shot timers keyed to a level generation
//!
//! Every deferred gameplay effect (hazard reveals, disappearing floors,
//! spike spawns, respawn input lock) is scheduled here instead of on a wall
//! clock, so tests can step time deterministically. Each timer captures the
//! generation that was current when it was scheduled; starting a new
//! generation (any level load) turns every older timer into a no-op.

use serde::{Deserialize, Serialize};

use crate::ms_to_ticks;

/// Deferred effect to apply when a timer comes due
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimerAction {
    /// Clear the `hidden` flag of a trap, optionally scheduling a later
    /// reversal for traps moving right. Traps are addressed by [`Trap::id`],
    /// which survives removals from the trap list.
    ///
    /// [`Trap::id`]: super::state::Trap::id
    RevealTrap {
        trap: u32,
        reverse_after_ms: Option<u64>,
    },
    /// Flip a revealed trap's movement to the left
    ReverseTrap { trap: u32 },
    /// Remove a disappearing platform for the rest of the attempt
    DisappearPlatform { platform: usize },
    /// Drop a spike onto the center of a platform
    SpawnSpike { platform: usize },
    /// Set `moving` on every movingDot trap
    ActivateDots,
    /// End the post-respawn control lock
    ReleaseInputLock,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Timer {
    due: u64,
    generation: u64,
    action: TimerAction,
}

/// Tick scheduler with generation-token cancellation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Scheduler {
    /// Ticks advanced so far
    now: u64,
    /// Current level-load generation
    generation: u64,
    pending: Vec<Timer>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> u64 {
        self.now
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Start a new generation, invalidating every outstanding timer
    pub fn begin_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Schedule `action` to fire `ms` from now in the current generation
    pub fn after_ms(&mut self, ms: u64, action: TimerAction) {
        self.schedule_for(self.generation, ms_to_ticks(ms).max(1), action);
    }

    /// Schedule `action` `ticks` from now on behalf of `generation`
    pub fn schedule_for(&mut self, generation: u64, ticks: u64, action: TimerAction) {
        self.pending.push(Timer {
            due: self.now.saturating_add(ticks),
            generation,
            action,
        });
    }

    /// Number of live (current-generation) timers
    pub fn pending(&self) -> usize {
        self.pending
            .iter()
            .filter(|t| t.generation == self.generation)
            .count()
    }

    /// Advance one tick and return the actions that came due, in the order
    /// they were scheduled. Stale timers are discarded without firing.
    pub fn advance(&mut self) -> Vec<TimerAction> {
        self.now += 1;
        let now = self.now;
        let generation = self.generation;

        let mut fired = Vec::new();
        self.pending.retain(|timer| {
            if timer.generation != generation {
                log::trace!(
                    "Dropping stale timer {:?} from generation {} (current {})",
                    timer.action,
                    timer.generation,
                    generation
                );
                return false;
            }
            if timer.due <= now {
                fired.push(timer.action);
                return false;
            }
            true
        });
        fired
    }
}
