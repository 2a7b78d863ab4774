//! Game state and core simulation types
//!
//! Everything the tick loop mutates lives in [`GameState`]. Level entities
//! are rebuilt from the immutable descriptor on every load so that nothing
//! a previous attempt did (revealed spikes, shifted holes, vanished floors)
//! can leak into the next one.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::geometry::Rect;
use super::hazards::HazardState;
use super::scheduler::Scheduler;
use super::transition::Transition;
use crate::audio::SoundCue;
use crate::consts::*;
use crate::error::LevelError;
use crate::level::{Direction, GoalDef, LevelDescriptor, Movement, PlatformDef, TrapDef, TrapKind};

/// The player-controlled square
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Player {
    /// Top-left corner
    pub pos: Vec2,
    pub size: Vec2,
    /// Velocity in pixels per tick
    pub vel: Vec2,
    pub on_ground: bool,
}

impl Player {
    pub fn spawn(desc: &LevelDescriptor) -> Self {
        Self {
            pos: Vec2::new(desc.player.start_x, desc.player.start_y),
            size: Vec2::new(desc.player.width, desc.player.height),
            vel: Vec2::ZERO,
            on_ground: false,
        }
    }

    pub fn rect(&self) -> Rect {
        Rect::from_pos_size(self.pos, self.size)
    }
}

/// Runtime platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Platform {
    pub rect: Rect,
    pub color: Option<String>,
    pub disappearing: bool,
    pub disappear_delay_ms: Option<u64>,
    /// Once set, the platform is gone for the rest of this attempt
    pub disappeared: bool,
}

impl From<&PlatformDef> for Platform {
    fn from(def: &PlatformDef) -> Self {
        Self {
            rect: def.rect(),
            color: def.color.clone(),
            disappearing: def.disappearing,
            disappear_delay_ms: def.disappear_delay,
            disappeared: false,
        }
    }
}

impl Platform {
    /// Solid for collision and drawn
    pub fn is_present(&self) -> bool {
        !self.disappeared
    }
}

/// Runtime trap
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trap {
    /// Stable within one level load; timers refer to traps by id
    pub id: u32,
    pub rect: Rect,
    pub kind: TrapKind,
    pub color: Option<String>,
    pub movement: Option<Movement>,
    /// Hidden traps neither collide nor render
    pub hidden: bool,
    pub appear_after_move: bool,
    /// movingDot activation flag
    pub moving: bool,
}

/// Spike dimensions for timed spawns
pub const SPAWNED_SPIKE_WIDTH: f32 = 40.0;
pub const SPAWNED_SPIKE_HEIGHT: f32 = 20.0;
pub const SPAWNED_SPIKE_COLOR: &str = "#8B4513";

impl Trap {
    /// Runtime copy of an authored trap
    pub fn from_def(id: u32, def: &TrapDef) -> Self {
        // Dots carry direction/speed on the trap itself
        let movement = def.movement.or_else(|| match (def.direction, def.speed) {
            (None, None) => None,
            (direction, speed) => Some(Movement {
                direction: direction.unwrap_or_default(),
                speed: speed.unwrap_or(0.0),
                ..Movement::default()
            }),
        });

        Self {
            id,
            rect: def.rect(),
            kind: def.kind,
            color: def.color.clone(),
            movement,
            // Traps that appear after the first move always start hidden
            hidden: def.hidden || def.appear_after_move,
            appear_after_move: def.appear_after_move,
            moving: def.moving,
        }
    }

    /// A spike centered on a platform, as dropped by timed spawning
    pub fn spawned_spike(id: u32, platform: &Rect) -> Self {
        Self {
            id,
            rect: Rect::new(
                platform.x + platform.width / 2.0 - SPAWNED_SPIKE_WIDTH / 2.0,
                platform.y - SPAWNED_SPIKE_HEIGHT,
                SPAWNED_SPIKE_WIDTH,
                SPAWNED_SPIKE_HEIGHT,
            ),
            kind: TrapKind::Spikes,
            color: Some(SPAWNED_SPIKE_COLOR.to_string()),
            movement: None,
            hidden: false,
            appear_after_move: false,
            moving: false,
        }
    }

    pub fn is_visible(&self) -> bool {
        !self.hidden
    }

    /// Whether the trap kills on contact (and with which geometry)
    pub fn is_lethal(&self) -> bool {
        !matches!(self.kind, TrapKind::Generic)
    }

    /// Lethal overlap test against the player's rectangle
    pub fn hits(&self, player: &Rect) -> bool {
        if self.hidden {
            return false;
        }
        match self.kind {
            TrapKind::Spikes | TrapKind::MovingSpikes => player.overlaps_spike_region(&self.rect),
            TrapKind::MovingHole | TrapKind::MovingDot => player.overlaps(&self.rect),
            TrapKind::Generic => false,
        }
    }

    pub fn direction(&self) -> Direction {
        self.movement.map(|m| m.direction).unwrap_or_default()
    }

    pub fn speed(&self) -> f32 {
        self.movement.map(|m| m.speed).unwrap_or(0.0)
    }
}

/// Goal door
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Goal {
    pub rect: Rect,
    pub color: Option<String>,
}

impl From<&GoalDef> for Goal {
    fn from(def: &GoalDef) -> Self {
        Self {
            rect: def.rect(),
            color: def.color.clone(),
        }
    }
}

/// Why the player died
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeathCause {
    /// Touched a lethal trap
    Trap,
    /// Left the playfield
    FellOut,
}

impl DeathCause {
    pub fn sound(self) -> SoundCue {
        match self {
            DeathCause::Trap => SoundCue::TrapDeath,
            DeathCause::FellOut => SoundCue::FallOutDeath,
        }
    }
}

/// Player life cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifeState {
    /// Normal play
    Alive,
    /// Exploding; `explosion_ticks` counts up
    Dead { cause: DeathCause },
    /// Explosion finished, lives remain, waiting for any input
    AwaitingRestart { cause: DeathCause },
    /// Explosion finished with no lives left; only a reset helps
    Exhausted { cause: DeathCause },
    /// Just reloaded after a death; controls are locked for a moment
    Respawning,
    /// Touched the goal; the transition orchestrator owns the session
    GoalReached,
}

impl LifeState {
    /// The player is in the world and collides with things
    pub fn is_alive(self) -> bool {
        matches!(self, LifeState::Alive | LifeState::Respawning)
    }

    /// Dead, in any of its stages
    pub fn is_dead(self) -> bool {
        matches!(
            self,
            LifeState::Dead { .. } | LifeState::AwaitingRestart { .. } | LifeState::Exhausted { .. }
        )
    }

    pub fn death_cause(self) -> Option<DeathCause> {
        match self {
            LifeState::Dead { cause }
            | LifeState::AwaitingRestart { cause }
            | LifeState::Exhausted { cause } => Some(cause),
            _ => None,
        }
    }
}

/// Side effects produced by the simulation, drained by the driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    /// Play a sound cue
    Sound(SoundCue),
    /// A level (re)load completed
    LevelLoaded { level: u32, generation: u64 },
    PlayerDied { cause: DeathCause, lives: u8 },
    /// Explosion over, lives remain
    RestartPrompt,
    /// Explosion over, no lives left
    RunExhausted,
    GoalReached { level: u32 },
    /// Persist this level as the highest unlocked
    ProgressUnlocked { level: u32 },
    DoorClosed,
    /// The driver should fetch and load this level
    LevelRequested { level: u32 },
    GameCompleted,
    /// Persist progress back to level 1
    ProgressReset,
}

/// Complete game state for one session
#[derive(Debug, Clone, Serialize)]
pub struct GameState {
    /// Seed for cosmetic randomness (death debris)
    pub seed: u64,
    /// Current level (1-based)
    pub level: u32,
    /// Immutable source of the current level
    pub descriptor: LevelDescriptor,
    pub player: Player,
    pub platforms: Vec<Platform>,
    pub traps: Vec<Trap>,
    pub goal: Goal,
    /// Remaining lives, 0..=MAX_LIVES
    pub lives: u8,
    /// Ticks elapsed while simulating
    pub timer: u64,
    /// External pause; freezes everything without touching other state
    pub paused: bool,
    pub life: LifeState,
    /// Ticks since the last death
    pub explosion_ticks: u32,
    /// Remaining ticks of the fall-out notice
    pub fall_out_popup_ticks: u32,
    /// Deaths this session (seeds each explosion's debris)
    pub deaths: u32,
    /// Controls ignored (post-respawn)
    pub input_locked: bool,
    /// Set once per level instance
    pub goal_reached: bool,
    /// Level transition in progress, if any
    pub transition: Option<Transition>,
    /// Last level-load failure, shown to the player
    pub load_error: Option<String>,
    /// Play the door/elevator animations (otherwise skip straight to loading)
    pub animate_transitions: bool,
    pub hazards: HazardState,
    pub scheduler: Scheduler,
    /// Id for the next trap spawned during play
    next_trap_id: u32,
    #[serde(skip)]
    events: Vec<GameEvent>,
}

impl GameState {
    /// Start a fresh run on `level`
    pub fn new(level: u32, descriptor: LevelDescriptor, seed: u64) -> Result<Self, LevelError> {
        if !(1..=FINAL_LEVEL).contains(&level) {
            return Err(LevelError::OutOfRange(level));
        }
        let mut state = Self {
            seed,
            level,
            player: Player::spawn(&descriptor),
            platforms: Vec::new(),
            traps: Vec::new(),
            goal: Goal::from(&descriptor.goal),
            descriptor,
            lives: MAX_LIVES,
            timer: 0,
            paused: false,
            life: LifeState::Alive,
            explosion_ticks: 0,
            fall_out_popup_ticks: 0,
            deaths: 0,
            input_locked: false,
            goal_reached: false,
            transition: None,
            load_error: None,
            animate_transitions: true,
            hazards: HazardState::default(),
            scheduler: Scheduler::new(),
            next_trap_id: 0,
            events: Vec::new(),
        };
        state.reload();
        Ok(state)
    }

    /// Replace the current level with `descriptor` and load it fresh
    pub fn load_level(&mut self, level: u32, descriptor: LevelDescriptor) -> Result<(), LevelError> {
        if !(1..=FINAL_LEVEL).contains(&level) {
            return Err(LevelError::OutOfRange(level));
        }
        if let Some(Transition::LevelLoading { new_run: true, .. }) = self.transition {
            self.lives = MAX_LIVES;
            self.timer = 0;
        }
        self.level = level;
        self.descriptor = descriptor;
        self.reload();
        Ok(())
    }

    /// Rebuild every level entity from the descriptor and invalidate all
    /// outstanding timers. Lives and the run timer are preserved.
    pub fn reload(&mut self) {
        let generation = self.scheduler.begin_generation();

        self.player = Player::spawn(&self.descriptor);
        self.platforms = self.descriptor.platforms.iter().map(Platform::from).collect();
        self.traps = self
            .descriptor
            .traps
            .iter()
            .zip(0..)
            .map(|(def, id)| Trap::from_def(id, def))
            .collect();
        self.next_trap_id = self.traps.len() as u32;
        self.goal = Goal::from(&self.descriptor.goal);

        self.life = LifeState::Alive;
        self.explosion_ticks = 0;
        self.fall_out_popup_ticks = 0;
        self.input_locked = false;
        self.goal_reached = false;
        self.transition = None;
        self.load_error = None;
        self.paused = false;

        self.hazards = HazardState::for_level(self.level, &self.descriptor);
        super::hazards::arm_level_start(self);

        log::info!(
            "Loaded level {} (generation {}, {} platforms, {} traps)",
            self.level,
            generation,
            self.platforms.len(),
            self.traps.len()
        );
        self.emit(GameEvent::LevelLoaded {
            level: self.level,
            generation,
        });
    }

    /// Reserve an id for a trap created during play
    pub fn allocate_trap_id(&mut self) -> u32 {
        let id = self.next_trap_id;
        self.next_trap_id += 1;
        id
    }

    /// Current level-load generation
    pub fn generation(&self) -> u64 {
        self.scheduler.generation()
    }

    /// Gameplay is advancing (not paused, no transition, player not at goal)
    pub fn is_simulating(&self) -> bool {
        !self.paused && self.transition.is_none() && self.life != LifeState::GoalReached
    }

    pub fn is_complete(&self) -> bool {
        matches!(self.transition, Some(Transition::GameComplete))
    }

    /// Whole seconds for the HUD
    pub fn elapsed_seconds(&self) -> u64 {
        crate::ticks_to_seconds(self.timer)
    }

    pub fn emit(&mut self, event: GameEvent) {
        self.events.push(event);
    }

    /// Take all events produced since the last drain
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Peek at undrained events
    pub fn events(&self) -> &[GameEvent] {
        &self.events
    }
}
