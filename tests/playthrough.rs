//! End-to-end runs of the game driver against in-memory collaborators

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use trust_issues::audio::{AudioManager, SoundCue, SoundSink};
use trust_issues::level::{LevelDescriptor, LevelSource};
use trust_issues::persistence::ProgressStore;
use trust_issues::renderer::Overlay;
use trust_issues::sim::{Command, DeathCause, GameEvent, LifeState, TickInput};
use trust_issues::{Game, GameError, LevelError, Settings, StorageError};

const RIGHT: TickInput = TickInput {
    left: false,
    right: true,
    jump: false,
};
const IDLE: TickInput = TickInput {
    left: false,
    right: false,
    jump: false,
};

/// Player a few steps left of the goal
const NEAR_GOAL: &str = r#"{
    "player": { "startX": 800, "startY": 470 },
    "platforms": [ { "x": 0, "y": 500, "width": 910, "height": 50 } ],
    "goal": { "x": 850, "y": 450, "width": 40, "height": 50 }
}"#;

/// Spikes right in front of the spawn point
const SPIKED: &str = r#"{
    "player": { "startX": 50, "startY": 470 },
    "platforms": [ { "x": 0, "y": 500, "width": 910, "height": 50 } ],
    "traps": [ { "x": 100, "y": 500, "width": 40, "height": 20, "type": "spikes" } ],
    "goal": { "x": 850, "y": 450, "width": 40, "height": 50 }
}"#;

#[derive(Clone, Default)]
struct SharedLevels(Rc<RefCell<HashMap<u32, &'static str>>>);

impl SharedLevels {
    fn with(levels: &[(u32, &'static str)]) -> Self {
        let shared = Self::default();
        shared.0.borrow_mut().extend(levels.iter().copied());
        shared
    }
}

impl LevelSource for SharedLevels {
    fn fetch(&self, level: u32) -> Result<LevelDescriptor, LevelError> {
        let json = self
            .0
            .borrow()
            .get(&level)
            .copied()
            .ok_or(LevelError::NotFound { level })?;
        LevelDescriptor::from_json(level, json)
    }
}

#[derive(Clone)]
struct SharedProgress(Rc<Cell<u32>>);

impl ProgressStore for SharedProgress {
    fn load(&self) -> u32 {
        self.0.get()
    }

    fn save(&mut self, level: u32) -> Result<(), StorageError> {
        self.0.set(level);
        Ok(())
    }
}

#[derive(Clone, Default)]
struct Cues(Rc<RefCell<Vec<SoundCue>>>);

impl SoundSink for Cues {
    fn play(&mut self, cue: SoundCue) {
        self.0.borrow_mut().push(cue);
    }
}

struct Harness {
    game: Game,
    levels: SharedLevels,
    progress: Rc<Cell<u32>>,
    cues: Cues,
}

fn harness(levels: &[(u32, &'static str)], unlocked: u32, settings: Settings) -> Harness {
    let levels = SharedLevels::with(levels);
    let progress = Rc::new(Cell::new(unlocked));
    let cues = Cues::default();
    let game = Game::new(
        Box::new(levels.clone()),
        Box::new(SharedProgress(progress.clone())),
        AudioManager::new(Box::new(cues.clone())),
        settings,
        42,
    );
    Harness {
        game,
        levels,
        progress,
        cues,
    }
}

/// Step until `done` holds, collecting events; panics after `limit` ticks
fn run_until(
    game: &mut Game,
    input: &TickInput,
    limit: usize,
    done: impl Fn(&[GameEvent]) -> bool,
) -> Vec<GameEvent> {
    let mut events = Vec::new();
    for _ in 0..limit {
        events.extend(game.step(input).unwrap());
        if done(&events) {
            return events;
        }
    }
    panic!("condition not reached in {} ticks; events: {:?}", limit, events);
}

#[test]
fn test_goal_to_next_level_with_animations() {
    let mut h = harness(&[(1, NEAR_GOAL), (2, SPIKED)], 1, Settings::default());
    let started = h.game.continue_game().unwrap();
    assert!(started.contains(&GameEvent::LevelLoaded {
        level: 1,
        generation: 1
    }));

    let events = run_until(&mut h.game, &RIGHT, 60, |e| {
        e.contains(&GameEvent::GoalReached { level: 1 })
    });
    assert!(events.contains(&GameEvent::ProgressUnlocked { level: 2 }));
    assert_eq!(h.progress.get(), 2);
    assert_eq!(h.cues.0.borrow().as_slice(), &[SoundCue::GoalReached]);

    // Door, hold, elevator, then the driver loads level 2
    let frame = h.game.frame().unwrap();
    assert!(frame.door_progress.is_some());
    let events = run_until(&mut h.game, &IDLE, 400, |e| {
        e.iter()
            .any(|e| matches!(e, GameEvent::LevelLoaded { level: 2, .. }))
    });
    assert!(events.contains(&GameEvent::DoorClosed));
    assert!(events.contains(&GameEvent::LevelRequested { level: 2 }));

    let state = h.game.state().unwrap();
    assert_eq!(state.level, 2);
    assert_eq!(state.life, LifeState::Alive);
    assert!(state.transition.is_none());
    assert_eq!(state.lives, 5);
}

#[test]
fn test_goal_without_animations_loads_immediately() {
    let settings = Settings {
        animate_transitions: false,
        ..Settings::default()
    };
    let mut h = harness(&[(1, NEAR_GOAL), (2, SPIKED)], 1, settings);
    h.game.start(1).unwrap();

    let events = run_until(&mut h.game, &RIGHT, 60, |e| {
        e.contains(&GameEvent::GoalReached { level: 1 })
    });
    assert!(events.contains(&GameEvent::LevelRequested { level: 2 }));
    assert_eq!(h.game.state().unwrap().level, 2);
}

#[test]
fn test_death_respawn_cycle() {
    let mut h = harness(&[(1, SPIKED)], 1, Settings::default());
    h.game.start(1).unwrap();

    let events = run_until(&mut h.game, &RIGHT, 60, |e| {
        e.iter().any(|e| matches!(e, GameEvent::PlayerDied { .. }))
    });
    assert!(events.contains(&GameEvent::PlayerDied {
        cause: DeathCause::Trap,
        lives: 4
    }));
    assert!(h.cues.0.borrow().contains(&SoundCue::TrapDeath));

    // Holding right while exploding changes nothing
    let before = h.game.state().unwrap().player.pos;
    run_until(&mut h.game, &RIGHT, 120, |e| {
        e.contains(&GameEvent::RestartPrompt)
    });
    let state = h.game.state().unwrap();
    assert_eq!(state.player.pos, before);
    assert_eq!(state.lives, 4);
    assert!(
        h.game
            .frame()
            .unwrap()
            .has_overlay(&Overlay::RestartPrompt)
    );

    h.game.command(Command::AdvanceFromRestartPrompt).unwrap();
    let state = h.game.state().unwrap();
    assert_eq!(state.life, LifeState::Respawning);
    assert!(state.input_locked);
    assert_eq!(state.player.pos.x, 50.0);

    // Input is ignored until the lock lifts after one second
    for _ in 0..30 {
        h.game.step(&RIGHT).unwrap();
    }
    assert_eq!(h.game.state().unwrap().player.pos.x, 50.0);
    for _ in 0..40 {
        h.game.step(&IDLE).unwrap();
    }
    let state = h.game.state().unwrap();
    assert_eq!(state.life, LifeState::Alive);
    assert!(!state.input_locked);
}

#[test]
fn test_running_out_of_lives_needs_reset() {
    let mut h = harness(&[(1, SPIKED)], 1, Settings::default());
    h.game.start(1).unwrap();
    h.game.state_mut().unwrap().lives = 1;

    run_until(&mut h.game, &RIGHT, 200, |e| e.contains(&GameEvent::RunExhausted));
    let state = h.game.state().unwrap();
    assert_eq!(state.lives, 0);
    assert!(matches!(state.life, LifeState::Exhausted { .. }));
    assert!(h.game.frame().unwrap().has_overlay(&Overlay::ResetPopup));

    // The restart prompt path is closed
    h.game.command(Command::AdvanceFromRestartPrompt).unwrap();
    assert!(matches!(
        h.game.state().unwrap().life,
        LifeState::Exhausted { .. }
    ));

    h.game.command(Command::ResetRun).unwrap();
    let state = h.game.state().unwrap();
    assert_eq!(state.lives, 5);
    assert_eq!(state.life, LifeState::Alive);
    assert_eq!(state.level, 1);
}

#[test]
fn test_completion_and_play_again() {
    let mut h = harness(&[(1, SPIKED), (10, NEAR_GOAL)], 10, Settings::default());
    h.game.start(10).unwrap();
    for _ in 0..90 {
        h.game.step(&IDLE).unwrap();
    }
    assert_eq!(h.game.state().unwrap().elapsed_seconds(), 1);

    let events = run_until(&mut h.game, &RIGHT, 60, |e| e.contains(&GameEvent::GameCompleted));
    assert!(
        !events
            .iter()
            .any(|e| matches!(e, GameEvent::ProgressUnlocked { .. }))
    );
    assert_eq!(h.cues.0.borrow().last(), Some(&SoundCue::Victory));
    assert!(h.game.state().unwrap().is_complete());
    assert!(h.game.frame().unwrap().has_overlay(&Overlay::Victory));

    // Nothing moves on after the end
    for _ in 0..200 {
        h.game.step(&RIGHT).unwrap();
    }
    assert!(h.game.state().unwrap().is_complete());

    let events = h.game.command(Command::PlayAgain).unwrap();
    assert!(events.contains(&GameEvent::ProgressReset));
    assert_eq!(h.progress.get(), 1);
    let state = h.game.state().unwrap();
    assert_eq!(state.level, 1);
    assert_eq!(state.lives, 5);
    assert_eq!(state.timer, 0);
    assert!(!state.is_complete());
}

#[test]
fn test_locked_level_is_refused() {
    let mut h = harness(&[(1, SPIKED), (3, NEAR_GOAL)], 1, Settings::default());
    assert!(matches!(
        h.game.start(3),
        Err(GameError::Locked {
            level: 3,
            unlocked: 1
        })
    ));
    assert!(h.game.state().is_none());
    assert!(matches!(
        h.game.step(&IDLE),
        Err(GameError::NotStarted)
    ));
}

#[test]
fn test_missing_next_level_can_be_retried() {
    let settings = Settings {
        animate_transitions: false,
        ..Settings::default()
    };
    let mut h = harness(&[(2, NEAR_GOAL)], 2, settings);
    h.game.start(2).unwrap();

    let mut failed = false;
    for _ in 0..60 {
        if let Err(e) = h.game.step(&RIGHT) {
            assert!(matches!(
                e,
                GameError::Level(LevelError::NotFound { level: 3 })
            ));
            failed = true;
            break;
        }
    }
    assert!(failed);
    let state = h.game.state().unwrap();
    assert!(state.load_error.is_some());
    assert_eq!(state.level, 2);
    let frame = h.game.frame().unwrap();
    assert!(frame.overlays.iter().any(|o| matches!(o, Overlay::LoadError(_))));

    // Still waiting; ticks change nothing
    h.game.step(&IDLE).unwrap();
    assert_eq!(h.game.state().unwrap().level, 2);

    h.levels.0.borrow_mut().insert(3, SPIKED);
    h.game.retry_load().unwrap();
    let state = h.game.state().unwrap();
    assert_eq!(state.level, 3);
    assert!(state.load_error.is_none());
    assert_eq!(h.progress.get(), 3);
}
