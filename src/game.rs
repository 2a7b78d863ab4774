//! Game driver
//!
//! Owns the simulation and its collaborators. The simulation only emits
//! [`GameEvent`]s; the driver turns them into sounds, progress writes and
//! level fetches, and accumulates wall-clock time into fixed ticks.

use crate::audio::AudioManager;
use crate::consts::{FINAL_LEVEL, SIM_DT};
use crate::error::{GameError, LevelError};
use crate::level::LevelSource;
use crate::persistence::ProgressStore;
use crate::renderer::{Frame, RenderSink};
use crate::settings::Settings;
use crate::sim::lifecycle::{self, Command};
use crate::sim::state::{GameEvent, GameState};
use crate::sim::tick::{TickInput, tick};
use crate::sim::transition::Transition;

/// Longest frame delta fed to the accumulator (seconds)
const MAX_FRAME_DT: f32 = 0.1;

pub struct Game {
    state: Option<GameState>,
    levels: Box<dyn LevelSource>,
    progress: Box<dyn ProgressStore>,
    audio: AudioManager,
    settings: Settings,
    seed: u64,
    accumulator: f32,
}

impl Game {
    pub fn new(
        levels: Box<dyn LevelSource>,
        progress: Box<dyn ProgressStore>,
        audio: AudioManager,
        settings: Settings,
        seed: u64,
    ) -> Self {
        let mut game = Self {
            state: None,
            levels,
            progress,
            audio,
            settings: Settings::default(),
            seed,
            accumulator: 0.0,
        };
        game.apply_settings(settings);
        game
    }

    pub fn state(&self) -> Option<&GameState> {
        self.state.as_ref()
    }

    /// Direct access for tools and tests
    pub fn state_mut(&mut self) -> Option<&mut GameState> {
        self.state.as_mut()
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn apply_settings(&mut self, settings: Settings) {
        self.audio.set_enabled(settings.sound_enabled);
        if let Some(state) = self.state.as_mut() {
            state.animate_transitions = settings.animate_transitions;
        }
        self.settings = settings;
    }

    /// Highest level the player may start
    pub fn unlocked_level(&self) -> u32 {
        self.progress.load()
    }

    /// Start a new run on `level`: full lives, timer at zero. Locked levels
    /// are refused. On failure the current session, if any, is untouched.
    pub fn start(&mut self, level: u32) -> Result<Vec<GameEvent>, GameError> {
        if !(1..=FINAL_LEVEL).contains(&level) {
            return Err(LevelError::OutOfRange(level).into());
        }
        let unlocked = self.unlocked_level();
        if level > unlocked {
            return Err(GameError::Locked { level, unlocked });
        }

        let descriptor = self.levels.fetch(level).inspect_err(|e| {
            log::warn!("Failed to load level {}: {}", level, e);
        })?;
        let mut state = GameState::new(level, descriptor, self.seed)?;
        state.animate_transitions = self.settings.animate_transitions;
        self.state = Some(state);
        self.accumulator = 0.0;
        log::info!("Started run on level {}", level);
        self.dispatch()
    }

    /// Start at the saved level
    pub fn continue_game(&mut self) -> Result<Vec<GameEvent>, GameError> {
        self.start(self.unlocked_level())
    }

    /// Apply a discrete player command
    pub fn command(&mut self, command: Command) -> Result<Vec<GameEvent>, GameError> {
        let state = self.state.as_mut().ok_or(GameError::NotStarted)?;
        lifecycle::apply_command(state, command);
        self.dispatch()
    }

    /// Run exactly one simulation tick
    pub fn step(&mut self, input: &TickInput) -> Result<Vec<GameEvent>, GameError> {
        let state = self.state.as_mut().ok_or(GameError::NotStarted)?;
        tick(state, input);
        self.dispatch()
    }

    /// Feed `dt` seconds of wall-clock time and run the ticks it covers,
    /// at most `max_substeps` of them. Returns the events produced.
    pub fn update(&mut self, dt: f32, input: &TickInput) -> Result<Vec<GameEvent>, GameError> {
        if self.state.is_none() {
            return Err(GameError::NotStarted);
        }
        self.accumulator += dt.clamp(0.0, MAX_FRAME_DT);

        let mut events = Vec::new();
        let mut substeps = 0;
        while self.accumulator >= SIM_DT && substeps < self.settings.max_substeps {
            events.extend(self.step(input)?);
            self.accumulator -= SIM_DT;
            substeps += 1;
        }
        // Drop time we could not catch up on
        if substeps >= self.settings.max_substeps {
            self.accumulator = self.accumulator.min(SIM_DT);
        }
        Ok(events)
    }

    /// Re-fetch the level a failed transition was waiting on
    pub fn retry_load(&mut self) -> Result<Vec<GameEvent>, GameError> {
        let state = self.state.as_mut().ok_or(GameError::NotStarted)?;
        let Some(Transition::LevelLoading { level, .. }) = state.transition else {
            return Ok(Vec::new());
        };
        state.load_error = None;
        log::info!("Retrying load of level {}", level);
        self.load_requested(level)?;
        self.dispatch()
    }

    /// Presentation snapshot of the current state
    pub fn frame(&self) -> Option<Frame> {
        self.state.as_ref().map(Frame::build)
    }

    pub fn render(&self, sink: &mut dyn RenderSink) -> Result<(), GameError> {
        let frame = self.frame().ok_or(GameError::NotStarted)?;
        sink.present(&frame);
        Ok(())
    }

    /// Perform the side effects of every pending event, including events
    /// raised by the effects themselves (a level load emits `LevelLoaded`).
    fn dispatch(&mut self) -> Result<Vec<GameEvent>, GameError> {
        let mut handled = Vec::new();
        let mut failure = None;

        loop {
            let events = match self.state.as_mut() {
                Some(state) => state.drain_events(),
                None => break,
            };
            if events.is_empty() {
                break;
            }
            for event in events {
                match &event {
                    GameEvent::Sound(cue) => self.audio.play(*cue),
                    GameEvent::ProgressUnlocked { level } => self.unlock(*level),
                    GameEvent::ProgressReset => self.save_progress(1),
                    GameEvent::LevelRequested { level } => {
                        if let Err(e) = self.load_requested(*level) {
                            failure = Some(e);
                        }
                    }
                    _ => {}
                }
                handled.push(event);
            }
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(handled),
        }
    }

    /// Fetch and load a requested level; on failure the session stays in
    /// `LevelLoading` with the error shown
    fn load_requested(&mut self, level: u32) -> Result<(), GameError> {
        let fetched = self.levels.fetch(level);
        let state = self.state.as_mut().ok_or(GameError::NotStarted)?;
        let loaded = fetched.and_then(|descriptor| state.load_level(level, descriptor));
        if let Err(e) = loaded {
            log::warn!("Failed to load level {}: {}", level, e);
            state.load_error = Some(e.to_string());
            return Err(e.into());
        }
        Ok(())
    }

    /// Record a newly unlocked level; progress never moves backwards
    fn unlock(&mut self, level: u32) {
        if level > self.progress.load() {
            self.save_progress(level);
        }
    }

    fn save_progress(&mut self, level: u32) {
        if let Err(e) = self.progress.save(level) {
            log::warn!("Failed to save progress: {}", e);
        }
    }
}
