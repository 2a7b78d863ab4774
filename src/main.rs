//! Trust Issues entry point
//!
//! In the browser this boots the canvas front end. Natively it runs the
//! simulation headless, optionally with a simple autopilot and periodic text
//! frames on stdout.

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn wasm_main() -> Result<(), JsValue> {
    trust_issues::platform::web::run()
}

#[cfg(target_arch = "wasm32")]
fn main() {
    // WASM entry point is wasm_main, this is just to satisfy the compiler
}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::io;
    use std::path::PathBuf;

    use clap::Parser;

    use trust_issues::audio::{AudioManager, LogSink};
    use trust_issues::level::{BundledLevels, DirectoryLevels, LevelSource};
    use trust_issues::persistence::{FileProgress, MemoryProgress, ProgressStore};
    use trust_issues::platform;
    use trust_issues::renderer::TextRenderer;
    use trust_issues::sim::{Command, GameEvent, GameState, LifeState, TickInput};
    use trust_issues::{Game, GameError, Settings};

    /// Headless runner for the Trust Issues simulation
    #[derive(Parser, Debug)]
    #[command(version, about)]
    pub struct Cli {
        /// Directory holding level1.json..level10.json (default: bundled levels)
        #[arg(long, value_name = "DIR")]
        levels: Option<PathBuf>,

        /// Level to start on (default: saved progress)
        #[arg(
            long,
            value_name = "N",
            value_parser = clap::value_parser!(u32).range(1..=10)
        )]
        level: Option<u32>,

        /// Number of simulation ticks to run
        #[arg(long, default_value_t = 3600)]
        ticks: u64,

        /// Progress file (default: in-memory)
        #[arg(long, value_name = "FILE")]
        progress: Option<PathBuf>,

        /// Settings file
        #[arg(long, value_name = "FILE")]
        settings: Option<PathBuf>,

        /// Disable sound cues
        #[arg(long)]
        mute: bool,

        /// Walk right and jump over anything dangerous
        #[arg(long)]
        autopilot: bool,

        /// Print a text frame every N ticks (0 = never)
        #[arg(long, value_name = "N", default_value_t = 0)]
        render_every: u64,
    }

    /// How far ahead the autopilot looks for trouble
    const LOOKAHEAD: f32 = 50.0;

    /// Hold right, jump when a lethal trap or a gap is coming up
    fn autopilot(state: &GameState) -> TickInput {
        let player = state.player.rect();
        let ahead_x = player.right() + LOOKAHEAD;

        let trap_ahead = state.traps.iter().any(|t| {
            t.is_visible()
                && t.is_lethal()
                && t.rect.right() > player.right()
                && t.rect.left() < ahead_x
        });
        let floor_ahead = state.platforms.iter().any(|p| {
            p.is_present()
                && p.rect.left() <= ahead_x
                && p.rect.right() >= ahead_x
                && p.rect.top() >= player.bottom() - 1.0
        });

        TickInput {
            right: true,
            left: false,
            jump: state.player.on_ground && (trap_ahead || !floor_ahead),
        }
    }

    #[derive(Debug, Default)]
    struct Summary {
        deaths: u32,
        goals: u32,
        levels_loaded: u32,
    }

    impl Summary {
        fn record(&mut self, events: &[GameEvent]) {
            for event in events {
                match event {
                    GameEvent::PlayerDied { .. } => self.deaths += 1,
                    GameEvent::GoalReached { .. } => self.goals += 1,
                    GameEvent::LevelLoaded { .. } => self.levels_loaded += 1,
                    _ => {}
                }
            }
        }
    }

    pub fn run() -> Result<(), GameError> {
        let cli = Cli::parse();
        platform::init_logging();
        log::info!("Trust Issues (native) starting...");

        let mut settings = match &cli.settings {
            Some(path) => Settings::load_from(path).unwrap_or_else(|e| {
                log::warn!("Ignoring settings file: {}", e);
                Settings::default()
            }),
            None => Settings::default(),
        };
        if cli.mute {
            settings.sound_enabled = false;
        }

        let levels: Box<dyn LevelSource> = match &cli.levels {
            Some(dir) => Box::new(DirectoryLevels::new(dir)),
            None => Box::new(BundledLevels),
        };
        let progress: Box<dyn ProgressStore> = match (&cli.progress, cli.level) {
            (Some(path), _) => Box::new(FileProgress::new(path)),
            // An explicit level with no progress file unlocks up to it
            (None, Some(level)) => Box::new(MemoryProgress::with_level(level)),
            (None, None) => Box::new(MemoryProgress::new()),
        };

        let seed = rand::random::<u64>();
        log::info!("Seed: {}", seed);
        let mut game = Game::new(
            levels,
            progress,
            AudioManager::new(Box::new(LogSink)),
            settings,
            seed,
        );

        let mut summary = Summary::default();
        let events = match cli.level {
            Some(level) => game.start(level)?,
            None => game.continue_game()?,
        };
        summary.record(&events);

        let mut renderer = TextRenderer::new(io::stdout());
        for tick in 1..=cli.ticks {
            let Some(state) = game.state() else {
                break;
            };
            if state.is_complete() {
                log::info!("Game complete after {} ticks", tick - 1);
                break;
            }
            if state.load_error.is_some() {
                log::error!("Halting: {}", state.load_error.as_deref().unwrap_or_default());
                break;
            }

            let life = state.life;
            let input = if cli.autopilot {
                match life {
                    LifeState::AwaitingRestart { .. } => {
                        summary.record(&game.command(Command::AdvanceFromRestartPrompt)?);
                        TickInput::default()
                    }
                    LifeState::Exhausted { .. } => {
                        summary.record(&game.command(Command::ResetRun)?);
                        TickInput::default()
                    }
                    _ => autopilot(state),
                }
            } else {
                TickInput::default()
            };

            // A failed level load is reported through `load_error` next tick
            match game.step(&input) {
                Ok(events) => summary.record(&events),
                Err(e) => log::error!("{}", e),
            }

            if cli.render_every > 0 && tick % cli.render_every == 0 {
                game.render(&mut renderer)?;
            }
        }

        if let Some(state) = game.state() {
            log::info!(
                "Finished on level {} with {} lives ({}s): {} deaths, {} goals, {} levels loaded",
                state.level,
                state.lives,
                state.elapsed_seconds(),
                summary.deaths,
                summary.goals,
                summary.levels_loaded
            );
        }
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    if let Err(e) = native::run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
