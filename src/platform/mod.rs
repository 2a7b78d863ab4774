//! Platform abstraction layer
//!
//! Handles browser/native differences for:
//! - Logging setup
//! - Storage (LocalStorage on web)
//! - Default collaborators for the game driver

#[cfg(target_arch = "wasm32")]
pub mod web;

use crate::audio::AudioManager;
use crate::game::Game;
use crate::level::BundledLevels;
use crate::persistence::ProgressStore;
use crate::settings::Settings;

/// Initialize logging for the current platform
#[cfg(not(target_arch = "wasm32"))]
pub fn init_logging() {
    // Ignore a second init (tests, embedding)
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .try_init();
}

/// Initialize logging for the current platform
#[cfg(target_arch = "wasm32")]
pub fn init_logging() {
    console_error_panic_hook::set_once();
    if console_log::init_with_level(log::Level::Info).is_err() {
        web_sys::console::warn_1(&"Logger already initialized".into());
    }
}

/// Browser LocalStorage, if this context has one
#[cfg(target_arch = "wasm32")]
pub fn local_storage() -> Option<web_sys::Storage> {
    web_sys::window()
        .and_then(|w| w.local_storage().ok())
        .flatten()
}

/// Default progress store: LocalStorage in the browser, memory otherwise
pub fn default_progress() -> Box<dyn ProgressStore> {
    #[cfg(target_arch = "wasm32")]
    {
        Box::new(crate::persistence::LocalStorageProgress)
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        Box::new(crate::persistence::MemoryProgress::new())
    }
}

/// A game wired to the bundled levels and the platform's default storage
/// and audio
pub fn default_game(settings: Settings, seed: u64) -> Game {
    Game::new(
        Box::new(BundledLevels),
        default_progress(),
        AudioManager::default(),
        settings,
        seed,
    )
}
