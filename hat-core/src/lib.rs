//! Engine for the Hat party word game, plus AI word-pack generation.
//!
//! This crate provides:
//! - The three-round Hat state machine (explain, pantomime, one word)
//! - An async session owner that runs the turn countdown
//! - Built-in and generated word packs
//! - A bounded retry controller on top of the `wordgen` client
//! - Settings persistence
//!
//! # Quick Start
//!
//! ```ignore
//! use hat_core::{default_teams, HatEngine, HatSettings, WordPackStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let settings = HatSettings::new().with_team_count(3).with_turn_duration(45);
//!     let teams = default_teams(settings.team_count);
//!
//!     let engine = HatEngine::new();
//!     engine.start_game(settings, teams, &WordPackStore::default())?;
//!     engine.start_turn()?;
//!     engine.guess_word()?;
//!
//!     if let Some(state) = engine.snapshot() {
//!         println!("{} has {} points", state.current_team().name, state.current_team().total_score());
//!     }
//!     Ok(())
//! }
//! ```

pub mod engine;
pub mod game;
pub mod generation;
pub mod packs;
pub mod persist;
pub mod round;
pub mod settings;
pub mod state;
pub mod team;
pub mod testing;

// Primary public API
pub use engine::HatEngine;
pub use game::{EngineError, HatGame};
pub use generation::{
    CancelHandle, GenerationError, GenerationOutcome, GenerationRequest, GenerationState,
    WordGenerator, WordSource,
};
pub use packs::{PackError, WordPack, WordPackStore};
pub use persist::{AiSettings, SettingsError, SettingsStore, StoredSettings};
pub use round::HatRound;
pub use settings::HatSettings;
pub use state::{HatGamePhase, HatGameState};
pub use team::{default_teams, Team, TeamId};

// Re-export for convenience
pub use wordgen::WordClient;
