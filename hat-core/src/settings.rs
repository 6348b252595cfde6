//! Game configuration chosen on the setup screen.

use crate::game::EngineError;
use serde::{Deserialize, Serialize};

pub const MIN_TEAMS: usize = 2;

/// Largest skip penalty that still fits a team's signed score.
pub const MAX_SKIP_PENALTY: u32 = i32::MAX as u32;

/// Configuration for one Hat game.
///
/// Fixed for the whole game once it starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HatSettings {
    /// Number of teams taking turns. At least two.
    pub team_count: usize,

    /// Target size of the word pool.
    pub word_count: usize,

    /// Length of one turn's countdown.
    pub turn_duration_seconds: u32,

    /// Ids of the word packs to draw from. Never empty.
    pub selected_packs: Vec<String>,

    /// Points taken from the acting team's round score for every skip.
    pub skip_penalty: u32,

    /// Skips allowed per turn; `0` means unlimited.
    pub max_skips_per_turn: u32,
}

impl Default for HatSettings {
    fn default() -> Self {
        Self {
            team_count: 2,
            word_count: 40,
            turn_duration_seconds: 60,
            selected_packs: vec!["default".to_string()],
            skip_penalty: 0,
            max_skips_per_turn: 5,
        }
    }
}

impl HatSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_team_count(mut self, count: usize) -> Self {
        self.team_count = count;
        self
    }

    pub fn with_word_count(mut self, count: usize) -> Self {
        self.word_count = count;
        self
    }

    pub fn with_turn_duration(mut self, seconds: u32) -> Self {
        self.turn_duration_seconds = seconds;
        self
    }

    pub fn with_skip_penalty(mut self, penalty: u32) -> Self {
        self.skip_penalty = penalty;
        self
    }

    pub fn with_max_skips(mut self, skips: u32) -> Self {
        self.max_skips_per_turn = skips;
        self
    }

    /// Replace the selected packs. An empty list is ignored.
    pub fn with_packs<I, S>(mut self, packs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut selected: Vec<String> = Vec::new();
        for pack in packs {
            let pack = pack.into();
            if !selected.contains(&pack) {
                selected.push(pack);
            }
        }
        if !selected.is_empty() {
            self.selected_packs = selected;
        }
        self
    }

    /// Select or deselect a pack.
    ///
    /// Deselecting the last remaining pack is refused. Returns whether the
    /// selection changed.
    pub fn toggle_pack(&mut self, pack_id: &str) -> bool {
        if let Some(pos) = self.selected_packs.iter().position(|p| p == pack_id) {
            if self.selected_packs.len() == 1 {
                return false;
            }
            self.selected_packs.remove(pos);
        } else {
            self.selected_packs.push(pack_id.to_string());
        }
        true
    }

    pub fn unlimited_skips(&self) -> bool {
        self.max_skips_per_turn == 0
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.team_count < MIN_TEAMS {
            return Err(EngineError::InvalidSettings(format!(
                "at least {MIN_TEAMS} teams are required, got {}",
                self.team_count
            )));
        }
        if self.word_count == 0 {
            return Err(EngineError::InvalidSettings(
                "word count must be positive".to_string(),
            ));
        }
        if self.turn_duration_seconds == 0 {
            return Err(EngineError::InvalidSettings(
                "turn duration must be positive".to_string(),
            ));
        }
        if self.skip_penalty > MAX_SKIP_PENALTY {
            return Err(EngineError::InvalidSettings(format!(
                "skip penalty must be at most {MAX_SKIP_PENALTY}, got {}",
                self.skip_penalty
            )));
        }
        if self.selected_packs.is_empty() {
            return Err(EngineError::InvalidSettings(
                "at least one word pack must be selected".to_string(),
            ));
        }
        Ok(())
    }
}
