//! Snapshot of a Hat game in progress.

use crate::round::HatRound;
use crate::settings::HatSettings;
use crate::team::{Team, TeamId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

/// Phase of the turn/round state machine.
///
/// ```text
/// ReadyToStart -> Playing -> TurnEnded -> ReadyToStart      (next team)
///                                      -> RoundEnded -> ReadyToStart (next round)
///                                                    -> GameFinished
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HatGamePhase {
    ReadyToStart,
    Playing,
    TurnEnded,
    RoundEnded,
    GameFinished,
}

impl fmt::Display for HatGamePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HatGamePhase::ReadyToStart => "ready to start",
            HatGamePhase::Playing => "playing",
            HatGamePhase::TurnEnded => "turn ended",
            HatGamePhase::RoundEnded => "round ended",
            HatGamePhase::GameFinished => "game finished",
        };
        f.write_str(name)
    }
}

/// Everything the UI needs to render a game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HatGameState {
    pub settings: HatSettings,
    pub teams: Vec<Team>,

    /// Words in play for the game. Shrinks only when a word is skipped.
    pub all_words: Vec<String>,

    /// Words not yet shown this round; the front is the current word.
    pub remaining_words: VecDeque<String>,

    pub current_round: HatRound,
    pub current_team_index: usize,

    /// Word being explained. `None` outside a turn or once the pool is empty.
    pub current_word: Option<String>,

    pub guessed_in_turn: Vec<String>,
    pub skipped_in_turn: Vec<String>,

    /// Skips left this turn, per team. Ignored when skips are unlimited.
    pub team_skips_left: BTreeMap<TeamId, u32>,

    pub phase: HatGamePhase,
    pub remaining_time_seconds: u32,

    /// Incremented by every `start_turn`; lets a countdown recognise its own turn.
    #[serde(default)]
    pub turn_serial: u64,
}

impl HatGameState {
    pub fn current_team(&self) -> &Team {
        &self.teams[self.current_team_index]
    }

    /// Skips the acting team has left, or `None` when skips are unlimited.
    pub fn current_team_skips_left(&self) -> Option<u32> {
        if self.settings.unlimited_skips() {
            return None;
        }
        Some(
            self.team_skips_left
                .get(&self.current_team().id)
                .copied()
                .unwrap_or(0),
        )
    }

    pub fn can_skip(&self) -> bool {
        !matches!(self.current_team_skips_left(), Some(0))
    }

    pub fn next_team_index(&self) -> usize {
        (self.current_team_index + 1) % self.teams.len()
    }

    pub fn is_round_finished(&self) -> bool {
        self.remaining_words.is_empty()
    }

    pub fn is_game_finished(&self) -> bool {
        self.current_round.is_last() && self.remaining_words.is_empty()
    }

    /// Teams by total score, highest first. Ties keep their seating order.
    pub fn standings(&self) -> Vec<&Team> {
        let mut ranked: Vec<&Team> = self.teams.iter().collect();
        ranked.sort_by(|a, b| b.total_score().cmp(&a.total_score()));
        ranked
    }

    /// Every team sharing the top total score.
    pub fn winners(&self) -> Vec<&Team> {
        let Some(best) = self.teams.iter().map(Team::total_score).max() else {
            return Vec::new();
        };
        self.teams
            .iter()
            .filter(|t| t.total_score() == best)
            .collect()
    }
}
