//! Teams and their per-round scores.

use crate::round::HatRound;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Identifier of a team, unique within one game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TeamId(pub u32);

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// ARGB colours handed out to teams in order.
pub const TEAM_PALETTE: [u32; 6] = [
    0xFFE5_3935, // red
    0xFF1E_88E5, // blue
    0xFF43_A047, // green
    0xFFFB_8C00, // orange
    0xFF8E_24AA, // purple
    0xFF00_ACC1, // teal
];

/// A team playing the game.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    /// Display colour as `0xAARRGGBB`.
    pub color: u32,
    /// Accumulated score per round. May be negative when skips are penalized.
    #[serde(default)]
    pub scores: BTreeMap<HatRound, i32>,
}

impl Team {
    pub fn new(id: u32, name: impl Into<String>, color: u32) -> Self {
        Self {
            id: TeamId(id),
            name: name.into(),
            color,
            scores: BTreeMap::new(),
        }
    }

    /// Add `points` (possibly negative) to this team's score for `round`.
    pub fn add_score(&mut self, round: HatRound, points: i32) {
        let score = self.scores.entry(round).or_insert(0);
        *score = score.saturating_add(points);
    }

    pub fn round_score(&self, round: HatRound) -> i32 {
        self.scores.get(&round).copied().unwrap_or(0)
    }

    pub fn total_score(&self) -> i32 {
        self.scores
            .values()
            .fold(0i32, |total, score| total.saturating_add(*score))
    }
}

/// Build `count` teams named "Team 1", "Team 2", ... with palette colours.
pub fn default_teams(count: usize) -> Vec<Team> {
    (0..count)
        .map(|i| {
            Team::new(
                i as u32,
                format!("Team {}", i + 1),
                TEAM_PALETTE[i % TEAM_PALETTE.len()],
            )
        })
        .collect()
}
