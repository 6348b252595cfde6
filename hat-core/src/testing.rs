//! Testing utilities for the Hat engine.
//!
//! This module provides tools for integration testing:
//! - `ScriptedWordSource` for deterministic generation runs without API calls
//! - `seeded_game` and `word_pool` for reproducible games
//! - `assert_invariants` for checking a state after every transition

use crate::game::{EngineError, HatGame};
use crate::generation::WordSource;
use crate::settings::HatSettings;
use crate::state::{HatGamePhase, HatGameState};
use crate::team::default_teams;
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

/// One scripted reply of a [`ScriptedWordSource`].
#[derive(Debug)]
pub enum ScriptedReply {
    /// Return these words as-is (the generator does the filtering).
    Words(Vec<String>),
    /// Fail the call.
    Error(wordgen::Error),
    /// Never complete. Used to exercise cancellation.
    Hang,
}

impl ScriptedReply {
    pub fn words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ScriptedReply::Words(words.into_iter().map(Into::into).collect())
    }
}

/// A recorded call to a [`ScriptedWordSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub theme: String,
    pub count: usize,
    pub excluded: HashSet<String>,
}

/// A word source that replays scripted replies in order.
///
/// Once the script runs out every further call fails with
/// [`wordgen::Error::EmptyResponse`].
#[derive(Debug, Default)]
pub struct ScriptedWordSource {
    replies: Mutex<VecDeque<ScriptedReply>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedWordSource {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Every call received so far.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|calls| calls.len()).unwrap_or(0)
    }
}

#[async_trait]
impl WordSource for ScriptedWordSource {
    async fn generate(
        &self,
        theme: &str,
        count: usize,
        excluded: &HashSet<String>,
    ) -> Result<Vec<String>, wordgen::Error> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                theme: theme.to_string(),
                count,
                excluded: excluded.clone(),
            });
        }
        let reply = self
            .replies
            .lock()
            .ok()
            .and_then(|mut replies| replies.pop_front());
        match reply {
            Some(ScriptedReply::Words(words)) => Ok(words),
            Some(ScriptedReply::Error(error)) => Err(error),
            Some(ScriptedReply::Hang) => std::future::pending().await,
            None => Err(wordgen::Error::EmptyResponse),
        }
    }
}

/// `count` distinct words: `word01`, `word02`, ...
pub fn word_pool(count: usize) -> Vec<String> {
    (1..=count).map(|i| format!("word{i:02}")).collect()
}

/// A game with default team names and a fixed shuffle seed.
pub fn seeded_game(
    settings: HatSettings,
    words: Vec<String>,
    seed: u64,
) -> Result<HatGame, EngineError> {
    let teams = default_teams(settings.team_count);
    HatGame::with_rng(settings, teams, words, StdRng::seed_from_u64(seed))
}

/// Panic if `state` breaks any structural rule of the engine.
pub fn assert_invariants(state: &HatGameState) {
    assert_eq!(
        state.teams.len(),
        state.settings.team_count,
        "team count drifted from settings"
    );
    assert!(
        state.current_team_index < state.teams.len(),
        "current team index {} out of range",
        state.current_team_index
    );

    let all: HashSet<&String> = state.all_words.iter().collect();
    assert_eq!(all.len(), state.all_words.len(), "duplicate words in game");
    assert!(
        state.remaining_words.iter().all(|w| all.contains(w)),
        "round pool holds a word that left the game"
    );
    let remaining: HashSet<&String> = state.remaining_words.iter().collect();
    assert_eq!(
        remaining.len(),
        state.remaining_words.len(),
        "duplicate words in round pool"
    );

    for word in state.guessed_in_turn.iter().chain(&state.skipped_in_turn) {
        assert!(
            !remaining.contains(word),
            "{word} was played this turn but is still in the pool"
        );
    }
    for word in &state.skipped_in_turn {
        assert!(!all.contains(word), "skipped word {word} is still in the game");
    }

    if state.phase == HatGamePhase::Playing {
        assert_eq!(
            state.current_word.as_ref(),
            state.remaining_words.front(),
            "current word is not the head of the pool"
        );
        assert!(state.remaining_time_seconds > 0, "playing with no time left");
    }

    let max = state.settings.max_skips_per_turn;
    for (team, left) in &state.team_skips_left {
        assert!(*left <= max, "team {team} has {left} skips, above {max}");
    }
}
