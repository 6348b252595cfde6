//! The Hat turn/round state machine.
//!
//! [`HatGame`] owns a [`HatGameState`] and applies every transition
//! synchronously. It knows nothing about wall-clock time: the countdown is
//! driven from outside by calling [`HatGame::tick`] once per second (see
//! [`crate::engine::HatEngine`]).
//!
//! Calling a transition from the wrong phase is a caller bug. It is reported
//! as [`EngineError::InvalidTransition`] and leaves the state untouched.

use crate::round::HatRound;
use crate::settings::HatSettings;
use crate::state::{HatGamePhase, HatGameState};
use crate::team::{Team, TeamId};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::{BTreeMap, HashSet, VecDeque};
use thiserror::Error;

/// Errors from engine operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error("No words available for the selected packs")]
    EmptyWordPool,

    #[error("Cannot {action} while {phase}")]
    InvalidTransition {
        action: &'static str,
        phase: HatGamePhase,
    },

    #[error("No game in progress")]
    NoGame,

    #[error("No word to act on")]
    NoCurrentWord,

    #[error("Team {team_id} has no skips left this turn")]
    SkipBudgetExhausted { team_id: TeamId },

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Expected {expected} teams, got {actual}")]
    TeamCountMismatch { expected: usize, actual: usize },
}

/// A single Hat game.
#[derive(Debug, Clone)]
pub struct HatGame {
    state: HatGameState,
    rng: StdRng,
}

impl HatGame {
    /// Set up a game with an entropy-seeded shuffle.
    pub fn new(
        settings: HatSettings,
        teams: Vec<Team>,
        word_pool: Vec<String>,
    ) -> Result<Self, EngineError> {
        Self::with_rng(settings, teams, word_pool, StdRng::from_entropy())
    }

    /// Set up a game using `rng` for word selection and every reshuffle.
    ///
    /// Picks `min(word_count, pool size)` distinct words at random as the
    /// game's words, shuffles them into the first round and hands the first
    /// turn to the first team.
    pub fn with_rng(
        settings: HatSettings,
        teams: Vec<Team>,
        word_pool: Vec<String>,
        mut rng: StdRng,
    ) -> Result<Self, EngineError> {
        settings.validate()?;
        if teams.len() != settings.team_count {
            return Err(EngineError::TeamCountMismatch {
                expected: settings.team_count,
                actual: teams.len(),
            });
        }
        let mut ids = HashSet::new();
        if !teams.iter().all(|t| ids.insert(t.id)) {
            return Err(EngineError::InvalidSettings(
                "team ids must be unique".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let pool: Vec<String> = word_pool
            .into_iter()
            .map(|w| w.trim().to_string())
            .filter(|w| !w.is_empty() && seen.insert(w.clone()))
            .collect();
        if pool.is_empty() {
            return Err(EngineError::EmptyWordPool);
        }

        let take = settings.word_count.min(pool.len());
        let all_words: Vec<String> = pool.choose_multiple(&mut rng, take).cloned().collect();

        let mut shuffled = all_words.clone();
        shuffled.shuffle(&mut rng);

        let team_skips_left = fresh_skip_budget(&teams, &settings);
        let remaining_time_seconds = settings.turn_duration_seconds;

        tracing::info!(
            teams = teams.len(),
            words = all_words.len(),
            pool = pool.len(),
            "hat game initialized"
        );

        Ok(Self {
            state: HatGameState {
                settings,
                teams,
                all_words,
                remaining_words: shuffled.into(),
                current_round: HatRound::first(),
                current_team_index: 0,
                current_word: None,
                guessed_in_turn: Vec::new(),
                skipped_in_turn: Vec::new(),
                team_skips_left,
                phase: HatGamePhase::ReadyToStart,
                remaining_time_seconds,
                turn_serial: 0,
            },
            rng,
        })
    }

    pub fn state(&self) -> &HatGameState {
        &self.state
    }

    pub fn phase(&self) -> HatGamePhase {
        self.state.phase
    }

    pub fn into_state(self) -> HatGameState {
        self.state
    }

    /// Begin the current team's turn.
    ///
    /// A clock left partly spent by the previous round carries over;
    /// otherwise the timer is reset to the full turn length.
    pub fn start_turn(&mut self) -> Result<(), EngineError> {
        self.expect_phase("start a turn", HatGamePhase::ReadyToStart)?;

        let full = self.state.settings.turn_duration_seconds;
        let carried = self.state.remaining_time_seconds;
        let state = &mut self.state;

        state.current_word = state.remaining_words.front().cloned();
        state.guessed_in_turn.clear();
        state.skipped_in_turn.clear();
        state.team_skips_left = fresh_skip_budget(&state.teams, &state.settings);
        state.remaining_time_seconds = if carried > 0 && carried < full {
            carried
        } else {
            full
        };
        state.turn_serial += 1;
        state.phase = HatGamePhase::Playing;

        tracing::debug!(
            team = %state.current_team().name,
            round = %state.current_round,
            seconds = state.remaining_time_seconds,
            "turn started"
        );
        Ok(())
    }

    /// The acting team explained the current word.
    ///
    /// Awards one point for the current round. Ends the turn at once when
    /// this was the last word of the round.
    pub fn guess_word(&mut self) -> Result<(), EngineError> {
        self.expect_phase("guess a word", HatGamePhase::Playing)?;
        let word = self.take_current_word()?;

        let state = &mut self.state;
        let round = state.current_round;
        state.teams[state.current_team_index].add_score(round, 1);
        tracing::debug!(%word, team = %state.current_team().name, "word guessed");
        state.guessed_in_turn.push(word);

        self.finish_if_pool_empty();
        Ok(())
    }

    /// The acting team gave up on the current word.
    ///
    /// The word leaves the game for good, not just this round. Costs one
    /// skip from the team's budget and `skip_penalty` points.
    pub fn skip_word(&mut self) -> Result<(), EngineError> {
        self.expect_phase("skip a word", HatGamePhase::Playing)?;
        if self.state.current_word.is_none() {
            return Err(EngineError::NoCurrentWord);
        }
        if !self.state.can_skip() {
            return Err(EngineError::SkipBudgetExhausted {
                team_id: self.state.current_team().id,
            });
        }
        let word = self.take_current_word()?;

        let state = &mut self.state;
        state.all_words.retain(|w| *w != word);

        let team_id = state.current_team().id;
        if !state.settings.unlimited_skips() {
            if let Some(left) = state.team_skips_left.get_mut(&team_id) {
                *left = left.saturating_sub(1);
            }
        }

        // Bounded by `HatSettings::validate`.
        let penalty = i32::try_from(state.settings.skip_penalty).unwrap_or(i32::MAX);
        if penalty > 0 {
            let round = state.current_round;
            state.teams[state.current_team_index].add_score(round, -penalty);
        }

        tracing::debug!(%word, team = %team_id, penalty, "word skipped");
        state.skipped_in_turn.push(word);

        self.finish_if_pool_empty();
        Ok(())
    }

    /// Advance the countdown by one second.
    ///
    /// Returns `true` if this tick ran the clock out and ended the turn.
    pub fn tick(&mut self) -> Result<bool, EngineError> {
        self.expect_phase("tick the timer", HatGamePhase::Playing)?;
        let state = &mut self.state;
        state.remaining_time_seconds = state.remaining_time_seconds.saturating_sub(1);
        if state.remaining_time_seconds == 0 {
            tracing::debug!(team = %state.current_team().name, "time is up");
            state.phase = HatGamePhase::TurnEnded;
            return Ok(true);
        }
        Ok(false)
    }

    /// Stop the running turn. Scores and words were already updated.
    pub fn end_turn(&mut self) -> Result<(), EngineError> {
        self.expect_phase("end a turn", HatGamePhase::Playing)?;
        self.state.phase = HatGamePhase::TurnEnded;
        tracing::debug!(
            guessed = self.state.guessed_in_turn.len(),
            skipped = self.state.skipped_in_turn.len(),
            "turn ended"
        );
        Ok(())
    }

    /// Hand over to the next team, or close the round if its words ran out.
    ///
    /// When the round is over the acting team and its leftover time are
    /// kept, so the same team opens the next round with that clock.
    pub fn next_team(&mut self) -> Result<(), EngineError> {
        self.expect_phase("pass to the next team", HatGamePhase::TurnEnded)?;
        let state = &mut self.state;

        state.current_word = None;
        state.guessed_in_turn.clear();
        state.skipped_in_turn.clear();

        if state.remaining_words.is_empty() {
            state.phase = HatGamePhase::RoundEnded;
            tracing::info!(
                round = %state.current_round,
                carried_seconds = state.remaining_time_seconds,
                "round finished"
            );
        } else {
            state.current_team_index = state.next_team_index();
            state.remaining_time_seconds = state.settings.turn_duration_seconds;
            state.phase = HatGamePhase::ReadyToStart;
            tracing::debug!(team = %state.current_team().name, "next team up");
        }
        Ok(())
    }

    /// Move on to the next round, or finish the game after the last one.
    pub fn next_round(&mut self) -> Result<(), EngineError> {
        self.expect_phase("start the next round", HatGamePhase::RoundEnded)?;

        let Some(next) = self.state.current_round.next() else {
            self.state.phase = HatGamePhase::GameFinished;
            tracing::info!(
                winners = ?self.state.winners().iter().map(|t| &t.name).collect::<Vec<_>>(),
                "game finished"
            );
            return Ok(());
        };

        let mut words = self.state.all_words.clone();
        words.shuffle(&mut self.rng);

        let state = &mut self.state;
        state.current_round = next;
        state.remaining_words = VecDeque::from(words);
        state.current_word = None;
        state.guessed_in_turn.clear();
        state.skipped_in_turn.clear();
        state.phase = HatGamePhase::ReadyToStart;

        tracing::info!(round = %next, words = state.remaining_words.len(), "round started");
        Ok(())
    }

    fn expect_phase(&self, action: &'static str, phase: HatGamePhase) -> Result<(), EngineError> {
        if self.state.phase == phase {
            Ok(())
        } else {
            Err(EngineError::InvalidTransition {
                action,
                phase: self.state.phase,
            })
        }
    }

    /// Pop the head of the round's pool and advance `current_word`.
    fn take_current_word(&mut self) -> Result<String, EngineError> {
        let state = &mut self.state;
        if state.current_word.is_none() {
            return Err(EngineError::NoCurrentWord);
        }
        let word = state
            .remaining_words
            .pop_front()
            .ok_or(EngineError::NoCurrentWord)?;
        state.current_word = state.remaining_words.front().cloned();
        Ok(word)
    }

    fn finish_if_pool_empty(&mut self) {
        if self.state.remaining_words.is_empty() {
            self.state.phase = HatGamePhase::TurnEnded;
            tracing::debug!(round = %self.state.current_round, "word pool exhausted");
        }
    }
}

fn fresh_skip_budget(teams: &[Team], settings: &HatSettings) -> BTreeMap<TeamId, u32> {
    teams
        .iter()
        .map(|t| (t.id, settings.max_skips_per_turn))
        .collect()
}
