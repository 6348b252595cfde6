//! Session owner for a Hat game, with the turn countdown.
//!
//! [`HatEngine`] holds at most one [`HatGame`] and is the only thing that
//! mutates it. Every transition publishes a fresh [`HatGameState`] snapshot
//! on a `tokio::sync::watch` channel, so a UI can either poll
//! [`HatEngine::snapshot`] or await changes through [`HatEngine::subscribe`].
//!
//! While a turn is being played a background task ticks the countdown once
//! per second. The task is aborted on every transition that leaves
//! `Playing`, on [`HatEngine::reset`] and when the engine is dropped. Each
//! tick also re-checks the phase and the turn serial under the lock, so a
//! tick that was already in flight cannot touch a later turn.

use crate::game::{EngineError, HatGame};
use crate::packs::WordPackStore;
use crate::settings::HatSettings;
use crate::state::{HatGamePhase, HatGameState};
use crate::team::Team;
use rand::rngs::StdRng;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

const TICK: Duration = Duration::from_secs(1);

struct Shared {
    game: Mutex<Option<HatGame>>,
    updates: watch::Sender<Option<HatGameState>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Option<HatGame>> {
        self.game.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, game: Option<&HatGame>) {
        self.updates.send_replace(game.map(|g| g.state().clone()));
    }
}

/// Owns one game session and its countdown.
pub struct HatEngine {
    shared: Arc<Shared>,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl Default for HatEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl HatEngine {
    /// An engine with no game loaded.
    pub fn new() -> Self {
        let (updates, _) = watch::channel(None);
        Self {
            shared: Arc::new(Shared {
                game: Mutex::new(None),
                updates,
            }),
            timer: Mutex::new(None),
        }
    }

    /// Start a game from the packs selected in `settings`.
    pub fn start_game(
        &self,
        settings: HatSettings,
        teams: Vec<Team>,
        packs: &WordPackStore,
    ) -> Result<(), EngineError> {
        let pool = packs.collect_words(&settings.selected_packs);
        self.initialize(settings, teams, pool)
    }

    /// Replace any current game with a new one built from `word_pool`.
    pub fn initialize(
        &self,
        settings: HatSettings,
        teams: Vec<Team>,
        word_pool: Vec<String>,
    ) -> Result<(), EngineError> {
        let game = HatGame::new(settings, teams, word_pool)?;
        self.install(game);
        Ok(())
    }

    /// Like [`HatEngine::initialize`] with a caller-supplied RNG.
    pub fn initialize_with_rng(
        &self,
        settings: HatSettings,
        teams: Vec<Team>,
        word_pool: Vec<String>,
        rng: StdRng,
    ) -> Result<(), EngineError> {
        let game = HatGame::with_rng(settings, teams, word_pool, rng)?;
        self.install(game);
        Ok(())
    }

    /// Current state, or `None` when no game is loaded.
    pub fn snapshot(&self) -> Option<HatGameState> {
        self.shared.lock().as_ref().map(|g| g.state().clone())
    }

    /// Receive every state change, starting from the current state.
    pub fn subscribe(&self) -> watch::Receiver<Option<HatGameState>> {
        self.shared.updates.subscribe()
    }

    /// Begin the current team's turn and start the countdown.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start_turn(&self) -> Result<(), EngineError> {
        let serial = self.apply(HatGame::start_turn)?;
        if let Some(serial) = serial {
            self.spawn_countdown(serial);
        }
        Ok(())
    }

    pub fn guess_word(&self) -> Result<(), EngineError> {
        self.apply(HatGame::guess_word).map(|_| ())
    }

    pub fn skip_word(&self) -> Result<(), EngineError> {
        self.apply(HatGame::skip_word).map(|_| ())
    }

    /// Stop the running turn early.
    pub fn end_turn(&self) -> Result<(), EngineError> {
        self.apply(HatGame::end_turn).map(|_| ())
    }

    pub fn next_team(&self) -> Result<(), EngineError> {
        self.apply(HatGame::next_team).map(|_| ())
    }

    pub fn next_round(&self) -> Result<(), EngineError> {
        self.apply(HatGame::next_round).map(|_| ())
    }

    /// Drop the current game and stop its countdown.
    pub fn reset(&self) {
        self.cancel_countdown();
        let mut guard = self.shared.lock();
        *guard = None;
        self.shared.publish(None);
        tracing::debug!("hat game reset");
    }

    fn install(&self, game: HatGame) {
        self.cancel_countdown();
        let mut guard = self.shared.lock();
        *guard = Some(game);
        self.shared.publish(guard.as_ref());
    }

    /// Run a transition under the lock and publish the result.
    ///
    /// Returns the new turn serial when the game is left in `Playing`.
    fn apply<F>(&self, transition: F) -> Result<Option<u64>, EngineError>
    where
        F: FnOnce(&mut HatGame) -> Result<(), EngineError>,
    {
        let mut guard = self.shared.lock();
        let game = guard.as_mut().ok_or(EngineError::NoGame)?;
        transition(game)?;

        let state = game.state();
        let playing = (state.phase == HatGamePhase::Playing).then_some(state.turn_serial);
        self.shared.publish(guard.as_ref());
        drop(guard);

        if playing.is_none() {
            self.cancel_countdown();
        }
        Ok(playing)
    }

    fn spawn_countdown(&self, serial: u64) {
        self.cancel_countdown();
        let shared = Arc::clone(&self.shared);
        let handle = tokio::spawn(run_countdown(shared, serial));
        *self.timer.lock().unwrap_or_else(PoisonError::into_inner) = Some(handle);
    }

    fn cancel_countdown(&self) {
        let handle = self
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
        }
    }
}

impl Drop for HatEngine {
    fn drop(&mut self) {
        self.cancel_countdown();
    }
}

async fn run_countdown(shared: Arc<Shared>, serial: u64) {
    let mut interval = tokio::time::interval(TICK);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    interval.tick().await;

    loop {
        interval.tick().await;

        let mut guard = shared.lock();
        let Some(game) = guard.as_mut() else {
            return;
        };
        let state = game.state();
        if state.phase != HatGamePhase::Playing || state.turn_serial != serial {
            return;
        }

        let expired = match game.tick() {
            Ok(expired) => expired,
            Err(error) => {
                tracing::warn!(%error, "countdown tick rejected");
                return;
            }
        };
        shared.publish(guard.as_ref());

        if expired {
            return;
        }
    }
}
