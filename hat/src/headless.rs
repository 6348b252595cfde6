//! Line-oriented Hat host.
//!
//! Commands start with `#`; during a turn the single letters `g` and `s`
//! guess and skip the current word. Every reply line carries a bracketed
//! tag so scripts can parse the output.

use hat_core::{
    default_teams, AiSettings, EngineError, GenerationError, GenerationOutcome,
    GenerationRequest, GenerationState, HatEngine, HatGamePhase, HatGameState, HatSettings,
    SettingsStore, StoredSettings, WordGenerator, WordPackStore, WordSource,
};
use std::io::{self, BufRead, Write};
use std::sync::Arc;

/// Result of handling one input line.
#[derive(Debug, PartialEq, Eq)]
pub enum Outcome {
    Continue(Vec<String>),
    Quit,
}

/// Configuration for a headless session.
#[derive(Debug, Clone)]
pub struct HeadlessConfig {
    pub store: SettingsStore,
    /// Settings as read from the file; `#save` writes these back.
    pub settings: StoredSettings,
    /// Endpoint actually used for generation, after environment overrides.
    pub ai: AiSettings,
}

/// A generation that ended short of its target, waiting for `#accept` or `#more`.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingGeneration {
    request: GenerationRequest,
    words: Vec<String>,
    attempts: u32,
}

/// Everything the host keeps between lines.
pub struct HeadlessSession {
    engine: HatEngine,
    settings: HatSettings,
    ai: AiSettings,
    stored_ai: AiSettings,
    source: Option<Arc<dyn WordSource>>,
    pending: Option<PendingGeneration>,
    packs: WordPackStore,
    store: SettingsStore,
}

impl HeadlessSession {
    pub fn new(config: HeadlessConfig) -> Self {
        Self {
            engine: HatEngine::new(),
            settings: config.settings.game,
            ai: config.ai,
            stored_ai: config.settings.ai,
            source: None,
            pending: None,
            packs: WordPackStore::default(),
            store: config.store,
        }
    }

    /// Generate words with `source` instead of a client built from the AI settings.
    pub fn with_word_source(mut self, source: Arc<dyn WordSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn engine(&self) -> &HatEngine {
        &self.engine
    }

    pub fn settings(&self) -> &HatSettings {
        &self.settings
    }

    pub fn packs(&self) -> &WordPackStore {
        &self.packs
    }

    /// Handle one line of input.
    pub async fn handle(&mut self, line: &str) -> Outcome {
        let line = line.trim();
        let mut parts = line.split_whitespace();
        let Some(command) = parts.next() else {
            return Outcome::Continue(Vec::new());
        };
        let args: Vec<&str> = parts.collect();

        let lines = match command {
            "#quit" | "#exit" => return Outcome::Quit,
            "#help" => help_lines(),
            "#teams" => self.set_number(&args, "teams", |s, n| s.with_team_count(n)),
            "#words" => self.set_number(&args, "words", |s, n| s.with_word_count(n)),
            "#time" => self.set_number(&args, "time", |s, n| s.with_turn_duration(n)),
            "#skips" => self.set_number(&args, "skips", |s, n| s.with_max_skips(n)),
            "#penalty" => self.set_number(&args, "penalty", |s, n| s.with_skip_penalty(n)),
            "#pack" => self.toggle_pack(&args),
            "#packs" => self.pack_lines(),
            "#generate" => self.generate(&args).await,
            "#more" => self.generate_more().await,
            "#accept" => self.accept_partial(),
            "#save" => self.save().await,
            "#start" => self.start(),
            "#turn" => self.transition(HatEngine::start_turn),
            "g" => self.transition(HatEngine::guess_word),
            "s" => self.transition(HatEngine::skip_word),
            "#end" => self.transition(HatEngine::end_turn),
            "#next" => self.transition(HatEngine::next_team),
            "#round" => self.transition(HatEngine::next_round),
            "#status" => match self.engine.snapshot() {
                Some(state) => status_lines(&state),
                None => settings_lines(&self.settings, &self.packs),
            },
            "#results" => match self.engine.snapshot() {
                Some(state) => results_lines(&state),
                None => vec![error_line(&EngineError::NoGame)],
            },
            "#reset" => {
                self.engine.reset();
                vec!["[RESET] Back to setup".to_string()]
            }
            _ => vec!["[ERROR] Unknown command. Type #help for help.".to_string()],
        };
        Outcome::Continue(lines)
    }

    fn set_number<T, F>(&mut self, args: &[&str], name: &str, apply: F) -> Vec<String>
    where
        T: std::str::FromStr,
        F: FnOnce(HatSettings, T) -> HatSettings,
    {
        let Some(value) = args.first().and_then(|a| a.parse::<T>().ok()) else {
            return vec![format!("[ERROR] Usage: #{name} <number>")];
        };
        let updated = apply(self.settings.clone(), value);
        if let Err(e) = updated.validate() {
            return vec![error_line(&e)];
        }
        self.settings = updated;
        settings_lines(&self.settings, &self.packs)
    }

    fn toggle_pack(&mut self, args: &[&str]) -> Vec<String> {
        let Some(id) = args.first() else {
            return vec!["[ERROR] Usage: #pack <id>".to_string()];
        };
        if self.packs.get(id).is_none() {
            return vec![format!("[ERROR] Unknown pack: {id}")];
        }
        if !self.settings.toggle_pack(id) {
            return vec!["[ERROR] At least one pack must stay selected".to_string()];
        }
        settings_lines(&self.settings, &self.packs)
    }

    fn pack_lines(&self) -> Vec<String> {
        let mut lines = vec!["[PACKS]".to_string()];
        for pack in self.packs.all() {
            let mark = if self.settings.selected_packs.contains(&pack.id) {
                '*'
            } else {
                ' '
            };
            lines.push(format!(
                " {mark} {:<40} {} ({} words)",
                pack.id,
                pack.name,
                pack.words.len()
            ));
        }
        lines
    }

    async fn generate(&mut self, args: &[&str]) -> Vec<String> {
        let usage = || vec!["[ERROR] Usage: #generate <count> <theme>".to_string()];
        let Some(count) = args.first().and_then(|a| a.parse::<usize>().ok()) else {
            return usage();
        };
        let theme = args[1..].join(" ");
        if theme.is_empty() {
            return usage();
        }

        self.pending = None;
        let request = GenerationRequest::new(theme, count);
        self.run_generation(request, Vec::new(), 0).await
    }

    async fn generate_more(&mut self) -> Vec<String> {
        let Some(pending) = self.pending.clone() else {
            return vec!["[ERROR] No partial word list to continue".to_string()];
        };
        self.run_generation(pending.request, pending.words, pending.attempts)
            .await
    }

    fn accept_partial(&mut self) -> Vec<String> {
        let Some(pending) = self.pending.take() else {
            return vec!["[ERROR] No partial word list to accept".to_string()];
        };
        vec![self.store_pack(pending.request.theme, pending.words)]
    }

    fn word_source(&self) -> Result<Arc<dyn WordSource>, GenerationError> {
        if let Some(source) = &self.source {
            return Ok(Arc::clone(source));
        }
        Ok(Arc::new(self.ai.client()?))
    }

    async fn run_generation(
        &mut self,
        request: GenerationRequest,
        previous_words: Vec<String>,
        previous_attempts: u32,
    ) -> Vec<String> {
        let source = match self.word_source() {
            Ok(source) => source,
            Err(e) => return vec![format!("[ERROR] {}", e.user_message())],
        };
        let generator = WordGenerator::new(source);
        let count = request.target_count;

        let mut lines = Vec::new();
        let result: Result<GenerationOutcome, GenerationError> = generator
            .continue_generation(
                &request,
                &previous_words,
                previous_attempts,
                |attempt, generated| {
                    let state = GenerationState::Loading { attempt, generated };
                    tracing::debug!(?state, "generation progress");
                    lines.push(format!(
                        "[GENERATING] attempt {attempt}, {generated}/{count} words"
                    ));
                },
            )
            .await;

        match GenerationState::from_result(&result, count) {
            GenerationState::Success { words } => {
                self.pending = None;
                lines.push(self.store_pack(request.theme, words));
            }
            GenerationState::PartialSuccess { words, attempts, .. } => {
                lines.push(format!(
                    "[PARTIAL] Only {} of {count} words after {attempts} attempts",
                    words.len()
                ));
                lines.push("  #accept keeps them, #more keeps generating".to_string());
                self.pending = Some(PendingGeneration {
                    request,
                    words,
                    attempts,
                });
            }
            GenerationState::Error { message } => lines.push(format!("[ERROR] {message}")),
            GenerationState::Idle | GenerationState::Loading { .. } => {}
        }
        lines
    }

    fn store_pack(&mut self, theme: String, words: Vec<String>) -> String {
        match self.packs.add_generated_pack(theme, words) {
            Ok(id) => {
                self.settings.toggle_pack(&id);
                let size = self.packs.get(&id).map(|p| p.words.len()).unwrap_or(0);
                format!("[GENERATED] Pack {id} with {size} words, selected")
            }
            Err(e) => format!("[ERROR] {e}"),
        }
    }

    async fn save(&self) -> Vec<String> {
        let stored = StoredSettings {
            ai: self.stored_ai.clone(),
            game: self.settings.clone(),
        };
        match self.store.save(&stored).await {
            Ok(()) => vec![format!("[SAVED] Settings saved to {}", self.store.path().display())],
            Err(e) => vec![format!("[ERROR] Save failed: {e}")],
        }
    }

    fn start(&mut self) -> Vec<String> {
        let teams = default_teams(self.settings.team_count);
        if let Err(e) = self
            .engine
            .start_game(self.settings.clone(), teams, &self.packs)
        {
            return vec![error_line(&e)];
        }
        let mut lines = vec!["[STARTED]".to_string()];
        if let Some(state) = self.engine.snapshot() {
            lines.extend(status_lines(&state));
        }
        lines
    }

    fn transition(&mut self, action: fn(&HatEngine) -> Result<(), EngineError>) -> Vec<String> {
        match action(&self.engine) {
            Ok(()) => self
                .engine
                .snapshot()
                .map(|state| turn_lines(&state))
                .unwrap_or_default(),
            Err(e) => vec![error_line(&e)],
        }
    }
}

fn error_line(error: &EngineError) -> String {
    format!("[ERROR] {error}")
}

fn help_lines() -> Vec<String> {
    [
        "[HELP]",
        "  #teams N | #words N | #time S | #skips N | #penalty P   - game setup",
        "  #pack <id>              - select or deselect a word pack",
        "  #packs                  - list word packs",
        "  #generate <n> <theme>   - generate a word pack with AI",
        "  #accept | #more         - keep a short word list, or keep generating",
        "  #save                   - save settings",
        "  #start                  - start a game",
        "  #turn                   - start the current team's turn",
        "  g / s                   - guess / skip the current word",
        "  #end                    - end the turn early",
        "  #next                   - hand over to the next team",
        "  #round                  - start the next round",
        "  #status | #results      - show the game",
        "  #reset                  - abandon the game",
        "  #quit                   - exit",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn settings_lines(settings: &HatSettings, packs: &WordPackStore) -> Vec<String> {
    let skips = if settings.unlimited_skips() {
        "unlimited".to_string()
    } else {
        settings.max_skips_per_turn.to_string()
    };
    vec![
        "[SETTINGS]".to_string(),
        format!(
            "  Teams: {}, words: {}, turn: {}s, skips: {skips}, penalty: {}",
            settings.team_count,
            settings.word_count,
            settings.turn_duration_seconds,
            settings.skip_penalty
        ),
        format!(
            "  Packs: {} ({} words available)",
            settings.selected_packs.join(", "),
            packs.total_available(&settings.selected_packs)
        ),
    ]
}

fn turn_lines(state: &HatGameState) -> Vec<String> {
    match state.phase {
        HatGamePhase::Playing => {
            let word = state.current_word.as_deref().unwrap_or("(no words left)");
            let skips = state
                .current_team_skips_left()
                .map_or("unlimited".to_string(), |n| n.to_string());
            vec![format!(
                "[WORD] {word}  ({}s left, {} in the hat, skips: {skips})",
                state.remaining_time_seconds,
                state.remaining_words.len()
            )]
        }
        HatGamePhase::TurnEnded => {
            let mut lines = vec![format!(
                "[TURN OVER] {} guessed {}, skipped {}",
                state.current_team().name,
                state.guessed_in_turn.len(),
                state.skipped_in_turn.len()
            )];
            if state.is_round_finished() {
                lines.push("  The hat is empty. #next closes the round.".to_string());
            }
            lines
        }
        _ => status_lines(state),
    }
}

fn status_lines(state: &HatGameState) -> Vec<String> {
    let mut lines = vec![
        format!("[STATUS] {} ({})", state.current_round, state.phase),
        format!("  {}", state.current_round.rules()),
        format!(
            "  Up: {}, {}s on the clock, {} of {} words in the hat",
            state.current_team().name,
            state.remaining_time_seconds,
            state.remaining_words.len(),
            state.all_words.len()
        ),
    ];
    for team in &state.teams {
        lines.push(format!("  {:<10} {:>4}", team.name, team.total_score()));
    }
    lines
}

fn results_lines(state: &HatGameState) -> Vec<String> {
    let mut lines = vec!["[RESULTS]".to_string()];
    for (place, team) in state.standings().iter().enumerate() {
        let rounds: Vec<String> = hat_core::HatRound::ALL
            .iter()
            .map(|r| team.round_score(*r).to_string())
            .collect();
        lines.push(format!(
            "  {}. {:<10} {:>4}  ({})",
            place + 1,
            team.name,
            team.total_score(),
            rounds.join(" / ")
        ));
    }
    if state.is_game_finished() {
        let winners: Vec<&str> = state.winners().iter().map(|t| t.name.as_str()).collect();
        lines.push(format!("  Winner: {}", winners.join(", ")));
    }
    lines
}

/// Print a line whenever the countdown runs a turn out.
fn spawn_time_up_watcher(engine: &HatEngine) -> tokio::task::JoinHandle<()> {
    let mut updates = engine.subscribe();
    tokio::spawn(async move {
        let mut serial_announced = 0;
        while updates.changed().await.is_ok() {
            let announce = match updates.borrow_and_update().as_ref() {
                Some(state)
                    if state.phase == HatGamePhase::TurnEnded
                        && state.remaining_time_seconds == 0
                        && state.turn_serial != serial_announced =>
                {
                    serial_announced = state.turn_serial;
                    Some(state.current_team().name.clone())
                }
                _ => None,
            };
            if let Some(team) = announce {
                println!("[TIME UP] {team}'s turn is over. #next hands over.");
            }
        }
    })
}

/// Run the line protocol on stdin/stdout until EOF or `#quit`.
pub async fn run_headless(config: HeadlessConfig) -> io::Result<()> {
    let mut session = HeadlessSession::new(config);
    let watcher = spawn_time_up_watcher(session.engine());

    println!("=== Hat Headless Mode ===");
    for line in settings_lines(session.settings(), session.packs()) {
        println!("{line}");
    }
    println!("Type #help for commands.");
    println!();

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    std::thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    let mut stdout = io::stdout();
    while let Some(line) = rx.recv().await {
        match session.handle(&line).await {
            Outcome::Quit => {
                println!("Goodbye!");
                break;
            }
            Outcome::Continue(lines) => {
                for line in lines {
                    println!("{line}");
                }
            }
        }
        stdout.flush()?;
    }

    watcher.abort();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use hat_core::testing::{ScriptedReply, ScriptedWordSource};

    fn session() -> HeadlessSession {
        let dir = std::env::temp_dir().join("hat-headless-tests");
        HeadlessSession::new(HeadlessConfig {
            store: SettingsStore::new(dir.join("settings.json")),
            settings: StoredSettings::default(),
            ai: AiSettings::default(),
        })
    }

    fn scripted_session(replies: Vec<ScriptedReply>) -> (HeadlessSession, Arc<ScriptedWordSource>) {
        let source = Arc::new(ScriptedWordSource::new(replies));
        let session = session().with_word_source(source.clone());
        (session, source)
    }

    fn lines(outcome: Outcome) -> Vec<String> {
        match outcome {
            Outcome::Continue(lines) => lines,
            Outcome::Quit => panic!("unexpected quit"),
        }
    }

    #[tokio::test]
    async fn test_setup_commands_update_settings() {
        let mut session = session();
        lines(session.handle("#teams 3").await);
        lines(session.handle("#words 12").await);
        lines(session.handle("#skips 0").await);
        assert_eq!(session.settings().team_count, 3);
        assert_eq!(session.settings().word_count, 12);
        assert!(session.settings().unlimited_skips());

        let out = lines(session.handle("#teams 1").await);
        assert!(out[0].starts_with("[ERROR]"));
        assert_eq!(session.settings().team_count, 3);

        let out = lines(session.handle("#words many").await);
        assert!(out[0].contains("Usage"));
    }

    #[tokio::test]
    async fn test_pack_toggling() {
        let mut session = session();
        let out = lines(session.handle("#pack default").await);
        assert!(out[0].starts_with("[ERROR]"));

        lines(session.handle("#pack animals").await);
        assert_eq!(session.settings().selected_packs, vec!["default", "animals"]);

        let out = lines(session.handle("#pack nope").await);
        assert!(out[0].contains("Unknown pack"));
    }

    #[tokio::test]
    async fn test_play_a_turn() {
        let mut session = session();
        let out = lines(session.handle("g").await);
        assert!(out[0].contains("No game"));

        let out = lines(session.handle("#start").await);
        assert_eq!(out[0], "[STARTED]");

        let out = lines(session.handle("#turn").await);
        assert!(out[0].starts_with("[WORD]"));
        lines(session.handle("g").await);
        lines(session.handle("s").await);
        let out = lines(session.handle("#end").await);
        assert!(out[0].starts_with("[TURN OVER]"));

        let state = session.engine().snapshot().unwrap();
        assert_eq!(state.teams[0].total_score(), 1);
        assert_eq!(state.all_words.len(), 39);

        let out = lines(session.handle("#round").await);
        assert!(out[0].contains("Cannot start the next round"));

        lines(session.handle("#next").await);
        let state = session.engine().snapshot().unwrap();
        assert_eq!(state.current_team_index, 1);
        assert_eq!(state.phase, HatGamePhase::ReadyToStart);
    }

    #[tokio::test]
    async fn test_generate_without_token_reports_error() {
        let mut session = session();
        let out = lines(session.handle("#generate 5 pirates").await);
        assert!(out[0].starts_with("[ERROR]"));
        assert!(out[0].contains("token"));
    }

    #[tokio::test]
    async fn test_quit_and_unknown() {
        let mut session = session();
        assert_eq!(session.handle("#quit").await, Outcome::Quit);
        let out = lines(session.handle("#dance").await);
        assert!(out[0].contains("Unknown command"));
        assert_eq!(session.handle("   ").await, Outcome::Continue(Vec::new()));
    }

    #[tokio::test]
    async fn test_oversized_penalty_rejected() {
        let mut session = session();
        let out = lines(session.handle("#penalty 4294967295").await);
        assert!(out[0].starts_with("[ERROR]"));
        assert_eq!(session.settings().skip_penalty, 0);
    }

    #[tokio::test]
    async fn test_accept_partial_word_list() {
        let (mut session, _source) =
            scripted_session(vec![ScriptedReply::words(["parrot", "cannon", "anchor"])]);

        let out = lines(session.handle("#generate 5 pirates").await);
        assert!(out.iter().any(|l| l.starts_with("[PARTIAL] Only 3 of 5")));
        assert!(!out.iter().any(|l| l.starts_with("[GENERATED]")));
        assert_eq!(session.settings().selected_packs, vec!["default"]);

        let out = lines(session.handle("#accept").await);
        assert!(out[0].starts_with("[GENERATED]"));
        let id = session.settings().selected_packs[1].clone();
        assert_eq!(session.packs().get(&id).unwrap().words.len(), 3);

        let out = lines(session.handle("#accept").await);
        assert!(out[0].contains("No partial word list"));
    }

    #[tokio::test]
    async fn test_more_continues_partial_word_list() {
        let (mut session, source) = scripted_session(vec![
            ScriptedReply::words(["parrot", "cannon", "anchor"]),
            ScriptedReply::Error(wordgen::Error::Timeout),
            ScriptedReply::words(["treasure", "parrot", "compass"]),
        ]);

        let out = lines(session.handle("#more").await);
        assert!(out[0].contains("No partial word list"));

        let out = lines(session.handle("#generate 5 pirates").await);
        assert!(out.iter().any(|l| l.contains("after 2 attempts")));

        let out = lines(session.handle("#more").await);
        assert!(out.contains(&"[GENERATING] attempt 3, 3/5 words".to_string()));
        let generated = out.last().unwrap();
        assert!(generated.starts_with("[GENERATED]"));
        assert!(generated.contains("with 5 words"));

        let calls = source.calls();
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[2].count, 2);
        assert!(calls[2].excluded.contains("parrot"));

        let out = lines(session.handle("#accept").await);
        assert!(out[0].contains("No partial word list"));
    }

    #[tokio::test]
    async fn test_save_keeps_environment_token_out_of_file() {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("settings.json");
        let mut session = HeadlessSession::new(HeadlessConfig {
            store: SettingsStore::new(&path),
            settings: StoredSettings::default(),
            ai: AiSettings {
                token: "env-secret".to_string(),
                ..AiSettings::default()
            },
        });

        lines(session.handle("#teams 3").await);
        let out = lines(session.handle("#save").await);
        assert!(out[0].starts_with("[SAVED]"));

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.contains("env-secret"));
        let saved: StoredSettings = serde_json::from_str(&content).unwrap();
        assert_eq!(saved.game.team_count, 3);
        assert_eq!(saved.ai, AiSettings::default());
    }
}
