//! Play a whole Hat game with scripted players

use hat_core::testing::seeded_game;
use hat_core::{HatGamePhase, HatSettings, WordPackStore};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Simulating a Hat game ===\n");

    let settings = HatSettings::new()
        .with_team_count(3)
        .with_word_count(15)
        .with_turn_duration(20)
        .with_max_skips(2)
        .with_skip_penalty(1)
        .with_packs(["animals", "food"]);
    let packs = WordPackStore::default();
    let pool = packs.collect_words(&settings.selected_packs);
    println!("Pool: {} words from {:?}", pool.len(), settings.selected_packs);

    let mut game = seeded_game(settings, pool, 42)?;
    let mut step: u32 = 0;

    while game.phase() != HatGamePhase::GameFinished {
        match game.phase() {
            HatGamePhase::ReadyToStart => {
                let state = game.state();
                println!(
                    "\n{} | {} up, {}s on the clock",
                    state.current_round,
                    state.current_team().name,
                    state.remaining_time_seconds
                );
                game.start_turn()?;
            }
            HatGamePhase::Playing => {
                step += 1;
                let word = game.state().current_word.clone().unwrap_or_default();
                // Every seventh word is too hard; every third second passes.
                if step % 7 == 0 && game.state().can_skip() {
                    game.skip_word()?;
                    println!("   skip  {word}");
                } else {
                    game.guess_word()?;
                    println!("   guess {word}");
                }
                if step % 3 == 0 && game.phase() == HatGamePhase::Playing && game.tick()? {
                    println!("   time is up");
                }
            }
            HatGamePhase::TurnEnded => game.next_team()?,
            HatGamePhase::RoundEnded => {
                println!("\nRound over. Scores:");
                for team in game.state().standings() {
                    println!("   {:<8} {:>3}", team.name, team.total_score());
                }
                game.next_round()?;
            }
            HatGamePhase::GameFinished => break,
        }
    }

    let state = game.state();
    let winners: Vec<_> = state.winners().iter().map(|t| t.name.as_str()).collect();
    println!("\n=== Winner: {} ===", winners.join(", "));
    Ok(())
}
