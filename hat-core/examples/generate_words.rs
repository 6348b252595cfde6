//! Generate a themed word pack against the configured API
//!
//! Usage: cargo run -p hat-core --example generate_words -- <count> <theme...>

use hat_core::{AiSettings, GenerationRequest, GenerationState, WordGenerator, WordPackStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    let mut args = std::env::args().skip(1);
    let count: usize = args.next().and_then(|c| c.parse().ok()).unwrap_or(20);
    let theme = args.collect::<Vec<_>>().join(" ");
    let theme = if theme.is_empty() { "space travel".to_string() } else { theme };

    let ai = AiSettings::from_env();
    println!("Model: {} at {}", ai.model, ai.base_url);
    let generator = WordGenerator::new(ai.client()?);
    let request = GenerationRequest::new(&theme, count);

    let result = generator
        .generate(&request, |attempt, generated| {
            println!("   attempt {attempt}: {generated}/{count} so far");
        })
        .await;

    match GenerationState::from_result(&result, count) {
        GenerationState::Success { words } | GenerationState::PartialSuccess { words, .. } => {
            let mut store = WordPackStore::default();
            let id = store.add_generated_pack(&theme, words.clone())?;
            println!("\nSaved {} words as pack {id}:", words.len());
            println!("{}", words.join(", "));
        }
        GenerationState::Error { message } => println!("\nGeneration failed: {message}"),
        GenerationState::Idle | GenerationState::Loading { .. } => {}
    }
    Ok(())
}
