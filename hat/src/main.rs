//! Hat party game host.
//!
//! A line-oriented interface for running a Hat game from a terminal or a
//! script:
//!
//! ```bash
//! cargo run -p hat -- --settings ~/.config/hat/settings.json
//! ```
//!
//! AI word generation reads its endpoint from the settings file, overridden
//! by `HAT_AI_BASE_URL`, `HAT_AI_MODEL` and `HAT_AI_TOKEN` (a `.env` file
//! is loaded first).

mod headless;

use hat_core::SettingsStore;
use headless::HeadlessConfig;

const DEFAULT_SETTINGS_PATH: &str = "hat-settings.json";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    let store = SettingsStore::new(settings_path_from_args(&args));
    let settings = match store.load().await {
        Ok(settings) => settings,
        Err(e) => {
            tracing::warn!(path = %store.path().display(), error = %e, "unreadable settings, using defaults");
            Default::default()
        }
    };
    // Environment overrides apply to this run only and are never saved.
    let mut ai = settings.ai.clone();
    ai.apply_env();
    tracing::info!(?ai, "settings ready");

    headless::run_headless(HeadlessConfig {
        store,
        settings,
        ai,
    })
    .await?;
    Ok(())
}

fn settings_path_from_args(args: &[String]) -> String {
    args.iter()
        .position(|a| a == "--settings")
        .and_then(|i| args.get(i + 1))
        .cloned()
        .unwrap_or_else(|| DEFAULT_SETTINGS_PATH.to_string())
}

fn print_help() {
    println!("Hat - party word game host");
    println!();
    println!("Usage: hat [--settings <path>]");
    println!();
    println!("Options:");
    println!("  --settings <path>  Settings file (default: {DEFAULT_SETTINGS_PATH})");
    println!("  -h, --help         Show this help");
    println!();
    println!("Environment:");
    println!("  HAT_AI_TOKEN       API token for word generation");
    println!("  HAT_AI_BASE_URL    Chat-completions endpoint");
    println!("  HAT_AI_MODEL       Model identifier");
    println!("  RUST_LOG           Log filter (default: warn)");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_path_from_args() {
        let args: Vec<String> = ["hat", "--settings", "/tmp/x.json"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(settings_path_from_args(&args), "/tmp/x.json");

        let args = vec!["hat".to_string()];
        assert_eq!(settings_path_from_args(&args), DEFAULT_SETTINGS_PATH);
    }
}
