//! Settings persistence.
//!
//! The AI endpoint configuration and the last game setup are stored together
//! in one JSON file. A missing file is not an error: the defaults are used
//! until the user saves.

use crate::settings::HatSettings;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use wordgen::WordClient;

/// Errors from persistence operations.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Chat-completion endpoint configuration.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiSettings {
    pub base_url: String,
    pub model: String,
    pub token: String,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            base_url: wordgen::DEFAULT_BASE_URL.to_string(),
            model: wordgen::DEFAULT_MODEL.to_string(),
            token: String::new(),
        }
    }
}

impl fmt::Debug for AiSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = if self.token.is_empty() { "" } else { "<redacted>" };
        f.debug_struct("AiSettings")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("token", &token)
            .finish()
    }
}

impl AiSettings {
    /// Defaults overridden by `HAT_AI_BASE_URL`, `HAT_AI_MODEL` and `HAT_AI_TOKEN`.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        settings.apply_env();
        settings
    }

    /// Override fields from the environment where the variables are set.
    pub fn apply_env(&mut self) {
        if let Some(base_url) = non_empty_var("HAT_AI_BASE_URL") {
            self.base_url = base_url;
        }
        if let Some(model) = non_empty_var("HAT_AI_MODEL") {
            self.model = model;
        }
        if let Some(token) = non_empty_var("HAT_AI_TOKEN") {
            self.token = token;
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.token.trim().is_empty()
    }

    /// Build a client for these settings.
    pub fn client(&self) -> Result<WordClient, wordgen::Error> {
        if !self.is_configured() {
            return Err(wordgen::Error::NoApiKey);
        }
        Ok(WordClient::new(self.token.trim())?
            .with_base_url(self.base_url.trim())
            .with_model(self.model.trim()))
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Everything written to the settings file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoredSettings {
    pub ai: AiSettings,
    pub game: HatSettings,
}

/// JSON-file backed settings storage.
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings, falling back to the defaults when the file is absent.
    pub async fn load(&self) -> Result<StoredSettings, SettingsError> {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no settings file, using defaults");
                return Ok(StoredSettings::default());
            }
            Err(e) => return Err(e.into()),
        };
        let settings = serde_json::from_str(&content)?;
        tracing::debug!(path = %self.path.display(), "settings loaded");
        Ok(settings)
    }

    /// Write settings as pretty JSON, creating parent directories.
    pub async fn save(&self, settings: &StoredSettings) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let content = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, content).await?;
        tracing::info!(path = %self.path.display(), "settings saved");
        Ok(())
    }
}
