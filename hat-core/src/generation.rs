//! Retry controller for AI word generation.
//!
//! A single request to the model rarely returns exactly the number of usable
//! words asked for. [`WordGenerator`] calls a [`WordSource`] repeatedly,
//! growing an exclusion set as it goes, until the target count is reached
//! or the attempt budget runs out. Attempts run one after another, because
//! each one depends on the words gathered by the previous one.
//!
//! A short result is not an error: it comes back as an incomplete
//! [`GenerationOutcome`]. Only a failure with nothing gathered yet is
//! reported as a [`GenerationError`].

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::watch;
use wordgen::WordClient;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Errors from a generation session.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error(transparent)]
    Client(#[from] wordgen::Error),

    #[error("Generation was cancelled")]
    Cancelled,

    #[error("Invalid generation request: {0}")]
    InvalidRequest(String),
}

impl GenerationError {
    pub fn user_message(&self) -> String {
        match self {
            GenerationError::Client(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

/// Anything that can produce a batch of new words for a theme.
#[async_trait]
pub trait WordSource: Send + Sync {
    /// Ask for `count` words on `theme`, none of which may be in `excluded`.
    async fn generate(
        &self,
        theme: &str,
        count: usize,
        excluded: &HashSet<String>,
    ) -> Result<Vec<String>, wordgen::Error>;
}

#[async_trait]
impl WordSource for WordClient {
    async fn generate(
        &self,
        theme: &str,
        count: usize,
        excluded: &HashSet<String>,
    ) -> Result<Vec<String>, wordgen::Error> {
        self.generate_words(theme, count, excluded).await
    }
}

#[async_trait]
impl<S: WordSource + ?Sized> WordSource for Arc<S> {
    async fn generate(
        &self,
        theme: &str,
        count: usize,
        excluded: &HashSet<String>,
    ) -> Result<Vec<String>, wordgen::Error> {
        (**self).generate(theme, count, excluded).await
    }
}

/// What to generate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationRequest {
    pub theme: String,
    pub target_count: usize,
    pub max_attempts: u32,
}

impl GenerationRequest {
    pub fn new(theme: impl Into<String>, target_count: usize) -> Self {
        Self {
            theme: theme.into(),
            target_count,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    fn validate(&self) -> Result<(), GenerationError> {
        if self.theme.trim().is_empty() {
            return Err(GenerationError::InvalidRequest("theme is empty".to_string()));
        }
        if self.target_count == 0 {
            return Err(GenerationError::InvalidRequest(
                "target count must be positive".to_string(),
            ));
        }
        if self.max_attempts == 0 {
            return Err(GenerationError::InvalidRequest(
                "at least one attempt is required".to_string(),
            ));
        }
        Ok(())
    }
}

/// Result of a generation session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationOutcome {
    /// Unique words, in the order they were produced.
    pub words: Vec<String>,
    /// Whether `words.len()` reached the target.
    pub complete: bool,
    /// Attempts made, including those of any session this one continued.
    pub attempts: u32,
}

/// Cancels a running generation session from another task.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelHandle {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once [`CancelHandle::cancel`] has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.tx.subscribe();
        // The sender lives in `self`, so this only returns once cancelled.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

/// Runs bounded generation sessions against a [`WordSource`].
pub struct WordGenerator<S> {
    source: S,
}

impl<S: WordSource> WordGenerator<S> {
    pub fn new(source: S) -> Self {
        Self { source }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Generate words for `request` from scratch.
    ///
    /// `on_progress(attempt, accumulated)` is called before every attempt.
    pub async fn generate<F>(
        &self,
        request: &GenerationRequest,
        on_progress: F,
    ) -> Result<GenerationOutcome, GenerationError>
    where
        F: FnMut(u32, usize),
    {
        self.run(request, &[], 0, on_progress, None).await
    }

    pub async fn generate_with_cancel<F>(
        &self,
        request: &GenerationRequest,
        on_progress: F,
        cancel: &CancelHandle,
    ) -> Result<GenerationOutcome, GenerationError>
    where
        F: FnMut(u32, usize),
    {
        self.run(request, &[], 0, on_progress, Some(cancel)).await
    }

    /// Resume a session that ended short of its target.
    ///
    /// `previous_words` seed both the result and the exclusion set. Attempt
    /// numbers, in progress reports and in the outcome, continue from
    /// `previous_attempts`.
    pub async fn continue_generation<F>(
        &self,
        request: &GenerationRequest,
        previous_words: &[String],
        previous_attempts: u32,
        on_progress: F,
    ) -> Result<GenerationOutcome, GenerationError>
    where
        F: FnMut(u32, usize),
    {
        self.run(request, previous_words, previous_attempts, on_progress, None)
            .await
    }

    pub async fn continue_generation_with_cancel<F>(
        &self,
        request: &GenerationRequest,
        previous_words: &[String],
        previous_attempts: u32,
        on_progress: F,
        cancel: &CancelHandle,
    ) -> Result<GenerationOutcome, GenerationError>
    where
        F: FnMut(u32, usize),
    {
        self.run(
            request,
            previous_words,
            previous_attempts,
            on_progress,
            Some(cancel),
        )
        .await
    }

    async fn run<F>(
        &self,
        request: &GenerationRequest,
        previous_words: &[String],
        previous_attempts: u32,
        mut on_progress: F,
        cancel: Option<&CancelHandle>,
    ) -> Result<GenerationOutcome, GenerationError>
    where
        F: FnMut(u32, usize),
    {
        request.validate()?;
        let target = request.target_count;

        let mut words = wordgen::normalize_words(previous_words, &HashSet::new());
        let mut excluded: HashSet<String> = words.iter().cloned().collect();
        let mut attempts = 0;

        while attempts < request.max_attempts && words.len() < target {
            if cancel.is_some_and(CancelHandle::is_cancelled) {
                return finish_cancelled(words, target, previous_attempts + attempts);
            }

            attempts += 1;
            let attempt = previous_attempts + attempts;
            on_progress(attempt, words.len());

            let needed = target - words.len();
            tracing::info!(attempt, needed, theme = %request.theme, "requesting words");

            let call = self.source.generate(&request.theme, needed, &excluded);
            let result = match cancel {
                Some(cancel) => tokio::select! {
                    biased;
                    _ = cancel.cancelled() => None,
                    result = call => Some(result),
                },
                None => Some(call.await),
            };

            match result {
                None => return finish_cancelled(words, target, attempt),
                Some(Ok(batch)) => {
                    let fresh = wordgen::normalize_words(batch, &excluded);
                    tracing::debug!(attempt, fresh = fresh.len(), "attempt succeeded");
                    excluded.extend(fresh.iter().cloned());
                    words.extend(fresh);
                }
                Some(Err(error)) => {
                    tracing::warn!(attempt, %error, gathered = words.len(), "attempt failed");
                    if words.is_empty() {
                        return Err(error.into());
                    }
                    return Ok(GenerationOutcome {
                        complete: words.len() >= target,
                        words,
                        attempts: attempt,
                    });
                }
            }
        }

        let complete = words.len() >= target;
        if !complete {
            tracing::warn!(
                gathered = words.len(),
                target,
                "generation ended short of target"
            );
        }
        Ok(GenerationOutcome {
            words,
            complete,
            attempts: previous_attempts + attempts,
        })
    }
}

fn finish_cancelled(
    words: Vec<String>,
    target: usize,
    attempts: u32,
) -> Result<GenerationOutcome, GenerationError> {
    tracing::info!(gathered = words.len(), "generation cancelled");
    if words.is_empty() {
        return Err(GenerationError::Cancelled);
    }
    Ok(GenerationOutcome {
        complete: words.len() >= target,
        words,
        attempts,
    })
}

/// What the word-generation dialog shows.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GenerationState {
    #[default]
    Idle,
    Loading {
        attempt: u32,
        generated: usize,
    },
    Success {
        words: Vec<String>,
    },
    /// Fewer words than asked for; the user may accept them or continue.
    PartialSuccess {
        words: Vec<String>,
        attempts: u32,
        target_count: usize,
    },
    Error {
        message: String,
    },
}

impl GenerationState {
    pub fn from_result(
        result: &Result<GenerationOutcome, GenerationError>,
        target_count: usize,
    ) -> Self {
        match result {
            Ok(outcome) if outcome.complete => GenerationState::Success {
                words: outcome.words.clone(),
            },
            Ok(outcome) => GenerationState::PartialSuccess {
                words: outcome.words.clone(),
                attempts: outcome.attempts,
                target_count,
            },
            Err(error) => GenerationState::Error {
                message: error.user_message(),
            },
        }
    }

    /// Words ready to be saved as a pack, if any.
    pub fn words(&self) -> Option<&[String]> {
        match self {
            GenerationState::Success { words } | GenerationState::PartialSuccess { words, .. } => {
                Some(words)
            }
            GenerationState::Idle
            | GenerationState::Loading { .. }
            | GenerationState::Error { .. } => None,
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(self, GenerationState::Loading { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_validation() {
        assert!(GenerationRequest::new("space", 10).validate().is_ok());
        assert!(GenerationRequest::new("  ", 10).validate().is_err());
        assert!(GenerationRequest::new("space", 0).validate().is_err());
        assert!(GenerationRequest::new("space", 10)
            .with_max_attempts(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_state_from_result() {
        let ok = Ok(GenerationOutcome {
            words: vec!["comet".into()],
            complete: true,
            attempts: 1,
        });
        assert_eq!(
            GenerationState::from_result(&ok, 1),
            GenerationState::Success {
                words: vec!["comet".into()]
            }
        );

        let partial = Ok(GenerationOutcome {
            words: vec!["comet".into()],
            complete: false,
            attempts: 3,
        });
        let state = GenerationState::from_result(&partial, 5);
        assert!(matches!(
            state,
            GenerationState::PartialSuccess { attempts: 3, target_count: 5, .. }
        ));
        assert_eq!(state.words().map(<[String]>::len), Some(1));

        let err = Err(GenerationError::Client(wordgen::Error::NoApiKey));
        let state = GenerationState::from_result(&err, 5);
        assert!(matches!(state, GenerationState::Error { ref message } if message.contains("token")));
        assert!(state.words().is_none());
    }

    #[test]
    fn test_loading_is_busy() {
        assert!(GenerationState::Loading { attempt: 1, generated: 0 }.is_busy());
        assert!(!GenerationState::Idle.is_busy());
    }

    #[tokio::test]
    async fn test_cancel_handle() {
        let handle = CancelHandle::new();
        assert!(!handle.is_cancelled());
        let waiter = handle.clone();
        let task = tokio::spawn(async move { waiter.cancelled().await });
        handle.cancel();
        task.await.unwrap();
        assert!(handle.is_cancelled());
    }
}
