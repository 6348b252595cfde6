//! Retry controller behavior against a scripted word source.

use hat_core::testing::{ScriptedReply, ScriptedWordSource};
use hat_core::{
    CancelHandle, GenerationError, GenerationRequest, GenerationState, WordGenerator,
};
use std::sync::Arc;
use std::time::Duration;

fn names(prefix: &str, range: std::ops::RangeInclusive<usize>) -> Vec<String> {
    range.map(|i| format!("{prefix}{i:02}")).collect()
}

#[tokio::test]
async fn test_partial_result_after_late_failure() {
    let mut second = names("planet", 7..=9);
    second.push("planet01".to_string());

    let source = ScriptedWordSource::new(vec![
        ScriptedReply::Words(names("planet", 1..=6)),
        ScriptedReply::Words(second),
        ScriptedReply::Error(wordgen::Error::Timeout),
    ]);
    let generator = WordGenerator::new(source);
    let request = GenerationRequest::new("space", 10);

    let mut progress = Vec::new();
    let outcome = generator
        .generate(&request, |attempt, gathered| progress.push((attempt, gathered)))
        .await
        .expect("a partial result is not an error");

    assert!(!outcome.complete);
    assert_eq!(outcome.words.len(), 9);
    assert_eq!(outcome.attempts, 3);
    assert_eq!(progress, vec![(1, 0), (2, 6), (3, 9)]);

    let calls = generator.source().calls();
    assert_eq!(calls.iter().map(|c| c.count).collect::<Vec<_>>(), vec![10, 4, 1]);
    assert!(calls[0].excluded.is_empty());
    assert_eq!(calls[2].excluded.len(), 9);

    let state = GenerationState::from_result(&Ok(outcome), request.target_count);
    assert!(matches!(
        state,
        GenerationState::PartialSuccess { target_count: 10, attempts: 3, .. }
    ));
}

#[tokio::test]
async fn test_first_attempt_failure_is_an_error() {
    let source = ScriptedWordSource::new(vec![ScriptedReply::Error(wordgen::parse_api_error(
        401,
        r#"{"error":{"message":"bad key","code":401}}"#,
    ))]);
    let generator = WordGenerator::new(source);

    let result = generator
        .generate(&GenerationRequest::new("space", 5), |_, _| {})
        .await;

    let Err(error) = &result else {
        panic!("expected an error, got {result:?}");
    };
    assert!(matches!(error, GenerationError::Client(wordgen::Error::Api { code: 401, .. })));
    assert_eq!(generator.source().call_count(), 1);
    assert!(matches!(
        GenerationState::from_result(&result, 5),
        GenerationState::Error { .. }
    ));
}

#[tokio::test]
async fn test_stops_once_target_reached() {
    let source = ScriptedWordSource::new(vec![
        ScriptedReply::Words(names("fruit", 1..=3)),
        ScriptedReply::Words(names("fruit", 4..=8)),
        ScriptedReply::Words(names("fruit", 9..=12)),
    ]);
    let generator = WordGenerator::new(source);

    let outcome = generator
        .generate(&GenerationRequest::new("food", 5), |_, _| {})
        .await
        .unwrap();

    assert!(outcome.complete);
    assert_eq!(outcome.attempts, 2);
    assert_eq!(outcome.words, names("fruit", 1..=8));
    assert_eq!(generator.source().call_count(), 2);
}

#[tokio::test]
async fn test_filters_bad_words_and_gives_up_after_budget() {
    let source = ScriptedWordSource::new(vec![
        ScriptedReply::words(["  river ", "ox", "", "river", "mountain"]),
        ScriptedReply::words(["mountain", "River"]),
        ScriptedReply::words(["valley"]),
        ScriptedReply::words(["canyon"]),
    ]);
    let generator = WordGenerator::new(source);

    let outcome = generator
        .generate(&GenerationRequest::new("nature", 6), |_, _| {})
        .await
        .unwrap();

    assert!(!outcome.complete);
    assert_eq!(outcome.attempts, 3);
    assert_eq!(outcome.words, vec!["river", "mountain", "River", "valley"]);
    assert_eq!(generator.source().call_count(), 3);
}

#[tokio::test]
async fn test_continue_generation_builds_on_previous_words() {
    let source = ScriptedWordSource::new(vec![
        ScriptedReply::words(["comet", "nebula", "quasar"]),
        ScriptedReply::words(["pulsar"]),
    ]);
    let generator = WordGenerator::new(source);
    let previous = vec!["planet".to_string(), "comet".to_string()];
    let request = GenerationRequest::new("space", 5);

    let mut progress = Vec::new();
    let outcome = generator
        .continue_generation(&request, &previous, 3, |a, g| progress.push((a, g)))
        .await
        .unwrap();

    assert!(outcome.complete);
    assert_eq!(outcome.words, vec!["planet", "comet", "nebula", "quasar", "pulsar"]);
    assert_eq!(outcome.attempts, 5);
    assert_eq!(progress, vec![(4, 2), (5, 4)]);

    let calls = generator.source().calls();
    assert_eq!(calls[0].count, 3);
    assert!(calls[0].excluded.contains("planet"));
    assert!(calls[0].excluded.contains("comet"));
}

#[tokio::test]
async fn test_continue_generation_already_complete_makes_no_calls() {
    let generator = WordGenerator::new(ScriptedWordSource::default());
    let previous = names("word", 1..=4);

    let outcome = generator
        .continue_generation(&GenerationRequest::new("misc", 3), &previous, 1, |_, _| {})
        .await
        .unwrap();

    assert!(outcome.complete);
    assert_eq!(outcome.words.len(), 4);
    assert_eq!(outcome.attempts, 1);
    assert_eq!(generator.source().call_count(), 0);
}

#[tokio::test]
async fn test_invalid_request_is_rejected() {
    let generator = WordGenerator::new(ScriptedWordSource::default());
    let result = generator
        .generate(&GenerationRequest::new("", 5), |_, _| {})
        .await;
    assert!(matches!(result, Err(GenerationError::InvalidRequest(_))));
    assert_eq!(generator.source().call_count(), 0);
}

#[tokio::test]
async fn test_cancel_keeps_partial_words() {
    let source = Arc::new(ScriptedWordSource::new(vec![
        ScriptedReply::words(["anchor", "harbor"]),
        ScriptedReply::Hang,
    ]));
    let generator = WordGenerator::new(Arc::clone(&source));
    let cancel = CancelHandle::new();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        canceller.cancel();
    });

    let outcome = generator
        .generate_with_cancel(&GenerationRequest::new("sea", 5), |_, _| {}, &cancel)
        .await
        .unwrap();

    assert!(!outcome.complete);
    assert_eq!(outcome.words, vec!["anchor", "harbor"]);
    assert_eq!(outcome.attempts, 2);
    assert_eq!(source.call_count(), 2);
}

#[tokio::test]
async fn test_cancel_before_any_words_is_an_error() {
    let generator = WordGenerator::new(ScriptedWordSource::new(vec![ScriptedReply::Hang]));
    let cancel = CancelHandle::new();

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let result = generator
        .generate_with_cancel(&GenerationRequest::new("sea", 5), |_, _| {}, &cancel)
        .await;
    assert!(matches!(result, Err(GenerationError::Cancelled)));
}

#[tokio::test]
async fn test_already_cancelled_makes_no_calls() {
    let generator = WordGenerator::new(ScriptedWordSource::default());
    let cancel = CancelHandle::new();
    cancel.cancel();

    let result = generator
        .continue_generation_with_cancel(
            &GenerationRequest::new("sea", 5),
            &["anchor".to_string()],
            1,
            |_, _| {},
            &cancel,
        )
        .await
        .unwrap();

    assert_eq!(result.words, vec!["anchor"]);
    assert_eq!(result.attempts, 1);
    assert_eq!(generator.source().call_count(), 0);
}
