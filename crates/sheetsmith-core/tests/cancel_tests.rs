//! Cancellation skips to the terminal fallback

use sheetsmith_core::{AttemptOutcome, CancellationSignal, RequestState, TerminalState};
use sheetsmith_model::GenerationRequest;
use sheetsmith_test_utils::{financial_profile, setup_orchestrator, StaticTransport, VALID_REPLY};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[tokio::test]
async fn in_flight_call_is_abandoned() {
    let slow = Arc::new(StaticTransport::replying(VALID_REPLY).with_delay(Duration::from_secs(10)));
    let next = Arc::new(StaticTransport::replying(VALID_REPLY));
    let orchestrator = setup_orchestrator(
        &["slow", "next", "template"],
        vec![("slow", slow), ("next", Arc::clone(&next))],
    );
    let request = GenerationRequest::new(financial_profile());
    let cancel = CancellationSignal::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        trigger.cancel();
    });

    let started = Instant::now();
    let result = orchestrator.generate_with_cancel(&request, &cancel).await.unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(result.state, TerminalState::FallbackAccepted);
    assert_eq!(result.trace().len(), 2);
    assert_eq!(result.trace()[0].outcome, AttemptOutcome::Cancelled);
    assert_eq!(result.trace()[1].outcome, AttemptOutcome::FallbackAccepted);
    assert_eq!(next.calls(), 0);
    assert_eq!(
        result.transitions.last(),
        Some(&RequestState::FallbackAccepted)
    );
}

#[tokio::test]
async fn cancelled_before_start_tries_nothing() {
    let remote = Arc::new(StaticTransport::replying(VALID_REPLY));
    let orchestrator = setup_orchestrator(&["remote", "template"], vec![("remote", Arc::clone(&remote))]);
    let cancel = CancellationSignal::new();
    cancel.cancel();

    let result = orchestrator
        .generate_with_cancel(&GenerationRequest::new(financial_profile()), &cancel)
        .await
        .unwrap();

    assert_eq!(remote.calls(), 0);
    assert_eq!(result.trace().len(), 1);
    assert!(result.is_fallback());
}
