//! End-to-end orchestration with scripted remote providers

use pretty_assertions::assert_eq;
use sheetsmith_core::{
    AttemptOutcome, ConfidenceScorer, ConfigError, ProviderOrchestrator, ProviderRegistry,
    RequestState, TerminalState,
};
use sheetsmith_model::{GenerationRequest, ModelSelection};
use sheetsmith_providers::{ProviderError, ProviderId, ProviderTier};
use sheetsmith_test_utils::{
    empty_profile, financial_profile, remote_provider, setup_orchestrator, test_config,
    StaticTransport, FORBIDDEN_REPLY, SYNTAX_ERROR_REPLY, UNPARSEABLE_REPLY, VALID_REPLY,
    WILDCARD_FORBIDDEN_REPLY,
};
use sheetsmith_validator::CheckId;
use std::sync::Arc;
use std::time::{Duration, Instant};

#[tokio::test]
async fn unparseable_remote_reply_falls_through_to_financial_template() {
    let transport = Arc::new(StaticTransport::replying(UNPARSEABLE_REPLY));
    let orchestrator = setup_orchestrator(
        &["scripted", "template", "universal_fallback"],
        vec![("scripted", Arc::clone(&transport))],
    );
    let request = GenerationRequest::new(financial_profile());

    let result = orchestrator.generate(&request).await.unwrap();

    assert_eq!(result.state, TerminalState::Accepted);
    assert_eq!(result.provider, ProviderId::template());
    assert_eq!(result.tier, ProviderTier::Template);
    assert!(result.code.contains("Financial Dashboard"));
    assert!(result.accepted().verdict.as_ref().unwrap().is_pass());

    let first = &result.trace()[0];
    assert_eq!(first.outcome, AttemptOutcome::ProviderFailed);
    assert_eq!(first.error.as_ref().unwrap().kind, "no-extractable-code");
    assert!(first.code.is_none());
    assert_eq!(transport.calls(), 1);

    let scorer = ConfidenceScorer::new(orchestrator.config().scoring.clone());
    let metrics = request.profile.metrics();
    let weights = scorer.weights();
    assert!(result.confidence > weights.fallback.ceiling);
    assert!(result.confidence < weights.remote.floor);
    assert!(result.confidence > scorer.score(&metrics, ProviderTier::TerminalFallback, 0));
    assert!(result.confidence < scorer.score(&metrics, ProviderTier::Remote, 0));
}

#[tokio::test]
async fn empty_profile_with_empty_chain_uses_terminal_fallback() {
    let orchestrator = setup_orchestrator(&[], Vec::new());
    let request = GenerationRequest::new(empty_profile());

    let result = orchestrator.generate(&request).await.unwrap();

    assert_eq!(result.state, TerminalState::FallbackAccepted);
    assert!(result.is_fallback());
    assert_eq!(result.tier, ProviderTier::TerminalFallback);
    assert_eq!(result.trace().len(), 1);
    assert_eq!(
        result.transitions,
        vec![RequestState::Pending, RequestState::FallbackAccepted]
    );
    assert!(result.accepted().verdict.as_ref().unwrap().is_pass());
}

#[tokio::test]
async fn forbidden_construct_is_rejected_and_never_accepted() {
    let orchestrator = setup_orchestrator(
        &["scripted", "template"],
        vec![("scripted", Arc::new(StaticTransport::replying(FORBIDDEN_REPLY)))],
    );
    let request = GenerationRequest::new(financial_profile());

    let result = orchestrator.generate(&request).await.unwrap();

    let rejected = &result.trace()[0];
    assert_eq!(rejected.outcome, AttemptOutcome::Rejected);
    assert_eq!(rejected.violated_checks(), vec![CheckId::ForbiddenConstruct]);
    assert_eq!(
        rejected.verdict.as_ref().unwrap().violated_rules(),
        vec!["process-spawn"]
    );
    assert!(rejected.code.as_ref().unwrap().source.contains("os.system"));

    assert_eq!(result.state, TerminalState::Accepted);
    assert_eq!(result.provider, ProviderId::template());
    assert!(!result.code.contains("os.system"));
    assert_eq!(
        result.transitions,
        vec![
            RequestState::Pending,
            RequestState::Trying { index: 0 },
            RequestState::Validating { index: 0 },
            RequestState::Trying { index: 1 },
            RequestState::Validating { index: 1 },
            RequestState::Accepted,
        ]
    );
}

#[tokio::test]
async fn first_passing_provider_wins() {
    let primary = Arc::new(StaticTransport::failing(ProviderError::Auth { status: 401 }));
    let secondary = Arc::new(StaticTransport::replying(VALID_REPLY));
    let orchestrator = setup_orchestrator(
        &["primary", "secondary", "template", "universal_fallback"],
        vec![("primary", primary), ("secondary", Arc::clone(&secondary))],
    );
    let request = GenerationRequest::new(financial_profile())
        .with_models(ModelSelection::new("a-model", "g-model"));

    let result = orchestrator.generate(&request).await.unwrap();

    assert_eq!(result.provider, ProviderId::new("secondary"));
    assert_eq!(result.tier, ProviderTier::Remote);
    assert_eq!(result.trace().len(), 2);
    assert_eq!(result.trace()[0].error.as_ref().unwrap().kind, "auth");
    assert_eq!(
        result.transitions,
        vec![
            RequestState::Pending,
            RequestState::Trying { index: 0 },
            RequestState::Trying { index: 1 },
            RequestState::Validating { index: 1 },
            RequestState::Accepted,
        ]
    );
    assert_eq!(result.models.generation, "g-model");
    assert_eq!(secondary.calls(), 1);
    assert!(result.confidence >= orchestrator.config().scoring.remote.floor);
}

#[tokio::test]
async fn manifest_comes_from_import_scan() {
    let orchestrator = setup_orchestrator(
        &["scripted"],
        vec![("scripted", Arc::new(StaticTransport::replying(VALID_REPLY)))],
    );
    let result = orchestrator
        .generate(&GenerationRequest::new(financial_profile()))
        .await
        .unwrap();

    assert_eq!(result.manifest.names().collect::<Vec<_>>(), vec!["pandas", "streamlit"]);
    assert_eq!(&result.manifest, result.accepted().verdict.as_ref().unwrap().imports());
    assert_eq!(result.requirements(), "pandas\nstreamlit\n");
}

#[tokio::test]
async fn syntax_error_is_rejected_on_syntax_check() {
    let orchestrator = setup_orchestrator(
        &["scripted"],
        vec![("scripted", Arc::new(StaticTransport::replying(SYNTAX_ERROR_REPLY)))],
    );
    let result = orchestrator
        .generate(&GenerationRequest::new(empty_profile()))
        .await
        .unwrap();

    assert!(result.trace()[0].violated_checks().contains(&CheckId::Syntax));
    assert_eq!(result.state, TerminalState::FallbackAccepted);
}

#[tokio::test]
async fn slow_provider_times_out_and_chain_continues() {
    let slow = Arc::new(StaticTransport::replying(VALID_REPLY).with_delay(Duration::from_secs(5)));
    let mut registry = ProviderRegistry::new();
    registry.register(remote_provider("slow", slow)).unwrap();
    let mut config = test_config(&["slow", "template"]);
    config.timeouts.per_provider.insert("slow".to_string(), 50);
    let orchestrator = ProviderOrchestrator::new(config, &registry).unwrap();

    let started = Instant::now();
    let result = orchestrator
        .generate(&GenerationRequest::new(financial_profile()))
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(4));
    let error = result.trace()[0].error.as_ref().unwrap();
    assert_eq!(error.kind, "timeout");
    assert_eq!(error.message, "timed out after 50ms");
    assert_eq!(result.provider, ProviderId::template());
}

#[tokio::test]
async fn wildcard_imported_process_call_is_never_accepted() {
    let orchestrator = setup_orchestrator(
        &["scripted", "template"],
        vec![(
            "scripted",
            Arc::new(StaticTransport::replying(WILDCARD_FORBIDDEN_REPLY)),
        )],
    );
    let request = GenerationRequest::new(financial_profile());

    let result = orchestrator.generate(&request).await.unwrap();

    let rejected = &result.trace()[0];
    assert_eq!(rejected.outcome, AttemptOutcome::Rejected);
    assert_eq!(rejected.violated_checks(), vec![CheckId::ForbiddenConstruct]);
    assert_eq!(
        rejected.verdict.as_ref().unwrap().violated_rules(),
        vec!["process-spawn"]
    );

    assert_eq!(result.state, TerminalState::Accepted);
    assert_eq!(result.provider, ProviderId::template());
    assert!(!result.code.contains("system("));
}

#[tokio::test]
async fn every_attempt_is_logged() {
    let orchestrator = setup_orchestrator(
        &["scripted", "template"],
        vec![("scripted", Arc::new(StaticTransport::replying(FORBIDDEN_REPLY)))],
    );
    let request = GenerationRequest::new(financial_profile());
    let result = orchestrator.generate(&request).await.unwrap();

    let events = orchestrator.log().events_for(request.id);
    assert_eq!(events.len(), result.trace().len());
    assert_eq!(events[0].outcome, AttemptOutcome::Rejected);
    assert_eq!(events[0].detail, "forbidden-construct");
    assert_eq!(events[1].outcome, AttemptOutcome::Accepted);
    assert!(orchestrator.log().verify_integrity().is_ok());
}

#[tokio::test]
async fn result_serializes_to_json() {
    let orchestrator = setup_orchestrator(&["template"], Vec::new());
    let result = orchestrator
        .generate(&GenerationRequest::new(financial_profile()))
        .await
        .unwrap();

    let json: serde_json::Value = serde_json::from_str(&result.to_json_pretty().unwrap()).unwrap();
    assert_eq!(json["state"], "ACCEPTED");
    assert_eq!(json["tier"], "template");
    assert_eq!(json["provider"], "template");
    assert_eq!(json["trace"].as_array().unwrap().len(), 1);
    assert_eq!(json["trace"][0]["outcome"], "accepted");
    assert_eq!(json["transitions"][1]["state"], "TRYING");
}

#[test]
fn unknown_provider_is_a_construction_error() {
    let err = ProviderOrchestrator::new(test_config(&["nope", "template"]), &ProviderRegistry::new())
        .unwrap_err();
    assert!(matches!(err, ConfigError::UnknownProvider(ref id) if id == "nope"));
}

#[test]
fn chain_reports_terminal_last() {
    let orchestrator = setup_orchestrator(&["template", "universal_fallback"], Vec::new());
    let chain = orchestrator.chain();
    assert_eq!(chain.len(), 2);
    assert_eq!(chain[0].id, ProviderId::template());
    assert_eq!(chain[1].tier, ProviderTier::TerminalFallback);
}
