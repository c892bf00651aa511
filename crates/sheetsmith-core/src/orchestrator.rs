//! Provider orchestrator
//!
//! Tries each configured provider in priority order under its time budget,
//! validates every candidate, and accepts the first that passes. When the
//! chain is exhausted or the request is cancelled, the terminal fallback is
//! accepted unconditionally. Only a failure to build that fallback is
//! returned as an error.

use crate::attempt::{AttemptOutcome, GenerationAttempt, PendingAttempt};
use crate::cancel::CancellationSignal;
use crate::config::OrchestratorConfig;
use crate::error::{ConfigError, OrchestratorError};
use crate::log::AttemptLog;
use crate::registry::ProviderRegistry;
use crate::result::{GenerationResult, TerminalState};
use crate::scorer::ConfidenceScorer;
use crate::state::{RequestState, RequestTracker};
use sheetsmith_model::GenerationRequest;
use sheetsmith_providers::{
    GenerationProvider, ProviderError, ProviderId, ProviderTier, UniversalFallbackProvider,
};
use sheetsmith_validator::{OutputValidator, Verdict};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, info_span, warn, Instrument};

/// Resolved chain entry, as reported by [`ProviderOrchestrator::chain`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainLink {
    /// Provider id
    pub id: ProviderId,
    /// Provider tier
    pub tier: ProviderTier,
    /// Time budget
    pub timeout: Duration,
}

#[derive(Debug)]
struct ChainEntry {
    id: ProviderId,
    provider: Arc<GenerationProvider>,
    timeout: Duration,
}

/// Runs requests through the provider chain
#[derive(Debug)]
pub struct ProviderOrchestrator {
    config: Arc<OrchestratorConfig>,
    chain: Vec<ChainEntry>,
    terminal: UniversalFallbackProvider,
    validator: OutputValidator,
    scorer: ConfidenceScorer,
    log: Arc<AttemptLog>,
}

impl ProviderOrchestrator {
    /// Validate `config` and resolve its priority list against `registry`
    ///
    /// `universal_fallback` may close the list; it is always appended when
    /// absent.
    ///
    /// # Errors
    /// Any [`ConfigError`]; unknown ids are reported here, never per request
    pub fn new(config: OrchestratorConfig, registry: &ProviderRegistry) -> Result<Self, ConfigError> {
        config.validate()?;

        let mut chain = Vec::new();
        for id in config.priority_ids() {
            if id.is_terminal() {
                continue;
            }
            let provider = registry
                .get(&id)
                .ok_or_else(|| ConfigError::UnknownProvider(id.to_string()))?;
            chain.push(ChainEntry {
                timeout: config.timeout_for(&id),
                provider: Arc::clone(provider),
                id,
            });
        }

        let validator = OutputValidator::new(config.validator.clone());
        let scorer = ConfidenceScorer::new(config.scoring.clone());
        info!(
            chain = ?chain.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(),
            "orchestrator ready"
        );

        Ok(Self {
            config: Arc::new(config),
            chain,
            terminal: UniversalFallbackProvider::new(),
            validator,
            scorer,
            log: Arc::new(AttemptLog::new()),
        })
    }

    /// Share an existing audit log
    #[must_use]
    pub fn with_log(mut self, log: Arc<AttemptLog>) -> Self {
        self.log = log;
        self
    }

    /// Audit log
    #[inline]
    #[must_use]
    pub fn log(&self) -> &Arc<AttemptLog> {
        &self.log
    }

    /// Frozen configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Output validator in use
    #[inline]
    #[must_use]
    pub fn validator(&self) -> &OutputValidator {
        &self.validator
    }

    /// Resolved chain, terminal fallback last
    #[must_use]
    pub fn chain(&self) -> Vec<ChainLink> {
        self.chain
            .iter()
            .map(|e| ChainLink {
                id: e.id.clone(),
                tier: e.provider.tier(),
                timeout: e.timeout,
            })
            .chain(std::iter::once(ChainLink {
                id: ProviderId::universal_fallback(),
                tier: ProviderTier::TerminalFallback,
                timeout: Duration::ZERO,
            }))
            .collect()
    }

    /// Produce a result for `request`
    ///
    /// # Errors
    /// `FallbackConstruction` only; provider and validation failures are
    /// recorded in the trace
    pub async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResult, OrchestratorError> {
        self.generate_with_cancel(request, &CancellationSignal::new()).await
    }

    /// Produce a result, abandoning the chain when `cancel` fires
    ///
    /// # Errors
    /// See [`Self::generate`]
    pub async fn generate_with_cancel(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationSignal,
    ) -> Result<GenerationResult, OrchestratorError> {
        let span = info_span!("generate", request_id = %request.id);
        self.run(request, cancel).instrument(span).await
    }

    async fn run(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationSignal,
    ) -> Result<GenerationResult, OrchestratorError> {
        let mut tracker = RequestTracker::new();
        let mut trace = Vec::with_capacity(self.chain.len() + 1);

        for (index, entry) in self.chain.iter().enumerate() {
            if cancel.is_cancelled() {
                break;
            }
            tracker.advance(RequestState::Trying { index })?;
            let tier = entry.provider.tier();
            let pending = PendingAttempt::start(entry.id.clone(), tier);
            info!(provider = %entry.id, %tier, index, "trying provider");

            let produced = tokio::select! {
                biased;
                () = cancel.cancelled() => Err(ProviderError::Cancelled),
                res = tokio::time::timeout(entry.timeout, entry.provider.generate(request)) => {
                    res.unwrap_or_else(|_| Err(ProviderError::Timeout {
                        budget_ms: u64::try_from(entry.timeout.as_millis()).unwrap_or(u64::MAX),
                    }))
                }
            };

            let code = match produced {
                Ok(code) => code,
                Err(err) => {
                    warn!(
                        provider = %entry.id,
                        kind = err.kind(),
                        retryable = err.is_retryable(),
                        error = %err,
                        "provider failed"
                    );
                    self.record(request, &mut trace, pending.failed(&err));
                    if matches!(err, ProviderError::Cancelled) {
                        break;
                    }
                    continue;
                }
            };

            tracker.advance(RequestState::Validating { index })?;
            let verdict = self.validator.validate(&code);
            debug!(
                provider = %entry.id,
                violations = verdict.violations().len(),
                advisories = verdict.advisory_count(),
                "candidate validated"
            );

            if verdict.is_pass() {
                tracker.advance(RequestState::Accepted)?;
                info!(provider = %entry.id, %tier, "candidate accepted");
                let attempt = pending.checked(code, verdict, AttemptOutcome::Accepted);
                return Ok(self.finish(request, TerminalState::Accepted, tracker, trace, attempt));
            }

            warn!(
                provider = %entry.id,
                checks = ?verdict.violated_checks(),
                rules = ?verdict.violated_rules(),
                "candidate rejected"
            );
            self.record(request, &mut trace, pending.checked(code, verdict, AttemptOutcome::Rejected));
        }

        tracker.advance(RequestState::FallbackAccepted)?;
        let attempt = self.run_terminal(request)?;
        Ok(self.finish(request, TerminalState::FallbackAccepted, tracker, trace, attempt))
    }

    fn run_terminal(&self, request: &GenerationRequest) -> Result<GenerationAttempt, OrchestratorError> {
        let pending = PendingAttempt::start(ProviderId::universal_fallback(), ProviderTier::TerminalFallback);
        info!("falling back to universal provider");

        let code = self.terminal.generate(&request.profile)?;
        let verdict = self.validator.validate(&code);
        if !verdict.is_pass() {
            error!(
                checks = ?verdict.violated_checks(),
                violations = ?verdict.violations(),
                "terminal fallback output failed validation"
            );
        }
        Ok(pending.checked(code, verdict, AttemptOutcome::FallbackAccepted))
    }

    fn record(&self, request: &GenerationRequest, trace: &mut Vec<GenerationAttempt>, attempt: GenerationAttempt) {
        self.log.append(request.id, &attempt);
        trace.push(attempt);
    }

    fn finish(
        &self,
        request: &GenerationRequest,
        state: TerminalState,
        tracker: RequestTracker,
        trace: Vec<GenerationAttempt>,
        accepted: GenerationAttempt,
    ) -> GenerationResult {
        self.log.append(request.id, &accepted);

        let verdict = accepted.verdict.as_ref();
        let manifest = verdict.map(|v| v.imports().clone()).unwrap_or_default();
        let advisories = verdict.map_or(0, Verdict::advisory_count);
        let confidence = self
            .scorer
            .score(&request.profile.metrics(), accepted.tier, advisories);

        info!(
            provider = %accepted.provider,
            tier = %accepted.tier,
            %state,
            confidence,
            attempts = trace.len() + 1,
            "request complete"
        );

        GenerationResult::new(
            request.id,
            state,
            manifest,
            confidence,
            request.models.resolve(&self.config.models),
            tracker.into_history(),
            trace,
            accepted,
        )
    }
}
