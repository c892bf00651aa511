//! Generation result

use crate::attempt::GenerationAttempt;
use crate::state::RequestState;
use serde::{Deserialize, Serialize};
use sheetsmith_model::{DependencyManifest, RequestId, StageModels};
use sheetsmith_providers::{ProviderId, ProviderTier};
use std::fmt;

/// Terminal state of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TerminalState {
    /// A chain provider's candidate passed validation
    Accepted,
    /// Terminal fallback output was accepted
    FallbackAccepted,
}

impl fmt::Display for TerminalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Accepted => f.write_str("ACCEPTED"),
            Self::FallbackAccepted => f.write_str("FALLBACK_ACCEPTED"),
        }
    }
}

/// Outcome of one request
///
/// Exactly one attempt in the trace is accepted: the last one.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    /// Request id
    pub request_id: RequestId,
    /// Terminal state
    pub state: TerminalState,
    /// Accepted provider
    pub provider: ProviderId,
    /// Accepted provider tier
    pub tier: ProviderTier,
    /// Accepted source text
    pub code: String,
    /// External imports found in `code`
    pub manifest: DependencyManifest,
    /// Confidence in [0, 1]
    pub confidence: f64,
    /// Stage models the request resolved to
    pub models: StageModels,
    /// States visited, `PENDING` first
    pub transitions: Vec<RequestState>,
    trace: Vec<GenerationAttempt>,
}

impl GenerationResult {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        request_id: RequestId,
        state: TerminalState,
        manifest: DependencyManifest,
        confidence: f64,
        models: StageModels,
        transitions: Vec<RequestState>,
        mut trace: Vec<GenerationAttempt>,
        accepted: GenerationAttempt,
    ) -> Self {
        let code = accepted
            .code
            .as_ref()
            .map(|c| c.source.clone())
            .unwrap_or_default();
        let provider = accepted.provider.clone();
        let tier = accepted.tier;
        trace.push(accepted);
        Self {
            request_id,
            state,
            provider,
            tier,
            code,
            manifest,
            confidence,
            models,
            transitions,
            trace,
        }
    }

    /// Every attempt, in order; the accepted one is last
    #[inline]
    #[must_use]
    pub fn trace(&self) -> &[GenerationAttempt] {
        &self.trace
    }

    /// The accepted attempt
    #[must_use]
    pub fn accepted(&self) -> &GenerationAttempt {
        &self.trace[self.trace.len() - 1]
    }

    /// Whether the terminal fallback produced the result
    #[inline]
    #[must_use]
    pub fn is_fallback(&self) -> bool {
        self.state == TerminalState::FallbackAccepted
    }

    /// `requirements.txt` text for the accepted code
    #[must_use]
    pub fn requirements(&self) -> String {
        self.manifest.to_requirements()
    }

    /// Pretty JSON rendering
    ///
    /// # Errors
    /// Serialization failure
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
