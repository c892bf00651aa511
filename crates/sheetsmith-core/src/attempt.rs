//! Attempt trace entries
//!
//! One [`GenerationAttempt`] is recorded per provider try, whatever its
//! outcome, and kept in the result's trace for auditing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sheetsmith_model::GeneratedCode;
use sheetsmith_providers::{ProviderError, ProviderId, ProviderTier};
use sheetsmith_validator::{CheckId, Verdict};
use std::fmt;
use std::time::Instant;

/// How an attempt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AttemptOutcome {
    /// Candidate passed validation
    Accepted,
    /// Terminal fallback output, accepted unconditionally
    FallbackAccepted,
    /// Candidate failed validation
    Rejected,
    /// Provider produced no candidate
    ProviderFailed,
    /// Request cancelled while the provider ran
    Cancelled,
}

impl AttemptOutcome {
    /// Stable identifier
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::FallbackAccepted => "fallback-accepted",
            Self::Rejected => "rejected",
            Self::ProviderFailed => "provider-failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether the attempt produced the result
    #[inline]
    #[must_use]
    pub fn is_accepted(self) -> bool {
        matches!(self, Self::Accepted | Self::FallbackAccepted)
    }
}

impl fmt::Display for AttemptOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider-level failure as recorded in the trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptError {
    /// Stable error kind (`timeout`, `auth`, ...)
    pub kind: String,
    /// Human-readable message
    pub message: String,
}

impl From<&ProviderError> for AttemptError {
    fn from(err: &ProviderError) -> Self {
        Self {
            kind: err.kind().to_string(),
            message: err.to_string(),
        }
    }
}

/// One provider try
#[derive(Debug, Clone, Serialize)]
pub struct GenerationAttempt {
    /// Provider id
    pub provider: ProviderId,
    /// Provider tier
    pub tier: ProviderTier,
    /// Emitted candidate; absent on provider-level failure
    pub code: Option<GeneratedCode>,
    /// Wall-clock start
    pub started_at: DateTime<Utc>,
    /// Duration of the try
    pub elapsed_ms: u64,
    /// Outcome
    pub outcome: AttemptOutcome,
    /// Provider failure, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<AttemptError>,
    /// Validator verdict, once checked
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
}

impl GenerationAttempt {
    /// Checks the candidate violated
    #[must_use]
    pub fn violated_checks(&self) -> Vec<CheckId> {
        self.verdict.as_ref().map(Verdict::violated_checks).unwrap_or_default()
    }

    /// Short description for logs: error kind or violated check ids
    #[must_use]
    pub fn detail(&self) -> String {
        if let Some(error) = &self.error {
            return error.kind.clone();
        }
        self.violated_checks()
            .iter()
            .map(|c| c.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Attempt in progress; consumed by one of the finishing methods
#[derive(Debug)]
pub(crate) struct PendingAttempt {
    provider: ProviderId,
    tier: ProviderTier,
    started_at: DateTime<Utc>,
    clock: Instant,
}

impl PendingAttempt {
    pub(crate) fn start(provider: ProviderId, tier: ProviderTier) -> Self {
        Self {
            provider,
            tier,
            started_at: Utc::now(),
            clock: Instant::now(),
        }
    }

    fn finish(
        self,
        code: Option<GeneratedCode>,
        outcome: AttemptOutcome,
        error: Option<AttemptError>,
        verdict: Option<Verdict>,
    ) -> GenerationAttempt {
        GenerationAttempt {
            provider: self.provider,
            tier: self.tier,
            code,
            started_at: self.started_at,
            elapsed_ms: u64::try_from(self.clock.elapsed().as_millis()).unwrap_or(u64::MAX),
            outcome,
            error,
            verdict,
        }
    }

    /// Candidate validated; `outcome` says whether it was accepted
    pub(crate) fn checked(
        self,
        code: GeneratedCode,
        verdict: Verdict,
        outcome: AttemptOutcome,
    ) -> GenerationAttempt {
        self.finish(Some(code), outcome, None, Some(verdict))
    }

    /// Provider produced no candidate
    pub(crate) fn failed(self, error: &ProviderError) -> GenerationAttempt {
        let outcome = if matches!(error, ProviderError::Cancelled) {
            AttemptOutcome::Cancelled
        } else {
            AttemptOutcome::ProviderFailed
        };
        self.finish(None, outcome, Some(AttemptError::from(error)), None)
    }
}
