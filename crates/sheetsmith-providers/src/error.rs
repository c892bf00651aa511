//! Provider error types

use thiserror::Error;

/// Attempt-level provider failure
///
/// None of these fail a request; the orchestrator records them and moves to
/// the next provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// API key environment variable unset or empty
    #[error("missing credential: {0} is not set")]
    MissingCredential(String),

    /// Connection or transport failure
    #[error("network error: {0}")]
    Network(String),

    /// Provider exceeded its time budget
    #[error("timed out after {budget_ms}ms")]
    Timeout {
        /// Budget that was exceeded
        budget_ms: u64,
    },

    /// Credential rejected
    #[error("authentication rejected (HTTP {status})")]
    Auth {
        /// HTTP status
        status: u16,
    },

    /// Rate limit or quota exhausted
    #[error("quota exhausted (HTTP {status})")]
    Quota {
        /// HTTP status
        status: u16,
    },

    /// Other non-success HTTP status
    #[error("HTTP {status}: {body}")]
    Http {
        /// HTTP status
        status: u16,
        /// Truncated response body
        body: String,
    },

    /// Response body could not be decoded
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Response decoded but held no code
    #[error("response contains no extractable code")]
    NoExtractableCode,

    /// Request cancelled while the provider was running
    #[error("cancelled")]
    Cancelled,

    /// Terminal provider failed to render
    #[error(transparent)]
    Fallback(#[from] FallbackError),
}

impl ProviderError {
    /// Stable identifier for traces and logs
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MissingCredential(_) => "missing-credential",
            Self::Network(_) => "network",
            Self::Timeout { .. } => "timeout",
            Self::Auth { .. } => "auth",
            Self::Quota { .. } => "quota",
            Self::Http { .. } => "http",
            Self::MalformedResponse(_) => "malformed-response",
            Self::NoExtractableCode => "no-extractable-code",
            Self::Cancelled => "cancelled",
            Self::Fallback(_) => "fallback",
        }
    }

    /// Whether the same call might succeed later
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout { .. } | Self::Quota { .. } => true,
            Self::Http { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Terminal provider could not build its output
///
/// This is a defect, never an expected runtime condition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FallbackError {
    /// Writing the program text failed
    #[error("fallback rendering failed")]
    Render,

    /// Rendering produced no program
    #[error("fallback rendered an empty program")]
    Empty,
}

impl From<std::fmt::Error> for FallbackError {
    fn from(_: std::fmt::Error) -> Self {
        Self::Render
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification() {
        assert!(ProviderError::Quota { status: 429 }.is_retryable());
        assert!(ProviderError::Http {
            status: 503,
            body: String::new()
        }
        .is_retryable());
        assert!(!ProviderError::Http {
            status: 404,
            body: String::new()
        }
        .is_retryable());
        assert!(!ProviderError::Auth { status: 401 }.is_retryable());
        assert!(!ProviderError::NoExtractableCode.is_retryable());
        assert_eq!(
            ProviderError::from(FallbackError::Empty).kind(),
            "fallback"
        );
    }
}
