//! Request state machine
//!
//! ```text
//! PENDING -> TRYING(i) -> VALIDATING(i) -> ACCEPTED
//!                |              |
//!                +--------------+--> TRYING(i+1) -> ... -> FALLBACK_ACCEPTED
//! ```
//!
//! `TRYING` skips `VALIDATING` on a provider-level error. Any non-terminal
//! state may move to `FALLBACK_ACCEPTED` on exhaustion or cancellation.

use crate::error::StateMachineError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of one request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestState {
    /// Created, no provider tried yet
    Pending,
    /// Provider at `index` in the chain is running
    Trying {
        /// Chain position
        index: usize,
    },
    /// Candidate from provider `index` is being validated
    Validating {
        /// Chain position
        index: usize,
    },
    /// A chain provider's candidate passed
    Accepted,
    /// Terminal fallback output accepted
    FallbackAccepted,
}

impl RequestState {
    /// Whether no further transitions are possible
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Accepted | Self::FallbackAccepted)
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("PENDING"),
            Self::Trying { index } => write!(f, "TRYING({index})"),
            Self::Validating { index } => write!(f, "VALIDATING({index})"),
            Self::Accepted => f.write_str("ACCEPTED"),
            Self::FallbackAccepted => f.write_str("FALLBACK_ACCEPTED"),
        }
    }
}

/// Validates a state transition
///
/// # Errors
/// `IllegalTransition` if `to` is not reachable from `from` in one step
pub fn validate_transition(from: RequestState, to: RequestState) -> Result<(), StateMachineError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(StateMachineError::IllegalTransition { from, to })
    }
}

/// States reachable from `from` in one step
#[must_use]
pub fn allowed_transitions(from: RequestState) -> Vec<RequestState> {
    match from {
        RequestState::Pending => vec![RequestState::Trying { index: 0 }, RequestState::FallbackAccepted],
        RequestState::Trying { index } => vec![
            RequestState::Validating { index },
            RequestState::Trying { index: index + 1 },
            RequestState::FallbackAccepted,
        ],
        RequestState::Validating { index } => vec![
            RequestState::Accepted,
            RequestState::Trying { index: index + 1 },
            RequestState::FallbackAccepted,
        ],
        RequestState::Accepted | RequestState::FallbackAccepted => vec![],
    }
}

/// Tracks one request's state and checks every transition
#[derive(Debug, Clone)]
pub struct RequestTracker {
    state: RequestState,
    history: Vec<RequestState>,
}

impl Default for RequestTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestTracker {
    /// Start in `PENDING`
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: RequestState::Pending,
            history: vec![RequestState::Pending],
        }
    }

    /// Current state
    #[inline]
    #[must_use]
    pub fn state(&self) -> RequestState {
        self.state
    }

    /// Move to `to`
    ///
    /// # Errors
    /// `IllegalTransition`; the state is left unchanged
    pub fn advance(&mut self, to: RequestState) -> Result<(), StateMachineError> {
        validate_transition(self.state, to)?;
        self.state = to;
        self.history.push(to);
        Ok(())
    }

    /// Every state visited, in order
    #[must_use]
    pub fn into_history(self) -> Vec<RequestState> {
        self.history
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_skips_validating() {
        let mut tracker = RequestTracker::new();
        tracker.advance(RequestState::Trying { index: 0 }).unwrap();
        tracker.advance(RequestState::Trying { index: 1 }).unwrap();
        tracker.advance(RequestState::Validating { index: 1 }).unwrap();
        tracker.advance(RequestState::Accepted).unwrap();
        assert!(tracker.state().is_terminal());
        assert_eq!(tracker.into_history().len(), 5);
    }

    #[test]
    fn illegal_transition_leaves_state() {
        let mut tracker = RequestTracker::new();
        let err = tracker.advance(RequestState::Accepted).unwrap_err();
        assert_eq!(
            err.to_string(),
            "illegal transition PENDING -> ACCEPTED"
        );
        assert_eq!(tracker.state(), RequestState::Pending);
    }

    #[test]
    fn index_must_advance_by_one() {
        assert!(validate_transition(
            RequestState::Trying { index: 0 },
            RequestState::Trying { index: 2 }
        )
        .is_err());
        assert!(validate_transition(
            RequestState::Trying { index: 0 },
            RequestState::Validating { index: 1 }
        )
        .is_err());
    }
}
