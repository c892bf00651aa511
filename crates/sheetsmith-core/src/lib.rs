//! Sheetsmith Core - provider orchestration
//!
//! Turns a spreadsheet [`Profile`](sheetsmith_model::Profile) into accepted
//! application source:
//! - [`ProviderOrchestrator`]: ordered provider chain with time budgets,
//!   validation gating and an unconditional terminal fallback
//! - [`ConfidenceScorer`]: tier-banded confidence scores
//! - [`AttemptLog`]: hash-chained audit log of every attempt
//! - [`OrchestratorConfig`]: TOML configuration with environment overrides
//!
//! A request always yields a [`GenerationResult`] in `ACCEPTED` or
//! `FALLBACK_ACCEPTED`; the only error is a terminal fallback that cannot
//! be built.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod attempt;
pub mod cancel;
pub mod config;
pub mod error;
pub mod log;
pub mod orchestrator;
pub mod registry;
pub mod result;
pub mod scorer;
pub mod state;

pub use attempt::{AttemptError, AttemptOutcome, GenerationAttempt};
pub use cancel::CancellationSignal;
pub use config::{OrchestratorConfig, TimeoutConfig};
pub use error::{ConfigError, LogError, OrchestratorError, StateMachineError};
pub use log::{AttemptEvent, AttemptLog};
pub use orchestrator::{ChainLink, ProviderOrchestrator};
pub use registry::ProviderRegistry;
pub use result::{GenerationResult, TerminalState};
pub use scorer::{ConfidenceScorer, ScoringWeights, TierBand};
pub use state::{allowed_transitions, validate_transition, RequestState, RequestTracker};
