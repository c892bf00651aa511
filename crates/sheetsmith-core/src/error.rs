//! Error types for the orchestration core
//!
//! - Configuration errors, reported once at construction
//! - Orchestrator errors, the only failures `generate` surfaces
//! - State machine and audit log errors

use crate::state::RequestState;
use sheetsmith_providers::FallbackError;
use sheetsmith_validator::RuleError;
use std::path::PathBuf;
use thiserror::Error;

/// Invalid or unreadable configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("failed to read config {path}: {source}")]
    Read {
        /// File path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Config text is not valid TOML for this schema
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    /// Priority list names a provider nobody registered
    #[error("unknown provider in priority list: {0}")]
    UnknownProvider(String),

    /// Provider listed or registered twice
    #[error("duplicate provider: {0}")]
    DuplicateProvider(String),

    /// Terminal provider must be the last priority entry
    #[error("universal_fallback must be the last entry in the priority list")]
    TerminalNotLast,

    /// Remote endpoint uses a built-in provider id
    #[error("provider id '{0}' is reserved")]
    ReservedProviderId(String),

    /// Remote endpoint settings are unusable
    #[error("invalid endpoint '{id}': {reason}")]
    InvalidEndpoint {
        /// Endpoint id
        id: String,
        /// What is wrong
        reason: String,
    },

    /// Zero or missing timeout
    #[error("invalid timeout for '{0}': must be greater than zero")]
    InvalidTimeout(String),

    /// Scoring bands or weights violate their constraints
    #[error("invalid scoring configuration: {0}")]
    InvalidScoring(String),

    /// Validator settings are malformed
    #[error("invalid validator configuration: {0}")]
    InvalidRule(#[from] RuleError),

    /// Environment override could not be parsed
    #[error("invalid value for {var}: '{value}'")]
    InvalidEnv {
        /// Variable name
        var: String,
        /// Raw value
        value: String,
    },
}

/// Fatal request failure
///
/// Ordinary provider and validation failures never surface here.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Terminal provider could not build its output
    #[error("terminal fallback construction failed: {0}")]
    FallbackConstruction(#[from] FallbackError),

    /// Orchestrator attempted an illegal state transition
    #[error(transparent)]
    StateMachine(#[from] StateMachineError),
}

/// Illegal request state transition
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateMachineError {
    /// Transition not in the allowed set
    #[error("illegal transition {from} -> {to}")]
    IllegalTransition {
        /// Current state
        from: RequestState,
        /// Requested state
        to: RequestState,
    },
}

/// Audit log failure
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LogError {
    /// Hash chain broken at an entry
    #[error("attempt log integrity violation at sequence {sequence}")]
    IntegrityViolation {
        /// First entry that fails verification
        sequence: u64,
    },
}
