//! Generation request types
//!
//! A request bundles the shared profile, the user's free-text instructions and
//! the per-stage model selection. Requests are immutable once built.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use ulid::Ulid;

use crate::profile::Profile;

/// Instructions used when the caller supplies none
pub const DEFAULT_INSTRUCTIONS: &str =
    "Generate a complete Streamlit application that replaces this Excel file for daily use.";

/// Unique request identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RequestId(pub Ulid);

impl RequestId {
    /// Generate new request ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resolved model identifiers for both stages
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageModels {
    /// Model for the profiling / analysis stage
    pub analysis: String,
    /// Model for the code-generation stage
    pub generation: String,
}

impl StageModels {
    /// Create stage models
    #[inline]
    #[must_use]
    pub fn new(analysis: impl Into<String>, generation: impl Into<String>) -> Self {
        Self {
            analysis: analysis.into(),
            generation: generation.into(),
        }
    }
}

/// Per-request model selectors; unset or blank selectors use configured defaults
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelSelection {
    /// Analysis-stage selector
    pub analysis: Option<String>,
    /// Generation-stage selector
    pub generation: Option<String>,
}

impl ModelSelection {
    /// Select both stages explicitly
    #[inline]
    #[must_use]
    pub fn new(analysis: impl Into<String>, generation: impl Into<String>) -> Self {
        Self {
            analysis: Some(analysis.into()),
            generation: Some(generation.into()),
        }
    }

    /// Resolve against defaults
    #[must_use]
    pub fn resolve(&self, defaults: &StageModels) -> StageModels {
        fn pick(selected: Option<&String>, fallback: &str) -> String {
            selected
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .unwrap_or(fallback)
                .to_string()
        }

        StageModels {
            analysis: pick(self.analysis.as_ref(), &defaults.analysis),
            generation: pick(self.generation.as_ref(), &defaults.generation),
        }
    }
}

/// One transformation request
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Request ID
    pub id: RequestId,
    /// Shared, read-only profile
    pub profile: Arc<Profile>,
    /// Free-text custom instructions (may be empty)
    pub instructions: String,
    /// Per-stage model selection
    pub models: ModelSelection,
}

impl GenerationRequest {
    /// Create request for a profile
    #[inline]
    #[must_use]
    pub fn new(profile: impl Into<Arc<Profile>>) -> Self {
        Self {
            id: RequestId::new(),
            profile: profile.into(),
            instructions: String::new(),
            models: ModelSelection::default(),
        }
    }

    /// With custom instructions
    #[inline]
    #[must_use]
    pub fn with_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.instructions = instructions.into();
        self
    }

    /// With model selection
    #[inline]
    #[must_use]
    pub fn with_models(mut self, models: ModelSelection) -> Self {
        self.models = models;
        self
    }

    /// Instructions, or the default text when blank
    #[inline]
    #[must_use]
    pub fn effective_instructions(&self) -> &str {
        let trimmed = self.instructions.trim();
        if trimmed.is_empty() {
            DEFAULT_INSTRUCTIONS
        } else {
            trimmed
        }
    }
}
