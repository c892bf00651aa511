//! Candidate program emitted by a provider

use serde::{Deserialize, Serialize};

use crate::manifest::DependencyManifest;

/// Candidate source plus the manifest its provider declares for it
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GeneratedCode {
    /// Python source text
    pub source: String,
    /// Declared external dependencies
    pub declared: DependencyManifest,
}

impl GeneratedCode {
    /// Create candidate
    #[inline]
    #[must_use]
    pub fn new(source: impl Into<String>, declared: DependencyManifest) -> Self {
        Self {
            source: source.into(),
            declared,
        }
    }

    /// Source length in bytes
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.source.len()
    }

    /// Whether the source is blank
    #[inline]
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.source.trim().is_empty()
    }
}
