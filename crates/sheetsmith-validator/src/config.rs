//! Validator configuration

use crate::rules::{default_rules, ForbiddenRule};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Expected application entry point
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntryPointSpec {
    /// Module-level function name
    pub function: String,
    /// Whether the function must also be invoked at module level or under a
    /// `__main__` guard
    pub require_invocation: bool,
}

impl Default for EntryPointSpec {
    fn default() -> Self {
        Self {
            function: "main".to_string(),
            require_invocation: true,
        }
    }
}

/// Settings for [`crate::OutputValidator`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Entry-point requirement
    pub entry_point: EntryPointSpec,
    /// Top-level modules shipped with the application (never external)
    pub local_modules: Vec<String>,
    /// Forbidden-construct rules; replaces the defaults when given
    pub forbidden: Vec<ForbiddenRule>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            entry_point: EntryPointSpec::default(),
            local_modules: Vec::new(),
            forbidden: default_rules(),
        }
    }
}

impl ValidatorConfig {
    /// Set entry-point function
    #[must_use]
    pub fn with_entry_point(mut self, function: impl Into<String>) -> Self {
        self.entry_point.function = function.into();
        self
    }

    /// Add a local module
    #[must_use]
    pub fn with_local_module(mut self, module: impl Into<String>) -> Self {
        self.local_modules.push(module.into());
        self
    }

    /// Replace forbidden rules
    #[must_use]
    pub fn with_rules(mut self, rules: Vec<ForbiddenRule>) -> Self {
        self.forbidden = rules;
        self
    }

    /// Check rule set and entry point
    ///
    /// # Errors
    /// Returns the first malformed setting found
    pub fn validate(&self) -> Result<(), RuleError> {
        if !is_identifier(&self.entry_point.function) {
            return Err(RuleError::InvalidEntryPoint(
                self.entry_point.function.clone(),
            ));
        }
        let mut seen = HashSet::new();
        for rule in &self.forbidden {
            if rule.id.trim().is_empty() {
                return Err(RuleError::EmptyId);
            }
            if !seen.insert(rule.id.as_str()) {
                return Err(RuleError::DuplicateId(rule.id.clone()));
            }
            if rule.targets.is_empty() {
                return Err(RuleError::NoTargets(rule.id.clone()));
            }
            if let Some(bad) = rule.targets.iter().find(|t| !is_valid_target(t)) {
                return Err(RuleError::InvalidTarget {
                    rule: rule.id.clone(),
                    target: bad.clone(),
                });
            }
        }
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c == '_' || c.is_alphabetic())
        && chars.all(|c| c == '_' || c.is_alphanumeric())
}

fn is_valid_target(target: &str) -> bool {
    let core = target.strip_prefix("*.").unwrap_or(target);
    let core = core.strip_suffix('*').unwrap_or(core);
    let core = core.strip_suffix('.').unwrap_or(core);
    !core.is_empty() && core.split('.').all(is_identifier)
}

/// Malformed validator configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleError {
    /// Rule with a blank id
    #[error("forbidden rule has an empty id")]
    EmptyId,

    /// Two rules share an id
    #[error("duplicate forbidden rule id: {0}")]
    DuplicateId(String),

    /// Rule matches nothing
    #[error("forbidden rule '{0}' has no targets")]
    NoTargets(String),

    /// Target is not a dotted name pattern
    #[error("forbidden rule '{rule}' has invalid target '{target}'")]
    InvalidTarget {
        /// Rule id
        rule: String,
        /// Offending target
        target: String,
    },

    /// Entry point is not a Python identifier
    #[error("entry point '{0}' is not a valid function name")]
    InvalidEntryPoint(String),
}
