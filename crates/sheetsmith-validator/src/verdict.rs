//! Validation verdict

use crate::check::{Advisory, CheckId, Violation};
use serde::{Deserialize, Serialize};
use sheetsmith_model::DependencyManifest;

/// Outcome of validating one candidate
///
/// Violations and advisories are kept sorted so equal inputs always produce
/// equal verdicts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    violations: Vec<Violation>,
    advisories: Vec<Advisory>,
    imports: DependencyManifest,
}

impl Verdict {
    /// Build a verdict, normalizing order
    #[must_use]
    pub fn new(
        mut violations: Vec<Violation>,
        mut advisories: Vec<Advisory>,
        imports: DependencyManifest,
    ) -> Self {
        violations.sort();
        violations.dedup();
        advisories.sort();
        advisories.dedup();
        Self {
            violations,
            advisories,
            imports,
        }
    }

    /// Whether every check passed
    #[inline]
    #[must_use]
    pub fn is_pass(&self) -> bool {
        self.violations.is_empty()
    }

    /// All violations
    #[inline]
    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Non-fatal findings
    #[inline]
    #[must_use]
    pub fn advisories(&self) -> &[Advisory] {
        &self.advisories
    }

    /// Number of advisories
    #[inline]
    #[must_use]
    pub fn advisory_count(&self) -> usize {
        self.advisories.len()
    }

    /// External modules the code imports
    #[inline]
    #[must_use]
    pub fn imports(&self) -> &DependencyManifest {
        &self.imports
    }

    /// Distinct failed checks in evaluation order
    #[must_use]
    pub fn violated_checks(&self) -> Vec<CheckId> {
        let mut checks: Vec<CheckId> = self.violations.iter().map(|v| v.check).collect();
        checks.dedup();
        checks
    }

    /// Whether a specific check failed
    #[must_use]
    pub fn failed(&self, check: CheckId) -> bool {
        self.violations.iter().any(|v| v.check == check)
    }

    /// Rule ids behind forbidden-construct violations
    #[must_use]
    pub fn violated_rules(&self) -> Vec<&str> {
        let mut rules: Vec<&str> = self
            .violations
            .iter()
            .filter_map(|v| v.rule.as_deref())
            .collect();
        rules.sort_unstable();
        rules.dedup();
        rules
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::check::AdvisoryKind;

    #[test]
    fn violated_checks_are_distinct_and_ordered() {
        let verdict = Verdict::new(
            vec![
                Violation::new(CheckId::DependencyManifest, "x"),
                Violation::new(CheckId::Syntax, "y"),
                Violation::new(CheckId::DependencyManifest, "z"),
            ],
            vec![Advisory::new(AdvisoryKind::DebugPrint, Some(2))],
            DependencyManifest::new(),
        );
        assert!(!verdict.is_pass());
        assert_eq!(
            verdict.violated_checks(),
            vec![CheckId::Syntax, CheckId::DependencyManifest]
        );
        assert!(verdict.failed(CheckId::Syntax));
        assert!(!verdict.failed(CheckId::EntryPoint));
        assert_eq!(verdict.advisory_count(), 1);
    }
}
