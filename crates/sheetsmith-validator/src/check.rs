//! Check identifiers, violations and advisories

use serde::{Deserialize, Serialize};
use std::fmt;

/// Acceptance checks, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckId {
    /// Source parses under the Python grammar
    Syntax,
    /// No construct from the forbidden list
    ForbiddenConstruct,
    /// Entry point defined and invoked
    EntryPoint,
    /// Declared dependencies match the import scan
    DependencyManifest,
}

impl CheckId {
    /// All checks in evaluation order
    pub const ALL: [CheckId; 4] = [
        Self::Syntax,
        Self::ForbiddenConstruct,
        Self::EntryPoint,
        Self::DependencyManifest,
    ];

    /// Stable identifier
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Syntax => "syntax",
            Self::ForbiddenConstruct => "forbidden-construct",
            Self::EntryPoint => "entry-point",
            Self::DependencyManifest => "dependency-manifest",
        }
    }
}

impl fmt::Display for CheckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed check
///
/// Field order is the sort order: check, then line, then rule id.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Violation {
    /// Failed check
    pub check: CheckId,
    /// 1-based source line, when the violation has a location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// Forbidden rule id (forbidden-construct only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
    /// Human-readable detail
    pub message: String,
}

impl Violation {
    /// Create a violation with no location
    #[must_use]
    pub fn new(check: CheckId, message: impl Into<String>) -> Self {
        Self {
            check,
            line: None,
            rule: None,
            message: message.into(),
        }
    }

    /// Attach 1-based line
    #[inline]
    #[must_use]
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// Attach rule id
    #[inline]
    #[must_use]
    pub fn with_rule(mut self, rule: impl Into<String>) -> Self {
        self.rule = Some(rule.into());
        self
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}", self.check)?;
        if let Some(rule) = &self.rule {
            write!(f, "/{rule}")?;
        }
        f.write_str("]")?;
        if let Some(line) = self.line {
            write!(f, " line {line}:")?;
        }
        write!(f, " {}", self.message)
    }
}

/// Non-fatal finding kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AdvisoryKind {
    /// `except:` with no exception type
    BareExcept,
    /// `from x import *`
    WildcardImport,
    /// No `try` statement anywhere in the module
    NoErrorHandling,
    /// Leftover `print(...)` call
    DebugPrint,
}

impl AdvisoryKind {
    /// Stable identifier
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BareExcept => "bare-except",
            Self::WildcardImport => "wildcard-import",
            Self::NoErrorHandling => "no-error-handling",
            Self::DebugPrint => "debug-print",
        }
    }
}

/// A quality finding that never fails validation
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Advisory {
    /// Finding kind
    pub kind: AdvisoryKind,
    /// 1-based source line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
}

impl Advisory {
    /// Create advisory
    #[inline]
    #[must_use]
    pub fn new(kind: AdvisoryKind, line: Option<usize>) -> Self {
        Self { kind, line }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn violations_sort_by_check_then_line_then_rule() {
        let mut v = vec![
            Violation::new(CheckId::EntryPoint, "missing"),
            Violation::new(CheckId::ForbiddenConstruct, "b")
                .at_line(9)
                .with_rule("process-spawn"),
            Violation::new(CheckId::ForbiddenConstruct, "a")
                .at_line(3)
                .with_rule("network-egress"),
            Violation::new(CheckId::ForbiddenConstruct, "a")
                .at_line(3)
                .with_rule("dynamic-eval"),
        ];
        v.sort();

        let order: Vec<_> = v.iter().map(|v| (v.check, v.line, v.rule.clone())).collect();
        assert_eq!(
            order,
            vec![
                (CheckId::ForbiddenConstruct, Some(3), Some("dynamic-eval".into())),
                (CheckId::ForbiddenConstruct, Some(3), Some("network-egress".into())),
                (CheckId::ForbiddenConstruct, Some(9), Some("process-spawn".into())),
                (CheckId::EntryPoint, None, None),
            ]
        );
    }

    #[test]
    fn ids_serialize_kebab_case() {
        let json = serde_json::to_string(&CheckId::ForbiddenConstruct).unwrap();
        assert_eq!(json, "\"forbidden-construct\"");
        let json = serde_json::to_string(&AdvisoryKind::NoErrorHandling).unwrap();
        assert_eq!(json, format!("\"{}\"", AdvisoryKind::NoErrorHandling.as_str()));
    }

    #[test]
    fn display_includes_rule_and_line() {
        let v = Violation::new(CheckId::ForbiddenConstruct, "call to `os.system`")
            .at_line(4)
            .with_rule("process-spawn");
        assert_eq!(
            v.to_string(),
            "[forbidden-construct/process-spawn] line 4: call to `os.system`"
        );
    }
}
