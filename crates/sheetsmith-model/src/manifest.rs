//! Dependency manifest
//!
//! A manifest is the set of external top-level modules a generated program
//! imports. Names are stored as import names (`sklearn`, not `scikit-learn`)
//! and compared case-insensitively with `-` and `.` folded to `_`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Distributions whose import name differs from the package name
const DIST_TO_IMPORT: &[(&str, &str)] = &[
    ("scikit-learn", "sklearn"),
    ("pillow", "PIL"),
    ("pyyaml", "yaml"),
    ("beautifulsoup4", "bs4"),
    ("opencv-python", "cv2"),
    ("python-dateutil", "dateutil"),
];

static REQUIREMENT_NAME: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z0-9][A-Za-z0-9._-]*)").expect("static regex"));

static REQUIREMENT_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[A-Za-z0-9][A-Za-z0-9._-]*(\[[^\]]*\])?\s*((===|==|>=|<=|~=|!=|>|<)\s*[A-Za-z0-9.*+!_-]+\s*,?\s*)*(;.*)?$",
    )
    .expect("static regex")
});

/// Fold a module or distribution name for comparison
#[must_use]
pub fn normalize_name(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            '-' | '.' => '_',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

fn import_name_for(dist: &str) -> String {
    let folded = normalize_name(dist);
    DIST_TO_IMPORT
        .iter()
        .find(|(d, _)| normalize_name(d) == folded)
        .map_or_else(|| dist.to_string(), |(_, import)| (*import).to_string())
}

fn dist_name_for(import: &str) -> String {
    let folded = normalize_name(import);
    DIST_TO_IMPORT
        .iter()
        .find(|(_, i)| normalize_name(i) == folded)
        .map_or_else(|| import.to_string(), |(dist, _)| (*dist).to_string())
}

fn strip_comment(line: &str) -> &str {
    line.split('#').next().unwrap_or_default().trim()
}

/// Set of external module names
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyManifest {
    names: BTreeSet<String>,
}

impl DependencyManifest {
    /// Create empty manifest
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from import names
    #[must_use]
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut manifest = Self::new();
        for name in names {
            manifest.insert(name.as_ref());
        }
        manifest
    }

    /// Parse `requirements.txt` text
    ///
    /// Version specifiers, extras, markers, comments, blank lines and pip
    /// option lines (`-r`, `-e`, `--index-url`) are ignored. Distribution
    /// names are mapped to their import names.
    #[must_use]
    pub fn from_requirements(text: &str) -> Self {
        let mut manifest = Self::new();
        for line in text.lines() {
            let line = strip_comment(line);
            if line.is_empty() || line.starts_with('-') {
                continue;
            }
            if let Some(captures) = REQUIREMENT_NAME.captures(line) {
                manifest.insert(&import_name_for(&captures[1]));
            }
        }
        manifest
    }

    /// Whether every meaningful line of `text` is a requirement specifier
    ///
    /// Text with no meaningful lines is not requirements text.
    #[must_use]
    pub fn looks_like_requirements(text: &str) -> bool {
        let mut seen = false;
        for line in text.lines() {
            let line = strip_comment(line);
            if line.is_empty() {
                continue;
            }
            if !REQUIREMENT_LINE.is_match(line) {
                return false;
            }
            seen = true;
        }
        seen
    }

    /// Add an import name; blank names are ignored
    pub fn insert(&mut self, name: &str) {
        let name = name.trim();
        if name.is_empty() || self.contains(name) {
            return;
        }
        self.names.insert(name.to_string());
    }

    /// Whether a module is listed (folded comparison)
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        let folded = normalize_name(name);
        self.names.iter().any(|n| normalize_name(n) == folded)
    }

    /// Import names in sorted order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Number of modules
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether the manifest is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Folded names
    #[must_use]
    pub fn normalized(&self) -> BTreeSet<String> {
        self.names.iter().map(|n| normalize_name(n)).collect()
    }

    /// Two-way comparison of this (declared) manifest against used imports
    #[must_use]
    pub fn diff(&self, used: &DependencyManifest) -> ManifestDiff {
        let missing = used
            .names()
            .filter(|n| !self.contains(n))
            .map(str::to_string)
            .collect();
        let extra = self
            .names()
            .filter(|n| !used.contains(n))
            .map(str::to_string)
            .collect();
        ManifestDiff { missing, extra }
    }

    /// Render `requirements.txt` lines using distribution names
    #[must_use]
    pub fn to_requirements(&self) -> String {
        let mut dists: Vec<String> = self.names().map(dist_name_for).collect();
        dists.sort_by_key(|d| normalize_name(d));
        let mut out = dists.join("\n");
        if !out.is_empty() {
            out.push('\n');
        }
        out
    }
}

impl<S: AsRef<str>> FromIterator<S> for DependencyManifest {
    fn from_iter<T: IntoIterator<Item = S>>(iter: T) -> Self {
        Self::from_names(iter)
    }
}

/// Result of a declared-vs-used comparison
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ManifestDiff {
    /// Used but not declared
    pub missing: Vec<String>,
    /// Declared but not used
    pub extra: Vec<String>,
}

impl ManifestDiff {
    /// Whether the two sets agree
    #[inline]
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.missing.is_empty() && self.extra.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn requirements_are_mapped_to_import_names() {
        let text = "\
# core
streamlit>=1.22.0
pandas==2.1.0  # pinned
scikit-learn[alldeps]>=1.3 ; python_version >= '3.9'
Pillow
-r extra.txt

plotly>=5.0.0
";
        let manifest = DependencyManifest::from_requirements(text);
        let names: Vec<&str> = manifest.names().collect();
        assert_eq!(names, vec!["PIL", "pandas", "plotly", "sklearn", "streamlit"]);
    }

    #[test]
    fn diff_is_two_way_and_folded() {
        let declared = DependencyManifest::from_names(["streamlit", "Plotly", "numpy"]);
        let used = DependencyManifest::from_names(["streamlit", "plotly", "pandas"]);

        let diff = declared.diff(&used);
        assert_eq!(diff.missing, vec!["pandas".to_string()]);
        assert_eq!(diff.extra, vec!["numpy".to_string()]);
        assert!(!diff.is_consistent());
        assert!(used.diff(&used).is_consistent());
    }

    #[test]
    fn requirements_round_trip_uses_distribution_names() {
        let manifest = DependencyManifest::from_names(["sklearn", "streamlit", "yaml"]);
        assert_eq!(
            manifest.to_requirements(),
            "pyyaml\nscikit-learn\nstreamlit\n"
        );
        assert_eq!(DependencyManifest::new().to_requirements(), "");
    }

    #[test]
    fn requirement_text_detection() {
        assert!(DependencyManifest::looks_like_requirements(
            "streamlit>=1.22\npandas\n"
        ));
        assert!(!DependencyManifest::looks_like_requirements(
            "import streamlit as st\n"
        ));
        assert!(!DependencyManifest::looks_like_requirements("\n# nothing\n"));
        assert!(!DependencyManifest::looks_like_requirements(
            "Run with streamlit run app.py"
        ));
    }

    proptest::proptest! {
        #[test]
        fn prop_folding_is_idempotent(name in "[A-Za-z0-9._-]{0,20}") {
            let once = normalize_name(&name);
            proptest::prop_assert_eq!(normalize_name(&once), once);
        }

        #[test]
        fn prop_diff_of_superset_has_no_missing(
            declared in proptest::collection::vec("[a-z][a-z0-9_]{0,8}", 0..6),
            used in proptest::collection::vec("[a-z][a-z0-9_]{0,8}", 0..6),
        ) {
            let used = DependencyManifest::from_names(&used);
            let mut declared = DependencyManifest::from_names(&declared);
            for name in used.names() {
                declared.insert(name);
            }
            let diff = declared.diff(&used);
            proptest::prop_assert!(diff.missing.is_empty());
            proptest::prop_assert_eq!(diff.extra.len(), declared.len() - used.len());
        }
    }

    #[test]
    fn duplicate_names_collapse() {
        let manifest = DependencyManifest::from_names(["pandas", "Pandas", " ", ""]);
        assert_eq!(manifest.len(), 1);
    }
}
