//! Workbook profile
//!
//! Structured summary of an uploaded spreadsheet, produced by the profiling
//! stage and consumed read-only by generation:
//! - Sheets with their column descriptors
//! - Categorized formulas
//! - Business domain tag with confidence
//! - Chart / macro presence flags
//!
//! Deserialization is lenient. Every field defaults, unknown enum strings are
//! preserved or mapped to a catch-all, and columns may be given either as bare
//! names or as full descriptors, so sparse or garbled input still loads.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::ProfileError;

/// Inferred column type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ColumnType {
    Numeric,
    Text,
    Date,
    Boolean,
    Mixed,
    #[default]
    Unknown,
}

impl ColumnType {
    /// Stable lowercase name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            ColumnType::Numeric => "numeric",
            ColumnType::Text => "text",
            ColumnType::Date => "date",
            ColumnType::Boolean => "boolean",
            ColumnType::Mixed => "mixed",
            ColumnType::Unknown => "unknown",
        }
    }
}

impl From<String> for ColumnType {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "numeric" | "number" | "int" | "integer" | "float" | "int64" | "float64" => {
                ColumnType::Numeric
            }
            "text" | "string" | "str" | "object" => ColumnType::Text,
            "date" | "datetime" | "timestamp" | "datetime64" => ColumnType::Date,
            "boolean" | "bool" => ColumnType::Boolean,
            "mixed" => ColumnType::Mixed,
            _ => ColumnType::Unknown,
        }
    }
}

impl From<ColumnType> for String {
    fn from(value: ColumnType) -> Self {
        value.as_str().to_string()
    }
}

/// Column descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ColumnRepr")]
pub struct ColumnDescriptor {
    /// Header text as found in the sheet (may be empty)
    pub name: String,
    /// Inferred type
    pub inferred_type: ColumnType,
}

impl ColumnDescriptor {
    /// Create descriptor
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, inferred_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            inferred_type,
        }
    }

    /// Create descriptor with unknown type
    #[inline]
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::new(name, ColumnType::Unknown)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColumnRepr {
    Name(String),
    Full {
        #[serde(default)]
        name: String,
        #[serde(default)]
        inferred_type: ColumnType,
    },
}

impl From<ColumnRepr> for ColumnDescriptor {
    fn from(repr: ColumnRepr) -> Self {
        match repr {
            ColumnRepr::Name(name) => ColumnDescriptor::named(name),
            ColumnRepr::Full {
                name,
                inferred_type,
            } => ColumnDescriptor::new(name, inferred_type),
        }
    }
}

/// One worksheet
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SheetProfile {
    /// Sheet name (may be empty in garbled workbooks)
    pub name: String,
    /// Columns in sheet order
    pub columns: Vec<ColumnDescriptor>,
    /// Number of data rows
    pub row_count: usize,
}

impl SheetProfile {
    /// Create sheet without columns
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            row_count: 0,
        }
    }

    /// Add a column
    #[inline]
    #[must_use]
    pub fn with_column(mut self, column: ColumnDescriptor) -> Self {
        self.columns.push(column);
        self
    }

    /// Add several columns by name
    #[inline]
    #[must_use]
    pub fn with_columns<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns
            .extend(names.into_iter().map(ColumnDescriptor::named));
        self
    }

    /// Set row count
    #[inline]
    #[must_use]
    pub fn with_rows(mut self, row_count: usize) -> Self {
        self.row_count = row_count;
        self
    }

    /// Column names in order
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

/// Formula category
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(from = "String", into = "String")]
pub enum FormulaCategory {
    Aggregation,
    Logical,
    Lookup,
    Financial,
    #[default]
    Other,
}

impl FormulaCategory {
    /// All categories in display order
    pub const ALL: [FormulaCategory; 5] = [
        FormulaCategory::Aggregation,
        FormulaCategory::Logical,
        FormulaCategory::Lookup,
        FormulaCategory::Financial,
        FormulaCategory::Other,
    ];

    /// Stable lowercase name
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            FormulaCategory::Aggregation => "aggregation",
            FormulaCategory::Logical => "logical",
            FormulaCategory::Lookup => "lookup",
            FormulaCategory::Financial => "financial",
            FormulaCategory::Other => "other",
        }
    }

    /// Categorize a formula expression by the first matching function family
    ///
    /// Families are checked in order aggregation, logical, lookup, financial;
    /// a function only counts when followed by `(`.
    #[must_use]
    pub fn classify(expression: &str) -> Self {
        const FAMILIES: [(FormulaCategory, &[&str]); 4] = [
            (
                FormulaCategory::Aggregation,
                &["SUM", "AVERAGE", "COUNT", "MAX", "MIN"],
            ),
            (FormulaCategory::Logical, &["IF", "AND", "OR", "NOT"]),
            (
                FormulaCategory::Lookup,
                &["VLOOKUP", "HLOOKUP", "INDEX", "MATCH"],
            ),
            (FormulaCategory::Financial, &["PMT", "FV", "PV", "IRR", "NPV"]),
        ];

        let upper = expression.to_ascii_uppercase();
        FAMILIES
            .iter()
            .find(|(_, funcs)| funcs.iter().any(|f| upper.contains(&format!("{f}("))))
            .map_or(FormulaCategory::Other, |(category, _)| *category)
    }
}

impl From<String> for FormulaCategory {
    fn from(value: String) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "aggregation" => FormulaCategory::Aggregation,
            "logical" => FormulaCategory::Logical,
            "lookup" => FormulaCategory::Lookup,
            "financial" => FormulaCategory::Financial,
            _ => FormulaCategory::Other,
        }
    }
}

impl From<FormulaCategory> for String {
    fn from(value: FormulaCategory) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for FormulaCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A formula found in the workbook
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FormulaRef {
    /// Sheet holding the formula
    pub sheet: String,
    /// Cell reference, e.g. `B12`
    pub cell: String,
    /// Expression text including the leading `=`
    pub expression: String,
    /// Category tag
    pub category: FormulaCategory,
}

impl FormulaRef {
    /// Create formula, categorizing the expression
    #[must_use]
    pub fn new(
        sheet: impl Into<String>,
        cell: impl Into<String>,
        expression: impl Into<String>,
    ) -> Self {
        let expression = expression.into();
        let category = FormulaCategory::classify(&expression);
        Self {
            sheet: sheet.into(),
            cell: cell.into(),
            expression,
            category,
        }
    }
}

/// Business domain vocabulary
///
/// Tags outside the fixed vocabulary are kept verbatim as `Unrecognized`
/// so downstream consumers can decide how to degrade.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DomainTag {
    Financial,
    Sales,
    Inventory,
    Hr,
    Project,
    #[default]
    Generic,
    Unrecognized(String),
}

impl DomainTag {
    /// Stable lowercase name
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            DomainTag::Financial => "financial",
            DomainTag::Sales => "sales",
            DomainTag::Inventory => "inventory",
            DomainTag::Hr => "hr",
            DomainTag::Project => "project",
            DomainTag::Generic => "generic",
            DomainTag::Unrecognized(raw) => raw,
        }
    }

    /// Whether the tag names a specific business domain
    #[inline]
    #[must_use]
    pub fn is_specific(&self) -> bool {
        !matches!(self, DomainTag::Generic | DomainTag::Unrecognized(_))
    }
}

impl From<String> for DomainTag {
    fn from(value: String) -> Self {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "financial" | "finance" | "financial dashboard" => DomainTag::Financial,
            "sales" | "sales analytics" => DomainTag::Sales,
            "inventory" | "inventory management" => DomainTag::Inventory,
            "hr" | "human resources" | "hr management" => DomainTag::Hr,
            "project" | "project management" => DomainTag::Project,
            "" | "generic" | "general" | "general data analysis" => DomainTag::Generic,
            _ => DomainTag::Unrecognized(value),
        }
    }
}

impl From<&str> for DomainTag {
    fn from(value: &str) -> Self {
        DomainTag::from(value.to_string())
    }
}

impl From<DomainTag> for String {
    fn from(value: DomainTag) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for DomainTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Domain tag plus detector confidence
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainAssessment {
    /// Detected domain
    pub tag: DomainTag,
    /// Detector confidence, nominally in [0, 1]
    pub confidence: f64,
}

impl DomainAssessment {
    /// Create assessment; confidence is clamped to [0, 1]
    #[inline]
    #[must_use]
    pub fn new(tag: impl Into<DomainTag>, confidence: f64) -> Self {
        Self {
            tag: tag.into(),
            confidence: sanitize_unit(confidence),
        }
    }

    /// Confidence usable for scoring
    ///
    /// Zero for generic/unrecognized tags; NaN and out-of-range values from
    /// deserialized input are clamped.
    #[inline]
    #[must_use]
    pub fn effective_confidence(&self) -> f64 {
        if self.tag.is_specific() {
            sanitize_unit(self.confidence)
        } else {
            0.0
        }
    }
}

fn sanitize_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Completeness metrics derived from a profile
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ProfileMetrics {
    /// Number of sheets
    pub sheet_count: usize,
    /// Total columns across sheets
    pub column_count: usize,
    /// Number of formulas
    pub formula_count: usize,
    /// Fraction of sheets with a non-blank name (1.0 when there are no sheets)
    pub named_sheet_ratio: f64,
    /// Effective domain confidence
    pub domain_confidence: f64,
}

/// Structured summary of an uploaded workbook
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    /// Original file name, when known
    pub source_name: Option<String>,
    /// Sheets in workbook order
    pub sheets: Vec<SheetProfile>,
    /// Categorized formulas
    pub formulas: Vec<FormulaRef>,
    /// Domain detection result
    pub domain: DomainAssessment,
    /// Workbook contains charts
    pub has_charts: bool,
    /// Workbook contains macros
    pub has_macros: bool,
}

impl Profile {
    /// Create empty profile
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse profile JSON leniently
    ///
    /// # Errors
    /// Returns `ProfileError::Decode` only when the text is not JSON or a
    /// field has an irreconcilable shape (e.g. `sheets` is a number).
    pub fn from_json(text: &str) -> Result<Self, ProfileError> {
        serde_json::from_str(text).map_err(ProfileError::Decode)
    }

    /// With source file name
    #[inline]
    #[must_use]
    pub fn with_source_name(mut self, name: impl Into<String>) -> Self {
        self.source_name = Some(name.into());
        self
    }

    /// Add a sheet
    #[inline]
    #[must_use]
    pub fn with_sheet(mut self, sheet: SheetProfile) -> Self {
        self.sheets.push(sheet);
        self
    }

    /// Add a formula
    #[inline]
    #[must_use]
    pub fn with_formula(mut self, formula: FormulaRef) -> Self {
        self.formulas.push(formula);
        self
    }

    /// With domain assessment
    #[inline]
    #[must_use]
    pub fn with_domain(mut self, tag: impl Into<DomainTag>, confidence: f64) -> Self {
        self.domain = DomainAssessment::new(tag, confidence);
        self
    }

    /// With chart / macro flags
    #[inline]
    #[must_use]
    pub fn with_flags(mut self, has_charts: bool, has_macros: bool) -> Self {
        self.has_charts = has_charts;
        self.has_macros = has_macros;
        self
    }

    /// Whether the profile carries no sheets at all
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    /// Formula counts per category, every category present
    #[must_use]
    pub fn formula_summary(&self) -> BTreeMap<FormulaCategory, usize> {
        let mut summary: BTreeMap<FormulaCategory, usize> =
            FormulaCategory::ALL.iter().map(|c| (*c, 0)).collect();
        for formula in &self.formulas {
            *summary.entry(formula.category).or_default() += 1;
        }
        summary
    }

    /// Completeness metrics
    #[must_use]
    pub fn metrics(&self) -> ProfileMetrics {
        let sheet_count = self.sheets.len();
        let named = self
            .sheets
            .iter()
            .filter(|s| !s.name.trim().is_empty())
            .count();

        #[allow(clippy::cast_precision_loss)]
        let named_sheet_ratio = if sheet_count == 0 {
            1.0
        } else {
            named as f64 / sheet_count as f64
        };

        ProfileMetrics {
            sheet_count,
            column_count: self.sheets.iter().map(|s| s.columns.len()).sum(),
            formula_count: self.formulas.len(),
            named_sheet_ratio,
            domain_confidence: self.domain.effective_confidence(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formula_classification_follows_family_order() {
        assert_eq!(
            FormulaCategory::classify("=SUM(A1:A9)"),
            FormulaCategory::Aggregation
        );
        assert_eq!(
            FormulaCategory::classify("=IF(B2>0, SUM(B3:B4), 0)"),
            FormulaCategory::Aggregation
        );
        assert_eq!(
            FormulaCategory::classify("=vlookup(A2, Rates!A:B, 2, FALSE)"),
            FormulaCategory::Lookup
        );
        assert_eq!(
            FormulaCategory::classify("=NPV(0.1, C2:C9)"),
            FormulaCategory::Financial
        );
        assert_eq!(FormulaCategory::classify("=A1*B1"), FormulaCategory::Other);
        assert_eq!(
            FormulaCategory::classify("=LEFT(A1, 3)"),
            FormulaCategory::Other
        );
    }

    #[test]
    fn domain_tag_keeps_unrecognized_text() {
        assert_eq!(DomainTag::from("Finance"), DomainTag::Financial);
        assert_eq!(DomainTag::from("HR Management"), DomainTag::Hr);
        assert_eq!(DomainTag::from(""), DomainTag::Generic);
        assert_eq!(
            DomainTag::from("astrology"),
            DomainTag::Unrecognized("astrology".to_string())
        );
        assert!(!DomainTag::from("astrology").is_specific());
    }

    #[test]
    fn lenient_profile_json() {
        let json = r#"{
            "sheets": [
                {"name": "Budget", "columns": ["Month", {"name": "Amount", "inferred_type": "float64"}]},
                {"columns": [{}]}
            ],
            "formulas": [{"expression": "=SUM(B2:B13)", "category": "aggregation"}],
            "domain": {"tag": "Crypto Mining", "confidence": 7.5},
            "unexpected": true
        }"#;

        let profile = Profile::from_json(json).unwrap();
        assert_eq!(profile.sheets.len(), 2);
        assert_eq!(profile.sheets[0].columns[1].inferred_type, ColumnType::Numeric);
        assert_eq!(profile.sheets[1].name, "");
        assert_eq!(profile.sheets[1].columns[0].name, "");
        assert_eq!(
            profile.domain.tag,
            DomainTag::Unrecognized("Crypto Mining".to_string())
        );
        assert_eq!(profile.domain.effective_confidence(), 0.0);
    }

    #[test]
    fn empty_object_is_empty_profile() {
        let profile = Profile::from_json("{}").unwrap();
        assert!(profile.is_empty());
        assert_eq!(profile, Profile::default());
    }

    #[test]
    fn non_json_is_decode_error() {
        assert!(matches!(
            Profile::from_json("not json"),
            Err(ProfileError::Decode(_))
        ));
    }

    #[test]
    fn metrics_and_summary() {
        let profile = Profile::new()
            .with_sheet(SheetProfile::new("Q1").with_columns(["Region", "Revenue"]))
            .with_sheet(SheetProfile::new("  ").with_columns(["Notes"]))
            .with_formula(FormulaRef::new("Q1", "B9", "=SUM(B2:B8)"))
            .with_formula(FormulaRef::new("Q1", "C9", "=PMT(0.05, 12, B9)"))
            .with_domain("sales", 0.8);

        let metrics = profile.metrics();
        assert_eq!(metrics.sheet_count, 2);
        assert_eq!(metrics.column_count, 3);
        assert_eq!(metrics.formula_count, 2);
        assert!((metrics.named_sheet_ratio - 0.5).abs() < f64::EPSILON);
        assert!((metrics.domain_confidence - 0.8).abs() < f64::EPSILON);

        let summary = profile.formula_summary();
        assert_eq!(summary.len(), FormulaCategory::ALL.len());
        assert_eq!(summary[&FormulaCategory::Aggregation], 1);
        assert_eq!(summary[&FormulaCategory::Financial], 1);
        assert_eq!(summary[&FormulaCategory::Lookup], 0);
    }

    #[test]
    fn nan_confidence_is_sanitized() {
        let mut profile = Profile::new().with_domain("financial", 0.5);
        profile.domain.confidence = f64::NAN;
        assert_eq!(profile.metrics().domain_confidence, 0.0);
    }
}
