//! Universal fallback provider
//!
//! The terminal provider. It ignores domain detection and emits a small
//! Streamlit explorer parameterized only by sheet and column names. Any
//! profile shape is accepted: missing sheets become a placeholder, blank
//! names get positional names and duplicates are suffixed.

use crate::error::FallbackError;
use crate::literal::{py_str, py_str_list};
use sheetsmith_model::{DependencyManifest, GeneratedCode, Profile};
use std::collections::HashSet;
use std::fmt::Write;

/// External modules the fallback program imports
const FALLBACK_IMPORTS: [&str; 2] = ["pandas", "streamlit"];

const PLACEHOLDER_SHEET: &str = "Data";

const PROGRAM_BODY: &str = r#"

def load_workbook(uploaded_file):
    if uploaded_file.name.lower().endswith(".csv"):
        return {"Data": pd.read_csv(uploaded_file)}
    return pd.read_excel(uploaded_file, sheet_name=None)


def describe_expected():
    for sheet_name, columns in EXPECTED_SHEETS:
        st.subheader(sheet_name)
        if columns:
            st.write(", ".join(columns))
        else:
            st.write("No columns detected")


def main():
    st.set_page_config(page_title="Data Explorer", layout="wide")
    st.title("Data Explorer")
    uploaded_file = st.file_uploader("Upload the workbook", type=["xlsx", "xls", "csv"])
    if uploaded_file is None:
        st.info("Upload the workbook to explore its sheets.")
        describe_expected()
        return
    try:
        sheets = load_workbook(uploaded_file)
    except Exception as exc:
        st.error(f"Could not read the workbook: {exc}")
        return
    for sheet_name, df in sheets.items():
        st.subheader(str(sheet_name))
        st.metric("Rows", len(df))
        st.dataframe(df, use_container_width=True)


if __name__ == "__main__":
    main()
"#;

/// Sheet name plus column names, sanitized for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetOutline {
    /// Unique, non-blank sheet name
    pub name: String,
    /// Unique, non-blank column names
    pub columns: Vec<String>,
}

/// Sanitized sheet outlines; never empty
#[must_use]
pub fn outline(profile: &Profile) -> Vec<SheetOutline> {
    let mut sheet_names = UniqueNames::default();
    let mut sheets: Vec<SheetOutline> = profile
        .sheets
        .iter()
        .enumerate()
        .map(|(i, sheet)| {
            let name = sheet_names.claim(&sheet.name, || format!("Sheet {}", i + 1));
            let mut column_names = UniqueNames::default();
            let columns = sheet
                .column_names()
                .enumerate()
                .map(|(j, c)| column_names.claim(c, || format!("Column {}", j + 1)))
                .collect();
            SheetOutline { name, columns }
        })
        .collect();
    if sheets.is_empty() {
        sheets.push(SheetOutline {
            name: PLACEHOLDER_SHEET.to_string(),
            columns: Vec::new(),
        });
    }
    sheets
}

#[derive(Default)]
struct UniqueNames {
    seen: HashSet<String>,
}

impl UniqueNames {
    fn claim(&mut self, raw: &str, positional: impl FnOnce() -> String) -> String {
        let trimmed = raw.trim();
        let base = if trimmed.is_empty() {
            positional()
        } else {
            trimmed.to_string()
        };
        let mut candidate = base.clone();
        let mut n = 2;
        while !self.seen.insert(candidate.to_lowercase()) {
            candidate = format!("{base} ({n})");
            n += 1;
        }
        candidate
    }
}

/// Terminal provider
#[derive(Debug, Clone, Copy, Default)]
pub struct UniversalFallbackProvider;

impl UniversalFallbackProvider {
    /// Create provider
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Render the fallback program
    ///
    /// # Errors
    /// Only on a rendering defect; no profile content can cause one
    pub fn generate(&self, profile: &Profile) -> Result<GeneratedCode, FallbackError> {
        let sheets = outline(profile);
        let mut source = String::with_capacity(PROGRAM_BODY.len() + 64 * sheets.len());

        writeln!(source, "import pandas as pd")?;
        writeln!(source, "import streamlit as st")?;
        writeln!(source)?;
        writeln!(source, "EXPECTED_SHEETS = [")?;
        for sheet in &sheets {
            writeln!(
                source,
                "    ({}, {}),",
                py_str(&sheet.name),
                py_str_list(&sheet.columns)
            )?;
        }
        writeln!(source, "]")?;
        source.push_str(PROGRAM_BODY);

        if source.trim().is_empty() {
            return Err(FallbackError::Empty);
        }
        Ok(GeneratedCode::new(
            source,
            DependencyManifest::from_names(FALLBACK_IMPORTS),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use sheetsmith_model::SheetProfile;

    #[test]
    fn empty_profile_gets_placeholder_sheet() {
        let sheets = outline(&Profile::new());
        assert_eq!(
            sheets,
            vec![SheetOutline {
                name: "Data".into(),
                columns: vec![]
            }]
        );
    }

    #[test]
    fn blank_and_duplicate_names_are_sanitized() {
        let profile = Profile::new()
            .with_sheet(SheetProfile::new("  ").with_columns(["", "a", "A"]))
            .with_sheet(SheetProfile::new("Sales"))
            .with_sheet(SheetProfile::new("sales"));
        let sheets = outline(&profile);
        let names: Vec<_> = sheets.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Sheet 1", "Sales", "sales (2)"]);
        assert_eq!(sheets[0].columns, vec!["Column 1", "a", "A (2)"]);
    }

    #[test]
    fn hostile_names_stay_inside_literals() {
        let profile = Profile::new().with_sheet(
            SheetProfile::new("\"), __import__('os').system('x') #").with_columns(["x\n\"\"\""]),
        );
        let code = UniversalFallbackProvider::new().generate(&profile).unwrap();
        assert!(code
            .source
            .contains(r#"("\"), __import__('os').system('x') #", ["x\n\"\"\""]),"#));
        assert_eq!(
            code.declared.names().collect::<Vec<_>>(),
            vec!["pandas", "streamlit"]
        );
    }
}
