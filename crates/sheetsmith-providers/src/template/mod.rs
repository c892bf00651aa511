//! Template provider
//!
//! Deterministic and network-free: picks a template by domain tag and fills
//! it from the profile's sheet names, column names and formula summary.

mod library;

pub use library::{template_for, DomainTemplate, LIBRARY};

use crate::fallback::outline;
use crate::literal::{py_str, py_str_list};
use sheetsmith_model::{DependencyManifest, GeneratedCode, Profile};
use tracing::debug;

const SHARED_HELPERS: &str = r#"

def load_workbook(uploaded_file):
    if uploaded_file.name.lower().endswith(".csv"):
        return {"Data": pd.read_csv(uploaded_file)}
    return pd.read_excel(uploaded_file, sheet_name=None)


def render_formula_summary():
    if sum(FORMULA_SUMMARY.values()) == 0:
        return
    with st.sidebar:
        st.subheader("Workbook formulas")
        for category, count in FORMULA_SUMMARY.items():
            if count:
                st.write(f"{category}: {count}")


def render_sheet(sheet_name, df):
"#;

const MAIN: &str = r#"

def main():
    st.set_page_config(page_title=APP_TITLE, layout="wide")
    st.title(APP_TITLE)
    render_formula_summary()
    uploaded_file = st.file_uploader(UPLOAD_LABEL, type=["xlsx", "xls", "csv"])
    if uploaded_file is None:
        st.info(EMPTY_HINT)
        for sheet_name, columns in EXPECTED_SHEETS:
            listing = ", ".join(columns) if columns else "no columns detected"
            st.caption(f"{sheet_name}: {listing}")
        return
    try:
        sheets = load_workbook(uploaded_file)
    except Exception as exc:
        st.error(f"Could not read the workbook: {exc}")
        return
    for sheet_name, df in sheets.items():
        with st.expander(str(sheet_name), expanded=True):
            render_sheet(sheet_name, df)


if __name__ == "__main__":
    main()
"#;

/// Domain template provider
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateProvider;

impl TemplateProvider {
    /// Create provider
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Template chosen for a profile
    #[must_use]
    pub fn select(&self, profile: &Profile) -> &'static DomainTemplate {
        template_for(&profile.domain.tag)
    }

    /// Render the selected template
    #[must_use]
    pub fn generate(&self, profile: &Profile) -> GeneratedCode {
        let template = self.select(profile);
        debug!(template = template.key, domain = %profile.domain.tag, "rendering template");

        let title = match profile.source_name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => format!("{} ({name})", template.title),
            _ => template.title.to_string(),
        };

        let mut source = String::with_capacity(4096);
        source.push_str("import pandas as pd\n");
        if template.uses_plotly {
            source.push_str("import plotly.express as px\n");
        }
        source.push_str("import streamlit as st\n\n");

        source.push_str(&format!("APP_TITLE = {}\n", py_str(&title)));
        source.push_str(&format!("UPLOAD_LABEL = {}\n", py_str(template.upload_label)));
        source.push_str(&format!("EMPTY_HINT = {}\n", py_str(template.empty_hint)));

        source.push_str("EXPECTED_SHEETS = [\n");
        for sheet in outline(profile) {
            source.push_str(&format!(
                "    ({}, {}),\n",
                py_str(&sheet.name),
                py_str_list(&sheet.columns)
            ));
        }
        source.push_str("]\n");

        source.push_str("FORMULA_SUMMARY = {\n");
        for (category, count) in profile.formula_summary() {
            source.push_str(&format!("    {}: {count},\n", py_str(category.as_str())));
        }
        source.push_str("}\n");

        source.push_str(SHARED_HELPERS);
        source.push_str(template.sheet_view);
        source.push_str(MAIN);

        GeneratedCode::new(source, DependencyManifest::from_names(template.imports()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sheetsmith_model::{FormulaRef, SheetProfile};

    #[test]
    fn fills_placeholders_from_profile() {
        let profile = Profile::new()
            .with_source_name("Q3 \"final\".xlsx")
            .with_domain("financial", 0.9)
            .with_sheet(SheetProfile::new("Revenue").with_columns(["Month", "Amount"]))
            .with_formula(FormulaRef::new("Revenue", "B10", "=SUM(B2:B9)"));

        let code = TemplateProvider::new().generate(&profile);
        assert!(code
            .source
            .contains(r#"APP_TITLE = "Financial Dashboard (Q3 \"final\".xlsx)""#));
        assert!(code.source.contains(r#"    ("Revenue", ["Month", "Amount"]),"#));
        assert!(code.source.contains(r#"    "aggregation": 1,"#));
        assert!(code.source.contains("import plotly.express as px"));
        assert_eq!(
            code.declared.names().collect::<Vec<_>>(),
            vec!["pandas", "plotly", "streamlit"]
        );
    }

    #[test]
    fn unrecognized_domain_uses_generic_template() {
        let profile = Profile::new().with_domain("astrology", 0.8);
        let provider = TemplateProvider::new();
        assert_eq!(provider.select(&profile).key, "generic");
        assert!(provider
            .generate(&profile)
            .source
            .contains(r#"APP_TITLE = "Data Explorer""#));
    }
}
