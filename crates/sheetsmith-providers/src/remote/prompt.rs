//! Prompt construction
//!
//! Two stages: an analysis prompt that asks the model to describe the
//! workbook's structure and business logic, and a generation prompt that
//! asks for the application in the file-marker format.

use crate::remote::transport::ChatMessage;
use sheetsmith_model::Profile;
use std::fmt::Write;

/// System prompt for the generation stage
pub const GENERATION_SYSTEM_PROMPT: &str = "You are an expert Python developer specializing in creating Streamlit applications from Excel files. Generate complete, runnable code.";

/// System prompt for the analysis stage
pub const ANALYSIS_SYSTEM_PROMPT: &str = "You are a senior business analyst. Describe spreadsheet structure and business logic precisely and concisely.";

/// Sheets listed in a prompt before truncating
const MAX_PROMPT_SHEETS: usize = 50;
/// Formulas listed in a prompt before truncating
const MAX_PROMPT_FORMULAS: usize = 100;

/// Structured profile summary shared by both stages
#[must_use]
pub fn profile_summary(profile: &Profile) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail
    let _ = write_summary(&mut out, profile);
    out
}

fn write_summary(out: &mut String, profile: &Profile) -> std::fmt::Result {
    let metrics = profile.metrics();
    writeln!(out, "WORKBOOK PROFILE")?;
    if let Some(name) = &profile.source_name {
        writeln!(out, "- File: {name}")?;
    }
    writeln!(
        out,
        "- Domain: {} (confidence {:.2})",
        profile.domain.tag,
        profile.domain.effective_confidence()
    )?;
    writeln!(
        out,
        "- Sheets: {}, columns: {}, formulas: {}",
        metrics.sheet_count, metrics.column_count, metrics.formula_count
    )?;
    writeln!(
        out,
        "- Charts: {}, macros: {}",
        yes_no(profile.has_charts),
        yes_no(profile.has_macros)
    )?;

    writeln!(out, "\nSHEETS")?;
    if profile.sheets.is_empty() {
        writeln!(out, "- (none detected)")?;
    }
    for sheet in profile.sheets.iter().take(MAX_PROMPT_SHEETS) {
        let columns: Vec<String> = sheet
            .columns
            .iter()
            .map(|c| format!("{} [{}]", c.name, c.inferred_type.as_str()))
            .collect();
        writeln!(
            out,
            "- {} ({} rows): {}",
            sheet.name,
            sheet.row_count,
            if columns.is_empty() {
                "no columns".to_string()
            } else {
                columns.join(", ")
            }
        )?;
    }
    if profile.sheets.len() > MAX_PROMPT_SHEETS {
        writeln!(out, "- ... {} more", profile.sheets.len() - MAX_PROMPT_SHEETS)?;
    }

    writeln!(out, "\nFORMULA CATEGORIES")?;
    for (category, count) in profile.formula_summary() {
        writeln!(out, "- {category}: {count}")?;
    }
    if !profile.formulas.is_empty() {
        writeln!(out, "\nFORMULAS")?;
        for f in profile.formulas.iter().take(MAX_PROMPT_FORMULAS) {
            writeln!(out, "- {}!{}: {}", f.sheet, f.cell, f.expression)?;
        }
        if profile.formulas.len() > MAX_PROMPT_FORMULAS {
            writeln!(
                out,
                "- ... {} more",
                profile.formulas.len() - MAX_PROMPT_FORMULAS
            )?;
        }
    }
    Ok(())
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

/// Messages for the analysis stage
#[must_use]
pub fn analysis_messages(profile: &Profile, instructions: &str) -> Vec<ChatMessage> {
    let body = format!(
        "INSTRUCTIONS:\n{instructions}\n\n{summary}\n\
ANALYSIS GUIDANCE:\n\
1. Identify key data structures and business logic\n\
2. Note calculations the application must reproduce\n\
3. Suggest useful views, filters and charts\n\
4. Highlight data validation rules\n",
        summary = profile_summary(profile)
    );
    vec![
        ChatMessage::system(ANALYSIS_SYSTEM_PROMPT),
        ChatMessage::user(body),
    ]
}

/// Messages for the generation stage
///
/// `analysis` is the narrative from the analysis stage, when it ran.
#[must_use]
pub fn generation_messages(
    profile: &Profile,
    instructions: &str,
    analysis: Option<&str>,
    entry_point: &str,
) -> Vec<ChatMessage> {
    let mut body = format!("PROJECT REQUIREMENTS:\n{instructions}\n\n{}", profile_summary(profile));
    if let Some(analysis) = analysis.map(str::trim).filter(|a| !a.is_empty()) {
        body.push_str("\nANALYSIS CONTEXT:\n");
        body.push_str(analysis);
        body.push('\n');
    }
    body.push_str(&format!(
        "
OUTPUT RULES:
1. Produce a single-file Streamlit application with a module-level `def {entry_point}():`
   invoked under `if __name__ == \"__main__\":`.
2. Do not spawn processes, evaluate dynamic code, delete files or make network calls.
3. Include error handling; avoid bare `except:` and debugging prints.
4. List every third-party package the code imports, and nothing else, in requirements.txt.

Use THIS EXACT FORMAT for each file:

FILENAME: app.py
CONTENT:
... file content ...
====
FILENAME: requirements.txt
CONTENT:
streamlit
pandas
====
"
    ));
    vec![
        ChatMessage::system(GENERATION_SYSTEM_PROMPT),
        ChatMessage::user(body),
    ]
}
