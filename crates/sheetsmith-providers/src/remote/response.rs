//! Code extraction from model replies
//!
//! Two reply shapes are understood, tried in order:
//! 1. File markers: `FILENAME: x` / `CONTENT:` / body / `====`
//! 2. Fenced markdown blocks
//!
//! Unfenced text is taken whole when it contains an import line.

use crate::error::ProviderError;
use once_cell::sync::Lazy;
use regex::Regex;
use sheetsmith_model::{DependencyManifest, GeneratedCode};

static FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```[ \t]*([A-Za-z0-9_+.-]*)[^\n]*\n(.*?)```").expect("static regex")
});

const CODE_FILES: [&str; 2] = ["app.py", "main.py"];
const REQUIREMENTS_FILE: &str = "requirements.txt";

/// A file parsed from marker format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkedFile {
    /// Relative path as given
    pub name: String,
    /// File body, trimmed
    pub content: String,
}

impl MarkedFile {
    fn basename(&self) -> &str {
        self.name.rsplit(['/', '\\']).next().unwrap_or(&self.name)
    }
}

/// Parse `FILENAME:` / `CONTENT:` / `====` blocks
///
/// Lines before the first marker are ignored; a file without `====` runs
/// to the end of the reply.
#[must_use]
pub fn parse_marked_files(reply: &str) -> Vec<MarkedFile> {
    let mut files = Vec::new();
    let mut current: Option<String> = None;
    let mut body: Vec<&str> = Vec::new();
    let mut in_content = false;

    for line in reply.lines() {
        let stripped = line.trim();
        if let Some(name) = stripped.strip_prefix("FILENAME:") {
            flush(current.take(), &mut body, &mut files);
            let name = name.trim();
            current = (!name.is_empty()).then(|| name.to_string());
            in_content = false;
        } else if stripped == "CONTENT:" && !in_content {
            in_content = current.is_some();
        } else if stripped == "====" {
            flush(current.take(), &mut body, &mut files);
            in_content = false;
        } else if in_content {
            body.push(line);
        }
    }
    flush(current.take(), &mut body, &mut files);
    files
}

fn flush(name: Option<String>, body: &mut Vec<&str>, files: &mut Vec<MarkedFile>) {
    if let Some(name) = name {
        let content = body.join("\n").trim().to_string();
        if !content.is_empty() {
            files.push(MarkedFile { name, content });
        }
    }
    body.clear();
}

/// A fenced markdown block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FencedBlock {
    /// Info string language, lowercased (may be empty)
    pub lang: String,
    /// Block body
    pub content: String,
}

/// All fenced blocks in order
#[must_use]
pub fn parse_fenced_blocks(reply: &str) -> Vec<FencedBlock> {
    FENCE
        .captures_iter(reply)
        .map(|c| FencedBlock {
            lang: c[1].to_ascii_lowercase(),
            content: c[2].trim().to_string(),
        })
        .collect()
}

fn has_import_line(text: &str) -> bool {
    text.lines().any(|l| {
        let l = l.trim_start();
        l.starts_with("import ") || l.starts_with("from ")
    })
}

fn from_marked(files: &[MarkedFile]) -> Option<GeneratedCode> {
    let code = files
        .iter()
        .find(|f| CODE_FILES.contains(&f.basename()))
        .or_else(|| files.iter().find(|f| f.basename().ends_with(".py")))?;
    let declared = files
        .iter()
        .find(|f| f.basename().eq_ignore_ascii_case(REQUIREMENTS_FILE))
        .map(|f| DependencyManifest::from_requirements(&f.content))
        .unwrap_or_default();
    Some(GeneratedCode::new(code.content.clone(), declared))
}

fn from_fenced(blocks: &[FencedBlock]) -> Option<GeneratedCode> {
    let code_index = blocks
        .iter()
        .position(|b| matches!(b.lang.as_str(), "python" | "py" | "python3"))
        .or_else(|| {
            blocks.iter().position(|b| {
                b.lang.is_empty() && !DependencyManifest::looks_like_requirements(&b.content)
            })
        })?;
    let declared = blocks
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != code_index)
        .map(|(_, b)| b)
        .find(|b| {
            matches!(b.lang.as_str(), "requirements" | "text" | "txt" | "")
                && DependencyManifest::looks_like_requirements(&b.content)
        })
        .map(|b| DependencyManifest::from_requirements(&b.content))
        .unwrap_or_default();
    Some(GeneratedCode::new(blocks[code_index].content.clone(), declared))
}

/// Extract candidate code and its declared manifest
///
/// A reply without a requirements section declares an empty manifest.
///
/// # Errors
/// Returns `NoExtractableCode` when no shape yields non-blank code
pub fn extract(reply: &str) -> Result<GeneratedCode, ProviderError> {
    let candidate = from_marked(&parse_marked_files(reply))
        .or_else(|| from_fenced(&parse_fenced_blocks(reply)))
        .or_else(|| {
            (!reply.contains("```") && has_import_line(reply))
                .then(|| GeneratedCode::new(reply.trim(), DependencyManifest::new()))
        });
    match candidate {
        Some(code) if !code.is_blank() => Ok(code),
        _ => Err(ProviderError::NoExtractableCode),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn marker_format() {
        let reply = "Here you go.\n\
FILENAME: README.md\n\
CONTENT:\n\
# Title\n\
====\n\
FILENAME: src/app.py\n\
CONTENT:\n\
import streamlit as st\n\
\n\
def main():\n\
    st.title(\"x\")\n\
====\n\
FILENAME: requirements.txt\n\
CONTENT:\n\
streamlit>=1.22\n\
====\n";
        let code = extract(reply).unwrap();
        assert_eq!(
            code.source,
            "import streamlit as st\n\ndef main():\n    st.title(\"x\")"
        );
        assert_eq!(code.declared.names().collect::<Vec<_>>(), vec!["streamlit"]);
    }

    #[test]
    fn marker_file_without_terminator_runs_to_end() {
        let files = parse_marked_files("FILENAME: main.py\nCONTENT:\nx = 1\n");
        assert_eq!(
            files,
            vec![MarkedFile {
                name: "main.py".into(),
                content: "x = 1".into()
            }]
        );
    }

    #[test]
    fn fenced_format() {
        let reply = "Sure!\n```python\nimport pandas as pd\nprint(pd)\n```\nInstall:\n```\npandas==2.1\nstreamlit\n```\n";
        let code = extract(reply).unwrap();
        assert_eq!(code.source, "import pandas as pd\nprint(pd)");
        assert_eq!(
            code.declared.names().collect::<Vec<_>>(),
            vec!["pandas", "streamlit"]
        );
    }

    #[test]
    fn unlabelled_fence_is_code_when_not_requirements() {
        let reply = "```\nimport os\nx = 1\n```";
        assert_eq!(extract(reply).unwrap().source, "import os\nx = 1");
    }

    #[test]
    fn bare_code_is_accepted() {
        let code = extract("import streamlit as st\nst.write(1)\n").unwrap();
        assert_eq!(code.source, "import streamlit as st\nst.write(1)");
        assert!(code.declared.is_empty());
    }

    #[test]
    fn prose_is_not_code() {
        assert_eq!(
            extract("I'm sorry, I cannot help with that."),
            Err(ProviderError::NoExtractableCode)
        );
        assert_eq!(extract(""), Err(ProviderError::NoExtractableCode));
        assert_eq!(
            extract("```python\n\n```"),
            Err(ProviderError::NoExtractableCode)
        );
    }
}
