//! Python literal rendering
//!
//! Every profile-derived value reaches generated source through these
//! helpers. JSON string escaping is a subset of Python's, so the output is
//! always a single well-formed Python string literal.

/// Quoted, escaped Python string literal
#[must_use]
pub fn py_str(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| String::from("\"\""))
}

/// Python list of string literals
#[must_use]
pub fn py_str_list<I, S>(values: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let items: Vec<String> = values.into_iter().map(|v| py_str(v.as_ref())).collect();
    format!("[{}]", items.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn escapes_quotes_newlines_and_backslashes() {
        assert_eq!(py_str("a\"b"), r#""a\"b""#);
        assert_eq!(py_str("line\nbreak"), r#""line\nbreak""#);
        assert_eq!(py_str(r"C:\tmp"), r#""C:\\tmp""#);
        assert_eq!(py_str("\u{0}"), r#""\u0000""#);
    }

    #[test]
    fn renders_lists() {
        assert_eq!(py_str_list(["x", "y'z"]), r#"["x", "y'z"]"#);
        assert_eq!(py_str_list(Vec::<String>::new()), "[]");
    }
}
