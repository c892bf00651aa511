//! Parsed Python module and tree helpers

use tree_sitter::{Language, Node, Parser, Tree};

/// Source text with its tree-sitter parse
///
/// `tree` is `None` only when the parser itself could not be driven, which
/// the syntax check reports like any other parse failure.
pub(crate) struct PythonModule<'s> {
    source: &'s str,
    tree: Option<Tree>,
}

impl<'s> PythonModule<'s> {
    pub(crate) fn parse(source: &'s str) -> Self {
        let language: Language = tree_sitter_python::LANGUAGE.into();
        let mut parser = Parser::new();
        let tree = match parser.set_language(&language) {
            Ok(()) => parser.parse(source, None),
            Err(e) => {
                tracing::error!(error = %e, "python grammar rejected by parser");
                None
            }
        };
        Self { source, tree }
    }

    pub(crate) fn source(&self) -> &'s str {
        self.source
    }

    pub(crate) fn root(&self) -> Option<Node<'_>> {
        self.tree.as_ref().map(Tree::root_node)
    }

    pub(crate) fn text(&self, node: Node<'_>) -> &'s str {
        node.utf8_text(self.source.as_bytes()).unwrap_or("")
    }

    /// Module-level statements, comments excluded
    pub(crate) fn statements(&self) -> Vec<Node<'_>> {
        self.root()
            .map(|root| {
                named_children(root)
                    .into_iter()
                    .filter(|n| n.kind() != "comment")
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Every named node in document order
    pub(crate) fn nodes(&self) -> Vec<Node<'_>> {
        self.root().map(descendants).unwrap_or_default()
    }
}

/// 1-based line of a node
#[inline]
pub(crate) fn line_of(node: Node<'_>) -> usize {
    node.start_position().row + 1
}

pub(crate) fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

/// Named nodes under `root` (inclusive), pre-order
pub(crate) fn descendants(root: Node<'_>) -> Vec<Node<'_>> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        out.push(node);
        stack.extend(named_children(node).into_iter().rev());
    }
    out
}

/// First error or missing node, searching only subtrees that contain errors
pub(crate) fn first_syntax_error(root: Node<'_>) -> Option<Node<'_>> {
    if root.is_error() || root.is_missing() {
        return Some(root);
    }
    if !root.has_error() {
        return None;
    }
    let mut cursor = root.walk();
    let children: Vec<Node<'_>> = root.children(&mut cursor).collect();
    children.into_iter().find_map(first_syntax_error)
}

/// Value of a plain string literal
///
/// Returns `None` for f-strings with interpolations and implicit
/// concatenations, whose value is not known statically.
pub(crate) fn string_literal(node: Node<'_>, text: &str) -> Option<String> {
    if node.kind() != "string" {
        return None;
    }
    if named_children(node)
        .iter()
        .any(|c| c.kind() == "interpolation")
    {
        return None;
    }
    let body = text.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if body.len() >= quote.len() * 2 && body.starts_with(quote) && body.ends_with(quote) {
            return Some(body[quote.len()..body.len() - quote.len()].to_string());
        }
    }
    None
}
