//! Import scan and alias resolution

use crate::source::{line_of, named_children, PythonModule};
use crate::stdlib::is_stdlib;
use sheetsmith_model::{normalize_name, DependencyManifest};
use std::collections::BTreeMap;

/// One imported module
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ImportedModule {
    /// Dotted module path as written
    pub(crate) module: String,
    /// `from .x import y` style
    pub(crate) relative: bool,
    pub(crate) line: usize,
}

impl ImportedModule {
    fn top_level(&self) -> &str {
        self.module.split('.').next().unwrap_or_default()
    }
}

/// Imports of a module and the local names they bind
#[derive(Debug, Default)]
pub(crate) struct ImportTable {
    modules: Vec<ImportedModule>,
    bindings: BTreeMap<String, String>,
    wildcard_lines: Vec<usize>,
    wildcard_modules: Vec<String>,
}

impl ImportTable {
    /// Scan every import statement, including nested ones
    pub(crate) fn scan(module: &PythonModule<'_>) -> Self {
        let mut table = Self::default();
        for node in module.nodes() {
            match node.kind() {
                "import_statement" => table.scan_import(module, node),
                "import_from_statement" => table.scan_import_from(module, node),
                _ => {}
            }
        }
        table
    }

    fn scan_import(&mut self, module: &PythonModule<'_>, node: tree_sitter::Node<'_>) {
        let line = line_of(node);
        for item in named_children(node) {
            match item.kind() {
                "dotted_name" => {
                    let path = module.text(item).to_string();
                    let head = path.split('.').next().unwrap_or_default().to_string();
                    self.bindings.insert(head.clone(), head);
                    self.push(path, false, line);
                }
                "aliased_import" => {
                    let Some(name) = item.child_by_field_name("name") else {
                        continue;
                    };
                    let path = module.text(name).to_string();
                    if let Some(alias) = item.child_by_field_name("alias") {
                        self.bindings
                            .insert(module.text(alias).to_string(), path.clone());
                    }
                    self.push(path, false, line);
                }
                _ => {}
            }
        }
    }

    fn scan_import_from(&mut self, module: &PythonModule<'_>, node: tree_sitter::Node<'_>) {
        let line = line_of(node);
        let Some(source) = node.child_by_field_name("module_name") else {
            return;
        };
        let relative = source.kind() == "relative_import";
        let path = module.text(source).to_string();
        self.push(path.clone(), relative, line);

        let mut cursor = node.walk();
        let names: Vec<_> = node.children_by_field_name("name", &mut cursor).collect();
        for name in names {
            let (imported, local) = match name.kind() {
                "aliased_import" => {
                    let Some(inner) = name.child_by_field_name("name") else {
                        continue;
                    };
                    let local = name
                        .child_by_field_name("alias")
                        .map_or_else(|| module.text(inner), |a| module.text(a));
                    (module.text(inner), local)
                }
                _ => (module.text(name), module.text(name)),
            };
            if !relative {
                self.bindings
                    .insert(local.to_string(), format!("{path}.{imported}"));
            } else {
                self.bindings.remove(local);
            }
        }
        if named_children(node)
            .iter()
            .any(|c| c.kind() == "wildcard_import")
        {
            self.wildcard_lines.push(line);
            if !relative && !self.wildcard_modules.contains(&path) {
                self.wildcard_modules.push(path);
            }
        }
    }

    fn push(&mut self, module: String, relative: bool, line: usize) {
        if module.is_empty() {
            return;
        }
        self.modules.push(ImportedModule {
            module,
            relative,
            line,
        });
    }

    /// Qualified name a local dotted name refers to
    ///
    /// The first segment is looked up in the bindings; unbound names are
    /// returned unchanged.
    pub(crate) fn resolve(&self, dotted: &str) -> String {
        let (head, rest) = match dotted.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (dotted, None),
        };
        let base = self.bindings.get(head).map_or(head, String::as_str);
        match rest {
            Some(rest) => format!("{base}.{rest}"),
            None => base.to_string(),
        }
    }

    /// Qualified names an unbound dotted name may come from via `from m import *`
    ///
    /// Empty when the first segment is bound by an explicit import.
    pub(crate) fn wildcard_candidates(&self, dotted: &str) -> Vec<String> {
        let head = dotted.split('.').next().unwrap_or_default();
        if self.is_bound(head) {
            return Vec::new();
        }
        self.wildcard_modules
            .iter()
            .map(|m| format!("{m}.{dotted}"))
            .collect()
    }

    /// Whether a local name is rebound by an import
    pub(crate) fn is_bound(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub(crate) fn modules(&self) -> &[ImportedModule] {
        &self.modules
    }

    pub(crate) fn wildcard_lines(&self) -> &[usize] {
        &self.wildcard_lines
    }

    /// External top-level modules
    ///
    /// Excludes the standard library, `__future__`, relative imports and
    /// `local_modules`.
    pub(crate) fn external(&self, local_modules: &[String]) -> DependencyManifest {
        let local: Vec<String> = local_modules.iter().map(|m| normalize_name(m)).collect();
        self.modules
            .iter()
            .filter(|m| !m.relative)
            .map(ImportedModule::top_level)
            .filter(|top| !is_stdlib(top))
            .filter(|top| !local.contains(&normalize_name(top)))
            .collect()
    }

    /// Line of the first import of a top-level module
    pub(crate) fn first_line_of(&self, top: &str) -> Option<usize> {
        let folded = normalize_name(top);
        self.modules
            .iter()
            .find(|m| !m.relative && normalize_name(m.top_level()) == folded)
            .map(|m| m.line)
    }
}
