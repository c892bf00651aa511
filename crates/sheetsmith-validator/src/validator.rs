//! Output validator
//!
//! Runs every check against a candidate, in order:
//! 1. `syntax`
//! 2. `forbidden-construct`
//! 3. `entry-point`
//! 4. `dependency-manifest`
//!
//! All checks always run. Malformed input, including an empty string, is a
//! FAIL verdict and never an error.

use crate::check::{Advisory, AdvisoryKind, CheckId, Violation};
use crate::config::ValidatorConfig;
use crate::imports::ImportTable;
use crate::rules::{ForbiddenRule, RuleKind, TargetPattern};
use crate::source::{
    descendants, first_syntax_error, line_of, named_children, string_literal, PythonModule,
};
use crate::verdict::Verdict;
use sheetsmith_model::{DependencyManifest, GeneratedCode};
use tracing::debug;
use tree_sitter::Node;

struct CompiledRule {
    rule: ForbiddenRule,
    patterns: Vec<TargetPattern>,
}

/// Acceptance gate for candidate source
pub struct OutputValidator {
    config: ValidatorConfig,
    rules: Vec<CompiledRule>,
}

impl std::fmt::Debug for OutputValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputValidator")
            .field("entry_point", &self.config.entry_point.function)
            .field("rules", &self.rules.len())
            .finish_non_exhaustive()
    }
}

impl Default for OutputValidator {
    fn default() -> Self {
        Self::new(ValidatorConfig::default())
    }
}

impl OutputValidator {
    /// Create validator
    ///
    /// Configuration is expected to have passed
    /// [`ValidatorConfig::validate`]; malformed targets simply never match.
    #[must_use]
    pub fn new(config: ValidatorConfig) -> Self {
        let rules = config
            .forbidden
            .iter()
            .map(|rule| CompiledRule {
                patterns: rule.patterns(),
                rule: rule.clone(),
            })
            .collect();
        Self { config, rules }
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validate a candidate against its declared manifest
    #[must_use]
    pub fn validate(&self, candidate: &GeneratedCode) -> Verdict {
        self.validate_source(&candidate.source, &candidate.declared)
    }

    /// Validate raw source against a declared manifest
    #[must_use]
    pub fn validate_source(&self, source: &str, declared: &DependencyManifest) -> Verdict {
        let module = PythonModule::parse(source);
        let imports = ImportTable::scan(&module);
        let used = imports.external(&self.config.local_modules);

        let mut violations = Vec::new();
        check_syntax(&module, &mut violations);
        self.check_forbidden(&module, &imports, &mut violations);
        self.check_entry_point(&module, &mut violations);
        check_manifest(declared, &used, &imports, &mut violations);
        let advisories = collect_advisories(&module, &imports);

        let verdict = Verdict::new(violations, advisories, used);
        debug!(
            pass = verdict.is_pass(),
            violations = verdict.violations().len(),
            advisories = verdict.advisory_count(),
            "validated candidate"
        );
        verdict
    }

    fn check_forbidden(
        &self,
        module: &PythonModule<'_>,
        imports: &ImportTable,
        out: &mut Vec<Violation>,
    ) {
        for rule in self.rules.iter().filter(|r| r.rule.kind == RuleKind::Import) {
            for imported in imports.modules().iter().filter(|m| !m.relative) {
                if rule.patterns.iter().any(|p| p.matches_module(&imported.module)) {
                    out.push(
                        Violation::new(
                            CheckId::ForbiddenConstruct,
                            format!("import of `{}`", imported.module),
                        )
                        .at_line(imported.line)
                        .with_rule(&rule.rule.id),
                    );
                }
            }
        }

        for node in module.nodes() {
            let (last, candidates) = match node.kind() {
                "call" => {
                    let Some(function) = node.child_by_field_name("function") else {
                        continue;
                    };
                    let Some(last) = last_segment(module, function) else {
                        continue;
                    };
                    (last, call_candidates(module, imports, function))
                }
                "exec_statement" => ("exec", vec![Some("exec".to_string())]),
                _ => continue,
            };

            for rule in self.rules.iter().filter(|r| r.rule.kind != RuleKind::Import) {
                let Some(hit) = candidates.iter().find(|c| {
                    rule.patterns
                        .iter()
                        .any(|p| p.matches_call(c.as_deref(), last))
                }) else {
                    continue;
                };
                let shown = hit.clone().unwrap_or_else(|| format!("*.{last}"));
                let message = match rule.rule.kind {
                    RuleKind::Network => match destination_host(module, node) {
                        Some(host) if rule.rule.permits_host(&host) => continue,
                        Some(host) => format!("network call `{shown}` to `{host}`"),
                        None => format!("network call `{shown}` to unverifiable destination"),
                    },
                    _ => format!("call to `{shown}`"),
                };
                out.push(
                    Violation::new(CheckId::ForbiddenConstruct, message)
                        .at_line(line_of(node))
                        .with_rule(&rule.rule.id),
                );
            }
        }
    }

    fn check_entry_point(&self, module: &PythonModule<'_>, out: &mut Vec<Violation>) {
        let entry = &self.config.entry_point;
        let statements = module.statements();

        let defined = statements.iter().any(|stmt| {
            let def = match stmt.kind() {
                "decorated_definition" => stmt.child_by_field_name("definition"),
                _ => Some(*stmt),
            };
            def.filter(|d| d.kind() == "function_definition")
                .and_then(|d| d.child_by_field_name("name"))
                .is_some_and(|name| module.text(name) == entry.function)
        });
        if !defined {
            out.push(Violation::new(
                CheckId::EntryPoint,
                format!("module-level function `{}` is not defined", entry.function),
            ));
            return;
        }
        if !entry.require_invocation {
            return;
        }

        let invoked = statements.iter().any(|stmt| match stmt.kind() {
            "expression_statement" => calls_function(module, *stmt, &entry.function),
            "if_statement" => {
                is_main_guard(module, *stmt)
                    && stmt
                        .child_by_field_name("consequence")
                        .is_some_and(|body| calls_function(module, body, &entry.function))
            }
            _ => false,
        });
        if !invoked {
            out.push(Violation::new(
                CheckId::EntryPoint,
                format!(
                    "`{}` is never invoked at module level or under a __main__ guard",
                    entry.function
                ),
            ));
        }
    }
}

fn check_syntax(module: &PythonModule<'_>, out: &mut Vec<Violation>) {
    if module.source().trim().is_empty() {
        out.push(Violation::new(CheckId::Syntax, "module is empty"));
        return;
    }
    let Some(root) = module.root() else {
        out.push(Violation::new(CheckId::Syntax, "source could not be parsed"));
        return;
    };
    if let Some(error) = first_syntax_error(root) {
        let what = if error.is_missing() {
            format!("missing `{}`", error.kind())
        } else {
            "invalid syntax".to_string()
        };
        out.push(Violation::new(CheckId::Syntax, what).at_line(line_of(error)));
    } else if module.statements().is_empty() {
        out.push(Violation::new(CheckId::Syntax, "module has no statements"));
    }

    // Python 2 statement forms the grammar still accepts
    for node in module.nodes() {
        let what = match node.kind() {
            "print_statement" => "`print` statement is not valid Python 3",
            "exec_statement" => "`exec` statement is not valid Python 3",
            _ => continue,
        };
        out.push(Violation::new(CheckId::Syntax, what).at_line(line_of(node)));
    }
}

fn check_manifest(
    declared: &DependencyManifest,
    used: &DependencyManifest,
    imports: &ImportTable,
    out: &mut Vec<Violation>,
) {
    let diff = declared.diff(used);
    for name in &diff.missing {
        let mut violation = Violation::new(
            CheckId::DependencyManifest,
            format!("`{name}` is imported but not declared"),
        );
        if let Some(line) = imports.first_line_of(name) {
            violation = violation.at_line(line);
        }
        out.push(violation);
    }
    for name in &diff.extra {
        out.push(Violation::new(
            CheckId::DependencyManifest,
            format!("`{name}` is declared but never imported"),
        ));
    }
}

fn collect_advisories(module: &PythonModule<'_>, imports: &ImportTable) -> Vec<Advisory> {
    let mut advisories: Vec<Advisory> = imports
        .wildcard_lines()
        .iter()
        .map(|line| Advisory::new(AdvisoryKind::WildcardImport, Some(*line)))
        .collect();

    let nodes = module.nodes();
    let mut has_try = false;
    for node in &nodes {
        match node.kind() {
            "try_statement" => has_try = true,
            "except_clause" => {
                let typed = named_children(*node)
                    .iter()
                    .any(|c| !matches!(c.kind(), "block" | "comment"));
                if !typed {
                    advisories.push(Advisory::new(AdvisoryKind::BareExcept, Some(line_of(*node))));
                }
            }
            "call" => {
                let is_print = node
                    .child_by_field_name("function")
                    .is_some_and(|f| f.kind() == "identifier" && module.text(f) == "print");
                if is_print && !imports.is_bound("print") {
                    advisories.push(Advisory::new(AdvisoryKind::DebugPrint, Some(line_of(*node))));
                }
            }
            _ => {}
        }
    }
    if !has_try && !module.statements().is_empty() {
        advisories.push(Advisory::new(AdvisoryKind::NoErrorHandling, None));
    }
    advisories
}

/// Final name segment of a callee expression
fn last_segment<'s>(module: &PythonModule<'s>, function: Node<'_>) -> Option<&'s str> {
    match function.kind() {
        "identifier" => Some(module.text(function)),
        "attribute" => function
            .child_by_field_name("attribute")
            .map(|a| module.text(a)),
        _ => None,
    }
}

/// Names a callee may resolve to
///
/// `None` stands for a callee whose receiver is not a plain name chain.
/// Unbound names are also qualified against every wildcard import source.
fn call_candidates(
    module: &PythonModule<'_>,
    imports: &ImportTable,
    function: Node<'_>,
) -> Vec<Option<String>> {
    let Some(qualified) = qualified_name(module, imports, function) else {
        return vec![None];
    };
    let mut candidates = vec![Some(qualified)];
    candidates.extend(
        imports
            .wildcard_candidates(module.text(function))
            .into_iter()
            .map(Some),
    );
    candidates
}

/// Fully qualified callee, when its receiver chain is plain names
fn qualified_name(
    module: &PythonModule<'_>,
    imports: &ImportTable,
    function: Node<'_>,
) -> Option<String> {
    if !is_name_chain(function) {
        return None;
    }
    Some(imports.resolve(module.text(function)))
}

fn is_name_chain(node: Node<'_>) -> bool {
    match node.kind() {
        "identifier" => true,
        "attribute" => node
            .child_by_field_name("object")
            .is_some_and(is_name_chain),
        _ => false,
    }
}

/// Host of a literal URL passed as first positional or `url=` argument
fn destination_host(module: &PythonModule<'_>, call: Node<'_>) -> Option<String> {
    let arguments = call.child_by_field_name("arguments")?;
    let args = named_children(arguments);
    let target = args
        .iter()
        .find(|a| a.kind() == "keyword_argument" && keyword_name(module, **a) == Some("url"))
        .and_then(|a| a.child_by_field_name("value"))
        .or_else(|| {
            args.iter()
                .find(|a| !matches!(a.kind(), "keyword_argument" | "comment"))
                .copied()
        })?;
    let literal = string_literal(target, module.text(target))?;
    let parsed = url::Url::parse(&literal).ok()?;
    parsed.host_str().map(str::to_string)
}

fn keyword_name<'s>(module: &PythonModule<'s>, arg: Node<'_>) -> Option<&'s str> {
    arg.child_by_field_name("name").map(|n| module.text(n))
}

fn calls_function(module: &PythonModule<'_>, scope: Node<'_>, name: &str) -> bool {
    descendants(scope).into_iter().any(|n| {
        n.kind() == "call"
            && n.child_by_field_name("function")
                .is_some_and(|f| f.kind() == "identifier" && module.text(f) == name)
    })
}

fn is_main_guard(module: &PythonModule<'_>, if_stmt: Node<'_>) -> bool {
    if_stmt.child_by_field_name("condition").is_some_and(|cond| {
        let text = module.text(cond);
        text.contains("__name__") && text.contains("__main__")
    })
}
