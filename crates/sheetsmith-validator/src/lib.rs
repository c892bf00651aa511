//! Sheetsmith output validator
//!
//! Gates candidate application source before it is accepted:
//! - **Syntax**: parses under the tree-sitter Python grammar
//! - **Forbidden constructs**: configurable call/import/network rules
//! - **Entry point**: module-level `main` (or configured name), invoked
//! - **Dependency manifest**: declared set equals the import scan
//!
//! Validation never errors. Advisories (bare `except`, wildcard imports,
//! missing error handling, debug prints) are reported without failing.
//!
//! ```
//! use sheetsmith_model::{DependencyManifest, GeneratedCode};
//! use sheetsmith_validator::OutputValidator;
//!
//! let code = GeneratedCode::new(
//!     "def main():\n    pass\n\nmain()\n",
//!     DependencyManifest::new(),
//! );
//! assert!(OutputValidator::default().validate(&code).is_pass());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod check;
pub mod config;
pub mod rules;
pub mod stdlib;
pub mod validator;
pub mod verdict;

mod imports;
mod source;

pub use check::{Advisory, AdvisoryKind, CheckId, Violation};
pub use config::{EntryPointSpec, RuleError, ValidatorConfig};
pub use rules::{default_rules, ForbiddenRule, RuleKind};
pub use stdlib::is_stdlib;
pub use validator::OutputValidator;
pub use verdict::Verdict;
