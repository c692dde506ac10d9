//! tsfix: regex-driven patching that silences TypeScript compiler warnings
//!
//! Two independent fixers share one rewrite primitive:
//!
//! - **Patch tables** ([`config`]): a TOML table maps project-relative file
//!   paths to ordered `(pattern, replacement)` rules. Each existing file gets
//!   its rules applied in order; missing files are skipped.
//! - **Log-driven fixes** ([`diagnostics`]): a `tsc` error log is parsed into
//!   per-file diagnostic groups, and unused imports, unused callback
//!   parameters and possibly-undefined table calls are rewritten textually.
//!
//! # Architecture
//!
//! Every fixer computes the complete new text of a file in memory and
//! compiles down to a single primitive: [`Rewrite`], an atomic whole-file
//! overwrite that is skipped when nothing changed. No fixer parses
//! TypeScript; all edits are pattern substitutions.
//!
//! # Example
//!
//! ```no_run
//! use tsfix::config::{apply_table, builtin_table};
//! use std::path::Path;
//!
//! let table = builtin_table().unwrap();
//! apply_table(&table, Path::new("/workspace/buildit"), false, |plan| {
//!     println!("{}", plan);
//! })
//! .unwrap();
//! ```

pub mod cache;
pub mod config;
pub mod diagnostics;
pub mod edit;
pub mod safety;

// Re-exports
pub use config::{
    apply_table, builtin_table, load_from_path, load_from_str, ApplicationError, ConfigError,
    EntryPlan, LogFixRules, PatchTable,
};
pub use diagnostics::{apply_log, read_log, AutofixError, DiagnosticRecord, FixPlan};
pub use edit::{EditError, Rewrite, RewriteResult};
pub use safety::{ProjectGuard, SafetyError};
