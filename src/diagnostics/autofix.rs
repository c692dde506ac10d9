//! Text rewrites driven by `tsc` diagnostics.
//!
//! Three strategies, all purely textual:
//!
//! 1. Names reported by an "unused" code are dropped from `import { ... }`
//!    lists; imports left empty are deleted.
//! 2. Trailing callback parameters such as `index`/`key` get an underscore
//!    prefix (only when the file has at least one unused-name diagnostic).
//! 3. On "possibly undefined" codes, `db.table.add` style chains become
//!    `db.table?.add`.
//!
//! None of this understands TypeScript syntax; a rewrite that breaks the file
//! is not detected here.

use crate::cache::get_or_compile;
use crate::config::fixes::LogFixRules;
use crate::diagnostics::diagnostic::DiagnosticRecord;
use crate::edit::{EditError, Rewrite};
use crate::safety::{ProjectGuard, SafetyError};
use std::fs;
use std::path::PathBuf;
use thiserror::Error;

/// Imports whose braces ended up empty, with their line terminator.
const EMPTY_IMPORT: &str = r#"import\s*(?:type\s+)?\{\s*\}\s*from\s*['"].*['"];?[ \t]*(?:\r?\n|$)"#;

#[derive(Error, Debug)]
pub enum AutofixError {
    #[error("Invalid rewrite pattern: {0}")]
    Pattern(#[from] regex::Error),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsafe target: {0}")]
    Safety(#[from] SafetyError),

    #[error("Edit error: {0}")]
    Edit(#[from] EditError),
}

/// Outcome for one file named in the log.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "FixPlan should be reported or applied"]
pub enum FixPlan {
    /// File named in the log does not exist
    Missing { file: String },
    /// No strategy changed the file
    Unchanged { file: String },
    /// At least one strategy changed the file
    Rewrite { file: String, rewrite: Rewrite },
}

impl FixPlan {
    pub fn file(&self) -> &str {
        match self {
            FixPlan::Missing { file }
            | FixPlan::Unchanged { file }
            | FixPlan::Rewrite { file, .. } => file,
        }
    }
}

/// Names from "unused" diagnostics, in log order. Duplicates are kept.
#[must_use]
pub fn unused_identifiers(records: &[DiagnosticRecord], rules: &LogFixRules) -> Vec<String> {
    records
        .iter()
        .filter(|record| rules.is_unused_code(&record.code))
        .filter_map(DiagnosticRecord::declared_name)
        .map(str::to_string)
        .collect()
}

/// Replace every match of `pattern` in `content`.
fn substitute(content: String, pattern: &str, replacement: &str) -> Result<String, AutofixError> {
    let re = get_or_compile(pattern)?;
    Ok(re.replace_all(&content, replacement).into_owned())
}

/// `$` is the capture marker in replacement strings.
fn escape_replacement(text: &str) -> String {
    text.replace('$', "$$")
}

/// Remove each name from named-import braces, then delete emptied imports.
pub fn strip_unused_imports(content: &str, unused: &[String]) -> Result<String, AutofixError> {
    let mut content = content.to_string();

    for name in unused {
        let name = regex::escape(name);
        // `a, NAME, b` -> `a, b`
        content = substitute(content, &format!(r",\s*{name}\s*,"), ",")?;
        // `{ NAME, b` -> `{ b`
        content = substitute(content, &format!(r"\{{\s*{name}\s*,"), "{")?;
        // `a, NAME }` -> `a }`
        content = substitute(content, &format!(r",\s*{name}\s*\}}"), "}")?;
        // `{ NAME } from` -> `{} from`
        content = substitute(content, &format!(r"\{{\s*{name}\s*\}}(\s*from\b)"), "{}${1}")?;

        content = substitute(content, EMPTY_IMPORT, "")?;
    }

    Ok(content)
}

/// Prefix a trailing parameter such as `(item, index)` with an underscore.
pub fn prefix_unused_params(content: &str, names: &[String]) -> Result<String, AutofixError> {
    let mut content = content.to_string();

    for name in names {
        let name = regex::escape(name);
        content = substitute(
            content,
            &format!(r"(\([^)]*,\s*)({name})(\s*\))"),
            "${1}_${2}${3}",
        )?;
    }

    Ok(content)
}

/// Turn `root.table.method` into `root.table?.method` for each method.
pub fn add_null_checks(
    content: &str,
    root: &str,
    methods: &[String],
) -> Result<String, AutofixError> {
    let mut content = content.to_string();
    let root_pattern = regex::escape(root);
    let root_text = escape_replacement(root);

    for method in methods {
        let pattern = format!(r"{root_pattern}\.([a-zA-Z]+)\.{}", regex::escape(method));
        let replacement = format!("{root_text}.${{1}}?.{}", escape_replacement(method));
        content = substitute(content, &pattern, &replacement)?;
    }

    Ok(content)
}

/// Run every applicable strategy over one file's text.
pub fn fix_content(
    content: &str,
    records: &[DiagnosticRecord],
    rules: &LogFixRules,
) -> Result<String, AutofixError> {
    let mut content = content.to_string();

    let unused = unused_identifiers(records, rules);
    if !unused.is_empty() {
        log::debug!("unused identifiers: {}", unused.join(", "));
        content = strip_unused_imports(&content, &unused)?;
        content = prefix_unused_params(&content, &rules.param_names)?;
    }

    if records.iter().any(|record| rules.is_undefined_code(&record.code)) {
        content = add_null_checks(&content, &rules.null_check_root, &rules.null_check_methods)?;
    }

    Ok(content)
}

/// Compute the rewrite for one file without writing anything.
pub fn plan_file_fix(
    file: &str,
    records: &[DiagnosticRecord],
    guard: &ProjectGuard,
    rules: &LogFixRules,
) -> Result<FixPlan, AutofixError> {
    let path = guard.project_root().join(file);
    if !path.exists() {
        log::debug!("{} does not exist; skipping", path.display());
        return Ok(FixPlan::Missing {
            file: file.to_string(),
        });
    }

    let canonical = guard.validate_path(&path)?;
    let content = fs::read_to_string(&canonical).map_err(|source| AutofixError::Io {
        path: canonical.clone(),
        source,
    })?;

    let updated = fix_content(&content, records, rules)?;
    if updated == content {
        return Ok(FixPlan::Unchanged {
            file: file.to_string(),
        });
    }

    Ok(FixPlan::Rewrite {
        file: file.to_string(),
        rewrite: Rewrite::new(canonical, content, updated),
    })
}
