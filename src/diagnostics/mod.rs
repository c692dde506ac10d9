//! Log-driven fixes: parse a `tsc` error log and rewrite the files it names.
//!
//! The log is produced outside this crate, typically with
//! `npx tsc --noEmit --pretty false > /tmp/ts-errors.log`. Each file that
//! appears in it is read once, every applicable strategy from [`autofix`]
//! runs over its text, and the file is rewritten only when the text changed.
//!
//! # Example
//!
//! ```no_run
//! use tsfix::config::LogFixRules;
//! use tsfix::diagnostics::{apply_log, read_log};
//! use std::path::Path;
//!
//! let groups = read_log("/tmp/ts-errors.log").unwrap();
//! let rules = LogFixRules::default();
//! apply_log(&groups, Path::new("/workspace/buildit"), &rules, false, |plan| {
//!     println!("{}", plan.file());
//! })
//! .unwrap();
//! ```

pub mod autofix;
pub mod diagnostic;

pub use autofix::{
    add_null_checks, fix_content, plan_file_fix, prefix_unused_params, strip_unused_imports,
    unused_identifiers, AutofixError, FixPlan,
};
pub use diagnostic::{parse_log, read_log, DiagnosticError, DiagnosticGroups, DiagnosticRecord};

use crate::config::fixes::LogFixRules;
use crate::edit::RewriteResult;
use crate::safety::ProjectGuard;
use std::path::Path;

/// Fix every file in `groups`, in log order.
///
/// `report` is called after each file is handled (and, unless `dry_run`,
/// written). Missing files are reported as [`FixPlan::Missing`] and never
/// created; a missing project root makes every file missing. The first
/// error aborts the run.
pub fn apply_log(
    groups: &DiagnosticGroups,
    project_root: &Path,
    rules: &LogFixRules,
    dry_run: bool,
    mut report: impl FnMut(&FixPlan),
) -> Result<Vec<FixPlan>, AutofixError> {
    let mut plans = Vec::with_capacity(groups.len());

    // No root means no file can exist under it
    if !project_root.is_dir() {
        log::warn!(
            "project root {} does not exist; skipping every file",
            project_root.display()
        );
        for file in groups.keys() {
            let plan = FixPlan::Missing { file: file.clone() };
            report(&plan);
            plans.push(plan);
        }
        return Ok(plans);
    }

    let guard = ProjectGuard::new(project_root)?;

    for (file, records) in groups {
        let plan = plan_file_fix(file, records, &guard, rules)?;
        if let FixPlan::Rewrite { rewrite, .. } = &plan {
            if !dry_run {
                match rewrite.apply()? {
                    RewriteResult::Written { bytes_written, .. } => {
                        log::debug!("{file}: wrote {bytes_written} bytes")
                    }
                    RewriteResult::Unchanged { .. } => log::debug!("{file}: nothing to write"),
                }
            }
        }
        report(&plan);
        plans.push(plan);
    }

    Ok(plans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_apply_log_rewrites_only_changed_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(
            dir.path().join("src/a.ts"),
            "import { used, gone } from './m';\nused();\n",
        )
        .unwrap();
        fs::write(dir.path().join("src/b.ts"), "export const b = 1;\n").unwrap();

        let groups = parse_log(
            "src/a.ts(1,16): error TS6133: 'gone' is declared but its value is never read.\n\
             src/b.ts(1,1): error TS6133: 'zzz' is declared but its value is never read.\n\
             src/c.ts(1,1): error TS6133: 'c' is declared but its value is never read.\n",
        );

        let mut reported = Vec::new();
        let plans = apply_log(&groups, dir.path(), &LogFixRules::default(), false, |plan| {
            reported.push(plan.file().to_string())
        })
        .unwrap();

        assert_eq!(reported, vec!["src/a.ts", "src/b.ts", "src/c.ts"]);
        assert!(matches!(plans[0], FixPlan::Rewrite { .. }));
        assert!(matches!(plans[1], FixPlan::Unchanged { .. }));
        assert!(matches!(plans[2], FixPlan::Missing { .. }));
        assert_eq!(
            fs::read_to_string(dir.path().join("src/a.ts")).unwrap(),
            "import { used} from './m';\nused();\n"
        );
        assert!(!dir.path().join("src/c.ts").exists());
    }

    #[test]
    fn test_apply_log_missing_root_skips_every_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("buildit");
        let groups = parse_log(
            "src/a.ts(1,1): error TS6133: 'a' is declared but its value is never read.\n\
             src/b.ts(2,1): error TS18048: 'db.items' is possibly 'undefined'.\n",
        );

        let plans = apply_log(&groups, &root, &LogFixRules::default(), false, |_| {}).unwrap();

        assert_eq!(
            plans,
            vec![
                FixPlan::Missing {
                    file: "src/a.ts".to_string()
                },
                FixPlan::Missing {
                    file: "src/b.ts".to_string()
                },
            ]
        );
        assert!(!root.exists());
    }
}
