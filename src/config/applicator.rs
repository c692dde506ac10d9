//! Patch table applicator - runs substitution rules over the project's files
//!
//! This module provides table application that:
//! - Gates the whole table on the project's `package.json` version
//! - Skips entries whose file does not exist
//! - Runs each entry's rules in order over the file's full text
//! - Rewrites only files whose text actually changed

use crate::config::schema::{apply_rules, PatchEntry, PatchTable};
use crate::config::version::{matches_requirement, read_project_version, VersionError};
use crate::edit::{EditError, Rewrite, RewriteResult};
use crate::safety::{ProjectGuard, SafetyError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// What happened (or would happen, in a dry run) to one table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "EntryPlan should be reported or applied"]
pub enum EntryPlan {
    /// File does not exist; not an error
    Missing { file: String },
    /// Table version_range excludes this project
    SkippedVersion { file: String, reason: String },
    /// No rule changed the file
    Unchanged { file: String },
    /// Rules changed the file
    Rewrite { file: String, rewrite: Rewrite },
}

impl EntryPlan {
    /// The entry's path as written in the table.
    pub fn file(&self) -> &str {
        match self {
            EntryPlan::Missing { file }
            | EntryPlan::SkippedVersion { file, .. }
            | EntryPlan::Unchanged { file }
            | EntryPlan::Rewrite { file, .. } => file,
        }
    }
}

impl fmt::Display for EntryPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntryPlan::Missing { file } => write!(f, "Skip {} (not found)", file),
            EntryPlan::SkippedVersion { file, reason } => {
                write!(f, "Skip {} ({})", file, reason)
            }
            EntryPlan::Unchanged { file } => write!(f, "Unchanged: {}", file),
            EntryPlan::Rewrite { file, .. } => write!(f, "Fixed: {}", file),
        }
    }
}

/// Errors during table application. Every variant aborts the run.
#[derive(Debug)]
pub enum ApplicationError {
    /// Version gating error
    Version(VersionError),
    /// File I/O error
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Target escaped the project root
    Safety(SafetyError),
    /// A rule pattern failed to compile
    Pattern { file: String, source: regex::Error },
    /// Rewrite failed to write
    Edit(EditError),
}

impl fmt::Display for ApplicationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApplicationError::Version(e) => write!(f, "version error: {}", e),
            ApplicationError::Io { path, source } => {
                write!(f, "I/O error on {}: {}", path.display(), source)
            }
            ApplicationError::Safety(e) => write!(f, "unsafe target: {}", e),
            ApplicationError::Pattern { file, source } => {
                write!(f, "invalid pattern for {}: {}", file, source)
            }
            ApplicationError::Edit(e) => write!(f, "edit error: {}", e),
        }
    }
}

impl std::error::Error for ApplicationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ApplicationError::Version(e) => Some(e),
            ApplicationError::Io { source, .. } => Some(source),
            ApplicationError::Safety(e) => Some(e),
            ApplicationError::Pattern { source, .. } => Some(source),
            ApplicationError::Edit(e) => Some(e),
        }
    }
}

impl From<VersionError> for ApplicationError {
    fn from(e: VersionError) -> Self {
        ApplicationError::Version(e)
    }
}

impl From<SafetyError> for ApplicationError {
    fn from(e: SafetyError) -> Self {
        ApplicationError::Safety(e)
    }
}

impl From<EditError> for ApplicationError {
    fn from(e: EditError) -> Self {
        ApplicationError::Edit(e)
    }
}

/// Compute the outcome of one entry without writing anything.
pub fn plan_entry(
    entry: &PatchEntry,
    guard: &ProjectGuard,
) -> Result<EntryPlan, ApplicationError> {
    let path = guard.project_root().join(&entry.file);
    if !path.exists() {
        log::debug!("{} does not exist", path.display());
        return Ok(EntryPlan::Missing {
            file: entry.file.clone(),
        });
    }

    let canonical = guard.validate_path(&path)?;
    let content = fs::read_to_string(&canonical).map_err(|source| ApplicationError::Io {
        path: canonical.clone(),
        source,
    })?;

    let rules = entry.compile().map_err(|source| ApplicationError::Pattern {
        file: entry.file.clone(),
        source,
    })?;
    let updated = apply_rules(&content, &rules);

    if updated == content {
        return Ok(EntryPlan::Unchanged {
            file: entry.file.clone(),
        });
    }

    Ok(EntryPlan::Rewrite {
        file: entry.file.clone(),
        rewrite: Rewrite::new(canonical, content, updated),
    })
}

/// Apply a patch table to a project, one entry at a time.
///
/// `report` is called after each entry is handled (and, unless `dry_run`,
/// written), so callers can stream progress. The first error aborts the run;
/// files rewritten before it stay rewritten.
pub fn apply_table(
    table: &PatchTable,
    project_root: &Path,
    dry_run: bool,
    mut report: impl FnMut(&EntryPlan),
) -> Result<Vec<EntryPlan>, ApplicationError> {
    // No root means no file can exist under it
    if !project_root.is_dir() {
        log::warn!(
            "project root {} does not exist; skipping every entry",
            project_root.display()
        );
        let plans: Vec<EntryPlan> = table
            .entries
            .iter()
            .map(|entry| EntryPlan::Missing {
                file: entry.file.clone(),
            })
            .collect();
        for plan in &plans {
            report(plan);
        }
        return Ok(plans);
    }

    let guard = ProjectGuard::new(project_root)?;

    if let Some(skip_reason) = version_skip_reason(table, guard.project_root())? {
        let plans: Vec<EntryPlan> = table
            .entries
            .iter()
            .map(|entry| EntryPlan::SkippedVersion {
                file: entry.file.clone(),
                reason: skip_reason.clone(),
            })
            .collect();
        for plan in &plans {
            report(plan);
        }
        return Ok(plans);
    }

    let mut plans = Vec::with_capacity(table.entries.len());
    for entry in &table.entries {
        let plan = plan_entry(entry, &guard)?;
        if let EntryPlan::Rewrite { file, rewrite } = &plan {
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

/// `Some(reason)` when the table's version_range excludes the project.
fn version_skip_reason(
    table: &PatchTable,
    project_root: &Path,
) -> Result<Option<String>, ApplicationError> {
    let Some(range) = table.meta.version_range.as_deref() else {
        return Ok(None);
    };

    let version = read_project_version(project_root).unwrap_or_else(|e| {
        log::warn!("{e}; assuming project version 0.0.0");
        "0.0.0".to_string()
    });

    if matches_requirement(&version, Some(range))? {
        Ok(None)
    } else {
        Ok(Some(format!(
            "project version {version} does not satisfy version_range {}",
            range.trim()
        )))
    }
}
