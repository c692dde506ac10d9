//! Diagnostic records parsed from a `tsc` error log.
//!
//! One record per line of the form
//! `src/path/File.tsx(12,5): error TS6133: 'x' is declared but its value is never read.`

use indexmap::IndexMap;
use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use thiserror::Error;

static LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(src/[^(]+)\((\d+),(\d+)\): error (TS\d+): (.+)").expect("valid line regex")
});

static UNUSED_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"'([^']+)' is declared but").expect("valid name regex"));

/// One parsed compiler error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiagnosticRecord {
    /// Path relative to the project root, always starting with `src/`
    pub file: String,
    pub line: usize,
    pub column: usize,
    /// Diagnostic code (e.g., "TS6133", "TS18048")
    pub code: String,
    pub message: String,
}

/// Records grouped by file, in order of each file's first appearance.
pub type DiagnosticGroups = IndexMap<String, Vec<DiagnosticRecord>>;

#[derive(Error, Debug)]
pub enum DiagnosticError {
    #[error("Failed to read diagnostic log {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DiagnosticRecord {
    /// Parse one log line. Anything not shaped like a `tsc` error yields `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let caps = LINE_RE.captures(line)?;
        Some(Self {
            file: caps[1].to_string(),
            line: parse_position(&caps[2]),
            column: parse_position(&caps[3]),
            code: caps[4].to_string(),
            message: caps[5].to_string(),
        })
    }

    /// The quoted name in a "'name' is declared but ..." message.
    pub fn declared_name(&self) -> Option<&str> {
        UNUSED_NAME_RE
            .captures(&self.message)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    /// Check if this is a specific diagnostic code.
    pub fn is_code(&self, code: &str) -> bool {
        self.code == code
    }
}

/// A position that does not fit in `usize` is clamped; the record is kept.
fn parse_position(digits: &str) -> usize {
    digits.parse().unwrap_or(usize::MAX)
}

/// Parse a whole log and group records by file.
pub fn parse_log(text: &str) -> DiagnosticGroups {
    let mut groups = DiagnosticGroups::new();

    for (idx, line) in text.lines().enumerate() {
        match DiagnosticRecord::parse(line) {
            Some(record) => groups.entry(record.file.clone()).or_default().push(record),
            None => log::trace!("log line {} ignored: {line:?}", idx + 1),
        }
    }

    groups
}

/// Read and parse a log file. A missing or unreadable log is an error.
pub fn read_log(path: impl AsRef<Path>) -> Result<DiagnosticGroups, DiagnosticError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| DiagnosticError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let groups = parse_log(&text);
    log::debug!(
        "{}: {} diagnostics across {} files",
        path.display(),
        groups.values().map(Vec::len).sum::<usize>(),
        groups.len()
    );
    Ok(groups)
}
