use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The fundamental edit primitive: a whole-file rewrite.
///
/// Both the table-driven and the log-driven fixers compute the complete new
/// text of a file in memory and compile down to this single primitive.
/// Intelligence lives in producing `updated`, not in application.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "Rewrite does nothing until apply() is called"]
pub struct Rewrite {
    /// Absolute path of the file to overwrite
    pub file: PathBuf,
    /// Text read from disk before any substitution
    pub original: String,
    /// Text after every substitution has run
    pub updated: String,
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("File I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Path has no parent directory: {0}")]
    NoParent(PathBuf),
}

/// Result of applying a rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "RewriteResult should be checked for written/unchanged"]
pub enum RewriteResult {
    /// New content was written to disk
    Written { file: PathBuf, bytes_written: usize },
    /// Original and updated text were identical; nothing was written
    Unchanged { file: PathBuf },
}

impl Rewrite {
    pub fn new(
        file: impl Into<PathBuf>,
        original: impl Into<String>,
        updated: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            original: original.into(),
            updated: updated.into(),
        }
    }

    /// Whether applying this rewrite would modify the file.
    pub fn is_change(&self) -> bool {
        self.original != self.updated
    }

    /// Write the updated text over the file atomically.
    ///
    /// Uses tempfile + fsync + rename for crash safety, then bumps the mtime so
    /// incremental `tsc` builds pick up the change.
    pub fn apply(&self) -> Result<RewriteResult, EditError> {
        if !self.is_change() {
            return Ok(RewriteResult::Unchanged {
                file: self.file.clone(),
            });
        }

        atomic_write(&self.file, self.updated.as_bytes())?;

        let now = filetime::FileTime::now();
        filetime::set_file_mtime(&self.file, now).map_err(|source| EditError::Io {
            path: self.file.clone(),
            source,
        })?;

        log::debug!(
            "rewrote {} ({} -> {} bytes)",
            self.file.display(),
            self.original.len(),
            self.updated.len()
        );

        Ok(RewriteResult::Written {
            file: self.file.clone(),
            bytes_written: self.updated.len(),
        })
    }
}

/// Atomic file write: tempfile + fsync + rename.
///
/// Either the full write succeeds or the file keeps its old content.
fn atomic_write(path: &Path, content: &[u8]) -> Result<(), EditError> {
    let io_err = |source: std::io::Error| EditError::Io {
        path: path.to_path_buf(),
        source,
    };

    // Same directory keeps the rename on one filesystem
    let parent = path
        .parent()
        .ok_or_else(|| EditError::NoParent(path.to_path_buf()))?;

    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(io_err)?;
    temp.write_all(content).map_err(io_err)?;
    temp.as_file().sync_all().map_err(io_err)?;

    // Keep the target's permissions; NamedTempFile is created 0600
    if let Ok(metadata) = fs::metadata(path) {
        fs::set_permissions(temp.path(), metadata.permissions()).map_err(io_err)?;
    }

    temp.persist(path).map_err(|e| io_err(e.error))?;

    Ok(())
}
