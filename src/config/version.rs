//! Version gating for patch tables using semver constraints
//!
//! A table may declare `version_range = ">=1.4.0, <2.0.0"`; it then only
//! applies when the target project's `package.json` version matches.

use semver::{Version, VersionReq};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Errors during version gating
#[derive(Debug, Clone)]
pub enum VersionError {
    /// Invalid version string (e.g., "not-a-version")
    InvalidVersion { value: String, source: String },
    /// Invalid version requirement (e.g., ">=bad")
    InvalidRequirement { value: String, source: String },
    /// package.json missing, unreadable, or without a string `version`
    Manifest { path: PathBuf, reason: String },
}

impl fmt::Display for VersionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionError::InvalidVersion { value, source } => {
                write!(f, "invalid version '{}': {}", value, source)
            }
            VersionError::InvalidRequirement { value, source } => {
                write!(f, "invalid version requirement '{}': {}", value, source)
            }
            VersionError::Manifest { path, reason } => {
                write!(f, "cannot read version from {}: {}", path.display(), reason)
            }
        }
    }
}

impl std::error::Error for VersionError {}

/// Check if a version matches a requirement string
///
/// # Examples
///
/// ```
/// use tsfix::config::version::matches_requirement;
///
/// assert!(matches_requirement("1.4.0", Some(">=1.4.0")).unwrap());
/// assert!(!matches_requirement("1.3.9", Some(">=1.4.0")).unwrap());
///
/// // None requirement means "apply to all versions"
/// assert!(matches_requirement("0.0.1", None).unwrap());
/// ```
pub fn matches_requirement(
    version: &str,
    requirement: Option<&str>,
) -> Result<bool, VersionError> {
    let Some(req_str) = requirement else {
        return Ok(true);
    };

    let req_str = req_str.trim();
    if req_str.is_empty() {
        return Ok(true);
    }

    let version = Version::parse(version.trim()).map_err(|e| VersionError::InvalidVersion {
        value: version.to_string(),
        source: e.to_string(),
    })?;

    let req = VersionReq::parse(req_str).map_err(|e| VersionError::InvalidRequirement {
        value: req_str.to_string(),
        source: e.to_string(),
    })?;

    Ok(req.matches(&version))
}

/// Read the `version` field from `<project_root>/package.json`.
pub fn read_project_version(project_root: &Path) -> Result<String, VersionError> {
    let path = project_root.join("package.json");
    let manifest_err = |reason: String| VersionError::Manifest {
        path: path.clone(),
        reason,
    };

    let contents = fs::read_to_string(&path).map_err(|e| manifest_err(e.to_string()))?;
    let manifest: serde_json::Value =
        serde_json::from_str(&contents).map_err(|e| manifest_err(e.to_string()))?;

    manifest
        .get("version")
        .and_then(|v| v.as_str())
        .map(str::to_string)
        .ok_or_else(|| manifest_err("no string \"version\" field".to_string()))
}
