use crate::config::fixes::LogFixRules;
use crate::config::schema::{PatchTable, ValidationError};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// The one-off fixes for the web client, shipped with the binary.
const BUILTIN_TABLE: &str = include_str!("../../patches/remaining-ts-errors.toml");

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Toml {
        path: Option<PathBuf>,
        source: toml_edit::de::Error,
    },
    Validation {
        path: Option<PathBuf>,
        source: ValidationError,
    },
}

impl ConfigError {
    fn with_path(self, path: &Path) -> Self {
        let path = path.to_path_buf();
        match self {
            ConfigError::Io { .. } => self,
            ConfigError::Toml { path: None, source } => ConfigError::Toml {
                path: Some(path),
                source,
            },
            ConfigError::Validation { path: None, source } => ConfigError::Validation {
                path: Some(path),
                source,
            },
            other => other,
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read {}: {}", path.display(), source)
            }
            ConfigError::Toml { path, source } => match path {
                Some(path) => write!(f, "failed to parse TOML ({}): {}", path.display(), source),
                None => write!(f, "failed to parse TOML: {}", source),
            },
            ConfigError::Validation { path, source } => match path {
                Some(path) => write!(f, "invalid configuration ({}): {}", path.display(), source),
                None => write!(f, "invalid configuration: {}", source),
            },
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Toml { source, .. } => Some(source),
            ConfigError::Validation { source, .. } => Some(source),
        }
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_from_str(input: &str) -> Result<PatchTable, ConfigError> {
    let table: PatchTable = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: None, source })?;
    table
        .validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    Ok(table)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<PatchTable, ConfigError> {
    let path = path.as_ref();
    let contents = read(path)?;
    load_from_str(&contents).map_err(|error| error.with_path(path))
}

/// The patch table compiled into the binary.
pub fn builtin_table() -> Result<PatchTable, ConfigError> {
    load_from_str(BUILTIN_TABLE)
}

pub fn load_rules_from_str(input: &str) -> Result<LogFixRules, ConfigError> {
    let rules: LogFixRules = toml_edit::de::from_str(input)
        .map_err(|source| ConfigError::Toml { path: None, source })?;
    rules
        .validate()
        .map_err(|source| ConfigError::Validation { path: None, source })?;
    Ok(rules)
}

pub fn load_rules_from_path(path: impl AsRef<Path>) -> Result<LogFixRules, ConfigError> {
    let path = path.as_ref();
    let contents = read(path)?;
    load_rules_from_str(&contents).map_err(|error| error.with_path(path))
}
