use regex::{NoExpand, Regex};
use serde::Deserialize;
use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt;

/// A table of per-file substitution rules, usually loaded from TOML.
#[derive(Debug, Deserialize, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct PatchTable {
    #[serde(default)]
    pub meta: Metadata,
    #[serde(default)]
    pub entries: Vec<PatchEntry>,
}

impl PatchTable {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.entries.is_empty() {
            issues.push(ValidationIssue::EmptyTable);
        }

        let mut seen = HashSet::new();
        for entry in &self.entries {
            let file = entry.file.trim();
            if file.is_empty() {
                issues.push(ValidationIssue::MissingField {
                    file: None,
                    field: "file",
                });
            } else if !seen.insert(file) {
                issues.push(ValidationIssue::DuplicateFile {
                    file: file.to_string(),
                });
            }

            if entry.rules.is_empty() {
                issues.push(ValidationIssue::NoRules {
                    file: entry.file.clone(),
                });
            }

            for (index, rule) in entry.rules.iter().enumerate() {
                if rule.pattern.is_empty() {
                    issues.push(ValidationIssue::MissingField {
                        file: Some(entry.file.clone()),
                        field: "rules.pattern",
                    });
                    continue;
                }
                if let Err(err) = Regex::new(&rule.pattern) {
                    issues.push(ValidationIssue::InvalidPattern {
                        file: entry.file.clone(),
                        index,
                        message: err.to_string(),
                    });
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(deny_unknown_fields)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Semver requirement on the target project's `package.json` version
    #[serde(default)]
    pub version_range: Option<String>,
}

/// A file path (relative to the project root) and its ordered rules.
#[derive(Debug, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct PatchEntry {
    pub file: String,
    #[serde(default)]
    pub rules: Vec<SubstitutionRule>,
}

impl PatchEntry {
    /// Compile every rule, preserving order.
    pub fn compile(&self) -> Result<Vec<CompiledRule>, regex::Error> {
        self.rules.iter().map(SubstitutionRule::compile).collect()
    }
}

/// A search pattern and the text that replaces every match.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SubstitutionRule {
    pub pattern: String,
    /// Supports `$1` / `${name}` capture references unless `literal` is set.
    /// Required even when empty, so deletions are always spelled out.
    pub replacement: String,
    #[serde(default)]
    pub literal: bool,
}

impl SubstitutionRule {
    pub fn new(pattern: impl Into<String>, replacement: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            replacement: replacement.into(),
            literal: false,
        }
    }

    pub fn compile(&self) -> Result<CompiledRule, regex::Error> {
        Ok(CompiledRule {
            regex: Regex::new(&self.pattern)?,
            replacement: self.replacement.clone(),
            literal: self.literal,
        })
    }
}

#[derive(Debug, Clone)]
pub struct CompiledRule {
    regex: Regex,
    replacement: String,
    literal: bool,
}

impl CompiledRule {
    /// Replace every match in `text`.
    pub fn apply<'t>(&self, text: &'t str) -> Cow<'t, str> {
        if self.literal {
            self.regex.replace_all(text, NoExpand(&self.replacement))
        } else {
            self.regex.replace_all(text, self.replacement.as_str())
        }
    }

    pub fn pattern(&self) -> &str {
        self.regex.as_str()
    }
}

/// Run `rules` over `content` in order; each rule sees the previous output.
pub fn apply_rules(content: &str, rules: &[CompiledRule]) -> String {
    let mut current = content.to_string();
    for rule in rules {
        let replaced = match rule.apply(&current) {
            Cow::Owned(updated) => Some(updated),
            Cow::Borrowed(_) => None,
        };
        if let Some(updated) = replaced {
            log::trace!("rule /{}/ matched", rule.pattern());
            current = updated;
        }
    }
    current
}

#[derive(Debug, Clone)]
pub struct ValidationError {
    pub issues: Vec<ValidationIssue>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, issue) in self.issues.iter().enumerate() {
            if idx > 0 {
                writeln!(f)?;
            }
            write!(f, "{issue}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationIssue {
    EmptyTable,
    MissingField {
        file: Option<String>,
        field: &'static str,
    },
    DuplicateFile {
        file: String,
    },
    NoRules {
        file: String,
    },
    InvalidPattern {
        file: String,
        index: usize,
        message: String,
    },
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationIssue::EmptyTable => write!(f, "patch table contains no entries"),
            ValidationIssue::MissingField { file, field } => match file {
                Some(file) => write!(f, "entry '{file}' missing required field '{field}'"),
                None => write!(f, "entry missing required field '{field}'"),
            },
            ValidationIssue::DuplicateFile { file } => {
                write!(f, "file '{file}' has more than one entry")
            }
            ValidationIssue::NoRules { file } => write!(f, "entry '{file}' has no rules"),
            ValidationIssue::InvalidPattern {
                file,
                index,
                message,
            } => write!(f, "entry '{file}' rule #{index} has an invalid pattern: {message}"),
        }
    }
}
