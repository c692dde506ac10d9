use crate::config::schema::{ValidationError, ValidationIssue};
use serde::Deserialize;

/// Knobs for the log-driven fixer. Every field defaults to the behavior the
/// fixer was written for: `tsc` codes TS6133/TS18048 and Dexie-style `db.*`
/// table calls.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LogFixRules {
    /// Codes whose message reads "'name' is declared but ..."
    pub unused_codes: Vec<String>,
    /// Codes that trigger optional-chaining insertion
    pub undefined_codes: Vec<String>,
    /// Trailing callback parameters that get an underscore prefix
    pub param_names: Vec<String>,
    /// Root identifier of the `root.table.method` call chains
    pub null_check_root: String,
    /// Methods guarded with `?.`; earlier entries are rewritten first
    pub null_check_methods: Vec<String>,
}

impl Default for LogFixRules {
    fn default() -> Self {
        Self {
            unused_codes: vec!["TS6133".to_string()],
            undefined_codes: vec!["TS18048".to_string()],
            param_names: vec!["index".to_string(), "key".to_string()],
            null_check_root: "db".to_string(),
            null_check_methods: vec!["bulkAdd".to_string(), "add".to_string()],
        }
    }
}

impl LogFixRules {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let mut issues = Vec::new();

        if self.param_names.iter().any(|name| name.trim().is_empty()) {
            issues.push(ValidationIssue::MissingField {
                file: None,
                field: "param_names",
            });
        }
        if self.null_check_root.trim().is_empty() {
            issues.push(ValidationIssue::MissingField {
                file: None,
                field: "null_check_root",
            });
        }
        if self
            .null_check_methods
            .iter()
            .any(|method| method.trim().is_empty())
        {
            issues.push(ValidationIssue::MissingField {
                file: None,
                field: "null_check_methods",
            });
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationError { issues })
        }
    }

    pub fn is_unused_code(&self, code: &str) -> bool {
        self.unused_codes.iter().any(|c| c == code)
    }

    pub fn is_undefined_code(&self, code: &str) -> bool {
        self.undefined_codes.iter().any(|c| c == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let rules = LogFixRules::default();
        assert!(rules.validate().is_ok());
        assert!(rules.is_unused_code("TS6133"));
        assert!(!rules.is_unused_code("TS6192"));
        assert!(rules.is_undefined_code("TS18048"));
    }

    #[test]
    fn test_blank_fields_rejected() {
        let rules = LogFixRules {
            param_names: vec!["".to_string()],
            null_check_root: " ".to_string(),
            ..LogFixRules::default()
        };
        let err = rules.validate().unwrap_err();
        assert_eq!(err.issues.len(), 2);
    }
}
