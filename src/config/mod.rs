pub mod applicator;
pub mod fixes;
pub mod loader;
pub mod schema;
pub mod version;

pub use applicator::{apply_table, plan_entry, ApplicationError, EntryPlan};
pub use fixes::LogFixRules;
pub use loader::{
    builtin_table, load_from_path, load_from_str, load_rules_from_path, load_rules_from_str,
    ConfigError,
};
pub use schema::{
    apply_rules, CompiledRule, Metadata, PatchEntry, PatchTable, SubstitutionRule,
    ValidationError, ValidationIssue,
};
pub use version::{matches_requirement, read_project_version, VersionError};
