//! Integration tests for patch tables
//!
//! Tests table loading, per-entry application, missing files and fixed points

use std::fs;
use std::path::Path;
use tempfile::TempDir;
use tsfix::config::{
    apply_table, builtin_table, load_from_path, load_from_str, EntryPlan, Metadata, PatchEntry,
    PatchTable, SubstitutionRule,
};

fn write(root: &Path, rel: &str, contents: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, contents).unwrap();
}

fn read(root: &Path, rel: &str) -> String {
    fs::read_to_string(root.join(rel)).unwrap()
}

fn single_entry(file: &str, rules: Vec<SubstitutionRule>) -> PatchTable {
    PatchTable {
        meta: Metadata::default(),
        entries: vec![PatchEntry {
            file: file.to_string(),
            rules,
        }],
    }
}

/// A web client with a few of the files the built-in table targets
fn setup_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();

    write(
        root,
        "src/components/feed/ActivityFeed.tsx",
        r#"export function ActivityFeed() {
  const { data, isLoadingFeed: isLoadingPosts } = useFeed();
  return <Feed items={data} />;
}
"#,
    );
    write(
        root,
        "src/components/security/AuditLogs.tsx",
        "const [logs, setLogs] = useState<AuditLog[]>([]);\n",
    );
    write(
        root,
        "src/core/storage/db.ts",
        r#"const schemaInitialized = false;
for (const [moduleId, module] of modules) {
  register(module);
}
for (const [moduleId, schema] of schemas) {}
const target = {};
"#,
    );
    write(
        root,
        "src/core/storage/encryption.ts",
        "import { useAuthStore } from '@/stores/authStore';\nimport { seal } from './crypto';\n(key as any)[field] = seal(value);\n",
    );

    dir
}

#[test]
fn test_builtin_table_fixes_existing_files() {
    let project = setup_project();
    let root = project.path();
    let table = builtin_table().unwrap();

    let mut lines = Vec::new();
    apply_table(&table, root, false, |plan| lines.push(plan.to_string())).unwrap();

    assert_eq!(
        read(root, "src/components/feed/ActivityFeed.tsx"),
        r#"export function ActivityFeed() {
  const { data, isLoadingFeed: _isLoadingPosts } = useFeed();
  return <Feed items={data} />;
}
"#
    );
    assert_eq!(
        read(root, "src/components/security/AuditLogs.tsx"),
        "const [logs, _setLogs] = useState<AuditLog[]>([]);\n"
    );
    assert_eq!(
        read(root, "src/core/storage/db.ts"),
        r#"const _schemaInitialized = false;
for (const [_moduleId, module] of modules) {
  register(module);
}
for (const [_moduleId, _schema] of schemas) {}
const _target = {};
"#
    );
    assert_eq!(
        read(root, "src/core/storage/encryption.ts"),
        "\nimport { seal } from './crypto';\nkey[field as keyof T] = seal(value);\n"
    );

    let fixed: Vec<&String> = lines.iter().filter(|l| l.starts_with("Fixed: ")).collect();
    let skipped: Vec<&String> = lines.iter().filter(|l| l.starts_with("Skip ")).collect();
    assert_eq!(fixed.len(), 4);
    assert_eq!(skipped.len(), 6);
    assert!(lines.contains(&"Skip src/pages/ContactDetailPage.tsx (not found)".to_string()));
}

#[test]
fn test_builtin_table_second_run_writes_nothing() {
    let project = setup_project();
    let root = project.path();
    let table = builtin_table().unwrap();

    apply_table(&table, root, false, |_| {}).unwrap();
    let plans = apply_table(&table, root, false, |_| {}).unwrap();

    assert!(plans
        .iter()
        .all(|plan| !matches!(plan, EntryPlan::Rewrite { .. })));
}

#[test]
fn test_missing_file_is_skipped_once_and_not_created() {
    let project = TempDir::new().unwrap();
    let table = single_entry(
        "src/pages/PrivacyDemoPage.tsx",
        vec![SubstitutionRule::new("a", "b")],
    );

    let mut lines = Vec::new();
    apply_table(&table, project.path(), false, |plan| lines.push(plan.to_string())).unwrap();

    assert_eq!(lines, vec!["Skip src/pages/PrivacyDemoPage.tsx (not found)"]);
    assert!(!project.path().join("src/pages/PrivacyDemoPage.tsx").exists());
}

#[test]
fn test_non_matching_file_is_left_byte_identical() {
    let project = TempDir::new().unwrap();
    let root = project.path();
    let original = "const [logs, setEntries] = useState([]);\r\n\u{feff}tail";
    write(root, "src/AuditLogs.tsx", original);
    let mtime_before = fs::metadata(root.join("src/AuditLogs.tsx"))
        .unwrap()
        .modified()
        .unwrap();

    let table = single_entry(
        "src/AuditLogs.tsx",
        vec![SubstitutionRule::new(r"const \[logs, setLogs\]", "const [logs, _setLogs]")],
    );
    let plans = apply_table(&table, root, false, |_| {}).unwrap();

    assert_eq!(
        plans,
        vec![EntryPlan::Unchanged {
            file: "src/AuditLogs.tsx".to_string()
        }]
    );
    assert_eq!(read(root, "src/AuditLogs.tsx"), original);
    let mtime_after = fs::metadata(root.join("src/AuditLogs.tsx"))
        .unwrap()
        .modified()
        .unwrap();
    assert_eq!(mtime_before, mtime_after);
}

#[test]
fn test_bounded_pattern_reaches_fixed_point() {
    let project = TempDir::new().unwrap();
    let root = project.path();
    write(root, "src/Feed.tsx", "if (isLoadingPosts) {}\n");

    let table = single_entry(
        "src/Feed.tsx",
        vec![SubstitutionRule::new(r"\bisLoadingPosts\b", "_isLoadingPosts")],
    );

    apply_table(&table, root, false, |_| {}).unwrap();
    let once = read(root, "src/Feed.tsx");
    let plans = apply_table(&table, root, false, |_| {}).unwrap();

    assert_eq!(once, "if (_isLoadingPosts) {}\n");
    assert_eq!(read(root, "src/Feed.tsx"), once);
    assert!(matches!(plans[0], EntryPlan::Unchanged { .. }));
}

#[test]
fn test_pattern_matching_its_own_replacement_keeps_rewriting() {
    let project = TempDir::new().unwrap();
    let root = project.path();
    write(root, "src/Feed.tsx", "isLoadingPosts\n");

    let table = single_entry(
        "src/Feed.tsx",
        vec![SubstitutionRule::new("isLoadingPosts", "_isLoadingPosts")],
    );

    apply_table(&table, root, false, |_| {}).unwrap();
    apply_table(&table, root, false, |_| {}).unwrap();

    assert_eq!(read(root, "src/Feed.tsx"), "__isLoadingPosts\n");
}

#[test]
fn test_later_rule_sees_earlier_output() {
    let project = TempDir::new().unwrap();
    let root = project.path();
    write(root, "src/Feed.tsx", "isLoadingFeed: isLoadingPosts\n");

    let table = single_entry(
        "src/Feed.tsx",
        vec![
            SubstitutionRule::new(r"\bisLoadingPosts\b", "_isLoadingPosts"),
            // Never matches: the first rule already renamed the target
            SubstitutionRule::new("isLoadingFeed: isLoadingPosts", "REPLACED"),
            SubstitutionRule::new("_isLoadingPosts", "_posts"),
        ],
    );
    apply_table(&table, root, false, |_| {}).unwrap();

    assert_eq!(read(root, "src/Feed.tsx"), "isLoadingFeed: _posts\n");
}

#[test]
fn test_table_loaded_from_disk() {
    let project = TempDir::new().unwrap();
    let root = project.path();
    write(
        root,
        "src/components/bulk-operations/TaskManager.tsx",
        "<CheckCircle2 className=\"w-5 h-5 text-green-500\" title=\"Completed\"/>\n",
    );
    let table_path = root.join("fixes.toml");
    fs::write(
        &table_path,
        r#"
[meta]
name = "icons"

[[entries]]
file = "src/components/bulk-operations/TaskManager.tsx"

[[entries.rules]]
pattern = ' title="(\w+)"/>'
replacement = ' aria-label="$1" />'
"#,
    )
    .unwrap();

    let table = load_from_path(&table_path).unwrap();
    apply_table(&table, root, false, |_| {}).unwrap();

    assert_eq!(
        read(root, "src/components/bulk-operations/TaskManager.tsx"),
        "<CheckCircle2 className=\"w-5 h-5 text-green-500\" aria-label=\"Completed\" />\n"
    );
}

#[test]
fn test_version_gated_table() {
    let project = TempDir::new().unwrap();
    let root = project.path();
    write(root, "package.json", r#"{ "name": "buildit", "version": "0.3.1" }"#);
    write(root, "src/a.ts", "const target = 1;\n");

    let toml = r#"
[meta]
name = "future"
version_range = ">=1.0.0"

[[entries]]
file = "src/a.ts"

[[entries.rules]]
pattern = "const target ="
replacement = "const _target ="
"#;
    let table = load_from_str(toml).unwrap();
    let plans = apply_table(&table, root, false, |_| {}).unwrap();

    match &plans[0] {
        EntryPlan::SkippedVersion { reason, .. } => assert!(reason.contains("0.3.1")),
        other => panic!("expected version skip, got {other:?}"),
    }
    assert_eq!(read(root, "src/a.ts"), "const target = 1;\n");
}

#[test]
#[cfg(unix)]
fn test_entry_escaping_project_is_fatal() {
    use std::os::unix::fs::symlink;

    let outer = TempDir::new().unwrap();
    let root = outer.path().join("web");
    fs::create_dir_all(root.join("src")).unwrap();
    fs::write(outer.path().join("secret.ts"), "const target = 1;\n").unwrap();
    symlink(outer.path().join("secret.ts"), root.join("src/link.ts")).unwrap();

    let table = single_entry(
        "src/link.ts",
        vec![SubstitutionRule::new("const target =", "const _target =")],
    );
    let result = apply_table(&table, &root, false, |_| {});

    assert!(result.is_err());
    assert_eq!(
        fs::read_to_string(outer.path().join("secret.ts")).unwrap(),
        "const target = 1;\n"
    );
}

#[test]
fn test_missing_project_root_skips_builtin_entries() {
    let outer = TempDir::new().unwrap();
    let root = outer.path().join("buildit");
    let table = builtin_table().unwrap();

    let mut lines = Vec::new();
    let plans = apply_table(&table, &root, false, |plan| lines.push(plan.to_string())).unwrap();

    assert_eq!(plans.len(), 10);
    assert!(plans
        .iter()
        .all(|plan| matches!(plan, EntryPlan::Missing { .. })));
    assert_eq!(lines[9], "Skip src/core/storage/encryption.ts (not found)");
    assert!(!root.exists());
}
