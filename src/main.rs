use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use colored::Colorize;
use log::LevelFilter;
use similar::{ChangeTag, TextDiff};
use std::env;
use std::path::{Path, PathBuf};
use tsfix::config::{
    apply_table, builtin_table, load_from_path, load_rules_from_path, EntryPlan, LogFixRules,
    PatchTable,
};
use tsfix::diagnostics::{apply_log, read_log, unused_identifiers, FixPlan};
use walkdir::WalkDir;

/// Web client checkout the fixes were written for.
const DEFAULT_ROOT: &str = "/workspace/buildit";
/// Where the build writes `tsc --noEmit` output.
const DEFAULT_LOG: &str = "/tmp/ts-errors.log";

#[derive(Parser)]
#[command(name = "tsfix")]
#[command(about = "Regex-driven fixes for TypeScript compiler warnings", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply a patch table of per-file substitution rules
    Table {
        /// Project root (defaults to $TSFIX_ROOT, then /workspace/buildit)
        #[arg(short, long)]
        root: Option<PathBuf>,

        /// Patch table file, or a directory of *.toml tables (built-in table if omitted)
        #[arg(short, long)]
        table: Option<PathBuf>,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Fix the files named in a tsc error log
    Log {
        /// Project root (defaults to $TSFIX_ROOT, then /workspace/buildit)
        #[arg(short, long)]
        root: Option<PathBuf>,

        /// tsc error log (defaults to $TSFIX_LOG, then /tmp/ts-errors.log)
        #[arg(short, long)]
        log: Option<PathBuf>,

        /// TOML file overriding the diagnostic codes and names the fixes target
        #[arg(long)]
        rules: Option<PathBuf>,

        /// Dry run - show what would be changed without modifying files
        #[arg(short = 'n', long)]
        dry_run: bool,

        /// Show unified diff of changes
        #[arg(short, long)]
        diff: bool,
    },

    /// Show the diagnostics parsed from a tsc error log, grouped by file
    Diagnostics {
        /// tsc error log (defaults to $TSFIX_LOG, then /tmp/ts-errors.log)
        #[arg(short, long)]
        log: Option<PathBuf>,

        /// TOML file overriding the diagnostic codes and names the fixes target
        #[arg(long)]
        rules: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Table {
            root,
            table,
            dry_run,
            diff,
        } => cmd_table(root, table, dry_run, diff),

        Commands::Log {
            root,
            log,
            rules,
            dry_run,
            diff,
        } => cmd_log(root, log, rules, dry_run, diff),

        Commands::Diagnostics { log, rules } => cmd_diagnostics(log, rules),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        2 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };

    // RUST_LOG, when set, wins over -v
    env_logger::Builder::new()
        .filter_level(level)
        .format_timestamp(None)
        .parse_default_env()
        .init();
}

/// Resolve the project root.
///
/// Priority order:
/// 1. Explicit --root flag (must exist)
/// 2. TSFIX_ROOT environment variable
/// 3. The built-in default
///
/// A missing default is not an error: every target is then reported as not
/// found.
fn resolve_root(cli_root: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(path) = cli_root {
        return path
            .canonicalize()
            .with_context(|| format!("project root {} is not accessible", path.display()));
    }

    if let Ok(env_path) = env::var("TSFIX_ROOT") {
        let path = PathBuf::from(&env_path);
        if path.exists() {
            return Ok(path.canonicalize()?);
        }
        log::warn!("TSFIX_ROOT is set but path doesn't exist: {env_path}");
    }

    let default = PathBuf::from(DEFAULT_ROOT);
    if !default.exists() {
        log::warn!(
            "{DEFAULT_ROOT} does not exist; pass --root or set TSFIX_ROOT to target another project"
        );
    }
    Ok(default)
}

/// Resolve the diagnostic log path: --log, then TSFIX_LOG, then the default.
fn resolve_log(cli_log: Option<PathBuf>) -> PathBuf {
    cli_log
        .or_else(|| env::var_os("TSFIX_LOG").map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG))
}

/// Load the patch tables to apply, labelled for messages.
///
/// A directory contributes its top-level `*.toml` files in sorted order.
fn load_tables(table: Option<PathBuf>) -> Result<Vec<(String, PatchTable)>> {
    let Some(path) = table else {
        return Ok(vec![("built-in table".to_string(), builtin_table()?)]);
    };

    if !path.is_dir() {
        let table = load_from_path(&path)?;
        return Ok(vec![(path.display().to_string(), table)]);
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(&path).max_depth(1) {
        let entry = entry?;
        if entry.file_type().is_file()
            && entry.path().extension().and_then(|s| s.to_str()) == Some("toml")
        {
            files.push(entry.path().to_path_buf());
        }
    }
    files.sort();

    if files.is_empty() {
        anyhow::bail!("No .toml patch tables found in {}", path.display());
    }

    files
        .into_iter()
        .map(|file| -> Result<(String, PatchTable)> {
            let table = load_from_path(&file)?;
            Ok((file.display().to_string(), table))
        })
        .collect()
}

fn load_rules(rules: Option<PathBuf>) -> Result<LogFixRules> {
    match rules {
        Some(path) => Ok(load_rules_from_path(path)?),
        None => Ok(LogFixRules::default()),
    }
}

/// Helper: Show unified diff between original and modified content
fn display_diff(file: &Path, original: &str, modified: &str) {
    println!(
        "\n{}",
        format!("--- {} (original)", file.display()).dimmed()
    );
    println!("{}", format!("+++ {} (patched)", file.display()).dimmed());

    let diff = TextDiff::from_lines(original, modified);

    for change in diff.iter_all_changes() {
        let sign = match change.tag() {
            ChangeTag::Delete => format!("-{}", change).red(),
            ChangeTag::Insert => format!("+{}", change).green(),
            ChangeTag::Equal => format!(" {}", change).normal(),
        };
        print!("{}", sign);
    }
}

fn report_fixed(file: &str, original: &str, updated: &str, dry_run: bool, show_diff: bool) {
    let status = if dry_run {
        "Would fix:".cyan()
    } else {
        "Fixed:".green()
    };
    println!("{} {}", status, file);

    if show_diff {
        display_diff(Path::new(file), original, updated);
    }
}

fn cmd_table(
    root: Option<PathBuf>,
    table: Option<PathBuf>,
    dry_run: bool,
    show_diff: bool,
) -> Result<()> {
    let root = resolve_root(root)?;
    let tables = load_tables(table)?;
    log::info!("project root: {}", root.display());

    if dry_run {
        println!("{}", "[DRY RUN - no files will be written]".cyan());
    }

    for (label, table) in tables {
        log::info!("applying {} ({} entries)", label, table.entries.len());

        let plans = apply_table(&table, &root, dry_run, |plan| match plan {
            EntryPlan::Missing { file } => println!("{} {} (not found)", "Skip".yellow(), file),
            EntryPlan::SkippedVersion { file, reason } => {
                println!("{} {} ({})", "Skip".cyan(), file, reason)
            }
            EntryPlan::Unchanged { file } => log::debug!("unchanged: {file}"),
            EntryPlan::Rewrite { file, rewrite } => {
                report_fixed(file, &rewrite.original, &rewrite.updated, dry_run, show_diff)
            }
        })
        .with_context(|| format!("failed to apply {label}"))?;

        let fixed = plans
            .iter()
            .filter(|plan| matches!(plan, EntryPlan::Rewrite { .. }))
            .count();
        log::info!("{label}: {fixed} of {} files changed", plans.len());
    }

    println!("Done!");
    Ok(())
}

fn cmd_log(
    root: Option<PathBuf>,
    log_path: Option<PathBuf>,
    rules: Option<PathBuf>,
    dry_run: bool,
    show_diff: bool,
) -> Result<()> {
    let root = resolve_root(root)?;
    let rules = load_rules(rules)?;
    let log_path = resolve_log(log_path);

    let groups = read_log(&log_path)?;
    log::info!(
        "{} files with diagnostics in {}",
        groups.len(),
        log_path.display()
    );

    if dry_run {
        println!("{}", "[DRY RUN - no files will be written]".cyan());
    }

    apply_log(&groups, &root, &rules, dry_run, |plan| match plan {
        FixPlan::Missing { file } => log::debug!("skipped {file} (not found)"),
        FixPlan::Unchanged { file } => log::debug!("unchanged: {file}"),
        FixPlan::Rewrite { file, rewrite } => {
            report_fixed(file, &rewrite.original, &rewrite.updated, dry_run, show_diff)
        }
    })
    .with_context(|| format!("failed to apply fixes from {}", log_path.display()))?;

    Ok(())
}

fn cmd_diagnostics(log_path: Option<PathBuf>, rules: Option<PathBuf>) -> Result<()> {
    let rules = load_rules(rules)?;
    let log_path = resolve_log(log_path);
    let groups = read_log(&log_path)?;

    if groups.is_empty() {
        println!("No diagnostics found in {}", log_path.display());
        return Ok(());
    }

    for (file, records) in &groups {
        println!("{} ({} diagnostics)", file.bold(), records.len());
        for record in records {
            println!(
                "  {}:{} {} {}",
                record.line,
                record.column,
                record.code.yellow(),
                record.message
            );
        }

        let unused = unused_identifiers(records, &rules);
        if !unused.is_empty() {
            println!("  {} {}", "unused:".dimmed(), unused.join(", "));
        }
    }

    Ok(())
}
