//! cosmoclean - Find and remove intermediate astrophotography processing folders.
//!
//! Usage:
//!   cosmoclean scan [PATH]           List target folders and their sizes
//!   cosmoclean clean [PATH] --yes    Scan, then delete the matches
//!   cosmoclean targets list          Show the configured target names
//!   cosmoclean --help                Show help

mod settings;

use std::path::{Path, PathBuf};

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result, bail};
use tracing_subscriber::EnvFilter;

use cosmoclean_scan::{
    CaseSensitivity, DeletionEvent, DeletionSummary, ScanConfig, ScanEvent, ScanRequest,
    ScanResult, Scanner, SymlinkPolicy,
};

use crate::settings::Settings;

/// Failures listed individually before the rest are summarized.
const MAX_LISTED_FAILURES: usize = 5;

#[derive(Parser)]
#[command(
    name = "cosmoclean",
    version,
    about = "Reclaim disk space from astrophotography processing folders",
    long_about = "cosmoclean finds intermediate folders left behind by image \
                  processing pipelines (calibrated, registered, logs, ...), \
                  reports how much space they use and deletes the ones you pick."
)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// Settings file (defaults to the user config directory)
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Scan a tree and list matching folders
    Scan {
        #[command(flatten)]
        scan: ScanArgs,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Scan a tree and delete matching folders
    Clean {
        #[command(flatten)]
        scan: ScanArgs,

        /// Only delete these matches (defaults to all of them)
        #[arg(long = "select", value_name = "PATH")]
        select: Vec<PathBuf>,

        /// Actually delete; without this flag nothing is removed
        #[arg(short, long)]
        yes: bool,
    },

    /// Manage the default target folder names
    Targets {
        #[command(subcommand)]
        action: TargetsCommand,
    },
}

#[derive(Args)]
struct ScanArgs {
    /// Root to scan (defaults to the last scanned root, then the current directory)
    path: Option<PathBuf>,

    /// Folder name to look for; repeat for several (defaults to the configured targets)
    #[arg(short = 't', long = "target", value_name = "NAME")]
    targets: Vec<String>,

    /// Match folder names case-sensitively
    #[arg(long)]
    case_sensitive: bool,

    /// Number of size workers (0 = one per CPU)
    #[arg(short = 'j', long = "jobs", value_name = "N")]
    workers: Option<usize>,

    /// Count symbolic links inside matches at their own size
    #[arg(long)]
    count_symlinks: bool,
}

#[derive(Subcommand)]
enum TargetsCommand {
    /// Show the configured target names
    List,
    /// Add a target name
    Add { name: String },
    /// Remove a target name
    Remove { name: String },
    /// Rename a target name, keeping its position
    Rename { old: String, new: String },
    /// Restore the built-in target names
    Reset,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let settings_path = cli.config.clone().or_else(Settings::config_path);
    let mut settings = match &settings_path {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };

    match cli.command {
        Command::Scan { scan, format } => {
            let request = build_request(&scan, &settings)?;
            let scanner = Scanner::new();
            let (result, completed) =
                run_scan(&scanner, request, matches!(format, OutputFormat::Text)).await?;
            remember_root(&mut settings, settings_path.as_deref(), &result.root);

            match format {
                OutputFormat::Text => print_result(&result, completed),
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
            }
        }
        Command::Clean { scan, select, yes } => {
            let request = build_request(&scan, &settings)?;
            let scanner = Scanner::new();
            let (result, completed) = run_scan(&scanner, request, true).await?;
            remember_root(&mut settings, settings_path.as_deref(), &result.root);
            print_result(&result, completed);

            if !completed {
                bail!("Scan was cancelled; nothing was deleted");
            }
            run_clean(&scanner, &result, select, yes).await?;
        }
        Command::Targets { action } => {
            run_targets(&mut settings, settings_path.as_deref(), action)?;
        }
    }

    Ok(())
}

/// Install the stderr log subscriber; `RUST_LOG` overrides the verbosity flag.
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "cosmoclean=warn",
        1 => "cosmoclean=info",
        2 => "cosmoclean=debug",
        _ => "cosmoclean=trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Merge command-line flags over the persisted settings.
fn build_request(args: &ScanArgs, settings: &Settings) -> Result<ScanRequest> {
    let root = args
        .path
        .clone()
        .or_else(|| settings.last_root_folder.clone())
        .unwrap_or_else(|| PathBuf::from("."));
    let targets = if args.targets.is_empty() {
        settings.target_folders.clone()
    } else {
        args.targets.clone()
    };
    let case_sensitivity = if args.case_sensitive || settings.case_sensitive {
        CaseSensitivity::Sensitive
    } else {
        CaseSensitivity::Insensitive
    };
    let symlink_policy = if args.count_symlinks || settings.count_symlinks {
        SymlinkPolicy::CountOwnSize
    } else {
        SymlinkPolicy::CountAsZero
    };

    let config = ScanConfig::builder()
        .root(root)
        .targets(targets)
        .case_sensitivity(case_sensitivity)
        .workers(args.workers.unwrap_or(settings.workers))
        .symlink_policy(symlink_policy)
        .build()
        .context("Invalid scan configuration")?;

    ScanRequest::from_config(&config).context("Invalid scan configuration")
}

/// Run a scan to its end, cancelling on Ctrl-C.
///
/// Returns the result and whether the scan completed.
async fn run_scan(
    scanner: &Scanner,
    request: ScanRequest,
    echo: bool,
) -> Result<(ScanResult, bool)> {
    let mut handle = scanner.scan(request).context("Failed to start scan")?;
    eprintln!("Scanning {}...", handle.root().display());

    let token = handle.cancellation_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("Cancelling scan...");
            token.cancel();
        }
    });

    let mut terminal = None;
    while let Some(event) = handle.recv().await {
        match event {
            ScanEvent::Matched { path, .. } if echo => eprintln!("  found {}", path.display()),
            ScanEvent::WalkError { path, error } => {
                eprintln!("  cannot read {}: {error}", path.display());
            }
            event if event.is_terminal() => terminal = Some(event),
            _ => {}
        }
    }
    interrupt.abort();

    match terminal {
        Some(ScanEvent::Completed(result)) => Ok((result, true)),
        Some(ScanEvent::Cancelled(result)) => Ok((result, false)),
        Some(ScanEvent::Failed { error }) => bail!("Scan failed: {error}"),
        _ => bail!("Scan ended without a result"),
    }
}

/// Delete the selected matches, or list them when `yes` is not set.
async fn run_clean(
    scanner: &Scanner,
    result: &ScanResult,
    select: Vec<PathBuf>,
    yes: bool,
) -> Result<()> {
    let targets: Vec<PathBuf> = if select.is_empty() {
        result.paths().map(Path::to_path_buf).collect()
    } else {
        select
            .into_iter()
            .map(|p| std::fs::canonicalize(&p).unwrap_or(p))
            .collect()
    };

    if targets.is_empty() {
        return Ok(());
    }

    if !yes {
        let bytes: u64 = targets
            .iter()
            .filter_map(|p| result.find(p))
            .map(|m| m.known_size())
            .sum();
        println!();
        println!(
            "Would permanently delete {} folder(s) ({}):",
            targets.len(),
            format_size(bytes)
        );
        for path in &targets {
            println!("  {}", path.display());
        }
        println!();
        println!("Re-run with --yes to delete them.");
        return Ok(());
    }

    let mut handle = scanner
        .delete_selected(targets)
        .context("Deletion rejected")?;

    let mut summary = None;
    while let Some(event) = handle.recv().await {
        match event {
            DeletionEvent::Deleted { path, bytes } => {
                println!("  deleted {} ({})", path.display(), format_size(bytes));
            }
            DeletionEvent::DeleteFailed { path, error } => {
                eprintln!("  failed {}: {error}", path.display());
            }
            DeletionEvent::Finished(done) => summary = Some(done),
        }
    }

    match summary {
        Some(summary) => {
            print_deletion_summary(&summary);
            Ok(())
        }
        None => bail!("Deletion ended without a summary"),
    }
}

fn run_targets(settings: &mut Settings, path: Option<&Path>, action: TargetsCommand) -> Result<()> {
    let changed = match action {
        TargetsCommand::List => {
            for name in &settings.target_folders {
                println!("{name}");
            }
            false
        }
        TargetsCommand::Add { name } => {
            settings.add_target(&name)?;
            true
        }
        TargetsCommand::Remove { name } => {
            if !settings.remove_target(&name) {
                bail!("Target {name:?} is not configured");
            }
            true
        }
        TargetsCommand::Rename { old, new } => {
            settings.rename_target(&old, &new)?;
            true
        }
        TargetsCommand::Reset => {
            settings.reset_targets();
            true
        }
    };

    if changed {
        let Some(path) = path else {
            bail!("No config directory; pass --config to choose a settings file");
        };
        settings.save(path)?;
        eprintln!("Saved {}", path.display());
    }

    Ok(())
}

/// Persist the last scanned root. Failing to save is not fatal.
fn remember_root(settings: &mut Settings, path: Option<&Path>, root: &Path) {
    if settings.last_root_folder.as_deref() == Some(root) {
        return;
    }
    settings.last_root_folder = Some(root.to_path_buf());
    if let Some(path) = path {
        if let Err(err) = settings.save(path) {
            tracing::warn!(path = %path.display(), error = %err, "failed to save settings");
        }
    }
}

fn print_result(result: &ScanResult, completed: bool) {
    println!();
    println!("{}", "─".repeat(70));
    for record in &result.matches {
        let size = match (record.size_bytes, &record.size_error) {
            (Some(bytes), None) => format_size(bytes),
            (Some(bytes), Some(_)) => format!("{} (partial)", format_size(bytes)),
            (None, _) => "unknown".to_string(),
        };
        println!(
            " {:<54} {:>14}",
            truncate(&record.path.display().to_string(), 54),
            size
        );
    }
    println!("{}", "─".repeat(70));

    let summary = &result.summary;
    let status = if completed { "Scan complete." } else { "Scan cancelled." };
    if summary.total_matches == 0 {
        println!(" {status} No matching folders found.");
    } else {
        println!(
            " {status} Found {} folder(s) - Total size: {}",
            summary.total_matches,
            format_size(summary.total_bytes)
        );
    }
    if summary.has_errors() {
        println!(
            " {} error(s): {} unreadable director(ies), {} incomplete size(s)",
            summary.error_count(),
            summary.walk_errors,
            summary.total_errors
        );
    }
    println!(" Scanned in {:.2}s", result.duration.as_secs_f64());
}

fn print_deletion_summary(summary: &DeletionSummary) {
    println!();
    println!(
        " {} - {} freed",
        summary.summary(),
        format_size(summary.bytes_freed)
    );

    if summary.failures.is_empty() {
        return;
    }
    println!();
    println!(" Some folders could not be deleted:");
    for (path, error) in summary.failures.iter().take(MAX_LISTED_FAILURES) {
        println!("   {}", path.display());
        println!("     Error: {error}");
    }
    if summary.failures.len() > MAX_LISTED_FAILURES {
        println!(
            "   ...and {} more",
            summary.failures.len() - MAX_LISTED_FAILURES
        );
    }
}

/// Format size in human-readable form.
fn format_size(bytes: u64) -> String {
    humansize::format_size(bytes, humansize::BINARY)
}

/// Truncate a string to `max_len` characters, keeping the end.
fn truncate(s: &str, max_len: usize) -> String {
    let len = s.chars().count();
    if len <= max_len {
        s.to_string()
    } else {
        let tail: String = s.chars().skip(len - max_len + 1).collect();
        format!("…{tail}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(path: Option<&str>) -> ScanArgs {
        ScanArgs {
            path: path.map(PathBuf::from),
            targets: Vec::new(),
            case_sensitive: false,
            workers: None,
            count_symlinks: false,
        }
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "cosmoclean", "-vv", "clean", "/astro", "-t", "logs", "--select", "/astro/a/logs",
            "--yes",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        let Command::Clean { scan, select, yes } = cli.command else {
            panic!("expected clean");
        };
        assert_eq!(scan.path, Some(PathBuf::from("/astro")));
        assert_eq!(scan.targets, vec!["logs".to_string()]);
        assert_eq!(select, vec![PathBuf::from("/astro/a/logs")]);
        assert!(yes);
    }

    #[test]
    fn test_cli_parses_rename() {
        let cli = Cli::try_parse_from(["cosmoclean", "targets", "rename", "logs", "logfiles"])
            .unwrap();
        let Command::Targets {
            action: TargetsCommand::Rename { old, new },
        } = cli.command
        else {
            panic!("expected targets rename");
        };
        assert_eq!(old, "logs");
        assert_eq!(new, "logfiles");
    }

    #[test]
    fn test_request_uses_settings() {
        let settings = Settings {
            target_folders: vec!["masters".to_string()],
            last_root_folder: Some(PathBuf::from("/astro/M31")),
            workers: 3,
            case_sensitive: true,
            count_symlinks: true,
        };

        let request = build_request(&args(None), &settings).unwrap();
        assert_eq!(request.root, PathBuf::from("/astro/M31"));
        assert_eq!(request.workers, 3);
        assert_eq!(request.symlink_policy, SymlinkPolicy::CountOwnSize);
        assert!(request.targets.matches("masters"));
        assert!(!request.targets.matches("Masters"));
    }

    #[test]
    fn test_flags_override_settings() {
        let mut scan = args(Some("/data"));
        scan.targets = vec!["logs".to_string()];
        scan.workers = Some(1);

        let request = build_request(&scan, &Settings::default()).unwrap();
        assert_eq!(request.root, PathBuf::from("/data"));
        assert_eq!(request.workers, 1);
        assert!(request.targets.matches("LOGS"));
        assert!(!request.targets.matches("calibrated"));
    }

    #[test]
    fn test_truncate_keeps_tail() {
        assert_eq!(truncate("/a/b", 10), "/a/b");
        assert_eq!(truncate("/astro/M31/calibrated", 11), "…calibrated");
    }
}
