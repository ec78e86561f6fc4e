//! CLI entry point for the autocommit agent.
//!
//! This binary watches a directory tree and turns bursts of file changes into
//! git commits, and provides a static checker for classic ASP pages.
//!
//! # Usage
//!
//! ```bash
//! autocommit [OPTIONS] <COMMAND>
//!
//! # Commit .asp changes under ./site into the repository at .
//! autocommit watch --dir ./site --repo .
//!
//! # Faster cadence, several extensions, no push
//! autocommit watch --interval 30 --max-wait 300 --ext .asp,.inc --no-push
//!
//! # Check pages before deploying
//! autocommit lint site/*.asp
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::io::Write;

use ac_core::AgentConfig;
use ac_lint::Linter;
use ac_scheduler::{CommitExecutor, CommitScheduler, GitCli, ShutdownCoordinator};
use ac_watcher::{DirectoryWatcher, ExtensionFilter, IgnoredDirs};
use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{WrapErr, eyre};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Commits changes to watched files automatically.
///
/// Changes are batched: a commit happens once no relevant file has changed
/// for the debounce interval, or when the oldest pending change reaches the
/// max-wait bound.
#[derive(Parser)]
#[command(name = "autocommit", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// JSON configuration file. Command-line options override its values.
    #[arg(short, long, global = true, env = "AUTOCOMMIT_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Watch a directory and commit changes until interrupted.
    Watch(WatchArgs),

    /// Check ASP pages for broken includes, unbalanced blocks and curly quotes.
    Lint {
        /// Files to check. Files without an `.asp` extension are skipped.
        #[arg(required = true)]
        files: Vec<Utf8PathBuf>,
    },
}

/// Options of the `watch` command. Each overrides the configuration file.
#[derive(Args)]
struct WatchArgs {
    /// Directory to watch [default: .]
    #[arg(short, long, env = "AUTOCOMMIT_DIR")]
    dir: Option<Utf8PathBuf>,

    /// Git working tree to commit in [default: .]
    #[arg(short, long, env = "AUTOCOMMIT_REPO")]
    repo: Option<Utf8PathBuf>,

    /// Seconds without changes before committing [default: 180]
    #[arg(short, long, env = "AUTOCOMMIT_INTERVAL")]
    interval: Option<u64>,

    /// Maximum seconds from the first change to its commit; 0 or less disables [default: 900]
    #[arg(long, env = "AUTOCOMMIT_MAX_WAIT", allow_negative_numbers = true)]
    max_wait: Option<i64>,

    /// Comma-separated extensions to watch [default: .asp]
    #[arg(short, long, env = "AUTOCOMMIT_EXT")]
    ext: Option<String>,

    /// Remote to push to instead of the branch default.
    #[arg(long, env = "AUTOCOMMIT_REMOTE")]
    remote: Option<String>,

    /// Commit locally without pushing.
    #[arg(long, env = "AUTOCOMMIT_NO_PUSH")]
    no_push: bool,
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects the `RUST_LOG` environment variable if set. Otherwise, uses
/// `debug` level if verbose, or `info` level by default. The file watching
/// backend is capped at `warn`.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},mio=warn,notify=warn"))
    });

    let use_ansi = !no_color && std::env::var_os("NO_COLOR").is_none();

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_ansi(use_ansi))
        .with(filter)
        .init();
}

/// Loads the configuration file, or the defaults when none is given.
fn load_config(path: Option<&Utf8PathBuf>) -> color_eyre::Result<AgentConfig> {
    match path {
        Some(path) => AgentConfig::from_json_file(path)
            .wrap_err_with(|| format!("Failed to load configuration from {path}")),
        None => Ok(AgentConfig::default()),
    }
}

/// Applies `watch` options over the loaded configuration and validates the
/// result.
///
/// Both the watch root and the repository are canonicalized so logged paths
/// and git invocations do not depend on the working directory.
fn build_config(mut config: AgentConfig, args: &WatchArgs) -> color_eyre::Result<AgentConfig> {
    if let Some(dir) = &args.dir {
        config.watch.root.clone_from(dir);
    }
    if let Some(repo) = &args.repo {
        config.commit.repo.clone_from(repo);
    }
    if let Some(interval) = args.interval {
        config.schedule.interval_secs = interval;
    }
    if let Some(max_wait) = args.max_wait {
        config.schedule.max_wait_secs = max_wait;
    }
    if let Some(ext) = &args.ext {
        config.watch.extensions = ext.split(',').map(str::to_owned).collect();
    }
    if args.remote.is_some() {
        config.commit.remote.clone_from(&args.remote);
    }
    if args.no_push {
        config.commit.push = false;
    }

    config.validate().wrap_err("Invalid configuration")?;

    config.watch.root = config.watch.root.canonicalize_utf8()?;
    config.commit.repo = config.commit.repo.canonicalize_utf8()?;

    Ok(config)
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Watches and commits until a termination signal arrives.
///
/// Startup failures are returned; once the loop runs, failures are logged.
async fn run_watch(config: AgentConfig) -> color_eyre::Result<()> {
    let extensions = config.watch.extension_set();
    info!(
        root = %config.watch.root,
        repo = %config.commit.repo,
        interval_secs = config.schedule.interval_secs,
        max_wait_secs = config.schedule.max_wait_secs,
        extensions = ?extensions.as_slice(),
        push = config.commit.push,
        "Autocommit agent started"
    );

    let ignored = IgnoredDirs::new(config.watch.ignored_dirs.clone());
    let (watcher, streams) = DirectoryWatcher::start(&config.watch.root, ignored)
        .await
        .wrap_err("Failed to start directory watcher")?;

    let vcs = GitCli::new(config.commit.repo.clone()).with_remote(config.commit.remote.clone());
    let executor = CommitExecutor::new(vcs).with_push(config.commit.push);
    let scheduler = CommitScheduler::new(&config.schedule, ExtensionFilter::new(extensions), executor);

    let shutdown = ShutdownCoordinator::new();
    let listener = shutdown.listen();

    scheduler
        .run(streams.events, streams.errors, shutdown.token())
        .await;

    // The loop also ends when the watcher dies; release the signal listener.
    shutdown.trigger();
    let _ = listener.await;

    if let Err(error) = watcher.shutdown().await {
        warn!(error = %error, "Directory watcher did not stop cleanly");
    }

    info!("Autocommit agent stopped");
    Ok(())
}

/// Lints the given files and prints one line per problem.
///
/// # Errors
///
/// Returns an error when any problem was found, so the process exits
/// non-zero.
fn run_lint(files: &[Utf8PathBuf]) -> color_eyre::Result<()> {
    let linter = Linter::new()?;
    let diagnostics = linter.lint_files(files);

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    for diagnostic in &diagnostics {
        writeln!(handle, "{diagnostic}")?;
    }

    if diagnostics.is_empty() {
        info!(files = files.len(), "No problems found");
        Ok(())
    } else {
        Err(eyre!("{} problem(s) found", diagnostics.len()))
    }
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // 1. Install color-eyre FIRST (before any potential panics)
    color_eyre::install()?;

    // 2. Parse CLI arguments
    let cli = Cli::parse();

    // 3. Route to the command; tracing starts once verbosity is known
    match &cli.command {
        Commands::Watch(args) => {
            let config = load_config(cli.config.as_ref())?;
            init_tracing(cli.verbose || config.verbose, cli.no_color);
            let config = build_config(config, args)?;
            run_watch(config).await
        }
        Commands::Lint { files } => {
            init_tracing(cli.verbose, cli.no_color);
            run_lint(files)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_watch_options_parse() {
        let cli = Cli::try_parse_from([
            "autocommit",
            "watch",
            "--dir",
            "site",
            "--interval",
            "30",
            "--max-wait",
            "-1",
            "--ext",
            ".asp,.inc",
            "--no-push",
        ])
        .unwrap();

        let Commands::Watch(args) = cli.command else {
            panic!("expected watch");
        };
        assert_eq!(args.dir.as_deref().map(camino::Utf8Path::as_str), Some("site"));
        assert_eq!(args.interval, Some(30));
        assert_eq!(args.max_wait, Some(-1));
        assert!(args.no_push);
    }

    #[test]
    fn test_lint_requires_files() {
        assert!(Cli::try_parse_from(["autocommit", "lint"]).is_err());
    }

    #[test]
    fn test_overrides_are_applied_before_validation() {
        let args = WatchArgs {
            dir: Some(Utf8PathBuf::from("/nonexistent/site")),
            repo: None,
            interval: Some(5),
            max_wait: None,
            ext: None,
            remote: None,
            no_push: false,
        };

        let err = build_config(AgentConfig::default(), &args).unwrap_err();

        assert!(format!("{err:?}").contains("/nonexistent/site"));
    }
}
