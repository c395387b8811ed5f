//! folder-to-git command-line tool.
//!
//! Turns a directory of versioned snapshot folders into a Git history with
//! one commit per folder. Provides subcommands for running a migration,
//! previewing the discovered folder order, and generating a configuration
//! file.

mod commands;
mod progress;
mod signals;
mod style;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use foldergit_core::MigrationConfig;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// Convert a folder of versioned snapshots into a Git history.
#[derive(Parser, Debug)]
#[command(
    name = "folder-to-git",
    version,
    about = "Convert versioned snapshot folders into a Git repository history"
)]
struct Cli {
    /// Mirror log output to this file.
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Discover folders and commit each one, oldest first.
    Migrate(MigrateArgs),

    /// List the folders a migration would commit, in commit order.
    Discover {
        #[command(flatten)]
        source: SourceArgs,

        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },

    /// Generate a default configuration file.
    Init {
        /// Output path for the generated config file.
        #[arg(short, long, default_value = "./folder-to-git.toml")]
        output: PathBuf,

        /// Overwrite an existing file without asking.
        #[arg(long)]
        force: bool,
    },
}

/// Options shared by every subcommand that scans the source directory.
#[derive(Args, Debug, Default)]
struct SourceArgs {
    /// TOML configuration file; flags given here override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory containing the version folders.
    #[arg(short, long)]
    source: Option<PathBuf>,

    /// Glob pattern for version folders.
    #[arg(short, long)]
    pattern: Option<String>,

    /// Regular expression that extracts the version from a folder name.
    #[arg(short, long)]
    extract: Option<String>,

    /// Extra ignore pattern (repeatable), matched against source-relative paths.
    #[arg(long = "ignore", value_name = "GLOB")]
    ignore: Vec<String>,

    /// Verbose output.
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Args, Debug, Default)]
struct MigrateArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Target directory for the Git repository.
    #[arg(short, long)]
    target: Option<PathBuf>,

    /// Show what would be done without making changes.
    #[arg(short, long)]
    dry_run: bool,

    /// Default author name.
    #[arg(long)]
    author: Option<String>,

    /// Default author email.
    #[arg(long)]
    email: Option<String>,

    /// Append to an existing repository, skipping versions already present.
    #[arg(short, long)]
    append: bool,

    /// File mapping versions to authors (`version:name:email` per line).
    #[arg(long)]
    authors_file: Option<PathBuf>,

    /// Commit message template.
    /// Placeholders: {version}, {folder}, {date}, {files}, {author}
    #[arg(short, long)]
    message_template: Option<String>,

    /// Add a `Source-Version:` trailer to templated commit messages.
    #[arg(long)]
    version_trailer: bool,

    /// Do not ask before adding commits to an existing repository.
    #[arg(short, long)]
    yes: bool,
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let verbose = match &cli.command {
        Commands::Migrate(args) => args.source.verbose,
        Commands::Discover { source, .. } => source.verbose,
        Commands::Init { .. } => false,
    };

    let _guard = match init_logging(verbose, cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    match cli.command {
        Commands::Migrate(args) => {
            let config = resolve_migrate_config(&args)?;
            commands::migrate::run_migrate(config, args.yes).await
        }
        Commands::Discover { source, json } => {
            let config = resolve_source_config(&source)?;
            commands::discover::run_discover(&config, json)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Init { output, force } => {
            commands::init::run_init(&output, force)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Install the stderr subscriber and, when requested, a second layer writing
/// to `log_file`. The returned guard flushes the file writer on drop.
fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level))
    };

    let stderr_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .with_filter(filter());

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = match path.parent() {
                Some(parent) if !parent.as_os_str().is_empty() => parent,
                _ => Path::new("."),
            };
            let file_name = path
                .file_name()
                .with_context(|| format!("invalid log file path: {}", path.display()))?;
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create log directory {}", dir.display()))?;
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(filter());
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

// ---------------------------------------------------------------------------
// Config helpers
// ---------------------------------------------------------------------------

/// Start from the config file (or defaults) and apply source-side flags.
fn resolve_source_config(args: &SourceArgs) -> Result<MigrationConfig> {
    let mut config = match &args.config {
        Some(path) => MigrationConfig::load_from_file(path)
            .with_context(|| format!("failed to load configuration file {}", path.display()))?,
        None => MigrationConfig::default(),
    };

    if let Some(ref source) = args.source {
        config.source_dir = source.clone();
    }
    if let Some(ref pattern) = args.pattern {
        config.pattern = pattern.clone();
    }
    if let Some(ref extract) = args.extract {
        config.extract_pattern = extract.clone();
    }
    config.ignore_patterns.extend(args.ignore.iter().cloned());
    config.verbose |= args.verbose;

    Ok(config)
}

/// Full migration config: file values, then flags, then validation.
fn resolve_migrate_config(args: &MigrateArgs) -> Result<MigrationConfig> {
    let mut config = resolve_source_config(&args.source)?;

    if let Some(ref target) = args.target {
        config.target_dir = target.clone();
    }
    if let Some(ref author) = args.author {
        config.author = author.clone();
    }
    if let Some(ref email) = args.email {
        config.email = email.clone();
    }
    if let Some(ref authors_file) = args.authors_file {
        config.authors_file = Some(authors_file.clone());
    }
    if let Some(ref template) = args.message_template {
        config.message_template = Some(template.clone());
    }
    config.dry_run |= args.dry_run;
    config.append |= args.append;
    config.version_trailer |= args.version_trailer;

    config.validate().context("invalid configuration")?;
    Ok(config)
}
