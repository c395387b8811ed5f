//! `migrate`: discover folders and commit them.

use std::io::IsTerminal;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use dialoguer::Confirm;
use tracing::info;

use foldergit_core::git::GitClient;
use foldergit_core::models::MigrationSummary;
use foldergit_core::{discover, MigrationConfig, Migrator, TracingObserver};

use super::discover::folder_table;
use crate::progress::ProgressObserver;
use crate::signals::setup_cancel_handler;
use crate::style;

/// Exit status reported when Ctrl+C stopped the run early.
const EXIT_CANCELLED: u8 = 130;

pub async fn run_migrate(config: MigrationConfig, assume_yes: bool) -> Result<ExitCode> {
    info!(
        source = %config.source_dir.display(),
        target = %config.target_dir.display(),
        append = config.append,
        dry_run = config.dry_run,
        "starting folder-to-git migration"
    );

    let folders = discover(&config, &TracingObserver).context("folder discovery failed")?;

    if config.dry_run {
        println!();
        println!("{}", style::header("Dry run: these folders would be committed"));
        println!();
        println!("{}", folder_table(&folders));
        println!();
        println!("{}", style::dim("No repository was created or modified."));
        return Ok(ExitCode::SUCCESS);
    }

    if !config.append && !assume_yes && !confirm_existing_history(&config)? {
        println!(
            "{}",
            style::warn("Migration cancelled. Existing repository was not modified.")
        );
        return Ok(ExitCode::SUCCESS);
    }

    let cancel = setup_cancel_handler();
    let observer = Arc::new(ProgressObserver::new(folders.len()));
    let task_observer = Arc::clone(&observer);
    let task_config = config.clone();

    let result = tokio::task::spawn_blocking(move || {
        Migrator::new(&task_config, task_observer.as_ref())
            .with_cancel(cancel)
            .run(&folders)
    })
    .await
    .context("migration task failed")?;
    observer.finish();

    let summary = result.context("migration failed")?;
    print_summary(&config, &summary);

    if summary.cancelled {
        Ok(ExitCode::from(EXIT_CANCELLED))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

/// Ask before stacking new commits on an existing, non-empty repository.
/// Proceeds without asking when stdin is not a terminal.
fn confirm_existing_history(config: &MigrationConfig) -> Result<bool> {
    if !GitClient::exists_at(&config.target_dir) {
        return Ok(true);
    }
    let Ok(client) = GitClient::open(&config.target_dir) else {
        // Let the migration report the open failure with full context.
        return Ok(true);
    };
    if !client.has_commits() || !std::io::stdin().is_terminal() {
        return Ok(true);
    }

    Confirm::new()
        .with_prompt(format!(
            "{} already has history. Add new commits on top of it?",
            config.target_dir.display()
        ))
        .default(false)
        .interact()
        .context("failed to read confirmation")
}

fn print_summary(config: &MigrationConfig, summary: &MigrationSummary) {
    println!();
    if summary.cancelled {
        println!("{}", style::warn("Migration cancelled between folders."));
    } else {
        println!("{}", style::success("Migration complete!"));
    }
    println!("  Commits    : {}", summary.commit_count());
    if !summary.skipped_existing.is_empty() {
        println!(
            "  Skipped    : {} already in history ({})",
            summary.skipped_existing.len(),
            summary.skipped_existing.join(", ")
        );
    }
    if !summary.skipped_empty.is_empty() {
        println!(
            "  Empty      : {} ({})",
            summary.skipped_empty.len(),
            summary.skipped_empty.join(", ")
        );
    }
    println!("  Repository : {}", config.target_dir.display());

    if !summary.commits.is_empty() {
        let mut table = Table::new();
        table.load_preset(UTF8_FULL);
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Commit", "Version", "Author", "Files"]);
        for commit in &summary.commits {
            table.add_row(vec![
                Cell::new(style::short_sha(&commit.sha)),
                Cell::new(&commit.version).fg(Color::Cyan),
                Cell::new(format!("{} <{}>", commit.author_name, commit.author_email)),
                Cell::new(commit.files),
            ]);
        }
        println!();
        println!("{}", table);
    }

    if summary.has_partial_failures() {
        println!();
        for failure in summary.clear_failures.iter() {
            println!(
                "{}",
                style::warn(&format!(
                    "could not delete {}: {}",
                    failure.path.display(),
                    failure.error
                ))
            );
        }
        for failure in summary.copy_failures.iter() {
            println!(
                "{}",
                style::warn(&format!(
                    "did not copy {}: {}",
                    failure.path.display(),
                    failure.error
                ))
            );
        }
        for failure in summary.stage_failures.iter() {
            println!(
                "{}",
                style::warn(&format!(
                    "could not stage {}: {}",
                    failure.path.display(),
                    failure.error
                ))
            );
        }
    }
    println!();
}
