//! `init`: write a default configuration file.

use std::path::Path;

use anyhow::{Context, Result};
use dialoguer::Confirm;

use foldergit_core::MigrationConfig;

use crate::style;

const HEADER: &str = "\
# folder-to-git configuration
#
# Every key is optional; command-line flags override values set here.
# message_template placeholders: {version}, {folder}, {date}, {files}, {author}
# authors_file format: one `version:name:email` mapping per line

";

/// Render the default configuration with its explanatory header.
pub fn default_config_text() -> Result<String> {
    let body = MigrationConfig::default()
        .to_toml()
        .context("failed to serialize default configuration")?;
    Ok(format!("{}{}", HEADER, body))
}

pub fn run_init(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        let overwrite = Confirm::new()
            .with_prompt(format!("{} already exists. Overwrite?", output.display()))
            .default(false)
            .interact()
            .context("failed to read confirmation")?;

        if !overwrite {
            println!(
                "{}",
                style::warn("Init cancelled. Existing file was not modified.")
            );
            return Ok(());
        }
    }

    std::fs::write(output, default_config_text()?)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!(
        "{}",
        style::success(&format!("Default configuration written to {}", output.display()))
    );
    println!();
    println!("Next steps:");
    println!("  1. Set source_dir, target_dir and author details");
    println!(
        "  2. Preview the commit order: folder-to-git discover --config {}",
        output.display()
    );
    println!(
        "  3. Run the migration:        folder-to-git migrate --config {}",
        output.display()
    );

    Ok(())
}
