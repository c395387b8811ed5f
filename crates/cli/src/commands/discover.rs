//! `discover`: preview the folders a migration would commit.

use anyhow::{Context, Result};
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};

use foldergit_core::models::FolderInfo;
use foldergit_core::{discover, MigrationConfig, TracingObserver};

use crate::style;

pub fn run_discover(config: &MigrationConfig, json: bool) -> Result<()> {
    let folders = discover(config, &TracingObserver).context("folder discovery failed")?;

    if json {
        let out = serde_json::to_string_pretty(&folders).context("failed to serialize folders")?;
        println!("{}", out);
        return Ok(());
    }

    println!();
    println!(
        "{}",
        style::header(&format!("Versioned folders ({}), in commit order", folders.len()))
    );
    println!();
    println!("{}", folder_table(&folders));
    println!();
    Ok(())
}

/// Table of folders in the order they would be committed.
pub fn folder_table(folders: &[FolderInfo]) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["#", "Folder", "Version", "Created"]);

    for (i, folder) in folders.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(folder.folder_name()),
            Cell::new(&folder.version),
            Cell::new(folder.created_display()),
        ]);
    }
    table
}
