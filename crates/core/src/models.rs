//! Domain model types shared by discovery, materialization and migration.

use std::path::PathBuf;

use chrono::{Local, TimeZone};
use serde::{Deserialize, Serialize};

/// Display format used for folder timestamps in logs and commit messages.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Format a Unix timestamp as local `YYYY-MM-DD HH:MM:SS`.
pub fn format_timestamp(secs: i64) -> String {
    match Local.timestamp_opt(secs, 0).earliest() {
        Some(dt) => dt.format(DATE_FORMAT).to_string(),
        None => secs.to_string(),
    }
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// One discovered version candidate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderInfo {
    /// Filesystem path of the snapshot folder.
    pub path: PathBuf,
    /// Token extracted from the folder name.
    pub version: String,
    /// Inferred Unix timestamp; also the commit's authored date.
    pub creation_time: i64,
}

impl FolderInfo {
    /// Base name of the folder, as used in commit messages.
    pub fn folder_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// `creation_time` rendered with [`DATE_FORMAT`].
    pub fn created_display(&self) -> String {
        format_timestamp(self.creation_time)
    }
}

// ---------------------------------------------------------------------------
// Materialization
// ---------------------------------------------------------------------------

/// A path-level failure that was logged and did not abort the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryFailure {
    pub path: PathBuf,
    pub error: String,
}

/// Outcome of clearing the target working tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearReport {
    /// Entries removed (files and emptied directories).
    pub removed: usize,
    /// Protected entries and symlinks that were left in place.
    pub preserved: Vec<PathBuf>,
    /// Entries that could not be deleted.
    pub failures: Vec<EntryFailure>,
}

/// Outcome of copying a snapshot folder into the target.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CopyOutcome {
    /// Paths of the copied files, relative to the target root.
    pub copied: Vec<PathBuf>,
    /// Files left alone because they already existed (append mode).
    pub skipped_existing: usize,
    /// Files and directories excluded by the ignore rules, plus links that
    /// do not resolve to a regular file.
    pub ignored: usize,
    /// Files not written because their target path runs through a symlink.
    pub failures: Vec<EntryFailure>,
}

impl CopyOutcome {
    pub fn file_count(&self) -> usize {
        self.copied.len()
    }
}

/// Outcome of staging the copied files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageReport {
    pub staged: usize,
    pub failures: Vec<EntryFailure>,
}

// ---------------------------------------------------------------------------
// Migration
// ---------------------------------------------------------------------------

/// A commit produced for one folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitRecord {
    pub version: String,
    pub sha: String,
    pub files: usize,
    pub author_name: String,
    pub author_email: String,
    pub message: String,
}

/// Statistics and partial-failure sets from a migration run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MigrationSummary {
    /// Commits created, oldest first.
    pub commits: Vec<CommitRecord>,
    /// Versions skipped because the history already contains them.
    pub skipped_existing: Vec<String>,
    /// Versions skipped because nothing was left to copy.
    pub skipped_empty: Vec<String>,
    /// Entries the clearing step could not delete.
    pub clear_failures: Vec<EntryFailure>,
    /// Files the copy step refused to write.
    pub copy_failures: Vec<EntryFailure>,
    /// Files the staging step could not add.
    pub stage_failures: Vec<EntryFailure>,
    /// The run stopped early at a folder boundary.
    pub cancelled: bool,
    /// The run was a dry run and touched nothing.
    pub dry_run: bool,
}

impl MigrationSummary {
    pub fn commit_count(&self) -> usize {
        self.commits.len()
    }

    pub fn has_partial_failures(&self) -> bool {
        !self.clear_failures.is_empty()
            || !self.copy_failures.is_empty()
            || !self.stage_failures.is_empty()
    }
}
