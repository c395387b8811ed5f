//! Progress reporting for discovery and migration.
//!
//! Both stages report through an injected [`MigrationObserver`] instead of a
//! process-wide logger, so a CLI, a GUI, or a test can each capture the
//! stream of [`MigrationEvent`]s their own way.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use crate::models::format_timestamp;

/// Shared cancellation flag, checked only between folders.
pub type CancelFlag = Arc<AtomicBool>;

/// Create an unset cancellation flag.
pub fn cancel_flag() -> CancelFlag {
    Arc::new(AtomicBool::new(false))
}

/// Whether cancellation has been requested.
pub fn is_cancelled(flag: &CancelFlag) -> bool {
    flag.load(Ordering::SeqCst)
}

/// Everything the two stages report while they run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MigrationEvent {
    FolderDiscovered {
        name: String,
        version: String,
        creation_time: i64,
    },
    FolderUnparseable {
        name: String,
    },
    DiscoveryComplete {
        count: usize,
    },
    DryRun,
    RepositoryInitialized {
        path: PathBuf,
    },
    RepositoryOpened {
        path: PathBuf,
    },
    ExistingVersions {
        count: usize,
    },
    TemplateNotScannable,
    VersionSkipped {
        version: String,
    },
    FolderStarted {
        index: usize,
        total: usize,
        name: String,
        version: String,
    },
    FolderEmpty {
        name: String,
        version: String,
    },
    DeleteFailed {
        path: PathBuf,
        error: String,
    },
    CopySkipped {
        path: PathBuf,
        error: String,
    },
    StageFailed {
        path: PathBuf,
        error: String,
    },
    AuthorsFileUnreadable {
        path: PathBuf,
        error: String,
    },
    CommitCreated {
        version: String,
        sha: String,
        files: usize,
    },
    Cancelled {
        remaining: usize,
    },
    Finished {
        commits: usize,
        folders: usize,
    },
}

/// Receives progress events. Implementations must be cheap; they run on the
/// migration thread between filesystem operations.
pub trait MigrationObserver: Send + Sync {
    fn on_event(&self, event: &MigrationEvent);
}

/// Forwards every event to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl MigrationObserver for TracingObserver {
    fn on_event(&self, event: &MigrationEvent) {
        match event {
            MigrationEvent::FolderDiscovered {
                name,
                version,
                creation_time,
            } => debug!(
                folder = %name,
                version = %version,
                created = %format_timestamp(*creation_time),
                "found versioned folder"
            ),
            MigrationEvent::FolderUnparseable { name } => {
                debug!(folder = %name, "no version in folder name, skipping")
            }
            MigrationEvent::DiscoveryComplete { count } => {
                info!(count, "discovered versioned folders")
            }
            MigrationEvent::DryRun => info!("dry run, repository will not be created"),
            MigrationEvent::RepositoryInitialized { path } => {
                info!(path = %path.display(), "initialized new repository")
            }
            MigrationEvent::RepositoryOpened { path } => {
                info!(path = %path.display(), "opened existing repository")
            }
            MigrationEvent::ExistingVersions { count } => {
                info!(count, "found versions already in history")
            }
            MigrationEvent::TemplateNotScannable => warn!(
                "custom message template without version trailer; \
                 versions committed by this run will not be recognised by later append runs"
            ),
            MigrationEvent::VersionSkipped { version } => {
                info!(version = %version, "version already in repository, skipping")
            }
            MigrationEvent::FolderStarted {
                index,
                total,
                name,
                version,
            } => info!(
                folder = %name,
                version = %version,
                "processing folder {}/{}",
                index + 1,
                total
            ),
            MigrationEvent::FolderEmpty { name, version } => {
                warn!(folder = %name, version = %version, "no files to commit, skipping")
            }
            MigrationEvent::DeleteFailed { path, error } => {
                warn!(path = %path.display(), error = %error, "failed to delete entry")
            }
            MigrationEvent::CopySkipped { path, error } => {
                warn!(path = %path.display(), error = %error, "file not copied")
            }
            MigrationEvent::StageFailed { path, error } => {
                warn!(path = %path.display(), error = %error, "failed to stage file")
            }
            MigrationEvent::AuthorsFileUnreadable { path, error } => warn!(
                path = %path.display(),
                error = %error,
                "authors file unreadable, using default author"
            ),
            MigrationEvent::CommitCreated {
                version,
                sha,
                files,
            } => info!(version = %version, sha = %sha, files, "created commit"),
            MigrationEvent::Cancelled { remaining } => {
                warn!(remaining, "migration cancelled between folders")
            }
            MigrationEvent::Finished { commits, folders } => {
                info!(commits, folders, "migration finished")
            }
        }
    }
}

/// Collects events in memory.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<MigrationEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn events(&self) -> Vec<MigrationEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl MigrationObserver for RecordingObserver {
    fn on_event(&self, event: &MigrationEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event.clone()),
            Err(poisoned) => poisoned.into_inner().push(event.clone()),
        }
    }
}
