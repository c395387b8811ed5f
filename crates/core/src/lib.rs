//! foldergit core library.
//!
//! Turns a directory of versioned snapshot folders (`app_v1.0/`,
//! `app_v1.2/`, ...) into a Git history with one commit per folder, dated by
//! when the folder's contents were last touched. Discovery and migration are
//! separate stages so a caller can inspect or edit the ordered folder list
//! before anything is written.

pub mod commit_format;
pub mod config;
pub mod discovery;
pub mod errors;
pub mod file_filter;
pub mod git;
pub mod identity;
pub mod materialize;
pub mod migration;
pub mod models;
pub mod observer;
pub mod timestamp;

// Re-exports for convenience.
pub use config::MigrationConfig;
pub use discovery::discover;
pub use errors::CoreError;
pub use migration::{migrate, Migrator};
pub use models::{FolderInfo, MigrationSummary};
pub use observer::{CancelFlag, MigrationEvent, MigrationObserver, TracingObserver};
