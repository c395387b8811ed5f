//! Error types for the foldergit core library.
//!
//! Each subsystem has its own error type derived with `thiserror`, and a
//! top-level [`CoreError`] enum unifies them for callers that want a single
//! error type.

use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Top-level error
// ---------------------------------------------------------------------------

/// Unified error type for the entire core library.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Migration(#[from] MigrationError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error(transparent)]
    Authors(#[from] AuthorsError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ---------------------------------------------------------------------------
// Discovery errors
// ---------------------------------------------------------------------------

/// Errors raised while scanning the source directory for version folders.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The version-extraction expression does not compile.
    #[error("invalid version pattern '{pattern}': {detail}")]
    InvalidPattern { pattern: String, detail: String },

    /// The folder search pattern is not a valid glob.
    #[error("invalid folder glob '{pattern}': {detail}")]
    GlobError { pattern: String, detail: String },

    /// Nothing matched both the glob and the version pattern.
    #[error("no versioned folders found in '{}'", .0.display())]
    NoFoldersFound(PathBuf),
}

// ---------------------------------------------------------------------------
// Migration errors
// ---------------------------------------------------------------------------

/// Fatal errors that abort a migration run.
///
/// Non-fatal conditions (a single file failing to stage, a single entry
/// failing to delete) are reported through
/// [`MigrationSummary`](crate::models::MigrationSummary) instead.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("failed to create target directory '{}': {source}", .path.display())]
    DirectoryCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to initialize repository at '{}': {source}", .path.display())]
    RepositoryInitFailed {
        path: PathBuf,
        #[source]
        source: GitError,
    },

    #[error("failed to open repository at '{}': {source}", .path.display())]
    RepositoryOpenFailed {
        path: PathBuf,
        #[source]
        source: GitError,
    },

    /// Append mode was requested but there is nothing to append to.
    #[error("append mode requested but no repository exists at '{}'", .0.display())]
    RepositoryNotFound(PathBuf),

    #[error("failed to scan existing history at '{}': {source}", .path.display())]
    HistoryScanFailed {
        path: PathBuf,
        #[source]
        source: GitError,
    },

    #[error("failed to access worktree at '{}': {source}", .path.display())]
    WorktreeAccessFailed {
        path: PathBuf,
        #[source]
        source: GitError,
    },

    #[error("refusing or unable to clear '{}': {detail}", .path.display())]
    DirectoryClearFailed { path: PathBuf, detail: String },

    #[error("failed to copy '{}': {source}", .path.display())]
    FileCopyFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to commit version '{version}': {source}")]
    CommitFailed {
        version: String,
        #[source]
        source: GitError,
    },
}

// ---------------------------------------------------------------------------
// Git errors
// ---------------------------------------------------------------------------

/// Errors from local Git (git2) operations.
#[derive(Debug, Error)]
pub enum GitError {
    /// The repository path does not exist or is not a git repo.
    #[error("git repository not found at '{0}'")]
    RepositoryNotFound(String),

    /// The repository has no working directory.
    #[error("git repository at '{0}' is bare")]
    BareRepository(String),

    /// A `git2` library error.
    #[error("git2 error: {0}")]
    Git2Error(#[from] git2::Error),
}

// ---------------------------------------------------------------------------
// Authors mapping errors
// ---------------------------------------------------------------------------

/// Errors from reading the authors-mapping file.
#[derive(Debug, Error)]
pub enum AuthorsError {
    /// The mapping file could not be read.
    #[error("authors file error at '{path}': {detail}")]
    MappingFileError { path: String, detail: String },

    /// Generic I/O error.
    #[error("authors I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse or serialization error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue { field: String, detail: String },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}
