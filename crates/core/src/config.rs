//! Run configuration for a folder-to-git migration.
//!
//! A [`MigrationConfig`] is immutable once a run starts and is shared by both
//! stages: discovery reads the source/pattern fields, migration reads the
//! target/identity/mode fields.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::errors::ConfigError;

/// Default regular expression used to pull a version token out of a folder name.
pub const DEFAULT_EXTRACT_PATTERN: &str = r"[0-9]+(\.[0-9]+)?";

/// Parameters for one discovery + migration run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MigrationConfig {
    /// Directory containing the versioned snapshot folders.
    pub source_dir: PathBuf,

    /// Directory that holds (or will hold) the Git repository.
    pub target_dir: PathBuf,

    /// Glob joined onto `source_dir` to find candidate folders.
    pub pattern: String,

    /// Regular expression whose first match in a folder name is the version.
    pub extract_pattern: String,

    /// Skip every filesystem and repository mutation.
    pub dry_run: bool,

    /// Fallback author name.
    pub author: String,

    /// Fallback author email.
    pub email: String,

    /// Emit per-folder discovery details.
    pub verbose: bool,

    /// Merge into an existing repository instead of replacing the tree.
    pub append: bool,

    /// Optional `version:name:email` mapping file.
    pub authors_file: Option<PathBuf>,

    /// Optional commit message template.
    /// Placeholders: `{version}`, `{folder}`, `{date}`, `{files}`, `{author}`
    pub message_template: Option<String>,

    /// Extra glob patterns (relative to the snapshot root) to leave out of
    /// every commit, on top of the built-in ignore lists.
    pub ignore_patterns: Vec<String>,

    /// Append a `Source-Version:` trailer to templated messages so append
    /// runs can still recognise them.
    pub version_trailer: bool,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            source_dir: PathBuf::from("."),
            target_dir: PathBuf::from("git_history"),
            pattern: "*".into(),
            extract_pattern: DEFAULT_EXTRACT_PATTERN.into(),
            dry_run: false,
            author: "Developer".into(),
            email: "dev@example.com".into(),
            verbose: false,
            append: false,
            authors_file: None,
            message_template: None,
            ignore_patterns: Vec::new(),
            version_trailer: false,
        }
    }
}

impl MigrationConfig {
    /// Load a [`MigrationConfig`] from a TOML file. Missing keys take their
    /// defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading migration configuration");

        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }

        let contents = std::fs::read_to_string(path)?;
        let config: MigrationConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        debug!("migration configuration parsed successfully");
        Ok(config)
    }

    /// Serialize the configuration as pretty TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Validate that all required fields are present and sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pattern.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "pattern".into(),
                detail: "folder pattern must not be empty".into(),
            });
        }
        if self.extract_pattern.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "extract_pattern".into(),
                detail: "version pattern must not be empty".into(),
            });
        }
        if self.author.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "author".into(),
                detail: "author name must not be empty".into(),
            });
        }
        if !self.email.contains('@') {
            return Err(ConfigError::InvalidValue {
                field: "email".into(),
                detail: format!("'{}' is not an email address", self.email),
            });
        }
        if let Some(ref path) = self.authors_file {
            if path.is_dir() {
                return Err(ConfigError::InvalidValue {
                    field: "authors_file".into(),
                    detail: format!("'{}' is a directory", path.display()),
                });
            }
            if !path.exists() {
                warn!(path = %path.display(), "authors file not found, default author will be used");
            }
        }
        if self.source_dir == self.target_dir {
            return Err(ConfigError::InvalidValue {
                field: "target_dir".into(),
                detail: "target directory must differ from the source directory".into(),
            });
        }

        Ok(())
    }
}
