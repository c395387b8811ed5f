//! Plain-text authors mapping file reader.
//!
//! The mapping file format:
//!
//! ```text
//! # version:name:email
//! 1.0:Alice:alice@example.com
//! 1.2:Bob Builder:bob@example.com
//! ```
//!
//! Blank lines and `#` comments are ignored. A line needs at least three
//! colon-separated fields; extra fields are ignored. The first line for a
//! version wins.

use std::path::Path;

use tracing::{debug, info};

use crate::errors::AuthorsError;

/// A single author entry in the mapping file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorEntry {
    pub version: String,
    pub name: String,
    pub email: String,
}

/// Parsed mapping file, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingFile {
    entries: Vec<AuthorEntry>,
}

impl MappingFile {
    /// Load the mapping file from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, AuthorsError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading authors mapping file");

        if !path.exists() {
            return Err(AuthorsError::MappingFileError {
                path: path.display().to_string(),
                detail: "file not found".into(),
            });
        }

        let contents = std::fs::read_to_string(path)?;
        let file = Self::parse(&contents);
        debug!(count = file.entries.len(), "loaded author mappings");
        Ok(file)
    }

    /// Parse mapping text. Malformed lines are skipped.
    pub fn parse(contents: &str) -> Self {
        let entries = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| {
                let parts: Vec<&str> = line.split(':').collect();
                if parts.len() < 3 {
                    debug!(line, "skipping malformed authors line");
                    return None;
                }
                Some(AuthorEntry {
                    version: parts[0].to_string(),
                    name: parts[1].to_string(),
                    email: parts[2].to_string(),
                })
            })
            .collect();
        Self { entries }
    }

    /// First entry for `version`.
    pub fn lookup(&self, version: &str) -> Option<&AuthorEntry> {
        self.entries.iter().find(|e| e.version == version)
    }
}
