//! Resolves the commit identity for a version.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::mapping_file::MappingFile;
use crate::config::MigrationConfig;
use crate::errors::AuthorsError;

/// A Git author identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GitIdentity {
    pub name: String,
    pub email: String,
}

/// Maps version tokens to identities, falling back to the run default.
#[derive(Debug, Clone)]
pub struct AuthorResolver {
    mapping: MappingFile,
    default: GitIdentity,
}

impl AuthorResolver {
    pub fn new(mapping: MappingFile, default: GitIdentity) -> Self {
        Self { mapping, default }
    }

    /// Build from the run config. An absent mapping file is not an error; an
    /// unreadable one is returned alongside a resolver that only knows the
    /// default, so the caller can report it and carry on.
    pub fn from_config(config: &MigrationConfig) -> (Self, Option<(PathBuf, AuthorsError)>) {
        let default = GitIdentity {
            name: config.author.clone(),
            email: config.email.clone(),
        };

        let Some(path) = config.authors_file.as_ref() else {
            return (Self::new(MappingFile::default(), default), None);
        };

        if !path.exists() {
            warn!(path = %path.display(), "authors file not found, using default author");
            return (Self::new(MappingFile::default(), default), None);
        }

        match MappingFile::load(path) {
            Ok(mapping) => (Self::new(mapping, default), None),
            Err(e) => (
                Self::new(MappingFile::default(), default),
                Some((path.clone(), e)),
            ),
        }
    }

    /// Identity for `version`. Entries with an empty name or email fall back
    /// to the default.
    pub fn resolve(&self, version: &str) -> GitIdentity {
        match self.mapping.lookup(version) {
            Some(entry) if !entry.name.is_empty() && !entry.email.is_empty() => {
                debug!(version, name = %entry.name, "author from mapping file");
                GitIdentity {
                    name: entry.name.clone(),
                    email: entry.email.clone(),
                }
            }
            _ => self.default.clone(),
        }
    }
}
