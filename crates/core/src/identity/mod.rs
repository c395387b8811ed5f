//! Author attribution for version commits.
//!
//! Lookup order:
//! 1. The optional `version:name:email` mapping file
//! 2. Fallback: the run's default author and email

pub mod mapper;
pub mod mapping_file;

pub use mapper::{AuthorResolver, GitIdentity};
pub use mapping_file::{AuthorEntry, MappingFile};
