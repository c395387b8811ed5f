//! Subcommand implementations.

pub mod discover;
pub mod init;
pub mod migrate;
