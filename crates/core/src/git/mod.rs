//! Git operations for foldergit.

pub mod client;

pub use client::GitClient;
