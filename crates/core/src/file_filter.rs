//! Ignore rules applied while copying a snapshot into the working tree.
//!
//! # Decision model
//!
//! | Condition | Decision |
//! |-----------|----------|
//! | Directory name in the fixed ignore list | `IgnoredDir` |
//! | Name matches a fixed file pattern | `IgnoredName` |
//! | Relative path matches a user pattern | `IgnoredPath` |
//! | None of the above | `Include` |
//!
//! Ignored directories are not descended into.

use tracing::debug;

/// Directories never copied: VCS metadata, dependency and virtual-env
/// directories, build output, editor metadata.
pub const IGNORED_DIRS: &[&str] = &[
    ".git",
    "__pycache__",
    "venv",
    ".venv",
    "node_modules",
    ".idea",
    ".vscode",
    "dist",
    "build",
    "env",
];

/// Name patterns never copied: OS metadata, compiled bytecode, VCS config,
/// editor swap files, logs and backups.
pub const IGNORED_FILE_PATTERNS: &[&str] = &[
    ".DS_Store",
    "*.pyc",
    "*.pyo",
    "*.pyd",
    ".gitignore",
    ".gitattributes",
    "*.swp",
    "*.swo",
    "*.log",
    "*.bak",
    "*.egg-info",
];

/// The outcome of evaluating one walk entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterDecision {
    Include,
    IgnoredDir { name: String },
    IgnoredName { pattern: String },
    IgnoredPath { pattern: String },
}

impl FilterDecision {
    pub fn is_included(&self) -> bool {
        matches!(self, Self::Include)
    }

    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Include => "include",
            Self::IgnoredDir { .. } => "ignored-dir",
            Self::IgnoredName { .. } => "ignored-name",
            Self::IgnoredPath { .. } => "ignored-path",
        }
    }
}

/// Fixed ignore lists plus optional user patterns.
#[derive(Debug, Clone, Default)]
pub struct IgnoreRules {
    /// Glob patterns matched against the forward-slash relative path.
    extra_patterns: Vec<String>,
}

impl IgnoreRules {
    pub fn new(extra_patterns: Vec<String>) -> Self {
        Self { extra_patterns }
    }

    /// Evaluate a directory. `name` is its base name, `rel_path` its path
    /// relative to the snapshot root.
    pub fn evaluate_dir(&self, name: &str, rel_path: &str) -> FilterDecision {
        if IGNORED_DIRS.contains(&name) {
            return FilterDecision::IgnoredDir { name: name.to_string() };
        }
        // Name patterns apply to directories too (`*.egg-info`).
        if let Some(decision) = self.match_name(name) {
            return decision;
        }
        self.match_extra(rel_path)
    }

    /// Evaluate a regular file.
    pub fn evaluate_file(&self, name: &str, rel_path: &str) -> FilterDecision {
        if let Some(decision) = self.match_name(name) {
            return decision;
        }
        self.match_extra(rel_path)
    }

    fn match_name(&self, name: &str) -> Option<FilterDecision> {
        IGNORED_FILE_PATTERNS
            .iter()
            .find(|pattern| glob_match::glob_match(pattern, name))
            .map(|pattern| FilterDecision::IgnoredName {
                pattern: (*pattern).to_string(),
            })
    }

    fn match_extra(&self, rel_path: &str) -> FilterDecision {
        let path = rel_path.replace('\\', "/");
        for pattern in &self.extra_patterns {
            let pat = pattern.replace('\\', "/");
            if glob_match::glob_match(&pat, &path) {
                debug!(path = %path, pattern = %pat, "path matches ignore pattern");
                return FilterDecision::IgnoredPath {
                    pattern: pattern.clone(),
                };
            }
        }
        FilterDecision::Include
    }
}
