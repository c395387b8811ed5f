//! Creation-time inference for snapshot folders.
//!
//! A folder's own mtime is meaningless once it has been copied around, so the
//! timestamp is estimated as the median mtime of the files inside it. Files
//! whose names mark a release (version files, entry points, manifests,
//! container definitions) are counted twice, pulling the median toward them.
//!
//! The estimate is a pure function of a [`FileStamp`] listing; the walk itself
//! sits behind [`FileLister`] so it can be replaced in tests.

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use tracing::debug;
use walkdir::WalkDir;

/// Maximum number of files sampled per folder.
pub const MAX_SAMPLED_FILES: usize = 500;

/// Substrings (case-insensitive) of file names that get double weight.
pub const KEY_FILE_PATTERNS: &[&str] = &[
    "version.py",
    "version.txt",
    "VERSION",
    "main.py",
    "app.py",
    "bot.py",
    "config.py",
    "requirements.txt",
    "setup.py",
    "Dockerfile",
    "docker-compose.yml",
];

const SKIPPED_DIR_NAMES: &[&str] = &["__pycache__", "venv", "env", ".venv"];

/// A file seen during the walk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStamp {
    /// Path relative to the folder root.
    pub rel_path: PathBuf,
    /// Modification time as Unix seconds.
    pub modified: i64,
}

impl FileStamp {
    pub fn new(rel_path: impl Into<PathBuf>, modified: i64) -> Self {
        Self {
            rel_path: rel_path.into(),
            modified,
        }
    }
}

/// Lists the files under a folder.
pub trait FileLister {
    /// Return up to `limit` sampled files below `root`.
    fn list_files(&self, root: &Path, limit: usize) -> std::io::Result<Vec<FileStamp>>;
}

/// [`FileLister`] backed by the real filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsLister;

impl FileLister for FsLister {
    fn list_files(&self, root: &Path, limit: usize) -> std::io::Result<Vec<FileStamp>> {
        let mut stamps = Vec::new();
        let walker = WalkDir::new(root)
            .min_depth(1)
            .into_iter()
            .filter_entry(|entry| {
                !entry.file_type().is_dir() || !is_skipped_dir(&entry.file_name().to_string_lossy())
            });

        for entry in walker {
            // Unreadable entries are left out of the sample.
            let Ok(entry) = entry else { continue };
            if !entry.file_type().is_file() {
                continue;
            }
            if !is_sampled_file(&entry.file_name().to_string_lossy()) {
                continue;
            }
            let Ok(metadata) = entry.metadata() else { continue };
            let Ok(modified) = metadata.modified() else { continue };
            let secs = match modified.duration_since(UNIX_EPOCH) {
                Ok(d) => d.as_secs() as i64,
                Err(e) => -(e.duration().as_secs() as i64),
            };
            let rel = entry
                .path()
                .strip_prefix(root)
                .unwrap_or(entry.path())
                .to_path_buf();
            stamps.push(FileStamp::new(rel, secs));
            if stamps.len() >= limit {
                break;
            }
        }
        Ok(stamps)
    }
}

/// Hidden directories and virtual-env / bytecode caches are not sampled.
pub fn is_skipped_dir(name: &str) -> bool {
    name.starts_with('.') || SKIPPED_DIR_NAMES.contains(&name)
}

/// Hidden files and compiled bytecode are not sampled.
pub fn is_sampled_file(name: &str) -> bool {
    !name.starts_with('.') && !name.ends_with(".pyc")
}

/// Whether a file name counts as a release marker.
pub fn is_key_file(name: &str) -> bool {
    let lower = name.to_lowercase();
    KEY_FILE_PATTERNS
        .iter()
        .any(|pattern| lower.contains(&pattern.to_lowercase()))
}

/// Median of the weighted sample built from `stamps`, or `None` when nothing
/// qualifies. Applies the same skip rules and cap as [`FsLister`], so any
/// lister yields the same estimate.
pub fn median_timestamp(stamps: &[FileStamp]) -> Option<i64> {
    let mut samples = Vec::new();

    for stamp in stamps
        .iter()
        .filter(|s| qualifies(&s.rel_path))
        .take(MAX_SAMPLED_FILES)
    {
        samples.push(stamp.modified);
        let name = stamp
            .rel_path
            .file_name()
            .map(|n| n.to_string_lossy())
            .unwrap_or_default();
        if is_key_file(&name) {
            samples.push(stamp.modified);
        }
    }

    if samples.is_empty() {
        return None;
    }
    samples.sort_unstable();
    Some(samples[samples.len() / 2])
}

fn qualifies(rel_path: &Path) -> bool {
    let mut components: Vec<String> = rel_path
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    let Some(name) = components.pop() else {
        return false;
    };
    is_sampled_file(&name) && !components.iter().any(|dir| is_skipped_dir(dir))
}

/// Estimate when `folder` was released. Never fails: an unreadable or empty
/// folder yields the current time.
pub fn infer_creation_time(folder: &Path, lister: &dyn FileLister) -> i64 {
    let estimate = lister
        .list_files(folder, MAX_SAMPLED_FILES)
        .ok()
        .and_then(|stamps| median_timestamp(&stamps));

    match estimate {
        Some(ts) => ts,
        None => {
            debug!(folder = %folder.display(), "no file times available, using current time");
            chrono::Utc::now().timestamp()
        }
    }
}
