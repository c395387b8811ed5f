//! Working-tree materialization: clearing the target and copying a snapshot
//! into it.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::errors::MigrationError;
use crate::file_filter::{FilterDecision, IgnoreRules};
use crate::models::{ClearReport, CopyOutcome, EntryFailure};

/// Entries never deleted while clearing: repository metadata and OS trash or
/// index directories.
pub const PROTECTED_ENTRIES: &[&str] = &[
    ".git",
    ".Trash",
    ".Trashes",
    ".Spotlight-V100",
    ".fseventsd",
    "$RECYCLE.BIN",
    "System Volume Information",
];

/// Directory names that are never cleared, whatever their location.
pub const PROTECTED_DIR_NAMES: &[&str] = &[
    "bin",
    "boot",
    "dev",
    "etc",
    "home",
    "lib",
    "lib64",
    "opt",
    "proc",
    "root",
    "sbin",
    "sys",
    "tmp",
    "usr",
    "var",
    "Applications",
    "Library",
    "System",
    "Users",
    "Volumes",
    "Windows",
    "Program Files",
    "Program Files (x86)",
    "Documents",
    "Desktop",
    "Downloads",
];

/// How a snapshot is merged into the working tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopyMode {
    /// The target was cleared first; every included file is written.
    Replace,
    /// Files already present at the target path are kept untouched.
    Append,
}

/// Check that `dir` is a sane target to wipe.
pub fn ensure_clearable(dir: &Path) -> Result<(), MigrationError> {
    let refuse = |detail: String| MigrationError::DirectoryClearFailed {
        path: dir.to_path_buf(),
        detail,
    };

    let canonical = dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf());

    let Some(name) = canonical.file_name().map(|n| n.to_string_lossy().into_owned()) else {
        return Err(refuse("path has no final component".into()));
    };
    if PROTECTED_DIR_NAMES.contains(&name.as_str()) || PROTECTED_ENTRIES.contains(&name.as_str())
    {
        return Err(refuse(format!("'{name}' is a protected system directory")));
    }

    if let Some(home) = dirs::home_dir() {
        let home = home.canonicalize().unwrap_or(home);
        if canonical == home {
            return Err(refuse("target is the home directory".into()));
        }
        if canonical.parent() == Some(home.as_path()) && name.starts_with('.') {
            return Err(refuse(format!(
                "'{name}' is a hidden directory directly under the home directory"
            )));
        }
    }

    Ok(())
}

/// Delete everything under `dir` except protected entries and symlinks.
///
/// Refuses outright (see [`ensure_clearable`]) when `dir` looks like a
/// system location. Individual deletion failures are collected in the
/// report and do not stop the walk.
pub fn clear_directory(dir: &Path) -> Result<ClearReport, MigrationError> {
    ensure_clearable(dir)?;
    let mut report = ClearReport::default();
    clear_entries(dir, &mut report).map_err(|e| MigrationError::DirectoryClearFailed {
        path: dir.to_path_buf(),
        detail: e.to_string(),
    })?;
    info!(
        path = %dir.display(),
        removed = report.removed,
        failed = report.failures.len(),
        "cleared working tree"
    );
    Ok(report)
}

fn clear_entries(dir: &Path, report: &mut ClearReport) -> std::io::Result<()> {
    for entry in fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                report.failures.push(EntryFailure {
                    path: dir.to_path_buf(),
                    error: e.to_string(),
                });
                continue;
            }
        };
        let path = entry.path();
        let name = entry.file_name().to_string_lossy().into_owned();

        if PROTECTED_ENTRIES.contains(&name.as_str()) {
            report.preserved.push(path);
            continue;
        }

        let metadata = match fs::symlink_metadata(&path) {
            Ok(m) => m,
            Err(e) => {
                record_failure(report, &path, &e);
                continue;
            }
        };

        // Links may point outside the tree.
        if metadata.file_type().is_symlink() {
            debug!(path = %path.display(), "leaving symlink in place");
            report.preserved.push(path);
            continue;
        }

        if metadata.is_dir() {
            if let Err(e) = clear_entries(&path, report) {
                record_failure(report, &path, &e);
                continue;
            }
            match fs::remove_dir(&path) {
                Ok(()) => report.removed += 1,
                // Still holds a protected entry, a link or a failed delete.
                Err(e) => record_failure(report, &path, &e),
            }
        } else {
            match fs::remove_file(&path) {
                Ok(()) => report.removed += 1,
                Err(e) => record_failure(report, &path, &e),
            }
        }
    }
    Ok(())
}

fn record_failure(report: &mut ClearReport, path: &Path, error: &std::io::Error) {
    warn!(path = %path.display(), error = %error, "failed to delete entry");
    report.failures.push(EntryFailure {
        path: path.to_path_buf(),
        error: error.to_string(),
    });
}

/// Copy the filtered contents of `src` into `dst`.
///
/// Ignored directories are not descended into. Permission bits are carried
/// over. Only regular files (or links to them) are copied. A file whose
/// target path crosses a symlink inside `dst` is not written and is reported
/// in [`CopyOutcome::failures`]. Returns the copied paths relative to `dst`,
/// for staging.
pub fn copy_filtered(
    src: &Path,
    dst: &Path,
    rules: &IgnoreRules,
    mode: CopyMode,
) -> Result<CopyOutcome, MigrationError> {
    let mut outcome = CopyOutcome::default();
    let mut ignored = 0usize;

    let walker = WalkDir::new(src)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            if !entry.file_type().is_dir() {
                return true;
            }
            let rel = relative(src, entry.path());
            let decision = rules.evaluate_dir(&entry.file_name().to_string_lossy(), &rel);
            if let FilterDecision::Include = decision {
                true
            } else {
                debug!(dir = %rel, reason = decision.label(), "skipping directory");
                ignored += 1;
                false
            }
        });

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(src).to_path_buf();
            MigrationError::FileCopyFailed {
                path,
                source: e.into(),
            }
        })?;
        if entry.file_type().is_dir() {
            continue;
        }
        if !is_copyable(&entry) {
            debug!(path = %entry.path().display(), "skipping entry that is not a regular file");
            outcome.ignored += 1;
            continue;
        }

        let rel = relative(src, entry.path());
        let decision = rules.evaluate_file(&entry.file_name().to_string_lossy(), &rel);
        if !decision.is_included() {
            outcome.ignored += 1;
            continue;
        }

        let rel_path = entry.path().strip_prefix(src).unwrap_or(entry.path());
        let target = dst.join(rel_path);

        if let Some(link) = linked_ancestor(dst, rel_path) {
            skip_linked(&mut outcome, &target, &link);
            continue;
        }

        match fs::symlink_metadata(&target) {
            Ok(_) if mode == CopyMode::Append => {
                outcome.skipped_existing += 1;
                continue;
            }
            Ok(meta) if meta.file_type().is_symlink() => {
                skip_linked(&mut outcome, &target, &target);
                continue;
            }
            _ => {}
        }

        copy_file(entry.path(), &target)?;
        outcome.copied.push(rel_path.to_path_buf());
    }

    outcome.ignored += ignored;
    debug!(
        src = %src.display(),
        copied = outcome.copied.len(),
        skipped = outcome.skipped_existing,
        ignored = outcome.ignored,
        "copied snapshot"
    );
    Ok(outcome)
}

/// Regular files, and symlinks that resolve to one.
fn is_copyable(entry: &walkdir::DirEntry) -> bool {
    let file_type = entry.file_type();
    if file_type.is_file() {
        return true;
    }
    file_type.is_symlink() && fs::metadata(entry.path()).is_ok_and(|m| m.is_file())
}

/// First directory between `dst` and `dst/rel` (exclusive) that is a symlink.
fn linked_ancestor(dst: &Path, rel: &Path) -> Option<PathBuf> {
    let mut current = dst.to_path_buf();
    let parent = rel.parent()?;
    for component in parent.components() {
        current.push(component);
        match fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => return Some(current),
            Ok(_) => {}
            // Nothing further down exists yet.
            Err(_) => return None,
        }
    }
    None
}

fn skip_linked(outcome: &mut CopyOutcome, target: &Path, link: &Path) {
    let error = format!("path runs through symlink '{}'", link.display());
    warn!(path = %target.display(), error = %error, "not writing through symlink");
    outcome.failures.push(EntryFailure {
        path: target.to_path_buf(),
        error,
    });
}

fn copy_file(src: &Path, dst: &Path) -> Result<(), MigrationError> {
    let fail = |path: &Path, source: std::io::Error| MigrationError::FileCopyFailed {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent).map_err(|e| fail(parent, e))?;
    }
    fs::copy(src, dst).map_err(|e| fail(src, e))?;
    let permissions = fs::metadata(src).map_err(|e| fail(src, e))?.permissions();
    fs::set_permissions(dst, permissions).map_err(|e| fail(dst, e))?;
    Ok(())
}

fn relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(path: &Path, contents: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    fn work_dir(root: &Path) -> PathBuf {
        let dir = root.join("work");
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_clear_keeps_git_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = work_dir(tmp.path());
        write(&dir.join(".git/HEAD"), "ref: refs/heads/master");
        write(&dir.join("a.txt"), "a");
        write(&dir.join("nested/deep/b.txt"), "b");

        let report = clear_directory(&dir).unwrap();
        assert!(report.failures.is_empty());
        assert_eq!(report.removed, 4);
        assert!(dir.join(".git/HEAD").exists());
        assert!(!dir.join("a.txt").exists());
        assert!(!dir.join("nested").exists());
    }

    #[cfg(unix)]
    #[test]
    fn test_clear_leaves_symlinks_and_their_targets() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = work_dir(tmp.path());
        let outside = tmp.path().join("outside");
        write(&outside.join("keep.txt"), "keep");
        std::os::unix::fs::symlink(&outside, dir.join("link")).unwrap();

        let report = clear_directory(&dir).unwrap();
        assert!(dir.join("link").exists());
        assert!(outside.join("keep.txt").exists());
        assert_eq!(report.preserved, vec![dir.join("link")]);
    }

    #[cfg(unix)]
    #[test]
    fn test_clear_collects_failures_and_keeps_going() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = work_dir(tmp.path());
        let outside = tmp.path().join("outside");
        fs::create_dir_all(&outside).unwrap();
        write(&dir.join("keep/file.txt"), "x");
        std::os::unix::fs::symlink(&outside, dir.join("keep/link")).unwrap();
        write(&dir.join("other.txt"), "y");

        let report = clear_directory(&dir).unwrap();
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, dir.join("keep"));
        assert!(!dir.join("keep/file.txt").exists());
        assert!(!dir.join("other.txt").exists());
        assert_eq!(report.preserved, vec![dir.join("keep/link")]);
    }

    #[test]
    fn test_refuses_protected_names() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("etc");
        fs::create_dir_all(&dir).unwrap();
        assert!(matches!(
            clear_directory(&dir),
            Err(MigrationError::DirectoryClearFailed { .. })
        ));
    }

    #[test]
    fn test_refuses_home_dir() {
        if let Some(home) = dirs::home_dir() {
            assert!(ensure_clearable(&home).is_err());
            assert!(ensure_clearable(&home.join(".config")).is_err());
        }
    }

    #[test]
    fn test_copy_applies_ignore_rules() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("v1.0");
        let dst = work_dir(tmp.path());
        write(&src.join("main.py"), "print()");
        write(&src.join("pkg/util.py"), "x");
        write(&src.join("pkg/util.pyc"), "bytecode");
        write(&src.join("node_modules/dep/index.js"), "x");
        write(&src.join(".DS_Store"), "x");
        write(&src.join("app.egg-info/PKG-INFO"), "x");

        let outcome = copy_filtered(&src, &dst, &IgnoreRules::default(), CopyMode::Replace).unwrap();
        let mut copied = outcome.copied.clone();
        copied.sort();
        assert_eq!(
            copied,
            vec![PathBuf::from("main.py"), PathBuf::from("pkg/util.py")]
        );
        assert_eq!(outcome.file_count(), 2);
        assert!(dst.join("pkg/util.py").exists());
        assert!(!dst.join("node_modules").exists());
        assert!(!dst.join("pkg/util.pyc").exists());
    }

    #[test]
    fn test_append_never_overwrites() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("v1.2");
        let dst = work_dir(tmp.path());
        write(&dst.join("main.py"), "first version");
        write(&src.join("main.py"), "second version");
        write(&src.join("extra.py"), "new");

        let outcome = copy_filtered(&src, &dst, &IgnoreRules::default(), CopyMode::Append).unwrap();
        assert_eq!(outcome.copied, vec![PathBuf::from("extra.py")]);
        assert_eq!(outcome.skipped_existing, 1);
        assert_eq!(fs::read_to_string(dst.join("main.py")).unwrap(), "first version");
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_preserves_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("v1");
        let dst = work_dir(tmp.path());
        write(&src.join("run.sh"), "#!/bin/sh\n");
        fs::set_permissions(src.join("run.sh"), fs::Permissions::from_mode(0o755)).unwrap();

        copy_filtered(&src, &dst, &IgnoreRules::default(), CopyMode::Replace).unwrap();
        let mode = fs::metadata(dst.join("run.sh")).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_never_writes_through_target_symlinks() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("v1.0");
        let dst = work_dir(tmp.path());
        let outside = tmp.path().join("outside");
        write(&outside.join("data.txt"), "precious");
        write(&outside.join("single.txt"), "precious");
        std::os::unix::fs::symlink(&outside, dst.join("lib")).unwrap();
        std::os::unix::fs::symlink(outside.join("single.txt"), dst.join("single.txt")).unwrap();

        write(&src.join("lib/data.txt"), "overwritten");
        write(&src.join("single.txt"), "overwritten");
        write(&src.join("main.py"), "x");

        let outcome = copy_filtered(&src, &dst, &IgnoreRules::default(), CopyMode::Replace).unwrap();
        assert_eq!(outcome.copied, vec![PathBuf::from("main.py")]);
        let mut failed: Vec<PathBuf> = outcome.failures.iter().map(|f| f.path.clone()).collect();
        failed.sort();
        assert_eq!(failed, vec![dst.join("lib/data.txt"), dst.join("single.txt")]);
        assert_eq!(fs::read_to_string(outside.join("data.txt")).unwrap(), "precious");
        assert_eq!(fs::read_to_string(outside.join("single.txt")).unwrap(), "precious");
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_skips_links_to_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let src = tmp.path().join("v1.0");
        let dst = work_dir(tmp.path());
        write(&tmp.path().join("shared/common.py"), "x");
        write(&src.join("main.py"), "x");
        write(&tmp.path().join("real.txt"), "linked file");
        std::os::unix::fs::symlink(tmp.path().join("shared"), src.join("shared")).unwrap();
        std::os::unix::fs::symlink(tmp.path().join("real.txt"), src.join("alias.txt")).unwrap();

        let outcome = copy_filtered(&src, &dst, &IgnoreRules::default(), CopyMode::Replace).unwrap();
        assert_eq!(
            outcome.copied,
            vec![PathBuf::from("alias.txt"), PathBuf::from("main.py")]
        );
        assert_eq!(outcome.ignored, 1);
        assert!(outcome.failures.is_empty());
        assert_eq!(fs::read_to_string(dst.join("alias.txt")).unwrap(), "linked file");
        assert!(!dst.join("shared").exists());
    }

    #[test]
    fn test_copy_missing_source_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let dst = work_dir(tmp.path());
        let result = copy_filtered(
            &tmp.path().join("missing"),
            &dst,
            &IgnoreRules::default(),
            CopyMode::Replace,
        );
        assert!(matches!(result, Err(MigrationError::FileCopyFailed { .. })));
    }
}
