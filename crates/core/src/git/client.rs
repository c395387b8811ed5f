//! Local Git repository operations via `git2`.

use std::path::{Path, PathBuf};

use chrono::{Local, Offset, TimeZone};
use git2::{Oid, Repository, Signature, Time};
use tracing::{debug, info, instrument};

use crate::errors::GitError;
use crate::identity::GitIdentity;
use crate::models::{EntryFailure, StageReport};

/// High-level Git client wrapping a non-bare `git2::Repository`.
pub struct GitClient {
    repo: Repository,
}

impl GitClient {
    /// Whether `path` already holds a repository (a `.git` directory).
    pub fn exists_at<P: AsRef<Path>>(path: P) -> bool {
        path.as_ref().join(".git").is_dir()
    }

    /// Open an existing Git repository at `repo_path`.
    pub fn open<P: AsRef<Path>>(repo_path: P) -> Result<Self, GitError> {
        let path = repo_path.as_ref();
        info!(path = %path.display(), "opening git repository");
        let repo = Repository::open(path)
            .map_err(|_| GitError::RepositoryNotFound(path.display().to_string()))?;
        if repo.is_bare() {
            return Err(GitError::BareRepository(path.display().to_string()));
        }
        Ok(Self { repo })
    }

    /// Initialize a new empty repository at `repo_path`.
    pub fn init<P: AsRef<Path>>(repo_path: P) -> Result<Self, GitError> {
        let path = repo_path.as_ref();
        info!(path = %path.display(), "initializing git repository");
        let repo = Repository::init(path)?;
        Ok(Self { repo })
    }

    /// Whether HEAD points at a commit.
    pub fn has_commits(&self) -> bool {
        self.repo.head().and_then(|h| h.peel_to_commit()).is_ok()
    }

    /// Messages of every commit reachable from any reference.
    pub fn commit_messages(&self) -> Result<Vec<String>, GitError> {
        let mut revwalk = self.repo.revwalk()?;
        let mut tips = 0usize;
        for reference in self.repo.references()? {
            let reference = reference?;
            // Tags on blobs or trees have no history to walk.
            if let Ok(commit) = reference.peel_to_commit() {
                revwalk.push(commit.id())?;
                tips += 1;
            }
        }
        if tips == 0 {
            return Ok(Vec::new());
        }

        let mut messages = Vec::new();
        for oid in revwalk {
            let commit = self.repo.find_commit(oid?)?;
            messages.push(String::from_utf8_lossy(commit.message_bytes()).into_owned());
        }
        debug!(count = messages.len(), tips, "collected commit messages");
        Ok(messages)
    }

    /// Stage exactly `paths` (relative to the worktree root).
    ///
    /// With `replace`, the index is emptied first so the next commit's tree
    /// is exactly `paths`. Per-file failures are collected, not returned.
    #[instrument(skip(self, paths), fields(count = paths.len()))]
    pub fn stage_files(&self, paths: &[PathBuf], replace: bool) -> Result<StageReport, GitError> {
        let mut index = self.repo.index()?;
        if replace {
            index.clear()?;
        }

        let mut report = StageReport::default();
        for path in paths {
            match index.add_path(path) {
                Ok(()) => report.staged += 1,
                Err(e) => report.failures.push(EntryFailure {
                    path: path.clone(),
                    error: e.message().to_string(),
                }),
            }
        }
        index.write()?;
        debug!(staged = report.staged, failed = report.failures.len(), "staged files");
        Ok(report)
    }

    /// Commit the current index on top of HEAD, authored and committed by
    /// `identity` at `timestamp` (Unix seconds).
    #[instrument(skip(self, message, identity))]
    pub fn commit_snapshot(
        &self,
        message: &str,
        identity: &GitIdentity,
        timestamp: i64,
    ) -> Result<Oid, GitError> {
        let mut index = self.repo.index()?;
        let tree_oid = index.write_tree()?;
        let tree = self.repo.find_tree(tree_oid)?;

        let when = Time::new(timestamp, local_offset_minutes(timestamp));
        let signature = Signature::new(&identity.name, &identity.email, &when)?;

        let parent_commit = match self.repo.head() {
            Ok(head) => Some(head.peel_to_commit()?),
            Err(_) => None,
        };
        let parents: Vec<&git2::Commit> = parent_commit.iter().collect();
        let oid = self
            .repo
            .commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;
        info!(sha = %oid, "created commit");
        Ok(oid)
    }
}

/// UTC offset of the local zone at `timestamp`, in minutes.
fn local_offset_minutes(timestamp: i64) -> i32 {
    Local
        .timestamp_opt(timestamp, 0)
        .earliest()
        .map(|dt| dt.offset().fix().local_minus_utc() / 60)
        .unwrap_or(0)
}
