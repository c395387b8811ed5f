//! Migration orchestrator: turns an ordered list of snapshot folders into one
//! commit per folder.
//!
//! Folders are processed strictly in the order given. Each folder runs
//! materialize, stage and commit to completion before the next one starts,
//! and cancellation is only honoured between folders.

use std::collections::HashSet;
use std::fs;

use tracing::{debug, info, instrument};

use crate::commit_format::{CommitFormatter, MessageContext};
use crate::config::MigrationConfig;
use crate::errors::MigrationError;
use crate::file_filter::IgnoreRules;
use crate::git::GitClient;
use crate::identity::AuthorResolver;
use crate::materialize::{clear_directory, copy_filtered, ensure_clearable, CopyMode};
use crate::models::{format_timestamp, CommitRecord, FolderInfo, MigrationSummary};
use crate::observer::{is_cancelled, CancelFlag, MigrationEvent, MigrationObserver};

/// Migrate `folders` (oldest first) into the repository at
/// `config.target_dir`.
pub fn migrate(
    config: &MigrationConfig,
    folders: &[FolderInfo],
    observer: &dyn MigrationObserver,
) -> Result<MigrationSummary, MigrationError> {
    Migrator::new(config, observer).run(folders)
}

/// Runs a single migration against one target directory.
pub struct Migrator<'a> {
    config: &'a MigrationConfig,
    observer: &'a dyn MigrationObserver,
    cancel: Option<CancelFlag>,
}

impl<'a> Migrator<'a> {
    pub fn new(config: &'a MigrationConfig, observer: &'a dyn MigrationObserver) -> Self {
        Self {
            config,
            observer,
            cancel: None,
        }
    }

    /// Stop before the next folder once `flag` is set.
    pub fn with_cancel(mut self, flag: CancelFlag) -> Self {
        self.cancel = Some(flag);
        self
    }

    fn cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(is_cancelled)
    }

    fn emit(&self, event: MigrationEvent) {
        self.observer.on_event(&event);
    }

    #[instrument(skip_all, fields(target = %self.config.target_dir.display(), folders = folders.len()))]
    pub fn run(&self, folders: &[FolderInfo]) -> Result<MigrationSummary, MigrationError> {
        let config = self.config;

        if config.dry_run {
            self.emit(MigrationEvent::DryRun);
            return Ok(MigrationSummary {
                dry_run: true,
                ..Default::default()
            });
        }

        let target = &config.target_dir;
        fs::create_dir_all(target).map_err(|e| MigrationError::DirectoryCreateFailed {
            path: target.clone(),
            source: e,
        })?;
        // Refuse a dangerous target before a repository is created in it.
        if !config.append {
            ensure_clearable(target)?;
        }

        let client = self.acquire_repository()?;

        let formatter =
            CommitFormatter::new(config.message_template.as_deref(), config.version_trailer);
        let mut existing = if config.append {
            self.existing_versions(&client)?
        } else {
            HashSet::new()
        };
        if config.append && !formatter.is_scannable() {
            self.emit(MigrationEvent::TemplateNotScannable);
        }

        let (authors, problem) = AuthorResolver::from_config(config);
        if let Some((path, error)) = problem {
            self.emit(MigrationEvent::AuthorsFileUnreadable {
                path,
                error: error.to_string(),
            });
        }

        let rules = IgnoreRules::new(config.ignore_patterns.clone());
        let mut summary = MigrationSummary::default();
        let total = folders.len();

        for (index, folder) in folders.iter().enumerate() {
            if self.cancelled() {
                self.emit(MigrationEvent::Cancelled {
                    remaining: total - index,
                });
                summary.cancelled = true;
                break;
            }

            if existing.contains(&folder.version) {
                self.emit(MigrationEvent::VersionSkipped {
                    version: folder.version.clone(),
                });
                summary.skipped_existing.push(folder.version.clone());
                continue;
            }

            let name = folder.folder_name();
            self.emit(MigrationEvent::FolderStarted {
                index,
                total,
                name: name.clone(),
                version: folder.version.clone(),
            });

            let copied = if config.append {
                copy_filtered(&folder.path, target, &rules, CopyMode::Append)?
            } else {
                let report = clear_directory(target)?;
                for failure in report.failures {
                    self.emit(MigrationEvent::DeleteFailed {
                        path: failure.path.clone(),
                        error: failure.error.clone(),
                    });
                    summary.clear_failures.push(failure);
                }
                copy_filtered(&folder.path, target, &rules, CopyMode::Replace)?
            };
            for failure in copied.failures.iter() {
                self.emit(MigrationEvent::CopySkipped {
                    path: failure.path.clone(),
                    error: failure.error.clone(),
                });
            }
            summary.copy_failures.extend(copied.failures.iter().cloned());

            if copied.file_count() == 0 {
                self.emit(MigrationEvent::FolderEmpty {
                    name,
                    version: folder.version.clone(),
                });
                summary.skipped_empty.push(folder.version.clone());
                continue;
            }

            let identity = authors.resolve(&folder.version);
            let date = format_timestamp(folder.creation_time);
            let message = formatter.format(&MessageContext {
                version: &folder.version,
                folder: &name,
                date: &date,
                files: copied.file_count(),
                author: &identity.name,
            });

            let staged = client
                .stage_files(&copied.copied, !config.append)
                .map_err(|e| MigrationError::WorktreeAccessFailed {
                    path: target.clone(),
                    source: e,
                })?;
            for failure in staged.failures {
                self.emit(MigrationEvent::StageFailed {
                    path: failure.path.clone(),
                    error: failure.error.clone(),
                });
                summary.stage_failures.push(failure);
            }

            let oid = client
                .commit_snapshot(&message, &identity, folder.creation_time)
                .map_err(|e| MigrationError::CommitFailed {
                    version: folder.version.clone(),
                    source: e,
                })?;

            if config.append {
                existing.insert(folder.version.clone());
            }

            let sha = oid.to_string();
            self.emit(MigrationEvent::CommitCreated {
                version: folder.version.clone(),
                sha: sha.clone(),
                files: staged.staged,
            });
            summary.commits.push(CommitRecord {
                version: folder.version.clone(),
                sha,
                files: staged.staged,
                author_name: identity.name,
                author_email: identity.email,
                message,
            });
        }

        self.emit(MigrationEvent::Finished {
            commits: summary.commit_count(),
            folders: total,
        });
        info!(
            commits = summary.commit_count(),
            skipped = summary.skipped_existing.len() + summary.skipped_empty.len(),
            "migration complete"
        );
        Ok(summary)
    }

    fn acquire_repository(&self) -> Result<GitClient, MigrationError> {
        let target = &self.config.target_dir;

        if GitClient::exists_at(target) {
            let client =
                GitClient::open(target).map_err(|e| MigrationError::RepositoryOpenFailed {
                    path: target.clone(),
                    source: e,
                })?;
            self.emit(MigrationEvent::RepositoryOpened {
                path: target.clone(),
            });
            return Ok(client);
        }

        if self.config.append {
            return Err(MigrationError::RepositoryNotFound(target.clone()));
        }

        let client = GitClient::init(target).map_err(|e| MigrationError::RepositoryInitFailed {
            path: target.clone(),
            source: e,
        })?;
        self.emit(MigrationEvent::RepositoryInitialized {
            path: target.clone(),
        });
        Ok(client)
    }

    /// Version tokens already recorded anywhere in the repository's history.
    fn existing_versions(&self, client: &GitClient) -> Result<HashSet<String>, MigrationError> {
        let messages = client
            .commit_messages()
            .map_err(|e| MigrationError::HistoryScanFailed {
                path: self.config.target_dir.clone(),
                source: e,
            })?;
        let versions: HashSet<String> = messages
            .iter()
            .filter_map(|m| CommitFormatter::extract_version(m))
            .collect();
        debug!(?versions, "versions found in history");
        self.emit(MigrationEvent::ExistingVersions {
            count: versions.len(),
        });
        Ok(versions)
    }
}

#[cfg(test)]
mod tests {
    use std::path::{Path, PathBuf};
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::observer::{cancel_flag, RecordingObserver};

    fn folder(root: &Path, name: &str, version: &str, time: i64, files: &[&str]) -> FolderInfo {
        let path = root.join(name);
        for file in files {
            let file_path = path.join(file);
            fs::create_dir_all(file_path.parent().unwrap()).unwrap();
            fs::write(&file_path, format!("{name}/{file}")).unwrap();
        }
        fs::create_dir_all(&path).unwrap();
        FolderInfo {
            path,
            version: version.into(),
            creation_time: time,
        }
    }

    fn config(target: PathBuf) -> MigrationConfig {
        MigrationConfig {
            target_dir: target,
            ..Default::default()
        }
    }

    #[test]
    fn test_dry_run_touches_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("repo");
        let folders = vec![folder(tmp.path(), "v1.0", "1.0", 100, &["a.py"])];
        let cfg = MigrationConfig {
            dry_run: true,
            ..config(target.clone())
        };
        let observer = RecordingObserver::new();
        let summary = migrate(&cfg, &folders, &observer).unwrap();
        assert!(summary.dry_run);
        assert_eq!(summary.commit_count(), 0);
        assert!(!target.exists());
        assert_eq!(observer.events(), vec![MigrationEvent::DryRun]);
    }

    #[test]
    fn test_append_without_repository_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let folders = vec![folder(tmp.path(), "v1.0", "1.0", 100, &["a.py"])];
        let cfg = MigrationConfig {
            append: true,
            ..config(tmp.path().join("repo"))
        };
        assert!(matches!(
            migrate(&cfg, &folders, &RecordingObserver::new()),
            Err(MigrationError::RepositoryNotFound(_))
        ));
    }

    #[test]
    fn test_empty_folder_produces_no_commit() {
        let tmp = tempfile::tempdir().unwrap();
        let folders = vec![
            folder(tmp.path(), "v1.0", "1.0", 100, &["a.py"]),
            folder(tmp.path(), "v1.1", "1.1", 200, &["only.pyc"]),
        ];
        let observer = RecordingObserver::new();
        let summary = migrate(&config(tmp.path().join("repo")), &folders, &observer).unwrap();
        assert_eq!(summary.commit_count(), 1);
        assert_eq!(summary.skipped_empty, vec!["1.1".to_string()]);
        assert!(observer.events().contains(&MigrationEvent::FolderEmpty {
            name: "v1.1".into(),
            version: "1.1".into()
        }));
    }

    #[test]
    fn test_cancel_stops_before_first_folder() {
        let tmp = tempfile::tempdir().unwrap();
        let folders = vec![
            folder(tmp.path(), "v1.0", "1.0", 100, &["a.py"]),
            folder(tmp.path(), "v1.1", "1.1", 200, &["b.py"]),
        ];
        let flag = cancel_flag();
        flag.store(true, Ordering::SeqCst);

        let cfg = config(tmp.path().join("repo"));
        let observer = RecordingObserver::new();
        let summary = Migrator::new(&cfg, &observer)
            .with_cancel(flag)
            .run(&folders)
            .unwrap();
        assert!(summary.cancelled);
        assert_eq!(summary.commit_count(), 0);
        assert!(observer
            .events()
            .contains(&MigrationEvent::Cancelled { remaining: 2 }));
    }

    #[test]
    fn test_unscannable_template_warns_in_append_mode() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("repo");
        let folders = vec![folder(tmp.path(), "v1.0", "1.0", 100, &["a.py"])];
        migrate(&config(target.clone()), &folders, &RecordingObserver::new()).unwrap();

        let cfg = MigrationConfig {
            append: true,
            message_template: Some("Release {version}".into()),
            ..config(target)
        };
        let observer = RecordingObserver::new();
        let summary = migrate(&cfg, &folders, &observer).unwrap();
        assert_eq!(summary.skipped_existing, vec!["1.0".to_string()]);
        assert!(observer
            .events()
            .contains(&MigrationEvent::TemplateNotScannable));
    }

    #[test]
    fn test_commit_record_carries_message_and_author() {
        let tmp = tempfile::tempdir().unwrap();
        let folders = vec![folder(tmp.path(), "app-2.0", "2.0", 1_600_000_000, &["main.py"])];
        let cfg = MigrationConfig {
            author: "Bob".into(),
            email: "bob@example.com".into(),
            ..config(tmp.path().join("repo"))
        };
        let summary = migrate(&cfg, &folders, &RecordingObserver::new()).unwrap();
        let record = &summary.commits[0];
        assert_eq!(record.files, 1);
        assert_eq!(record.author_name, "Bob");
        assert!(record.message.starts_with("Version 2.0: app-2.0 (created: "));
    }

    #[test]
    fn test_protected_target_refused_before_repository_init() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("etc");
        let folders = vec![folder(tmp.path(), "v1.0", "1.0", 100, &["a.py"])];
        let result = migrate(&config(target.clone()), &folders, &RecordingObserver::new());
        assert!(matches!(
            result,
            Err(MigrationError::DirectoryClearFailed { .. })
        ));
        assert!(!target.join(".git").exists());
    }

    #[test]
    fn test_append_commits_each_version_once_per_run() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("repo");
        let seed = vec![folder(tmp.path(), "app_0.9", "0.9", 50, &["a.py"])];
        migrate(&config(target.clone()), &seed, &RecordingObserver::new()).unwrap();

        let folders = vec![
            folder(tmp.path(), "app_1.0", "1.0", 100, &["b.py"]),
            folder(tmp.path(), "app_1.0_hotfix", "1.0", 200, &["c.py"]),
        ];
        let cfg = MigrationConfig {
            append: true,
            ..config(target)
        };
        let summary = migrate(&cfg, &folders, &RecordingObserver::new()).unwrap();
        assert_eq!(summary.commit_count(), 1);
        assert_eq!(summary.commits[0].version, "1.0");
        assert_eq!(summary.skipped_existing, vec!["1.0".to_string()]);
    }

    #[cfg(unix)]
    #[test]
    fn test_delete_failure_is_reported_and_run_continues() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("repo");
        let outside = tmp.path().join("outside");
        fs::create_dir_all(target.join("keep")).unwrap();
        fs::create_dir_all(&outside).unwrap();
        std::os::unix::fs::symlink(&outside, target.join("keep/link")).unwrap();

        let folders = vec![folder(tmp.path(), "v1.0", "1.0", 100, &["a.py"])];
        let observer = RecordingObserver::new();
        let summary = migrate(&config(target.clone()), &folders, &observer).unwrap();

        assert_eq!(summary.commit_count(), 1);
        assert_eq!(summary.clear_failures.len(), 1);
        assert_eq!(summary.clear_failures[0].path, target.join("keep"));
        assert!(summary.has_partial_failures());
        assert!(observer.events().iter().any(|e| matches!(
            e,
            MigrationEvent::DeleteFailed { path, .. } if *path == target.join("keep")
        )));
    }

    #[cfg(unix)]
    #[test]
    fn test_replace_run_leaves_linked_data_untouched() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("repo");
        let outside = tmp.path().join("outside");
        fs::create_dir_all(&target).unwrap();
        fs::create_dir_all(&outside).unwrap();
        fs::write(outside.join("data.txt"), "precious").unwrap();
        std::os::unix::fs::symlink(&outside, target.join("lib")).unwrap();

        let folders = vec![folder(
            tmp.path(),
            "v1.0",
            "1.0",
            100,
            &["main.py", "lib/data.txt"],
        )];
        let observer = RecordingObserver::new();
        let summary = migrate(&config(target.clone()), &folders, &observer).unwrap();

        assert_eq!(fs::read_to_string(outside.join("data.txt")).unwrap(), "precious");
        assert_eq!(summary.commits[0].files, 1);
        assert_eq!(summary.copy_failures.len(), 1);
        assert_eq!(summary.copy_failures[0].path, target.join("lib/data.txt"));
        assert!(observer
            .events()
            .iter()
            .any(|e| matches!(e, MigrationEvent::CopySkipped { .. })));
    }
}
