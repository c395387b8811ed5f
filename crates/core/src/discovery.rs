//! Version discovery: find snapshot folders, extract their version tokens and
//! order them chronologically.

use std::path::Path;

use regex_lite::Regex;
use tracing::{debug, info};

use crate::config::MigrationConfig;
use crate::errors::DiscoveryError;
use crate::models::FolderInfo;
use crate::observer::{MigrationEvent, MigrationObserver};
use crate::timestamp::{infer_creation_time, FileLister, FsLister};

/// Compile the version-extraction expression.
pub fn compile_extract_pattern(pattern: &str) -> Result<Regex, DiscoveryError> {
    Regex::new(pattern).map_err(|e| DiscoveryError::InvalidPattern {
        pattern: pattern.to_string(),
        detail: e.to_string(),
    })
}

/// First match of `re` in `folder_name`.
pub fn extract_version(re: &Regex, folder_name: &str) -> Option<String> {
    re.find(folder_name)
        .map(|m| m.as_str().to_string())
        .filter(|v| !v.is_empty())
}

/// Discover versioned folders under `config.source_dir`, oldest first.
pub fn discover(
    config: &MigrationConfig,
    observer: &dyn MigrationObserver,
) -> Result<Vec<FolderInfo>, DiscoveryError> {
    discover_with(config, &FsLister, observer)
}

/// [`discover`] with an explicit file lister for timestamp inference.
///
/// Folders with equal timestamps keep glob order (alphabetical by path).
pub fn discover_with(
    config: &MigrationConfig,
    lister: &dyn FileLister,
    observer: &dyn MigrationObserver,
) -> Result<Vec<FolderInfo>, DiscoveryError> {
    let re = compile_extract_pattern(&config.extract_pattern)?;

    // The directory part is literal; only `pattern` carries wildcards.
    let root = glob::Pattern::escape(&config.source_dir.to_string_lossy());
    let search = Path::new(&root).join(&config.pattern);
    let search = search.to_string_lossy();
    info!(pattern = %search, "searching for versioned folders");

    // Hidden entries only match patterns that name the dot explicitly.
    let options = glob::MatchOptions {
        require_literal_leading_dot: true,
        ..Default::default()
    };
    let matches = glob::glob_with(&search, options).map_err(|e| DiscoveryError::GlobError {
        pattern: search.to_string(),
        detail: e.to_string(),
    })?;

    let mut folders = Vec::new();
    for entry in matches {
        // Unreadable matches are skipped like non-directories.
        let Ok(path) = entry else { continue };
        if !path.is_dir() {
            continue;
        }

        let name = match path.file_name() {
            Some(name) => name.to_string_lossy().into_owned(),
            None => continue,
        };

        let Some(version) = extract_version(&re, &name) else {
            if config.verbose {
                observer.on_event(&MigrationEvent::FolderUnparseable { name });
            }
            continue;
        };

        let creation_time = infer_creation_time(&path, lister);
        if config.verbose {
            observer.on_event(&MigrationEvent::FolderDiscovered {
                name,
                version: version.clone(),
                creation_time,
            });
        }

        folders.push(FolderInfo {
            path,
            version,
            creation_time,
        });
    }

    folders.sort_by_key(|f| f.creation_time);

    if folders.is_empty() {
        return Err(DiscoveryError::NoFoldersFound(config.source_dir.clone()));
    }

    for (i, folder) in folders.iter().enumerate() {
        debug!(
            "  {}. {} (version: {}, created: {})",
            i + 1,
            folder.folder_name(),
            folder.version,
            folder.created_display()
        );
    }
    observer.on_event(&MigrationEvent::DiscoveryComplete {
        count: folders.len(),
    });

    Ok(folders)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::observer::RecordingObserver;
    use crate::timestamp::FileStamp;

    /// Dates folders by the number embedded in their name.
    struct NameLister;

    impl FileLister for NameLister {
        fn list_files(&self, root: &Path, _limit: usize) -> std::io::Result<Vec<FileStamp>> {
            let name = root.file_name().unwrap().to_string_lossy().into_owned();
            let digits: String = name.chars().filter(|c| c.is_ascii_digit()).collect();
            Ok(vec![FileStamp::new("file.py", digits.parse().unwrap_or(0))])
        }
    }

    fn source_with(dirs: &[&str]) -> tempfile::TempDir {
        let tmp = tempfile::tempdir().unwrap();
        for dir in dirs {
            std::fs::create_dir_all(tmp.path().join(dir)).unwrap();
        }
        tmp
    }

    fn config_for(source: &Path) -> MigrationConfig {
        MigrationConfig {
            source_dir: source.to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn test_extract_first_match() {
        let re = compile_extract_pattern(r"[0-9]+\.[0-9]+").unwrap();
        assert_eq!(extract_version(&re, "proj_v1.2_build3.4"), Some("1.2".into()));
        assert_eq!(extract_version(&re, "no-version"), None);
    }

    #[test]
    fn test_sorted_by_creation_time_not_name() {
        let tmp = source_with(&["release_30", "release_10", "release_20"]);
        let observer = RecordingObserver::new();
        let folders = discover_with(&config_for(tmp.path()), &NameLister, &observer).unwrap();
        let versions: Vec<_> = folders.iter().map(|f| f.version.as_str()).collect();
        assert_eq!(versions, vec!["10", "20", "30"]);
        assert!(folders.windows(2).all(|w| w[0].creation_time <= w[1].creation_time));
        assert!(observer
            .events()
            .contains(&MigrationEvent::DiscoveryComplete { count: 3 }));
    }

    #[test]
    fn test_skips_files_and_unparseable_names() {
        let tmp = source_with(&["v1.0", "notes"]);
        std::fs::write(tmp.path().join("v9.9.txt"), "not a folder").unwrap();
        let config = MigrationConfig {
            verbose: true,
            ..config_for(tmp.path())
        };
        let observer = RecordingObserver::new();
        let folders = discover_with(&config, &NameLister, &observer).unwrap();
        assert_eq!(folders.len(), 1);
        assert_eq!(folders[0].version, "1.0");
        assert!(observer.events().contains(&MigrationEvent::FolderUnparseable {
            name: "notes".into()
        }));
    }

    #[test]
    fn test_glob_pattern_restricts_matches() {
        let tmp = source_with(&["project_v1", "project_v2", "other_v3"]);
        let config = MigrationConfig {
            pattern: "project_v*".into(),
            ..config_for(tmp.path())
        };
        let folders = discover_with(&config, &NameLister, &RecordingObserver::new()).unwrap();
        let paths: Vec<PathBuf> = folders.iter().map(|f| f.path.clone()).collect();
        assert_eq!(
            paths,
            vec![tmp.path().join("project_v1"), tmp.path().join("project_v2")]
        );
    }

    #[test]
    fn test_hidden_folders_not_matched() {
        let tmp = source_with(&["v1", ".v2"]);
        let folders =
            discover_with(&config_for(tmp.path()), &NameLister, &RecordingObserver::new()).unwrap();
        assert_eq!(folders.len(), 1);
        assert_eq!(folders[0].version, "1");
    }

    #[test]
    fn test_source_dir_with_glob_characters() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("Projects [old]");
        for dir in ["v1", "v2"] {
            std::fs::create_dir_all(source.join(dir)).unwrap();
        }
        let folders = discover_with(&config_for(&source), &NameLister, &RecordingObserver::new()).unwrap();
        let versions: Vec<_> = folders.iter().map(|f| f.version.as_str()).collect();
        assert_eq!(versions, vec!["1", "2"]);
    }

    #[test]
    fn test_invalid_pattern() {
        let tmp = source_with(&["v1"]);
        let config = MigrationConfig {
            extract_pattern: "([0-9]+".into(),
            ..config_for(tmp.path())
        };
        assert!(matches!(
            discover_with(&config, &NameLister, &RecordingObserver::new()),
            Err(DiscoveryError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_invalid_glob() {
        let tmp = source_with(&["v1"]);
        let config = MigrationConfig {
            pattern: "[".into(),
            ..config_for(tmp.path())
        };
        assert!(matches!(
            discover_with(&config, &NameLister, &RecordingObserver::new()),
            Err(DiscoveryError::GlobError { .. })
        ));
    }

    #[test]
    fn test_no_folders_found() {
        let tmp = source_with(&["alpha", "beta"]);
        assert!(matches!(
            discover_with(&config_for(tmp.path()), &NameLister, &RecordingObserver::new()),
            Err(DiscoveryError::NoFoldersFound(_))
        ));
    }
}
