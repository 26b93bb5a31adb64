//! Directory guarantor and tree persistence.
//!
//! File-backed handlers call [`ensure_parent_dir`] when they are constructed so
//! that the logging backend never fails on a missing directory.

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::error::{ConfigError, ConfigResult};
use crate::tree::ConfigurationTree;

/// Expands a leading `~` to the current user's home directory.
///
/// Paths without the shorthand, and paths on systems without a resolvable
/// home directory, are returned unchanged.
pub fn expand_home(path: impl AsRef<Path>) -> PathBuf {
    let path = path.as_ref();
    let mut components = path.components();
    match components.next() {
        Some(Component::Normal(first)) if first == "~" => match dirs::home_dir() {
            Some(home) => home.join(components.as_path()),
            None => path.to_path_buf(),
        },
        _ => path.to_path_buf(),
    }
}

/// Makes sure `path` exists as a directory, creating it recursively.
///
/// Idempotent: an existing directory is a no-op, and a directory created
/// concurrently by another process counts as success. Returns the expanded
/// path.
pub fn ensure_dir(path: impl AsRef<Path>) -> ConfigResult<PathBuf> {
    let path = expand_home(path);
    if path.is_dir() {
        return Ok(path);
    }

    match fs::create_dir_all(&path) {
        Ok(()) => {
            debug!(path = %path.display(), "Created log directory");
            Ok(path)
        }
        Err(e) if e.kind() == ErrorKind::AlreadyExists && path.is_dir() => Ok(path),
        Err(e) => Err(ConfigError::from_io(path, e)),
    }
}

/// Makes sure the directory containing `file` exists. Returns the expanded
/// file path.
pub fn ensure_parent_dir(file: impl AsRef<Path>) -> ConfigResult<PathBuf> {
    let file = expand_home(file);
    if let Some(parent) = file.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }
    Ok(file)
}

/// Writes `tree` to `path` as pretty-printed UTF-8 JSON.
///
/// Refuses to replace an existing file unless `overwrite` is set. Parent
/// directories are created first.
pub fn save_tree(
    tree: &ConfigurationTree,
    path: impl AsRef<Path>,
    overwrite: bool,
) -> ConfigResult<PathBuf> {
    let path = ensure_parent_dir(path)?;
    let json = tree.to_json_string()?;

    let mut options = OpenOptions::new();
    options.write(true);
    if overwrite {
        options.create(true).truncate(true);
    } else {
        options.create_new(true);
    }
    let mut file = match options.open(&path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            return Err(ConfigError::FileExists(path));
        }
        Err(e) => return Err(ConfigError::from_io(&path, e)),
    };
    file.write_all(json.as_bytes())
        .map_err(|e| ConfigError::from_io(&path, e))?;
    debug!(path = %path.display(), "Saved configuration tree");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_dir_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("a/b/c");

        let first = ensure_dir(&target).unwrap();
        assert!(first.is_dir());
        let second = ensure_dir(&target).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_ensure_dir_existing_is_noop() {
        let tmp = tempfile::tempdir().unwrap();
        assert_eq!(ensure_dir(tmp.path()).unwrap(), tmp.path());
    }

    #[test]
    fn test_ensure_dir_over_file_is_io_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("taken");
        fs::write(&file, b"x").unwrap();

        let err = ensure_dir(&file).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_ensure_parent_dir_creates_parent_only() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("logs/app.log");

        let expanded = ensure_parent_dir(&file).unwrap();
        assert_eq!(expanded, file);
        assert!(tmp.path().join("logs").is_dir());
        assert!(!file.exists());
    }

    #[test]
    fn test_bare_file_name_has_no_parent_to_create() {
        assert_eq!(ensure_parent_dir("app.log").unwrap(), PathBuf::from("app.log"));
    }

    #[test]
    fn test_save_tree_keeps_existing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("tree.json");
        fs::write(&path, b"{}").unwrap();

        let err = save_tree(&ConfigurationTree::default(), &path, false).unwrap_err();
        assert!(matches!(err, ConfigError::FileExists(ref p) if *p == path));
        assert_eq!(fs::read_to_string(&path).unwrap(), "{}");

        save_tree(&ConfigurationTree::default(), &path, true).unwrap();
        let saved: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["version"], 1);
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/var/log"), PathBuf::from("/var/log"));
        assert_eq!(expand_home("logs/~"), PathBuf::from("logs/~"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/logs"), home.join("logs"));
            assert_eq!(expand_home("~"), home);
        }
    }
}
