/// Filesystem and revision-control adapters for the `ontoguard` binary.
///
/// `ontoguard-core` never touches the filesystem or spawns processes: it reads
/// through the [`ontoguard_core::FileStore`] and [`ontoguard_core::VersionedStore`]
/// capability traits. This module is their only implementation, so every real
/// I/O operation in the binary funnels through here.
use std::path::{Path, PathBuf};
use std::process::Command;

use ontoguard_core::{EntityType, FileStore, VersionedStore};

use crate::error::CliError;

// ---------------------------------------------------------------------------
// RealFileStore
// ---------------------------------------------------------------------------

/// Reads a repository's working tree from disk.
///
/// Files larger than `max_file_size` are treated as unreadable (the entity
/// index records them as skipped, the same outcome as a file that
/// disappeared mid-scan) rather than aborting the whole run.
pub struct RealFileStore {
    root: PathBuf,
    max_file_size: u64,
}

impl RealFileStore {
    /// Builds a store rooted at `root`, enforcing `max_file_size` per file.
    pub fn new(root: PathBuf, max_file_size: u64) -> Self {
        Self { root, max_file_size }
    }

    /// The repository root this store reads from.
    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl FileStore for RealFileStore {
    fn list_json_files(&self, dir: &str) -> Vec<String> {
        let mut out = Vec::new();
        walk_json_files(&self.root, &self.root.join(dir), &mut out);
        out.sort();
        out
    }

    fn read(&self, path: &str) -> Option<Vec<u8>> {
        let full = self.root.join(path);
        let metadata = std::fs::metadata(&full).ok()?;
        if metadata.len() > self.max_file_size {
            tracing::warn!(path, size = metadata.len(), limit = self.max_file_size, "file exceeds max-file-size, skipping");
            return None;
        }
        std::fs::read(&full).ok()
    }
}

fn walk_json_files(root: &Path, dir: &Path, out: &mut Vec<String>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let Ok(file_type) = entry.file_type() else {
            continue;
        };
        let name = entry.file_name();
        let name = name.to_string_lossy();

        if file_type.is_dir() {
            if name == "versions" || name.starts_with('.') {
                continue;
            }
            walk_json_files(root, &path, out);
        } else if file_type.is_file() && name.ends_with(".json") && name != "_schema.json" {
            let Ok(rel) = path.strip_prefix(root) else {
                continue;
            };
            out.push(rel.to_string_lossy().replace(std::path::MAIN_SEPARATOR, "/"));
        }
    }
}

/// Reads the single file at repo-relative `path` under `root`, mapping I/O
/// failures to a [`CliError`] with exit code 2. Used for the handful of
/// places (`VERSION`, `VERSION_OVERRIDES.json`) where a missing file is a
/// host-level problem rather than a domain diagnostic.
pub fn read_required(root: &Path, path: &str, max_file_size: u64) -> Result<Vec<u8>, CliError> {
    let full = root.join(path);
    let metadata = std::fs::metadata(&full).map_err(|e| io_error_to_cli(&e, &full))?;
    if metadata.len() > max_file_size {
        return Err(CliError::FileTooLarge { source: path.to_owned(), limit: max_file_size, actual: Some(metadata.len()) });
    }
    std::fs::read(&full).map_err(|e| io_error_to_cli(&e, &full))
}

fn io_error_to_cli(e: &std::io::Error, path: &Path) -> CliError {
    match e.kind() {
        std::io::ErrorKind::NotFound => CliError::FileNotFound { path: path.to_path_buf() },
        std::io::ErrorKind::PermissionDenied => CliError::PermissionDenied { path: path.to_path_buf() },
        _ => CliError::IoError { source: path.display().to_string(), detail: e.to_string() },
    }
}

/// Writes `bytes` to repo-relative `path` under `root` via a temp-file-then-
/// rename sequence, so a crash mid-write never leaves a half-written file.
pub fn write_atomic(root: &Path, path: &str, bytes: &[u8]) -> Result<(), CliError> {
    let full = root.join(path);
    if let Some(parent) = full.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_error_to_cli(&e, parent))?;
    }
    let tmp = full.with_extension("tmp-write");
    std::fs::write(&tmp, bytes).map_err(|e| io_error_to_cli(&e, &tmp))?;
    std::fs::rename(&tmp, &full).map_err(|e| io_error_to_cli(&e, &full))?;
    Ok(())
}

/// Removes the file at repo-relative `path` under `root`, if it exists.
pub fn remove_if_present(root: &Path, path: &str) -> Result<(), CliError> {
    let full = root.join(path);
    match std::fs::remove_file(&full) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(io_error_to_cli(&e, &full)),
    }
}

// ---------------------------------------------------------------------------
// GitVersionedStore
// ---------------------------------------------------------------------------

/// Reads a repository at a named base revision via the `git` binary.
///
/// Per the engine's resource model, a failure to invoke `git` or a non-zero
/// exit from it is treated as "no changes" rather than propagated as an
/// error: [`VersionedStore::list_changed`] returns an empty list and
/// [`VersionedStore::read_at`] returns `None`. Callers that need to
/// distinguish "nothing changed" from "git is broken" should run
/// [`check_git_available`] first.
pub struct GitVersionedStore {
    root: PathBuf,
}

impl GitVersionedStore {
    /// Builds a store that shells out to `git` rooted at `root`.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }
}

impl VersionedStore for GitVersionedStore {
    fn list_changed(&self, base: &str) -> Vec<String> {
        let Ok(output) = Command::new("git").arg("-C").arg(&self.root).arg("diff").arg("--name-only").arg(base).output() else {
            return Vec::new();
        };
        if !output.status.success() {
            return Vec::new();
        }
        String::from_utf8_lossy(&output.stdout)
            .lines()
            .filter(|line| is_known_entity_path(line))
            .map(str::to_owned)
            .collect()
    }

    fn read_at(&self, base: &str, path: &str) -> Option<Vec<u8>> {
        let spec = format!("{base}:{path}");
        let output = Command::new("git").arg("-C").arg(&self.root).arg("show").arg(&spec).output().ok()?;
        if !output.status.success() {
            return None;
        }
        Some(output.stdout)
    }
}

fn is_known_entity_path(path: &str) -> bool {
    let Some((dir, rest)) = path.split_once('/') else {
        return false;
    };
    EntityType::from_dir_name(dir).is_some() && rest.ends_with(".json") && !rest.ends_with("_schema.json")
}

/// Confirms `git` is invokable and `root` is inside a work tree.
///
/// Run this once up front in `apply-versions` so a broken `git` install
/// doesn't silently look like "no changes were made" and write zero bumps.
pub fn check_git_available(root: &Path) -> Result<(), CliError> {
    let output = Command::new("git")
        .arg("-C")
        .arg(root)
        .arg("rev-parse")
        .arg("--is-inside-work-tree")
        .output()
        .map_err(|e| CliError::GitUnavailable { detail: e.to_string() })?;
    if output.status.success() {
        Ok(())
    } else {
        Err(CliError::GitUnavailable { detail: String::from_utf8_lossy(&output.stderr).trim().to_owned() })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;

    fn temp_dir() -> tempfile::TempDir {
        tempfile::TempDir::new().expect("create temp dir")
    }

    #[test]
    fn list_json_files_finds_nested_entities() {
        let dir = temp_dir();
        std::fs::create_dir_all(dir.path().join("categories")).expect("mkdir");
        std::fs::write(dir.path().join("categories/Person.json"), b"{}").expect("write");
        std::fs::write(dir.path().join("categories/_schema.json"), b"{}").expect("write");

        let store = RealFileStore::new(dir.path().to_path_buf(), 1_000_000);
        let files = store.list_json_files("categories");
        assert_eq!(files, vec!["categories/Person.json".to_owned()]);
    }

    #[test]
    fn list_json_files_excludes_versions_subdir() {
        let dir = temp_dir();
        std::fs::create_dir_all(dir.path().join("modules/Core/versions")).expect("mkdir");
        std::fs::write(dir.path().join("modules/Core/versions/1.0.0.json"), b"{}").expect("write");

        let store = RealFileStore::new(dir.path().to_path_buf(), 1_000_000);
        assert!(store.list_json_files("modules").is_empty());
    }

    #[test]
    fn read_skips_oversized_files() {
        let dir = temp_dir();
        std::fs::write(dir.path().join("big.json"), b"0123456789").expect("write");

        let store = RealFileStore::new(dir.path().to_path_buf(), 5);
        assert_eq!(store.read("big.json"), None);
    }

    #[test]
    fn read_returns_none_for_missing_file() {
        let dir = temp_dir();
        let store = RealFileStore::new(dir.path().to_path_buf(), 1_000_000);
        assert_eq!(store.read("ghost.json"), None);
    }

    #[test]
    fn write_atomic_then_read_round_trips() {
        let dir = temp_dir();
        write_atomic(dir.path(), "VERSION", b"1.0.0").expect("write");
        let back = read_required(dir.path(), "VERSION", 1_000_000).expect("read");
        assert_eq!(back, b"1.0.0");
    }

    #[test]
    fn remove_if_present_is_fine_when_absent() {
        let dir = temp_dir();
        assert!(remove_if_present(dir.path(), "VERSION_OVERRIDES.json").is_ok());
    }

    #[test]
    fn is_known_entity_path_rejects_schema_and_unknown_dirs() {
        assert!(is_known_entity_path("categories/Person.json"));
        assert!(!is_known_entity_path("categories/_schema.json"));
        assert!(!is_known_entity_path("widgets/Thing.json"));
        assert!(!is_known_entity_path("README.md"));
    }

    #[test]
    fn git_versioned_store_degrades_to_empty_on_bad_base() {
        let dir = temp_dir();
        let store = GitVersionedStore::new(dir.path().to_path_buf());
        assert!(store.list_changed("not-a-real-revision").is_empty());
        assert!(store.read_at("not-a-real-revision", "categories/Person.json").is_none());
    }
}
