use git2::{ObjectType, Oid};
use rayon::prelude::*;
use rayon::ThreadPool;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::common::cancel::CancelToken;
use crate::common::error::StoreError;
use crate::common::result::{ResultExt, StoreResult};
use crate::domain::entities::TreeDiff;
use crate::infrastructure::git::repository::{AssetsRepository, TreeFile};

const GIT_DIR: &str = ".git";

/// A regular file found in a working directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingFile {
    /// `/` separated path relative to the working directory
    pub path: String,
    pub absolute: PathBuf,
    pub executable: bool,
}

/// Counters reported by [`export_tree`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportStats {
    pub written: usize,
    pub removed: usize,
    pub unchanged: usize,
}

/// Counters reported by [`snapshot`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapshotStats {
    pub files: usize,
    pub blobs_written: usize,
}

#[cfg(unix)]
fn is_executable(metadata: &fs::Metadata) -> bool {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o111 != 0
}

#[cfg(not(unix))]
fn is_executable(_metadata: &fs::Metadata) -> bool {
    false
}

#[cfg(unix)]
fn apply_mode(file: &fs::File, executable: bool) -> std::io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mode = if executable { 0o755 } else { 0o644 };
    file.set_permissions(fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn apply_mode(_file: &fs::File, _executable: bool) -> std::io::Result<()> {
    Ok(())
}

fn relative_git_path(root: &Path, path: &Path) -> Option<String> {
    let relative = pathdiff::diff_paths(path, root)?;
    let parts: Option<Vec<&str>> = relative.components().map(|c| c.as_os_str().to_str()).collect();
    parts.map(|parts| parts.join("/"))
}

/// Everything found in a working directory
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorkingScan {
    /// Regular files with UTF-8 paths, sorted by path
    pub files: Vec<WorkingFile>,

    /// Entries a tree cannot hold: symlinks, special files and non UTF-8
    /// paths. Symlinks are never followed.
    pub extras: Vec<PathBuf>,
}

impl WorkingScan {
    /// Lossy `/` separated paths of the extras, for reporting
    pub fn extra_paths(&self, root: &Path) -> Vec<String> {
        self.extras
            .iter()
            .map(|path| {
                let relative = path.strip_prefix(root).unwrap_or(path);
                relative
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/")
            })
            .collect()
    }
}

/// Walk `dir` without following links, skipping `.git` directories.
///
/// A missing directory is an empty working tree.
pub fn scan(dir: &Path) -> StoreResult<WorkingScan> {
    let mut result = WorkingScan::default();
    if !dir.exists() {
        return Ok(result);
    }

    let walker = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || entry.file_name() != GIT_DIR);

    for entry in walker {
        let entry = entry.map_err(|e| {
            let path = e.path().map(Path::to_path_buf);
            StoreError::filesystem_error(format!("Failed to walk working directory: {}", e), path)
        })?;
        let file_type = entry.file_type();
        if file_type.is_dir() {
            continue;
        }

        let path = if file_type.is_file() {
            relative_git_path(dir, entry.path())
        } else {
            None
        };
        let Some(path) = path else {
            debug!(path = %entry.path().display(), "Found entry that cannot be stored in a tree");
            result.extras.push(entry.path().to_path_buf());
            continue;
        };

        let metadata = entry
            .metadata()
            .map_err(|e| StoreError::filesystem_error(e.to_string(), Some(entry.path().to_path_buf())))?;
        result.files.push(WorkingFile {
            path,
            absolute: entry.path().to_path_buf(),
            executable: is_executable(&metadata),
        });
    }

    result.files.sort_by(|a, b| a.path.cmp(&b.path));
    result.extras.sort();
    Ok(result)
}

/// Remove a file or a link without following it
fn remove_entry(path: &Path) -> StoreResult<()> {
    fs::remove_file(path)
        .or_else(|e| {
            // Directory symlinks on Windows are removed as directories.
            match fs::symlink_metadata(path) {
                Ok(metadata) if metadata.file_type().is_symlink() => fs::remove_dir(path),
                _ => Err(e),
            }
        })
        .with_filesystem_error("Failed to remove file", Some(path.to_path_buf()))
}

/// Blob id of every file, computed on `pool`
pub fn hash_files(
    pool: &ThreadPool,
    files: &[WorkingFile],
    cancel: &CancelToken,
) -> StoreResult<Vec<Oid>> {
    pool.install(|| {
        files
            .par_iter()
            .map(|file| {
                cancel.check()?;
                Oid::hash_file(ObjectType::Blob, &file.absolute).map_err(|e| {
                    StoreError::filesystem_error(
                        format!("Failed to hash file: {}", e.message()),
                        Some(file.absolute.clone()),
                    )
                })
            })
            .collect()
    })
}

/// Differences between `dir` and the target tree listing
pub fn diff(
    pool: &ThreadPool,
    target: &[TreeFile],
    dir: &Path,
    cancel: &CancelToken,
) -> StoreResult<TreeDiff> {
    let working = scan(dir)?;
    let hashes = hash_files(pool, &working.files, cancel)?;
    let expected: HashMap<&str, &TreeFile> = target.iter().map(|f| (f.path.as_str(), f)).collect();

    let mut result = TreeDiff {
        added: working.extra_paths(dir),
        ..TreeDiff::default()
    };
    let mut seen = HashSet::new();
    for (file, oid) in working.files.iter().zip(hashes) {
        seen.insert(file.path.as_str());
        match expected.get(file.path.as_str()) {
            None => result.added.push(file.path.clone()),
            Some(entry) if !same_content(entry, oid, file.executable) => {
                result.modified.push(file.path.clone())
            }
            Some(_) => {}
        }
    }
    for entry in target {
        if !seen.contains(entry.path.as_str()) {
            result.removed.push(entry.path.clone());
        }
    }
    Ok(result.sorted())
}

fn same_content(entry: &TreeFile, oid: Oid, executable: bool) -> bool {
    entry.oid == oid && (!cfg!(unix) || entry.executable == executable)
}

/// Make `dir` contain exactly the files of `target`.
///
/// Files already matching their blob are left alone; everything else is
/// written through a temp file in the destination directory and renamed
/// into place. Files not in `target` are removed, as are symlinks and
/// anything else a tree cannot hold, and empty directories are pruned.
/// `dir` itself is created if needed and never removed.
pub fn export_tree(
    repo: &AssetsRepository,
    pool: &ThreadPool,
    target: &[TreeFile],
    dir: &Path,
    cancel: &CancelToken,
) -> StoreResult<ExportStats> {
    fs::create_dir_all(dir)
        .with_filesystem_error("Failed to create working directory", Some(dir.to_path_buf()))?;

    let working = scan(dir)?;
    let hashes = hash_files(pool, &working.files, cancel)?;
    let expected: HashMap<&str, &TreeFile> = target.iter().map(|f| (f.path.as_str(), f)).collect();

    let mut stats = ExportStats::default();
    for extra in &working.extras {
        cancel.check()?;
        remove_entry(extra)?;
        stats.removed += 1;
    }

    let mut current = HashMap::new();
    for (file, oid) in working.files.iter().zip(hashes) {
        cancel.check()?;
        if expected.contains_key(file.path.as_str()) {
            current.insert(file.path.as_str(), (oid, file.executable));
        } else {
            remove_entry(&file.absolute)?;
            stats.removed += 1;
        }
    }
    prune_empty_dirs(dir)?;

    for entry in target {
        cancel.check()?;
        if let Some((oid, executable)) = current.get(entry.path.as_str()) {
            if same_content(entry, *oid, *executable) {
                stats.unchanged += 1;
                continue;
            }
        }
        write_file(repo, entry, dir)?;
        stats.written += 1;
    }

    debug!(
        dir = %dir.display(),
        written = stats.written,
        removed = stats.removed,
        unchanged = stats.unchanged,
        "Exported tree"
    );
    Ok(stats)
}

fn write_file(repo: &AssetsRepository, entry: &TreeFile, root: &Path) -> StoreResult<()> {
    let mut destination = root.to_path_buf();
    for part in entry.path.split('/') {
        destination.push(part);
    }
    let parent = destination
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| root.to_path_buf());

    clear_file_ancestors(root, &parent)?;
    fs::create_dir_all(&parent)
        .with_filesystem_error("Failed to create directory", Some(parent.clone()))?;
    if let Ok(metadata) = fs::symlink_metadata(&destination) {
        if metadata.is_dir() {
            fs::remove_dir_all(&destination)
                .with_filesystem_error("Failed to replace directory", Some(destination.clone()))?;
        } else if metadata.file_type().is_symlink() {
            remove_entry(&destination)?;
        }
    }

    let mut temp = NamedTempFile::new_in(&parent)
        .with_filesystem_error("Failed to create temp file", Some(parent.clone()))?;
    repo.write_blob_to(entry.oid, temp.as_file_mut())?;
    apply_mode(temp.as_file(), entry.executable)
        .with_filesystem_error("Failed to set file mode", Some(destination.clone()))?;
    temp.persist(&destination).map_err(|e| {
        StoreError::filesystem_error_with_source(
            "Failed to move file into place",
            Some(destination.clone()),
            e.error,
        )
    })?;
    Ok(())
}

/// Remove files and symlinks that sit where a directory is needed.
///
/// Links are inspected, never followed, so nothing is written outside `root`.
fn clear_file_ancestors(root: &Path, parent: &Path) -> StoreResult<()> {
    let Ok(relative) = parent.strip_prefix(root) else {
        return Ok(());
    };
    let mut current = root.to_path_buf();
    for component in relative.components() {
        current.push(component);
        match fs::symlink_metadata(&current) {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => remove_entry(&current)?,
            Err(_) => break,
        }
    }
    Ok(())
}

/// Remove empty directories below `dir`, deepest first
fn prune_empty_dirs(dir: &Path) -> StoreResult<()> {
    let walker = WalkDir::new(dir)
        .min_depth(1)
        .contents_first(true)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| entry.file_name() != GIT_DIR);

    for entry in walker.filter_map(Result::ok) {
        if !entry.file_type().is_dir() {
            continue;
        }
        let is_empty = fs::read_dir(entry.path())
            .map(|mut entries| entries.next().is_none())
            .unwrap_or(false);
        if is_empty {
            fs::remove_dir(entry.path())
                .with_filesystem_error("Failed to prune directory", Some(entry.path().to_path_buf()))?;
        }
    }
    Ok(())
}

/// Store the working directory's files as blobs and return the tree listing.
///
/// Files are hashed in parallel; only blobs missing from the object database
/// are streamed in.
pub fn snapshot(
    repo: &AssetsRepository,
    pool: &ThreadPool,
    dir: &Path,
    cancel: &CancelToken,
) -> StoreResult<(Vec<TreeFile>, SnapshotStats)> {
    let working = scan(dir)?;
    for extra in &working.extras {
        warn!(path = %extra.display(), "Leaving out entry that cannot be stored in a tree");
    }
    let hashes = hash_files(pool, &working.files, cancel)?;

    let mut stats = SnapshotStats {
        files: working.files.len(),
        ..SnapshotStats::default()
    };
    let mut files = Vec::with_capacity(working.files.len());
    for (file, oid) in working.files.into_iter().zip(hashes) {
        cancel.check()?;
        if !repo.contains_blob(oid)? {
            let written = repo.write_blob_from_file(&file.absolute)?;
            if written != oid {
                return Err(StoreError::filesystem_error(
                    "File changed while taking the snapshot",
                    Some(file.absolute),
                ));
            }
            stats.blobs_written += 1;
        }
        files.push(TreeFile {
            path: file.path,
            oid,
            executable: file.executable,
        });
    }

    debug!(
        dir = %dir.display(),
        files = stats.files,
        blobs_written = stats.blobs_written,
        "Snapshot taken"
    );
    Ok((files, stats))
}
