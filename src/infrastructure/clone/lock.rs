use fs4::FileExt;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

use crate::common::result::{ResultExt, StoreResult};

/// Exclusive hold on a path, released on drop.
///
/// Combines an in-process async mutex with an OS file lock so that both
/// tasks in this process and other processes are kept out.
#[derive(Debug)]
pub struct PathLock {
    path: PathBuf,
    _file: File,
    _local: OwnedMutexGuard<()>,
}

impl PathLock {
    /// Path this lock guards
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Lock file that sits next to `path` (`<path>.lock`)
pub fn lock_file_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".lock");
    path.with_file_name(name)
}

fn acquire_file_lock(lock_path: &Path) -> StoreResult<File> {
    if let Some(parent) = lock_path.parent() {
        fs::create_dir_all(parent)
            .with_filesystem_error("Failed to create lock directory", Some(parent.to_path_buf()))?;
    }
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(lock_path)
        .with_filesystem_error("Failed to open lock file", Some(lock_path.to_path_buf()))?;
    file.lock_exclusive()
        .with_filesystem_error("Failed to lock", Some(lock_path.to_path_buf()))?;
    Ok(file)
}

/// Per-path locks shared by everything holding the same registry
#[derive(Debug, Default)]
pub struct LockRegistry {
    locks: Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>,
}

impl LockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn entry(&self, path: &Path) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        locks
            .entry(path.to_path_buf())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Lock `path` against other tasks and other processes
    pub async fn lock_shared_path(&self, path: &Path) -> StoreResult<PathLock> {
        self.lock_with_file(path, lock_file_path(path)).await
    }

    /// Like [`LockRegistry::lock_shared_path`], with the OS lock taken on `lock_path`
    pub async fn lock_with_file(&self, path: &Path, lock_path: PathBuf) -> StoreResult<PathLock> {
        let local = self.entry(path).lock_owned().await;
        let file = tokio::task::spawn_blocking(move || acquire_file_lock(&lock_path)).await??;
        debug!(path = %path.display(), "Acquired lock");
        Ok(PathLock {
            path: path.to_path_buf(),
            _file: file,
            _local: local,
        })
    }

    /// Drop every lock entry not currently held
    pub fn clear(&self) {
        let mut locks = self.locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    }

    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_lock_file_is_a_sibling() {
        assert_eq!(
            lock_file_path(Path::new("/tmp/.assets/abc123")),
            PathBuf::from("/tmp/.assets/abc123.lock")
        );
    }

    #[tokio::test]
    async fn test_same_path_is_exclusive() {
        let temp = TempDir::new().unwrap();
        let registry = Arc::new(LockRegistry::new());
        let path = temp.path().join("clone");

        let first = registry.lock_shared_path(&path).await.unwrap();
        assert_eq!(first.path(), path.as_path());

        let contender = {
            let registry = registry.clone();
            let path = path.clone();
            tokio::spawn(async move { registry.lock_shared_path(&path).await.map(|_| ()) })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!contender.is_finished());

        drop(first);
        contender.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_different_paths_do_not_block() {
        let temp = TempDir::new().unwrap();
        let registry = LockRegistry::new();
        let _a = registry.lock_shared_path(&temp.path().join("a")).await.unwrap();
        let _b = registry.lock_shared_path(&temp.path().join("b")).await.unwrap();
        let _c = registry
            .lock_with_file(&temp.path().join("c"), temp.path().join("locks/c.lock"))
            .await
            .unwrap();
        assert!(temp.path().join("locks/c.lock").is_file());
        assert_eq!(registry.len(), 3);
    }

    #[tokio::test]
    async fn test_clear_keeps_held_locks() {
        let temp = TempDir::new().unwrap();
        let registry = LockRegistry::new();
        let held = registry.lock_shared_path(&temp.path().join("held")).await.unwrap();
        drop(registry.lock_shared_path(&temp.path().join("released")).await.unwrap());

        registry.clear();
        assert_eq!(registry.len(), 1);
        drop(held);
        registry.clear();
        assert!(registry.is_empty());
    }
}
