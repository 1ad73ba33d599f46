use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::common::error::StoreError;
use crate::common::result::StoreResult;
use crate::domain::value_objects::RepoIdentity;
use crate::infrastructure::clone::lock::{LockRegistry, PathLock};
use crate::infrastructure::git::{AssetsRepository, RemoteTransport};

/// Directory inside a clone's `.git` holding working directory lock files
const WORKING_DIR_LOCKS: &str = "assets-store-locks";

/// Lock file for `working_dir`, kept where no working tree scan can see it
pub fn working_dir_lock_path(clone_root: &Path, working_dir: &Path) -> PathBuf {
    let digest = hex::encode(Sha256::digest(working_dir.to_string_lossy().as_bytes()));
    clone_root
        .join(".git")
        .join(WORKING_DIR_LOCKS)
        .join(format!("{}.lock", &digest[..16]))
}

/// A local clone that is ready for use
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalClone {
    pub identity: RepoIdentity,
    pub root: PathBuf,
    pub remote_url: String,
    /// Whether this call created the clone
    pub created: bool,
}

/// Owns the local clones under one assets root.
///
/// One clone exists per `(AssetsRepo, AssetsRepoId)`. Mutations of a clone
/// happen under [`CloneManager::lock_clone`]; the lock is scoped to the clone
/// path, so unrelated repositories never wait on each other. Working
/// directories get their own lock via [`CloneManager::lock_working_dir`],
/// which also holds against other processes.
pub struct CloneManager {
    transport: Arc<dyn RemoteTransport>,
    remote_base: String,
    clone_locks: LockRegistry,
    dir_locks: LockRegistry,
    closed: AtomicBool,
}

impl std::fmt::Debug for CloneManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloneManager")
            .field("remote_base", &self.remote_base)
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl CloneManager {
    pub fn new(transport: Arc<dyn RemoteTransport>, remote_base: impl Into<String>) -> Self {
        Self {
            transport,
            remote_base: remote_base.into(),
            clone_locks: LockRegistry::new(),
            dir_locks: LockRegistry::new(),
            closed: AtomicBool::new(false),
        }
    }

    pub fn transport(&self) -> &Arc<dyn RemoteTransport> {
        &self.transport
    }

    pub fn remote_base(&self) -> &str {
        &self.remote_base
    }

    /// Remote URL (or local path) for an identity
    pub fn remote_url(&self, identity: &RepoIdentity) -> StoreResult<String> {
        identity
            .remote_location(&self.remote_base)
            .map_err(|e| StoreError::config_validation("AssetsRepo", e.to_string(), None))
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.is_closed() {
            return Err(StoreError::internal_error("Clone manager has been closed"));
        }
        Ok(())
    }

    /// Serialize mutations of the clone at `clone_root`
    pub async fn lock_clone(&self, clone_root: &Path) -> StoreResult<PathLock> {
        self.ensure_open()?;
        self.clone_locks.lock_shared_path(clone_root).await
    }

    /// Serialize readers and writers of one working directory.
    ///
    /// The clone at `clone_root` must already exist.
    pub async fn lock_working_dir(
        &self,
        clone_root: &Path,
        working_dir: &Path,
    ) -> StoreResult<PathLock> {
        self.ensure_open()?;
        self.dir_locks
            .lock_with_file(working_dir, working_dir_lock_path(clone_root, working_dir))
            .await
    }

    /// Create the clone on first use, otherwise bring its tags up to date.
    ///
    /// Takes and releases the clone lock itself.
    pub async fn ensure_clone(
        &self,
        identity: &RepoIdentity,
        clone_root: &Path,
    ) -> StoreResult<LocalClone> {
        let lock = self.lock_clone(clone_root).await?;
        self.ensure_clone_locked(identity, &lock).await
    }

    /// [`CloneManager::ensure_clone`] for a caller already holding the clone lock
    #[instrument(skip_all, fields(repo = %identity, clone = %lock.path().display()))]
    pub async fn ensure_clone_locked(
        &self,
        identity: &RepoIdentity,
        lock: &PathLock,
    ) -> StoreResult<LocalClone> {
        self.ensure_open()?;
        let root = lock.path().to_path_buf();
        let remote_url = self.remote_url(identity)?;

        let created = {
            let root = root.clone();
            let remote_url = remote_url.clone();
            tokio::task::spawn_blocking(move || -> StoreResult<bool> {
                if root.join(".git").exists() {
                    AssetsRepository::open(&root)?.ensure_origin(&remote_url)?;
                    Ok(false)
                } else {
                    AssetsRepository::init(&root, &remote_url)?;
                    Ok(true)
                }
            })
            .await??
        };

        self.transport.fetch_tags(&root, &remote_url).await?;

        if created {
            info!(remote = %remote_url, "Created clone");
        } else {
            debug!(remote = %remote_url, "Refreshed clone tags");
        }

        Ok(LocalClone {
            identity: identity.clone(),
            root,
            remote_url,
            created,
        })
    }

    /// Stop handing out locks and forget idle lock entries
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.clone_locks.clear();
        self.dir_locks.clear();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Drop for CloneManager {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::TagName;
    use crate::infrastructure::git::TransportError;
    use async_trait::async_trait;
    use std::sync::atomic::AtomicUsize;
    use tempfile::TempDir;

    #[derive(Default)]
    struct CountingTransport {
        fetches: AtomicUsize,
        fail: bool,
    }

    #[async_trait]
    impl RemoteTransport for CountingTransport {
        async fn fetch_tags(&self, _clone: &Path, url: &str) -> Result<(), TransportError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(TransportError::network("connection refused", url));
            }
            Ok(())
        }

        async fn push_tag(&self, _clone: &Path, _url: &str, _tag: &TagName) -> Result<(), TransportError> {
            Ok(())
        }
    }

    fn identity() -> RepoIdentity {
        RepoIdentity::new("owner/assets", "").unwrap()
    }

    #[tokio::test]
    async fn test_ensure_clone_is_idempotent() {
        let temp = TempDir::new().unwrap();
        let transport = Arc::new(CountingTransport::default());
        let manager = CloneManager::new(transport.clone(), "https://example.com/");
        let root = temp.path().join(identity().clone_key());

        let first = manager.ensure_clone(&identity(), &root).await.unwrap();
        assert!(first.created);
        assert_eq!(first.remote_url, "https://example.com/owner/assets.git");
        assert!(root.join(".git").exists());

        let second = manager.ensure_clone(&identity(), &root).await.unwrap();
        assert!(!second.created);
        assert_eq!(transport.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_transient() {
        let temp = TempDir::new().unwrap();
        let transport = Arc::new(CountingTransport {
            fail: true,
            ..CountingTransport::default()
        });
        let manager = CloneManager::new(transport, "https://example.com/");

        let error = manager
            .ensure_clone(&identity(), &temp.path().join("clone"))
            .await
            .unwrap_err();
        assert!(error.is_transient());
    }

    #[tokio::test]
    async fn test_closed_manager_refuses_work() {
        let temp = TempDir::new().unwrap();
        let manager = CloneManager::new(Arc::new(CountingTransport::default()), "https://example.com/");
        manager.close();
        assert!(manager.is_closed());

        let result = manager.ensure_clone(&identity(), &temp.path().join("clone")).await;
        assert!(matches!(result, Err(StoreError::Internal { .. })));
    }

    #[tokio::test]
    async fn test_working_dir_lock_holds_across_managers() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("clone");
        let working_dir = root.join("python").join("storage");
        let first = CloneManager::new(Arc::new(CountingTransport::default()), "https://example.com/");
        let second = Arc::new(CloneManager::new(
            Arc::new(CountingTransport::default()),
            "https://example.com/",
        ));

        let held = first.lock_working_dir(&root, &working_dir).await.unwrap();
        let lock_file = working_dir_lock_path(&root, &working_dir);
        assert!(lock_file.starts_with(root.join(".git")));
        assert!(lock_file.is_file());

        let contender = {
            let second = second.clone();
            let root = root.clone();
            let working_dir = working_dir.clone();
            tokio::spawn(async move {
                second.lock_working_dir(&root, &working_dir).await.map(|_| ())
            })
        };
        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        assert!(!contender.is_finished());

        drop(held);
        contender.await.unwrap().unwrap();
    }
}
