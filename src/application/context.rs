use rayon::ThreadPool;
use std::sync::Arc;
use tracing::debug;

use crate::application::services::{BreadcrumbTracker, ConfigurationLoader, ConfirmationProvider};
use crate::application::store_options::StoreOptions;
use crate::common::cancel::CancelToken;
use crate::common::error::StoreError;
use crate::common::result::StoreResult;
use crate::domain::entities::{ResolvedAssetsConfig, TreeDiff};
use crate::infrastructure::clone::CloneManager;
use crate::infrastructure::git::{working_tree, AssetsRepository, TreeFile};

/// Collaborators shared by every operation of one store
pub struct StoreContext {
    pub options: StoreOptions,
    pub loader: ConfigurationLoader,
    pub clones: Arc<CloneManager>,
    pub breadcrumbs: BreadcrumbTracker,
    pub confirmation: Arc<dyn ConfirmationProvider>,
    pub pool: Arc<ThreadPool>,
}

impl StoreContext {
    /// Files of the pointer's tag below its prefix, after bringing the clone up to date.
    ///
    /// Empty when the pointer has no tag yet. The clone lock is only held
    /// while fetching and resolving.
    pub async fn target_files(
        &self,
        config: &ResolvedAssetsConfig,
        cancel: &CancelToken,
    ) -> StoreResult<Vec<TreeFile>> {
        cancel.check()?;
        let lock = self.clones.lock_clone(&config.clone_root).await?;
        self.clones.ensure_clone_locked(&config.identity, &lock).await?;
        cancel.check()?;

        let Some(tag) = config.tag.clone() else {
            return Ok(Vec::new());
        };
        let clone_root = config.clone_root.clone();
        let prefix = config.prefix.clone();
        let repo_name = config.identity.to_string();

        let files = tokio::task::spawn_blocking(move || -> StoreResult<Vec<TreeFile>> {
            let repo = AssetsRepository::open(&clone_root)?;
            let commit = repo
                .resolve_tag(&tag)?
                .ok_or_else(|| StoreError::tag_not_found(tag.as_str(), repo_name))?;
            repo.list_files(commit, &prefix)
        })
        .await??;
        drop(lock);

        debug!(files = files.len(), tag = config.tag_str(), "Resolved target tree");
        Ok(files)
    }

    /// Differences between the working directory and `target`
    pub async fn working_diff(
        &self,
        config: &ResolvedAssetsConfig,
        target: Arc<Vec<TreeFile>>,
        cancel: &CancelToken,
    ) -> StoreResult<TreeDiff> {
        let pool = self.pool.clone();
        let dir = config.working_dir.clone();
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || working_tree::diff(&pool, &target, &dir, &cancel)).await?
    }

    /// Make the working directory match `target` exactly
    pub async fn export(
        &self,
        config: &ResolvedAssetsConfig,
        target: Arc<Vec<TreeFile>>,
        cancel: &CancelToken,
    ) -> StoreResult<working_tree::ExportStats> {
        let pool = self.pool.clone();
        let clone_root = config.clone_root.clone();
        let dir = config.working_dir.clone();
        let cancel = cancel.clone();
        tokio::task::spawn_blocking(move || {
            let repo = AssetsRepository::open(&clone_root)?;
            working_tree::export_tree(&repo, &pool, &target, &dir, &cancel)
        })
        .await?
    }
}
