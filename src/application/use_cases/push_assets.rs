use rayon::ThreadPool;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::application::context::StoreContext;
use crate::common::cancel::CancelToken;
use crate::common::error::StoreError;
use crate::common::result::StoreResult;
use crate::domain::entities::ResolvedAssetsConfig;
use crate::domain::value_objects::TagName;
use crate::infrastructure::git::{working_tree, AssetsRepository, CommitAuthor, SnapshotStats};

/// Pushの結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    /// 作業ディレクトリが現在のタグと同一だった
    Unchanged { tag: Option<TagName> },

    /// 新しいタグを作成してリモートへ送信した
    Pushed {
        previous: Option<TagName>,
        tag: TagName,
        commit: String,
        stats: SnapshotStats,
    },
}

impl PushOutcome {
    /// Push後にポインタファイルが指すタグ
    pub fn tag(&self) -> Option<&TagName> {
        match self {
            Self::Unchanged { tag } => tag.as_ref(),
            Self::Pushed { tag, .. } => Some(tag),
        }
    }
}

/// ローカルで作成済み・未送信のスナップショット
struct PreparedSnapshot {
    tag: TagName,
    commit: git2::Oid,
    stats: SnapshotStats,
}

/// 作業ディレクトリの内容を新しいタグとして保存するユースケース
pub struct PushAssetsUseCase {
    context: Arc<StoreContext>,
}

impl PushAssetsUseCase {
    /// 新しいPushAssetsUseCaseを作成
    pub fn new(context: Arc<StoreContext>) -> Self {
        Self { context }
    }

    /// Pushを実行
    ///
    /// ポインタファイルとブレッドクラムは、リモートへの送信が成功した後にだけ
    /// 更新される。送信に失敗した場合やキャンセルされた場合はローカルのタグを削除する。
    #[instrument(skip_all, fields(assets_json = %config.assets_json.display(), tag = config.tag_str()))]
    pub async fn execute(
        &self,
        config: &ResolvedAssetsConfig,
        cancel: &CancelToken,
    ) -> StoreResult<PushOutcome> {
        let tag_prefix = config.config.tag_prefix.trim().to_string();
        if tag_prefix.is_empty() {
            return Err(StoreError::config_validation(
                "TagPrefix",
                "is required to push",
                Some(config.assets_json.clone()),
            ));
        }
        cancel.check()?;

        let clones = &self.context.clones;
        let clone_lock = clones.lock_clone(&config.clone_root).await?;
        let clone = clones.ensure_clone_locked(&config.identity, &clone_lock).await?;
        let _dir_lock = clones
            .lock_working_dir(&config.clone_root, &config.working_dir)
            .await?;

        let prepared = {
            let config = config.clone();
            let pool = self.context.pool.clone();
            let author = self.context.options.commit_author();
            let cancel = cancel.clone();
            tokio::task::spawn_blocking(move || {
                prepare_snapshot(&config, &tag_prefix, &pool, &author, &cancel)
            })
            .await??
        };

        let Some(prepared) = prepared else {
            info!("Working directory matches current tag; nothing to push");
            return Ok(PushOutcome::Unchanged {
                tag: config.tag.clone(),
            });
        };

        let pushed = match cancel.check() {
            Ok(()) => clones
                .transport()
                .push_tag(&clone.root, &clone.remote_url, &prepared.tag)
                .await
                .map_err(StoreError::from),
            Err(e) => Err(e),
        };
        if let Err(e) = pushed {
            self.discard_tag(config, &prepared.tag).await;
            return Err(e);
        }

        self.context
            .breadcrumbs
            .record_with_pointer(config, &prepared.tag)?;
        drop(clone_lock);

        info!(
            new_tag = %prepared.tag,
            files = prepared.stats.files,
            blobs_written = prepared.stats.blobs_written,
            "Pushed assets"
        );
        Ok(PushOutcome::Pushed {
            previous: config.tag.clone(),
            tag: prepared.tag,
            commit: prepared.commit.to_string(),
            stats: prepared.stats,
        })
    }

    async fn discard_tag(&self, config: &ResolvedAssetsConfig, tag: &TagName) {
        let clone_root = config.clone_root.clone();
        let tag = tag.clone();
        let result = tokio::task::spawn_blocking(move || {
            AssetsRepository::open(&clone_root)?.delete_tag(&tag)
        })
        .await;
        match result {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Failed to delete unpushed tag"),
            Err(e) => warn!(error = %e, "Failed to delete unpushed tag"),
        }
    }
}

/// Commit the working directory on top of the current tag and tag it locally.
///
/// `None` when the snapshot would not change the tree.
fn prepare_snapshot(
    config: &ResolvedAssetsConfig,
    tag_prefix: &str,
    pool: &ThreadPool,
    author: &CommitAuthor,
    cancel: &CancelToken,
) -> StoreResult<Option<PreparedSnapshot>> {
    let repo = AssetsRepository::open(&config.clone_root)?;

    let parent = match &config.tag {
        Some(tag) => Some(
            repo.resolve_tag(tag)?
                .ok_or_else(|| StoreError::tag_not_found(tag.as_str(), config.identity.to_string()))?,
        ),
        None => None,
    };
    let base_tree = parent.map(|commit| repo.commit_tree(commit)).transpose()?;

    let (files, stats) = working_tree::snapshot(&repo, pool, &config.working_dir, cancel)?;
    let subtree = repo.build_tree(&files)?;
    if base_tree.is_none() && subtree.is_none() {
        return Ok(None);
    }

    let root = repo.replace_subtree(base_tree, &config.prefix, subtree)?;
    if Some(root) == base_tree {
        return Ok(None);
    }

    cancel.check()?;
    let message = format!(
        "Update {} ({} files)",
        if config.prefix.is_root() {
            "/".to_string()
        } else {
            config.prefix.to_string()
        },
        stats.files
    );
    let commit = repo.commit_snapshot(parent, root, &message, author)?;
    let tag = TagName::derive(tag_prefix, &commit.to_string()).map_err(|e| {
        StoreError::config_validation("TagPrefix", e.to_string(), Some(config.assets_json.clone()))
    })?;
    repo.create_tag(&tag, commit)?;

    Ok(Some(PreparedSnapshot {
        tag,
        commit,
        stats,
    }))
}
