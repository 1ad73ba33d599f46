use std::sync::Arc;
use tracing::{debug, info, instrument};

use crate::application::context::StoreContext;
use crate::common::cancel::CancelToken;
use crate::common::result::StoreResult;
use crate::domain::entities::{ResolvedAssetsConfig, TreeDiff};
use crate::infrastructure::git::ExportStats;

/// 確認プロンプトに列挙するファイル数の上限
const PROMPT_FILE_LIMIT: usize = 20;

/// Resetの結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResetOutcome {
    /// 差分がなかった（確認なし）
    Clean,

    /// 確認の上、タグのツリーに戻した
    Reverted { diff: TreeDiff, stats: ExportStats },

    /// 確認で拒否された（作業ディレクトリは変更なし）
    Declined { diff: TreeDiff },
}

impl ResetOutcome {
    /// 作業ディレクトリを変更したか
    pub fn is_reverted(&self) -> bool {
        matches!(self, Self::Reverted { .. })
    }
}

/// 作業ディレクトリの変更を破棄してタグのツリーに戻すユースケース
pub struct ResetAssetsUseCase {
    context: Arc<StoreContext>,
}

impl ResetAssetsUseCase {
    /// 新しいResetAssetsUseCaseを作成
    pub fn new(context: Arc<StoreContext>) -> Self {
        Self { context }
    }

    /// 作業ディレクトリとタグのツリーとの差分
    #[instrument(skip_all, fields(assets_json = %config.assets_json.display()))]
    pub async fn status(
        &self,
        config: &ResolvedAssetsConfig,
        cancel: &CancelToken,
    ) -> StoreResult<TreeDiff> {
        let target = Arc::new(self.context.target_files(config, cancel).await?);
        let _dir_lock = self
            .context
            .clones
            .lock_working_dir(&config.clone_root, &config.working_dir)
            .await?;
        self.context.working_diff(config, target, cancel).await
    }

    /// Resetを実行
    #[instrument(skip_all, fields(assets_json = %config.assets_json.display(), tag = config.tag_str()))]
    pub async fn execute(
        &self,
        config: &ResolvedAssetsConfig,
        cancel: &CancelToken,
    ) -> StoreResult<ResetOutcome> {
        let target = Arc::new(self.context.target_files(config, cancel).await?);
        let _dir_lock = self
            .context
            .clones
            .lock_working_dir(&config.clone_root, &config.working_dir)
            .await?;

        let diff = self
            .context
            .working_diff(config, target.clone(), cancel)
            .await?;
        if diff.is_empty() {
            debug!("Working directory already matches tag");
            return Ok(ResetOutcome::Clean);
        }

        let prompt = build_prompt(config, &diff);
        let confirmation = self.context.confirmation.clone();
        let confirmed = tokio::task::spawn_blocking(move || confirmation.ask(&prompt)).await?;
        if !confirmed {
            info!(changes = diff.len(), "Reset declined");
            return Ok(ResetOutcome::Declined { diff });
        }

        cancel.check()?;
        let stats = self.context.export(config, target, cancel).await?;
        self.context.breadcrumbs.record(config, config.tag_str())?;

        info!(changes = diff.len(), "Reset working directory");
        Ok(ResetOutcome::Reverted { diff, stats })
    }
}

fn build_prompt(config: &ResolvedAssetsConfig, diff: &TreeDiff) -> String {
    let tag = if config.tag_str().is_empty() {
        "<no tag>"
    } else {
        config.tag_str()
    };
    format!(
        "Discard local changes in {} and reset to '{}'? ({})\n{}",
        config.working_dir.display(),
        tag,
        diff.summary(),
        diff.describe(PROMPT_FILE_LIMIT)
    )
}
