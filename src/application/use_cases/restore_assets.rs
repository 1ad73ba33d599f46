use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::application::context::StoreContext;
use crate::common::cancel::CancelToken;
use crate::common::result::StoreResult;
use crate::domain::entities::ResolvedAssetsConfig;
use crate::domain::value_objects::TagName;
use crate::infrastructure::git::ExportStats;

/// Restoreの結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreOutcome {
    /// 展開したタグ（タグ未設定ならNone）
    pub tag: Option<TagName>,

    /// 展開先の作業ディレクトリ
    pub working_dir: PathBuf,

    /// 書き込み・削除・変更なしのファイル数
    pub stats: ExportStats,
}

/// タグのツリーを作業ディレクトリへ展開するユースケース
pub struct RestoreAssetsUseCase {
    context: Arc<StoreContext>,
}

impl RestoreAssetsUseCase {
    /// 新しいRestoreAssetsUseCaseを作成
    pub fn new(context: Arc<StoreContext>) -> Self {
        Self { context }
    }

    /// Restoreを実行
    ///
    /// 作業ディレクトリをタグのツリーと完全に一致させる。
    /// タグが空の場合は空のツリーとして扱い、空の作業ディレクトリを残す。
    #[instrument(skip_all, fields(assets_json = %config.assets_json.display(), tag = config.tag_str()))]
    pub async fn execute(
        &self,
        config: &ResolvedAssetsConfig,
        cancel: &CancelToken,
    ) -> StoreResult<RestoreOutcome> {
        let target = Arc::new(self.context.target_files(config, cancel).await?);

        let _dir_lock = self
            .context
            .clones
            .lock_working_dir(&config.clone_root, &config.working_dir)
            .await?;
        let stats = self.context.export(config, target, cancel).await?;

        cancel.check()?;
        self.context.breadcrumbs.record(config, config.tag_str())?;

        info!(
            working_dir = %config.working_dir.display(),
            written = stats.written,
            removed = stats.removed,
            unchanged = stats.unchanged,
            "Restored assets"
        );
        Ok(RestoreOutcome {
            tag: config.tag.clone(),
            working_dir: config.working_dir.clone(),
            stats,
        })
    }
}
