use tracing::{debug, error, warn};

use crate::common::error::{BreadcrumbMismatch, StoreError};
use crate::common::result::StoreResult;
use crate::domain::entities::{Breadcrumb, ResolvedAssetsConfig};
use crate::domain::value_objects::TagName;
use crate::infrastructure::filesystem::{BreadcrumbStore, PointerStore};

/// ポインタファイルとブレッドクラムの対応を記録・検証するサービス
#[derive(Debug, Clone, Default)]
pub struct BreadcrumbTracker {
    store: BreadcrumbStore,
    pointers: PointerStore,
}

impl BreadcrumbTracker {
    /// 新しいBreadcrumbTrackerを作成
    pub fn new() -> Self {
        Self::default()
    }

    /// ポインタファイルが現在 `tag` を反映していることを記録
    pub fn record(&self, config: &ResolvedAssetsConfig, tag: &str) -> StoreResult<()> {
        let breadcrumb = Breadcrumb::new(&config.assets_json, &config.clone_root, tag);
        self.store.stage(&config.assets_root, &breadcrumb)?.commit()?;
        debug!(assets_json = %config.assets_json.display(), tag, "Recorded breadcrumb");
        Ok(())
    }

    /// ポインタファイルの `Tag` とブレッドクラムを同時に更新
    ///
    /// 両方を書き出してから順に置き換え、ブレッドクラムの置き換えに失敗した
    /// 場合はポインタファイルを元に戻す。
    pub fn record_with_pointer(&self, config: &ResolvedAssetsConfig, tag: &TagName) -> StoreResult<()> {
        let pointer = self.pointers.stage_tag(&config.assets_json, tag.as_str())?;
        let breadcrumb = Breadcrumb::new(&config.assets_json, &config.clone_root, tag.as_str());
        let crumb = self.store.stage(&config.assets_root, &breadcrumb)?;

        let committed_pointer = pointer.commit()?;
        if let Err(e) = crumb.commit() {
            if let Err(rollback) = committed_pointer.rollback() {
                error!(
                    assets_json = %config.assets_json.display(),
                    error = %rollback,
                    "Failed to roll back pointer file"
                );
            }
            return Err(e);
        }

        debug!(assets_json = %config.assets_json.display(), tag = %tag, "Updated pointer and breadcrumb");
        Ok(())
    }

    /// 記録済みのブレッドクラムを取得
    pub fn read(&self, config: &ResolvedAssetsConfig) -> StoreResult<Option<Breadcrumb>> {
        self.store.read(&config.assets_root, &config.assets_json)
    }

    /// 各ポインタファイルの `Tag` がブレッドクラムと一致するか検証
    ///
    /// 一致しないもの（ブレッドクラムがないものを含む）をすべて集めて
    /// `Consistency` エラーとして返す。
    pub fn check_consistency(&self, configs: &[ResolvedAssetsConfig]) -> StoreResult<()> {
        let mut mismatches = Vec::new();
        for config in configs {
            let pointer_tag = config.config.tag.trim().to_string();
            match self.read(config)? {
                Some(breadcrumb) if breadcrumb.matches_tag(&pointer_tag) => {}
                Some(breadcrumb) => mismatches.push(BreadcrumbMismatch {
                    assets_json: config.assets_json.clone(),
                    pointer_tag,
                    breadcrumb_tag: Some(breadcrumb.tag),
                }),
                None => mismatches.push(BreadcrumbMismatch {
                    assets_json: config.assets_json.clone(),
                    pointer_tag,
                    breadcrumb_tag: None,
                }),
            }
        }

        if mismatches.is_empty() {
            return Ok(());
        }
        for mismatch in &mismatches {
            warn!("{}", mismatch);
        }
        Err(StoreError::consistency(mismatches))
    }
}
