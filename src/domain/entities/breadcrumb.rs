use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// ポインタファイルとクローン・タグの対応記録
///
/// Restore/Push が成功するたびに更新され、ポインタファイルの `Tag` と
/// 食い違っていれば整合性の破れとして検出される。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breadcrumb {
    /// ポインタファイルの絶対パス
    pub assets_json: PathBuf,

    /// 対応するローカルクローン
    pub clone_path: PathBuf,

    /// 最後に記録されたタグ（空文字はスナップショットなし）
    pub tag: String,

    /// 記録日時
    pub recorded_at: DateTime<Utc>,
}

impl Breadcrumb {
    /// 新しいBreadcrumbインスタンスを作成
    pub fn new(
        assets_json: impl Into<PathBuf>,
        clone_path: impl Into<PathBuf>,
        tag: impl Into<String>,
    ) -> Self {
        Self {
            assets_json: assets_json.into(),
            clone_path: clone_path.into(),
            tag: tag.into(),
            recorded_at: Utc::now(),
        }
    }

    /// ポインタファイルのタグと一致するか
    pub fn matches_tag(&self, pointer_tag: &str) -> bool {
        self.tag.trim() == pointer_tag.trim()
    }
}
