use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use validator::{Validate, ValidationError};

use crate::domain::value_objects::{PrefixPath, RepoIdentity, TagName};

/// `assets.json` のファイル名
pub const ASSETS_JSON: &str = "assets.json";

/// `AssetsRepo` フィールドの形式検証
fn validate_assets_repo(repo: &str) -> Result<(), ValidationError> {
    RepoIdentity::validate(repo.trim()).map_err(|e| {
        let mut error = ValidationError::new("assets_repo_format");
        error.message = Some(e.to_string().into());
        error
    })
}

/// `AssetsRepoPrefixPath` フィールドの形式検証
fn validate_prefix_path(prefix: &str) -> Result<(), ValidationError> {
    PrefixPath::new(prefix).map(|_| ()).map_err(|e| {
        let mut error = ValidationError::new("prefix_path_format");
        error.message = Some(e.to_string().into());
        error
    })
}

/// ポインタファイル（assets.json）の内容
///
/// プロジェクトごとに1つ存在し、リモートリポジトリ・サブディレクトリ・タグを指す。
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, Validate)]
pub struct AssetsConfig {
    /// リモートリポジトリ（例: Azure/azure-sdk-assets）
    #[serde(rename = "AssetsRepo", default)]
    #[validate(
        length(min = 1, message = "AssetsRepo is required"),
        custom(function = "validate_assets_repo")
    )]
    pub assets_repo: String,

    /// リポジトリ内およびローカル作業ツリー内のサブツリー
    #[serde(rename = "AssetsRepoPrefixPath", default)]
    #[validate(custom(function = "validate_prefix_path"))]
    pub assets_repo_prefix_path: String,

    /// 同じリポジトリを別クローンとして扱うための識別子
    #[serde(rename = "AssetsRepoId", default)]
    pub assets_repo_id: String,

    /// このポインタファイルが生成するタグの名前空間
    #[serde(rename = "TagPrefix", default)]
    pub tag_prefix: String,

    /// 現在固定されているスナップショット（空文字はスナップショットなし）
    #[serde(rename = "Tag", default)]
    pub tag: String,
}

impl AssetsConfig {
    /// 新しいAssetsConfigインスタンスを作成
    pub fn new(assets_repo: impl Into<String>) -> Self {
        Self {
            assets_repo: assets_repo.into(),
            ..Self::default()
        }
    }

    /// プレフィックスパスを設定
    pub fn with_prefix_path(mut self, prefix: impl Into<String>) -> Self {
        self.assets_repo_prefix_path = prefix.into();
        self
    }

    /// リポジトリ識別子を設定
    pub fn with_repo_id(mut self, repo_id: impl Into<String>) -> Self {
        self.assets_repo_id = repo_id.into();
        self
    }

    /// タグプレフィックスを設定
    pub fn with_tag_prefix(mut self, tag_prefix: impl Into<String>) -> Self {
        self.tag_prefix = tag_prefix.into();
        self
    }

    /// タグを設定
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// スナップショットが存在するか
    pub fn has_tag(&self) -> bool {
        !self.tag.trim().is_empty()
    }
}

/// 読み込み・検証済みで、ローカルパスまで解決されたポインタファイル
#[derive(Debug, Clone)]
pub struct ResolvedAssetsConfig {
    /// ポインタファイルの絶対パス
    pub assets_json: PathBuf,

    /// ファイルの内容
    pub config: AssetsConfig,

    /// クローンを決定するリポジトリの同一性
    pub identity: RepoIdentity,

    /// 正規化済みのプレフィックスパス
    pub prefix: PrefixPath,

    /// 現在のタグ（未設定ならNone）
    pub tag: Option<TagName>,

    /// クローンとブレッドクラムを格納するディレクトリ
    pub assets_root: PathBuf,

    /// このリポジトリのローカルクローン
    pub clone_root: PathBuf,

    /// 作業ディレクトリ（`<clone_root>/<prefix>`）
    pub working_dir: PathBuf,
}

impl ResolvedAssetsConfig {
    /// 現在のタグ名（未設定なら空文字）
    pub fn tag_str(&self) -> &str {
        self.tag.as_ref().map(|t| t.as_str()).unwrap_or("")
    }
}
