use rayon::ThreadPool;
use std::path::PathBuf;

use crate::common::error::StoreError;
use crate::common::result::StoreResult;
use crate::infrastructure::git::CommitAuthor;

/// Overrides the directory holding clones and breadcrumbs
pub const ENV_ASSETS_ROOT: &str = "ASSETS_STORE_ROOT";

/// Overrides the base URL `owner/name` repositories are resolved against
pub const ENV_REMOTE_BASE: &str = "ASSETS_STORE_REMOTE_BASE";

/// Overrides the number of hashing threads
pub const ENV_HASH_THREADS: &str = "ASSETS_STORE_HASH_THREADS";

/// Default base for `owner/name` repositories
pub const DEFAULT_REMOTE_BASE: &str = "https://github.com/";

/// GitStoreの設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreOptions {
    /// クローンとブレッドクラムを置くディレクトリ
    ///
    /// Noneの場合、ポインタファイルを含むGitリポジトリのルート直下の `.assets`
    /// （リポジトリ外ならポインタファイルと同じディレクトリの `.assets`）を使う。
    pub assets_root: Option<PathBuf>,

    /// `owner/name` 形式のリポジトリを解決するベースURL
    pub remote_base: String,

    /// ハッシュ計算に使うスレッド数
    pub hash_threads: usize,

    /// スナップショットコミットの作成者名
    pub author_name: Option<String>,

    /// スナップショットコミットの作成者メールアドレス
    pub author_email: Option<String>,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            assets_root: None,
            remote_base: DEFAULT_REMOTE_BASE.to_string(),
            hash_threads: num_cpus::get().max(1),
            author_name: None,
            author_email: None,
        }
    }
}

impl StoreOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// 環境変数で上書きした設定を作成
    pub fn from_env() -> StoreResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// 任意の参照関数で上書きした設定を作成
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> StoreResult<Self> {
        let mut options = Self::default();

        if let Some(root) = lookup(ENV_ASSETS_ROOT).filter(|v| !v.trim().is_empty()) {
            options.assets_root = Some(PathBuf::from(root.trim()));
        }
        if let Some(base) = lookup(ENV_REMOTE_BASE).filter(|v| !v.trim().is_empty()) {
            options.remote_base = base.trim().to_string();
        }
        if let Some(threads) = lookup(ENV_HASH_THREADS).filter(|v| !v.trim().is_empty()) {
            let threads = threads.trim().parse::<usize>().map_err(|e| {
                StoreError::config_validation(ENV_HASH_THREADS, e.to_string(), None)
            })?;
            options.hash_threads = threads;
        }

        options.validate()?;
        Ok(options)
    }

    /// assets_rootを設定
    pub fn with_assets_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.assets_root = Some(root.into());
        self
    }

    /// リモートのベースURLを設定
    pub fn with_remote_base(mut self, base: impl Into<String>) -> Self {
        self.remote_base = base.into();
        self
    }

    /// ハッシュ計算のスレッド数を設定
    pub fn with_hash_threads(mut self, threads: usize) -> Self {
        self.hash_threads = threads;
        self
    }

    /// コミット作成者を設定
    pub fn with_author(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.author_name = Some(name.into());
        self.author_email = Some(email.into());
        self
    }

    /// 設定値の妥当性を検証
    pub fn validate(&self) -> StoreResult<()> {
        if self.hash_threads == 0 {
            return Err(StoreError::config_validation(
                "hash_threads",
                "must be at least 1",
                None,
            ));
        }
        if self.remote_base.trim().is_empty() {
            return Err(StoreError::config_validation(
                "remote_base",
                "cannot be empty",
                None,
            ));
        }
        Ok(())
    }

    pub(crate) fn commit_author(&self) -> CommitAuthor {
        CommitAuthor {
            name: self.author_name.clone(),
            email: self.author_email.clone(),
        }
    }

    pub(crate) fn build_pool(&self) -> StoreResult<ThreadPool> {
        rayon::ThreadPoolBuilder::new()
            .num_threads(self.hash_threads)
            .thread_name(|i| format!("assets-hash-{}", i))
            .build()
            .map_err(|e| StoreError::internal_error_with_source("Failed to start hashing pool", e))
    }
}
