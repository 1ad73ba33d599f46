use regex::Regex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use thiserror::Error;
use url::Url;

/// RepoIdentity関連のエラー
#[derive(Debug, Error, PartialEq)]
pub enum RepoIdentityError {
    #[error("Assets repository cannot be empty")]
    Empty,

    #[error("Assets repository must look like 'owner/name', a URL or an absolute path: {0}")]
    InvalidFormat(String),

    #[error("Invalid remote base URL: {0}")]
    InvalidRemoteBase(String),
}

/// `owner/name` 形式のリポジトリ名を判定する正規表現
fn short_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+$").expect("static pattern is valid")
    })
}

/// リモートURLとして扱えるスキーム
const URL_SCHEMES: [&str; 5] = ["https", "http", "ssh", "git", "file"];

/// リモートリポジトリの同一性を表す値オブジェクト
///
/// `AssetsRepo` と `AssetsRepoId` の組で1つのローカルクローンが決まる。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoIdentity {
    /// リモートリポジトリ（例: Azure/azure-sdk-assets）
    repo: String,

    /// 同じリポジトリを別クローンとして扱うための識別子（空文字可）
    repo_id: String,
}

impl RepoIdentity {
    /// 新しいRepoIdentityインスタンスを作成
    pub fn new(repo: &str, repo_id: &str) -> Result<Self, RepoIdentityError> {
        let repo = repo.trim();
        Self::validate(repo)?;
        Ok(Self {
            repo: repo.to_string(),
            repo_id: repo_id.trim().to_string(),
        })
    }

    /// リポジトリ名の妥当性を検証
    pub fn validate(repo: &str) -> Result<(), RepoIdentityError> {
        if repo.is_empty() {
            return Err(RepoIdentityError::Empty);
        }

        if Self::is_explicit_location(repo) || short_name_pattern().is_match(repo) {
            return Ok(());
        }

        Err(RepoIdentityError::InvalidFormat(repo.to_string()))
    }

    /// URLまたは絶対パスとして直接指定されているか
    fn is_explicit_location(repo: &str) -> bool {
        if Path::new(repo).is_absolute() {
            return true;
        }
        match Url::parse(repo) {
            // Windowsのドライブレター（C:\...）はスキーム1文字として解釈されるため除外
            Ok(url) => url.scheme().len() > 1 && URL_SCHEMES.contains(&url.scheme()),
            Err(_) => false,
        }
    }

    /// リポジトリ名を取得
    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// リポジトリ識別子を取得
    pub fn repo_id(&self) -> &str {
        &self.repo_id
    }

    /// クローンディレクトリ名として使う安定したキー
    ///
    /// 同じ `(repo, repo_id)` であれば常に同じ値になる。
    pub fn clone_key(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.repo.as_bytes());
        hasher.update(b"\n");
        hasher.update(self.repo_id.as_bytes());
        let digest = hex::encode(hasher.finalize());
        digest[..10].to_string()
    }

    /// リモートURL（またはローカルパス）を解決
    ///
    /// `owner/name` 形式は `remote_base` に `<owner>/<name>.git` を連結する。
    /// `file://` のURLはローカルパスに変換して返す。
    pub fn remote_location(&self, remote_base: &str) -> Result<String, RepoIdentityError> {
        if Path::new(&self.repo).is_absolute() {
            return Ok(self.repo.clone());
        }

        let url = if Self::is_explicit_location(&self.repo) {
            Url::parse(&self.repo).map_err(|e| RepoIdentityError::InvalidFormat(e.to_string()))?
        } else {
            let base = if remote_base.ends_with('/') {
                remote_base.to_string()
            } else {
                format!("{}/", remote_base)
            };
            let base = Url::parse(&base)
                .map_err(|e| RepoIdentityError::InvalidRemoteBase(format!("{}: {}", remote_base, e)))?;
            base.join(&format!("{}.git", self.repo))
                .map_err(|e| RepoIdentityError::InvalidRemoteBase(e.to_string()))?
        };

        if url.scheme() == "file" {
            let path: PathBuf = url
                .to_file_path()
                .map_err(|_| RepoIdentityError::InvalidFormat(url.to_string()))?;
            return Ok(path.display().to_string());
        }

        Ok(url.to_string())
    }
}

impl fmt::Display for RepoIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.repo_id.is_empty() {
            write!(f, "{}", self.repo)
        } else {
            write!(f, "{} ({})", self.repo, self.repo_id)
        }
    }
}
