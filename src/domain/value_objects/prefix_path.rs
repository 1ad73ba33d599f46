use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// PrefixPath関連のエラー
#[derive(Debug, Error, PartialEq)]
pub enum PrefixPathError {
    #[error("Prefix path must be relative: {0}")]
    Absolute(String),

    #[error("Prefix path cannot leave the clone root: {0}")]
    ParentTraversal(String),

    #[error("Prefix path cannot reference a .git directory: {0}")]
    GitDirectory(String),

    #[error("Invalid character in prefix path: {0}")]
    InvalidCharacter(String),
}

/// リポジトリ内およびローカル作業ツリー内のサブツリーを表す値オブジェクト
///
/// 区切り文字（`/` と `\`）を正規化し、空の要素と `.` を取り除く。
/// 空のプレフィックスはリポジトリのルートを意味する。
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PrefixPath {
    /// 正規化されたパス要素
    components: Vec<String>,
}

impl PrefixPath {
    /// 新しいPrefixPathインスタンスを作成
    pub fn new(raw: &str) -> Result<Self, PrefixPathError> {
        let trimmed = raw.trim();

        if trimmed.starts_with('/') || trimmed.starts_with('\\') || Path::new(trimmed).is_absolute()
        {
            return Err(PrefixPathError::Absolute(raw.to_string()));
        }

        let mut components = Vec::new();
        for part in trimmed.split(['/', '\\']) {
            match part {
                "" | "." => continue,
                ".." => return Err(PrefixPathError::ParentTraversal(raw.to_string())),
                ".git" => return Err(PrefixPathError::GitDirectory(raw.to_string())),
                _ => {}
            }
            if part.chars().any(|c| c.is_control() || c == ':') {
                return Err(PrefixPathError::InvalidCharacter(raw.to_string()));
            }
            components.push(part.to_string());
        }

        Ok(Self { components })
    }

    /// リポジトリのルートを指すか
    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    /// パス要素を取得
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Git内部表現（`/` 区切り）
    pub fn as_git_path(&self) -> String {
        self.components.join("/")
    }

    /// ホストOSの区切り文字でルートに連結
    pub fn join_onto(&self, root: &Path) -> PathBuf {
        let mut path = root.to_path_buf();
        for component in &self.components {
            path.push(component);
        }
        path
    }
}

impl fmt::Display for PrefixPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_git_path())
    }
}
