use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// 生成されるタグ名に含めるコミットハッシュの桁数
pub const TAG_HASH_LENGTH: usize = 10;

/// TagName関連のエラー
#[derive(Debug, Error, PartialEq)]
pub enum TagNameError {
    #[error("Tag name cannot be empty")]
    Empty,

    #[error("Tag prefix cannot be empty")]
    EmptyPrefix,

    #[error("Not a valid git tag name: {0}")]
    InvalidReference(String),

    #[error("Commit id too short to derive a tag: {0}")]
    ShortCommitId(String),
}

/// Gitタグ名の値オブジェクト
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TagName {
    /// 検証済みタグ名（refs/tags/ を含まない）
    name: String,
}

impl TagName {
    /// 新しいTagNameインスタンスを作成
    pub fn new(name: &str) -> Result<Self, TagNameError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(TagNameError::Empty);
        }
        if !git2::Reference::is_valid_name(&format!("refs/tags/{}", name)) {
            return Err(TagNameError::InvalidReference(name.to_string()));
        }
        Ok(Self {
            name: name.to_string(),
        })
    }

    /// プレフィックスとコミットIDから新しいタグ名を導出
    ///
    /// `<prefix>_<コミットIDの先頭10桁>` の形式になる。
    pub fn derive(prefix: &str, commit_id: &str) -> Result<Self, TagNameError> {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return Err(TagNameError::EmptyPrefix);
        }
        if commit_id.len() < TAG_HASH_LENGTH {
            return Err(TagNameError::ShortCommitId(commit_id.to_string()));
        }
        Self::new(&format!("{}_{}", prefix, &commit_id[..TAG_HASH_LENGTH]))
    }

    /// タグ名を取得
    pub fn as_str(&self) -> &str {
        &self.name
    }

    /// 完全な参照名（refs/tags/...）
    pub fn reference(&self) -> String {
        format!("refs/tags/{}", self.name)
    }

}

impl fmt::Display for TagName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

impl AsRef<str> for TagName {
    fn as_ref(&self) -> &str {
        &self.name
    }
}
