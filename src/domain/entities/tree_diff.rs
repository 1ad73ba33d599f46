use serde::{Deserialize, Serialize};

/// 作業ディレクトリとタグのツリーとの差分
///
/// パスはプレフィックスからの相対パスで、区切り文字は常に `/`。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeDiff {
    /// タグに存在せず作業ディレクトリにだけあるファイル
    pub added: Vec<String>,

    /// 内容または実行属性が異なるファイル
    pub modified: Vec<String>,

    /// タグに存在するが作業ディレクトリにないファイル
    pub removed: Vec<String>,
}

impl TreeDiff {
    /// 差分がないか
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.removed.is_empty()
    }

    /// 差分のあるファイル数
    pub fn len(&self) -> usize {
        self.added.len() + self.modified.len() + self.removed.len()
    }

    /// 出力を安定させるためにソート
    pub fn sorted(mut self) -> Self {
        self.added.sort();
        self.modified.sort();
        self.removed.sort();
        self
    }

    /// 確認プロンプト用の要約
    pub fn summary(&self) -> String {
        format!(
            "{} added, {} modified, {} removed",
            self.added.len(),
            self.modified.len(),
            self.removed.len()
        )
    }

    /// 確認プロンプト用の詳細（先頭 `limit` 件まで）
    pub fn describe(&self, limit: usize) -> String {
        let entries = self
            .added
            .iter()
            .map(|p| format!("  + {}", p))
            .chain(self.modified.iter().map(|p| format!("  ~ {}", p)))
            .chain(self.removed.iter().map(|p| format!("  - {}", p)));

        let mut lines: Vec<String> = entries.take(limit).collect();
        if self.len() > limit {
            lines.push(format!("  ... and {} more", self.len() - limit));
        }
        lines.join("\n")
    }
}
