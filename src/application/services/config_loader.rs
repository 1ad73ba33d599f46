use std::path::{Path, PathBuf};
use tracing::debug;
use validator::Validate;

use crate::application::store_options::StoreOptions;
use crate::common::error::StoreError;
use crate::common::result::{ResultExt, StoreResult};
use crate::domain::entities::{AssetsConfig, ResolvedAssetsConfig};
use crate::domain::value_objects::{PrefixPath, RepoIdentity, TagName};
use crate::infrastructure::filesystem::PointerStore;

/// Directory created under the discovered root when no assets root is configured
pub const DEFAULT_ASSETS_DIR: &str = ".assets";

/// ポインタファイル上のフィールド名
fn pointer_field_name(field: &str) -> &str {
    match field {
        "assets_repo" => "AssetsRepo",
        "assets_repo_prefix_path" => "AssetsRepoPrefixPath",
        "assets_repo_id" => "AssetsRepoId",
        "tag_prefix" => "TagPrefix",
        "tag" => "Tag",
        other => other,
    }
}

/// ポインタファイルの読み込み・検証・パス解決を行うサービス
#[derive(Debug, Clone, Default)]
pub struct ConfigurationLoader {
    pointers: PointerStore,
    assets_root: Option<PathBuf>,
}

impl ConfigurationLoader {
    /// 新しいConfigurationLoaderを作成
    pub fn new(options: &StoreOptions) -> Self {
        Self {
            pointers: PointerStore::new(),
            assets_root: options.assets_root.clone(),
        }
    }

    /// ポインタファイルを読み込み、ローカルパスまで解決する
    ///
    /// JSONとして読めなければ `ConfigParse`、必須フィールドの欠落や不正な値は
    /// `ConfigValidation` になる。
    pub async fn parse(&self, path: &Path) -> StoreResult<ResolvedAssetsConfig> {
        let assets_json = match tokio::fs::canonicalize(path).await {
            Ok(canonical) => canonical,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::config_not_found(path))
            }
            Err(e) => {
                return Err(StoreError::filesystem_error_with_source(
                    "Failed to resolve assets configuration path",
                    Some(path.to_path_buf()),
                    e,
                ))
            }
        };

        let config = self.pointers.read(&assets_json).await?;
        self.resolve(assets_json, config)
    }

    /// 読み込み済みの内容を検証し、ローカルパスを解決する
    pub fn resolve(
        &self,
        assets_json: PathBuf,
        config: AssetsConfig,
    ) -> StoreResult<ResolvedAssetsConfig> {
        validate_config(&config, &assets_json)?;

        let invalid = |field: &str, message: String| {
            StoreError::config_validation(field, message, Some(assets_json.clone()))
        };

        let identity = RepoIdentity::new(&config.assets_repo, &config.assets_repo_id)
            .map_err(|e| invalid("AssetsRepo", e.to_string()))?;
        let prefix = PrefixPath::new(&config.assets_repo_prefix_path)
            .map_err(|e| invalid("AssetsRepoPrefixPath", e.to_string()))?;
        let tag = if config.has_tag() {
            Some(TagName::new(&config.tag).map_err(|e| invalid("Tag", e.to_string()))?)
        } else {
            None
        };

        let assets_root = self.assets_root_for(&assets_json)?;
        let clone_root = assets_root.join(identity.clone_key());
        let working_dir = prefix.join_onto(&clone_root);

        debug!(
            assets_json = %assets_json.display(),
            repo = %identity,
            clone = %clone_root.display(),
            "Resolved assets configuration"
        );

        Ok(ResolvedAssetsConfig {
            assets_json,
            config,
            identity,
            prefix,
            tag,
            assets_root,
            clone_root,
            working_dir,
        })
    }

    fn assets_root_for(&self, assets_json: &Path) -> StoreResult<PathBuf> {
        if let Some(root) = &self.assets_root {
            return std::path::absolute(root)
                .with_filesystem_error("Failed to resolve assets root", Some(root.clone()));
        }

        let config_dir = assets_json.parent().unwrap_or_else(|| Path::new("."));
        let base = git2::Repository::discover(config_dir)
            .ok()
            .and_then(|repo| repo.workdir().map(Path::to_path_buf))
            .unwrap_or_else(|| config_dir.to_path_buf());
        Ok(base.join(DEFAULT_ASSETS_DIR))
    }
}

fn validate_config(config: &AssetsConfig, assets_json: &Path) -> StoreResult<()> {
    let Err(errors) = config.validate() else {
        return Ok(());
    };

    let mut fields: Vec<_> = errors
        .field_errors()
        .into_iter()
        .map(|(field, errors)| (field.to_string(), errors))
        .collect();
    fields.sort_by(|a, b| a.0.cmp(&b.0));

    let (field, message) = fields
        .first()
        .map(|(field, errors)| {
            let message = errors
                .first()
                .map(|e| {
                    e.message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string())
                })
                .unwrap_or_else(|| "is invalid".to_string());
            (pointer_field_name(field).to_string(), message)
        })
        .unwrap_or_else(|| ("config".to_string(), errors.to_string()));

    Err(StoreError::config_validation(
        field,
        message,
        Some(assets_json.to_path_buf()),
    ))
}
