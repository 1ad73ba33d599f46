use serde_json::{Map, Value};
use std::path::Path;

use crate::common::error::StoreError;
use crate::common::result::{ResultExt, StoreResult};
use crate::domain::entities::AssetsConfig;
use crate::infrastructure::filesystem::staged_write::StagedWrite;

/// Key of the pinned tag inside `assets.json`
pub const TAG_KEY: &str = "Tag";

/// Reads and rewrites `assets.json` pointer files.
///
/// Rewrites only touch the `Tag` key; every other key, including ones this
/// crate does not know about, keeps its value and position.
#[derive(Debug, Default, Clone)]
pub struct PointerStore;

impl PointerStore {
    pub fn new() -> Self {
        Self
    }

    /// Read and deserialize a pointer file
    pub async fn read(&self, path: &Path) -> StoreResult<AssetsConfig> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::config_not_found(path))
            }
            Err(e) => {
                return Err(StoreError::filesystem_error_with_source(
                    "Failed to read assets configuration",
                    Some(path.to_path_buf()),
                    e,
                ))
            }
        };
        serde_json::from_str(&content).map_err(|e| StoreError::config_parse(path, e))
    }

    /// Stage a copy of the pointer file with `Tag` set to `tag`
    pub fn stage_tag(&self, path: &Path, tag: &str) -> StoreResult<StagedWrite> {
        let content = std::fs::read_to_string(path)
            .with_filesystem_error("Failed to read assets configuration", Some(path.to_path_buf()))?;
        let updated = render_with_tag(&content, tag).map_err(|e| StoreError::config_parse(path, e))?;
        StagedWrite::stage(path, updated.as_bytes())
    }
}

/// Pointer file text with its `Tag` replaced, pretty printed with a trailing newline
pub fn render_with_tag(content: &str, tag: &str) -> Result<String, serde_json::Error> {
    let mut object: Map<String, Value> = serde_json::from_str(content)?;
    object.insert(TAG_KEY.to_string(), Value::String(tag.to_string()));
    let mut rendered = serde_json::to_string_pretty(&Value::Object(object))?;
    rendered.push('\n');
    Ok(rendered)
}
