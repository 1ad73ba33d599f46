use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::common::error::StoreError;
use crate::common::result::StoreResult;
use crate::domain::entities::Breadcrumb;
use crate::infrastructure::filesystem::staged_write::StagedWrite;

/// Directory under the assets root that holds breadcrumb files
pub const BREADCRUMB_DIR: &str = "breadcrumb";

const BREADCRUMB_EXTENSION: &str = "breadcrumb";

/// One JSON file per pointer file, keyed by a hash of the pointer's path
#[derive(Debug, Default, Clone)]
pub struct BreadcrumbStore;

impl BreadcrumbStore {
    pub fn new() -> Self {
        Self
    }

    /// Where the breadcrumb for `assets_json` lives under `assets_root`
    pub fn path_for(&self, assets_root: &Path, assets_json: &Path) -> PathBuf {
        let digest = hex::encode(Sha256::digest(assets_json.to_string_lossy().as_bytes()));
        assets_root
            .join(BREADCRUMB_DIR)
            .join(format!("{}.{}", &digest[..16], BREADCRUMB_EXTENSION))
    }

    /// Stage the breadcrumb without making it visible
    pub fn stage(&self, assets_root: &Path, breadcrumb: &Breadcrumb) -> StoreResult<StagedWrite> {
        let path = self.path_for(assets_root, &breadcrumb.assets_json);
        let mut content = serde_json::to_string_pretty(breadcrumb)?;
        content.push('\n');
        StagedWrite::stage(&path, content.as_bytes())
    }

    /// Read the breadcrumb for `assets_json`.
    ///
    /// `None` when none was ever recorded, or when the file is unreadable
    /// (reported as a warning; the caller treats it like a missing entry).
    pub fn read(&self, assets_root: &Path, assets_json: &Path) -> StoreResult<Option<Breadcrumb>> {
        let path = self.path_for(assets_root, assets_json);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StoreError::filesystem_error_with_source(
                    "Failed to read breadcrumb",
                    Some(path),
                    e,
                ))
            }
        };
        match serde_json::from_str::<Breadcrumb>(&content) {
            Ok(breadcrumb) => Ok(Some(breadcrumb)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring malformed breadcrumb");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_path_is_stable_per_pointer() {
        let store = BreadcrumbStore::new();
        let root = Path::new("/work/.assets");
        let a = store.path_for(root, Path::new("/work/sdk/a/assets.json"));
        let b = store.path_for(root, Path::new("/work/sdk/b/assets.json"));

        assert_eq!(a, store.path_for(root, Path::new("/work/sdk/a/assets.json")));
        assert_ne!(a, b);
        assert!(a.starts_with(root.join(BREADCRUMB_DIR)));
        assert_eq!(a.extension().unwrap(), "breadcrumb");
    }

    #[test]
    fn test_stage_commit_then_read() {
        let temp = TempDir::new().unwrap();
        let store = BreadcrumbStore::new();
        let crumb = Breadcrumb::new("/work/assets.json", temp.path().join("clone"), "p_0123456789");

        assert!(store.read(temp.path(), &crumb.assets_json).unwrap().is_none());
        store.stage(temp.path(), &crumb).unwrap().commit().unwrap();
        assert_eq!(store.read(temp.path(), &crumb.assets_json).unwrap(), Some(crumb));
    }

    #[test]
    fn test_malformed_breadcrumb_reads_as_missing() {
        let temp = TempDir::new().unwrap();
        let store = BreadcrumbStore::new();
        let pointer = Path::new("/work/assets.json");
        let path = store.path_for(temp.path(), pointer);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "garbage").unwrap();

        assert!(store.read(temp.path(), pointer).unwrap().is_none());
    }
}
