use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::warn;

use crate::common::error::StoreError;
use crate::common::result::{ResultExt, StoreResult};

/// New file contents written to a temp file beside the target, not yet visible.
///
/// Dropping a staged write discards it.
#[derive(Debug)]
pub struct StagedWrite {
    target: PathBuf,
    temp: NamedTempFile,
    previous: Option<Vec<u8>>,
}

impl StagedWrite {
    /// Write `contents` next to `target` and remember what `target` held before
    pub fn stage(target: &Path, contents: &[u8]) -> StoreResult<Self> {
        let parent = target
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)
            .with_filesystem_error("Failed to create directory", Some(parent.to_path_buf()))?;

        let previous = match fs::read(target) {
            Ok(bytes) => Some(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                return Err(StoreError::filesystem_error_with_source(
                    "Failed to read existing file",
                    Some(target.to_path_buf()),
                    e,
                ))
            }
        };

        let mut temp = NamedTempFile::new_in(parent)
            .with_filesystem_error("Failed to create temp file", Some(parent.to_path_buf()))?;
        temp.write_all(contents)
            .and_then(|_| temp.as_file().sync_all())
            .with_filesystem_error("Failed to write temp file", Some(target.to_path_buf()))?;
        if let Ok(metadata) = fs::metadata(target) {
            temp.as_file()
                .set_permissions(metadata.permissions())
                .with_filesystem_error("Failed to copy permissions", Some(target.to_path_buf()))?;
        }

        Ok(Self {
            target: target.to_path_buf(),
            temp,
            previous,
        })
    }

    /// Atomically replace the target with the staged contents
    pub fn commit(self) -> StoreResult<CommittedWrite> {
        let Self {
            target,
            temp,
            previous,
        } = self;
        temp.persist(&target).map_err(|e| {
            StoreError::filesystem_error_with_source(
                "Failed to move file into place",
                Some(target.clone()),
                e.error,
            )
        })?;
        Ok(CommittedWrite { target, previous })
    }
}

/// A write that has landed and can still be undone
#[derive(Debug)]
pub struct CommittedWrite {
    target: PathBuf,
    previous: Option<Vec<u8>>,
}

impl CommittedWrite {
    /// Put back what the target held before the write
    pub fn rollback(self) -> StoreResult<()> {
        warn!(path = %self.target.display(), "Rolling back write");
        match self.previous {
            Some(bytes) => {
                StagedWrite::stage(&self.target, &bytes)?.commit()?;
                Ok(())
            }
            None => fs::remove_file(&self.target)
                .with_filesystem_error("Failed to remove file", Some(self.target.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_staged_write_is_invisible_until_commit() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("assets.json");
        fs::write(&target, "old").unwrap();

        let staged = StagedWrite::stage(&target, b"new").unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "old");

        staged.commit().unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "new");
    }

    #[test]
    fn test_dropped_stage_leaves_no_files() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("assets.json");
        fs::write(&target, "old").unwrap();

        drop(StagedWrite::stage(&target, b"new").unwrap());
        let entries: Vec<_> = fs::read_dir(temp.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_rollback_restores_previous_contents() {
        let temp = TempDir::new().unwrap();
        let existing = temp.path().join("existing");
        fs::write(&existing, "before").unwrap();
        let committed = StagedWrite::stage(&existing, b"after").unwrap().commit().unwrap();
        committed.rollback().unwrap();
        assert_eq!(fs::read_to_string(&existing).unwrap(), "before");

        let fresh = temp.path().join("nested").join("fresh");
        let committed = StagedWrite::stage(&fresh, b"data").unwrap().commit().unwrap();
        assert!(fresh.exists());
        committed.rollback().unwrap();
        assert!(!fresh.exists());
    }
}
