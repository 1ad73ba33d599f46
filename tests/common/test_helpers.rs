//! Test helper functions and utilities

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Once;
use walkdir::WalkDir;

static TRACING: Once = Once::new();

/// Install a fmt subscriber once per test binary (`RUST_LOG` controls the level)
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Helper functions for file system operations in tests
pub struct FileSystemHelper;

impl FileSystemHelper {
    /// Write `content` to `root/relative`, creating parent directories
    pub fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        std::fs::create_dir_all(path.parent().unwrap()).expect("Failed to create directory");
        std::fs::write(&path, content).expect("Failed to write file");
    }

    pub fn remove(root: &Path, relative: &str) {
        std::fs::remove_file(root.join(relative)).expect("Failed to remove file");
    }

    /// Every regular file below `root` (outside `.git`) with its content
    pub fn read_tree(root: &Path) -> BTreeMap<String, String> {
        if !root.exists() {
            return BTreeMap::new();
        }
        WalkDir::new(root)
            .into_iter()
            .filter_entry(|e| e.file_name() != ".git")
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(|e| {
                let relative = e
                    .path()
                    .strip_prefix(root)
                    .unwrap()
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect::<Vec<_>>()
                    .join("/");
                let content = std::fs::read_to_string(e.path()).expect("Failed to read file");
                (relative, content)
            })
            .collect()
    }
}

/// Build an expected tree from `(path, content)` pairs
pub fn tree(entries: &[(&str, &str)]) -> BTreeMap<String, String> {
    entries
        .iter()
        .map(|(path, content)| (path.to_string(), content.to_string()))
        .collect()
}
