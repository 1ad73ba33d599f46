//! Test fixtures: a bare remote repository and pointer files

use assets_store::{ConfirmationProvider, GitStore, RemoteTransport, StoreOptions};
use git2::{FileMode, ObjectType, Oid, Repository, Signature, TreeWalkMode, TreeWalkResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use url::Url;

use super::test_helpers::init_tracing;

/// `AssetsRepo` used by every fixture pointer file
pub const ASSETS_REPO: &str = "owner/assets";

/// Prefix used by the scenario tests
pub const PREFIX: &str = "python/storage";

/// Tag prefix used by the scenario tests
pub const TAG_PREFIX: &str = "python/storage";

/// Baseline tag holding `file1..file3 = v1`
pub const BASELINE_TAG: &str = "python/storage_baseline";

/// A temp directory with a bare remote at `remotes/owner/assets.git`
pub struct RemoteFixture {
    pub temp: TempDir,
    pub remote_path: PathBuf,
    pub remote_base: String,
}

impl RemoteFixture {
    pub fn new() -> Self {
        init_tracing();
        let temp = TempDir::new().expect("Failed to create temp dir");
        let remotes = temp.path().join("remotes");
        let remote_path = remotes.join("owner").join("assets.git");
        Repository::init_bare(&remote_path).expect("Failed to init bare remote");
        let remote_base = Url::from_directory_path(&remotes)
            .expect("Failed to build file URL")
            .to_string();
        Self {
            temp,
            remote_path,
            remote_base,
        }
    }

    /// Remote seeded with [`BASELINE_TAG`]
    pub fn with_baseline() -> Self {
        let fixture = Self::new();
        fixture.seed_tag(
            BASELINE_TAG,
            PREFIX,
            &[("file1.txt", "v1"), ("file2.txt", "v1"), ("file3.txt", "v1")],
        );
        fixture
    }

    pub fn path(&self) -> &Path {
        self.temp.path()
    }

    fn remote(&self) -> Repository {
        Repository::open_bare(&self.remote_path).expect("Failed to open remote")
    }

    /// Commit `files` under `prefix` directly in the remote and tag it
    pub fn seed_tag(&self, tag: &str, prefix: &str, files: &[(&str, &str)]) -> Oid {
        let repo = self.remote();
        let full: Vec<(String, Oid)> = files
            .iter()
            .map(|(path, content)| {
                let full = if prefix.is_empty() {
                    path.to_string()
                } else {
                    format!("{}/{}", prefix, path)
                };
                (full, repo.blob(content.as_bytes()).unwrap())
            })
            .collect();
        let tree = write_tree(&repo, &full);
        let tree = repo.find_tree(tree).unwrap();
        let sig = Signature::now("fixture", "fixture@example.com").unwrap();
        let commit = repo.commit(None, &sig, &sig, "seed", &tree, &[]).unwrap();
        repo.reference(&format!("refs/tags/{}", tag), commit, false, "seed")
            .unwrap();
        commit
    }

    pub fn remote_has_tag(&self, tag: &str) -> bool {
        self.remote()
            .find_reference(&format!("refs/tags/{}", tag))
            .is_ok()
    }

    pub fn remote_tags(&self) -> Vec<String> {
        let repo = self.remote();
        let names = repo.tag_names(None).unwrap();
        names.iter().flatten().map(String::from).collect()
    }

    /// Files under `prefix` at `tag` in the remote
    pub fn remote_files(&self, tag: &str, prefix: &str) -> BTreeMap<String, String> {
        let repo = self.remote();
        let commit = repo
            .find_reference(&format!("refs/tags/{}", tag))
            .unwrap()
            .peel_to_commit()
            .unwrap();
        let root = commit.tree().unwrap();
        let tree = if prefix.is_empty() {
            root
        } else {
            let entry = root.get_path(Path::new(prefix)).unwrap();
            repo.find_tree(entry.id()).unwrap()
        };

        let mut files = BTreeMap::new();
        tree.walk(TreeWalkMode::PreOrder, |dir, entry| {
            if entry.kind() == Some(ObjectType::Blob) {
                let blob = repo.find_blob(entry.id()).unwrap();
                files.insert(
                    format!("{}{}", dir, entry.name().unwrap()),
                    String::from_utf8(blob.content().to_vec()).unwrap(),
                );
            }
            TreeWalkResult::Ok
        })
        .unwrap();
        files
    }

    /// Write `<projects>/<name>/assets.json`
    pub fn write_pointer(&self, name: &str, prefix: &str, tag_prefix: &str, tag: &str) -> PathBuf {
        self.write_pointer_json(
            name,
            &serde_json::json!({
                "AssetsRepo": ASSETS_REPO,
                "AssetsRepoPrefixPath": prefix,
                "AssetsRepoId": "",
                "TagPrefix": tag_prefix,
                "Tag": tag,
            })
            .to_string(),
        )
    }

    pub fn write_pointer_json(&self, name: &str, json: &str) -> PathBuf {
        let dir = self.path().join("projects").join(name);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("assets.json");
        std::fs::write(&path, json).unwrap();
        path
    }

    pub fn options(&self, store_name: &str) -> StoreOptions {
        StoreOptions::new()
            .with_assets_root(self.path().join("stores").join(store_name))
            .with_remote_base(self.remote_base.clone())
            .with_hash_threads(2)
            .with_author("Fixture Bot", "bot@example.com")
    }

    /// Store with its own assets root, the real transport and the given confirmation
    pub fn store(&self, store_name: &str, confirmation: Arc<dyn ConfirmationProvider>) -> GitStore {
        GitStore::builder(self.options(store_name))
            .with_confirmation(confirmation)
            .build()
            .expect("Failed to build store")
    }

    pub fn store_with_transport(
        &self,
        store_name: &str,
        transport: Arc<dyn RemoteTransport>,
        confirmation: Arc<dyn ConfirmationProvider>,
    ) -> GitStore {
        GitStore::builder(self.options(store_name))
            .with_transport(transport)
            .with_confirmation(confirmation)
            .build()
            .expect("Failed to build store")
    }
}

/// Read the `Tag` currently in a pointer file
pub fn pointer_tag(path: &Path) -> String {
    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    value["Tag"].as_str().unwrap_or_default().to_string()
}

/// Rewrite the `Tag` of a pointer file the way a person would
pub fn set_pointer_tag(path: &Path, tag: &str) {
    let mut value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    value["Tag"] = serde_json::Value::String(tag.to_string());
    std::fs::write(path, serde_json::to_string_pretty(&value).unwrap()).unwrap();
}

fn write_tree(repo: &Repository, files: &[(String, Oid)]) -> Oid {
    let mut here: BTreeMap<&str, Oid> = BTreeMap::new();
    let mut nested: BTreeMap<&str, Vec<(String, Oid)>> = BTreeMap::new();
    for (path, oid) in files {
        match path.split_once('/') {
            Some((dir, rest)) => nested.entry(dir).or_default().push((rest.to_string(), *oid)),
            None => {
                here.insert(path.as_str(), *oid);
            }
        }
    }

    let mut builder = repo.treebuilder(None).unwrap();
    for (name, oid) in here {
        builder.insert(name, oid, i32::from(FileMode::Blob)).unwrap();
    }
    for (name, children) in nested {
        let child = write_tree(repo, &children);
        builder.insert(name, child, i32::from(FileMode::Tree)).unwrap();
    }
    builder.write().unwrap()
}
