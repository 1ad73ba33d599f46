use git2::{
    ErrorCode, FileMode, ObjectType, Oid, Repository as Git2Repository, Signature, Tree,
    TreeWalkMode, TreeWalkResult,
};
use std::collections::BTreeMap;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::common::error::StoreError;
use crate::common::result::{ResultExt, StoreResult};
use crate::domain::value_objects::{PrefixPath, TagName};

/// Remote name recorded in every clone's config
pub const ORIGIN: &str = "origin";

const DEFAULT_AUTHOR_NAME: &str = "assets-store";
const DEFAULT_AUTHOR_EMAIL: &str = "assets-store@localhost";

/// A regular file inside a git tree, relative to the prefix it was listed from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeFile {
    /// `/` separated path relative to the prefix
    pub path: String,
    /// Blob id
    pub oid: Oid,
    /// Whether the entry has the executable file mode
    pub executable: bool,
}

impl TreeFile {
    fn filemode(&self) -> i32 {
        if self.executable {
            i32::from(FileMode::BlobExecutable)
        } else {
            i32::from(FileMode::Blob)
        }
    }
}

/// Commit identity used for snapshot commits
#[derive(Debug, Clone, Default)]
pub struct CommitAuthor {
    pub name: Option<String>,
    pub email: Option<String>,
}

#[derive(Default)]
struct DirNode<'a> {
    files: BTreeMap<&'a str, &'a TreeFile>,
    dirs: BTreeMap<&'a str, DirNode<'a>>,
}

impl<'a> DirNode<'a> {
    fn insert(&mut self, file: &'a TreeFile) {
        let mut node = self;
        let mut parts = file.path.split('/').peekable();
        while let Some(part) = parts.next() {
            if parts.peek().is_none() {
                node.files.insert(part, file);
            } else {
                node = node.dirs.entry(part).or_default();
            }
        }
    }
}

/// Object-level access to a local assets clone.
///
/// The clone's index and checkout are never touched: tags are resolved to
/// trees, trees are read and written directly, and commits are created
/// without moving any branch.
pub struct AssetsRepository {
    repo: Git2Repository,
    path: PathBuf,
}

impl AssetsRepository {
    /// Open an existing clone
    pub fn open(path: &Path) -> StoreResult<Self> {
        let repo = Git2Repository::open(path).map_err(|e| {
            StoreError::clone_error_with_source(
                format!("Cannot open clone at {}", path.display()),
                Some(path.to_path_buf()),
                e,
            )
        })?;
        Ok(Self {
            repo,
            path: path.to_path_buf(),
        })
    }

    /// Initialize an empty clone and record `remote_url` as origin
    pub fn init(path: &Path, remote_url: &str) -> StoreResult<Self> {
        let clone_error = |e: git2::Error| {
            StoreError::clone_error_with_source(
                format!("Cannot initialize clone at {}", path.display()),
                Some(path.to_path_buf()),
                e,
            )
        };
        let repo = Git2Repository::init(path).map_err(clone_error)?;
        repo.remote(ORIGIN, remote_url).map_err(clone_error)?;
        debug!(path = %path.display(), remote = remote_url, "Initialized clone");
        Ok(Self {
            repo,
            path: path.to_path_buf(),
        })
    }

    /// Point origin at `remote_url` if it currently points elsewhere
    pub fn ensure_origin(&self, remote_url: &str) -> StoreResult<()> {
        match self.repo.find_remote(ORIGIN) {
            Ok(remote) if remote.url() == Some(remote_url) => Ok(()),
            Ok(_) => self
                .repo
                .remote_set_url(ORIGIN, remote_url)
                .with_git_error("Failed to update origin"),
            Err(e) if e.code() == ErrorCode::NotFound => self
                .repo
                .remote(ORIGIN, remote_url)
                .map(|_| ())
                .with_git_error("Failed to add origin"),
            Err(e) => Err(e.into()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Commit a tag points at, `None` if the tag does not exist locally
    pub fn resolve_tag(&self, tag: &TagName) -> StoreResult<Option<Oid>> {
        match self.repo.find_reference(&tag.reference()) {
            Ok(reference) => {
                let commit = reference
                    .peel_to_commit()
                    .with_git_error(format!("Tag '{}' does not point at a commit", tag))?;
                Ok(Some(commit.id()))
            }
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(StoreError::git_error_with_source(
                format!("Failed to look up tag '{}'", tag),
                e,
            )),
        }
    }

    /// Regular files below `prefix` in the tree of `commit`.
    ///
    /// A prefix missing from the tree yields an empty listing. Symlinks and
    /// submodules are skipped.
    pub fn list_files(&self, commit: Oid, prefix: &PrefixPath) -> StoreResult<Vec<TreeFile>> {
        let root = self.repo.find_commit(commit)?.tree()?;
        let tree = match self.subtree(&root, prefix)? {
            Some(tree) => tree,
            None => return Ok(Vec::new()),
        };

        let blob_mode = i32::from(FileMode::Blob);
        let exec_mode = i32::from(FileMode::BlobExecutable);
        let mut files = Vec::new();
        tree.walk(TreeWalkMode::PreOrder, |dir, entry| {
            let Some(name) = entry.name() else {
                warn!(dir, "Skipping tree entry with a non UTF-8 name");
                return TreeWalkResult::Skip;
            };
            match entry.kind() {
                Some(ObjectType::Blob) => {
                    let mode = entry.filemode();
                    if mode == blob_mode || mode == exec_mode {
                        files.push(TreeFile {
                            path: format!("{}{}", dir, name),
                            oid: entry.id(),
                            executable: mode == exec_mode,
                        });
                    } else {
                        warn!(path = %format!("{}{}", dir, name), "Skipping symlink entry");
                    }
                    TreeWalkResult::Ok
                }
                Some(ObjectType::Tree) => TreeWalkResult::Ok,
                _ => {
                    warn!(path = %format!("{}{}", dir, name), "Skipping submodule entry");
                    TreeWalkResult::Skip
                }
            }
        })?;
        Ok(files)
    }

    /// Subtree at `prefix`, `None` when the path is absent or not a directory
    fn subtree<'r>(&'r self, root: &Tree<'r>, prefix: &PrefixPath) -> StoreResult<Option<Tree<'r>>> {
        if prefix.is_root() {
            return Ok(Some(root.clone()));
        }
        match root.get_path(Path::new(&prefix.as_git_path())) {
            Ok(entry) if entry.kind() == Some(ObjectType::Tree) => {
                Ok(Some(self.repo.find_tree(entry.id())?))
            }
            Ok(_) => Ok(None),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn contains_blob(&self, oid: Oid) -> StoreResult<bool> {
        Ok(self.repo.odb()?.exists(oid))
    }

    /// Stream a file into the object database without loading it whole
    pub fn write_blob_from_file(&self, path: &Path) -> StoreResult<Oid> {
        let mut file = File::open(path)
            .with_filesystem_error("Failed to open file for snapshot", Some(path.to_path_buf()))?;
        let mut writer = self.repo.blob_writer(None)?;
        io::copy(&mut file, &mut writer)
            .with_filesystem_error("Failed to stream file into blob", Some(path.to_path_buf()))?;
        Ok(writer.commit()?)
    }

    /// Write the blob content for `oid` to `destination`
    pub fn write_blob_to(&self, oid: Oid, destination: &mut impl io::Write) -> StoreResult<()> {
        let blob = self.repo.find_blob(oid)?;
        destination.write_all(blob.content())?;
        Ok(())
    }

    /// Build nested trees for `files`, `None` if there are no files
    pub fn build_tree(&self, files: &[TreeFile]) -> StoreResult<Option<Oid>> {
        if files.is_empty() {
            return Ok(None);
        }
        let mut root = DirNode::default();
        for file in files {
            root.insert(file);
        }
        self.write_node(&root).map(Some)
    }

    fn write_node(&self, node: &DirNode<'_>) -> StoreResult<Oid> {
        let mut builder = self.repo.treebuilder(None)?;
        for (name, file) in &node.files {
            builder.insert(*name, file.oid, file.filemode())?;
        }
        for (name, child) in &node.dirs {
            let child_oid = self.write_node(child)?;
            builder.insert(*name, child_oid, i32::from(FileMode::Tree))?;
        }
        Ok(builder.write()?)
    }

    /// Root tree of `base` with the subtree at `prefix` replaced.
    ///
    /// `subtree == None` removes the prefix; intermediate directories that
    /// become empty are dropped.
    pub fn replace_subtree(
        &self,
        base: Option<Oid>,
        prefix: &PrefixPath,
        subtree: Option<Oid>,
    ) -> StoreResult<Oid> {
        let base_tree = match base {
            Some(oid) => Some(self.repo.find_tree(oid)?),
            None => None,
        };
        match self.replace_in(base_tree.as_ref(), prefix.components(), subtree)? {
            Some(oid) => Ok(oid),
            None => Ok(self.repo.treebuilder(None)?.write()?),
        }
    }

    fn replace_in(
        &self,
        base: Option<&Tree<'_>>,
        components: &[String],
        subtree: Option<Oid>,
    ) -> StoreResult<Option<Oid>> {
        let Some((head, rest)) = components.split_first() else {
            return Ok(subtree);
        };

        let child_base = match base.and_then(|tree| tree.get_name(head.as_str())) {
            Some(entry) if entry.kind() == Some(ObjectType::Tree) => {
                Some(self.repo.find_tree(entry.id())?)
            }
            _ => None,
        };
        let new_child = self.replace_in(child_base.as_ref(), rest, subtree)?;

        let mut builder = self.repo.treebuilder(base)?;
        match new_child {
            Some(oid) => {
                builder.insert(head.as_str(), oid, i32::from(FileMode::Tree))?;
            }
            None => {
                if builder.get(head.as_str())?.is_some() {
                    builder.remove(head.as_str())?;
                }
            }
        }

        if builder.len() == 0 {
            Ok(None)
        } else {
            Ok(Some(builder.write()?))
        }
    }

    pub fn commit_tree(&self, commit: Oid) -> StoreResult<Oid> {
        Ok(self.repo.find_commit(commit)?.tree_id())
    }

    /// Create a commit for `tree` without updating any reference
    pub fn commit_snapshot(
        &self,
        parent: Option<Oid>,
        tree: Oid,
        message: &str,
        author: &CommitAuthor,
    ) -> StoreResult<Oid> {
        let signature = self.signature(author)?;
        let tree = self.repo.find_tree(tree)?;
        let parents = match parent {
            Some(oid) => vec![self.repo.find_commit(oid)?],
            None => Vec::new(),
        };
        let parent_refs: Vec<_> = parents.iter().collect();
        let oid = self
            .repo
            .commit(None, &signature, &signature, message, &tree, &parent_refs)
            .with_git_error("Failed to create snapshot commit")?;
        debug!(commit = %oid, "Created snapshot commit");
        Ok(oid)
    }

    fn signature(&self, author: &CommitAuthor) -> StoreResult<Signature<'static>> {
        let configured = self.repo.signature().ok();
        let name = author
            .name
            .clone()
            .or_else(|| configured.as_ref().and_then(|s| s.name().map(String::from)))
            .unwrap_or_else(|| DEFAULT_AUTHOR_NAME.to_string());
        let email = author
            .email
            .clone()
            .or_else(|| configured.as_ref().and_then(|s| s.email().map(String::from)))
            .unwrap_or_else(|| DEFAULT_AUTHOR_EMAIL.to_string());
        Signature::now(&name, &email).with_git_error("Invalid commit author")
    }

    /// Create a lightweight tag; an existing tag with the same name is a collision
    pub fn create_tag(&self, tag: &TagName, commit: Oid) -> StoreResult<()> {
        match self
            .repo
            .reference(&tag.reference(), commit, false, "assets-store: snapshot")
        {
            Ok(_) => Ok(()),
            Err(e) if e.code() == ErrorCode::Exists => Err(StoreError::push_rejected(
                tag.as_str(),
                "a tag with this name already exists",
            )),
            Err(e) => Err(StoreError::git_error_with_source(
                format!("Failed to create tag '{}'", tag),
                e,
            )),
        }
    }

    /// Delete a local tag if present
    pub fn delete_tag(&self, tag: &TagName) -> StoreResult<()> {
        match self.repo.find_reference(&tag.reference()) {
            Ok(mut reference) => reference
                .delete()
                .with_git_error(format!("Failed to delete tag '{}'", tag)),
            Err(e) if e.code() == ErrorCode::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
