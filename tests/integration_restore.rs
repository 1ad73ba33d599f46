//! Restore: exact export of a tag's tree into the working directory

mod common;

use assets_store::{FixedConfirmation, StoreError};
use common::test_fixtures::{RemoteFixture, BASELINE_TAG, PREFIX, TAG_PREFIX};
use common::test_helpers::FileSystemHelper;
use std::sync::Arc;

#[tokio::test]
async fn test_restore_exports_exact_tree() {
    let fixture = RemoteFixture::with_baseline();
    let pointer = fixture.write_pointer("project", PREFIX, TAG_PREFIX, BASELINE_TAG);
    let store = fixture.store("store", Arc::new(FixedConfirmation::no()));

    let outcome = store.restore(&pointer).await.unwrap();
    assert_eq!(outcome.stats.written, 3);
    assert_tree_eq!(
        outcome.working_dir,
        [("file1.txt", "v1"), ("file2.txt", "v1"), ("file3.txt", "v1")]
    );
}

#[tokio::test]
async fn test_restore_overwrites_local_changes_and_removes_extras() {
    let fixture = RemoteFixture::with_baseline();
    let pointer = fixture.write_pointer("project", PREFIX, TAG_PREFIX, BASELINE_TAG);
    let store = fixture.store("store", Arc::new(FixedConfirmation::no()));
    let dir = store.restore(&pointer).await.unwrap().working_dir;

    FileSystemHelper::write(&dir, "file1.txt", "v2");
    FileSystemHelper::remove(&dir, "file2.txt");
    FileSystemHelper::write(&dir, "extra/file4.txt", "v1");

    let outcome = store.restore(&pointer).await.unwrap();
    assert_eq!(outcome.stats.written, 2);
    assert_eq!(outcome.stats.removed, 1);
    assert_eq!(outcome.stats.unchanged, 1);
    assert_tree_eq!(
        dir,
        [("file1.txt", "v1"), ("file2.txt", "v1"), ("file3.txt", "v1")]
    );
    assert!(!dir.join("extra").exists());
}

#[tokio::test]
async fn test_restore_without_tag_leaves_empty_directory() {
    let fixture = RemoteFixture::new();
    let pointer = fixture.write_pointer("project", PREFIX, TAG_PREFIX, "");
    let store = fixture.store("store", Arc::new(FixedConfirmation::no()));

    let first = store.restore(&pointer).await.unwrap();
    assert!(first.tag.is_none());
    assert!(first.working_dir.is_dir());
    assert!(FileSystemHelper::read_tree(&first.working_dir).is_empty());

    FileSystemHelper::write(&first.working_dir, "stray.txt", "x");
    FileSystemHelper::write(&first.working_dir, "nested/stray.txt", "x");
    let second = store.restore(&pointer).await.unwrap();
    assert_eq!(second.stats.removed, 2);
    assert!(second.working_dir.is_dir());
    assert!(FileSystemHelper::read_tree(&second.working_dir).is_empty());
    assert!(!second.working_dir.join("nested").exists());

    // Nothing left for Reset to discard
    assert!(store.status(&pointer).await.unwrap().is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_restore_removes_symlinks() {
    let fixture = RemoteFixture::with_baseline();
    let pointer = fixture.write_pointer("project", PREFIX, TAG_PREFIX, BASELINE_TAG);
    let store = fixture.store("store", Arc::new(FixedConfirmation::no()));
    let dir = store.restore(&pointer).await.unwrap().working_dir;

    std::os::unix::fs::symlink(dir.join("file1.txt"), dir.join("stray_link")).unwrap();
    let status = store.status(&pointer).await.unwrap();
    assert_eq!(status.added, vec!["stray_link".to_string()]);

    let outcome = store.restore(&pointer).await.unwrap();
    assert_eq!(outcome.stats.removed, 1);
    assert!(std::fs::symlink_metadata(dir.join("stray_link")).is_err());
    assert!(store.status(&pointer).await.unwrap().is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn test_restore_does_not_follow_linked_directories() {
    let fixture = RemoteFixture::with_baseline();
    fixture.seed_tag(
        "python/storage_nested",
        PREFIX,
        &[("file1.txt", "v1"), ("nested/file5.txt", "v1")],
    );
    let pointer = fixture.write_pointer("project", PREFIX, TAG_PREFIX, BASELINE_TAG);
    let store = fixture.store("store", Arc::new(FixedConfirmation::no()));
    let dir = store.restore(&pointer).await.unwrap().working_dir;

    let outside = fixture.path().join("outside");
    std::fs::create_dir_all(&outside).unwrap();
    std::os::unix::fs::symlink(&outside, dir.join("nested")).unwrap();

    common::test_fixtures::set_pointer_tag(&pointer, "python/storage_nested");
    store.restore(&pointer).await.unwrap();

    assert!(!outside.join("file5.txt").exists());
    assert!(std::fs::symlink_metadata(dir.join("nested")).unwrap().is_dir());
    assert_tree_eq!(dir, [("file1.txt", "v1"), ("nested/file5.txt", "v1")]);
}

#[tokio::test]
async fn test_restore_unknown_tag_fails() {
    let fixture = RemoteFixture::with_baseline();
    let pointer = fixture.write_pointer("project", PREFIX, TAG_PREFIX, "python/storage_missing");
    let store = fixture.store("store", Arc::new(FixedConfirmation::no()));

    let result = store.restore(&pointer).await;
    assert_store_error!(result, StoreError::TagNotFound { .. });
}

#[tokio::test]
async fn test_restore_from_unreachable_remote_is_transient() {
    let fixture = RemoteFixture::with_baseline();
    let pointer = fixture.write_pointer_json(
        "project",
        r#"{"AssetsRepo":"owner/does-not-exist","AssetsRepoPrefixPath":"python","Tag":"t_0123456789"}"#,
    );
    let store = fixture.store("store", Arc::new(FixedConfirmation::no()));

    let error = store.restore(&pointer).await.unwrap_err();
    assert!(error.is_transient(), "unexpected error: {error:?}");
}

#[tokio::test]
async fn test_independent_stores_restore_identical_trees_concurrently() {
    let fixture = RemoteFixture::with_baseline();
    let pointer_a = fixture.write_pointer("a", PREFIX, TAG_PREFIX, BASELINE_TAG);
    let pointer_b = fixture.write_pointer("b", PREFIX, TAG_PREFIX, BASELINE_TAG);
    let store_a = fixture.store("a", Arc::new(FixedConfirmation::no()));
    let store_b = fixture.store("b", Arc::new(FixedConfirmation::no()));

    let (a, b) = tokio::join!(store_a.restore(&pointer_a), store_b.restore(&pointer_b));
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_ne!(a.working_dir, b.working_dir);
    assert_same_tree!(a.working_dir, b.working_dir);
    assert_eq!(FileSystemHelper::read_tree(&a.working_dir).len(), 3);
}

#[tokio::test]
async fn test_pointers_with_same_repository_share_one_clone() {
    let fixture = RemoteFixture::with_baseline();
    fixture.seed_tag("java/core_baseline", "java/core", &[("j.txt", "java")]);
    let python = fixture.write_pointer("python", PREFIX, TAG_PREFIX, BASELINE_TAG);
    let java = fixture.write_pointer("java", "java/core", "java/core", "java/core_baseline");
    let store = fixture.store("shared", Arc::new(FixedConfirmation::no()));

    let (python, java) = tokio::join!(store.restore(&python), store.restore(&java));
    let (python, java) = (python.unwrap(), java.unwrap());

    let clones: Vec<_> = std::fs::read_dir(fixture.path().join("stores").join("shared"))
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.path().join(".git").exists())
        .collect();
    assert_eq!(clones.len(), 1);
    assert!(python.working_dir.starts_with(clones[0].path()));
    assert!(java.working_dir.starts_with(clones[0].path()));
    assert_tree_eq!(java.working_dir, [("j.txt", "java")]);
}

#[tokio::test]
async fn test_repo_id_isolates_clones() {
    let fixture = RemoteFixture::with_baseline();
    let shared = fixture.write_pointer("shared", PREFIX, TAG_PREFIX, BASELINE_TAG);
    let isolated = fixture.write_pointer_json(
        "isolated",
        &serde_json::json!({
            "AssetsRepo": "owner/assets",
            "AssetsRepoPrefixPath": PREFIX,
            "AssetsRepoId": "isolated",
            "TagPrefix": TAG_PREFIX,
            "Tag": BASELINE_TAG,
        })
        .to_string(),
    );
    let store = fixture.store("store", Arc::new(FixedConfirmation::no()));

    let shared = store.restore(&shared).await.unwrap();
    let isolated = store.restore(&isolated).await.unwrap();
    assert_ne!(shared.working_dir, isolated.working_dir);
    assert_same_tree!(shared.working_dir, isolated.working_dir);
}
