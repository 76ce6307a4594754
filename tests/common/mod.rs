// Shared helpers for integration tests
#![allow(dead_code)]

use git2::{Oid, Repository, Signature};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// Initialize an empty repository in a fresh temp dir
pub fn init_repo() -> (TempDir, Repository) {
    let temp_dir = TempDir::new().expect("Could not create temp dir");
    let repo = Repository::init(temp_dir.path()).expect("Could not init git repo");
    (temp_dir, repo)
}

/// Write README.md, stage it and commit on HEAD
pub fn commit_file(repo: &Repository, dir: &Path, content: &str, message: &str) -> Oid {
    fs::write(dir.join("README.md"), content).expect("Could not write file");

    let mut index = repo.index().expect("Could not get index");
    index
        .add_path(Path::new("README.md"))
        .expect("Could not add file to index");
    index.write().expect("Could not write index");

    let tree_id = index.write_tree().expect("Could not write tree");
    let tree = repo.find_tree(tree_id).expect("Could not find tree");
    let sig = Signature::now("Test User", "test@example.com").expect("Could not create signature");

    let parents = match repo.head() {
        Ok(head) => vec![head.peel_to_commit().expect("HEAD is not a commit")],
        Err(_) => vec![],
    };
    let parent_refs: Vec<&git2::Commit> = parents.iter().collect();

    repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
        .expect("Could not create commit")
}

pub fn tag(repo: &Repository, name: &str, commit: Oid) {
    let object = repo.find_object(commit, None).expect("Could not find commit");
    repo.tag_lightweight(name, &object, false)
        .expect("Could not create tag");
}

/// Repository with one commit tagged v1.0.0
pub fn setup_released_repo() -> (TempDir, Repository, Oid) {
    let (dir, repo) = init_repo();
    let commit = commit_file(&repo, dir.path(), "Initial content\n", "Initial commit");
    tag(&repo, "v1.0.0", commit);
    (dir, repo, commit)
}

pub fn short(oid: Oid) -> String {
    oid.to_string()[..7].to_string()
}

pub const CHANGELOG: &str = "# Changelog

## [1.0.0] - 2024-05-01

### Added

- first public release

## [0.9.0]

- preview
";

/// Packaging command writing one sdist and one per-cell wheel
pub fn build_command() -> Vec<String> {
    vec![
        "sh".to_string(),
        "-c".to_string(),
        concat!(
            "printf %s \"$RELEASE_VERSION\" > \"$RELEASE_OUT_DIR/$RELEASE_PACKAGE-$RELEASE_VERSION.tar.gz\" && ",
            "printf %s \"$RELEASE_AXIS_PYTHON\" > \"$RELEASE_OUT_DIR/$RELEASE_PACKAGE-$RELEASE_VERSION-$RELEASE_CELL.whl\""
        )
        .to_string(),
    ]
}
