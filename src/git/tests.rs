use super::fixtures::{commit_all, commit_count, create_file, setup_test_repo};
use super::*;
use crate::runner::GitRunner;
use crate::status::ChangeKind;
use std::fs;
use tempfile::TempDir;

#[test]
fn test_is_repository() {
    let (temp_dir, _repo) = setup_test_repo();
    assert!(is_repository(temp_dir.path()));

    let plain = TempDir::new().unwrap();
    assert!(!is_repository(plain.path()));
}

#[test]
fn test_sanity_check() {
    let (temp_dir, _repo) = setup_test_repo();
    assert!(sanity_check(temp_dir.path()).is_ok());

    let plain = TempDir::new().unwrap();
    let err = sanity_check(plain.path()).unwrap_err();
    assert!(err.to_string().starts_with("not a git repository"));
}

#[test]
fn test_status_lists_untracked_and_modified() {
    let (temp_dir, repo) = setup_test_repo();
    let repo_path = temp_dir.path();

    create_file(&repo_path.join("tracked.txt"), "one");
    commit_all(&repo, "initial commit");

    create_file(&repo_path.join("tracked.txt"), "two");
    create_file(&repo_path.join("untracked.txt"), "new");

    let files = status(&GitRunner::new(), repo_path).unwrap();
    assert_eq!(files.len(), 2);
    assert_eq!(files[0].status(), " M");
    assert_eq!(files[0].filename(), "tracked.txt");
    assert_eq!(files[1].status(), "??");
    assert_eq!(files[1].filename(), "untracked.txt");
}

#[test]
fn test_status_detects_staged_rename() {
    let (temp_dir, repo) = setup_test_repo();
    let repo_path = temp_dir.path();
    let runner = GitRunner::new();

    create_file(&repo_path.join("old_name.txt"), "file content\nwith lines\n");
    commit_all(&repo, "initial commit");

    fs::rename(
        repo_path.join("old_name.txt"),
        repo_path.join("new_name.txt"),
    )
    .unwrap();
    assert!(runner.run(&["add", "--all"], repo_path).succeeded);

    let files = status(&runner, repo_path).unwrap();
    assert_eq!(files.len(), 1, "rename detected as single operation");
    assert_eq!(files[0].kind(), ChangeKind::Renamed);
    assert_eq!(files[0].filename(), "new_name.txt");
    assert_eq!(files[0].old_filename(), Some("old_name.txt"));
}

#[test]
fn test_status_outside_repository_fails() {
    let plain = TempDir::new().unwrap();
    let err = status(&GitRunner::new(), plain.path()).unwrap_err();
    assert!(err.starts_with("failed to get status"));
}

#[test]
fn test_has_changes() {
    let (temp_dir, repo) = setup_test_repo();
    let repo_path = temp_dir.path();
    let runner = GitRunner::new();

    create_file(&repo_path.join("a.txt"), "a");
    assert!(has_changes(&runner, repo_path));

    commit_all(&repo, "initial commit");
    assert!(!has_changes(&runner, repo_path));
}

#[test]
fn test_staged_diff() {
    let (temp_dir, repo) = setup_test_repo();
    let repo_path = temp_dir.path();
    let runner = GitRunner::new();

    create_file(&repo_path.join("a.txt"), "a\n");
    commit_all(&repo, "initial commit");
    assert_eq!(staged_diff(&runner, repo_path).unwrap(), "");

    create_file(&repo_path.join("a.txt"), "b\n");
    assert!(add(&runner, repo_path, "a.txt").succeeded);

    let diff = staged_diff(&runner, repo_path).unwrap();
    assert!(diff.starts_with("diff --git a/a.txt b/a.txt"));
    assert!(diff.contains("-a"));
    assert!(diff.contains("+b"));
}

#[test]
fn test_remove_from_index_is_idempotent() {
    let (temp_dir, repo) = setup_test_repo();
    let repo_path = temp_dir.path();
    let runner = GitRunner::new();

    create_file(&repo_path.join("gone.txt"), "bye");
    commit_all(&repo, "initial commit");
    fs::remove_file(repo_path.join("gone.txt")).unwrap();

    assert!(remove_from_index(&runner, repo_path, "gone.txt").succeeded);
    assert!(remove_from_index(&runner, repo_path, "gone.txt").succeeded);

    let files = status(&runner, repo_path).unwrap();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].status(), "D ");
}

#[test]
fn test_commit_and_current_branch() {
    let (temp_dir, repo) = setup_test_repo();
    let repo_path = temp_dir.path();
    let runner = GitRunner::new();

    create_file(&repo_path.join("a.txt"), "a");
    assert!(add(&runner, repo_path, "a.txt").succeeded);
    let result = commit(&runner, repo_path, "feat: add a");
    assert!(result.succeeded, "commit failed: {}", result.output);
    assert_eq!(commit_count(&repo), 1);

    let head = repo.head().unwrap().peel_to_commit().unwrap();
    assert_eq!(head.message(), Some("feat: add a\n"));

    let branch = current_branch(&runner, repo_path);
    assert!(branch.succeeded);
    assert!(!branch.output.is_empty());
}

#[test]
fn test_commit_with_nothing_staged_fails() {
    let (temp_dir, repo) = setup_test_repo();
    let repo_path = temp_dir.path();

    create_file(&repo_path.join("a.txt"), "a");
    commit_all(&repo, "initial commit");

    let result = commit(&GitRunner::new(), repo_path, "nothing here");
    assert!(!result.succeeded);
    assert_eq!(commit_count(&repo), 1);
}
