use git2::Repository;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

/// initialise a repository at `path` with a local identity
pub fn init_repo(path: &Path) -> Repository {
    let repo = Repository::init(path).unwrap();

    // configure git user for commits, and keep any global signing setup out of it
    let mut config = repo.config().unwrap();
    config.set_str("user.name", "Test User").unwrap();
    config.set_str("user.email", "test@example.com").unwrap();
    config.set_bool("commit.gpgsign", false).unwrap();

    repo
}

/// helper to initialise a test git repository in a fresh temp dir
pub fn setup_test_repo() -> (TempDir, Repository) {
    let temp_dir = TempDir::new().unwrap();
    let repo = init_repo(temp_dir.path());
    (temp_dir, repo)
}

/// helper to create a file (and any missing parent directories)
pub fn create_file(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

/// helper to commit everything in the working tree
pub fn commit_all(repo: &Repository, message: &str) {
    let mut index = repo.index().unwrap();
    index
        .add_all(["*"].iter(), git2::IndexAddOption::DEFAULT, None)
        .unwrap();
    index.write().unwrap();

    let tree_id = index.write_tree().unwrap();
    let tree = repo.find_tree(tree_id).unwrap();
    let signature = repo.signature().unwrap();

    let parents: Vec<git2::Commit> = repo
        .head()
        .ok()
        .and_then(|h| h.peel_to_commit().ok())
        .into_iter()
        .collect();
    let parent_refs: Vec<&git2::Commit> = parents.iter().collect();

    repo.commit(
        Some("HEAD"),
        &signature,
        &signature,
        message,
        &tree,
        &parent_refs,
    )
    .unwrap();
}

/// number of commits reachable from HEAD
pub fn commit_count(repo: &Repository) -> usize {
    let mut walk = repo.revwalk().unwrap();
    if walk.push_head().is_err() {
        return 0;
    }
    walk.count()
}

/// paths currently in the index, sorted
pub fn index_paths(repo: &Repository) -> Vec<String> {
    let mut index = repo.index().unwrap();
    index.read(true).unwrap();
    let mut paths: Vec<String> = index
        .iter()
        .map(|entry| String::from_utf8_lossy(&entry.path).into_owned())
        .collect();
    paths.sort();
    paths
}
