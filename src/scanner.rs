use crate::git;
use crate::runner::CommandRunner;
use anyhow::{Context, Result, bail};
use git2::Repository;
use std::fs;
use std::path::{Path, PathBuf};

const PENDING_INDICATOR: &str = "●";
const CLEAN_INDICATOR: &str = "○";

/// a repository found under the parent folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoEntry {
    pub name: String,
    pub path: PathBuf,
    pub has_pending_changes: bool,
    pub display_label: String,
}

impl RepoEntry {
    fn new(name: String, path: PathBuf, has_pending_changes: bool, is_current: bool) -> Self {
        let indicator = if has_pending_changes {
            PENDING_INDICATOR
        } else {
            CLEAN_INDICATOR
        };
        let mut display_label = format!("{indicator} {name}");
        if is_current {
            display_label.push_str(" (current)");
        }
        Self {
            name,
            path,
            has_pending_changes,
            display_label,
        }
    }
}

/// list the repositories directly under `parent`, sorted by name
///
/// hidden directories are skipped, as is anything we can't stat. a missing
/// parent yields an empty list; an unreadable one is an error.
pub fn scan_repositories(
    runner: &dyn CommandRunner,
    parent: &Path,
    current_dir: Option<&Path>,
) -> Result<Vec<RepoEntry>> {
    if !parent.exists() {
        return Ok(Vec::new());
    }

    let entries =
        fs::read_dir(parent).with_context(|| format!("failed to read {}", parent.display()))?;
    let current_dir = current_dir.and_then(|d| d.canonicalize().ok());

    let mut candidates = Vec::new();
    for entry in entries {
        let Ok(entry) = entry else {
            continue;
        };
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') {
            continue;
        }
        let path = entry.path();
        // is_dir/exists swallow permission errors as false
        if path.is_dir() && git::is_repository(&path) {
            candidates.push((name, path));
        }
    }
    candidates.sort_by(|a, b| a.0.cmp(&b.0));

    let repos = candidates
        .into_iter()
        .map(|(name, path)| {
            let path = path.canonicalize().unwrap_or(path);
            let has_changes = git::has_changes(runner, &path);
            let is_current = current_dir.as_deref() == Some(path.as_path());
            RepoEntry::new(name, path, has_changes, is_current)
        })
        .collect();

    Ok(repos)
}

/// the index of the only repository with pending changes, when there is a
/// choice to make and exactly one obvious answer
pub fn sole_pending(repos: &[RepoEntry]) -> Option<usize> {
    if repos.len() < 2 {
        return None;
    }
    let mut pending = repos
        .iter()
        .enumerate()
        .filter(|(_, r)| r.has_pending_changes);
    match (pending.next(), pending.next()) {
        (Some((idx, _)), None) => Some(idx),
        _ => None,
    }
}

/// resolve an explicit `--dir` argument to a repository root
///
/// relative paths are taken from `cwd` (so `../sibling` works); a path inside a
/// repository resolves to that repository's working directory
pub fn resolve_target_dir(dir: &str, cwd: &Path) -> Result<PathBuf> {
    let joined = cwd.join(dir);
    let Ok(path) = joined.canonicalize() else {
        bail!("directory '{}' not found", dir);
    };
    if !path.is_dir() {
        bail!("'{}' is not a directory", dir);
    }
    if git::is_repository(&path) {
        return Ok(path);
    }

    match Repository::discover(&path) {
        Ok(repo) => match repo.workdir() {
            Some(workdir) => Ok(workdir.canonicalize().unwrap_or_else(|_| workdir.to_path_buf())),
            None => bail!("'{}' is a bare repository", dir),
        },
        Err(_) => bail!("'{}' is not a git repository", dir),
    }
}
