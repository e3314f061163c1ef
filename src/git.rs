use crate::runner::{CommandResult, CommandRunner};
use crate::status::{FileChange, parse_status};
use anyhow::{Result, bail};
use git2::{Repository, RepositoryState};
use std::path::Path;

/// marker directory that identifies a repository root
pub const REPO_MARKER: &str = ".git";

pub fn is_repository(path: &Path) -> bool {
    path.join(REPO_MARKER).exists()
}

/// sanity check that the repository is in a state we can stage and commit in
pub fn sanity_check(path: &Path) -> Result<()> {
    let repo = match Repository::open(path) {
        Ok(repo) => repo,
        Err(e) => bail!("not a git repository: {}: {}", path.display(), e.message()),
    };

    // staging on top of a half-finished merge or rebase makes a mess
    if repo.state() != RepositoryState::Clean {
        bail!("repository is in the middle of an operation (merge, rebase, etc)");
    }

    if repo.head_detached().unwrap_or(false) {
        crate::warning!("repository is in detached HEAD state, pushing will fail");
    }

    Ok(())
}

/// changed files, in porcelain order
pub fn status(runner: &dyn CommandRunner, repo: &Path) -> Result<Vec<FileChange>, String> {
    let result = runner.run(&["status", "--porcelain"], repo);
    if result.succeeded {
        Ok(parse_status(&result.output))
    } else {
        Err(format!("failed to get status: {}", result.output))
    }
}

/// quick check used by the repository scanner
pub fn has_changes(runner: &dyn CommandRunner, repo: &Path) -> bool {
    let result = runner.run(&["status", "--porcelain"], repo);
    result.succeeded && !result.output.trim().is_empty()
}

/// diff of the index against HEAD; empty string when nothing is staged
pub fn staged_diff(runner: &dyn CommandRunner, repo: &Path) -> Result<String, String> {
    let result = runner.run(&["diff", "--cached"], repo);
    if result.succeeded {
        Ok(result.output.trim().to_string())
    } else {
        Err(format!("failed to get staged diff: {}", result.output))
    }
}

pub fn add(runner: &dyn CommandRunner, repo: &Path, path: &str) -> CommandResult {
    runner.run(&["add", "--", path], repo)
}

/// drop a path from the index, leaving the working tree alone
///
/// `--ignore-unmatch` makes an already-staged removal a no-op success
pub fn remove_from_index(runner: &dyn CommandRunner, repo: &Path, path: &str) -> CommandResult {
    runner.run(&["rm", "--cached", "--ignore-unmatch", "--", path], repo)
}

/// create a commit with the given message
///
/// uses the git binary rather than git2 so commit signing (gpg/ssh) and hooks
/// (pre-commit, commit-msg, etc.) behave as they do on the command line
pub fn commit(runner: &dyn CommandRunner, repo: &Path, message: &str) -> CommandResult {
    runner.run(&["commit", "--message", message], repo)
}

pub fn current_branch(runner: &dyn CommandRunner, repo: &Path) -> CommandResult {
    runner.run(&["branch", "--show-current"], repo)
}

pub fn push(runner: &dyn CommandRunner, repo: &Path, remote: &str, branch: &str) -> CommandResult {
    runner.run(&["push", remote, branch], repo)
}

pub fn set_user_name(runner: &dyn CommandRunner, repo: &Path, name: &str) -> CommandResult {
    runner.run(&["config", "user.name", name], repo)
}

#[cfg(test)]
pub(crate) mod fixtures;

#[cfg(test)]
mod tests;
