use crate::constants::{DEFAULT_REMOTE, MAX_SUBJECT_LENGTH};
use crate::git;
use crate::runner::CommandRunner;
use std::path::Path;

/// how and where to push after committing
#[derive(Debug, Clone)]
pub struct PushOptions {
    pub remote: String,
    /// written to the repository's `user.name` before pushing, when set
    pub github_username: Option<String>,
}

impl Default for PushOptions {
    fn default() -> Self {
        Self {
            remote: DEFAULT_REMOTE.to_string(),
            github_username: None,
        }
    }
}

/// where a commit/push sequence ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// nothing changed
    CommitFailed(String),
    /// committed, push not requested
    Committed,
    /// committed, but the branch to push couldn't be determined
    BranchLookupFailed(String),
    /// committed, push rejected or unreachable
    PushFailed { branch: String, error: String },
    Pushed { branch: String },
}

impl CommitOutcome {
    /// whether local history gained a commit
    pub fn commit_succeeded(&self) -> bool {
        !matches!(self, Self::CommitFailed(_))
    }

    /// whether everything that was asked for happened
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Committed | Self::Pushed { .. })
    }
}

/// commit, then optionally push the current branch
///
/// stops at the first failure. a commit that succeeded is never undone or
/// retried, so a failed push leaves local history ahead of the remote.
pub fn commit_and_push(
    runner: &dyn CommandRunner,
    repo: &Path,
    message: &str,
    push: Option<&PushOptions>,
) -> CommitOutcome {
    let committed = git::commit(runner, repo, message);
    if !committed.succeeded {
        return CommitOutcome::CommitFailed(committed.output);
    }

    let Some(options) = push else {
        return CommitOutcome::Committed;
    };

    if let Some(username) = options.github_username.as_deref().filter(|u| !u.is_empty()) {
        let configured = git::set_user_name(runner, repo, username);
        if !configured.succeeded {
            crate::warning!("failed to set user.name: {}", configured.output);
        }
    }

    // looked up every time, the checkout may have moved since the commit
    let branch = git::current_branch(runner, repo);
    if !branch.succeeded {
        return CommitOutcome::BranchLookupFailed(branch.output);
    }
    let branch = branch.output.trim().to_string();
    if branch.is_empty() {
        return CommitOutcome::BranchLookupFailed("HEAD is detached".to_string());
    }

    let pushed = git::push(runner, repo, &options.remote, &branch);
    if pushed.succeeded {
        CommitOutcome::Pushed { branch }
    } else {
        CommitOutcome::PushFailed {
            branch,
            error: pushed.output,
        }
    }
}

const CONVENTIONAL_TYPES: &[&str] = &[
    "feat", "fix", "docs", "style", "refactor", "test", "chore", "perf", "build", "ci", "revert",
];

/// complaints about the subject line, worded for the user; empty when it's fine
pub fn subject_issues(message: &str) -> Vec<String> {
    let subject = message.lines().next().unwrap_or("").trim_end();
    let mut issues = Vec::new();

    let length = subject.chars().count();
    if length > MAX_SUBJECT_LENGTH {
        issues.push(format!(
            "subject line is {length} chars, longer than {MAX_SUBJECT_LENGTH}"
        ));
    }
    if !is_conventional(subject) {
        issues.push("subject doesn't look like `<type>(<scope>): <subject>`".to_string());
    }
    issues
}

fn is_conventional(subject: &str) -> bool {
    let Some((head, description)) = subject.split_once(':') else {
        return false;
    };
    if !description.starts_with(' ') || description.trim().is_empty() {
        return false;
    }

    let head = head.strip_suffix('!').unwrap_or(head);
    let kind = match head.split_once('(') {
        Some((kind, scope)) => match scope.strip_suffix(')') {
            Some(scope) if !scope.is_empty() && !scope.contains(['(', ')']) => kind,
            _ => return false,
        },
        None => head,
    };
    CONVENTIONAL_TYPES.contains(&kind)
}
