use crate::git;
use crate::runner::CommandRunner;
use crate::status::{ChangeKind, FileChange};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// result of a staging pass
///
/// a failure on one file never stops the others, so a report can carry both
/// staged files and failures
#[derive(Debug, Default, PartialEq, Eq)]
pub struct StageReport {
    /// human-readable description of each staged change
    pub staged: Vec<String>,
    pub failures: Vec<String>,
    /// things worth a second look, like a path recovered by name similarity
    pub warnings: Vec<String>,
    /// selection indices that didn't point at a change
    pub skipped: Vec<usize>,
}

impl StageReport {
    pub fn staged_count(&self) -> usize {
        self.staged.len()
    }
}

/// stage the selected changes
///
/// deletions go first, then renames, then everything else. indices outside
/// `changes` are reported in `skipped` and otherwise ignored.
pub fn stage_files(
    runner: &dyn CommandRunner,
    repo: &Path,
    changes: &[FileChange],
    selected: &[usize],
) -> StageReport {
    let mut report = StageReport::default();
    let mut seen = HashSet::new();

    let mut deletions = Vec::new();
    let mut renames = Vec::new();
    let mut remainder = Vec::new();
    for &idx in selected {
        let Some(change) = changes.get(idx) else {
            report.skipped.push(idx);
            continue;
        };
        if !seen.insert(idx) {
            continue;
        }
        match change.kind() {
            ChangeKind::Renamed => renames.push(change),
            _ if change.is_deletion() => deletions.push(change),
            _ => remainder.push(change),
        }
    }

    for change in deletions.iter().chain(&renames).chain(&remainder) {
        crate::debug!("staging {}", change.to_porcelain_line());
    }

    for change in deletions {
        stage_deletion(runner, repo, change.filename(), &mut report);
    }
    for change in renames {
        match change.old_filename() {
            Some(old) => stage_rename(runner, repo, old, change.filename(), &mut report),
            None => report
                .failures
                .push(format!("rename of {} has no source path", change.filename())),
        }
    }
    for change in remainder {
        stage_path(runner, repo, change.filename(), &mut report);
    }

    report
}

fn stage_deletion(runner: &dyn CommandRunner, repo: &Path, path: &str, report: &mut StageReport) {
    let removed = git::remove_from_index(runner, repo, path);
    if removed.succeeded {
        report.staged.push(format!("deleted {path}"));
        return;
    }

    // the working tree sometimes disagrees with the status listing (file
    // restored since), in which case a plain add does the right thing
    let added = git::add(runner, repo, path);
    if added.succeeded {
        report.staged.push(path.to_string());
    } else {
        report.failures.push(format!(
            "failed to stage deletion of {path}: {}",
            removed.output
        ));
    }
}

fn stage_rename(
    runner: &dyn CommandRunner,
    repo: &Path,
    old: &str,
    new: &str,
    report: &mut StageReport,
) {
    let removed = git::remove_from_index(runner, repo, old);
    let added = git::add(runner, repo, new);
    if removed.succeeded && added.succeeded {
        report.staged.push(format!("{old} → {new}"));
        return;
    }

    let reason = if removed.succeeded {
        added.output
    } else {
        removed.output
    };
    report
        .failures
        .push(format!("failed to stage rename {old} → {new}: {reason}"));
}

fn stage_path(runner: &dyn CommandRunner, repo: &Path, expected: &str, report: &mut StageReport) {
    // a backslash is an ordinary filename character outside windows
    let expected = if cfg!(windows) {
        expected.replace('\\', "/")
    } else {
        expected.to_string()
    };

    let target = if repo.join(&expected).symlink_metadata().is_ok() {
        expected.clone()
    } else if let Some((found, candidates)) = find_similar_file(repo, &expected) {
        report.warnings.push(format!(
            "{expected} not found, staging {found} instead (first of {candidates} similar)"
        ));
        found
    } else {
        // let git decide whether the path means anything
        expected.clone()
    };

    let result = git::add(runner, repo, &target);
    if result.succeeded {
        report.staged.push(target);
    } else if target == expected {
        report
            .failures
            .push(format!("failed to stage {expected}: {}", result.output));
    } else {
        report.failures.push(format!(
            "failed to stage {target} (for {expected}): {}",
            result.output
        ));
    }
}

/// look next to `expected` for a file with the same extension whose stem
/// contains, or is contained in, the expected stem (ignoring case)
///
/// returns the first candidate in name order plus the number of candidates
pub fn find_similar_file(repo: &Path, expected: &str) -> Option<(String, usize)> {
    let expected = Path::new(expected);
    let parent = expected.parent().unwrap_or_else(|| Path::new(""));
    let stem = expected.file_stem()?.to_string_lossy().to_lowercase();
    if stem.is_empty() {
        return None;
    }
    let extension = expected.extension();

    let entries = fs::read_dir(repo.join(parent)).ok()?;
    let mut matches: Vec<String> = entries
        .flatten()
        .filter(|entry| entry.file_type().is_ok_and(|t| t.is_file()))
        .filter_map(|entry| {
            let path = entry.path();
            if path.extension() != extension {
                return None;
            }
            let candidate = path.file_stem()?.to_string_lossy().to_lowercase();
            if candidate.contains(&stem) || stem.contains(&candidate) {
                Some(entry.file_name().to_string_lossy().into_owned())
            } else {
                None
            }
        })
        .collect();
    matches.sort();

    let first = matches.first()?;
    let relative = parent.join(first).to_string_lossy().replace('\\', "/");
    Some((relative, matches.len()))
}
