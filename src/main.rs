mod cli;
mod commit;
mod constants;
mod controller;
mod generate;
mod git;
mod runner;
mod scanner;
mod settings;
mod stage;
mod status;
mod ui;

use crate::cli::{Cli, Command, ConfigAction};
use crate::commit::{CommitOutcome, PushOptions};
use crate::constants::{
    DIFF_SIZE_WARNING_BYTES, FALLBACK_COMMIT_MESSAGE, MAX_FILES_TO_SHOW, SPINNER_TICK_MILLIS,
};
use crate::controller::GenerationController;
use crate::generate::{GenerateError, HttpGenerator, Provider};
use crate::runner::{CommandRunner, GitRunner};
use crate::settings::{SettingKey, SettingsStore};
use crate::stage::StageReport;
use crate::status::FileChange;
use anyhow::{Context, Result, bail};
use indicatif::{ProgressBar, ProgressStyle};
use num_format::{Locale, ToFormattedString};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

fn main() {
    if let Err(e) = run() {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse_args();

    let settings_path = cli
        .config
        .clone()
        .unwrap_or_else(settings::default_settings_path);
    let mut store = SettingsStore::load(settings_path)?;
    ui::set_dark_mode(store.settings().dark_mode);

    if let Some(Command::Config { action }) = &cli.command {
        return run_config(&mut store, action);
    }

    if !std::io::stdin().is_terminal() || !std::io::stdout().is_terminal() {
        bail!("interactive terminal required");
    }

    let runner = GitRunner::new();
    let repo = select_repository(&runner, &cli, &store)?;
    if let Err(e) = store.add_recent_repo(&repo.to_string_lossy()) {
        warning!("failed to update recent repositories: {:#}", e);
    }

    status!("repository: {}", repo.display());
    git::sanity_check(&repo)?;

    let changes = git::status(&runner, &repo).map_err(anyhow::Error::msg)?;
    if changes.is_empty() {
        bail!("no changes found in {}", repo.display());
    }
    // `-a` stages everything without asking, so a summary is enough
    let limit = cli.all.then_some(MAX_FILES_TO_SHOW);
    display_changes(&changes, limit);

    let selected = select_changes(&cli, changes.len())?;
    let report = stage::stage_files(&runner, &repo, &changes, &selected);
    display_stage_report(&report);
    if report.staged_count() == 0 {
        bail!("nothing was staged");
    }

    let diff = git::staged_diff(&runner, &repo).map_err(anyhow::Error::msg)?;
    if diff.is_empty() {
        bail!("no staged changes to commit");
    }
    if diff.len() > DIFF_SIZE_WARNING_BYTES {
        warning!(
            "staged diff is large ({} bytes), only the start is sent for generation",
            diff.len().to_formatted_string(&Locale::en)
        );
    }

    if cli.debug_prompt {
        status!("prompt:");
        for line in generate::prompt_preview(cli.provider, &diff).lines() {
            info!("> {}", line);
        }
        info!();
    }

    let Some(message) = compose_message(&cli, &store, &diff)? else {
        status!("nothing committed, changes are left staged");
        return Ok(());
    };

    for issue in commit::subject_issues(&message) {
        warning!("{}", issue);
    }

    let settings = store.settings();
    let push_options = PushOptions {
        github_username: Some(settings.github_username.clone()).filter(|u| !u.trim().is_empty()),
        ..PushOptions::default()
    };
    let push = (!cli.no_push && settings.auto_push).then_some(&push_options);

    status!("committing...");
    let outcome = commit::commit_and_push(&runner, &repo, &message, push);
    report_outcome(&outcome)
}

fn run_config(store: &mut SettingsStore, action: &ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Path => info!("{}", store.path().display()),
        ConfigAction::Show => {
            status!("settings ({}):", store.path().display());
            for (key, value) in store.settings().display_entries() {
                info!("  {}: {}", key, value);
            }
            let recent = &store.settings().recent_repos;
            if !recent.is_empty() {
                status!("recent repositories:");
                for path in recent {
                    info!("  {}", ui::secondary(path));
                }
            }
        }
        ConfigAction::Set { key, value } => {
            let key: SettingKey = key.parse()?;
            let provider = match key {
                SettingKey::GeminiModel => Some(Provider::Gemini),
                SettingKey::OpenAiModel => Some(Provider::OpenAi),
                _ => None,
            };
            if let Some(provider) = provider
                && !settings::is_known_model(provider, value.trim())
            {
                warning!(
                    "'{}' is not a known {} model, saving it anyway",
                    value.trim(),
                    provider.display_name()
                );
            }
            store.set(key, value)?;
            status!("{} updated", key);
        }
    }
    Ok(())
}

/// `--dir` if given, otherwise pick from the repositories under the parent folder
fn select_repository(runner: &dyn CommandRunner, cli: &Cli, store: &SettingsStore) -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    if let Some(dir) = &cli.dir {
        return scanner::resolve_target_dir(dir, &cwd);
    }

    let parent = cli
        .parent
        .clone()
        .unwrap_or_else(|| PathBuf::from(&store.settings().parent_folder));
    let repos = scanner::scan_repositories(runner, &parent, Some(&cwd))?;
    match repos.len() {
        0 => bail!(
            "no git repositories found in {} (change it with `ai-commit config set parent-folder <dir>`)",
            parent.display()
        ),
        1 => {
            status!("using {}", repos[0].name);
            return Ok(repos[0].path.clone());
        }
        _ => {}
    }

    if let Some(idx) = scanner::sole_pending(&repos) {
        status!("only {} has pending changes, use it?", repos[idx].name);
        if ui::prompt(&["YES", "no"])? == 'y' {
            return Ok(repos[idx].path.clone());
        }
    }

    status!("repositories in {}:", parent.display());
    for (i, repo) in repos.iter().enumerate() {
        info!("{:>3}. {}", i + 1, repo.display_label);
    }
    loop {
        let answer = ui::read_line("repository number: ")?;
        match answer.parse::<usize>() {
            Ok(n) if (1..=repos.len()).contains(&n) => return Ok(repos[n - 1].path.clone()),
            _ => warning!("enter a number between 1 and {}", repos.len()),
        }
    }
}

/// numbered change listing; selection numbers refer to these lines, so when the
/// user is about to choose from them nothing may be left out
fn display_changes(changes: &[FileChange], limit: Option<usize>) {
    status!("changes:");
    for line in change_listing(changes, limit) {
        info!("{}", line);
    }
    info!();
}

fn change_listing(changes: &[FileChange], limit: Option<usize>) -> Vec<String> {
    let shown = limit.unwrap_or(changes.len()).min(changes.len());
    let mut lines: Vec<String> = changes
        .iter()
        .take(shown)
        .enumerate()
        .map(|(i, change)| {
            let path = match change.old_filename() {
                Some(old) => format!("{old} → {}", change.filename()),
                None => change.filename().to_string(),
            };
            format!(
                "{:>3}. {} {:<8} {}",
                i + 1,
                change.status(),
                ui::secondary(change.label()),
                path
            )
        })
        .collect();
    if changes.len() > shown {
        lines.push(format!("(+{} more)", changes.len() - shown));
    }
    lines
}

/// indices of the changes to stage
fn select_changes(cli: &Cli, count: usize) -> Result<Vec<usize>> {
    let all: Vec<usize> = (0..count).collect();
    if cli.all {
        return Ok(all);
    }

    status!("stage all {} changes?", count);
    match ui::prompt(&["YES", "no", "select"])? {
        'y' => Ok(all),
        's' => loop {
            let answer = ui::read_line("changes to stage (e.g. 1,3,5-7): ")?;
            match ui::parse_selection(&answer) {
                Ok(indices) => return Ok(indices),
                Err(e) => warning!("{}", e),
            }
        },
        _ => bail!("aborted"),
    }
}

fn display_stage_report(report: &StageReport) {
    for warning in &report.warnings {
        warning!("{}", warning);
    }
    for failure in &report.failures {
        error!("{}", failure);
    }
    for idx in &report.skipped {
        warning!("ignoring selection {}, there is no such change", idx + 1);
    }
    let file_word = if report.staged_count() == 1 {
        "file"
    } else {
        "files"
    };
    status!("staged {} {}", report.staged_count(), file_word);
    for staged in &report.staged {
        info!("  {}", ui::secondary(staged));
    }
}

/// the message to commit with, or `None` when the user backs out
fn compose_message(cli: &Cli, store: &SettingsStore, diff: &str) -> Result<Option<String>> {
    if let Some(message) = &cli.message {
        let message = message.trim();
        if message.is_empty() {
            bail!("empty commit message");
        }
        return Ok(Some(message.to_string()));
    }

    let generator = HttpGenerator::from_settings(store.settings());
    let mut controller = GenerationController::new(Arc::new(generator));
    let mut message = generate(&mut controller, diff, cli.provider)?;

    loop {
        info!();
        for line in message.lines() {
            info!("{}", line);
        }
        info!();

        match ui::prompt(&["YES", "no", "edit", "reroll"])? {
            'y' => return Ok(Some(message)),
            'e' => {
                let edited = if message.contains('\n') {
                    ui::edit_multi_line(&message)?
                } else {
                    ui::edit_one_line(&message)?
                };
                if edited.is_empty() {
                    warning!("empty message, keeping the previous one");
                } else {
                    message = edited;
                }
            }
            'r' => message = generate(&mut controller, diff, cli.provider)?,
            _ => return Ok(None),
        }
    }
}

/// generate a message on the worker thread with a spinner running; on failure
/// the user can retry, take the fallback message or give up
fn generate(controller: &mut GenerationController, diff: &str, provider: Provider) -> Result<String> {
    loop {
        controller.dispatch(diff.to_string(), provider)?;

        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(format!("asking {}...", provider.display_name()));
        spinner.enable_steady_tick(Duration::from_millis(SPINNER_TICK_MILLIS));

        let result = controller
            .wait(Duration::from_millis(SPINNER_TICK_MILLIS))
            .unwrap_or(Err(GenerateError::WorkerLost));
        spinner.finish_and_clear();

        match result {
            Ok(message) => return Ok(message),
            Err(e) => {
                error!("{}", e);
                match ui::prompt(&["retry", "fallback", "abort"])? {
                    'r' => {}
                    'f' => return Ok(FALLBACK_COMMIT_MESSAGE.to_string()),
                    _ => bail!("aborted"),
                }
            }
        }
    }
}

fn report_outcome(outcome: &CommitOutcome) -> Result<()> {
    match outcome {
        CommitOutcome::CommitFailed(error) => error!("commit failed: {}", error),
        CommitOutcome::Committed => status!("committed"),
        CommitOutcome::BranchLookupFailed(error) => {
            warning!("committed, but not pushed: couldn't determine branch: {}", error);
        }
        CommitOutcome::PushFailed { branch, error } => {
            warning!("committed, but pushing {} failed:", branch);
            for line in error.lines() {
                info!("  {}", ui::secondary(line));
            }
        }
        CommitOutcome::Pushed { branch } => status!("committed and pushed {}", branch),
    }

    if !outcome.commit_succeeded() {
        bail!("nothing committed");
    }
    if !outcome.is_complete() {
        info!("{}", ui::secondary("the commit is kept locally, push it with `git push`"));
    }
    Ok(())
}
