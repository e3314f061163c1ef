use super::{Provider, truncate_diff};
use crate::constants::MAX_DIFF_CHARS;

pub const SYSTEM_PROMPT: &str = "You are a helpful assistant that generates clear and concise git \
commit messages following the conventional commits format.";

const FORMAT_RULES: &str = r"
Format: <type>(<scope>): <subject>

Types: feat, fix, docs, style, refactor, test, chore
Use English, be concise. Return only the commit message.
";

/// single-turn prompt for Gemini
pub fn gemini(diff: &str) -> String {
    format!(
        "Generate a clear commit message following conventional commits format.\n\nGit diff:\n{diff}\n{}",
        FORMAT_RULES.trim_end()
    )
}

/// user turn for OpenAI, paired with `SYSTEM_PROMPT`
pub fn openai_user(diff: &str) -> String {
    format!(
        "Generate a commit message for the following changes:\n\n{diff}\n{}",
        FORMAT_RULES.trim_end()
    )
}

/// the prompt that would be sent, for `--debug-prompt`
pub fn preview(provider: Provider, diff: &str) -> String {
    let diff = truncate_diff(diff, MAX_DIFF_CHARS);
    match provider {
        Provider::Gemini => gemini(diff),
        Provider::OpenAi => format!("[system]\n{SYSTEM_PROMPT}\n\n[user]\n{}", openai_user(diff)),
    }
}
