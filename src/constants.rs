// commit message
pub const MAX_SUBJECT_LENGTH: usize = 72;
pub const FALLBACK_COMMIT_MESSAGE: &str = "chore: update files";

// git
pub const GIT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_REMOTE: &str = "origin";

// ui
pub const MAX_FILES_TO_SHOW: usize = 25;
pub const SPINNER_TICK_MILLIS: u64 = 100;

// generation
pub const MAX_DIFF_CHARS: usize = 3000;
pub const HTTP_TIMEOUT_SECS: u64 = 30;
pub const DIFF_SIZE_WARNING_BYTES: usize = 50 * 1024;

// settings
pub const MAX_RECENT_REPOS: usize = 10;
pub const SETTINGS_FILE_NAME: &str = "settings.json";
pub const APP_DIR_NAME: &str = "ai-commit";
