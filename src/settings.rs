use crate::constants::{APP_DIR_NAME, MAX_RECENT_REPOS, SETTINGS_FILE_NAME};
use crate::generate::Provider;
use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const GEMINI_MODELS: &[&str] = &[
    "gemini-2.5-pro",
    "gemini-2.5-flash",
    "gemini-2.5-flash-lite",
    "gemini-2.0-flash",
    "gemini-2.0-flash-lite",
    "gemini-1.5-pro",
    "gemini-1.5-flash",
];

pub const OPENAI_MODELS: &[&str] = &[
    "gpt-5",
    "gpt-5-mini",
    "gpt-5-nano",
    "gpt-4.1",
    "gpt-4.1-mini",
    "gpt-4.1-nano",
    "gpt-4o",
    "gpt-4o-mini",
    "gpt-4",
    "gpt-3.5-turbo",
    "o1",
    "o1-mini",
    "o3",
    "o3-mini",
    "o4-mini",
];

/// user configuration, stored as a flat JSON object
///
/// every field has a default, so a file with missing keys loads cleanly
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub gemini_api_key: String,
    pub openai_api_key: String,
    pub gemini_model: String,
    pub openai_model: String,
    pub github_username: String,
    pub github_token: String,
    /// folder whose immediate children are scanned for repositories
    pub parent_folder: String,
    /// most recent first, at most `MAX_RECENT_REPOS`
    pub recent_repos: Vec<String>,
    pub auto_push: bool,
    pub dark_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            gemini_api_key: String::new(),
            openai_api_key: String::new(),
            gemini_model: "gemini-2.5-flash".to_string(),
            openai_model: "gpt-4o-mini".to_string(),
            github_username: String::new(),
            github_token: String::new(),
            parent_folder: dirs::home_dir()
                .map(|p| p.to_string_lossy().into_owned())
                .unwrap_or_else(|| ".".to_string()),
            recent_repos: Vec::new(),
            auto_push: true,
            dark_mode: false,
        }
    }
}

impl Settings {
    /// move `path` to the front of the recent list
    pub fn push_recent_repo(&mut self, path: &str) {
        self.recent_repos.retain(|p| p != path);
        self.recent_repos.insert(0, path.to_string());
        self.recent_repos.truncate(MAX_RECENT_REPOS);
    }

    /// stored key, or the provider's environment variable when none is stored
    pub fn api_key(&self, provider: Provider) -> Option<String> {
        let stored = match provider {
            Provider::Gemini => &self.gemini_api_key,
            Provider::OpenAi => &self.openai_api_key,
        };
        if !stored.trim().is_empty() {
            return Some(stored.trim().to_string());
        }
        std::env::var(provider.api_key_env())
            .ok()
            .filter(|k| !k.trim().is_empty())
    }

    pub fn model(&self, provider: Provider) -> &str {
        match provider {
            Provider::Gemini => &self.gemini_model,
            Provider::OpenAi => &self.openai_model,
        }
    }

    fn apply(&mut self, key: SettingKey, value: &str) -> Result<()> {
        let value = value.trim();
        match key {
            SettingKey::GeminiApiKey => self.gemini_api_key = value.to_string(),
            SettingKey::OpenAiApiKey => self.openai_api_key = value.to_string(),
            SettingKey::GeminiModel => self.gemini_model = value.to_string(),
            SettingKey::OpenAiModel => self.openai_model = value.to_string(),
            SettingKey::GithubUsername => self.github_username = value.to_string(),
            SettingKey::GithubToken => self.github_token = value.to_string(),
            SettingKey::ParentFolder => self.parent_folder = value.to_string(),
            SettingKey::AutoPush => self.auto_push = parse_bool(value)?,
            SettingKey::DarkMode => self.dark_mode = parse_bool(value)?,
        }
        Ok(())
    }

    /// (key, printable value) pairs with secrets masked
    pub fn display_entries(&self) -> Vec<(SettingKey, String)> {
        SettingKey::ALL
            .iter()
            .map(|&key| {
                let value = match key {
                    SettingKey::GeminiApiKey => mask(&self.gemini_api_key),
                    SettingKey::OpenAiApiKey => mask(&self.openai_api_key),
                    SettingKey::GithubToken => mask(&self.github_token),
                    SettingKey::GeminiModel => self.gemini_model.clone(),
                    SettingKey::OpenAiModel => self.openai_model.clone(),
                    SettingKey::GithubUsername => self.github_username.clone(),
                    SettingKey::ParentFolder => self.parent_folder.clone(),
                    SettingKey::AutoPush => self.auto_push.to_string(),
                    SettingKey::DarkMode => self.dark_mode.to_string(),
                };
                (key, value)
            })
            .collect()
    }
}

/// the user-settable keys, spelled kebab-case on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    GeminiApiKey,
    OpenAiApiKey,
    GeminiModel,
    OpenAiModel,
    GithubUsername,
    GithubToken,
    ParentFolder,
    AutoPush,
    DarkMode,
}

impl SettingKey {
    pub const ALL: [SettingKey; 9] = [
        SettingKey::GeminiApiKey,
        SettingKey::OpenAiApiKey,
        SettingKey::GeminiModel,
        SettingKey::OpenAiModel,
        SettingKey::GithubUsername,
        SettingKey::GithubToken,
        SettingKey::ParentFolder,
        SettingKey::AutoPush,
        SettingKey::DarkMode,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SettingKey::GeminiApiKey => "gemini-api-key",
            SettingKey::OpenAiApiKey => "openai-api-key",
            SettingKey::GeminiModel => "gemini-model",
            SettingKey::OpenAiModel => "openai-model",
            SettingKey::GithubUsername => "github-username",
            SettingKey::GithubToken => "github-token",
            SettingKey::ParentFolder => "parent-folder",
            SettingKey::AutoPush => "auto-push",
            SettingKey::DarkMode => "dark-mode",
        }
    }
}

impl fmt::Display for SettingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SettingKey {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalised = s.trim().to_lowercase().replace('_', "-");
        match SettingKey::ALL.iter().find(|k| k.name() == normalised) {
            Some(&key) => Ok(key),
            None => {
                let known: Vec<&str> = SettingKey::ALL.iter().map(|k| k.name()).collect();
                bail!("unknown setting '{}' (known: {})", s, known.join(", "))
            }
        }
    }
}

/// a settings file on disk plus its parsed contents
///
/// every mutation is written straight back to the file, unless the file on
/// disk couldn't be parsed at all; that one is never overwritten
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    settings: Settings,
    unreadable: bool,
}

impl SettingsStore {
    /// load settings from `path`, writing defaults if the file doesn't exist
    ///
    /// values are taken key by key: a key with a bad value falls back to its
    /// default with a warning and the rest of the file still applies
    pub fn load(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            let store = Self {
                path,
                settings: Settings::default(),
                unreadable: false,
            };
            store.save()?;
            return Ok(store);
        }

        let text = fs::read_to_string(&path)
            .with_context(|| format!("failed to read settings from {}", path.display()))?;
        let (settings, unreadable) = match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(loaded)) => {
                let (settings, rejected) = merge_over_defaults(loaded);
                for reason in rejected {
                    crate::warning!("settings {}: ignoring {}", path.display(), reason);
                }
                (settings, false)
            }
            Ok(_) => {
                crate::warning!(
                    "ignoring settings file {}: expected a JSON object",
                    path.display()
                );
                (Settings::default(), true)
            }
            Err(e) => {
                crate::warning!(
                    "ignoring malformed settings file {}: {}",
                    path.display(),
                    e
                );
                (Settings::default(), true)
            }
        };

        Ok(Self {
            path,
            settings,
            unreadable,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn set(&mut self, key: SettingKey, value: &str) -> Result<()> {
        self.settings.apply(key, value)?;
        self.save()
    }

    pub fn add_recent_repo(&mut self, path: &str) -> Result<()> {
        self.settings.push_recent_repo(path);
        self.save()
    }

    /// write the whole file atomically (temp file + rename)
    pub fn save(&self) -> Result<()> {
        if self.unreadable {
            bail!(
                "not overwriting unreadable settings file {}, fix or delete it first",
                self.path.display()
            );
        }

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;

        let json = serde_json::to_string_pretty(&self.settings)
            .context("failed to serialise settings")?;
        let mut temp = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("failed to create temporary file in {}", dir.display()))?;
        temp.write_all(json.as_bytes())
            .and_then(|()| temp.write_all(b"\n"))
            .context("failed to write settings")?;
        temp.persist(&self.path)
            .with_context(|| format!("failed to save settings to {}", self.path.display()))?;
        Ok(())
    }
}

/// apply each loaded key on top of the defaults, skipping keys whose value
/// doesn't fit; returns the settings and a description of every skipped key
fn merge_over_defaults(loaded: Map<String, Value>) -> (Settings, Vec<String>) {
    let mut accepted = Map::new();
    let mut rejected = Vec::new();
    for (key, value) in loaded {
        let mut candidate = accepted.clone();
        candidate.insert(key.clone(), value.clone());
        match serde_json::from_value::<Settings>(Value::Object(candidate)) {
            Ok(_) => {
                accepted.insert(key, value);
            }
            Err(e) => rejected.push(format!("'{key}': {e}")),
        }
    }

    let settings = serde_json::from_value(Value::Object(accepted)).unwrap_or_default();
    (settings, rejected)
}

/// settings file location: the first candidate directory that can be created
/// and written to, falling back to the current directory
pub fn default_settings_path() -> PathBuf {
    let candidates: Vec<PathBuf> = [
        dirs::home_dir().map(|h| h.join(format!(".{APP_DIR_NAME}"))),
        dirs::config_dir().map(|c| c.join(APP_DIR_NAME)),
        dirs::data_local_dir().map(|d| d.join(APP_DIR_NAME)),
    ]
    .into_iter()
    .flatten()
    .collect();

    let dir = first_writable_dir(&candidates)
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));
    dir.join(SETTINGS_FILE_NAME)
}

fn first_writable_dir(candidates: &[PathBuf]) -> Option<PathBuf> {
    candidates
        .iter()
        .find(|dir| fs::create_dir_all(dir).is_ok() && tempfile::tempfile_in(dir).is_ok())
        .cloned()
}

pub fn is_known_model(provider: Provider, model: &str) -> bool {
    let known = match provider {
        Provider::Gemini => GEMINI_MODELS,
        Provider::OpenAi => OPENAI_MODELS,
    };
    known.contains(&model)
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => bail!("expected true or false, got '{}'", value),
    }
}

fn mask(secret: &str) -> String {
    if secret.is_empty() {
        return "(not set)".to_string();
    }
    let visible: String = secret.chars().take(4).collect();
    format!("{visible}…")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn settings_path(dir: &TempDir) -> PathBuf {
        dir.path().join("nested").join(SETTINGS_FILE_NAME)
    }

    #[test]
    fn test_missing_file_writes_defaults() {
        let dir = TempDir::new().unwrap();
        let path = settings_path(&dir);

        let store = SettingsStore::load(path.clone()).unwrap();

        assert_eq!(store.settings(), &Settings::default());
        assert!(path.exists());
        let written: Settings = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written, Settings::default());
    }

    #[test]
    fn test_partial_file_is_merged_over_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        fs::write(&path, r#"{ "openai_model": "gpt-4.1", "auto_push": false }"#).unwrap();

        let store = SettingsStore::load(path).unwrap();
        let settings = store.settings();

        assert_eq!(settings.openai_model, "gpt-4.1");
        assert!(!settings.auto_push);
        assert_eq!(settings.gemini_model, "gemini-2.5-flash");
        assert!(settings.recent_repos.is_empty());
    }

    #[test]
    fn test_malformed_file_falls_back_to_defaults_without_overwriting() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        fs::write(&path, "{ not json").unwrap();

        let mut store = SettingsStore::load(path.clone()).unwrap();
        assert_eq!(store.settings(), &Settings::default());

        let err = store.add_recent_repo("/work/x").unwrap_err();
        assert!(err.to_string().starts_with("not overwriting unreadable settings file"));
        assert!(store.set(SettingKey::AutoPush, "false").is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "{ not json");
    }

    #[test]
    fn test_non_object_file_is_not_overwritten() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        fs::write(&path, "[1, 2]").unwrap();

        let mut store = SettingsStore::load(path.clone()).unwrap();

        assert!(store.add_recent_repo("/work/x").is_err());
        assert_eq!(fs::read_to_string(&path).unwrap(), "[1, 2]");
    }

    #[test]
    fn test_bad_value_only_resets_its_own_key() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        fs::write(
            &path,
            r#"{ "gemini_api_key": "AIza-secret", "auto_push": "true", "github_token": null, "dark_mode": true }"#,
        )
        .unwrap();

        let mut store = SettingsStore::load(path.clone()).unwrap();
        assert_eq!(store.settings().gemini_api_key, "AIza-secret");
        assert!(store.settings().dark_mode);
        assert!(store.settings().auto_push, "bad value falls back to the default");
        assert_eq!(store.settings().github_token, "");

        // recording a repository must not cost the stored key
        store.add_recent_repo("/work/x").unwrap();
        let on_disk = fs::read_to_string(&path).unwrap();
        assert!(on_disk.contains("AIza-secret"));

        let reloaded = SettingsStore::load(path).unwrap();
        assert_eq!(reloaded.settings().gemini_api_key, "AIza-secret");
        assert!(reloaded.settings().dark_mode);
        assert_eq!(reloaded.settings().recent_repos, vec!["/work/x"]);
    }

    #[test]
    fn test_merge_over_defaults_reports_rejected_keys() {
        let loaded: Map<String, Value> = serde_json::from_str(
            r#"{ "openai_model": "gpt-4.1", "recent_repos": "not-a-list", "unknown": 1 }"#,
        )
        .unwrap();

        let (settings, rejected) = merge_over_defaults(loaded);

        assert_eq!(settings.openai_model, "gpt-4.1");
        assert!(settings.recent_repos.is_empty());
        assert_eq!(rejected.len(), 1);
        assert!(rejected[0].starts_with("'recent_repos'"));
    }

    #[test]
    fn test_set_persists_immediately() {
        let dir = TempDir::new().unwrap();
        let path = settings_path(&dir);
        let mut store = SettingsStore::load(path.clone()).unwrap();

        store.set(SettingKey::GithubUsername, " octocat ").unwrap();
        store.set(SettingKey::AutoPush, "no").unwrap();

        let reloaded = SettingsStore::load(path).unwrap();
        assert_eq!(reloaded.settings().github_username, "octocat");
        assert!(!reloaded.settings().auto_push);
    }

    #[test]
    fn test_set_rejects_bad_bool() {
        let dir = TempDir::new().unwrap();
        let mut store = SettingsStore::load(settings_path(&dir)).unwrap();

        let err = store.set(SettingKey::DarkMode, "maybe").unwrap_err();
        assert_eq!(err.to_string(), "expected true or false, got 'maybe'");
        assert!(!store.settings().dark_mode);
    }

    #[test]
    fn test_recent_repo_deduplicates_to_front() {
        let mut settings = Settings::default();
        settings.push_recent_repo("/a");
        settings.push_recent_repo("/b");
        settings.push_recent_repo("/a");

        assert_eq!(settings.recent_repos, vec!["/a", "/b"]);
    }

    #[test]
    fn test_recent_repo_capacity() {
        let mut settings = Settings::default();
        for i in 0..25 {
            settings.push_recent_repo(&format!("/repo/{i}"));
            assert!(settings.recent_repos.len() <= MAX_RECENT_REPOS);
        }

        assert_eq!(settings.recent_repos.len(), MAX_RECENT_REPOS);
        assert_eq!(settings.recent_repos[0], "/repo/24");
        assert_eq!(settings.recent_repos[9], "/repo/15");
    }

    #[test]
    fn test_add_recent_repo_persists() {
        let dir = TempDir::new().unwrap();
        let path = settings_path(&dir);
        let mut store = SettingsStore::load(path.clone()).unwrap();

        store.add_recent_repo("/work/project").unwrap();
        store.add_recent_repo("/work/other").unwrap();
        store.add_recent_repo("/work/project").unwrap();

        let reloaded = SettingsStore::load(path).unwrap();
        assert_eq!(
            reloaded.settings().recent_repos,
            vec!["/work/project", "/work/other"]
        );
    }

    #[test]
    fn test_setting_key_parsing() {
        assert_eq!(
            "gemini-api-key".parse::<SettingKey>().unwrap(),
            SettingKey::GeminiApiKey
        );
        assert_eq!(
            "AUTO_PUSH".parse::<SettingKey>().unwrap(),
            SettingKey::AutoPush
        );
        assert!("theme".parse::<SettingKey>().is_err());
        for key in SettingKey::ALL {
            assert_eq!(key.name().parse::<SettingKey>().unwrap(), key);
        }
    }

    #[test]
    fn test_stored_api_key_wins() {
        let settings = Settings {
            gemini_api_key: "  stored-key ".to_string(),
            ..Settings::default()
        };
        assert_eq!(
            settings.api_key(Provider::Gemini).as_deref(),
            Some("stored-key")
        );
    }

    #[test]
    fn test_display_masks_secrets() {
        let settings = Settings {
            openai_api_key: "sk-abcdefgh".to_string(),
            ..Settings::default()
        };
        let entries = settings.display_entries();
        let value = |key: SettingKey| {
            entries
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.clone())
                .unwrap()
        };

        assert_eq!(value(SettingKey::OpenAiApiKey), "sk-a…");
        assert_eq!(value(SettingKey::GeminiApiKey), "(not set)");
        assert_eq!(value(SettingKey::AutoPush), "true");
    }

    #[test]
    fn test_first_writable_dir() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("not-a-dir");
        fs::write(&file, "x").unwrap();
        let good = dir.path().join("config");

        let picked = first_writable_dir(&[file.join("sub"), good.clone()]);
        assert_eq!(picked, Some(good));
    }

    #[test]
    fn test_known_models() {
        assert!(is_known_model(Provider::Gemini, "gemini-2.5-flash"));
        assert!(is_known_model(Provider::OpenAi, "gpt-4o-mini"));
        assert!(!is_known_model(Provider::OpenAi, "gemini-2.5-flash"));
    }
}
