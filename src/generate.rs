mod gemini;
mod openai;
mod prompt;

use crate::constants::{HTTP_TIMEOUT_SECS, MAX_DIFF_CHARS};
use crate::settings::{SettingKey, Settings};
use std::time::Duration;
use thiserror::Error;

pub use prompt::preview as prompt_preview;

/// which backend writes the commit message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Provider {
    #[default]
    Gemini,
    #[value(name = "openai", alias = "chatgpt")]
    OpenAi,
}

impl Provider {
    pub fn display_name(self) -> &'static str {
        match self {
            Provider::Gemini => "Gemini",
            Provider::OpenAi => "OpenAI",
        }
    }

    pub fn api_key_env(self) -> &'static str {
        match self {
            Provider::Gemini => "GEMINI_API_KEY",
            Provider::OpenAi => "OPENAI_API_KEY",
        }
    }

    fn api_key_setting(self) -> SettingKey {
        match self {
            Provider::Gemini => SettingKey::GeminiApiKey,
            Provider::OpenAi => SettingKey::OpenAiApiKey,
        }
    }

    fn model_setting(self) -> SettingKey {
        match self {
            Provider::Gemini => SettingKey::GeminiModel,
            Provider::OpenAi => SettingKey::OpenAiModel,
        }
    }
}

#[derive(Debug, Error)]
pub enum GenerateError {
    #[error(
        "{provider} API key not set. run `ai-commit config set {setting} <key>` or export {env}"
    )]
    MissingApiKey {
        provider: &'static str,
        setting: SettingKey,
        env: &'static str,
    },

    #[error("{provider} model not set. run `ai-commit config set {setting} <model>`")]
    MissingModel {
        provider: &'static str,
        setting: SettingKey,
    },

    #[error("{provider} request failed: {message}")]
    Request {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} returned an unexpected response: {message}")]
    InvalidResponse {
        provider: &'static str,
        message: String,
    },

    #[error("{0} returned an empty commit message")]
    EmptyResponse(&'static str),

    #[error("generation worker exited without a result")]
    WorkerLost,
}

/// turns a staged diff into a proposed commit message
pub trait MessageGenerator: Send + Sync {
    fn generate(&self, diff: &str, provider: Provider) -> Result<String, GenerateError>;
}

#[derive(Debug, Clone)]
struct Credentials {
    api_key: Option<String>,
    model: String,
}

/// calls the provider's HTTP API directly
pub struct HttpGenerator {
    agent: ureq::Agent,
    gemini: Credentials,
    openai: Credentials,
}

impl HttpGenerator {
    pub fn from_settings(settings: &Settings) -> Self {
        let credentials = |provider| Credentials {
            api_key: settings.api_key(provider),
            model: settings.model(provider).trim().to_string(),
        };

        // non-2xx responses are read so the provider's error message can be shown
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(HTTP_TIMEOUT_SECS)))
            .http_status_as_error(false)
            .build()
            .into();

        Self {
            agent,
            gemini: credentials(Provider::Gemini),
            openai: credentials(Provider::OpenAi),
        }
    }

    fn credentials(&self, provider: Provider) -> &Credentials {
        match provider {
            Provider::Gemini => &self.gemini,
            Provider::OpenAi => &self.openai,
        }
    }
}

impl MessageGenerator for HttpGenerator {
    fn generate(&self, diff: &str, provider: Provider) -> Result<String, GenerateError> {
        let credentials = self.credentials(provider);
        let Some(api_key) = credentials.api_key.as_deref() else {
            return Err(GenerateError::MissingApiKey {
                provider: provider.display_name(),
                setting: provider.api_key_setting(),
                env: provider.api_key_env(),
            });
        };
        if credentials.model.is_empty() {
            return Err(GenerateError::MissingModel {
                provider: provider.display_name(),
                setting: provider.model_setting(),
            });
        }

        let diff = truncate_diff(diff, MAX_DIFF_CHARS);
        let raw = match provider {
            Provider::Gemini => gemini::generate(&self.agent, api_key, &credentials.model, diff)?,
            Provider::OpenAi => openai::generate(&self.agent, api_key, &credentials.model, diff)?,
        };

        clean_response(&raw).ok_or(GenerateError::EmptyResponse(provider.display_name()))
    }
}

/// first `max_chars` characters of the diff
pub fn truncate_diff(diff: &str, max_chars: usize) -> &str {
    match diff.char_indices().nth(max_chars) {
        Some((idx, _)) => &diff[..idx],
        None => diff,
    }
}

/// tidy a model reply into a bare commit message
///
/// models like to wrap the answer in a fenced block despite being told not to;
/// when a fence is present only its contents are kept
pub fn clean_response(raw: &str) -> Option<String> {
    let raw = raw.trim();
    let message = match raw.find("```") {
        Some(start) => {
            let after_fence = &raw[start + 3..];
            // drop a language tag such as ```text
            let body = match after_fence.split_once('\n') {
                Some((tag, rest))
                    if !tag.trim().is_empty()
                        && tag.trim().chars().all(|c| c.is_ascii_alphanumeric()) =>
                {
                    rest
                }
                _ => after_fence,
            };
            match body.find("```") {
                Some(end) => &body[..end],
                None => body,
            }
        }
        None => raw,
    };

    let message = message.trim();
    (!message.is_empty()).then(|| message.to_string())
}

/// pull `error.message` out of a provider's JSON error body
fn api_error_message(body: &str) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        error: ErrorDetail,
    }
    #[derive(serde::Deserialize)]
    struct ErrorDetail {
        message: String,
    }

    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) => body.trim().chars().take(200).collect(),
    }
}

fn read_error(provider: Provider, response: &mut ureq::http::Response<ureq::Body>) -> GenerateError {
    let status = response.status();
    let body = response.body_mut().read_to_string().unwrap_or_default();
    GenerateError::Request {
        provider: provider.display_name(),
        message: format!("HTTP {}: {}", status.as_u16(), api_error_message(&body)),
    }
}

fn transport_error(provider: Provider, e: &ureq::Error) -> GenerateError {
    GenerateError::Request {
        provider: provider.display_name(),
        message: e.to_string(),
    }
}

fn invalid_response(provider: Provider, message: impl Into<String>) -> GenerateError {
    GenerateError::InvalidResponse {
        provider: provider.display_name(),
        message: message.into(),
    }
}
