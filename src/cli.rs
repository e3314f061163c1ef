use crate::generate::Provider;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// ai-commit: stage changes, have an AI write the commit message, commit and push
#[derive(Parser, Debug)]
#[command(name = "ai-commit", about, long_about = None, version)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cli {
    /// which AI writes the commit message
    #[arg(long, value_enum, default_value_t = Provider::Gemini)]
    pub provider: Provider,

    /// commit only, don't push
    #[arg(long)]
    pub no_push: bool,

    /// use this commit message instead of generating one
    #[arg(short, long)]
    pub message: Option<String>,

    /// repository to work in (skips the repository picker)
    #[arg(short, long, value_name = "DIR")]
    pub dir: Option<String>,

    /// stage every changed file without asking
    #[arg(short, long)]
    pub all: bool,

    /// scan this folder for repositories instead of the configured one
    #[arg(long, value_name = "DIR")]
    pub parent: Option<PathBuf>,

    /// settings file to use
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// print the prompt sent to the AI
    #[arg(long)]
    pub debug_prompt: bool,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// view or change settings
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// print all settings, secrets masked
    Show,
    /// print the settings file location
    Path,
    /// change a setting, e.g. `config set gemini-api-key <key>`
    Set { key: String, value: String },
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
