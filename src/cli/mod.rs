//! Command-line interface parsing and handling
//!
//! This module handles parsing command-line arguments and executing the appropriate commands.

pub mod say;
pub mod settings;
pub mod validate;

use std::error::Error;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use crate::cli::say::{run_chat, run_say};
use crate::cli::settings::{SetContext, SettingError, SettingRegistry};
use crate::cli::validate::run_validate;
use crate::core::config::data::{path_display, Config};
use crate::core::config::defaults::{api_key_from_env, SettingsOverrides, API_KEY_ENV};
use crate::core::frame_decoder::Dialect;

#[derive(Parser)]
#[command(name = "vastuchat")]
#[command(about = "Chat your way to a Vastu-compliant floor plan")]
#[command(
    long_about = "vastuchat streams a conversation with a chat-completion endpoint (Ollama-style \
NDJSON or OpenAI-style event streams). When the model asks for a layout, vastuchat calls the \
floor-plan backend, feeds the result back, and prints the model's summary.\n\n\
Environment Variables:\n\
  VASTUCHAT_API_KEY  Bearer token sent to the chat endpoint (optional)\n\
  RUST_LOG           Diagnostic log filter, written to stderr (default: warn)\n\n\
Chat commands:\n\
  /log              Toggle transcript logging (requires --log)\n\
  /quit             Leave the chat"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Model to use for chat
    #[arg(short = 'm', long, global = true, value_name = "MODEL")]
    pub model: Option<String>,

    /// Base URL of the chat endpoint
    #[arg(short = 'e', long, global = true, value_name = "URL")]
    pub endpoint: Option<String>,

    /// Stream dialect: ndjson or event-stream (inferred from the endpoint by default)
    #[arg(short = 'd', long, global = true, value_name = "DIALECT")]
    pub dialect: Option<Dialect>,

    /// Enable logging to specified file
    #[arg(short = 'l', long, global = true)]
    pub log: Option<String>,
}

impl Args {
    pub fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            endpoint: self.endpoint.clone(),
            model: self.model.clone(),
            dialect: self.dialect,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Send a single prompt and print the reply
    Say {
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        prompt: Vec<String>,
    },
    /// Start an interactive line-based chat (default)
    Chat,
    /// Set configuration values
    Set {
        /// Configuration key to set
        key: String,
        /// Value to set for the key
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        value: Vec<String>,
    },
    /// Unset configuration values
    Unset {
        /// Configuration key to unset
        key: String,
    },
    /// Show the current configuration
    Config,
    /// Score a saved layout (JSON) with the validation service
    Validate {
        /// Path to a layout JSON file
        path: PathBuf,
    },
}

pub fn main() -> Result<(), Box<dyn Error>> {
    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let args = Args::parse();
    tokio::runtime::Runtime::new()?.block_on(async_main(args))
}

async fn async_main(args: Args) -> Result<(), Box<dyn Error>> {
    let overrides = args.overrides();

    match args.command.unwrap_or(Commands::Chat) {
        Commands::Say { prompt } => run_say(prompt, overrides, args.log).await,
        Commands::Chat => run_chat(overrides, args.log).await,
        Commands::Set { key, value } => {
            let config_path = Config::get_config_path()?;
            report_setting(set_value(&key, &value, &config_path))
        }
        Commands::Unset { key } => {
            let config_path = Config::get_config_path()?;
            report_setting(unset_value(&key, &config_path))
        }
        Commands::Config => {
            let config_path = Config::get_config_path()?;
            let config = Config::load_from_path(&config_path)?;
            for line in describe_config(&config, &config_path) {
                println!("{line}");
            }
            Ok(())
        }
        Commands::Validate { path } => run_validate(&path).await,
    }
}

fn report_setting(result: Result<String, SettingError>) -> Result<(), Box<dyn Error>> {
    match result {
        Ok(message) => {
            println!("{message}");
            Ok(())
        }
        Err(err) => {
            err.print();
            std::process::exit(err.exit_code());
        }
    }
}

fn with_handler<F>(key: &str, config_path: &Path, f: F) -> Result<String, SettingError>
where
    F: FnOnce(&dyn settings::SettingHandler, &SetContext<'_>) -> Result<String, SettingError>,
{
    let registry = SettingRegistry::new();
    let handler = registry
        .get(key)
        .ok_or_else(|| SettingError::UnknownKey(key.to_string()))?;
    let config = Config::load_from_path(config_path)
        .map_err(|err| SettingError::ConfigError(err.to_string()))?;
    let ctx = SetContext {
        config: &config,
        config_path,
    };
    f(handler, &ctx)
}

pub fn set_value(key: &str, value: &[String], config_path: &Path) -> Result<String, SettingError> {
    with_handler(key, config_path, |handler, ctx| handler.set(value, ctx))
}

pub fn unset_value(key: &str, config_path: &Path) -> Result<String, SettingError> {
    with_handler(key, config_path, |handler, ctx| handler.unset(ctx))
}

/// Lines for `vastuchat config`, in registry display order.
pub fn describe_config(config: &Config, config_path: &Path) -> Vec<String> {
    let registry = SettingRegistry::new();
    let mut lines = vec![format!(
        "Current configuration ({}):",
        path_display(config_path)
    )];
    lines.extend(
        registry
            .keys_display_order()
            .iter()
            .filter_map(|key| registry.get(key))
            .map(|handler| handler.format(config)),
    );
    let key_status = if api_key_from_env().is_some() {
        "set"
    } else {
        "unset"
    };
    lines.push(format!("  {API_KEY_ENV}: ({key_status})"));
    lines
}

#[cfg(test)]
mod tests;
