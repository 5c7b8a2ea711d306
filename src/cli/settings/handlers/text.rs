//! URL and free-text setting handlers.

use crate::cli::settings::error::SettingError;
use crate::cli::settings::helpers::{
    mutate_config_with_message, success_set, success_unset, validate_url,
};
use crate::cli::settings::{SetContext, SettingHandler};
use crate::core::config::data::Config;
use crate::core::config::defaults::{DEFAULT_BACKEND_URL, DEFAULT_ENDPOINT, DEFAULT_MODEL};

/// Data-driven handler for single-string settings. URL settings are
/// validated before they are saved.
pub struct TextHandler {
    key: &'static str,
    hint: &'static str,
    example: &'static str,
    default_display: &'static str,
    is_url: bool,
    get: fn(&Config) -> Option<&str>,
    set_field: fn(&mut Config, Option<String>),
}

impl SettingHandler for TextHandler {
    fn key(&self) -> &'static str {
        self.key
    }

    fn set(&self, args: &[String], ctx: &SetContext<'_>) -> Result<String, SettingError> {
        let input = args.join(" ");
        if input.trim().is_empty() {
            return Err(SettingError::MissingArgs {
                hint: self.hint,
                example: self.example,
            });
        }

        let value = if self.is_url {
            validate_url(self.key, &input)?
        } else {
            input.trim().to_string()
        };
        let message = success_set(self.key, &value);
        let set_field = self.set_field;

        mutate_config_with_message(
            ctx.config_path,
            move |config| {
                set_field(config, Some(value));
                Ok(())
            },
            message,
        )
    }

    fn unset(&self, ctx: &SetContext<'_>) -> Result<String, SettingError> {
        let set_field = self.set_field;

        mutate_config_with_message(
            ctx.config_path,
            move |config| {
                set_field(config, None);
                Ok(())
            },
            success_unset(self.key, self.default_display),
        )
    }

    fn format(&self, config: &Config) -> String {
        match (self.get)(config) {
            Some(value) => format!("  {}: {value}", self.key),
            None => format!("  {}: (unset, default: {})", self.key, self.default_display),
        }
    }
}

/// Create a handler for the `endpoint` setting.
pub fn endpoint_handler() -> TextHandler {
    TextHandler {
        key: "endpoint",
        hint: "To set the chat endpoint, provide its base URL:",
        example: "vastuchat set endpoint http://localhost:11434",
        default_display: DEFAULT_ENDPOINT,
        is_url: true,
        get: |c| c.endpoint.as_deref(),
        set_field: |c, v| c.endpoint = v,
    }
}

/// Create a handler for the `model` setting.
pub fn model_handler() -> TextHandler {
    TextHandler {
        key: "model",
        hint: "To set the chat model, provide its name:",
        example: "vastuchat set model llama3.1",
        default_display: DEFAULT_MODEL,
        is_url: false,
        get: |c| c.model.as_deref(),
        set_field: |c, v| c.model = v,
    }
}

/// Create a handler for the `backend-url` setting.
pub fn backend_url_handler() -> TextHandler {
    TextHandler {
        key: "backend-url",
        hint: "To set the layout backend, provide its base URL:",
        example: "vastuchat set backend-url http://localhost:8000",
        default_display: DEFAULT_BACKEND_URL,
        is_url: true,
        get: |c| c.backend_url.as_deref(),
        set_field: |c, v| c.backend_url = v,
    }
}
