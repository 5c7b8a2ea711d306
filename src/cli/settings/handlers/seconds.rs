//! Handlers for timeouts expressed in whole seconds.

use crate::cli::settings::error::SettingError;
use crate::cli::settings::helpers::{mutate_config_with_message, success_set, success_unset};
use crate::cli::settings::{SetContext, SettingHandler};
use crate::core::config::data::Config;
use crate::core::config::defaults::{DEFAULT_FALLBACK_TIMEOUT_SECS, DEFAULT_STALL_TIMEOUT_SECS};

pub struct SecondsHandler {
    key: &'static str,
    hint: &'static str,
    example: &'static str,
    default: u64,
    /// Whether 0 is meaningful (it disables the timer).
    allow_zero: bool,
    get: fn(&Config) -> Option<u64>,
    set_field: fn(&mut Config, Option<u64>),
}

impl SecondsHandler {
    fn display(&self, secs: u64) -> String {
        if secs == 0 && self.allow_zero {
            "0 (disabled)".to_string()
        } else {
            format!("{secs}s")
        }
    }
}

impl SettingHandler for SecondsHandler {
    fn key(&self) -> &'static str {
        self.key
    }

    fn set(&self, args: &[String], ctx: &SetContext<'_>) -> Result<String, SettingError> {
        let Some(input) = args.first() else {
            return Err(SettingError::MissingArgs {
                hint: self.hint,
                example: self.example,
            });
        };

        let secs = input
            .trim()
            .trim_end_matches('s')
            .parse::<u64>()
            .ok()
            .filter(|secs| *secs > 0 || self.allow_zero)
            .ok_or_else(|| SettingError::InvalidValue {
                key: self.key,
                input: input.clone(),
                expected: if self.allow_zero {
                    "a whole number of seconds (0 disables)"
                } else {
                    "a positive whole number of seconds"
                },
            })?;
        let set_field = self.set_field;

        mutate_config_with_message(
            ctx.config_path,
            move |config| {
                set_field(config, Some(secs));
                Ok(())
            },
            success_set(self.key, &self.display(secs)),
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
            success_unset(self.key, &self.display(self.default)),
        )
    }

    fn format(&self, config: &Config) -> String {
        match (self.get)(config) {
            Some(secs) => format!("  {}: {}", self.key, self.display(secs)),
            None => format!(
                "  {}: (unset, default: {})",
                self.key,
                self.display(self.default)
            ),
        }
    }
}

/// Create a handler for the `stall-timeout-secs` setting.
pub fn stall_timeout_handler() -> SecondsHandler {
    SecondsHandler {
        key: "stall-timeout-secs",
        hint: "To set the stream stall timeout, give a number of seconds (0 disables):",
        example: "vastuchat set stall-timeout-secs 45",
        default: DEFAULT_STALL_TIMEOUT_SECS,
        allow_zero: true,
        get: |c| c.stall_timeout_secs,
        set_field: |c, v| c.stall_timeout_secs = v,
    }
}

/// Create a handler for the `fallback-timeout-secs` setting.
pub fn fallback_timeout_handler() -> SecondsHandler {
    SecondsHandler {
        key: "fallback-timeout-secs",
        hint: "To set how long to wait before the fallback layout, give a number of seconds:",
        example: "vastuchat set fallback-timeout-secs 15",
        default: DEFAULT_FALLBACK_TIMEOUT_SECS,
        allow_zero: false,
        get: |c| c.fallback_timeout_secs,
        set_field: |c, v| c.fallback_timeout_secs = v,
    }
}
