//! Handler for the wire dialect setting.

use crate::cli::settings::error::SettingError;
use crate::cli::settings::helpers::{mutate_config_with_message, success_set, success_unset};
use crate::cli::settings::{SetContext, SettingHandler};
use crate::core::config::data::Config;
use crate::core::frame_decoder::Dialect;

/// Handler for the `dialect` setting.
pub struct DialectHandler;

impl SettingHandler for DialectHandler {
    fn key(&self) -> &'static str {
        "dialect"
    }

    fn set(&self, args: &[String], ctx: &SetContext<'_>) -> Result<String, SettingError> {
        let Some(input) = args.first() else {
            return Err(SettingError::MissingArgs {
                hint: "To pin the stream dialect, specify ndjson or event-stream:",
                example: "vastuchat set dialect event-stream",
            });
        };

        let dialect: Dialect = input.parse().map_err(|_| SettingError::InvalidValue {
            key: "dialect",
            input: input.clone(),
            expected: "ndjson or event-stream",
        })?;

        mutate_config_with_message(
            ctx.config_path,
            move |config| {
                config.dialect = Some(dialect);
                Ok(())
            },
            success_set("dialect", dialect.as_str()),
        )
    }

    fn unset(&self, ctx: &SetContext<'_>) -> Result<String, SettingError> {
        let inferred = ctx.config.dialect_for(ctx.config.endpoint());
        mutate_config_with_message(
            ctx.config_path,
            |config| {
                config.dialect = None;
                Ok(())
            },
            success_unset("dialect", &format!("inferred, currently {inferred}")),
        )
    }

    fn format(&self, config: &Config) -> String {
        match config.dialect {
            Some(dialect) => format!("  dialect: {dialect}"),
            None => format!(
                "  dialect: (unset, inferred: {})",
                Dialect::infer(config.endpoint())
            ),
        }
    }
}
