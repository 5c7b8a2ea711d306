//! Settings management for CLI set/unset commands.
//!
//! Each configuration key has a [`SettingHandler`]. Handlers come in a few
//! shapes:
//!
//! - URL and text settings (`endpoint`, `model`, `backend-url`)
//! - The `dialect` setting
//! - Boolean settings (`fallback-enabled`)
//! - Second-valued timeouts (`stall-timeout-secs`, `fallback-timeout-secs`)

pub mod error;
pub mod handlers;
pub mod helpers;
pub mod registry;

pub use error::SettingError;
pub use registry::SettingRegistry;

use std::path::Path;

use crate::core::config::data::Config;

/// Context provided to setting handlers during set/unset operations.
pub struct SetContext<'a> {
    /// Snapshot of the configuration before the change.
    pub config: &'a Config,
    pub config_path: &'a Path,
}

/// Trait for handling a configuration setting.
///
/// Each implementation handles a specific configuration key,
/// providing set, unset, and format operations.
pub trait SettingHandler: Send + Sync {
    /// Returns the configuration key this handler manages.
    fn key(&self) -> &'static str;

    /// Set the configuration value from the words following the key.
    ///
    /// Returns a success message to display.
    fn set(&self, args: &[String], ctx: &SetContext<'_>) -> Result<String, SettingError>;

    /// Clear the configuration value so the default applies again.
    fn unset(&self, ctx: &SetContext<'_>) -> Result<String, SettingError>;

    /// Format the current value for display in `vastuchat config` output.
    fn format(&self, config: &Config) -> String;
}
