use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::frame_decoder::Dialect;

/// Persisted user configuration. Every key is optional; unset keys resolve
/// to the defaults in [`super::defaults`].
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Base URL of the chat-completion endpoint
    pub endpoint: Option<String>,
    pub model: Option<String>,
    /// Wire format spoken by the endpoint; inferred from the port when unset
    pub dialect: Option<Dialect>,
    /// Base URL of the layout generation backend
    pub backend_url: Option<String>,
    /// Seconds without a stream chunk before a round is abandoned (0 disables)
    pub stall_timeout_secs: Option<u64>,
    pub fallback_enabled: Option<bool>,
    /// Seconds of model silence before the fallback layout is generated
    pub fallback_timeout_secs: Option<u64>,
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
