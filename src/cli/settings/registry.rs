//! Registry of setting handlers.

use std::collections::HashMap;

use super::handlers::{
    backend_url_handler, endpoint_handler, fallback_enabled_handler, fallback_timeout_handler,
    model_handler, stall_timeout_handler, DialectHandler,
};
use super::SettingHandler;

/// Registry of all available setting handlers.
pub struct SettingRegistry {
    handlers: HashMap<&'static str, Box<dyn SettingHandler>>,
    /// Keys in display order for `vastuchat config` output.
    display_order: Vec<&'static str>,
}

impl SettingRegistry {
    /// Create a new registry with all handlers registered.
    pub fn new() -> Self {
        let mut registry = Self {
            handlers: HashMap::new(),
            display_order: Vec::new(),
        };

        // Register handlers in display order
        registry.register(Box::new(endpoint_handler()));
        registry.register(Box::new(model_handler()));
        registry.register(Box::new(DialectHandler));
        registry.register(Box::new(backend_url_handler()));
        registry.register(Box::new(stall_timeout_handler()));
        registry.register(Box::new(fallback_enabled_handler()));
        registry.register(Box::new(fallback_timeout_handler()));

        registry
    }

    fn register(&mut self, handler: Box<dyn SettingHandler>) {
        let key = handler.key();
        self.display_order.push(key);
        self.handlers.insert(key, handler);
    }

    /// Get a handler by key. Underscores are accepted in place of dashes.
    pub fn get(&self, key: &str) -> Option<&dyn SettingHandler> {
        let normalized = key.trim().to_ascii_lowercase().replace('_', "-");
        self.handlers.get(normalized.as_str()).map(|h| h.as_ref())
    }

    /// Get all keys in display order.
    pub fn keys_display_order(&self) -> &[&'static str] {
        &self.display_order
    }
}

impl Default for SettingRegistry {
    fn default() -> Self {
        Self::new()
    }
}
