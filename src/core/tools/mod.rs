//! Tools the model may call during a turn.
//!
//! Each [`ToolExecutor`] owns one tool name. Executors never fail the turn:
//! every outcome, including backend errors, comes back as a
//! [`ToolCallResult`] that is fed to the model as a tool message.

pub mod layout;

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::core::tool_calls::ToolCallRequest;

pub use layout::LayoutTool;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// JSON schema describing the accepted arguments.
    pub parameters: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCallResult {
    pub success: bool,
    pub payload: Value,
}

impl ToolCallResult {
    pub fn success(payload: Value) -> Self {
        Self {
            success: true,
            payload,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            payload: json!({"status": "error", "message": message.into()}),
        }
    }

    /// Content of the tool message appended to the conversation.
    pub fn message_content(&self) -> String {
        self.payload.to_string()
    }
}

#[async_trait]
pub trait ToolExecutor: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    async fn execute(&self, arguments: &Map<String, Value>) -> ToolCallResult;
}

#[derive(Clone, Default)]
pub struct ToolRegistry {
    executors: BTreeMap<String, Arc<dyn ToolExecutor>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an executor under its definition's name, replacing any
    /// previous executor with that name.
    pub fn register(&mut self, executor: Arc<dyn ToolExecutor>) {
        let name = executor.definition().name;
        self.executors.insert(name, executor);
    }

    pub fn with(mut self, executor: Arc<dyn ToolExecutor>) -> Self {
        self.register(executor);
        self
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.executors
            .values()
            .map(|executor| executor.definition())
            .collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.executors.contains_key(name)
    }

    pub async fn dispatch(&self, call: &ToolCallRequest) -> ToolCallResult {
        match self.executors.get(&call.name) {
            Some(executor) => executor.execute(&call.arguments).await,
            None => {
                warn!(tool = %call.name, "Model requested an unregistered tool");
                ToolCallResult::error(format!("Unknown tool: {}", call.name))
            }
        }
    }
}
