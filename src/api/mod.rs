use serde::Serialize;
use serde_json::Value;

use crate::core::frame_decoder::Dialect;
use crate::core::message::{Message, Role};
use crate::core::tools::ToolDefinition;

pub mod backend;

#[derive(Serialize, Clone, Debug)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ChatToolCall>>,
}

impl ChatMessage {
    /// Wire form of a conversation message. Dialect A expects tool call
    /// arguments as objects, dialect B as JSON-encoded strings.
    pub fn from_message(message: &Message, dialect: Dialect) -> Self {
        let tool_calls = (!message.tool_calls.is_empty()).then(|| {
            message
                .tool_calls
                .iter()
                .map(|call| {
                    let arguments = Value::Object(call.arguments.clone());
                    ChatToolCall {
                        id: call.id.clone(),
                        kind: "function".to_string(),
                        function: ChatToolCallFunction {
                            name: call.name.clone(),
                            arguments: match dialect {
                                Dialect::Ndjson => arguments,
                                Dialect::EventStream => Value::String(arguments.to_string()),
                            },
                        },
                    }
                })
                .collect()
        });

        // Event-stream servers reject tool messages without a call id.
        let role = match (message.role, dialect, &message.tool_call_id) {
            (Role::Tool, Dialect::EventStream, None) => Role::User,
            (role, _, _) => role,
        };

        Self {
            role: role.as_str().to_string(),
            content: message.content.clone(),
            tool_call_id: message.tool_call_id.clone(),
            tool_calls,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<ChatToolDefinition>>,
}

impl ChatRequest {
    pub fn new(
        model: &str,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        dialect: Dialect,
    ) -> Self {
        Self {
            model: model.to_string(),
            messages: messages
                .iter()
                .map(|message| ChatMessage::from_message(message, dialect))
                .collect(),
            stream: true,
            tools: tools
                .filter(|tools| !tools.is_empty())
                .map(|tools| tools.iter().map(ChatToolDefinition::from).collect()),
        }
    }

    /// Same request without streaming, for the empty-round retry.
    pub fn non_streaming(&self) -> NonStreamingRequest<'_> {
        NonStreamingRequest {
            model: &self.model,
            messages: &self.messages,
            stream: false,
            tools: self.tools.as_deref(),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct NonStreamingRequest<'a> {
    pub model: &'a str,
    pub messages: &'a [ChatMessage],
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<&'a [ChatToolDefinition]>,
}

#[derive(Serialize, Clone, Debug)]
pub struct ChatToolCall {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub kind: String,
    pub function: ChatToolCallFunction,
}

#[derive(Serialize, Clone, Debug)]
pub struct ChatToolCallFunction {
    pub name: String,
    pub arguments: Value,
}

#[derive(Serialize, Clone, Debug)]
pub struct ChatToolDefinition {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: ChatToolFunction,
}

#[derive(Serialize, Clone, Debug)]
pub struct ChatToolFunction {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub parameters: Value,
}

impl From<&ToolDefinition> for ChatToolDefinition {
    fn from(definition: &ToolDefinition) -> Self {
        Self {
            kind: "function".to_string(),
            function: ChatToolFunction {
                name: definition.name.clone(),
                description: (!definition.description.is_empty())
                    .then(|| definition.description.clone()),
                parameters: definition.parameters.clone(),
            },
        }
    }
}
