use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::tool_calls::ToolCallRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
            Role::Tool => "tool",
        }
    }

    pub fn is_user(self) -> bool {
        self == Role::User
    }

    pub fn is_assistant(self) -> bool {
        self == Role::Assistant
    }
}

impl AsRef<str> for Role {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl TryFrom<&str> for Role {
    type Error = String;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            "tool" => Ok(Role::Tool),
            _ => Err(format!("invalid message role: {value}")),
        }
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::try_from(value.as_str())
    }
}

impl From<Role> for String {
    fn from(value: Role) -> Self {
        value.as_str().to_string()
    }
}

/// One entry of a conversation. Messages are never edited after they are
/// appended; position in the list encodes turn order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
    /// Links a tool result to the assistant request that produced it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    /// Tool invocations issued by an assistant message.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCallRequest>,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
            tool_call_id: None,
            tool_calls: Vec::new(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn assistant_tool_calls(content: impl Into<String>, calls: Vec<ToolCallRequest>) -> Self {
        Self {
            tool_calls: calls,
            ..Self::new(Role::Assistant, content)
        }
    }

    pub fn tool_result(tool_call_id: Option<String>, content: impl Into<String>) -> Self {
        Self {
            tool_call_id,
            ..Self::new(Role::Tool, content)
        }
    }
}

/// Most recent user message in `messages`, if any.
pub fn last_user_text(messages: &[Message]) -> Option<&str> {
    messages
        .iter()
        .rev()
        .find(|message| message.role.is_user())
        .map(|message| message.content.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_through_strings() {
        for role in [Role::User, Role::Assistant, Role::System, Role::Tool] {
            let text: String = role.into();
            assert_eq!(Role::try_from(text).expect("valid role"), role);
        }
        assert!(Role::try_from("app/info").is_err());
    }

    #[test]
    fn last_user_text_skips_later_assistant_messages() {
        let messages = vec![
            Message::system("be helpful"),
            Message::user("first"),
            Message::assistant("reply"),
            Message::user("3 BHK, 30x40 ft"),
            Message::assistant("working on it"),
        ];
        assert_eq!(last_user_text(&messages), Some("3 BHK, 30x40 ft"));
        assert_eq!(last_user_text(&messages[..1]), None);
    }

    #[test]
    fn tool_result_serializes_call_id_only_when_present() {
        let with_id = serde_json::to_value(Message::tool_result(Some("call_1".into()), "{}"))
            .expect("serialize");
        assert_eq!(with_id["role"], "tool");
        assert_eq!(with_id["tool_call_id"], "call_1");

        let without_id =
            serde_json::to_value(Message::tool_result(None, "{}")).expect("serialize");
        assert!(without_id.get("tool_call_id").is_none());
        assert!(without_id.get("tool_calls").is_none());
    }
}
