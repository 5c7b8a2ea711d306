use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::core::frame_decoder::Dialect;

/// A tool invocation with its arguments already in canonical object form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

/// Arguments exactly as the model encoded them.
#[derive(Debug, Clone, PartialEq)]
pub enum RawArguments {
    /// A JSON document carried inside a string.
    Encoded(String),
    /// An already structured value.
    Structured(Value),
    Missing,
}

impl RawArguments {
    pub fn from_value(value: Option<&Value>) -> Self {
        match value {
            None | Some(Value::Null) => RawArguments::Missing,
            Some(Value::String(text)) => RawArguments::Encoded(text.clone()),
            Some(other) => RawArguments::Structured(other.clone()),
        }
    }

    /// Resolve to an object map. Anything that is not an object, or does not
    /// parse, becomes empty arguments; the call is still attempted.
    pub fn normalize(self, tool_name: &str) -> Map<String, Value> {
        match self {
            RawArguments::Missing => Map::new(),
            RawArguments::Structured(Value::Object(map)) => map,
            RawArguments::Structured(other) => {
                warn!(
                    tool = tool_name,
                    value = %other,
                    "Tool arguments are not an object; using empty arguments"
                );
                Map::new()
            }
            RawArguments::Encoded(text) => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    return Map::new();
                }
                match serde_json::from_str::<Value>(trimmed) {
                    Ok(Value::Object(map)) => map,
                    Ok(other) => {
                        warn!(
                            tool = tool_name,
                            value = %other,
                            "Decoded tool arguments are not an object; using empty arguments"
                        );
                        Map::new()
                    }
                    Err(err) => {
                        warn!(
                            tool = tool_name,
                            error = %err,
                            "Unparsable tool arguments; using empty arguments"
                        );
                        Map::new()
                    }
                }
            }
        }
    }
}

#[derive(Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: Option<Value>,
}

/// Both tool-call shapes seen on the wire.
#[derive(Deserialize)]
#[serde(untagged)]
enum WireToolCall {
    Nested {
        #[serde(default)]
        id: Option<String>,
        function: WireFunction,
    },
    Flat {
        #[serde(default)]
        id: Option<String>,
        name: String,
        #[serde(default)]
        arguments: Option<Value>,
    },
}

impl WireToolCall {
    fn into_request(self) -> ToolCallRequest {
        let (id, name, arguments) = match self {
            WireToolCall::Nested { id, function } => (id, function.name, function.arguments),
            WireToolCall::Flat { id, name, arguments } => (id, name, arguments),
        };
        let arguments = RawArguments::from_value(arguments.as_ref()).normalize(&name);
        ToolCallRequest {
            id: id.filter(|id| !id.is_empty()),
            name,
            arguments,
        }
    }
}

/// One piece of a tool call streamed across several event-stream records.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ToolCallFragment {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub function: Option<FragmentFunction>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FragmentFunction {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arguments: Option<String>,
}

#[derive(Debug, Default, PartialEq)]
pub struct ExtractedRecord {
    pub text: Option<String>,
    pub tool_calls: Vec<ToolCallRequest>,
    pub fragments: Vec<ToolCallFragment>,
    pub done: bool,
}

impl ExtractedRecord {
    pub fn signals_tool_call(&self) -> bool {
        !self.tool_calls.is_empty() || !self.fragments.is_empty()
    }
}

/// Pull text and tool calls out of one decoded record. Text and tool calls
/// may share a record; both are returned.
pub fn extract(dialect: Dialect, record: &Value) -> ExtractedRecord {
    match dialect {
        Dialect::Ndjson => extract_ndjson(record),
        Dialect::EventStream => extract_event_stream(record),
    }
}

fn extract_ndjson(record: &Value) -> ExtractedRecord {
    let message = record.get("message");
    let text = message
        .and_then(|message| message.get("content"))
        .or_else(|| record.get("response"))
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(str::to_owned);
    let tool_calls = message
        .and_then(|message| message.get("tool_calls"))
        .map(parse_tool_calls)
        .unwrap_or_default();

    ExtractedRecord {
        text,
        tool_calls,
        fragments: Vec::new(),
        done: record.get("done").and_then(Value::as_bool).unwrap_or(false),
    }
}

fn extract_event_stream(record: &Value) -> ExtractedRecord {
    let Some(choice) = record.pointer("/choices/0") else {
        return ExtractedRecord::default();
    };

    let mut extracted = ExtractedRecord::default();
    if let Some(delta) = choice.get("delta") {
        extracted.text = non_empty_str(delta.get("content"));
        if let Some(Value::Array(items)) = delta.get("tool_calls") {
            extracted.fragments = items
                .iter()
                .filter_map(|item| match ToolCallFragment::deserialize(item) {
                    Ok(fragment) => Some(fragment),
                    Err(err) => {
                        debug!(error = %err, "Skipping malformed tool call fragment");
                        None
                    }
                })
                .collect();
        }
    }
    // Non-streaming completions carry a full message instead of a delta.
    if let Some(message) = choice.get("message") {
        if extracted.text.is_none() {
            extracted.text = non_empty_str(message.get("content"));
        }
        if let Some(calls) = message.get("tool_calls") {
            extracted.tool_calls = parse_tool_calls(calls);
        }
    }
    extracted
}

fn non_empty_str(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .filter(|text| !text.is_empty())
        .map(str::to_owned)
}

fn parse_tool_calls(value: &Value) -> Vec<ToolCallRequest> {
    let Value::Array(items) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| match WireToolCall::deserialize(item) {
            Ok(call) => Some(call.into_request()),
            Err(err) => {
                debug!(error = %err, "Skipping tool call without a name");
                None
            }
        })
        .collect()
}

#[derive(Debug, Default)]
struct PendingToolCall {
    id: Option<String>,
    name: Option<String>,
    arguments: String,
}

/// Reassembles event-stream tool calls whose name and arguments arrive in
/// pieces keyed by `index`.
#[derive(Debug, Default)]
pub struct ToolCallAccumulator {
    pending: BTreeMap<u32, PendingToolCall>,
}

impl ToolCallAccumulator {
    pub fn push(&mut self, fragment: ToolCallFragment) {
        let entry = self.pending.entry(fragment.index).or_default();
        if let Some(id) = fragment.id.filter(|id| !id.is_empty()) {
            entry.id = Some(id);
        }
        if let Some(function) = fragment.function {
            if let Some(name) = function.name.filter(|name| !name.is_empty()) {
                entry.name = Some(name);
            }
            if let Some(arguments) = function.arguments {
                entry.arguments.push_str(&arguments);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Complete calls in index order. Entries that never received a name are
    /// dropped.
    pub fn drain(&mut self) -> Vec<ToolCallRequest> {
        std::mem::take(&mut self.pending)
            .into_iter()
            .filter_map(|(index, call)| {
                let Some(name) = call.name else {
                    warn!(index, "Dropping streamed tool call without a name");
                    return None;
                };
                let arguments = RawArguments::Encoded(call.arguments).normalize(&name);
                Some(ToolCallRequest {
                    id: call.id,
                    name,
                    arguments,
                })
            })
            .collect()
    }
}
