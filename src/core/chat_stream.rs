use std::error::Error as StdError;
use std::fmt;

use futures_util::stream::BoxStream;
use futures_util::{StreamExt, TryStreamExt};
use reqwest::StatusCode;
use serde_json::Value;
use tracing::debug;

use crate::api::ChatRequest;
use crate::core::frame_decoder::Dialect;
use crate::utils::url::ensure_endpoint_path;

/// Raw response body chunks, in arrival order.
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, TransportError>>;

#[derive(Debug)]
pub enum TransportError {
    Status { status: StatusCode, body: String },
    Network(reqwest::Error),
    Decode(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Status { status, body } => {
                write!(f, "Chat endpoint returned {status}. {}", format_api_error(body))
            }
            TransportError::Network(err) => write!(f, "Chat endpoint unreachable: {err}"),
            TransportError::Decode(err) => {
                write!(f, "Chat endpoint sent an invalid response: {err}")
            }
        }
    }
}

impl StdError for TransportError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            TransportError::Network(err) => Some(err),
            _ => None,
        }
    }
}

fn extract_error_summary(value: &Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value.get("error").and_then(|v| match v {
                Value::String(s) => Some(s.to_string()),
                Value::Object(map) => map
                    .get("message")
                    .and_then(|message| message.as_str().map(str::to_owned)),
                _ => None,
            })
        })
        .or_else(|| {
            value
                .get("message")
                .or_else(|| value.get("detail"))
                .and_then(|v| v.as_str().map(str::to_owned))
        });

    summary.map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
}

/// Render an error body for display, pretty-printing JSON and leading with
/// the server's own message when one can be found.
pub fn format_api_error(error_text: &str) -> String {
    let trimmed = error_text.trim();

    if trimmed.is_empty() {
        return "API Error:\n```\n<empty>\n```".to_string();
    }

    if let Ok(json_value) = serde_json::from_str::<Value>(trimmed) {
        if let Ok(pretty_json) = serde_json::to_string_pretty(&json_value) {
            return match extract_error_summary(&json_value).filter(|s| !s.is_empty()) {
                Some(summary) => format!("API Error: {summary}\n```json\n{pretty_json}\n```"),
                None => format!("API Error:\n```json\n{pretty_json}\n```"),
            };
        }
    }

    if trimmed.starts_with('<') && trimmed.ends_with('>') {
        format!("API Error:\n```xml\n{trimmed}\n```")
    } else {
        format!("API Error:\n```\n{trimmed}\n```")
    }
}

/// HTTP client for the chat-completion endpoint.
#[derive(Clone)]
pub struct ChatTransport {
    client: reqwest::Client,
    chat_url: String,
    dialect: Dialect,
    api_key: Option<String>,
}

impl ChatTransport {
    pub fn new(
        client: reqwest::Client,
        endpoint: &str,
        dialect: Dialect,
        api_key: Option<String>,
    ) -> Self {
        let path = match dialect {
            Dialect::Ndjson => "api/chat",
            Dialect::EventStream => "chat/completions",
        };
        Self {
            client,
            chat_url: ensure_endpoint_path(endpoint, path),
            dialect,
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        }
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    fn post(&self) -> reqwest::RequestBuilder {
        let request = self
            .client
            .post(&self.chat_url)
            .header("Content-Type", "application/json");
        match &self.api_key {
            Some(key) => request.header("Authorization", format!("Bearer {key}")),
            None => request,
        }
    }

    /// Send a streaming request and hand back the body as a chunk stream.
    /// Dropping the stream aborts the request.
    pub async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream, TransportError> {
        debug!(url = %self.chat_url, tools = request.tools.is_some(), "Opening chat stream");
        let response = self
            .post()
            .json(request)
            .send()
            .await
            .map_err(TransportError::Network)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<no body>".to_string());
            return Err(TransportError::Status { status, body });
        }

        Ok(response
            .bytes_stream()
            .map_ok(|bytes| bytes.to_vec())
            .map_err(TransportError::Network)
            .boxed())
    }

    /// The same request without streaming; returns the whole response body.
    pub async fn complete(&self, request: &ChatRequest) -> Result<Value, TransportError> {
        debug!(url = %self.chat_url, "Sending non-streaming chat request");
        let response = self
            .post()
            .json(&request.non_streaming())
            .send()
            .await
            .map_err(TransportError::Network)?;

        let status = response.status();
        let body = response.text().await.map_err(TransportError::Network)?;
        if !status.is_success() {
            return Err(TransportError::Status { status, body });
        }
        serde_json::from_str(body.trim()).map_err(|err| TransportError::Decode(err.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::message::Message;
    use crate::utils::test_utils::{spawn_mock_server, test_http_client, MockResponse};
    use serde_json::json;

    #[test]
    fn format_api_error_prettifies_json_with_summary() {
        let raw = r#"{"error":{"message":"model   overloaded","type":"invalid_request_error"}}"#;
        let formatted = format_api_error(raw);

        let expected = r#"API Error: model overloaded
```json
{
  "error": {
    "message": "model   overloaded",
    "type": "invalid_request_error"
  }
}
```"#;
        assert_eq!(formatted, expected);
    }

    #[test]
    fn format_api_error_uses_fastapi_detail() {
        let formatted = format_api_error(r#"{"detail":"Not Found"}"#);
        assert!(formatted.starts_with("API Error: Not Found\n"));
    }

    #[test]
    fn format_api_error_handles_xml_plaintext_and_empty() {
        assert_eq!(
            format_api_error("<error>bad</error>"),
            "API Error:\n```xml\n<error>bad</error>\n```"
        );
        assert_eq!(format_api_error("api failure"), "API Error:\n```\napi failure\n```");
        assert_eq!(format_api_error("  "), "API Error:\n```\n<empty>\n```");
    }

    #[test]
    fn chat_url_depends_on_dialect() {
        let client = test_http_client();
        let ndjson = ChatTransport::new(
            client.clone(),
            "http://localhost:11434/",
            Dialect::Ndjson,
            None,
        );
        assert_eq!(ndjson.chat_url(), "http://localhost:11434/api/chat");

        let sse = ChatTransport::new(
            client,
            "https://api.example.com/v1/chat/completions",
            Dialect::EventStream,
            Some(" ".into()),
        );
        assert_eq!(sse.chat_url(), "https://api.example.com/v1/chat/completions");
        assert!(sse.api_key.is_none());
    }

    #[tokio::test]
    async fn open_stream_reports_status_errors_with_body() {
        let server = spawn_mock_server(vec![MockResponse::json(
            503,
            json!({"error": {"message": "model is loading"}}),
        )])
        .await;
        let transport =
            ChatTransport::new(test_http_client(), &server.base_url(), Dialect::Ndjson, None);
        let request = ChatRequest::new("llama3.1", &[Message::user("hi")], None, Dialect::Ndjson);

        let err = match transport.open_stream(&request).await {
            Ok(_) => panic!("expected a status error"),
            Err(err) => err,
        };
        assert!(matches!(err, TransportError::Status { status, .. } if status.as_u16() == 503));
        assert!(err.to_string().contains("model is loading"));
    }

    #[tokio::test]
    async fn complete_sends_stream_false() {
        let server = spawn_mock_server(vec![MockResponse::json(
            200,
            json!({"message": {"role": "assistant", "content": "Hello"}, "done": true}),
        )])
        .await;
        let transport =
            ChatTransport::new(test_http_client(), &server.base_url(), Dialect::Ndjson, None);
        let request = ChatRequest::new("llama3.1", &[Message::user("hi")], None, Dialect::Ndjson);

        let body = transport.complete(&request).await.expect("complete");
        assert_eq!(body["message"]["content"], "Hello");

        let requests = server.requests().await;
        assert!(requests[0].request_line.starts_with("POST /api/chat"));
        assert_eq!(requests[0].body["stream"], false);
        assert_eq!(requests[0].body["messages"][0]["role"], "user");
    }
}
