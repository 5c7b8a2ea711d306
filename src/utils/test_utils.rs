//! In-process HTTP fixtures for exercising the chat endpoint and the layout
//! backend without network access.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

/// Client that never routes through a proxy picked up from the environment.
pub fn test_http_client() -> reqwest::Client {
    reqwest::Client::builder()
        .no_proxy()
        .build()
        .expect("test client should build")
}

#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub request_line: String,
    pub body: Value,
}

/// A canned response. The body is written as a sequence of chunks, each after
/// its delay, and is delimited by closing the connection.
#[derive(Debug, Clone)]
pub struct MockResponse {
    pub status: u16,
    pub content_type: &'static str,
    pub chunks: Vec<(Duration, String)>,
    /// Keep the connection open this long after the last chunk.
    pub hold_open: Duration,
}

impl MockResponse {
    pub fn json(status: u16, body: Value) -> Self {
        Self {
            status,
            content_type: "application/json",
            chunks: vec![(Duration::ZERO, body.to_string())],
            hold_open: Duration::ZERO,
        }
    }

    pub fn stream(content_type: &'static str, chunks: Vec<(Duration, String)>) -> Self {
        Self {
            status: 200,
            content_type,
            chunks,
            hold_open: Duration::ZERO,
        }
    }

    /// NDJSON stream written in one go.
    pub fn ndjson(records: &[Value]) -> Self {
        let body: String = records.iter().map(|record| format!("{record}\n")).collect();
        Self::stream("application/x-ndjson", vec![(Duration::ZERO, body)])
    }

    /// Event stream of `data:` records followed by `[DONE]`.
    pub fn event_stream(records: &[Value]) -> Self {
        let mut body: String = records
            .iter()
            .map(|record| format!("data: {record}\n\n"))
            .collect();
        body.push_str("data: [DONE]\n\n");
        Self::stream("text/event-stream", vec![(Duration::ZERO, body)])
    }

    pub fn held_open(mut self, duration: Duration) -> Self {
        self.hold_open = duration;
        self
    }
}

pub struct MockServer {
    addr: std::net::SocketAddr,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
}

impl MockServer {
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().await.clone()
    }
}

/// Serve `responses` in order, one per incoming connection. Each connection
/// is handled on its own task so a held-open stream does not block the next
/// request.
pub async fn spawn_mock_server(responses: Vec<MockResponse>) -> MockServer {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("listener should bind");
    let addr = listener.local_addr().expect("local addr should resolve");
    let requests: Arc<Mutex<Vec<CapturedRequest>>> = Arc::new(Mutex::new(Vec::new()));
    let captured = Arc::clone(&requests);

    tokio::spawn(async move {
        for response in responses {
            let Ok((stream, _)) = listener.accept().await else {
                return;
            };
            let captured = Arc::clone(&captured);
            tokio::spawn(async move {
                let _ = serve_connection(stream, response, captured).await;
            });
        }
    });

    MockServer { addr, requests }
}

async fn serve_connection(
    mut stream: TcpStream,
    response: MockResponse,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
) -> Result<(), String> {
    let (request_line, body) = read_http_request(&mut stream).await?;
    let body = serde_json::from_slice(&body).unwrap_or(Value::Null);
    captured.lock().await.push(CapturedRequest { request_line, body });

    let head = format!(
        "HTTP/1.1 {} {}\r\ncontent-type: {}\r\nconnection: close\r\n\r\n",
        response.status,
        reason_phrase(response.status),
        response.content_type
    );
    stream
        .write_all(head.as_bytes())
        .await
        .map_err(|err| err.to_string())?;

    for (delay, chunk) in response.chunks {
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        stream
            .write_all(chunk.as_bytes())
            .await
            .map_err(|err| err.to_string())?;
        stream.flush().await.map_err(|err| err.to_string())?;
    }

    if !response.hold_open.is_zero() {
        tokio::time::sleep(response.hold_open).await;
    }
    stream.shutdown().await.map_err(|err| err.to_string())
}

fn reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    }
}

async fn read_http_request(stream: &mut TcpStream) -> Result<(String, Vec<u8>), String> {
    let mut buffer = Vec::new();
    let mut header_end = None;
    while header_end.is_none() {
        let mut chunk = [0_u8; 1024];
        let read = stream
            .read(&mut chunk)
            .await
            .map_err(|err| err.to_string())?;
        if read == 0 {
            return Err("Unexpected EOF while reading HTTP headers".to_string());
        }
        buffer.extend_from_slice(&chunk[..read]);
        header_end = buffer
            .windows(4)
            .position(|window| window == b"\r\n\r\n")
            .map(|index| index + 4);
    }

    let header_end = header_end.expect("header end should exist");
    let header_text =
        std::str::from_utf8(&buffer[..header_end]).map_err(|err| err.to_string())?;
    let mut lines = header_text.split("\r\n").filter(|line| !line.is_empty());
    let request_line = lines
        .next()
        .ok_or_else(|| "Missing HTTP request line".to_string())?
        .to_string();

    let mut content_length = 0_usize;
    for line in lines {
        let mut parts = line.splitn(2, ':');
        let Some(name) = parts.next() else {
            continue;
        };
        if name.eq_ignore_ascii_case("content-length") {
            content_length = parts
                .next()
                .unwrap_or_default()
                .trim()
                .parse::<usize>()
                .map_err(|err| err.to_string())?;
        }
    }

    let mut body = buffer[header_end..].to_vec();
    while body.len() < content_length {
        let mut chunk = vec![0_u8; content_length - body.len()];
        let read = stream
            .read(&mut chunk)
            .await
            .map_err(|err| err.to_string())?;
        if read == 0 {
            return Err("Unexpected EOF while reading HTTP body".to_string());
        }
        body.extend_from_slice(&chunk[..read]);
    }
    body.truncate(content_length);

    Ok((request_line, body))
}
