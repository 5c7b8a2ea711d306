//! Line framing for streamed chat responses.
//!
//! Chat endpoints deliver records in one of two dialects:
//! - newline-delimited JSON (one object per line, final line carries `"done": true`)
//! - `data: `-prefixed event streams terminated by `data: [DONE]`
//!
//! Transport chunks do not respect record boundaries, so the decoder keeps the
//! trailing partial line between calls to [`StreamFrameDecoder::push`] and only
//! parses it once a later chunk completes it or the stream ends.

use std::fmt;
use std::str::FromStr;

use memchr::memchr;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::utils::url::endpoint_port;

/// Port used by local NDJSON chat servers (Ollama).
pub const NDJSON_DEFAULT_PORT: u16 = 11434;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Dialect {
    /// Dialect A: one JSON object per line.
    Ndjson,
    /// Dialect B: `data: ` prefixed server-sent events.
    EventStream,
}

impl Dialect {
    pub fn as_str(self) -> &'static str {
        match self {
            Dialect::Ndjson => "ndjson",
            Dialect::EventStream => "event-stream",
        }
    }

    /// Pick a dialect from the endpoint alone. Endpoints on the NDJSON server
    /// port speak dialect A, everything else is assumed to be event-stream.
    pub fn infer(endpoint: &str) -> Self {
        if endpoint_port(endpoint) == Some(NDJSON_DEFAULT_PORT) {
            Dialect::Ndjson
        } else {
            Dialect::EventStream
        }
    }

    /// Explicit choice wins; otherwise infer from the endpoint.
    pub fn resolve(explicit: Option<Dialect>, endpoint: &str) -> Self {
        explicit.unwrap_or_else(|| Self::infer(endpoint))
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dialect {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ndjson" | "jsonl" | "ollama" => Ok(Dialect::Ndjson),
            "event-stream" | "sse" | "openai" => Ok(Dialect::EventStream),
            other => Err(format!(
                "unknown dialect '{other}' (expected 'ndjson' or 'event-stream')"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Record(Value),
    /// The event-stream sentinel (`data: [DONE]`).
    Done,
}

pub struct StreamFrameDecoder {
    dialect: Dialect,
    buffer: Vec<u8>,
    done: bool,
}

impl StreamFrameDecoder {
    pub fn new(dialect: Dialect) -> Self {
        Self {
            dialect,
            buffer: Vec::new(),
            done: false,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.dialect
    }

    /// Feed one transport chunk and return every record it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Frame> {
        let mut frames = Vec::new();
        if self.done {
            return frames;
        }

        self.buffer.extend_from_slice(chunk);
        while let Some(newline_pos) = memchr(b'\n', &self.buffer) {
            let line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            if let Some(frame) = self.decode_line(&line[..newline_pos]) {
                frames.push(frame);
            }
            if self.done {
                self.buffer.clear();
                break;
            }
        }
        frames
    }

    /// Signal end of stream. Any buffered partial line is parsed as one final
    /// record. The decoder is reset afterwards and can be reused.
    pub fn finish(&mut self) -> Vec<Frame> {
        let rest = std::mem::take(&mut self.buffer);
        let frames = if self.done {
            Vec::new()
        } else {
            self.decode_line(&rest).into_iter().collect()
        };
        self.done = false;
        frames
    }

    fn decode_line(&mut self, raw: &[u8]) -> Option<Frame> {
        let line = match std::str::from_utf8(raw) {
            Ok(line) => line.trim(),
            Err(err) => {
                debug!(error = %err, "Skipping stream line with invalid UTF-8");
                return None;
            }
        };
        if line.is_empty() {
            return None;
        }

        let payload = match self.dialect {
            Dialect::Ndjson => line,
            Dialect::EventStream => {
                let payload = line.strip_prefix("data:")?.trim_start();
                if payload == "[DONE]" {
                    self.done = true;
                    return Some(Frame::Done);
                }
                payload
            }
        };

        match serde_json::from_str::<Value>(payload) {
            Ok(value) => Some(Frame::Record(value)),
            Err(err) => {
                debug!(dialect = %self.dialect, error = %err, "Skipping malformed stream record");
                None
            }
        }
    }
}

/// Decode a complete body in one pass.
pub fn decode_all(dialect: Dialect, body: &[u8]) -> Vec<Frame> {
    let mut decoder = StreamFrameDecoder::new(dialect);
    let mut frames = decoder.push(body);
    frames.extend(decoder.finish());
    frames
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const NDJSON_BODY: &str = concat!(
        "{\"message\":{\"content\":\"Hel\"},\"done\":false}\n",
        "not json at all\n",
        "\n",
        "{\"message\":{\"content\":\"lo ✓\"},\"done\":false}\r\n",
        "{\"message\":{\"content\":\"\"},\"done\":true}"
    );

    const SSE_BODY: &str = concat!(
        ": keep-alive\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"Namaste\"}}]}\n\n",
        "event: ping\n",
        "data:{\"choices\":[{\"delta\":{\"content\":\" ji\"}}]}\n\n",
        "data: {broken\n\n",
        "data: [DONE]\n\n",
        "data: {\"choices\":[{\"delta\":{\"content\":\"after done\"}}]}\n"
    );

    fn decode_in_parts(dialect: Dialect, body: &[u8], sizes: &[usize]) -> Vec<Frame> {
        let mut decoder = StreamFrameDecoder::new(dialect);
        let mut frames = Vec::new();
        let mut offset = 0;
        let mut index = 0;
        while offset < body.len() {
            let size = sizes[index % sizes.len()].max(1);
            let end = (offset + size).min(body.len());
            frames.extend(decoder.push(&body[offset..end]));
            offset = end;
            index += 1;
        }
        frames.extend(decoder.finish());
        frames
    }

    #[test]
    fn ndjson_skips_malformed_lines_and_flushes_trailing_record() {
        let frames = decode_all(Dialect::Ndjson, NDJSON_BODY.as_bytes());
        assert_eq!(
            frames,
            vec![
                Frame::Record(json!({"message":{"content":"Hel"},"done":false})),
                Frame::Record(json!({"message":{"content":"lo ✓"},"done":false})),
                Frame::Record(json!({"message":{"content":""},"done":true})),
            ]
        );
    }

    #[test]
    fn event_stream_ignores_non_data_lines_and_stops_at_sentinel() {
        let frames = decode_all(Dialect::EventStream, SSE_BODY.as_bytes());
        assert_eq!(frames.len(), 3);
        assert_eq!(
            frames[0],
            Frame::Record(json!({"choices":[{"delta":{"content":"Namaste"}}]}))
        );
        assert_eq!(
            frames[1],
            Frame::Record(json!({"choices":[{"delta":{"content":" ji"}}]}))
        );
        assert_eq!(frames[2], Frame::Done);
    }

    #[test]
    fn decoding_is_invariant_to_chunk_boundaries() {
        for (dialect, body) in [
            (Dialect::Ndjson, NDJSON_BODY.as_bytes()),
            (Dialect::EventStream, SSE_BODY.as_bytes()),
        ] {
            let whole = decode_all(dialect, body);
            for split in 0..=body.len() {
                let mut decoder = StreamFrameDecoder::new(dialect);
                let mut frames = decoder.push(&body[..split]);
                frames.extend(decoder.push(&body[split..]));
                frames.extend(decoder.finish());
                assert_eq!(frames, whole, "{dialect} split at byte {split}");
            }
            for sizes in [&[1][..], &[2, 5], &[3, 1, 7], &[13], &[64]] {
                assert_eq!(
                    decode_in_parts(dialect, body, sizes),
                    whole,
                    "{dialect} split into {sizes:?}"
                );
            }
        }
    }

    #[test]
    fn finish_resets_decoder_for_reuse() {
        let mut decoder = StreamFrameDecoder::new(Dialect::EventStream);
        assert_eq!(decoder.push(b"data: [DONE]\n"), vec![Frame::Done]);
        assert!(decoder.push(b"data: {\"a\":1}\n").is_empty());
        assert!(decoder.finish().is_empty());

        assert_eq!(
            decoder.push(b"data: {\"a\":2}\n"),
            vec![Frame::Record(json!({"a": 2}))]
        );
    }

    #[test]
    fn dialect_inference_prefers_explicit_choice() {
        assert_eq!(Dialect::infer("http://localhost:11434"), Dialect::Ndjson);
        assert_eq!(Dialect::infer("http://127.0.0.1:11434/api/chat"), Dialect::Ndjson);
        assert_eq!(Dialect::infer("https://api.openai.com/v1"), Dialect::EventStream);
        assert_eq!(Dialect::infer("http://localhost:8080/v1"), Dialect::EventStream);
        assert_eq!(
            Dialect::resolve(Some(Dialect::EventStream), "http://localhost:11434"),
            Dialect::EventStream
        );
        assert_eq!("SSE".parse::<Dialect>(), Ok(Dialect::EventStream));
        assert!("grpc".parse::<Dialect>().is_err());
    }
}
