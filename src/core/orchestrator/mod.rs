//! Turn orchestration: streams a reply from the chat endpoint, executes any
//! tool calls it contains, feeds the results back, and always ends with
//! something the user can read.
//!
//! A turn runs up to [`MAX_ROUNDS`] request rounds. Each round streams one
//! response under a [`StallWatchdog`]; a round that yields no text and no
//! tool calls gets exactly one non-streaming retry. The
//! [`FallbackController`] runs alongside the whole turn and generates a
//! layout directly if the model stays silent.

use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use serde_json::{Map, Value};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::api::ChatRequest;
use crate::core::backend::BackendClient;
use crate::core::chat_stream::{ChatTransport, TransportError};
use crate::core::config::defaults::{
    DEFAULT_BACKEND_URL, DEFAULT_ENDPOINT, DEFAULT_FALLBACK_TIMEOUT_SECS, DEFAULT_MODEL,
    DEFAULT_STALL_TIMEOUT_SECS,
};
use crate::core::fallback::FallbackController;
use crate::core::frame_decoder::{Dialect, Frame, StreamFrameDecoder};
use crate::core::message::{last_user_text, Message};
use crate::core::sanitizer::sanitize;
use crate::core::tool_calls::{extract, ExtractedRecord, ToolCallAccumulator, ToolCallRequest};
use crate::core::tools::{LayoutTool, ToolCallResult, ToolDefinition, ToolRegistry};
use crate::core::watchdog::StallWatchdog;

pub const MAX_ROUNDS: usize = 3;

/// How long an answered turn waits for a fallback generation already in
/// flight.
pub const FALLBACK_SETTLE_GRACE: Duration = Duration::from_millis(500);

pub const SUMMARY_STEERING_PROMPT: &str =
    "Now provide a brief, conversational summary of the generated layout for the user. Do not call any tools.";

#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorSettings {
    pub endpoint: String,
    pub model: String,
    pub dialect: Dialect,
    /// Zero disables the stall watchdog.
    pub stall_timeout: Duration,
    pub fallback_enabled: bool,
    pub fallback_timeout: Duration,
    pub backend_url: String,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            model: DEFAULT_MODEL.to_string(),
            dialect: Dialect::infer(DEFAULT_ENDPOINT),
            stall_timeout: Duration::from_secs(DEFAULT_STALL_TIMEOUT_SECS),
            fallback_enabled: false,
            fallback_timeout: Duration::from_secs(DEFAULT_FALLBACK_TIMEOUT_SECS),
            backend_url: DEFAULT_BACKEND_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedToolCall {
    pub name: String,
    pub arguments: Map<String, Value>,
    pub result: ToolCallResult,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TurnEvent {
    ToolResolved(ResolvedToolCall),
    FallbackLayout(Value),
    /// Human-readable notice.
    FallbackFailed(String),
}

#[derive(Debug, Clone)]
pub struct TurnOutcome {
    /// Sanitized text ready for display. Never blank.
    pub text: String,
    /// Everything the model streamed, unmodified.
    pub raw_text: String,
    pub reasoning: Option<String>,
    pub tool_results: Vec<ResolvedToolCall>,
    pub fallback_layout: Option<Value>,
    pub rounds: usize,
    /// The conversation buffer as it stood when the turn ended.
    pub messages: Vec<Message>,
}

#[derive(Debug)]
pub enum TurnError {
    Transport(TransportError),
    Cancelled,
}

impl fmt::Display for TurnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TurnError::Transport(err) => write!(f, "{err}"),
            TurnError::Cancelled => write!(f, "Turn cancelled"),
        }
    }
}

impl StdError for TurnError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            TurnError::Transport(err) => Some(err),
            TurnError::Cancelled => None,
        }
    }
}

impl From<TransportError> for TurnError {
    fn from(err: TransportError) -> Self {
        TurnError::Transport(err)
    }
}

/// Handle to a turn running on its own task.
pub struct TurnHandle {
    /// Text deltas in arrival order. Closes when the turn ends.
    pub text: UnboundedReceiver<String>,
    pub events: UnboundedReceiver<TurnEvent>,
    pub outcome: JoinHandle<Result<TurnOutcome, TurnError>>,
    cancel: CancellationToken,
}

impl TurnHandle {
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

/// Per-round bookkeeping. Dropped when the round ends.
#[derive(Debug, Default)]
pub struct RoundState {
    pub round_index: usize,
    pub tools_enabled: bool,
    pub chars_streamed: usize,
    pub tool_calls_handled: usize,
    pub text: String,
    pending_calls: Vec<ToolCallRequest>,
}

impl RoundState {
    fn new(round_index: usize, tools_enabled: bool) -> Self {
        Self {
            round_index,
            tools_enabled,
            ..Default::default()
        }
    }

    fn is_empty(&self) -> bool {
        self.chars_streamed == 0 && self.pending_calls.is_empty()
    }

    /// Pending calls with ids filled in, so tool messages can reference them.
    fn take_calls(&mut self) -> Vec<ToolCallRequest> {
        let round = self.round_index;
        std::mem::take(&mut self.pending_calls)
            .into_iter()
            .enumerate()
            .map(|(n, mut call)| {
                if call.id.as_deref().is_none_or(str::is_empty) {
                    call.id = Some(format!("call_{round}_{n}"));
                }
                call
            })
            .collect()
    }
}

/// Shared pieces a round needs while it reads the stream.
struct RoundSinks<'a> {
    text: &'a UnboundedSender<String>,
    fallback: &'a FallbackController,
}

#[derive(Clone)]
pub struct ConversationOrchestrator {
    settings: OrchestratorSettings,
    transport: ChatTransport,
    registry: ToolRegistry,
    backend: BackendClient,
}

impl ConversationOrchestrator {
    pub fn new(
        settings: OrchestratorSettings,
        transport: ChatTransport,
        registry: ToolRegistry,
        backend: BackendClient,
    ) -> Self {
        Self {
            settings,
            transport,
            registry,
            backend,
        }
    }

    /// Wire up the chat transport, layout backend and the layout tool from
    /// settings alone.
    pub fn from_settings(
        settings: OrchestratorSettings,
        client: reqwest::Client,
        api_key: Option<String>,
    ) -> Self {
        let transport =
            ChatTransport::new(client.clone(), &settings.endpoint, settings.dialect, api_key);
        let backend = BackendClient::new(client, settings.backend_url.clone());
        let registry = ToolRegistry::new().with(Arc::new(LayoutTool::new(backend.clone())));
        Self::new(settings, transport, registry, backend)
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.registry.definitions()
    }

    pub fn backend(&self) -> &BackendClient {
        &self.backend
    }

    /// Run a turn on its own task.
    pub fn start_turn(&self, history: Vec<Message>, tools: Vec<ToolDefinition>) -> TurnHandle {
        let (text_tx, text_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let orchestrator = self.clone();
        let token = cancel.clone();
        let outcome = tokio::spawn(async move {
            orchestrator
                .run_turn(history, tools, text_tx, events_tx, token)
                .await
        });
        TurnHandle {
            text: text_rx,
            events: events_rx,
            outcome,
            cancel,
        }
    }

    pub async fn run_turn(
        &self,
        history: Vec<Message>,
        tools: Vec<ToolDefinition>,
        text_tx: UnboundedSender<String>,
        events: UnboundedSender<TurnEvent>,
        cancel: CancellationToken,
    ) -> Result<TurnOutcome, TurnError> {
        let mut messages = history;
        let user_text = last_user_text(&messages).unwrap_or_default().to_string();
        let fallback = FallbackController::spawn(
            &self.settings,
            self.backend.clone(),
            user_text,
            events.clone(),
            &cancel,
        );
        let sinks = RoundSinks {
            text: &text_tx,
            fallback: &fallback,
        };

        let mut raw_text = String::new();
        let mut tool_results: Vec<ResolvedToolCall> = Vec::new();
        let mut rounds = 0;

        for round_index in 0..MAX_ROUNDS {
            if cancel.is_cancelled() {
                return Err(TurnError::Cancelled);
            }
            rounds = round_index + 1;

            let tools_enabled = tool_results.is_empty() && !tools.is_empty();
            let request = ChatRequest::new(
                &self.settings.model,
                &messages,
                tools_enabled.then_some(tools.as_slice()),
                self.settings.dialect,
            );
            let mut round = RoundState::new(round_index, tools_enabled);
            debug!(round = round_index, tools_enabled, "Starting round");

            let round_token = cancel.child_token();
            self.stream_round(&request, &mut round, &round_token, &sinks)
                .await;
            if cancel.is_cancelled() {
                return Err(TurnError::Cancelled);
            }

            if round.is_empty() {
                debug!(round = round_index, "Round produced nothing; retrying without streaming");
                let retried = tokio::select! {
                    _ = cancel.cancelled() => return Err(TurnError::Cancelled),
                    result = self.transport.complete(&request) => result,
                };
                match retried {
                    Ok(body) => {
                        let record = extract(self.settings.dialect, &body);
                        apply_record(record, &mut round, None, &sinks);
                    }
                    Err(err) => {
                        warn!(error = %err, round = round_index, "Non-streaming retry failed");
                        if raw_text.is_empty() && tool_results.is_empty() {
                            // A fallback layout still lets the turn end with content.
                            let layout = fallback.finish().await;
                            return match layout {
                                Some(layout) => Ok(self.conclude(
                                    messages,
                                    raw_text,
                                    tool_results,
                                    Some(layout),
                                    rounds,
                                )),
                                None => Err(TurnError::Transport(err)),
                            };
                        }
                        break;
                    }
                }
            }

            raw_text.push_str(&round.text);
            let calls = round.take_calls();
            if calls.is_empty() {
                if !round.text.is_empty() {
                    messages.push(Message::assistant(round.text.clone()));
                }
                break;
            }

            fallback.disarm();
            let mut content = round.text.clone();
            for call in calls {
                messages.push(Message::assistant_tool_calls(
                    std::mem::take(&mut content),
                    vec![call.clone()],
                ));
                let result = tokio::select! {
                    _ = cancel.cancelled() => return Err(TurnError::Cancelled),
                    result = self.registry.dispatch(&call) => result,
                };
                debug!(tool = %call.name, success = result.success, "Tool call resolved");
                messages.push(Message::tool_result(call.id.clone(), result.message_content()));
                round.tool_calls_handled += 1;

                let resolved = ResolvedToolCall {
                    name: call.name,
                    arguments: call.arguments,
                    result,
                };
                let _ = events.send(TurnEvent::ToolResolved(resolved.clone()));
                tool_results.push(resolved);
            }

            if round_index + 1 < MAX_ROUNDS {
                messages.push(Message::user(SUMMARY_STEERING_PROMPT));
            } else {
                debug!("Round limit reached");
            }
        }

        // The fallback only needs its full run when the model produced nothing.
        let layout = if raw_text.is_empty() && tool_results.is_empty() {
            fallback.finish().await
        } else {
            fallback.settle(FALLBACK_SETTLE_GRACE).await
        };
        Ok(self.conclude(messages, raw_text, tool_results, layout, rounds))
    }

    async fn stream_round(
        &self,
        request: &ChatRequest,
        round: &mut RoundState,
        round_token: &CancellationToken,
        sinks: &RoundSinks<'_>,
    ) {
        let mut watchdog = StallWatchdog::new(self.settings.stall_timeout);
        let opened = tokio::select! {
            _ = round_token.cancelled() => return,
            _ = watchdog.expired() => {
                warn!(
                    round = round.round_index,
                    budget = ?watchdog.budget(),
                    "Chat endpoint did not respond in time"
                );
                round_token.cancel();
                return;
            }
            opened = self.transport.open_stream(request) => opened,
        };
        let mut stream = match opened {
            Ok(stream) => stream,
            Err(err) => {
                warn!(error = %err, round = round.round_index, "Failed to open chat stream");
                return;
            }
        };

        let mut decoder = StreamFrameDecoder::new(self.settings.dialect);
        let mut accumulator = ToolCallAccumulator::default();
        watchdog.feed();

        loop {
            tokio::select! {
                _ = round_token.cancelled() => break,
                _ = watchdog.expired() => {
                    warn!(
                        round = round.round_index,
                        budget = ?watchdog.budget(),
                        "Chat stream stalled"
                    );
                    round_token.cancel();
                    break;
                }
                chunk = stream.next() => match chunk {
                    Some(Ok(bytes)) => {
                        watchdog.feed();
                        let frames = decoder.push(&bytes);
                        if self.apply_frames(frames, round, &mut accumulator, sinks) {
                            break;
                        }
                    }
                    Some(Err(err)) => {
                        warn!(error = %err, round = round.round_index, "Chat stream interrupted");
                        break;
                    }
                    None => {
                        let frames = decoder.finish();
                        self.apply_frames(frames, round, &mut accumulator, sinks);
                        break;
                    }
                }
            }
        }

        round.pending_calls.extend(accumulator.drain());
    }

    /// Returns true once the stream has signalled completion.
    fn apply_frames(
        &self,
        frames: Vec<Frame>,
        round: &mut RoundState,
        accumulator: &mut ToolCallAccumulator,
        sinks: &RoundSinks<'_>,
    ) -> bool {
        let mut done = false;
        for frame in frames {
            match frame {
                Frame::Done => done = true,
                Frame::Record(value) => {
                    let record = extract(self.settings.dialect, &value);
                    done |= apply_record(record, round, Some(accumulator), sinks);
                }
            }
        }
        done
    }

    fn conclude(
        &self,
        mut messages: Vec<Message>,
        raw_text: String,
        tool_results: Vec<ResolvedToolCall>,
        fallback_layout: Option<Value>,
        rounds: usize,
    ) -> TurnOutcome {
        let mut sanitized = sanitize(&raw_text);
        if sanitized.answer.is_empty() {
            let summary = tool_results
                .iter()
                .rev()
                .find(|resolved| resolved.result.success)
                .map(|resolved| &resolved.result.payload)
                .or(fallback_layout.as_ref())
                .map(summarize_layout);
            if let Some(summary) = summary {
                messages.push(Message::assistant(summary.clone()));
                sanitized.answer = summary;
            }
        }

        TurnOutcome {
            text: sanitized.render(),
            raw_text,
            reasoning: sanitized.reasoning,
            tool_results,
            fallback_layout,
            rounds,
            messages,
        }
    }
}

/// Fold one extracted record into the round. Returns the record's `done`
/// flag.
fn apply_record(
    record: ExtractedRecord,
    round: &mut RoundState,
    accumulator: Option<&mut ToolCallAccumulator>,
    sinks: &RoundSinks<'_>,
) -> bool {
    if record.signals_tool_call() {
        sinks.fallback.disarm();
    }
    if let Some(delta) = record.text.filter(|text| !text.is_empty()) {
        sinks.fallback.disarm();
        round.chars_streamed += delta.chars().count();
        round.text.push_str(&delta);
        let _ = sinks.text.send(delta);
    }
    round.pending_calls.extend(record.tool_calls);
    match accumulator {
        Some(accumulator) => {
            for fragment in record.fragments {
                accumulator.push(fragment);
            }
        }
        None => {
            let mut accumulator = ToolCallAccumulator::default();
            for fragment in record.fragments {
                accumulator.push(fragment);
            }
            round.pending_calls.extend(accumulator.drain());
        }
    }
    record.done
}

/// One-line description of a backend layout response.
pub fn summarize_layout(payload: &Value) -> String {
    let rooms = payload
        .get("rooms")
        .or_else(|| payload.pointer("/layout/rooms"))
        .and_then(Value::as_array)
        .map(Vec::len)
        .unwrap_or(0);
    let mut summary = format!(
        "I generated a layout with {rooms} {}",
        if rooms == 1 { "room" } else { "rooms" }
    );

    let score = payload
        .get("score")
        .or_else(|| payload.get("vastu_score"))
        .and_then(Value::as_f64);
    if let Some(score) = score {
        summary.push_str(&format!(" (Vastu score: {score})"));
    }

    if let Some(solver) = payload.get("solver_type").and_then(Value::as_str) {
        summary.push_str(&format!(" using the {solver} solver"));
    }
    summary.push('.');
    summary
}
