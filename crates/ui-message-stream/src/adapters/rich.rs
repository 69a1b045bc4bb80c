use std::collections::VecDeque;
use std::sync::Arc;

use futures::StreamExt as _;
use futures::stream;
use tracing::{debug, error};

use crate::accumulator::{DeltaAccumulator, FinalizedToolCall};
use crate::errors::AdapterError;
use crate::event::{FinishReason, UiEvent};
use crate::message::ChatMessage;
use crate::provider::{ChatCompletionProvider, ChunkStream, CompletionRequest};
use crate::session::StreamSession;
use crate::sse::{DONE_FRAME, encode_frame};
use crate::stream::UiMessageStream;
use crate::tools::ToolRegistry;

enum Phase {
    Connect,
    Streaming(ChunkStream),
    Dispatch(VecDeque<FinalizedToolCall>),
    Finish,
    Done,
}

struct RichStream {
    provider: Arc<dyn ChatCompletionProvider>,
    tools: Arc<ToolRegistry>,
    messages: Vec<ChatMessage>,
    accumulator: DeltaAccumulator,
    phase: Phase,
    pending: VecDeque<String>,
}

/// Streams a tool-calling completion as UI message stream frames.
///
/// Emits `start` immediately, then requests the completion with the full
/// history and every registered tool definition. Tool calls reported with
/// finish reason `tool_calls` are dispatched in ascending index order once
/// the upstream stream is exhausted.
///
/// A fault after `start` is logged and returned as the final `Err` item; no
/// `finish` or sentinel frame follows it.
pub fn stream_text(
    provider: Arc<dyn ChatCompletionProvider>,
    messages: Vec<ChatMessage>,
    tools: Arc<ToolRegistry>,
) -> UiMessageStream {
    stream_text_with_session(provider, messages, tools, StreamSession::new())
}

pub(crate) fn stream_text_with_session(
    provider: Arc<dyn ChatCompletionProvider>,
    messages: Vec<ChatMessage>,
    tools: Arc<ToolRegistry>,
    session: StreamSession,
) -> UiMessageStream {
    let mut pending = VecDeque::new();
    let phase = match encode_frame(&session.start_event()) {
        Ok(frame) => {
            pending.push_back(frame);
            Phase::Connect
        }
        Err(err) => return Box::pin(stream::once(async move { Err::<String, _>(err) })),
    };

    let state = RichStream {
        provider,
        tools,
        messages,
        accumulator: DeltaAccumulator::new(session),
        phase,
        pending,
    };

    Box::pin(stream::try_unfold(state, |mut state| async move {
        loop {
            if let Some(frame) = state.pending.pop_front() {
                return Ok(Some((frame, state)));
            }
            match state.advance().await {
                Ok(true) => continue,
                Ok(false) => return Ok(None),
                Err(err) => {
                    error!(
                        message_id = %state.accumulator.session().message_id(),
                        provider = %state.provider.id(),
                        error = %err,
                        detail = ?err,
                        "ui message stream failed"
                    );
                    return Err(err);
                }
            }
        }
    }))
}

impl RichStream {
    /// Runs one step of the state machine. Returns `false` once finished.
    async fn advance(&mut self) -> Result<bool, AdapterError> {
        match std::mem::replace(&mut self.phase, Phase::Done) {
            Phase::Connect => {
                let request = CompletionRequest {
                    messages: std::mem::take(&mut self.messages),
                    tools: self.tools.definitions().to_vec(),
                };
                debug!(
                    message_id = %self.accumulator.session().message_id(),
                    provider = %self.provider.id(),
                    messages = request.messages.len(),
                    tools = request.tools.len(),
                    "starting upstream completion stream"
                );
                let chunks = self.provider.start_stream(request).await?;
                self.phase = Phase::Streaming(chunks);
            }
            Phase::Streaming(mut chunks) => match chunks.next().await {
                Some(chunk) => {
                    let events = self.accumulator.push_chunk(&chunk?);
                    self.push_events(&events)?;
                    self.phase = Phase::Streaming(chunks);
                }
                None => self.phase = self.upstream_exhausted()?,
            },
            Phase::Dispatch(mut queue) => match queue.pop_front() {
                Some(call) => {
                    self.push_events(&call.events)?;
                    if let Some(input) = call.input {
                        let tools = Arc::clone(&self.tools);
                        let outcome = Self::dispatch(&tools, call.tool_call_id, &call.tool_name, input).await;
                        self.push_events(&[outcome])?;
                    }
                    self.phase = Phase::Dispatch(queue);
                }
                None => self.phase = Phase::Finish,
            },
            Phase::Finish => {
                let close = self.accumulator.close_text();
                self.push_events(close.as_slice())?;
                let finish = self.accumulator.finish_event();
                self.push_events(&[finish])?;
                self.pending.push_back(DONE_FRAME.to_string());
            }
            Phase::Done => return Ok(false),
        }
        Ok(true)
    }

    fn upstream_exhausted(&mut self) -> Result<Phase, AdapterError> {
        let reason = self.accumulator.session().finish_reason().cloned();
        debug!(
            message_id = %self.accumulator.session().message_id(),
            finish_reason = ?reason,
            "upstream completion stream exhausted"
        );
        match reason {
            Some(FinishReason::Stop) => {
                let close = self.accumulator.close_text();
                self.push_events(close.as_slice())?;
                Ok(Phase::Finish)
            }
            Some(FinishReason::ToolCalls) => {
                Ok(Phase::Dispatch(self.accumulator.finalize_tool_calls().into()))
            }
            _ => Ok(Phase::Finish),
        }
    }

    async fn dispatch(
        tools: &ToolRegistry,
        tool_call_id: String,
        tool_name: &str,
        input: serde_json::Value,
    ) -> UiEvent {
        debug!(tool_call_id = %tool_call_id, tool_name = %tool_name, "dispatching tool call");
        match tools.dispatch(tool_name, input).await {
            Ok(output) => UiEvent::ToolOutputAvailable {
                tool_call_id,
                output,
            },
            Err(err) => {
                debug!(tool_call_id = %tool_call_id, tool_name = %tool_name, error = %err, "tool call failed");
                UiEvent::ToolOutputError {
                    tool_call_id,
                    error_text: err.to_string(),
                }
            }
        }
    }

    fn push_events(&mut self, events: &[UiEvent]) -> Result<(), AdapterError> {
        for event in events {
            self.pending.push_back(encode_frame(event)?);
        }
        Ok(())
    }
}
