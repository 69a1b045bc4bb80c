//! Delta accumulation for tool-calling streams.
//!
//! Upstream fragments arrive one at a time and may split a tool call's id,
//! name and JSON arguments across any number of chunks. The accumulator keeps
//! per-index state and turns each fragment into zero or more [`UiEvent`]s
//! without ever blocking.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use crate::event::{UiEvent, UsageSummary};
use crate::provider::{ChunkUsage, CompletionChunk, ToolCallDelta};
use crate::session::StreamSession;

/// Partial tool call keyed by its provider-assigned index.
///
/// `arguments` is the raw concatenation of fragments in arrival order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolCallState {
    pub id: Option<String>,
    pub name: Option<String>,
    pub arguments: String,
    started: bool,
}

impl ToolCallState {
    /// Whether `tool-input-start` has been emitted. Never resets.
    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Emits `tool-input-start` once id and name are both known, followed by
    /// the arguments buffered while the call could not be announced yet.
    fn announce(&mut self) -> Vec<UiEvent> {
        if self.started {
            return Vec::new();
        }
        let (Some(id), Some(name)) = (&self.id, &self.name) else {
            return Vec::new();
        };
        self.started = true;

        let mut events = vec![UiEvent::ToolInputStart {
            tool_call_id: id.clone(),
            tool_name: name.clone(),
        }];
        if !self.arguments.is_empty() {
            events.push(UiEvent::ToolInputDelta {
                tool_call_id: id.clone(),
                input_text_delta: self.arguments.clone(),
            });
        }
        events
    }
}

/// A tool call ready for dispatch, produced once the upstream reports
/// `tool_calls` as finish reason.
#[derive(Clone, Debug, PartialEq)]
pub struct FinalizedToolCall {
    pub index: u32,
    pub tool_call_id: String,
    pub tool_name: String,
    /// Deferred start (if any) then `tool-input-available` or `tool-input-error`.
    pub events: Vec<UiEvent>,
    /// Parsed arguments; `None` when they failed to parse and dispatch must be skipped.
    pub input: Option<serde_json::Value>,
}

/// Per-stream accumulator: the session plus an index-ordered map of tool calls.
#[derive(Debug, Default)]
pub struct DeltaAccumulator {
    session: StreamSession,
    tool_calls: BTreeMap<u32, ToolCallState>,
}

impl DeltaAccumulator {
    pub fn new(session: StreamSession) -> Self {
        Self {
            session,
            tool_calls: BTreeMap::new(),
        }
    }

    pub fn session(&self) -> &StreamSession {
        &self.session
    }

    pub fn tool_call(&self, index: u32) -> Option<&ToolCallState> {
        self.tool_calls.get(&index)
    }

    /// Feeds every choice of one upstream chunk.
    pub fn push_chunk(&mut self, chunk: &CompletionChunk) -> Vec<UiEvent> {
        let mut events = Vec::new();
        for choice in &chunk.choices {
            if let Some(reason) = &choice.finish_reason {
                self.session.record_finish_reason(reason.clone());
            }
            let Some(delta) = &choice.delta else {
                continue;
            };
            if let Some(content) = &delta.content {
                events.extend(self.push_text(content));
            }
            for tool_call in delta.tool_calls.iter().flatten() {
                events.extend(self.push_tool_call(tool_call));
            }
        }

        if chunk.choices.is_empty()
            && let Some(usage) = &chunk.usage
        {
            self.session.record_usage(usage.clone().into());
        }
        events
    }

    /// Opens the text span if needed and forwards the fragment verbatim.
    pub fn push_text(&mut self, fragment: &str) -> Vec<UiEvent> {
        let mut events = Vec::with_capacity(2);
        events.extend(self.session.open_text());
        events.push(self.session.text_delta(fragment));
        events
    }

    /// Merges one tool-call fragment into the state for its index.
    pub fn push_tool_call(&mut self, delta: &ToolCallDelta) -> Vec<UiEvent> {
        let state = self.tool_calls.entry(delta.index).or_default();

        if let Some(id) = &delta.id {
            state.id = Some(id.clone());
        }
        let function = delta.function.as_ref();
        if let Some(name) = function.and_then(|f| f.name.as_ref()) {
            state.name = Some(name.clone());
        }
        let fragment = function
            .and_then(|f| f.arguments.as_deref())
            .filter(|args| !args.is_empty());
        if let Some(fragment) = fragment {
            state.arguments.push_str(fragment);
        }

        if !state.started {
            // Covers this update's fragment too when the call becomes announceable now.
            return state.announce();
        }
        match (fragment, &state.id) {
            (Some(fragment), Some(id)) => vec![UiEvent::ToolInputDelta {
                tool_call_id: id.clone(),
                input_text_delta: fragment.to_string(),
            }],
            _ => Vec::new(),
        }
    }

    /// Closes the text span; idempotent.
    pub fn close_text(&mut self) -> Option<UiEvent> {
        self.session.close_text()
    }

    /// Drains tracked tool calls in ascending index order.
    ///
    /// Calls whose id or name never resolved are dropped with a warning.
    pub fn finalize_tool_calls(&mut self) -> Vec<FinalizedToolCall> {
        let tool_calls = std::mem::take(&mut self.tool_calls);
        let mut finalized = Vec::with_capacity(tool_calls.len());

        for (index, mut state) in tool_calls {
            let (Some(tool_call_id), Some(tool_name)) = (state.id.clone(), state.name.clone())
            else {
                warn!(
                    message_id = %self.session.message_id(),
                    index,
                    id = ?state.id,
                    name = ?state.name,
                    "discarding tool call without id or name"
                );
                continue;
            };

            let mut events = state.announce();
            let input = match parse_arguments(&state.arguments) {
                Ok(input) => {
                    events.push(UiEvent::ToolInputAvailable {
                        tool_call_id: tool_call_id.clone(),
                        tool_name: tool_name.clone(),
                        input: input.clone(),
                    });
                    Some(input)
                }
                Err(err) => {
                    debug!(index, tool_call_id = %tool_call_id, tool_name = %tool_name, error = %err, "tool arguments failed to parse");
                    events.push(UiEvent::ToolInputError {
                        tool_call_id: tool_call_id.clone(),
                        tool_name: tool_name.clone(),
                        input: state.arguments.clone(),
                        error_text: err.to_string(),
                    });
                    None
                }
            };

            finalized.push(FinalizedToolCall {
                index,
                tool_call_id,
                tool_name,
                events,
                input,
            });
        }
        finalized
    }

    pub fn finish_event(&self) -> UiEvent {
        self.session.finish_event()
    }
}

/// Empty argument text is an empty object, not an error.
pub fn parse_arguments(raw: &str) -> Result<serde_json::Value, serde_json::Error> {
    if raw.is_empty() {
        return Ok(serde_json::Value::Object(serde_json::Map::new()));
    }
    serde_json::from_str(raw)
}

impl From<ChunkUsage> for UsageSummary {
    fn from(value: ChunkUsage) -> Self {
        Self {
            prompt_tokens: value.prompt_tokens,
            completion_tokens: value.completion_tokens,
            total_tokens: value.total_tokens,
        }
    }
}
