use std::collections::VecDeque;
use std::sync::Arc;

use futures::StreamExt as _;
use futures::stream;
use tracing::{debug, error, warn};

use crate::errors::AdapterError;
use crate::event::{FinishReason, UiEvent};
use crate::message::ChatMessage;
use crate::provider::{LineStream, LocalChatOptions, LocalChatProvider, LocalChatRequest};
use crate::session::StreamSession;
use crate::sse::{DONE_FRAME, encode_frame};
use crate::stream::UiMessageStream;

/// System instruction sent ahead of every local-model conversation.
pub const TAROT_SYSTEM_PROMPT: &str = "You are a wise and empathetic tarot reader with deep knowledge of tarot symbolism, \
archetypes, and interpretations. You provide insightful, nuanced readings that blend traditional meanings \
with intuitive understanding. Your readings are thoughtful, non-judgmental, and focused on empowerment \
and personal growth. When interpreting cards, you consider their positions, relationships, and the \
querent's specific question or situation.";

/// Model, system instruction and sampling options for a local chat stream.
#[derive(Clone, Debug, PartialEq)]
pub struct LocalChatSettings {
    pub model: String,
    pub system_prompt: String,
    pub options: LocalChatOptions,
}

impl LocalChatSettings {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system_prompt: TAROT_SYSTEM_PROMPT.to_string(),
            options: LocalChatOptions::default(),
        }
    }

    pub fn system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn options(mut self, options: LocalChatOptions) -> Self {
        self.options = options;
        self
    }

    /// Builds the upstream request: our system message first, then every
    /// non-system caller message unchanged.
    pub fn request(&self, messages: Vec<ChatMessage>) -> LocalChatRequest {
        let mut upstream = Vec::with_capacity(messages.len() + 1);
        upstream.push(ChatMessage::system(self.system_prompt.clone()));
        upstream.extend(messages.into_iter().filter(|message| !message.is_system()));
        LocalChatRequest {
            model: self.model.clone(),
            messages: upstream,
            stream: true,
            options: self.options.clone(),
        }
    }
}

enum Phase {
    Connect(LocalChatRequest),
    Streaming(LineStream),
    Finish,
    Done,
}

struct PlainStream {
    provider: Arc<dyn LocalChatProvider>,
    session: StreamSession,
    phase: Phase,
    pending: VecDeque<String>,
    failure: Option<AdapterError>,
}

/// Streams a text-only local-model chat as UI message stream frames.
///
/// `start` and `text-start` are emitted before the upstream request is
/// opened. Malformed lines are skipped and a line with `done: true` ends the
/// reply. On failure an `error` frame is emitted and the error is returned as
/// the final item.
pub fn stream_ollama_text(
    provider: Arc<dyn LocalChatProvider>,
    settings: &LocalChatSettings,
    messages: Vec<ChatMessage>,
) -> UiMessageStream {
    stream_ollama_text_with_session(provider, settings, messages, StreamSession::new())
}

pub(crate) fn stream_ollama_text_with_session(
    provider: Arc<dyn LocalChatProvider>,
    settings: &LocalChatSettings,
    messages: Vec<ChatMessage>,
    mut session: StreamSession,
) -> UiMessageStream {
    let start = session.start_event();
    let text_start = session.open_text();
    let mut state = PlainStream {
        provider,
        session,
        phase: Phase::Connect(settings.request(messages)),
        pending: VecDeque::new(),
        failure: None,
    };
    for event in std::iter::once(start).chain(text_start) {
        if let Err(err) = state.push_event(&event) {
            return Box::pin(stream::once(async move { Err::<String, _>(err) }));
        }
    }

    Box::pin(stream::try_unfold(state, |mut state| async move {
        loop {
            if let Some(frame) = state.pending.pop_front() {
                return Ok(Some((frame, state)));
            }
            if let Some(err) = state.failure.take() {
                return Err(err);
            }
            match state.advance().await {
                Ok(true) => continue,
                Ok(false) => return Ok(None),
                Err(err) => state.fail(err),
            }
        }
    }))
}

impl PlainStream {
    async fn advance(&mut self) -> Result<bool, AdapterError> {
        match std::mem::replace(&mut self.phase, Phase::Done) {
            Phase::Connect(request) => {
                debug!(
                    message_id = %self.session.message_id(),
                    provider = %self.provider.id(),
                    model = %request.model,
                    messages = request.messages.len(),
                    "opening local chat stream"
                );
                let lines = self.provider.open_chat(request).await?;
                self.phase = Phase::Streaming(lines);
            }
            Phase::Streaming(mut lines) => match lines.next().await {
                Some(line) => {
                    self.phase = match self.handle_line(&line?)? {
                        LineOutcome::Continue => Phase::Streaming(lines),
                        LineOutcome::Done => Phase::Finish,
                    };
                }
                None => self.phase = Phase::Finish,
            },
            Phase::Finish => {
                if let Some(close) = self.session.close_text() {
                    self.push_event(&close)?;
                }
                self.session.record_finish_reason(FinishReason::Stop);
                let finish = self.session.finish_event();
                self.push_event(&finish)?;
                self.pending.push_back(DONE_FRAME.to_string());
            }
            Phase::Done => return Ok(false),
        }
        Ok(true)
    }

    fn handle_line(&mut self, line: &str) -> Result<LineOutcome, AdapterError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(LineOutcome::Continue);
        }
        let value: serde_json::Value = match serde_json::from_str(line) {
            Ok(value) => value,
            Err(err) => {
                warn!(message_id = %self.session.message_id(), error = %err, "skipping malformed chat line");
                return Ok(LineOutcome::Continue);
            }
        };
        let Some(object) = value.as_object() else {
            warn!(message_id = %self.session.message_id(), "skipping non-object chat line");
            return Ok(LineOutcome::Continue);
        };

        if object
            .get("done")
            .and_then(serde_json::Value::as_bool)
            .unwrap_or(false)
        {
            return Ok(LineOutcome::Done);
        }
        let content = object
            .get("message")
            .and_then(|message| message.get("content"))
            .and_then(serde_json::Value::as_str)
            .filter(|content| !content.is_empty());
        if let Some(content) = content {
            let delta = self.session.text_delta(content);
            self.push_event(&delta)?;
        }
        Ok(LineOutcome::Continue)
    }

    /// Queues an `error` frame; the error itself is returned once it is sent.
    fn fail(&mut self, err: AdapterError) {
        error!(
            message_id = %self.session.message_id(),
            provider = %self.provider.id(),
            error = %err,
            detail = ?err,
            "local chat stream failed"
        );
        self.phase = Phase::Done;
        let frame = encode_frame(&UiEvent::Error {
            error: err.to_string(),
        });
        if let Ok(frame) = frame {
            self.pending.push_back(frame);
        }
        self.failure = Some(err);
    }

    fn push_event(&mut self, event: &UiEvent) -> Result<(), AdapterError> {
        self.pending.push_back(encode_frame(event)?);
        Ok(())
    }
}

enum LineOutcome {
    Continue,
    Done,
}
