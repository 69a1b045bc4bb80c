use crate::event::{FinishReason, MessageMetadata, UiEvent, UsageSummary};

/// Identifier of the single text span of a reply.
pub const TEXT_STREAM_ID: &str = "text-1";

/// Per-response state shared by both adapters.
///
/// Created when a stream starts and dropped with it; never shared between
/// requests.
#[derive(Clone, Debug)]
pub struct StreamSession {
    message_id: String,
    text_stream_id: String,
    text_started: bool,
    text_finished: bool,
    finish_reason: Option<FinishReason>,
    usage: Option<UsageSummary>,
}

impl Default for StreamSession {
    fn default() -> Self {
        Self::new()
    }
}

impl StreamSession {
    pub fn new() -> Self {
        Self::with_message_id(format!("msg-{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn with_message_id(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            text_stream_id: TEXT_STREAM_ID.to_string(),
            text_started: false,
            text_finished: false,
            finish_reason: None,
            usage: None,
        }
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn text_stream_id(&self) -> &str {
        &self.text_stream_id
    }

    pub fn start_event(&self) -> UiEvent {
        UiEvent::Start {
            message_id: self.message_id.clone(),
        }
    }

    /// `text-start` the first time it is called, `None` afterwards.
    pub fn open_text(&mut self) -> Option<UiEvent> {
        if self.text_started {
            return None;
        }
        self.text_started = true;
        Some(UiEvent::TextStart {
            id: self.text_stream_id.clone(),
        })
    }

    pub fn text_delta(&self, delta: impl Into<String>) -> UiEvent {
        UiEvent::TextDelta {
            id: self.text_stream_id.clone(),
            delta: delta.into(),
        }
    }

    /// `text-end` exactly once, and only for a span that was opened.
    pub fn close_text(&mut self) -> Option<UiEvent> {
        if !self.text_started || self.text_finished {
            return None;
        }
        self.text_finished = true;
        Some(UiEvent::TextEnd {
            id: self.text_stream_id.clone(),
        })
    }

    pub fn is_text_open(&self) -> bool {
        self.text_started && !self.text_finished
    }

    pub fn finish_reason(&self) -> Option<&FinishReason> {
        self.finish_reason.as_ref()
    }

    /// Keeps the most recent non-null finish reason.
    pub fn record_finish_reason(&mut self, reason: FinishReason) {
        self.finish_reason = Some(reason);
    }

    pub fn usage(&self) -> Option<&UsageSummary> {
        self.usage.as_ref()
    }

    pub fn record_usage(&mut self, usage: UsageSummary) {
        self.usage = Some(usage);
    }

    pub fn metadata(&self) -> MessageMetadata {
        MessageMetadata {
            finish_reason: self.finish_reason.as_ref().map(FinishReason::to_ui_string),
            usage: self.usage.clone(),
        }
    }

    pub fn finish_event(&self) -> UiEvent {
        UiEvent::finish(self.metadata())
    }
}
