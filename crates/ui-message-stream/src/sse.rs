//! Server-Sent-Events framing for the UI message stream.
//!
//! Every event becomes one `data: <compact json>\n\n` frame and the stream
//! always ends with the literal `data: [DONE]\n\n` sentinel.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};

use crate::errors::AdapterError;
use crate::event::UiEvent;

/// Terminal sentinel frame.
pub const DONE_FRAME: &str = "data: [DONE]\n\n";

/// Media type of the response body.
pub const STREAM_CONTENT_TYPE: &str = "text/event-stream";

/// Fixed headers expected by the front-end chat SDK.
pub const UI_STREAM_HEADERS: [(&str, &str); 4] = [
    ("x-vercel-ai-ui-message-stream", "v1"),
    ("cache-control", "no-cache"),
    ("connection", "keep-alive"),
    ("x-accel-buffering", "no"),
];

/// Header carrying the negotiated protocol.
pub const PROTOCOL_HEADER: &str = "x-vercel-ai-protocol";

/// Serializes one event into a single SSE frame.
pub fn encode_frame(event: &UiEvent) -> Result<String, AdapterError> {
    let payload = serde_json::to_string(event)?;
    Ok(format!("data: {payload}\n\n"))
}

/// Parses one frame produced by [`encode_frame`].
///
/// Returns `Ok(None)` for the `[DONE]` sentinel.
pub fn parse_frame(frame: &str) -> Result<Option<UiEvent>, serde_json::Error> {
    let payload = frame
        .trim_end_matches('\n')
        .strip_prefix("data:")
        .unwrap_or(frame)
        .trim();
    if payload == "[DONE]" {
        return Ok(None);
    }
    serde_json::from_str(payload).map(Some)
}

/// Protocol selector sent by the client (`?protocol=`).
///
/// Only `data` has defined behavior; anything else is passed through to the
/// protocol header untouched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum StreamProtocol {
    #[default]
    Data,
    Other(String),
}

impl StreamProtocol {
    pub fn parse(value: &str) -> Self {
        match value {
            "data" => Self::Data,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Data => "data",
            Self::Other(other) => other,
        }
    }
}

/// Applies the UI message stream headers to an outgoing response.
///
/// The fixed headers are overwritten; the protocol header is only inserted
/// when not already present and the protocol is non-empty.
pub fn apply_ui_stream_headers(
    headers: &mut HeaderMap,
    protocol: &StreamProtocol,
) -> Result<(), AdapterError> {
    for (name, value) in UI_STREAM_HEADERS {
        headers.insert(HeaderName::from_static(name), HeaderValue::from_static(value));
    }

    let protocol = protocol.as_str();
    if !protocol.is_empty() && !headers.contains_key(PROTOCOL_HEADER) {
        let value = HeaderValue::from_str(protocol)
            .map_err(|e| AdapterError::Config(format!("invalid protocol header value: {e}")))?;
        headers.insert(HeaderName::from_static(PROTOCOL_HEADER), value);
    }
    Ok(())
}
