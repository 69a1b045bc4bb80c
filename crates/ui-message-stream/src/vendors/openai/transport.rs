use crate::errors::AdapterError;
use crate::provider::{CompletionChunk, ProviderId};

/// Incremental decoder for `text/event-stream` bodies.
///
/// Bytes may be split anywhere, including inside a UTF-8 sequence or a
/// `\r\n\r\n` delimiter; only complete frames are returned.
#[derive(Default)]
pub(crate) struct SseDecoder {
    buf: Vec<u8>,
}

impl SseDecoder {
    /// Appends bytes and returns the `data` payload of every completed frame.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buf.extend_from_slice(chunk);
        let mut payloads = Vec::new();
        while let Some((end, delimiter_len)) = frame_end(&self.buf) {
            let frame: Vec<u8> = self.buf.drain(..end + delimiter_len).take(end).collect();
            payloads.extend(frame_data(&frame));
        }
        payloads
    }

    /// Flushes a final frame the server closed without a blank line.
    pub fn finish(&mut self) -> Option<String> {
        let frame = std::mem::take(&mut self.buf);
        frame_data(&frame)
    }
}

fn frame_end(buf: &[u8]) -> Option<(usize, usize)> {
    (0..buf.len()).find_map(|i| {
        if buf[i..].starts_with(b"\n\n") {
            Some((i, 2))
        } else if buf[i..].starts_with(b"\r\n\r\n") {
            Some((i, 4))
        } else {
            None
        }
    })
}

/// Joined `data:` lines of one frame; comments and other fields are ignored.
fn frame_data(frame: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(frame);
    let lines: Vec<&str> = text
        .split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim_start)
        .collect();
    (!lines.is_empty()).then(|| lines.join("\n"))
}

/// Decodes one `data` payload into a completion chunk.
///
/// `[DONE]` and blank payloads yield `None`. An in-band `error` object is a
/// protocol error.
pub(crate) fn decode_chunk(
    provider: &ProviderId,
    data: &str,
) -> Result<Option<CompletionChunk>, AdapterError> {
    let data = data.trim();
    if data.is_empty() || data == "[DONE]" {
        return Ok(None);
    }
    let value: serde_json::Value = serde_json::from_str(data).map_err(|e| {
        AdapterError::protocol(provider.clone(), format!("invalid SSE JSON frame: {e}"))
    })?;
    if let Some(error) = value.get("error").filter(|e| !e.is_null()) {
        let message = error
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("OpenAI stream error");
        return Err(AdapterError::protocol(provider.clone(), message));
    }
    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| AdapterError::protocol(provider.clone(), format!("invalid completion chunk: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoder_handles_partial_chunk_boundaries() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push_chunk(b"data: {\"choices\":[{\"index\":0,\"del").is_empty());
        let payloads = decoder.push_chunk(b"ta\":{\"content\":\"hi\"}}]}\r\n\r\ndata: [DONE]\n\n");
        assert_eq!(payloads.len(), 2);
        assert_eq!(payloads[1], "[DONE]");
        let chunk = decode_chunk(&ProviderId::new("openai"), &payloads[0])
            .expect("decode")
            .expect("chunk");
        assert_eq!(
            chunk.choices[0].delta.as_ref().and_then(|d| d.content.as_deref()),
            Some("hi")
        );
    }

    #[test]
    fn comments_are_ignored_and_trailing_frame_flushed() {
        let mut decoder = SseDecoder::default();
        assert!(decoder.push_chunk(b": keep-alive\n\n").is_empty());
        assert!(decoder.push_chunk(b"data: [DONE]").is_empty());
        assert_eq!(decoder.finish().as_deref(), Some("[DONE]"));
        assert_eq!(decoder.finish(), None);
    }

    #[test]
    fn done_sentinel_is_skipped() {
        let provider = ProviderId::new("openai");
        assert_eq!(decode_chunk(&provider, "[DONE]").expect("done"), None);
    }

    #[test]
    fn in_band_error_is_protocol_error() {
        let provider = ProviderId::new("openai");
        let err = decode_chunk(&provider, r#"{"error":{"message":"quota exceeded"}}"#)
            .expect_err("error frame");
        assert_eq!(err, AdapterError::protocol("openai", "quota exceeded"));
    }

    #[test]
    fn invalid_json_is_protocol_error() {
        let err = decode_chunk(&ProviderId::new("openai"), "{oops").expect_err("bad json");
        assert!(matches!(err, AdapterError::Protocol { .. }));
    }
}
