use std::pin::Pin;

use futures::StreamExt as _;

use crate::errors::AdapterError;

/// Lazily produced SSE frames of one UI message stream.
///
/// Every `Ok` item is one complete `data: ...\n\n` frame. An `Err` item ends
/// the stream; frames yielded before it have already been handed out.
/// Dropping the stream cancels the upstream request.
pub type UiMessageStream =
    Pin<Box<dyn futures::Stream<Item = Result<String, AdapterError>> + Send + 'static>>;

/// Drains a stream, returning every frame produced and the terminal error, if any.
pub async fn collect_frames(mut stream: UiMessageStream) -> (Vec<String>, Option<AdapterError>) {
    let mut frames = Vec::new();
    while let Some(item) = stream.next().await {
        match item {
            Ok(frame) => frames.push(frame),
            Err(err) => return (frames, Some(err)),
        }
    }
    (frames, None)
}
