//! Streaming adapter from chat-completion providers to the UI message
//! stream (v1) Server-Sent-Events protocol.
//!
//! Two upstreams are supported:
//! - tool-calling providers streaming OpenAI-style `choice.delta` chunks,
//!   driven by [`adapters::stream_text`];
//! - a local Ollama server streaming NDJSON chat lines, driven by
//!   [`adapters::stream_ollama_text`].
//!
//! Both return a [`UiMessageStream`] of ready-to-send `data: ...\n\n` frames
//! terminated by `data: [DONE]\n\n`.
//!
//! # Tool-calling stream (OpenAI)
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use futures::StreamExt as _;
//! use ui_message_stream::prelude::*;
//! use ui_message_stream::vendors::openai::OpenAiProvider;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), AdapterError> {
//! let mut tools = ToolRegistry::new();
//! tools.register_fn(
//!     ToolDefinition::new(
//!         "echo",
//!         "Echo the arguments back",
//!         serde_json::json!({"type": "object"}),
//!     ),
//!     |args| Ok(serde_json::Value::Object(args)),
//! );
//!
//! let mut frames = stream_text(
//!     Arc::new(OpenAiProvider::from_env()?),
//!     vec![ChatMessage::user("Say hello")],
//!     Arc::new(tools),
//! );
//! while let Some(frame) = frames.next().await {
//!     print!("{}", frame?);
//! }
//! # Ok(())
//! # }
//! ```

/// Delta accumulation for tool-calling streams.
pub mod accumulator;
/// Tool-calling and local-model stream adapters.
pub mod adapters;
/// Environment loading helpers.
pub mod config;
/// Public error types.
pub mod errors;
/// UI message stream event records.
pub mod event;
/// Inbound chat messages.
pub mod message;
/// Process-wide tracing setup.
pub mod observability;
/// Common imports for typical usage.
pub mod prelude;
/// Provider contracts and upstream chunk types.
pub mod provider;
/// Per-response stream state.
pub mod session;
/// SSE framing and response headers.
pub mod sse;
/// The framed output stream.
pub mod stream;
/// Tool definitions, registry and dispatch.
pub mod tools;
/// HTTP providers.
pub mod vendors;

pub use adapters::{LocalChatSettings, stream_ollama_text, stream_text};
pub use errors::{AdapterError, ToolError};
pub use event::{FinishReason, MessageMetadata, UiEvent, UsageSummary};
pub use message::{ChatMessage, Role};
pub use provider::{
    ChatCompletionProvider, ChunkStream, CompletionChunk, CompletionRequest, LineStream,
    LocalChatOptions, LocalChatProvider, LocalChatRequest, ProviderId,
};
pub use session::StreamSession;
pub use stream::{UiMessageStream, collect_frames};
pub use tools::{Tool, ToolDefinition, ToolRegistry};
