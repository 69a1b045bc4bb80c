//! Common imports for wiring an adapter into an HTTP handler.
pub use crate::{
    AdapterError, ChatCompletionProvider, ChatMessage, LocalChatProvider, LocalChatSettings, Role,
    Tool, ToolDefinition, ToolError, ToolRegistry, UiEvent, UiMessageStream, stream_ollama_text,
    stream_text,
};
pub use crate::sse::{StreamProtocol, apply_ui_stream_headers};
