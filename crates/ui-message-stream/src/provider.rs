use std::fmt;
use std::pin::Pin;

use crate::errors::AdapterError;
use crate::event::FinishReason;
use crate::message::ChatMessage;
use crate::tools::ToolDefinition;

/// Stable identifier for an upstream provider (for example `openai`).
#[derive(Clone, Debug, Eq, PartialEq, Hash, serde::Serialize, serde::Deserialize)]
pub struct ProviderId(pub String);

impl ProviderId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ProviderId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Decoded chat-completion chunks from a tool-calling provider.
pub type ChunkStream =
    Pin<Box<dyn futures::Stream<Item = Result<CompletionChunk, AdapterError>> + Send + 'static>>;

/// Raw newline-delimited lines from a local-model provider.
///
/// Lines are handed over undecoded so the adapter can skip malformed ones.
pub type LineStream =
    Pin<Box<dyn futures::Stream<Item = Result<String, AdapterError>> + Send + 'static>>;

/// Request for a tool-calling chat completion.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompletionRequest {
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDefinition>,
}

/// Upstream provider that streams OpenAI-style incremental deltas.
#[async_trait::async_trait]
pub trait ChatCompletionProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Issues the streaming request. Errors here happen before any chunk.
    async fn start_stream(&self, request: CompletionRequest) -> Result<ChunkStream, AdapterError>;
}

/// Sampling options forwarded to a local-model chat endpoint.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct LocalChatOptions {
    pub temperature: f64,
    /// Context window size.
    pub num_ctx: u32,
    /// Maximum number of output tokens.
    pub num_predict: u32,
}

impl Default for LocalChatOptions {
    fn default() -> Self {
        Self {
            temperature: 0.8,
            num_ctx: 4096,
            num_predict: 1500,
        }
    }
}

/// Body of a local-model streaming chat request.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct LocalChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    pub options: LocalChatOptions,
}

/// Upstream provider that streams whole-message JSON lines (no tool calls).
#[async_trait::async_trait]
pub trait LocalChatProvider: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Opens the streaming chat request and returns its body as lines.
    async fn open_chat(&self, request: LocalChatRequest) -> Result<LineStream, AdapterError>;
}

/// One chunk of an OpenAI-style streaming chat completion.
///
/// A chunk with no choices but with `usage` is the aggregate usage summary.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CompletionChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<ChunkUsage>,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delta: Option<ChoiceDelta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ChoiceDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallDelta>>,
}

/// Fragment of one tool call, addressed by its per-response index.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ToolCallDelta {
    pub index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function: Option<FunctionDelta>,
}

#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct FunctionDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ChunkUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
}

impl CompletionChunk {
    /// Chunk with a single choice carrying text content.
    pub fn text(content: impl Into<String>) -> Self {
        Self::with_delta(ChoiceDelta {
            content: Some(content.into()),
            tool_calls: None,
        })
    }

    /// Chunk with a single choice carrying tool-call fragments.
    pub fn tool_calls(deltas: Vec<ToolCallDelta>) -> Self {
        Self::with_delta(ChoiceDelta {
            content: None,
            tool_calls: Some(deltas),
        })
    }

    /// Chunk with a single empty-delta choice signalling the finish reason.
    pub fn finished(reason: impl Into<FinishReason>) -> Self {
        Self {
            choices: vec![ChunkChoice {
                index: 0,
                delta: Some(ChoiceDelta::default()),
                finish_reason: Some(reason.into()),
            }],
            usage: None,
        }
    }

    /// Usage-only summary chunk.
    pub fn usage(usage: ChunkUsage) -> Self {
        Self {
            choices: Vec::new(),
            usage: Some(usage),
        }
    }

    fn with_delta(delta: ChoiceDelta) -> Self {
        Self {
            choices: vec![ChunkChoice {
                index: 0,
                delta: Some(delta),
                finish_reason: None,
            }],
            usage: None,
        }
    }
}

impl ToolCallDelta {
    pub fn new(index: u32) -> Self {
        Self {
            index,
            ..Self::default()
        }
    }

    pub fn id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.function.get_or_insert_with(FunctionDelta::default).name = Some(name.into());
        self
    }

    pub fn arguments(mut self, arguments: impl Into<String>) -> Self {
        self.function
            .get_or_insert_with(FunctionDelta::default)
            .arguments = Some(arguments.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_openai_tool_call_chunk() {
        let chunk: CompletionChunk = serde_json::from_value(json!({
            "id": "chatcmpl-1",
            "object": "chat.completion.chunk",
            "choices": [{
                "index": 0,
                "delta": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "index": 0,
                        "id": "call_1",
                        "type": "function",
                        "function": {"name": "get_weather", "arguments": ""}
                    }]
                },
                "finish_reason": null
            }]
        }))
        .expect("parse");
        let delta = chunk.choices[0].delta.as_ref().expect("delta");
        assert_eq!(delta.content, None);
        let call = &delta.tool_calls.as_ref().expect("tool calls")[0];
        assert_eq!(call.id.as_deref(), Some("call_1"));
        assert_eq!(
            call.function.as_ref().and_then(|f| f.name.as_deref()),
            Some("get_weather")
        );
    }

    #[test]
    fn parses_usage_summary_chunk() {
        let chunk: CompletionChunk = serde_json::from_value(json!({
            "choices": [],
            "usage": {"prompt_tokens": 9, "completion_tokens": 12, "total_tokens": 21}
        }))
        .expect("parse");
        assert!(chunk.choices.is_empty());
        assert_eq!(chunk.usage.and_then(|u| u.total_tokens), Some(21));
    }

    #[test]
    fn local_chat_request_serializes_ollama_shape() {
        let request = LocalChatRequest {
            model: "deepseek-r1:8b".into(),
            messages: vec![ChatMessage::user("hi")],
            stream: true,
            options: LocalChatOptions::default(),
        };
        let value = serde_json::to_value(&request).expect("ser");
        assert_eq!(value["stream"], json!(true));
        assert_eq!(value["options"]["num_ctx"], json!(4096));
        assert_eq!(value["options"]["num_predict"], json!(1500));
        assert_eq!(value["messages"][0]["role"], json!("user"));
    }
}
