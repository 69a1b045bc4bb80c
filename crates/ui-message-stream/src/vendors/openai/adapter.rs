use std::collections::VecDeque;
use std::pin::Pin;

use futures::StreamExt as _;
use futures::stream;
use tracing::debug;

use crate::errors::AdapterError;
use crate::provider::{
    ChatCompletionProvider, ChunkStream, CompletionChunk, CompletionRequest, ProviderId,
};

use super::config::OpenAiClientConfig;
use super::transport::{SseDecoder, decode_chunk};

const OPENAI_PROVIDER: &str = "openai";

type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static>>;

/// Streaming chat-completions client with tool calling.
#[derive(Clone)]
pub struct OpenAiProvider {
    client: reqwest::Client,
    config: OpenAiClientConfig,
}

impl OpenAiProvider {
    /// Creates a provider from explicit client configuration.
    pub fn new(config: OpenAiClientConfig) -> Result<Self, AdapterError> {
        if config.api_key.trim().is_empty() {
            return Err(AdapterError::Config(
                "OpenAI client config api_key must not be empty".into(),
            ));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| AdapterError::Config(format!("failed to build OpenAI client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Creates a provider using `OPENAI_API_KEY` (and optional overrides).
    pub fn from_env() -> Result<Self, AdapterError> {
        Self::new(OpenAiClientConfig::from_env()?)
    }

    pub fn config(&self) -> &OpenAiClientConfig {
        &self.config
    }
}

#[async_trait::async_trait]
impl ChatCompletionProvider for OpenAiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::new(OPENAI_PROVIDER)
    }

    async fn start_stream(&self, request: CompletionRequest) -> Result<ChunkStream, AdapterError> {
        let provider_id = self.id();
        let body = build_request_body(&self.config, &request);
        debug!(
            provider = %provider_id,
            model = %self.config.model,
            messages = request.messages.len(),
            tools = request.tools.len(),
            "starting OpenAI chat completion stream"
        );

        let response = self
            .client
            .post(self.config.chat_completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                AdapterError::transport(provider_id.clone(), format!("OpenAI request failed: {e}"))
            })?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(AdapterError::provider(
                provider_id,
                format!("OpenAI chat completion failed with status {status}: {body}"),
                Some(status.as_u16()),
            ));
        }

        let bytes_stream: ByteStream = Box::pin(response.bytes_stream());
        Ok(Box::pin(chunk_stream(provider_id, bytes_stream)))
    }
}

pub(crate) fn build_request_body(
    config: &OpenAiClientConfig,
    request: &CompletionRequest,
) -> serde_json::Value {
    let mut body = serde_json::json!({
        "model": config.model,
        "messages": request.messages,
        "stream": true,
    });
    if !request.tools.is_empty() {
        let tools: Vec<serde_json::Value> = request
            .tools
            .iter()
            .map(|tool| serde_json::json!({ "type": "function", "function": tool }))
            .collect();
        body["tools"] = serde_json::Value::Array(tools);
    }
    if config.include_usage {
        body["stream_options"] = serde_json::json!({ "include_usage": true });
    }
    body
}

fn chunk_stream(
    provider_id: ProviderId,
    bytes_stream: ByteStream,
) -> impl futures::Stream<Item = Result<CompletionChunk, AdapterError>> + Send {
    struct State {
        provider_id: ProviderId,
        bytes_stream: ByteStream,
        decoder: SseDecoder,
        pending: VecDeque<CompletionChunk>,
        done: bool,
    }

    stream::try_unfold(
        State {
            provider_id,
            bytes_stream,
            decoder: SseDecoder::default(),
            pending: VecDeque::new(),
            done: false,
        },
        |mut state| async move {
            loop {
                if let Some(chunk) = state.pending.pop_front() {
                    return Ok(Some((chunk, state)));
                }
                if state.done {
                    return Ok(None);
                }

                let payloads = match state.bytes_stream.next().await {
                    Some(Ok(bytes)) => state.decoder.push_chunk(&bytes),
                    Some(Err(e)) => {
                        return Err(AdapterError::transport(
                            state.provider_id,
                            format!("OpenAI streaming read failed: {e}"),
                        ));
                    }
                    None => {
                        state.done = true;
                        state.decoder.finish().into_iter().collect()
                    }
                };
                for payload in payloads {
                    if let Some(chunk) = decode_chunk(&state.provider_id, &payload)? {
                        state.pending.push_back(chunk);
                    }
                }
            }
        },
    )
}
