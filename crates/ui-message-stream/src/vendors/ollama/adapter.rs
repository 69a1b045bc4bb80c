use std::collections::VecDeque;
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt as _;
use futures::stream;
use tracing::{debug, warn};

use crate::adapters::stream_ollama_text;
use crate::errors::AdapterError;
use crate::message::ChatMessage;
use crate::provider::{LineStream, LocalChatProvider, LocalChatRequest, ProviderId};
use crate::stream::UiMessageStream;

use super::config::OllamaClientConfig;
use super::transport::LineDecoder;

const OLLAMA_PROVIDER: &str = "ollama";

type ByteStream =
    Pin<Box<dyn futures::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + 'static>>;

/// Reachability of the Ollama server as reported by [`OllamaProvider::check_health`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// `/api/tags` answered 200.
    Connected,
    /// Reachable, but answered another status.
    Error,
    /// Could not connect.
    Disconnected,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Error => "error",
            Self::Disconnected => "disconnected",
        }
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(serde::Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(serde::Deserialize)]
struct ModelTag {
    name: String,
}

/// Streaming chat client for a local Ollama server.
#[derive(Clone)]
pub struct OllamaProvider {
    client: reqwest::Client,
    config: OllamaClientConfig,
}

impl OllamaProvider {
    pub fn new(config: OllamaClientConfig) -> Result<Self, AdapterError> {
        config.validate()?;
        let client = reqwest::Client::builder()
            .connect_timeout(config.request_timeout)
            .build()
            .map_err(|e| AdapterError::Config(format!("failed to build Ollama client: {e}")))?;
        Ok(Self { client, config })
    }

    /// Creates a provider from `OLLAMA_URL` / `OLLAMA_MODEL`.
    pub fn from_env() -> Result<Self, AdapterError> {
        Self::new(OllamaClientConfig::from_env())
    }

    pub fn config(&self) -> &OllamaClientConfig {
        &self.config
    }

    /// Checks that the server answers `GET /api/tags` with 200 within the probe timeout.
    pub async fn probe(&self) -> Result<(), AdapterError> {
        let response = self
            .client
            .get(self.config.tags_url())
            .timeout(self.config.probe_timeout)
            .send()
            .await
            .map_err(|e| {
                AdapterError::transport(
                    OLLAMA_PROVIDER,
                    format!("Cannot connect to Ollama service: {e}"),
                )
            })?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            debug!(provider = OLLAMA_PROVIDER, status = status.as_u16(), "Ollama probe failed");
            return Err(AdapterError::unavailable(
                OLLAMA_PROVIDER,
                "Ollama service is not available",
            ));
        }
        Ok(())
    }

    pub async fn check_health(&self) -> HealthStatus {
        match self.probe().await {
            Ok(()) => HealthStatus::Connected,
            Err(AdapterError::Unavailable { .. }) => HealthStatus::Error,
            Err(_) => HealthStatus::Disconnected,
        }
    }

    /// Names of the models installed on the server.
    pub async fn list_models(&self) -> Result<Vec<String>, AdapterError> {
        let response = self
            .client
            .get(self.config.tags_url())
            .timeout(self.config.models_timeout)
            .send()
            .await
            .map_err(|e| {
                AdapterError::transport(
                    OLLAMA_PROVIDER,
                    format!("Cannot connect to Ollama service: {e}"),
                )
            })?;
        if response.status() != reqwest::StatusCode::OK {
            return Err(AdapterError::unavailable(
                OLLAMA_PROVIDER,
                "Ollama service returned an error",
            ));
        }
        let tags: TagsResponse = response.json().await.map_err(|e| {
            AdapterError::protocol(OLLAMA_PROVIDER, format!("invalid /api/tags response: {e}"))
        })?;
        Ok(tags.models.into_iter().map(|model| model.name).collect())
    }

    /// Probes the server, then returns the UI message stream for `messages`.
    ///
    /// A failed probe is returned before any frame exists, so the caller can
    /// still answer with a plain 503.
    pub async fn start_ui_stream(
        &self,
        messages: Vec<ChatMessage>,
    ) -> Result<UiMessageStream, AdapterError> {
        self.probe().await?;
        Ok(stream_ollama_text(
            Arc::new(self.clone()),
            &self.config.settings(),
            messages,
        ))
    }
}

#[async_trait::async_trait]
impl LocalChatProvider for OllamaProvider {
    fn id(&self) -> ProviderId {
        ProviderId::new(OLLAMA_PROVIDER)
    }

    async fn open_chat(&self, request: LocalChatRequest) -> Result<LineStream, AdapterError> {
        let provider_id = self.id();
        debug!(provider = %provider_id, model = %request.model, url = %self.config.chat_url(), "opening Ollama chat stream");

        let send = self.client.post(self.config.chat_url()).json(&request).send();
        let response = tokio::time::timeout(self.config.request_timeout, send)
            .await
            .map_err(|_| {
                AdapterError::transport(
                    provider_id.clone(),
                    format!(
                        "Ollama request timed out after {:?}",
                        self.config.request_timeout
                    ),
                )
            })?
            .map_err(|e| {
                AdapterError::transport(provider_id.clone(), format!("Ollama request failed: {e}"))
            })?;
        let status = response.status();
        if status != reqwest::StatusCode::OK {
            warn!(provider = %provider_id, status = status.as_u16(), "Ollama chat request rejected");
            return Err(AdapterError::provider(
                provider_id,
                format!("Ollama API error: {}", status.as_u16()),
                Some(status.as_u16()),
            ));
        }

        let bytes_stream: ByteStream = Box::pin(response.bytes_stream());
        Ok(Box::pin(line_stream(
            provider_id,
            bytes_stream,
            self.config.request_timeout,
        )))
    }
}

/// Splits the body into lines. A read that stalls longer than `read_timeout`
/// ends the stream with a transport error.
fn line_stream(
    provider_id: ProviderId,
    bytes_stream: ByteStream,
    read_timeout: Duration,
) -> impl futures::Stream<Item = Result<String, AdapterError>> + Send {
    struct State {
        provider_id: ProviderId,
        bytes_stream: ByteStream,
        read_timeout: Duration,
        decoder: LineDecoder,
        pending: VecDeque<String>,
        done: bool,
    }

    stream::try_unfold(
        State {
            provider_id,
            bytes_stream,
            read_timeout,
            decoder: LineDecoder::default(),
            pending: VecDeque::new(),
            done: false,
        },
        |mut state| async move {
            loop {
                if let Some(line) = state.pending.pop_front() {
                    return Ok(Some((line, state)));
                }
                if state.done {
                    return Ok(None);
                }
                let next = tokio::time::timeout(state.read_timeout, state.bytes_stream.next())
                    .await
                    .map_err(|_| {
                        AdapterError::transport(
                            state.provider_id.clone(),
                            format!("Ollama stream stalled for {:?}", state.read_timeout),
                        )
                    })?;
                match next {
                    Some(Ok(bytes)) => state.pending.extend(state.decoder.push_chunk(&bytes)),
                    Some(Err(e)) => {
                        return Err(AdapterError::transport(
                            state.provider_id,
                            format!("Ollama streaming read failed: {e}"),
                        ));
                    }
                    None => {
                        state.done = true;
                        state.pending.extend(state.decoder.finish());
                    }
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sse::{DONE_FRAME, parse_frame};
    use crate::stream::collect_frames;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> OllamaProvider {
        OllamaProvider::new(OllamaClientConfig::new(server.uri(), "deepseek-r1:8b"))
            .expect("provider")
    }

    async fn mount_tags(server: &MockServer, status: u16) {
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(status).set_body_json(json!({
                "models": [{"name": "deepseek-r1:8b"}, {"name": "llama3.2:3b"}]
            })))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn health_and_model_listing() {
        let server = MockServer::start().await;
        mount_tags(&server, 200).await;
        let provider = provider(&server);
        assert_eq!(provider.check_health().await, HealthStatus::Connected);
        assert_eq!(
            provider.list_models().await.expect("models"),
            vec!["deepseek-r1:8b", "llama3.2:3b"]
        );
    }

    #[tokio::test]
    async fn non_200_probe_fails_before_any_frame() {
        let server = MockServer::start().await;
        mount_tags(&server, 500).await;
        let provider = provider(&server);
        assert_eq!(provider.check_health().await, HealthStatus::Error);
        let err = match provider.start_ui_stream(vec![ChatMessage::user("hi")]).await {
            Ok(_) => panic!("expected probe failure"),
            Err(err) => err,
        };
        assert!(err.is_service_unavailable());
        assert!(matches!(
            provider.list_models().await,
            Err(AdapterError::Unavailable { .. })
        ));
    }

    #[tokio::test]
    async fn unreachable_server_is_disconnected() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);
        let provider = OllamaProvider::new(OllamaClientConfig::new(format!("http://{addr}"), "m"))
            .expect("provider");
        assert_eq!(provider.check_health().await, HealthStatus::Disconnected);
    }

    fn short_timeout_provider(addr: std::net::SocketAddr) -> OllamaProvider {
        OllamaProvider::new(
            OllamaClientConfig::new(format!("http://{addr}"), "m")
                .request_timeout(Duration::from_millis(300)),
        )
        .expect("provider")
    }

    async fn collect_within(stream: UiMessageStream) -> (Vec<crate::event::UiEvent>, Option<AdapterError>) {
        let (frames, err) = tokio::time::timeout(Duration::from_secs(5), collect_frames(stream))
            .await
            .expect("stream ends instead of hanging");
        let events = frames
            .iter()
            .filter_map(|frame| parse_frame(frame).expect("frame"))
            .collect();
        (events, err)
    }

    #[tokio::test]
    async fn silent_server_times_out_with_error_frame() {
        // accepted by the kernel backlog, never answered
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let provider = short_timeout_provider(listener.local_addr().expect("addr"));
        let settings = provider.config().settings();

        let (events, err) = collect_within(stream_ollama_text(
            Arc::new(provider),
            &settings,
            vec![ChatMessage::user("hi")],
        ))
        .await;
        let kinds: Vec<_> = events.iter().map(crate::event::UiEvent::kind).collect();
        assert_eq!(kinds, vec!["start", "text-start", "error"]);
        let err = err.expect("error");
        assert!(matches!(err, AdapterError::Transport { .. }));
        assert!(err.to_string().contains("timed out after 300ms"), "{err}");
        drop(listener);
    }

    #[tokio::test]
    async fn stalled_body_ends_with_error_frame() {
        use tokio::io::{AsyncReadExt as _, AsyncWriteExt as _};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let addr = listener.local_addr().expect("addr");
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut buf = [0u8; 4096];
            let _ = socket.read(&mut buf).await;
            let line = "{\"message\":{\"role\":\"assistant\",\"content\":\"half\"},\"done\":false}\n";
            let head = "HTTP/1.1 200 OK\r\ncontent-type: application/x-ndjson\r\ntransfer-encoding: chunked\r\n\r\n";
            let chunk = format!("{head}{:x}\r\n{line}\r\n", line.len());
            socket.write_all(chunk.as_bytes()).await.expect("write");
            tokio::time::sleep(Duration::from_secs(10)).await;
            drop(socket);
        });

        let provider = short_timeout_provider(addr);
        let settings = provider.config().settings();
        let (events, err) = collect_within(stream_ollama_text(
            Arc::new(provider),
            &settings,
            vec![ChatMessage::user("hi")],
        ))
        .await;
        server.abort();

        let kinds: Vec<_> = events.iter().map(crate::event::UiEvent::kind).collect();
        assert_eq!(kinds, vec!["start", "text-start", "text-delta", "error"]);
        assert_eq!(
            events[2],
            crate::event::UiEvent::TextDelta {
                id: "text-1".into(),
                delta: "half".into()
            }
        );
        assert!(matches!(err, Some(AdapterError::Transport { .. })));
    }

    #[tokio::test]
    async fn streams_ndjson_body_as_ui_frames() {
        let server = MockServer::start().await;
        mount_tags(&server, 200).await;
        let body = concat!(
            "{\"model\":\"deepseek-r1:8b\",\"message\":{\"role\":\"assistant\",\"content\":\"The Star\"},\"done\":false}\n",
            "garbage\n",
            "{\"model\":\"deepseek-r1:8b\",\"message\":{\"role\":\"assistant\",\"content\":\" shines.\"},\"done\":false}\n",
            "{\"model\":\"deepseek-r1:8b\",\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true}\n",
        );
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_partial_json(json!({
                "model": "deepseek-r1:8b",
                "stream": true,
                "options": {"num_ctx": 4096, "num_predict": 1500}
            })))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let stream = provider(&server)
            .start_ui_stream(vec![ChatMessage::user("Draw a card")])
            .await
            .expect("stream");
        let (frames, err) = collect_frames(stream).await;
        assert!(err.is_none(), "unexpected error: {err:?}");
        assert_eq!(frames.last().map(String::as_str), Some(DONE_FRAME));
        let deltas: Vec<String> = frames
            .iter()
            .filter_map(|frame| parse_frame(frame).expect("frame"))
            .filter_map(|event| match event {
                crate::event::UiEvent::TextDelta { delta, .. } => Some(delta),
                _ => None,
            })
            .collect();
        assert_eq!(deltas, vec!["The Star", " shines."]);
    }

    #[tokio::test]
    async fn chat_error_status_becomes_error_frame() {
        let server = MockServer::start().await;
        mount_tags(&server, 200).await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(ResponseTemplate::new(404).set_body_string("model not found"))
            .mount(&server)
            .await;

        let stream = provider(&server)
            .start_ui_stream(vec![ChatMessage::user("hi")])
            .await
            .expect("probe passes");
        let (frames, err) = collect_frames(stream).await;
        let last = frames.last().and_then(|f| parse_frame(f).expect("frame"));
        assert_eq!(
            last,
            Some(crate::event::UiEvent::Error {
                error: "provider error (ollama): Ollama API error: 404".into()
            })
        );
        assert!(matches!(
            err,
            Some(AdapterError::Provider {
                status_code: Some(404),
                ..
            })
        ));
    }
}
