use std::sync::Arc;

use futures::stream;
use serde_json::json;
use ui_message_stream::prelude::*;
use ui_message_stream::provider::ToolCallDelta;
use ui_message_stream::sse::{DONE_FRAME, parse_frame};
use ui_message_stream::vendors::ollama::{OllamaClientConfig, OllamaProvider};
use ui_message_stream::{ChunkStream, CompletionChunk, CompletionRequest, ProviderId, collect_frames};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct ScriptedProvider {
    chunks: Vec<CompletionChunk>,
}

#[async_trait::async_trait]
impl ChatCompletionProvider for ScriptedProvider {
    fn id(&self) -> ProviderId {
        ProviderId::new("scripted")
    }

    async fn start_stream(&self, _request: CompletionRequest) -> Result<ChunkStream, AdapterError> {
        Ok(Box::pin(stream::iter(
            self.chunks.clone().into_iter().map(Ok::<_, AdapterError>),
        )))
    }
}

fn weather_tools() -> Arc<ToolRegistry> {
    let mut tools = ToolRegistry::new();
    tools.register_fn(
        ToolDefinition::new(
            "get_current_weather",
            "Get the current weather at a location",
            json!({
                "type": "object",
                "properties": {
                    "latitude": {"type": "number"},
                    "longitude": {"type": "number"}
                },
                "required": ["latitude", "longitude"]
            }),
        ),
        |args| {
            let latitude = args
                .get("latitude")
                .and_then(serde_json::Value::as_f64)
                .ok_or_else(|| ToolError::failed("latitude is required"))?;
            Ok(json!({"latitude": latitude, "temperature": 21.5}))
        },
    );
    Arc::new(tools)
}

fn decode(frames: &[String]) -> Vec<UiEvent> {
    frames
        .iter()
        .filter_map(|frame| parse_frame(frame).expect("valid frame"))
        .collect()
}

#[tokio::test]
async fn tool_call_round_trip_through_public_api() {
    let provider = Arc::new(ScriptedProvider {
        chunks: vec![
            CompletionChunk::tool_calls(vec![
                ToolCallDelta::new(0).id("call_1").name("get_current_weather"),
            ]),
            CompletionChunk::tool_calls(vec![ToolCallDelta::new(0).arguments("{\"latitude\":")]),
            CompletionChunk::tool_calls(vec![
                ToolCallDelta::new(0).arguments("52.5,\"longitude\":13.4}"),
            ]),
            CompletionChunk::finished("tool_calls"),
        ],
    });

    let (frames, err) = collect_frames(stream_text(
        provider,
        vec![ChatMessage::user("Weather in Berlin?")],
        weather_tools(),
    ))
    .await;
    assert!(err.is_none());
    assert_eq!(frames.last().map(String::as_str), Some(DONE_FRAME));
    assert!(frames.iter().all(|frame| frame.starts_with("data: ") && frame.ends_with("\n\n")));

    let events = decode(&frames);
    match &events[0] {
        UiEvent::Start { message_id } => assert!(message_id.starts_with("msg-")),
        other => panic!("expected start, got {other:?}"),
    }
    let deltas: Vec<&str> = events
        .iter()
        .filter_map(|event| match event {
            UiEvent::ToolInputDelta {
                input_text_delta, ..
            } => Some(input_text_delta.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(deltas, vec!["{\"latitude\":", "52.5,\"longitude\":13.4}"]);
    assert!(events.contains(&UiEvent::ToolInputAvailable {
        tool_call_id: "call_1".into(),
        tool_name: "get_current_weather".into(),
        input: json!({"latitude": 52.5, "longitude": 13.4}),
    }));
    assert!(events.contains(&UiEvent::ToolOutputAvailable {
        tool_call_id: "call_1".into(),
        output: json!({"latitude": 52.5, "temperature": 21.5}),
    }));
    assert_eq!(
        frames[frames.len() - 2],
        "data: {\"type\":\"finish\",\"messageMetadata\":{\"finishReason\":\"tool-calls\"}}\n\n"
    );
}

#[tokio::test]
async fn ollama_stream_through_public_api() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/tags"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"models": []})))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_string(concat!(
            "{\"message\":{\"role\":\"assistant\",\"content\":\"Hello\"},\"done\":false}\n",
            "{\"message\":{\"role\":\"assistant\",\"content\":\"\"},\"done\":true}\n",
        )))
        .mount(&server)
        .await;

    let provider = OllamaProvider::new(OllamaClientConfig::new(server.uri(), "deepseek-r1:8b"))
        .expect("provider");
    let stream = provider
        .start_ui_stream(vec![ChatMessage::system("dropped"), ChatMessage::user("hi")])
        .await
        .expect("stream");
    let (frames, err) = collect_frames(stream).await;
    assert!(err.is_none());

    let kinds: Vec<&str> = decode(&frames).iter().map(UiEvent::kind).collect();
    assert_eq!(
        kinds,
        vec!["start", "text-start", "text-delta", "text-end", "finish"]
    );
    assert_eq!(
        frames[frames.len() - 2],
        "data: {\"type\":\"finish\",\"messageMetadata\":{\"finishReason\":\"stop\"}}\n\n"
    );
    assert_eq!(frames.last().map(String::as_str), Some(DONE_FRAME));
}

#[test]
fn response_headers_follow_protocol_selector() {
    let mut headers = reqwest::header::HeaderMap::new();
    apply_ui_stream_headers(&mut headers, &StreamProtocol::parse("data")).expect("headers");
    assert_eq!(headers["x-vercel-ai-ui-message-stream"], "v1");
    assert_eq!(headers["x-vercel-ai-protocol"], "data");
}
