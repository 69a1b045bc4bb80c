use std::sync::Arc;

use futures::StreamExt as _;
use ui_message_stream::config::load_env;
use ui_message_stream::observability::init_observability;
use ui_message_stream::prelude::*;
use ui_message_stream::vendors::openai::OpenAiProvider;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), AdapterError> {
    load_env();
    init_observability();

    let mut tools = ToolRegistry::new();
    tools.register_fn(
        ToolDefinition::new(
            "get_current_weather",
            "Get the current weather at a location",
            serde_json::json!({
                "type": "object",
                "properties": {
                    "latitude": {"type": "number"},
                    "longitude": {"type": "number"}
                },
                "required": ["latitude", "longitude"]
            }),
        ),
        |args| Ok(serde_json::json!({"location": args, "temperature": 18.0, "unit": "celsius"})),
    );

    let mut frames = stream_text(
        Arc::new(OpenAiProvider::from_env()?),
        vec![ChatMessage::user("What is the weather in Berlin right now?")],
        Arc::new(tools),
    );
    while let Some(frame) = frames.next().await {
        print!("{}", frame?);
    }
    Ok(())
}
