use futures::StreamExt as _;
use ui_message_stream::config::load_env;
use ui_message_stream::observability::init_observability;
use ui_message_stream::prelude::*;
use ui_message_stream::vendors::ollama::OllamaProvider;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), AdapterError> {
    load_env();
    init_observability();

    let provider = OllamaProvider::from_env()?;
    println!("ollama: {}", provider.check_health().await);
    println!("models: {:?}", provider.list_models().await?);

    let mut frames = provider
        .start_ui_stream(vec![ChatMessage::user("Draw one card and read it for me.")])
        .await?;
    while let Some(frame) = frames.next().await {
        print!("{}", frame?);
    }
    Ok(())
}
