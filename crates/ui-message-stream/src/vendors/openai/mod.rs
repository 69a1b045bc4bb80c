//! OpenAI chat-completions integration.
//!
//! Produces [`CompletionChunk`](crate::provider::CompletionChunk)s for
//! [`stream_text`](crate::adapters::stream_text).
mod adapter;
mod config;
pub(crate) mod transport;

pub use adapter::OpenAiProvider;
pub use config::OpenAiClientConfig;
