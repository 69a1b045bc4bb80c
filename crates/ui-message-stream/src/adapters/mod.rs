//! Adapters turning an upstream provider stream into a [`UiMessageStream`].
//!
//! [`stream_text`] drives a tool-calling provider through the delta
//! accumulator. [`stream_ollama_text`] drives a text-only local model.
//!
//! [`UiMessageStream`]: crate::stream::UiMessageStream
mod plain;
mod rich;

pub use plain::{LocalChatSettings, TAROT_SYSTEM_PROMPT, stream_ollama_text};
pub use rich::stream_text;
