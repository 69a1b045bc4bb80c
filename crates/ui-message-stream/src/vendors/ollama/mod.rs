//! Ollama local-model integration: the NDJSON chat stream consumed by
//! [`stream_ollama_text`](crate::adapters::stream_ollama_text), plus the
//! availability probe and model listing.
mod adapter;
mod config;
pub(crate) mod transport;

pub use adapter::{HealthStatus, OllamaProvider};
pub use config::{DEFAULT_OLLAMA_MODEL, DEFAULT_OLLAMA_URL, OllamaClientConfig};
