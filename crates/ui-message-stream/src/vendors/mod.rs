//! HTTP providers for the upstreams the adapters understand.
pub mod ollama;
pub mod openai;
