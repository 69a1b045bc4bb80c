use std::time::Duration;

use crate::adapters::{LocalChatSettings, TAROT_SYSTEM_PROMPT};
use crate::config::env_string;
use crate::errors::AdapterError;
use crate::provider::LocalChatOptions;

pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_OLLAMA_MODEL: &str = "deepseek-r1:8b";

/// Configuration for a local Ollama server.
#[derive(Clone, Debug, PartialEq)]
pub struct OllamaClientConfig {
    pub base_url: String,
    pub model: String,
    pub system_prompt: String,
    pub options: LocalChatOptions,
    /// Bound on opening the chat stream; expiry is a transport error.
    pub request_timeout: Duration,
    /// Bound on the availability probe.
    pub probe_timeout: Duration,
    /// Bound on the model listing request.
    pub models_timeout: Duration,
}

impl Default for OllamaClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_OLLAMA_MODEL.to_string(),
            system_prompt: TAROT_SYSTEM_PROMPT.to_string(),
            options: LocalChatOptions::default(),
            request_timeout: Duration::from_secs(60),
            probe_timeout: Duration::from_secs(5),
            models_timeout: Duration::from_secs(10),
        }
    }
}

impl OllamaClientConfig {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            ..Self::default()
        }
    }

    /// Builds a config from `OLLAMA_URL` and `OLLAMA_MODEL`, with local defaults.
    pub fn from_env() -> Self {
        Self::new(
            env_string("OLLAMA_URL").unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            env_string("OLLAMA_MODEL").unwrap_or_else(|| DEFAULT_OLLAMA_MODEL.to_string()),
        )
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = system_prompt.into();
        self
    }

    pub fn options(mut self, options: LocalChatOptions) -> Self {
        self.options = options;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Adapter settings derived from this config.
    pub fn settings(&self) -> LocalChatSettings {
        LocalChatSettings::new(self.model.clone())
            .system_prompt(self.system_prompt.clone())
            .options(self.options.clone())
    }

    pub(crate) fn validate(&self) -> Result<(), AdapterError> {
        reqwest::Url::parse(&self.base_url)
            .map(|_| ())
            .map_err(|e| AdapterError::Config(format!("invalid Ollama base URL {:?}: {e}", self.base_url)))
    }

    pub(crate) fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url.trim_end_matches('/'))
    }

    pub(crate) fn tags_url(&self) -> String {
        format!("{}/api/tags", self.base_url.trim_end_matches('/'))
    }
}
