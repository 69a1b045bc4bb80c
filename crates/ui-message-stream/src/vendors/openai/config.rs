use std::time::Duration;

use crate::config::{env_or, env_string};
use crate::errors::AdapterError;

/// Configuration for the OpenAI chat-completions client.
#[derive(Clone, Debug)]
pub struct OpenAiClientConfig {
    /// API key used for bearer auth.
    pub api_key: String,
    /// Base URL including the version segment, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    pub model: String,
    /// Requests the trailing usage-summary chunk.
    pub include_usage: bool,
    /// Bound on establishing the connection. Streaming itself is not time-limited.
    pub connect_timeout: Duration,
}

impl OpenAiClientConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o".to_string(),
            include_usage: true,
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Builds a config from `OPENAI_API_KEY`, `OPENAI_BASE_URL` and `OPENAI_MODEL`.
    pub fn from_env() -> Result<Self, AdapterError> {
        let api_key = env_string("OPENAI_API_KEY").ok_or_else(|| {
            AdapterError::Config("missing OPENAI_API_KEY for OpenAI provider".into())
        })?;
        let mut config = Self::new(api_key);
        if let Some(base_url) = env_string("OPENAI_BASE_URL") {
            config.base_url = base_url;
        }
        config.model = env_or("OPENAI_MODEL", config.model);
        Ok(config)
    }

    /// Overrides the API base URL (for proxies or test servers).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn include_usage(mut self, include_usage: bool) -> Self {
        self.include_usage = include_usage;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub(crate) fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}
