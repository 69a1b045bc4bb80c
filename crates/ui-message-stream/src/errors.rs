use crate::provider::ProviderId;

/// Errors raised while driving an upstream provider into a UI message stream.
///
/// Once a stream has started, an `AdapterError` item terminates it: whatever
/// frames were already produced stay with the client.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AdapterError {
    /// Provider answered with a non-success HTTP status.
    #[error("provider error ({provider}): {message}")]
    Provider {
        provider: ProviderId,
        message: String,
        status_code: Option<u16>,
    },
    /// Upstream is reachable but failed its availability probe.
    #[error("service unavailable ({provider}): {message}")]
    Unavailable {
        provider: ProviderId,
        message: String,
    },
    /// Connection, timeout, or body read failure.
    #[error("transport error ({provider}): {message}")]
    Transport {
        provider: ProviderId,
        message: String,
    },
    /// Upstream payload could not be decoded, or carried an in-band error.
    #[error("protocol error ({provider}): {message}")]
    Protocol {
        provider: ProviderId,
        message: String,
    },
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
    /// An event could not be serialized into a frame.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl AdapterError {
    /// Creates a provider-level error.
    pub fn provider(
        provider: impl Into<ProviderId>,
        message: impl Into<String>,
        status_code: Option<u16>,
    ) -> Self {
        Self::Provider {
            provider: provider.into(),
            message: message.into(),
            status_code,
        }
    }

    /// Creates an availability error.
    pub fn unavailable(provider: impl Into<ProviderId>, message: impl Into<String>) -> Self {
        Self::Unavailable {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Creates a transport-level error.
    pub fn transport(provider: impl Into<ProviderId>, message: impl Into<String>) -> Self {
        Self::Transport {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Creates a protocol-level error.
    pub fn protocol(provider: impl Into<ProviderId>, message: impl Into<String>) -> Self {
        Self::Protocol {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Returns the provider associated with this error, if any.
    pub fn provider_id(&self) -> Option<&ProviderId> {
        match self {
            Self::Provider { provider, .. }
            | Self::Unavailable { provider, .. }
            | Self::Transport { provider, .. }
            | Self::Protocol { provider, .. } => Some(provider),
            Self::Config(_) | Self::Serialization(_) => None,
        }
    }

    /// Whether the HTTP layer should answer with 503 Service Unavailable.
    pub fn is_service_unavailable(&self) -> bool {
        match self {
            Self::Transport { .. } | Self::Unavailable { .. } => true,
            Self::Provider { status_code, .. } => {
                status_code.is_none_or(|code| code == 404 || code >= 500)
            }
            _ => false,
        }
    }
}

impl From<serde_json::Error> for AdapterError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value.to_string())
    }
}

/// Failure of a single tool call. Rendered verbatim as `errorText` in a
/// `tool-output-error` event.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ToolError {
    #[error("Tool '{0}' not found.")]
    NotFound(String),
    #[error("{0}")]
    InvalidArguments(String),
    #[error("{0}")]
    Failed(String),
}

impl ToolError {
    /// Convenience constructor for tools reporting their own failure.
    pub fn failed(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }
}
