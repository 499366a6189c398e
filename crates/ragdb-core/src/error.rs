use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// An embedding disagrees with the dimension fixed by the index.
    #[error("Dimension mismatch: index expects {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Operation failed: {0}")]
    Operation(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Failures of an external embedding or generation service.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// DNS, connection reset, TLS and similar transport failures.
    #[error("network error: {0}")]
    Network(String),

    #[error("auth error: {0}")]
    Auth(String),

    #[error("rate limited: {0}")]
    RateLimit(String),

    #[error("timed out after {0}s")]
    Timeout(u64),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("{0}")]
    Other(String),
}

impl ProviderError {
    /// Map an HTTP error status and body to a provider error.
    ///
    /// OpenAI-style bodies (`{"error": {"message": ...}}`) contribute their
    /// message; anything else is passed through verbatim.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<serde_json::Value>(body)
            .ok()
            .and_then(|v| v.pointer("/error/message").and_then(|m| m.as_str()).map(str::to_string))
            .unwrap_or_else(|| body.to_string());
        match status {
            401 => Self::Auth(message),
            429 => Self::RateLimit(message),
            _ => Self::Other(format!("HTTP {status}: {message}")),
        }
    }
}
