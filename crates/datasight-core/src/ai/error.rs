//! Insight endpoint error classification

use thiserror::Error;

/// Why the insight endpoint did not produce text
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InsightError {
    #[error("Unauthorized (HTTP {0})")]
    Unauthorized(u16),

    #[error("Rate limited (HTTP 429)")]
    RateLimited,

    #[error("Server error (HTTP {0})")]
    ServerError(u16),

    #[error("Client error (HTTP {0})")]
    ClientError(u16),

    #[error("Timeout")]
    Timeout,

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Not configured: {0}")]
    Configuration(String),
}

impl InsightError {
    /// Classify a non-2xx status
    pub fn from_status(status: u16) -> Self {
        match status {
            401 | 403 => Self::Unauthorized(status),
            429 => Self::RateLimited,
            500..=599 => Self::ServerError(status),
            _ => Self::ClientError(status),
        }
    }

    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited | Self::ServerError(_) | Self::Timeout | Self::NetworkError(_)
        )
    }

    /// Stable short name, used in logs and debug snapshots
    pub fn class(&self) -> &'static str {
        match self {
            Self::Unauthorized(_) => "unauthorized",
            Self::RateLimited => "rate_limited",
            Self::ServerError(_) => "server_error",
            Self::ClientError(_) => "client_error",
            Self::Timeout => "timeout",
            Self::MalformedResponse(_) => "malformed_response",
            Self::NetworkError(_) => "network_error",
            Self::Configuration(_) => "configuration",
        }
    }
}
