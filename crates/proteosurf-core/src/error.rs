//! Error types for Proteosurf Core

use thiserror::Error;

/// Result type alias using Proteosurf Error
pub type Result<T> = std::result::Result<T, Error>;

/// Proteosurf error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("Session error: {0}")]
    Session(String),

    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Failures crossing the completion-service boundary.
///
/// Tool failures never take this path; they are converted to in-band text by
/// the dispatcher so the model can recover. Gateway failures end the turn.
#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("authentication rejected by completion service: {0}")]
    Auth(String),

    #[error("completion service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("protocol violation in model response: {0}")]
    Protocol(String),
}

impl GatewayError {
    /// Whether a bounded retry is worth attempting
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Auth(_) | Self::Protocol(_) => false,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::Network(e) => !e.is_builder(),
        }
    }
}

/// Tool-specific errors
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Tool already registered: {0}")]
    Duplicate(String),

    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    #[error("Timed out after {0} seconds")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(GatewayError::Status { status: 429, body: String::new() }.is_retryable());
        assert!(GatewayError::Status { status: 503, body: String::new() }.is_retryable());
        assert!(!GatewayError::Status { status: 400, body: String::new() }.is_retryable());
        assert!(!GatewayError::Auth("bad key".into()).is_retryable());
        assert!(!GatewayError::Protocol("missing content".into()).is_retryable());
    }

    #[test]
    fn tool_error_messages() {
        let e = ToolError::Timeout(30);
        assert_eq!(e.to_string(), "Timed out after 30 seconds");

        let e = ToolError::Duplicate("fetch_structure".into());
        assert!(e.to_string().contains("fetch_structure"));
    }
}
