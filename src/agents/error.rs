//! Error types for the agent layer.

use thiserror::Error;

/// Errors that can occur during agent operations.
#[derive(Debug, Error)]
pub enum AgentError {
    /// A role outside the closed persona set was requested.
    #[error("Unknown agent role: '{0}'")]
    UnknownRole(String),

    /// The backend signalled a failure for a model call.
    #[error("Backend failure: {0}")]
    Backend(String),

    /// Transport-level error from the backend client.
    #[error("LLM error: {0}")]
    Llm(#[from] crate::error::LlmError),

    /// IO error while persisting a session transcript.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for agent operations.
pub type AgentResult<T> = Result<T, AgentError>;
