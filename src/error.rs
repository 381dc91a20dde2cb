//! Error types for sft-evolve operations.
//!
//! Defines error types for the two external-facing subsystems:
//! - LLM backend interactions
//! - Dataset loading

use thiserror::Error;

/// Errors that can occur during LLM backend operations.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Missing API base URL: SFT_EVOLVE_API_BASE environment variable not set")]
    MissingApiBase,

    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("API error ({code}): {message}")]
    ApiError { code: u16, message: String },

    #[error("Failed to parse backend response: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur while loading a dataset.
#[derive(Debug, Error)]
pub enum DatasetError {
    #[error("Failed to read dataset file '{path}': {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse dataset '{path}': {message}")]
    Parse { path: String, message: String },

    #[error("Dataset '{0}' contains no samples")]
    Empty(String),

    #[error("Sample {id} has an odd number of conversation turns ({turns})")]
    OddTurnCount { id: u64, turns: usize },

    #[error("Invalid index range: start {start} must be smaller than end {end}")]
    InvalidRange { start: usize, end: usize },
}
