//! sft-evolve: multi-agent evolution of supervised fine-tuning data.
//!
//! A team of role-played LLM agents rewrites instruction-tuning samples: two
//! reviewers debate each response, an advisor distills the debate into
//! writing suggestions, an editor applies them, and a judge decides whether
//! the edit is an improvement. Samples are processed concurrently with
//! per-sample fault isolation and full session transcripts.

// Core modules
pub mod agents;
pub mod cli;
pub mod dataset;
pub mod error;
pub mod judge;
pub mod llm;
pub mod pipeline;
pub mod prompts;
pub mod scheduler;
pub mod utils;

// Re-export commonly used error types
pub use agents::{AgentError, AgentResult};
pub use error::{DatasetError, LlmError};
